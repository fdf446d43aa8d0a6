use std::fmt;

use thiserror::Error;

use crate::value::FlagType;

/// The names a flag answers to, rendered as `[-s | --long]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagName {
    pub long: String,
    pub short: Option<String>,
}

impl fmt::Display for FlagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.short {
            Some(short) => write!(f, "[-{short} | --{}]", self.long),
            None => write!(f, "[--{}]", self.long),
        }
    }
}

/// A raw string that could not be converted to the flag's type.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {kind} value {raw:?}: {detail}")]
pub struct CoerceError {
    pub kind: FlagType,
    pub raw: String,
    pub detail: String,
}

/// A user input error found while parsing arguments.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unknown flag: {token}")]
    UnknownFlag { token: String },

    #[error("missing value for flag: {flag}")]
    MissingValue { flag: FlagName },

    #[error("empty value for flag: {flag}")]
    EmptyValue { flag: FlagName },

    #[error("{flag}: {source}")]
    InvalidValue {
        flag: FlagName,
        #[source]
        source: CoerceError,
    },

    #[error("{flag}: {message}")]
    Validation { flag: FlagName, message: String },

    #[error("missing required flag: {flag}")]
    MissingRequired { flag: FlagName },
}

impl ParseError {
    /// The flag the error is about, if it resolved to one.
    pub fn flag(&self) -> Option<&FlagName> {
        match self {
            Self::UnknownFlag { .. } => None,
            Self::MissingValue { flag }
            | Self::EmptyValue { flag }
            | Self::InvalidValue { flag, .. }
            | Self::Validation { flag, .. }
            | Self::MissingRequired { flag } => Some(flag),
        }
    }
}

/// A programmer error made while registering flags or subcommands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("flag name cannot be empty")]
    EmptyFlagName,

    #[error("flag --{long} is already registered in {scope}")]
    DuplicateFlag { scope: String, long: String },

    #[error("flag --{long} is a {kind} flag, its storage does not hold {kind} values")]
    StorageMismatch { long: String, kind: FlagType },

    #[error("subcommand name cannot be empty")]
    EmptyCommandName,

    #[error("subcommand {name} needs a description")]
    EmptyDescription { name: String },

    #[error("subcommand {name} is already registered")]
    DuplicateCommand { name: String },
}
