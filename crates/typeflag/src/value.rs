//! Flag kinds and the dynamically-typed values produced by coercion.
//!
//! Every registered flag declares a [`FlagType`]. Coercion turns the raw token
//! into a [`Value`], validators inspect that value, and the registry finally
//! moves it into the caller's storage through [`FlagValue`].

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use url::Url;
use uuid::Uuid;

/// The declared type of a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlagType {
    String,
    Int,
    Int64,
    Float32,
    Float64,
    Bool,
    Rune,
    Duration,
    StringList,
    IntList,
    Timestamp,
    IpAddress,
    MacAddress,
    Url,
    Uuid,
    HostPortPair,
    Email,
    FilePath,
    DirPath,
}

impl FlagType {
    pub const ALL: [FlagType; 19] = [
        FlagType::String,
        FlagType::Int,
        FlagType::Int64,
        FlagType::Float32,
        FlagType::Float64,
        FlagType::Bool,
        FlagType::Rune,
        FlagType::Duration,
        FlagType::StringList,
        FlagType::IntList,
        FlagType::Timestamp,
        FlagType::IpAddress,
        FlagType::MacAddress,
        FlagType::Url,
        FlagType::Uuid,
        FlagType::HostPortPair,
        FlagType::Email,
        FlagType::FilePath,
        FlagType::DirPath,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::Rune => "rune",
            Self::Duration => "duration",
            Self::StringList => "string-list",
            Self::IntList => "int-list",
            Self::Timestamp => "timestamp",
            Self::IpAddress => "ip",
            Self::MacAddress => "mac",
            Self::Url => "url",
            Self::Uuid => "uuid",
            Self::HostPortPair => "host:port",
            Self::Email => "email",
            Self::FilePath => "file",
            Self::DirPath => "dir",
        }
    }

    /// Placeholder shown after the flag name in usage text.
    pub fn value_name(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Int | Self::Int64 => "INT",
            Self::Float32 | Self::Float64 => "FLOAT",
            Self::Bool => "BOOL",
            Self::Rune => "CHAR",
            Self::Duration => "DURATION",
            Self::StringList => "A,B,..",
            Self::IntList => "N,M,..",
            Self::Timestamp => "YYYY-MM-DDTHH:MM ZONE",
            Self::IpAddress => "IP",
            Self::MacAddress => "MAC",
            Self::Url => "URL",
            Self::Uuid => "UUID",
            Self::HostPortPair => "HOST:PORT",
            Self::Email => "EMAIL",
            Self::FilePath => "FILE",
            Self::DirPath => "DIR",
        }
    }
}

impl fmt::Display for FlagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A coerced flag value.
///
/// Several flag types share a representation: host:port pairs and email
/// addresses are strings, file and directory flags are paths.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Bool(bool),
    Rune(char),
    Duration(Duration),
    StringList(Vec<String>),
    IntList(Vec<i32>),
    Timestamp(DateTime<FixedOffset>),
    IpAddress(IpAddr),
    MacAddress(MacAddr),
    Url(Url),
    Uuid(Uuid),
    Path(PathBuf),
}

impl Value {
    /// Short name of the representation, used in validator messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Int(_) => "int",
            Self::Int64(_) => "int64",
            Self::Float32(_) => "float32",
            Self::Float64(_) => "float64",
            Self::Bool(_) => "bool",
            Self::Rune(_) => "rune",
            Self::Duration(_) => "duration",
            Self::StringList(_) => "string list",
            Self::IntList(_) => "int list",
            Self::Timestamp(_) => "timestamp",
            Self::IpAddress(_) => "ip address",
            Self::MacAddress(_) => "mac address",
            Self::Url(_) => "url",
            Self::Uuid(_) => "uuid",
            Self::Path(_) => "path",
        }
    }

    /// Whether the value carries nothing worth showing as a default.
    pub(crate) fn is_blank(&self) -> bool {
        match self {
            Self::String(s) => s.is_empty(),
            Self::Bool(b) => !b,
            Self::StringList(v) => v.is_empty(),
            Self::IntList(v) => v.is_empty(),
            Self::MacAddress(m) => m.octets().is_empty(),
            Self::Path(p) => p.as_os_str().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Int(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Rune(v) => write!(f, "{v}"),
            Self::Duration(v) => write!(f, "{v:?}"),
            Self::StringList(v) => f.write_str(&v.join(",")),
            Self::IntList(v) => {
                let parts: Vec<String> = v.iter().map(|n| n.to_string()).collect();
                f.write_str(&parts.join(","))
            }
            Self::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M %:z")),
            Self::IpAddress(v) => write!(f, "{v}"),
            Self::MacAddress(v) => write!(f, "{v}"),
            Self::Url(v) => write!(f, "{v}"),
            Self::Uuid(v) => write!(f, "{v}"),
            Self::Path(v) => write!(f, "{}", v.display()),
        }
    }
}

/// A hardware address of 6, 8 or 20 octets (EUI-48, EUI-64, IPoIB).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MacAddr(Vec<u8>);

impl MacAddr {
    pub fn octets(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for MacAddr {
    fn from(octets: Vec<u8>) -> Self {
        Self(octets)
    }
}

impl FromStr for MacAddr {
    type Err = String;

    /// Accepts `00:00:5e:00:53:01`, `00-00-5e-00-53-01` and `0000.5e00.5301`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fn hex_octets(group: &str, width: usize) -> Option<Vec<u8>> {
            if group.len() != width || !group.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            (0..width)
                .step_by(2)
                .map(|i| u8::from_str_radix(&group[i..i + 2], 16).ok())
                .collect()
        }

        let bytes = s.as_bytes();
        if bytes.len() < 14 {
            return Err(format!("{s:?} is too short for a MAC address"));
        }

        let (sep, width) = match (bytes[2], bytes[4]) {
            (b':', _) => (':', 2),
            (b'-', _) => ('-', 2),
            (_, b'.') => ('.', 4),
            _ => return Err(format!("{s:?} is not a MAC address")),
        };

        let mut octets = Vec::new();
        for group in s.split(sep) {
            let parsed = hex_octets(group, width)
                .ok_or_else(|| format!("invalid MAC address group {group:?}"))?;
            octets.extend(parsed);
        }

        match octets.len() {
            6 | 8 | 20 => Ok(Self(octets)),
            n => Err(format!("expected 6, 8 or 20 octets, got {n}")),
        }
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, octet) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{octet:02x}")?;
        }
        Ok(())
    }
}

/// A Rust type that can hold the coerced value of a flag.
pub trait FlagValue: Clone + 'static {
    /// Flag types whose values can be stored in `Self`.
    const KINDS: &'static [FlagType];

    fn from_value(value: Value) -> Option<Self>;

    fn peek(value: &Value) -> Option<&Self>;

    fn to_value(&self) -> Value;
}

macro_rules! flag_value {
    ($ty:ty, $variant:ident, [$($kind:ident),+]) => {
        impl FlagValue for $ty {
            const KINDS: &'static [FlagType] = &[$(FlagType::$kind),+];

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn peek(value: &Value) -> Option<&Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn to_value(&self) -> Value {
                Value::$variant(self.clone())
            }
        }
    };
}

flag_value!(String, String, [String, HostPortPair, Email]);
flag_value!(i32, Int, [Int]);
flag_value!(i64, Int64, [Int64]);
flag_value!(f32, Float32, [Float32]);
flag_value!(f64, Float64, [Float64]);
flag_value!(bool, Bool, [Bool]);
flag_value!(char, Rune, [Rune]);
flag_value!(Duration, Duration, [Duration]);
flag_value!(Vec<String>, StringList, [StringList]);
flag_value!(Vec<i32>, IntList, [IntList]);
flag_value!(DateTime<FixedOffset>, Timestamp, [Timestamp]);
flag_value!(IpAddr, IpAddress, [IpAddress]);
flag_value!(MacAddr, MacAddress, [MacAddress]);
flag_value!(Url, Url, [Url]);
flag_value!(Uuid, Uuid, [Uuid]);
flag_value!(PathBuf, Path, [FilePath, DirPath]);
