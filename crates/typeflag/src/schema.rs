//! Read-only snapshots of a registry, for help renderers, completion
//! generators and JSON dumps.

use serde::Serialize;

use crate::command::{Cli, Subcommand};
use crate::flag::{Flag, Scope};
use crate::value::FlagType;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct FlagInfo {
    pub long: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    pub kind: FlagType,
    pub value_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub usage: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommandInfo {
    pub name: String,
    pub description: String,
    /// Runs without the global required flags.
    pub exempt: bool,
    pub flags: Vec<FlagInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CliInfo {
    pub program: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    pub flags: Vec<FlagInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandInfo>,
}

impl Flag {
    pub fn info(&self) -> FlagInfo {
        let default = self.default_value();
        FlagInfo {
            long: self.long().to_string(),
            short: self.short().map(str::to_string),
            kind: self.kind(),
            value_name: self.kind().value_name().to_string(),
            usage: self.usage().to_string(),
            required: self.is_required(),
            default_value: (!default.is_blank()).then(|| default.to_string()),
        }
    }
}

impl Scope {
    /// Snapshot of every flag, `help` first.
    pub fn describe(&self) -> Vec<FlagInfo> {
        self.flags().map(Flag::info).collect()
    }
}

impl Cli {
    pub fn list_commands(&self) -> Vec<CommandInfo> {
        self.commands().map(|c| self.command_info(c)).collect()
    }

    pub fn describe(&self) -> CliInfo {
        CliInfo {
            program: self.program().to_string(),
            about: self.description().map(str::to_string),
            flags: self.globals().describe(),
            commands: self.list_commands(),
        }
    }

    fn command_info(&self, command: &Subcommand) -> CommandInfo {
        CommandInfo {
            name: command.name().to_string(),
            description: command.description().to_string(),
            exempt: self.is_exempt(command.name()),
            flags: command.scope().describe(),
        }
    }
}
