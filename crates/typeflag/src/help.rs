//! Usage text for the global scope and for each subcommand.

use crate::command::{Cli, Subcommand};
use crate::flag::{Flag, Scope};
use crate::value::FlagType;

impl Cli {
    /// Usage text for the program: global flags and the subcommand list.
    pub fn usage(&self) -> String {
        let mut out = String::new();
        match self.description() {
            Some(about) => out.push_str(&format!("{} - {}\n", self.program(), about.trim())),
            None => out.push_str(&format!("{}\n", self.program())),
        }

        let tail = if !self.commands.is_empty() {
            " <COMMAND> [COMMAND OPTIONS]"
        } else {
            ""
        };
        out.push_str(&format!("\nUsage: {} [OPTIONS]{tail}\n", self.program()));

        push_options(&mut out, self.globals());

        if !self.commands.is_empty() {
            out.push_str("\nCommands:\n");
            let rows: Vec<(String, String)> = self
                .commands()
                .map(|c| (c.name().to_string(), c.description().to_string()))
                .collect();
            push_rows(&mut out, rows);
            out.push_str(&format!(
                "\nRun '{} <COMMAND> --help' for more information on a command.\n",
                self.program()
            ));
        }
        out
    }
}

impl Subcommand {
    /// Usage text for this subcommand as invoked through `program`.
    pub fn usage(&self, program: &str) -> String {
        let mut out = format!("{program} {} - {}\n", self.name(), self.description());
        out.push_str(&format!("\nUsage: {program} {} [OPTIONS]\n", self.name()));
        push_options(&mut out, self.scope());
        out
    }
}

fn push_options(out: &mut String, scope: &Scope) {
    out.push_str("\nOptions:\n");
    let rows = scope.flags().map(|f| (flag_left(f), flag_help(f))).collect();
    push_rows(out, rows);
}

fn push_rows(out: &mut String, rows: Vec<(String, String)>) {
    let width = rows.iter().map(|(left, _)| left.len()).max().unwrap_or(0);
    for (left, help) in rows {
        if help.is_empty() {
            out.push_str(&format!("  {left}\n"));
        } else {
            out.push_str(&format!("  {left:width$}  {help}\n"));
        }
    }
}

fn flag_left(flag: &Flag) -> String {
    let mut out = match flag.short() {
        Some(short) => format!("-{short}, --{}", flag.long()),
        None => format!("    --{}", flag.long()),
    };
    if flag.kind() != FlagType::Bool {
        out.push_str(&format!(" <{}>", flag.kind().value_name()));
    }
    out
}

fn flag_help(flag: &Flag) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !flag.usage().is_empty() {
        parts.push(flag.usage().to_string());
    }
    if flag.is_required() {
        parts.push("(required)".to_string());
    } else if !flag.default_value().is_blank() {
        parts.push(format!("[default: {}]", flag.default_value()));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::command::Context;
    use crate::flag::Slot;

    fn noop(_: &Context<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn sample() -> Cli {
        let config = Slot::new(PathBuf::new());
        let timeout = Slot::new(Duration::from_secs(30));
        let verbose = Slot::new(false);
        let name = Slot::new(String::new());
        let greeting = Slot::new("Hello".to_string());

        let mut cli = Cli::new("app").about("Sample application");
        cli.flag(Flag::file_path("config", "c", &config, "Path to config file").required(true))
            .flag(Flag::duration("timeout", "", &timeout, "Request timeout"))
            .flag(Flag::bool("verbose", "v", &verbose, "Verbose output"));
        cli.command("greet", "Greet someone", noop)
            .flag(Flag::string("name", "n", &name, "Your name").required(true))
            .flag(Flag::string("greeting", "g", &greeting, "Greeting to use"));
        cli.command("version", "Print the version", noop);
        cli
    }

    #[test]
    fn program_usage_lists_flags_and_commands() {
        let usage = sample().usage();
        assert!(usage.starts_with("app - Sample application\n"), "{usage}");
        assert!(usage.contains("Usage: app [OPTIONS] <COMMAND> [COMMAND OPTIONS]"), "{usage}");
        assert!(usage.contains("  -h, --help"), "{usage}");
        let config = usage.lines().find(|l| l.contains("--config")).unwrap();
        assert!(config.starts_with("  -c, --config <FILE>  "), "{config}");
        assert!(config.ends_with("  Path to config file (required)"), "{config}");
        assert!(usage.contains("    --timeout <DURATION>"), "{usage}");
        assert!(usage.contains("Request timeout [default: 30s]"), "{usage}");
        assert!(usage.contains("\nCommands:\n  greet    Greet someone\n"), "{usage}");
        assert!(usage.contains("  version  Print the version"), "{usage}");
    }

    #[test]
    fn option_columns_are_aligned() {
        let usage = sample().usage();
        let columns: Vec<usize> = [
            "Print help message and exit",
            "Path to config file",
            "Request timeout",
            "Verbose output",
        ]
        .iter()
        .map(|text| {
            let line = usage.lines().find(|l| l.contains(text)).unwrap();
            line.find(text).unwrap()
        })
        .collect();
        assert!(columns.windows(2).all(|w| w[0] == w[1]), "{usage}");
    }

    #[test]
    fn bool_defaults_are_not_shown() {
        let usage = sample().usage();
        let verbose = usage.lines().find(|l| l.contains("--verbose")).unwrap();
        assert!(!verbose.contains("default"), "{verbose}");
        assert!(!verbose.contains('<'), "{verbose}");
    }

    #[test]
    fn subcommand_usage() {
        let cli = sample();
        let usage = cli.find("greet").unwrap().usage(cli.program());
        assert!(usage.starts_with("app greet - Greet someone\n"), "{usage}");
        assert!(usage.contains("Usage: app greet [OPTIONS]"), "{usage}");
        assert!(usage.contains("-n, --name <STRING>      Your name (required)"), "{usage}");
        assert!(usage.contains("Greeting to use [default: Hello]"), "{usage}");
        assert!(!usage.contains("--config"), "{usage}");
    }

    #[test]
    fn usage_without_commands() {
        let cli = Cli::new("tool");
        let usage = cli.usage();
        assert!(usage.contains("Usage: tool [OPTIONS]\n"), "{usage}");
        assert!(!usage.contains("Commands:"), "{usage}");
    }
}
