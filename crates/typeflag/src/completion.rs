//! Shell completion scripts generated from a [`Cli`]'s registry.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context as _, Result, bail};
use thiserror::Error;

use crate::command::{Cli, Subcommand};
use crate::flag::{Flag, Scope, Slot};
use crate::validate;
use crate::value::FlagType;

/// Name of the subcommand registered by [`Cli::add_completion_command`].
pub const COMPLETION_COMMAND: &str = "completion";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported shell {0:?}, expected bash or zsh")]
pub struct UnknownShell(pub String);

impl FromStr for Shell {
    type Err = UnknownShell;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bash" => Ok(Self::Bash),
            "zsh" => Ok(Self::Zsh),
            _ => Err(UnknownShell(s.to_string())),
        }
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bash => "bash",
            Self::Zsh => "zsh",
        })
    }
}

/// Write the completion script for `shell` to `out`.
pub fn generate(cli: &Cli, shell: Shell, out: &mut dyn Write) -> io::Result<()> {
    match shell {
        Shell::Bash => bash(cli, out),
        Shell::Zsh => zsh(cli, out),
    }
}

/// The executable name completions are registered for.
fn binary_name(cli: &Cli) -> &str {
    Path::new(cli.program())
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(cli.program())
}

fn function_name(cli: &Cli) -> String {
    let name: String = binary_name(cli)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("_{name}")
}

fn flag_words(scope: &Scope) -> String {
    let mut words = Vec::new();
    for flag in scope.flags() {
        words.push(format!("--{}", flag.long()));
        if let Some(short) = flag.short() {
            words.push(format!("-{short}"));
        }
    }
    words.join(" ")
}

/// `--long|-s` alternatives for every path flag of the given kind.
fn path_patterns(cli: &Cli, kind: FlagType) -> Vec<String> {
    let scopes = std::iter::once(cli.globals()).chain(cli.commands().map(Subcommand::scope));
    let mut patterns: Vec<String> = Vec::new();
    for flag in scopes.flat_map(Scope::flags).filter(|f| f.kind() == kind) {
        let mut pattern = format!("--{}", flag.long());
        if let Some(short) = flag.short() {
            pattern.push_str(&format!("|-{short}"));
        }
        if !patterns.contains(&pattern) {
            patterns.push(pattern);
        }
    }
    patterns
}

fn bash(cli: &Cli, out: &mut dyn Write) -> io::Result<()> {
    let func = function_name(cli);
    let names: Vec<&str> = cli.commands().map(Subcommand::name).collect();

    writeln!(out, "# bash completion for {}", binary_name(cli))?;
    writeln!(out, "{func}() {{")?;
    writeln!(out, "    local cur=\"${{COMP_WORDS[COMP_CWORD]}}\"")?;
    writeln!(out, "    local prev=\"${{COMP_WORDS[COMP_CWORD-1]}}\"")?;
    writeln!(out, "    local commands=\"{}\"", names.join(" "))?;
    writeln!(out, "    local cmd=\"\" word flags")?;

    let files = path_patterns(cli, FlagType::FilePath);
    let dirs = path_patterns(cli, FlagType::DirPath);
    if !files.is_empty() || !dirs.is_empty() {
        writeln!(out, "    case \"$prev\" in")?;
        if !files.is_empty() {
            writeln!(out, "        {}) COMPREPLY=($(compgen -f -- \"$cur\")); return ;;", files.join("|"))?;
        }
        if !dirs.is_empty() {
            writeln!(out, "        {}) COMPREPLY=($(compgen -d -- \"$cur\")); return ;;", dirs.join("|"))?;
        }
        writeln!(out, "    esac")?;
    }

    if !names.is_empty() {
        writeln!(out, "    for word in \"${{COMP_WORDS[@]:1:COMP_CWORD-1}}\"; do")?;
        writeln!(out, "        case \"$word\" in")?;
        writeln!(out, "            {}) cmd=\"$word\"; break ;;", names.join("|"))?;
        writeln!(out, "        esac")?;
        writeln!(out, "    done")?;
    }

    writeln!(out, "    case \"$cmd\" in")?;
    for command in cli.commands() {
        writeln!(out, "        {}) flags=\"{}\" ;;", command.name(), flag_words(command.scope()))?;
    }
    writeln!(out, "        *) flags=\"{}\" ;;", flag_words(cli.globals()))?;
    writeln!(out, "    esac")?;

    writeln!(out, "    if [[ -z \"$cmd\" && \"$cur\" != -* ]]; then")?;
    writeln!(out, "        COMPREPLY=($(compgen -W \"$commands\" -- \"$cur\"))")?;
    writeln!(out, "    else")?;
    writeln!(out, "        COMPREPLY=($(compgen -W \"$flags\" -- \"$cur\"))")?;
    writeln!(out, "    fi")?;
    writeln!(out, "}}")?;
    writeln!(out, "complete -F {func} {}", binary_name(cli))
}

/// Escape text for use inside a single-quoted zsh `_arguments` spec.
fn zsh_escape(text: &str) -> String {
    text.replace('\'', "'\\''")
        .replace('[', "\\[")
        .replace(']', "\\]")
        .replace(':', "\\:")
}

fn zsh_spec(flag: &Flag) -> String {
    let usage = zsh_escape(flag.usage());
    let names = match flag.short() {
        Some(short) => format!("'(-{short} --{long})'{{-{short},--{long}}}'", long = flag.long()),
        None => format!("'--{}", flag.long()),
    };
    let action = match flag.kind() {
        FlagType::Bool => String::new(),
        FlagType::FilePath => ":file:_files".to_string(),
        FlagType::DirPath => ":directory:_files -/".to_string(),
        kind => format!(":{}: ", kind.name()),
    };
    format!("{names}[{usage}]{action}'")
}

fn zsh_arguments(out: &mut dyn Write, indent: &str, scope: &Scope, extra: &[&str]) -> io::Result<()> {
    write!(out, "{indent}_arguments -C")?;
    for flag in scope.flags() {
        write!(out, " \\\n{indent}    {}", zsh_spec(flag))?;
    }
    for spec in extra {
        write!(out, " \\\n{indent}    {spec}")?;
    }
    writeln!(out)
}

fn zsh(cli: &Cli, out: &mut dyn Write) -> io::Result<()> {
    let func = function_name(cli);

    writeln!(out, "#compdef {}", binary_name(cli))?;
    writeln!(out)?;
    writeln!(out, "{func}() {{")?;
    writeln!(out, "    local curcontext=\"$curcontext\" state line")?;

    if cli.commands.is_empty() {
        zsh_arguments(out, "    ", cli.globals(), &[])?;
        writeln!(out, "}}")?;
        writeln!(out)?;
        return writeln!(out, "{func} \"$@\"");
    }

    zsh_arguments(
        out,
        "    ",
        cli.globals(),
        &["'1:command:->command'", "'*::arg:->args'"],
    )?;
    writeln!(out, "    case $state in")?;
    writeln!(out, "        command)")?;
    writeln!(out, "            local -a commands")?;
    writeln!(out, "            commands=(")?;
    for command in cli.commands() {
        writeln!(
            out,
            "                '{}:{}'",
            zsh_escape(command.name()),
            zsh_escape(command.description())
        )?;
    }
    writeln!(out, "            )")?;
    writeln!(out, "            _describe 'command' commands")?;
    writeln!(out, "            ;;")?;
    writeln!(out, "        args)")?;
    writeln!(out, "            case $line[1] in")?;
    for command in cli.commands() {
        writeln!(out, "                {})", command.name())?;
        zsh_arguments(out, "                    ", command.scope(), &[])?;
        writeln!(out, "                    ;;")?;
    }
    writeln!(out, "            esac")?;
    writeln!(out, "            ;;")?;
    writeln!(out, "    esac")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "{func} \"$@\"")
}

/// Where the completion script for `shell` is installed.
///
/// bash: `$XDG_DATA_HOME/bash-completion/completions/<bin>`, falling back to
/// `~/.local/share`. zsh: `~/.zsh/completions/_<bin>`.
pub fn install_path(cli: &Cli, shell: Shell) -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .context("HOME is not set")?;
    let data_home = std::env::var_os("XDG_DATA_HOME")
        .filter(|d| !d.is_empty())
        .map(PathBuf::from);
    Ok(install_path_in(
        shell,
        binary_name(cli),
        &home,
        data_home.as_deref(),
    ))
}

fn install_path_in(shell: Shell, bin: &str, home: &Path, data_home: Option<&Path>) -> PathBuf {
    match shell {
        Shell::Bash => data_home
            .map(Path::to_path_buf)
            .unwrap_or_else(|| home.join(".local").join("share"))
            .join("bash-completion")
            .join("completions")
            .join(bin),
        Shell::Zsh => home.join(".zsh").join("completions").join(format!("_{bin}")),
    }
}

/// Write the completion script to `path`, creating parent directories.
pub fn install_to(cli: &Cli, shell: Shell, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut script = Vec::new();
    generate(cli, shell, &mut script)?;
    fs::write(path, script).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(%shell, path = %path.display(), "installed completion script");
    Ok(())
}

/// Remove an installed script. Returns `false` if there was nothing to remove.
pub fn uninstall_from(shell: Shell, path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::info!(%shell, path = %path.display(), "removed completion script");
            Ok(true)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
    }
}

impl Cli {
    /// Register the `completion` subcommand.
    ///
    /// It prints a script for `--shell`, or installs/removes it with
    /// `--install`/`--uninstall`, and runs without the global required flags.
    pub fn add_completion_command(&mut self) -> &mut Subcommand {
        let shell = Slot::new(String::new());
        let install = Slot::new(false);
        let uninstall = Slot::new(false);
        let (shell_value, install_value, uninstall_value) =
            (shell.clone(), install.clone(), uninstall.clone());

        self.exempt(COMPLETION_COMMAND);
        self.command(
            COMPLETION_COMMAND,
            "Generate shell completion scripts",
            move |ctx| {
                let shell: Shell = shell_value.get().parse()?;
                let cli = ctx.cli();
                match (install_value.get(), uninstall_value.get()) {
                    (true, true) => bail!("--install and --uninstall cannot be used together"),
                    (true, false) => {
                        let path = install_path(cli, shell)?;
                        install_to(cli, shell, &path)?;
                        println!("Installed {shell} completions to {}", path.display());
                    }
                    (false, true) => {
                        let path = install_path(cli, shell)?;
                        if uninstall_from(shell, &path)? {
                            println!("Removed {}", path.display());
                        } else {
                            println!("No {shell} completions installed at {}", path.display());
                        }
                    }
                    (false, false) => {
                        let stdout = io::stdout();
                        generate(cli, shell, &mut stdout.lock())?;
                    }
                }
                Ok(())
            },
        )
        .flag(
            Flag::string("shell", "s", &shell, "Shell to generate completions for (bash or zsh)")
                .required(true)
                .validate(validate::one_of::<String>(["bash", "zsh"])),
        )
        .flag(Flag::bool("install", "i", &install, "Install the completion script"))
        .flag(Flag::bool("uninstall", "u", &uninstall, "Remove the installed completion script"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Context;
    use crate::error::ParseError;
    use crate::parse::Outcome;

    fn noop(_: &Context<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn sample() -> Cli {
        let config = Slot::new(PathBuf::new());
        let out = Slot::new(PathBuf::new());
        let name = Slot::new(String::new());
        let mut cli = Cli::new("/usr/local/bin/my-app");
        cli.flag(Flag::file_path("config", "c", &config, "Config [toml]").required(true));
        cli.command("greet", "Greet someone", noop)
            .flag(Flag::string("name", "n", &name, "Who's there"));
        cli.command("export", "Export data", noop)
            .flag(Flag::dir_path("out", "o", &out, "Output directory"));
        cli.add_completion_command();
        cli
    }

    fn script(cli: &Cli, shell: Shell) -> String {
        let mut buf = Vec::new();
        generate(cli, shell, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn shell_names() {
        assert_eq!("bash".parse::<Shell>(), Ok(Shell::Bash));
        assert_eq!("ZSH".parse::<Shell>(), Ok(Shell::Zsh));
        assert_eq!("fish".parse::<Shell>(), Err(UnknownShell("fish".into())));
        assert_eq!(Shell::Zsh.to_string(), "zsh");
    }

    #[test]
    fn bash_script_lists_commands_and_flags() {
        let script = script(&sample(), Shell::Bash);
        assert!(script.starts_with("# bash completion for my-app\n"), "{script}");
        assert!(script.contains("_my_app() {"), "{script}");
        assert!(script.contains("local commands=\"greet export completion\""), "{script}");
        assert!(script.contains("greet|export|completion) cmd=\"$word\""), "{script}");
        assert!(script.contains("greet) flags=\"--help -h --name -n\" ;;"), "{script}");
        assert!(script.contains("*) flags=\"--help -h --config -c\" ;;"), "{script}");
        assert!(script.contains("--config|-c) COMPREPLY=($(compgen -f"), "{script}");
        assert!(script.contains("--out|-o) COMPREPLY=($(compgen -d"), "{script}");
        assert!(script.ends_with("complete -F _my_app my-app\n"), "{script}");
    }

    #[test]
    fn zsh_script_escapes_descriptions() {
        let script = script(&sample(), Shell::Zsh);
        assert!(script.starts_with("#compdef my-app\n"), "{script}");
        assert!(script.contains("'(-c --config)'{-c,--config}'[Config \\[toml\\]]:file:_files'"), "{script}");
        assert!(script.contains("'(-n --name)'{-n,--name}'[Who'\\''s there]:string: '"), "{script}");
        assert!(script.contains(":directory:_files -/'"), "{script}");
        assert!(script.contains("'greet:Greet someone'"), "{script}");
        assert!(script.contains("                completion)\n"), "{script}");
        assert!(script.ends_with("_my_app \"$@\"\n"), "{script}");
    }

    #[test]
    fn zsh_script_without_commands() {
        let verbose = Slot::new(false);
        let mut cli = Cli::new("tool");
        cli.flag(Flag::bool("verbose", "", &verbose, "Verbose output"));
        let script = script(&cli, Shell::Zsh);
        assert!(script.contains("'--verbose[Verbose output]'"), "{script}");
        assert!(!script.contains("case $state"), "{script}");
    }

    #[test]
    fn install_paths() {
        let home = Path::new("/home/abiira");
        assert_eq!(
            install_path_in(Shell::Bash, "app", home, None),
            PathBuf::from("/home/abiira/.local/share/bash-completion/completions/app")
        );
        assert_eq!(
            install_path_in(Shell::Bash, "app", home, Some(Path::new("/data"))),
            PathBuf::from("/data/bash-completion/completions/app")
        );
        assert_eq!(
            install_path_in(Shell::Zsh, "app", home, None),
            PathBuf::from("/home/abiira/.zsh/completions/_app")
        );
    }

    #[test]
    fn install_and_uninstall() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("_app");
        let cli = sample();

        install_to(&cli, Shell::Zsh, &path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("#compdef my-app"));

        assert!(uninstall_from(Shell::Zsh, &path).unwrap());
        assert!(!path.exists());
        assert!(!uninstall_from(Shell::Zsh, &path).unwrap());
    }

    #[test]
    fn completion_command_is_exempt_and_validated() {
        let cli = sample();
        assert!(cli.is_exempt(COMPLETION_COMMAND));

        let Ok(Outcome::Matched(Some(command))) =
            cli.try_parse(["my-app", "completion", "--shell", "bash"])
        else {
            panic!("completion should parse without --config");
        };
        assert_eq!(command.name(), COMPLETION_COMMAND);

        match cli.try_parse(["my-app", "completion", "--shell", "fish"]) {
            Err(ParseError::Validation { flag, .. }) => assert_eq!(flag.long, "shell"),
            other => panic!("unexpected result: {other:?}"),
        }
        match cli.try_parse(["my-app", "completion"]) {
            Err(ParseError::MissingRequired { flag }) => assert_eq!(flag.long, "shell"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn completion_rejects_install_with_uninstall() {
        let cli = sample();
        let Ok(Outcome::Matched(Some(command))) =
            cli.try_parse(["my-app", "completion", "-s", "zsh", "-i", "-u"])
        else {
            panic!("expected the completion command");
        };
        let err = cli.dispatch(command).unwrap_err();
        assert!(err.to_string().contains("cannot be used together"), "{err}");
    }
}
