//! The command-line registry: global flags plus named subcommands.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;

use crate::coerce::EmptyBool;
use crate::error::RegistrationError;
use crate::flag::{Flag, Scope};

/// Handler invoked for a matched subcommand.
pub type Handler = Box<dyn Fn(&Context<'_>) -> anyhow::Result<()>>;

/// What a handler sees: the registry it was parsed from and its own scope.
pub struct Context<'a> {
    cli: &'a Cli,
    command: &'a Subcommand,
}

impl<'a> Context<'a> {
    pub fn cli(&self) -> &'a Cli {
        self.cli
    }

    pub fn command(&self) -> &'a Subcommand {
        self.command
    }

    pub fn globals(&self) -> &'a Scope {
        self.cli.globals()
    }

    pub fn flags(&self) -> &'a Scope {
        self.command.scope()
    }
}

pub struct Subcommand {
    name: String,
    description: String,
    handler: Handler,
    scope: Scope,
}

impl Subcommand {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn flags(&self) -> impl ExactSizeIterator<Item = &Flag> {
        self.scope.flags()
    }

    /// Register a flag on this subcommand.
    ///
    /// # Panics
    ///
    /// Panics on a [`RegistrationError`]; use [`Subcommand::try_flag`] to
    /// handle it instead.
    pub fn flag(&mut self, flag: Flag) -> &mut Self {
        if let Err(err) = self.scope.register(flag) {
            panic!("{}: {err}", self.name);
        }
        self
    }

    pub fn try_flag(&mut self, flag: Flag) -> Result<&mut Self, RegistrationError> {
        self.scope.register(flag)?;
        Ok(self)
    }
}

impl fmt::Debug for Subcommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subcommand")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// A program's flags and subcommands.
///
/// Register everything first, then call [`Cli::run`] (or
/// [`Cli::try_parse`] and [`Cli::dispatch`]). Flag storage is shared through
/// `Rc`, so a `Cli` stays on the thread that built it.
#[derive(Debug)]
pub struct Cli {
    program: String,
    about: Option<String>,
    pub(crate) globals: Scope,
    pub(crate) commands: IndexMap<String, Subcommand>,
    exempt: HashSet<String>,
    empty_bool: EmptyBool,
}

impl Cli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            about: None,
            globals: Scope::new("global"),
            commands: IndexMap::new(),
            exempt: HashSet::new(),
            empty_bool: EmptyBool::default(),
        }
    }

    /// One-line description shown at the top of the usage text.
    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn with_empty_bool(mut self, policy: EmptyBool) -> Self {
        self.empty_bool = policy;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn description(&self) -> Option<&str> {
        self.about.as_deref()
    }

    pub fn empty_bool(&self) -> EmptyBool {
        self.empty_bool
    }

    pub fn globals(&self) -> &Scope {
        &self.globals
    }

    /// Register a global flag.
    ///
    /// # Panics
    ///
    /// Panics on a [`RegistrationError`].
    pub fn flag(&mut self, flag: Flag) -> &mut Self {
        if let Err(err) = self.globals.register(flag) {
            panic!("{err}");
        }
        self
    }

    pub fn try_flag(&mut self, flag: Flag) -> Result<&mut Self, RegistrationError> {
        self.globals.register(flag)?;
        Ok(self)
    }

    /// Register a subcommand and return it for adding flags.
    ///
    /// # Panics
    ///
    /// Panics on a [`RegistrationError`].
    pub fn command<F>(&mut self, name: &str, description: &str, handler: F) -> &mut Subcommand
    where
        F: Fn(&Context<'_>) -> anyhow::Result<()> + 'static,
    {
        match self.try_command(name, description, handler) {
            Ok(command) => command,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_command<F>(
        &mut self,
        name: &str,
        description: &str,
        handler: F,
    ) -> Result<&mut Subcommand, RegistrationError>
    where
        F: Fn(&Context<'_>) -> anyhow::Result<()> + 'static,
    {
        let name = name.trim();
        let description = description.trim();
        if name.is_empty() {
            return Err(RegistrationError::EmptyCommandName);
        }
        if description.is_empty() {
            return Err(RegistrationError::EmptyDescription {
                name: name.to_string(),
            });
        }
        if self.commands.contains_key(name) {
            return Err(RegistrationError::DuplicateCommand {
                name: name.to_string(),
            });
        }

        let command = Subcommand {
            name: name.to_string(),
            description: description.to_string(),
            handler: Box::new(handler),
            scope: Scope::new(name),
        };
        let (index, _) = self.commands.insert_full(name.to_string(), command);
        Ok(&mut self.commands[index])
    }

    /// Let the named subcommand run without the global required flags.
    pub fn exempt(&mut self, name: &str) -> &mut Self {
        self.exempt.insert(name.trim().to_string());
        self
    }

    pub fn is_exempt(&self, name: &str) -> bool {
        self.exempt.contains(name)
    }

    pub fn find(&self, name: &str) -> Option<&Subcommand> {
        self.commands.get(name)
    }

    pub fn commands(&self) -> impl ExactSizeIterator<Item = &Subcommand> {
        self.commands.values()
    }

    /// Invoke a subcommand's handler.
    pub fn dispatch(&self, command: &Subcommand) -> anyhow::Result<()> {
        tracing::debug!(command = %command.name, "dispatching subcommand");
        (command.handler)(&Context { cli: self, command })
    }

    /// Parse `argv`, then dispatch the matched subcommand if there is one.
    ///
    /// Prints usage and exits the process when help is requested.
    pub fn run<I, S>(&self, argv: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(command) = self.parse(argv)? {
            self.dispatch(command)?;
        }
        Ok(())
    }
}
