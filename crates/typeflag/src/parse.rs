//! Two-pass argument parsing.
//!
//! The global pass reads flags against the global scope until a bareword
//! names a subcommand; the remaining tokens are then read against that
//! subcommand's scope. Required flags are checked after each pass.

use std::collections::VecDeque;

use tracing::debug;

use crate::coerce::coerce_with;
use crate::command::{Cli, Subcommand};
use crate::error::ParseError;
use crate::flag::{Flag, HELP_LONG, HELP_SHORT, Scope};
use crate::value::{FlagType, Value};

/// Result of a successful parse.
#[derive(Debug)]
pub enum Outcome<'a> {
    /// All flags were stored; holds the subcommand named on the command line, if any.
    Matched(Option<&'a Subcommand>),
    /// `--help` was given; holds the usage text for the scope it appeared in.
    Help(String),
}

struct Token {
    text: String,
    /// Split off a `--flag=value` token; always read as a value.
    spliced: bool,
}

impl Token {
    fn is_value(&self) -> bool {
        self.spliced || !self.text.starts_with('-')
    }
}

enum Stop<'a> {
    End,
    Command(&'a Subcommand),
    Help,
}

impl Cli {
    /// Parse `argv` (program name first) and store every flag value.
    ///
    /// Help is returned rather than printed.
    pub fn try_parse<I, S>(&self, argv: I) -> Result<Outcome<'_>, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens: VecDeque<Token> = argv
            .into_iter()
            .skip(1)
            .map(|arg| Token {
                text: arg.into(),
                spliced: false,
            })
            .collect();

        self.globals.reset();
        for command in self.commands.values() {
            command.scope().reset();
        }

        let command = match self.scan(&mut tokens, &self.globals, true)? {
            Stop::Help => return Ok(Outcome::Help(self.usage())),
            Stop::Command(command) => Some(command),
            Stop::End => None,
        };

        let exempt = command.is_some_and(|c| self.is_exempt(c.name()));
        if !exempt && let Err(err) = self.globals.check_required() {
            // Help still works for a subcommand when global flags are missing.
            if let Some(command) = command
                && asks_for_help(&tokens, command.scope())
            {
                return Ok(Outcome::Help(command.usage(self.program())));
            }
            return Err(err);
        }

        let Some(command) = command else {
            return Ok(Outcome::Matched(None));
        };
        debug!(command = command.name(), "matched subcommand");

        if let Stop::Help = self.scan(&mut tokens, command.scope(), false)? {
            return Ok(Outcome::Help(command.usage(self.program())));
        }
        command.scope().check_required()?;

        Ok(Outcome::Matched(Some(command)))
    }

    /// Like [`Cli::try_parse`], but prints usage to stdout and exits the
    /// process successfully when help is requested.
    pub fn parse<I, S>(&self, argv: I) -> Result<Option<&Subcommand>, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self.try_parse(argv)? {
            Outcome::Matched(command) => Ok(command),
            Outcome::Help(usage) => {
                print!("{usage}");
                std::process::exit(0);
            }
        }
    }

    fn scan<'a>(
        &'a self,
        tokens: &mut VecDeque<Token>,
        scope: &Scope,
        global: bool,
    ) -> Result<Stop<'a>, ParseError> {
        while let Some(token) = tokens.pop_front() {
            let mut text = token.text.trim();
            if text.is_empty() {
                continue;
            }

            if !token.spliced
                && let Some((head, value)) = text.split_once('=')
            {
                tokens.push_front(Token {
                    text: value.to_string(),
                    spliced: true,
                });
                text = head;
            }

            if token.spliced || !text.starts_with('-') || text == "-" {
                if global && let Some(command) = self.find(text) {
                    return Ok(Stop::Command(command));
                }
                debug!(scope = scope.name(), token = text, "ignoring stray argument");
                continue;
            }

            let name = text.trim_start_matches('-');

            let Some(flag) = scope.lookup(name) else {
                return Err(ParseError::UnknownFlag {
                    token: text.to_string(),
                });
            };
            if flag.is_help() {
                return Ok(Stop::Help);
            }
            self.read_value(flag, tokens)?;
        }
        Ok(Stop::End)
    }

    /// Take the flag's value from the front of `tokens`, coerce and store it.
    fn read_value(&self, flag: &Flag, tokens: &mut VecDeque<Token>) -> Result<(), ParseError> {
        let is_bool = flag.kind() == FlagType::Bool;
        let next = tokens
            .front()
            .map(|t| (t.text.trim().is_empty(), t.is_value()));
        let raw = match next {
            Some((true, _)) => {
                tokens.pop_front();
                if !is_bool {
                    return Err(ParseError::EmptyValue { flag: flag.name() });
                }
                Some(String::new())
            }
            Some((false, true)) => tokens.pop_front().map(|t| t.text),
            _ => None,
        };

        let value = match raw {
            Some(raw) => coerce_with(flag.kind(), &raw, self.empty_bool()).map_err(|source| {
                ParseError::InvalidValue {
                    flag: flag.name(),
                    source,
                }
            })?,
            None if is_bool => Value::Bool(true),
            None => return Err(ParseError::MissingValue { flag: flag.name() }),
        };
        flag.accept(value)
    }
}

fn asks_for_help(tokens: &VecDeque<Token>, scope: &Scope) -> bool {
    tokens.iter().filter(|t| !t.spliced).any(|t| {
        let text = t.text.trim();
        let name = text.trim_start_matches('-');
        let name = name.split_once('=').map_or(name, |(flag, _)| flag);
        text.starts_with('-')
            && (name == HELP_LONG || name == HELP_SHORT)
            && scope.lookup(name).is_some_and(Flag::is_help)
    })
}
