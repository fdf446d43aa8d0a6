//! Typed command-line flags and subcommands.
//!
//! Flags are registered against caller-owned [`Slot`]s, one per flag, either
//! on the global scope of a [`Cli`] or on one of its [`Subcommand`]s. Parsing
//! walks the arguments twice: global flags first, up to the first bareword
//! naming a subcommand, then that subcommand's flags. Every value is coerced
//! to the flag's [`FlagType`], checked by its validators and only then
//! written to the slot. Required flags are enforced per scope.
//!
//! ```
//! use std::time::Duration;
//! use typeflag::{Cli, Flag, Outcome, Slot};
//!
//! let timeout = Slot::new(Duration::from_secs(30));
//! let name = Slot::new(String::new());
//!
//! let mut cli = Cli::new("app");
//! cli.flag(Flag::duration("timeout", "t", &timeout, "Request timeout"));
//! cli.command("greet", "Greet someone", |_| Ok(()))
//!     .flag(Flag::string("name", "n", &name, "Who to greet").required(true));
//!
//! let outcome = cli.try_parse(["app", "--timeout", "1h30m", "greet", "--name=Abiira"])?;
//! let Outcome::Matched(Some(command)) = outcome else { unreachable!() };
//! assert_eq!(command.name(), "greet");
//! assert_eq!(timeout.get(), Duration::from_secs(5400));
//! assert_eq!(name.get(), "Abiira");
//! # Ok::<(), typeflag::ParseError>(())
//! ```
//!
//! A `Cli` is single-threaded: slots are reference counted and parsing
//! records presence through interior mutability.

pub mod coerce;
pub mod command;
pub mod completion;
pub mod error;
pub mod flag;
mod help;
pub mod parse;
pub mod schema;
pub mod validate;
pub mod value;

pub use coerce::{EmptyBool, coerce, coerce_with};
pub use command::{Cli, Context, Handler, Subcommand};
pub use completion::Shell;
pub use error::{CoerceError, FlagName, ParseError, RegistrationError};
pub use flag::{Flag, Scope, Slot};
pub use parse::Outcome;
pub use schema::{CliInfo, CommandInfo, FlagInfo};
pub use validate::Validator;
pub use value::{FlagType, FlagValue, MacAddr, Value};
