//! Runtime-declared command line arguments parser with nested subcommands.
//!
//! A parser is a tree of commands. Each command owns optional arguments
//! (flags, single values, greedy lists), required positionals, and child
//! commands with registries of their own. Registration hands back a typed
//! handle; after parsing, the handle is redeemed on the command that minted
//! it.
//!
//! ```
//! let mut p = argtree::Parser::new("greet", "Greets people.");
//! let verbose = p.flag('v', "verbose", "Print more.");
//! let name = p.arg::<String>("name", "Who to greet.");
//!
//! p.try_parse_from(["-v", "World"])?;
//!
//! assert!(p.is_set(verbose));
//! assert_eq!(p.get(name).map(String::as_str), Some("World"));
//! # Ok::<(), argtree::Error>(())
//! ```
//!
//! Parsing is a single left-to-right pass: option tokens resolve against the
//! current command's registry, bare tokens fill positionals in declaration
//! order, and once every positional is filled a bare token may dispatch into
//! a subcommand, which then owns the rest of the input.

mod cmd;
mod help;
mod parse;

pub use crate::{
    cmd::{Cmd, FlagId, ListId, ValueId},
    parse::Parser,
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Why a parse failed.
///
/// These are the recoverable, user-input errors. Declaration mistakes
/// (duplicate registrations, handles redeemed on the wrong command) are
/// programmer errors and panic instead.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// A token used option syntax but matched no registered short or long
    /// name on the current command.
    #[error("unknown option: `{0}`")]
    UnknownOption(String),
    /// An option needing at least one token had none available.
    #[error("expected a value for `{0}`")]
    MissingValue(String),
    /// A token could not be converted to the declared type.
    #[error("can't parse `{value}` as {ty} for `{what}`: {msg}")]
    Conversion {
        /// User-facing spelling of the argument (`--port`, `path`).
        what: String,
        /// The offending raw token.
        value: String,
        /// Target type name.
        ty: &'static str,
        /// What the conversion itself had to say.
        msg: String,
    },
    /// A bare token with no positional slot left and no matching subcommand.
    #[error("unexpected argument: `{0}`")]
    UnmatchedArgument(String),
    /// Input ran out before every required positional was filled.
    #[error("missing required argument(s): `{}`", .0.join("`, `"))]
    MissingRequired(Vec<String>),
}

/// A failed parse: the [`ErrorKind`] plus the help text of the command that
/// was being parsed when the failure happened.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    kind: ErrorKind,
    help: String,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, help: String) -> Error {
        Error { kind, help }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Help rendered at the failing command, with its ancestry path.
    pub fn help(&self) -> &str {
        &self.help
    }
}
