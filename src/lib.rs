//! Command line parsers compiled from command declarations.
//!
//! Every registered [`Command`] becomes a command (or a sub-command, when its name has
//! underscore separated segments). Its parameters, annotated with a small type expression
//! language (`"Option | OneOrMore[int]"`), become the argument schema, and its doc block
//! supplies the description plus `:param:`, `:alias:`, `:choices:` and `:metavar:`
//! directives.
//!
//! ```
//! use argdeco::{Cli, Command, Param, Value};
//!
//! let mut cli: Cli = Cli::new();
//! cli.command(
//!     Command::function("add", |args| {
//!         let values = args[0].as_list().unwrap_or_default();
//!         let squared = args["squared"].as_bool().unwrap_or(false);
//!         let sum: f64 = values
//!             .iter()
//!             .filter_map(Value::as_float)
//!             .map(|v| if squared { v * v } else { v })
//!             .sum();
//!         Ok(sum)
//!     })
//!     .param(Param::new("values").annotation("OneOrMore[float]"))
//!     .param(Param::new("squared").annotation("Option").default(true)),
//! )
//! .unwrap();
//!
//! assert_eq!(cli.execute("add 2 3 4").unwrap(), Value::Float(29.0));
//! ```

use std::fmt;

macro_rules! format_err {
    ($kind:ident, $($tt:tt)*) => {
        $crate::Error::$kind(format!($($tt)*))
    };
}

macro_rules! bail {
    ($($tt:tt)*) => {
        return Err(format_err!($($tt)*))
    };
}

mod annotation;
mod argument;
mod cli;
mod config;
mod docstring;
mod grammar;
pub mod io;
mod node;
pub mod rt;
mod shlex;
mod value;

pub use crate::{
    annotation::interpret as interpret_annotation,
    argument::{Action, Argument, Help, Nargs},
    cli::{Args, Cli, Command, CommandOptions, ErrorHandler, Exec, Param},
    config::{Config, HelpMode},
    docstring::{interpret as interpret_docstring, Docstring},
    grammar::{Engine, Grammar, GrammarArg, GrammarProps, Namespace, Parsed},
    node::{CommandMap, Node, NodeId, Target, Tree},
    shlex::{split, CommandLine},
    value::{Converter, CustomAction, Scope, Value},
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while declaring or executing commands.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A set-once property received a second, different value.
    #[error("conflicting `{property}`: already `{old}`, got `{new}`")]
    Conflict { property: &'static str, old: String, new: String },
    #[error("{0}")]
    Value(String),
    #[error("{0}")]
    Type(String),
    #[error("{0}")]
    Name(String),
    #[error("{0}")]
    Eval(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("command `{0}` is a method, but no receiver was given")]
    MissingReceiver(String),
    #[error("command `{0}` is async, use `execute_async`")]
    Suspending(String),
    /// The command itself failed.
    #[error(transparent)]
    Command(anyhow::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn conflict(
        property: &'static str,
        old: impl fmt::Display,
        new: impl fmt::Display,
    ) -> Error {
        Error::Conflict { property, old: old.to_string(), new: new.to_string() }
    }
}

/// A command line that doesn't match the grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{msg}")]
pub struct ParseError {
    msg: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> ParseError {
        ParseError { msg: msg.into() }
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}
