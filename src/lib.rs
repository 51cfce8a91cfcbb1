//! A small interactive command interpreter.
//!
//! A line of input is split into tokens, partitioned into pipeline stages at `|`,
//! and each stage is dispatched either to an in-process builtin (`echo`, `cd`, `pwd`,
//! `type`, `history`, `exit`) or to an external program found on the search path.
//! External stages run concurrently, connected by kernel pipes; builtin output is
//! handed to the next stage as text. Only the final stage may redirect its standard
//! output or standard error to a file.
//!
//! The main entry point is [`Interpreter`], which owns an [`Environment`] (search path,
//! history log and exit request) and executes lines against it.

mod builtin;
pub mod command;
pub mod completion;
pub mod env;
pub mod error;
mod executor;
pub mod external;
pub mod history;
mod interpreter;
mod io_adapters;
pub mod lexer;
pub mod parser;

pub use builtin::Builtin;
pub use env::{Environment, Settings};
pub use error::ShellError;
pub use interpreter::Interpreter;
