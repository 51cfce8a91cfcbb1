use crate::command::{CANNOT_EXECUTE, ExitCode, NOT_FOUND};
use crate::lexer::LexingError;
use crate::parser::ParsingError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Every failure a command line can produce.
///
/// None of these are fatal: the interpreter reports them and reads the next line.
#[derive(Debug, Error)]
pub enum ShellError {
    /// Unterminated quote or dangling escape; the line is discarded.
    #[error("parse error: {0}")]
    Lexing(#[from] LexingError),

    /// Malformed redirection; the line is discarded.
    #[error("parse error: {0}")]
    Parsing(#[from] ParsingError),

    /// No builtin or executable matches the name; aborts the current pipeline.
    #[error("{0}: command not found")]
    CommandNotFound(String),

    /// A builtin could not act on a path (`cd`, `history -r/-w/-a`).
    #[error("{context}: {}: {}", .path.display(), describe(.source))]
    Filesystem {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A redirection target could not be opened.
    #[error("{}: {}", .path.display(), describe(.source))]
    Redirect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A resolved executable could not be started.
    #[error("{command}: {}", describe(.source))]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Bad arguments to a builtin.
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ShellError {
    /// Status a failed line leaves behind, following POSIX shell conventions.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ShellError::CommandNotFound(_) => NOT_FOUND,
            ShellError::Spawn { .. } => CANNOT_EXECUTE,
            ShellError::Lexing(_) | ShellError::Parsing(_) | ShellError::Usage(_) => 2,
            _ => 1,
        }
    }
}

/// Short, shell-style description of an I/O failure.
fn describe(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "No such file or directory".to_string(),
        io::ErrorKind::NotADirectory => "Not a directory".to_string(),
        io::ErrorKind::PermissionDenied => "Permission denied".to_string(),
        io::ErrorKind::IsADirectory => "Is a directory".to_string(),
        _ => err.to_string(),
    }
}
