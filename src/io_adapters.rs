use crate::error::ShellError;
use crate::parser::RedirectTarget;
use std::fs::{File, OpenOptions};
use std::process::{ChildStdout, Stdio};

/// What the next stage reads from.
pub(crate) enum StageInput {
    /// The interpreter's own standard input.
    Inherit,
    /// Read end of the previous external stage's stdout pipe.
    Pipe(ChildStdout),
    /// Text produced by a preceding builtin, written to the child after spawning.
    Text(Vec<u8>),
}

impl StageInput {
    /// Convert this input into a [`Stdio`] handle, returning any text that still has
    /// to be fed to the child's stdin.
    ///
    /// A pipe is moved into the `Stdio`, so the caller keeps no copy of it.
    pub(crate) fn into_stdio(self) -> (Stdio, Option<Vec<u8>>) {
        match self {
            StageInput::Inherit => (Stdio::inherit(), None),
            StageInput::Pipe(pipe) => (Stdio::from(pipe), None),
            StageInput::Text(text) => (Stdio::piped(), Some(text)),
        }
    }
}

/// Open a redirection target: truncating, or appending when requested.
pub(crate) fn open_redirect(target: &RedirectTarget) -> Result<File, ShellError> {
    let mut options = OpenOptions::new();
    if target.append {
        options.append(true).create(true);
    } else {
        options.write(true).create(true).truncate(true);
    }
    options.open(&target.path).map_err(|source| ShellError::Redirect {
        path: target.path.clone(),
        source,
    })
}

/// Hand a duplicate of an opened redirection file to a child.
///
/// The opened file itself stays with the executor until every process is reaped.
pub(crate) fn redirect_stdio(file: &File, target: &RedirectTarget) -> Result<Stdio, ShellError> {
    file.try_clone()
        .map(Stdio::from)
        .map_err(|source| ShellError::Redirect {
            path: target.path.clone(),
            source,
        })
}
