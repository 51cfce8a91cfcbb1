//! Turning a token sequence into a [`Pipeline`].
//!
//! Tokens are partitioned at every `|` into stages, and the final stage has its
//! output-redirection operators removed and recorded in a [`Redirection`]. Earlier
//! stages are left untouched: a `>` there is an ordinary argument.
//!
//! Tokens are plain strings by the time they get here, so a quoted `'|'` or `'>'`
//! is indistinguishable from the operator and is treated as one.

use std::path::PathBuf;
use thiserror::Error;

/// Token separating pipeline stages.
pub const PIPE: &str = "|";

/// Errors that can occur while building a pipeline from tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsingError {
    /// A redirection operator was the last token, with no target after it.
    #[error("syntax error near unexpected token `newline' after `{0}'")]
    MissingRedirectTarget(String),
}

/// Kind of redirection operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// `>` or `1>`: standard output, truncating the target.
    Output,
    /// `>>` or `1>>`: standard output, appending to the target.
    Append,
    /// `2>`: standard error, truncating the target.
    ErrorOutput,
    /// `2>>`: standard error, appending to the target.
    ErrorAppend,
}

impl RedirectKind {
    /// Recognize a redirection operator token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            ">" | "1>" => Some(RedirectKind::Output),
            ">>" | "1>>" => Some(RedirectKind::Append),
            "2>" => Some(RedirectKind::ErrorOutput),
            "2>>" => Some(RedirectKind::ErrorAppend),
            _ => None,
        }
    }

    fn is_append(self) -> bool {
        matches!(self, RedirectKind::Append | RedirectKind::ErrorAppend)
    }
}

/// A file a stream is redirected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub path: PathBuf,
    /// Open in append mode instead of truncating.
    pub append: bool,
}

/// Redirections attached to the final stage of a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirection {
    pub stdout: Option<RedirectTarget>,
    pub stderr: Option<RedirectTarget>,
}

/// One command plus its arguments within a pipeline.
///
/// A stage may be empty (from `| |`, a leading or trailing `|`, or a final stage made
/// only of redirections); the executor skips those.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stage {
    argv: Vec<String>,
}

impl Stage {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }

    /// The command name, `None` for an empty stage.
    pub fn command(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// Arguments following the command name.
    pub fn arguments(&self) -> &[String] {
        self.argv.get(1..).unwrap_or(&[])
    }
}

/// An ordered, non-empty chain of stages; stage *i* feeds stage *i + 1*.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
    /// Applies to the last stage only.
    pub redirection: Redirection,
}

impl Pipeline {
    /// Number of stages that actually name a command.
    pub fn command_count(&self) -> usize {
        self.stages.iter().filter(|stage| !stage.is_empty()).count()
    }
}

/// Split tokens at every `|` into per-stage argument vectors.
///
/// Always returns at least one (possibly empty) segment.
pub fn split_pipeline(tokens: Vec<String>) -> Vec<Vec<String>> {
    let mut segments = vec![Vec::new()];
    for token in tokens {
        if token == PIPE {
            segments.push(Vec::new());
        } else if let Some(current) = segments.last_mut() {
            current.push(token);
        }
    }
    segments
}

/// Remove redirection operators and their targets from `argv`, left to right.
///
/// A later operator for the same stream replaces an earlier one, append mode included.
pub fn extract_redirections(argv: &mut Vec<String>) -> Result<Redirection, ParsingError> {
    let mut redirection = Redirection::default();
    let mut i = 0;
    while i < argv.len() {
        let Some(kind) = RedirectKind::from_token(&argv[i]) else {
            i += 1;
            continue;
        };
        if i + 1 >= argv.len() {
            return Err(ParsingError::MissingRedirectTarget(argv[i].clone()));
        }
        let path = argv.remove(i + 1);
        argv.remove(i);
        let target = RedirectTarget {
            path: PathBuf::from(path),
            append: kind.is_append(),
        };
        match kind {
            RedirectKind::Output | RedirectKind::Append => redirection.stdout = Some(target),
            RedirectKind::ErrorOutput | RedirectKind::ErrorAppend => {
                redirection.stderr = Some(target)
            }
        }
    }
    Ok(redirection)
}

/// Builds a [`Pipeline`] from the tokens of one input line.
///
/// Redirections are extracted from the final stage before anything runs, so a
/// malformed redirection rejects the whole line.
pub fn construct_pipeline(tokens: Vec<String>) -> Result<Pipeline, ParsingError> {
    let mut segments = split_pipeline(tokens);
    let redirection = match segments.last_mut() {
        Some(last) => extract_redirections(last)?,
        None => Redirection::default(),
    };
    Ok(Pipeline {
        stages: segments.into_iter().map(Stage::new).collect(),
        redirection,
    })
}
