//! Command-name completion for the line editor.

use crate::builtin::Builtin;
use crate::external::list_executables;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Builtin names and search-path executables starting with `prefix`, sorted
/// lexicographically without duplicates.
pub fn completion_candidates(prefix: &str, search_path: &[PathBuf]) -> Vec<String> {
    let mut names: BTreeSet<String> = list_executables(search_path, prefix);
    names.extend(
        Builtin::ALL
            .iter()
            .map(|builtin| builtin.name())
            .filter(|name| name.starts_with(prefix))
            .map(str::to_string),
    );
    names.into_iter().collect()
}

/// Rustyline helper completing the word under the cursor.
///
/// Ambiguity handling (bell, then listing on the second press) is left to the
/// editor's list completion mode.
pub struct ShellHelper {
    search_path: Vec<PathBuf>,
}

impl ShellHelper {
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        Self { search_path }
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = word_start(line, pos);
        let candidates = completion_candidates(&line[start..pos], &self.search_path)
            .into_iter()
            .map(|name| Pair {
                replacement: format!("{} ", name),
                display: name,
            })
            .collect();
        Ok((start, candidates))
    }
}

/// Byte offset where the whitespace-delimited word ending at `pos` begins.
fn word_start(line: &str, pos: usize) -> usize {
    line[..pos]
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map_or(0, |(i, c)| i + c.len_utf8())
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}
