use crate::command::ExitCode;
use crate::history::{self, HistoryLog};
use std::env as stdenv;
use std::path::PathBuf;

/// Process-level configuration, captured once at startup.
///
/// The search path is never re-read during a session.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Directories searched, in order, for external commands (`PATH`).
    pub search_path: Vec<PathBuf>,
    /// Target of `cd ~` (`HOME`).
    pub home: Option<PathBuf>,
    /// History file loaded at startup and appended to on exit (`HISTFILE`).
    pub histfile: Option<PathBuf>,
}

impl Settings {
    /// Read `PATH`, `HOME` and `HISTFILE` from the process environment.
    pub fn from_process() -> Self {
        Self {
            search_path: stdenv::var_os("PATH")
                .map(|paths| parse_search_path(&paths))
                .unwrap_or_default(),
            home: stdenv::var_os("HOME").map(PathBuf::from),
            histfile: stdenv::var_os("HISTFILE")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }
}

/// Split a `PATH`-style value; an empty entry means the current directory.
pub fn parse_search_path(paths: &std::ffi::OsStr) -> Vec<PathBuf> {
    stdenv::split_paths(paths)
        .map(|dir| {
            if dir.as_os_str().is_empty() {
                PathBuf::from(".")
            } else {
                dir
            }
        })
        .collect()
}

/// Mutable session state threaded through builtins and the executor.
///
/// The environment contains:
/// - `settings`: search path, home directory and history file.
/// - `history`: the in-memory history log.
/// - `should_exit` / `exit_code`: set by `exit` for the interactive loop to act on.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub settings: Settings,
    pub history: HistoryLog,
    /// When set to true, indicates that an interactive loop should exit.
    pub should_exit: bool,
    pub exit_code: ExitCode,
}

impl Environment {
    /// Build a session; the history file, if configured and present, seeds the log.
    pub fn new(settings: Settings) -> Self {
        let history = match &settings.histfile {
            Some(path) if history::is_loadable(path) => HistoryLog::load(path)
                .unwrap_or_else(|err| {
                    tracing::warn!(path = %path.display(), %err, "could not load history file");
                    HistoryLog::new()
                }),
            _ => HistoryLog::new(),
        };
        Self {
            settings,
            history,
            should_exit: false,
            exit_code: 0,
        }
    }

    /// Capture the current process environment into a new session.
    pub fn from_process() -> Self {
        Self::new(Settings::from_process())
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.settings.search_path
    }

    /// Ask the interactive loop to terminate with `code`.
    pub fn request_exit(&mut self, code: ExitCode) {
        self.should_exit = true;
        self.exit_code = code;
    }

    /// Append unflushed history to the history file.
    ///
    /// Best effort: failures are logged and otherwise ignored.
    pub fn save_history(&mut self) {
        let Some(path) = self.settings.histfile.clone() else {
            return;
        };
        match self.history.append_to(&path) {
            Ok(written) => tracing::debug!(path = %path.display(), written, "saved history"),
            Err(err) => tracing::warn!(path = %path.display(), %err, "could not save history"),
        }
    }
}
