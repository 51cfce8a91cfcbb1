//! In-memory command history with a flush cursor.
//!
//! Entries are only ever appended. `flushed_count` marks how many leading entries are
//! already durable in a history file and only moves forward after a successful write.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryLog {
    entries: Vec<String>,
    flushed_count: usize,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a log from a history file; everything loaded counts as flushed.
    pub fn load(path: &Path) -> io::Result<Self> {
        let mut log = Self::new();
        log.read_from(path)?;
        log.flushed_count = log.entries.len();
        Ok(log)
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn flushed_count(&self) -> usize {
        self.flushed_count
    }

    /// Entries not yet written by a flush.
    pub fn unflushed(&self) -> &[String] {
        &self.entries[self.flushed_count..]
    }

    /// The last `n` entries (all of them for `None`), paired with their 1-based
    /// position in the whole log.
    pub fn tail(&self, n: Option<usize>) -> impl Iterator<Item = (usize, &str)> {
        let skip = n.map_or(0, |n| self.entries.len().saturating_sub(n));
        self.entries
            .iter()
            .enumerate()
            .skip(skip)
            .map(|(i, entry)| (i + 1, entry.as_str()))
    }

    /// Append every line of `path` as a new entry. Returns how many were read.
    ///
    /// The log is left untouched if any line fails to read.
    pub fn read_from(&mut self, path: &Path) -> io::Result<usize> {
        let reader = BufReader::new(File::open(path)?);
        let lines = reader.lines().collect::<io::Result<Vec<_>>>()?;
        let count = lines.len();
        self.entries.extend(lines);
        Ok(count)
    }

    /// Overwrite `path` with the whole log.
    pub fn write_to(&mut self, path: &Path) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        write_entries(&mut out, &self.entries)?;
        out.flush()?;
        self.flushed_count = self.entries.len();
        Ok(())
    }

    /// Append the entries added since the last flush to `path`.
    ///
    /// Calling it again with nothing new appends nothing.
    pub fn append_to(&mut self, path: &Path) -> io::Result<usize> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut out = BufWriter::new(file);
        let pending = self.unflushed();
        write_entries(&mut out, pending)?;
        out.flush()?;
        let written = pending.len();
        self.flushed_count = self.entries.len();
        Ok(written)
    }
}

fn write_entries(out: &mut dyn Write, entries: &[String]) -> io::Result<()> {
    for entry in entries {
        writeln!(out, "{}", entry)?;
    }
    Ok(())
}

/// `true` when `path` names an existing regular file worth loading.
pub(crate) fn is_loadable(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}
