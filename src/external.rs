//! Locating and launching external programs.

use nix::unistd::{AccessFlags, access};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - A name containing a path separator (`/usr/bin/env`, `./run.sh`, `bin/tool`) is
///   checked as given.
/// - A bare name is looked up in each directory of `search_paths`, in order; the first
///   executable regular file wins.
/// - Empty name: returns `None`.
///
/// Nothing is cached, so each call reflects the filesystem at that moment.
pub fn find_command_path<'a>(search_paths: &[PathBuf], name: &'a str) -> Option<Cow<'a, Path>> {
    if name.is_empty() {
        return None;
    }
    let path = Path::new(name);
    if name.contains('/') {
        return find_by_path(path).map(Cow::Borrowed);
    }
    find_in_path(search_paths, name).map(Cow::Owned)
}

fn find_in_path(search_paths: &[PathBuf], cmd: &str) -> Option<PathBuf> {
    search_paths
        .iter()
        .map(|dir| dir.join(cmd))
        .find(|candidate| is_executable(candidate))
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if is_executable(path) { Some(path) } else { None }
}

/// A regular file the current user may execute.
pub fn is_executable(path: &Path) -> bool {
    let is_file = fs::metadata(path).map(|m| m.is_file()).unwrap_or(false);
    is_file && access(path, AccessFlags::X_OK).is_ok()
}

/// Names of executables on the search path starting with `prefix`, sorted and
/// deduplicated. Unreadable or missing directories are skipped.
pub fn list_executables(search_paths: &[PathBuf], prefix: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for dir in search_paths {
        let Ok(entries) = fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with(prefix) && is_executable(&entry.path()) {
                names.insert(name);
            }
        }
    }
    names
}

/// Start `program` with `argv[0]` set to `name` as the user typed it.
///
/// The `Command`, and with it the parent's copies of any descriptors moved into
/// `stdin`/`stdout`/`stderr`, is dropped before this returns.
pub(crate) fn spawn_program(
    program: &Path,
    name: &str,
    args: &[String],
    stdin: Stdio,
    stdout: Stdio,
    stderr: Stdio,
) -> io::Result<Child> {
    Command::new(program)
        .arg0(name)
        .args(args)
        .stdin(stdin)
        .stdout(stdout)
        .stderr(stderr)
        .spawn()
}
