use crate::command::ExitCode;
use crate::env::Environment;
use crate::error::ShellError;
use crate::external::find_command_path;
use argh::{EarlyExit, FromArgs};
use std::env as stdenv;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed with [`argh`] (`FromArgs`) and executed in-process. They never
/// touch a file descriptor themselves: output goes to the provided writer, which the
/// executor routes to the terminal, the next stage or a redirection target.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Executes the command, writing its output text to `stdout`.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode, ShellError>;
}

/// The fixed builtin set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Echo,
    Cd,
    Pwd,
    Type,
    History,
    Exit,
}

impl Builtin {
    pub const ALL: [Builtin; 6] = [
        Builtin::Echo,
        Builtin::Cd,
        Builtin::Pwd,
        Builtin::Type,
        Builtin::History,
        Builtin::Exit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Echo => Echo::name(),
            Builtin::Cd => Cd::name(),
            Builtin::Pwd => Pwd::name(),
            Builtin::Type => Type::name(),
            Builtin::History => History::name(),
            Builtin::Exit => Exit::name(),
        }
    }

    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    /// Parse `args` and run the builtin.
    ///
    /// Argument and execution errors become part of the output text and a non-zero
    /// status; only a failure to write that text is returned as an error.
    pub fn run(
        self,
        args: &[String],
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> io::Result<ExitCode> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match self {
            Builtin::Echo => dispatch::<Echo>(&args, stdout, env),
            Builtin::Cd => dispatch::<Cd>(&args, stdout, env),
            Builtin::Pwd => dispatch::<Pwd>(&args, stdout, env),
            Builtin::Type => dispatch::<Type>(&args, stdout, env),
            Builtin::History => dispatch::<History>(&args, stdout, env),
            Builtin::Exit => dispatch::<Exit>(&args, stdout, env),
        }
    }
}

fn dispatch<T: BuiltinCommand>(
    args: &[&str],
    stdout: &mut dyn Write,
    env: &mut Environment,
) -> io::Result<ExitCode> {
    match T::from_args(&[T::name()], args) {
        Ok(cmd) => match cmd.execute(stdout, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stdout, "{}", e)?;
                Ok(e.exit_code())
            }
        },
        Err(EarlyExit { output, status }) => {
            stdout.write_all(output.as_bytes())?;
            if !output.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
            Ok(if status.is_err() { 2 } else { 0 })
        }
    }
}

/// Write the arguments to standard output, separated by single spaces.
///
/// Arguments are taken verbatim: no options, no escape interpretation.
pub struct Echo {
    pub args: Vec<String>,
}

impl FromArgs for Echo {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Echo {
            args: args.iter().map(|arg| arg.to_string()).collect(),
        })
    }
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode, ShellError> {
        writeln!(stdout, "{}", self.args.join(" "))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; `~` stands for the home directory. Does nothing when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode, ShellError> {
        let Some(target) = self.target else {
            return Ok(0);
        };
        let path = expand_home(&target, env.settings.home.as_deref());
        stdenv::set_current_dir(&path).map_err(|source| ShellError::Filesystem {
            context: "cd",
            path,
            source,
        })?;
        Ok(0)
    }
}

/// Expand a leading `~` to `home`; other paths are returned unchanged.
fn expand_home(target: &str, home: Option<&Path>) -> PathBuf {
    match (target, home) {
        ("~", Some(home)) => home.to_path_buf(),
        (t, Some(home)) if t.starts_with("~/") => home.join(&t[2..]),
        (t, _) => PathBuf::from(t),
    }
}

#[derive(FromArgs)]
/// Print the current working directory.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode, ShellError> {
        let cwd = stdenv::current_dir()?;
        writeln!(stdout, "{}", cwd.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Describe how each name would be interpreted if used as a command.
pub struct Type {
    #[argh(positional)]
    /// command names to look up.
    pub names: Vec<String>,
}

impl BuiltinCommand for Type {
    fn name() -> &'static str {
        "type"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode, ShellError> {
        let mut code = 0;
        for name in &self.names {
            // builtins shadow executables of the same name
            if Builtin::lookup(name).is_some() {
                writeln!(stdout, "{} is a shell builtin", name)?;
            } else if let Some(path) = find_command_path(env.search_path(), name) {
                writeln!(stdout, "{} is {}", name, path.display())?;
            } else {
                writeln!(stdout, "{}: not found", name)?;
                code = 1;
            }
        }
        Ok(code)
    }
}

#[derive(FromArgs)]
/// Display or manipulate the history list.
pub struct History {
    #[argh(option, short = 'r')]
    /// append the lines of a file to the history list.
    pub read: Option<PathBuf>,

    #[argh(option, short = 'w')]
    /// write the whole history list to a file, replacing its contents.
    pub write: Option<PathBuf>,

    #[argh(option, short = 'a')]
    /// append the entries added since the last flush to a file.
    pub append: Option<PathBuf>,

    #[argh(positional)]
    /// show only the last COUNT entries; zero or a non-number shows all.
    pub count: Option<String>,
}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode, ShellError> {
        let file_ops = [&self.read, &self.write, &self.append]
            .iter()
            .filter(|op| op.is_some())
            .count();
        if file_ops > 1 {
            return Err(ShellError::Usage(
                "history: cannot use more than one of -r, -w, -a".to_string(),
            ));
        }

        let history_err = |path: PathBuf| {
            move |source: io::Error| ShellError::Filesystem {
                context: "history",
                path,
                source,
            }
        };
        if let Some(path) = self.read {
            env.history.read_from(&path).map_err(history_err(path))?;
            return Ok(0);
        }
        if let Some(path) = self.write {
            env.history.write_to(&path).map_err(history_err(path))?;
            return Ok(0);
        }
        if let Some(path) = self.append {
            env.history.append_to(&path).map_err(history_err(path))?;
            return Ok(0);
        }

        // a count that is zero or not a number lists everything
        let count = self
            .count
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|&n| n > 0);
        for (number, entry) in env.history.tail(count) {
            writeln!(stdout, "{} {}", number, entry)?;
        }
        Ok(0)
    }
}

/// Leave the shell, saving history first. Takes an optional numeric status.
pub struct Exit {
    pub code: ExitCode,
}

impl FromArgs for Exit {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        let usage = |output: String| EarlyExit {
            output,
            status: Err(()),
        };
        match args {
            [] => Ok(Exit { code: 0 }),
            [raw] => raw
                .parse::<ExitCode>()
                .map(|code| Exit { code })
                .map_err(|_| usage(format!("exit: {}: numeric argument required", raw))),
            _ => Err(usage("exit: too many arguments".to_string())),
        }
    }
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode, ShellError> {
        env.request_exit(self.code);
        Ok(self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Settings;
    use crate::test_support::lock_current_dir;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn env_with_path(search_path: Vec<PathBuf>) -> Environment {
        Environment::new(Settings {
            search_path,
            ..Settings::default()
        })
    }

    fn run(builtin: Builtin, args: &[&str], env: &mut Environment) -> (ExitCode, String) {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let mut out = Vec::new();
        let code = builtin.run(&args, &mut out, env).unwrap();
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_lookup_covers_every_name() {
        for builtin in Builtin::ALL {
            assert_eq!(Builtin::lookup(builtin.name()), Some(builtin));
        }
        assert_eq!(Builtin::lookup("cat"), None);
    }

    #[test]
    fn test_echo_joins_arguments_verbatim() {
        let mut env = env_with_path(vec![]);
        assert_eq!(
            run(Builtin::Echo, &["hello", "world"], &mut env),
            (0, "hello world\n".to_string())
        );
        assert_eq!(
            run(Builtin::Echo, &["-n", "--help", "a\\tb"], &mut env).1,
            "-n --help a\\tb\n"
        );
        assert_eq!(run(Builtin::Echo, &[], &mut env).1, "\n");
    }

    #[test]
    fn test_pwd_prints_current_dir() {
        let _lock = lock_current_dir();
        let cur = stdenv::current_dir().unwrap();
        let mut env = env_with_path(vec![]);
        let (code, out) = run(Builtin::Pwd, &[], &mut env);
        assert_eq!(code, 0);
        assert_eq!(out, format!("{}\n", cur.display()));
    }

    #[test]
    fn test_cd_changes_directory_and_expands_home() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let canonical_temp = fs::canonicalize(temp.path()).unwrap();
        fs::create_dir(canonical_temp.join("sub")).unwrap();

        let mut env = Environment::new(Settings {
            home: Some(canonical_temp.clone()),
            ..Settings::default()
        });

        let (code, out) = run(Builtin::Cd, &["~"], &mut env);
        assert_eq!((code, out.as_str()), (0, ""));
        assert_eq!(fs::canonicalize(stdenv::current_dir().unwrap()).unwrap(), canonical_temp);

        run(Builtin::Cd, &["~/sub"], &mut env);
        assert_eq!(
            fs::canonicalize(stdenv::current_dir().unwrap()).unwrap(),
            canonical_temp.join("sub")
        );

        stdenv::set_current_dir(orig).expect("failed to restore cwd");
    }

    #[test]
    fn test_cd_without_argument_is_noop() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let mut env = env_with_path(vec![]);
        assert_eq!(run(Builtin::Cd, &[], &mut env), (0, String::new()));
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_nonexistent_path_reports_error() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let mut env = env_with_path(vec![]);

        let name = format!("/nonexistent_dir_for_cd_test_{}", std::process::id());
        let (code, out) = run(Builtin::Cd, &[&name], &mut env);
        assert_eq!(code, 1);
        assert_eq!(out, format!("cd: {}: No such file or directory\n", name));
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_to_regular_file_reports_not_a_directory() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        let mut env = env_with_path(vec![]);
        let (code, out) = run(Builtin::Cd, &[file.to_str().unwrap()], &mut env);
        assert_eq!(code, 1);
        assert_eq!(out, format!("cd: {}: Not a directory\n", file.display()));
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_and_pwd_reject_extra_arguments() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().to_str().unwrap();
        let mut env = env_with_path(vec![]);

        let (code, out) = run(Builtin::Cd, &[target, "extra"], &mut env);
        assert_eq!(code, 2);
        assert!(out.contains("extra"));
        assert_eq!(stdenv::current_dir().unwrap(), orig);

        let (code, out) = run(Builtin::Pwd, &["extra"], &mut env);
        assert_eq!(code, 2);
        assert!(out.contains("extra"));
    }

    #[test]
    fn test_type_prefers_builtins_over_executables() {
        let temp = tempfile::tempdir().unwrap();
        for name in ["echo", "mytool"] {
            let path = temp.path().join(name);
            fs::write(&path, "#!/bin/sh\n").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        let mut env = env_with_path(vec![temp.path().to_path_buf()]);

        let (code, out) = run(Builtin::Type, &["echo", "mytool", "missing_cmd"], &mut env);
        assert_eq!(code, 1);
        assert_eq!(
            out,
            format!(
                "echo is a shell builtin\nmytool is {}\nmissing_cmd: not found\n",
                temp.path().join("mytool").display()
            )
        );
        assert_eq!(run(Builtin::Type, &["type"], &mut env).1, "type is a shell builtin\n");
    }

    #[test]
    fn test_history_lists_last_entries_with_absolute_numbers() {
        let mut env = env_with_path(vec![]);
        for entry in ["echo a", "echo b", "echo c"] {
            env.history.push(entry);
        }
        assert_eq!(
            run(Builtin::History, &["2"], &mut env).1,
            "2 echo b\n3 echo c\n"
        );
        assert_eq!(
            run(Builtin::History, &[], &mut env).1,
            "1 echo a\n2 echo b\n3 echo c\n"
        );
    }

    #[test]
    fn test_history_zero_or_non_numeric_count_lists_everything() {
        let mut env = env_with_path(vec![]);
        env.history.push("echo a");
        env.history.push("echo b");
        for count in ["0", "many"] {
            assert_eq!(
                run(Builtin::History, &[count], &mut env),
                (0, "1 echo a\n2 echo b\n".to_string())
            );
        }
    }

    #[test]
    fn test_history_write_read_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("hist");
        let file_arg = file.to_str().unwrap();

        let mut env = env_with_path(vec![]);
        for entry in ["ls", "cd /tmp", "echo 'x | y'"] {
            env.history.push(entry);
        }
        assert_eq!(run(Builtin::History, &["-w", file_arg], &mut env).0, 0);
        assert_eq!(env.history.flushed_count(), 3);

        let mut fresh = env_with_path(vec![]);
        assert_eq!(run(Builtin::History, &["-r", file_arg], &mut fresh).0, 0);
        assert_eq!(fresh.history.entries(), env.history.entries());
    }

    #[test]
    fn test_history_append_twice_appends_once() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("hist");
        let file_arg = file.to_str().unwrap();

        let mut env = env_with_path(vec![]);
        env.history.push("one");
        env.history.push("two");
        run(Builtin::History, &["-a", file_arg], &mut env);
        run(Builtin::History, &["-a", file_arg], &mut env);
        assert_eq!(fs::read_to_string(&file).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_history_read_missing_file_is_reported() {
        let mut env = env_with_path(vec![]);
        let (code, out) = run(Builtin::History, &["-r", "/no/such/history"], &mut env);
        assert_eq!(code, 1);
        assert_eq!(out, "history: /no/such/history: No such file or directory\n");
        assert!(env.history.is_empty());
    }

    #[test]
    fn test_history_rejects_several_file_operations() {
        let mut env = env_with_path(vec![]);
        let (code, out) = run(Builtin::History, &["-r", "a", "-w", "b"], &mut env);
        assert_eq!(code, 2);
        assert!(out.starts_with("history: cannot use more than one"));
    }

    #[test]
    fn test_exit_requests_termination_with_code() {
        let mut env = env_with_path(vec![]);
        assert_eq!(run(Builtin::Exit, &[], &mut env).0, 0);
        assert!(env.should_exit);

        let mut env = env_with_path(vec![]);
        run(Builtin::Exit, &["3"], &mut env);
        assert!(env.should_exit);
        assert_eq!(env.exit_code, 3);
    }

    #[test]
    fn test_exit_with_malformed_code_does_not_exit() {
        let mut env = env_with_path(vec![]);
        let (code, out) = run(Builtin::Exit, &["abc"], &mut env);
        assert_eq!(code, 2);
        assert_eq!(out, "exit: abc: numeric argument required\n");
        assert!(!env.should_exit);

        let (_, out) = run(Builtin::Exit, &["1", "2"], &mut env);
        assert_eq!(out, "exit: too many arguments\n");
        assert!(!env.should_exit);
    }
}
