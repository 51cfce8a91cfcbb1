use crate::command::ExitCode;
use crate::completion::ShellHelper;
use crate::env::Environment;
use crate::error::ShellError;
use crate::executor;
use crate::lexer;
use crate::parser;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Editor};
use std::io::{self, Write};
use tracing::{debug, info};

const PROMPT: &str = "$ ";

/// A shell-like interpreter executing pipelines of builtin and external commands.
///
/// The interpreter owns an [`Environment`] and runs lines against it, either one at
/// a time through [`Interpreter::execute_line`] or interactively through
/// [`Interpreter::repl`].
///
/// Example
/// ```
/// use pipeshell::{Environment, Interpreter, Settings};
/// let settings = Settings { histfile: None, ..Settings::from_process() };
/// let mut sh = Interpreter::new(Environment::new(settings));
/// let mut out = Vec::new();
/// let code = sh.execute_line("echo hello world", &mut out).unwrap();
/// assert_eq!(code, 0);
/// assert_eq!(out, b"hello world\n");
/// ```
pub struct Interpreter {
    env: Environment,
}

impl Interpreter {
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Tokenize, parse and execute one line.
    ///
    /// Builtin output of the final stage goes to `stdout`; external programs write to
    /// the process's own standard output unless redirected. The line is not recorded
    /// in history. Returns the status of the final stage.
    pub fn execute_line(&mut self, line: &str, stdout: &mut dyn Write) -> Result<ExitCode, ShellError> {
        let tokens = lexer::split_into_tokens(line)?;
        if tokens.is_empty() {
            return Ok(0);
        }
        let pipeline = parser::construct_pipeline(tokens)?;
        debug!(stages = pipeline.stages.len(), "parsed pipeline");
        executor::execute_pipeline(pipeline, &mut self.env, stdout)
    }

    /// Record a non-empty line in history, execute it and report any error on stderr.
    ///
    /// Returns the status of the line; blank lines leave history untouched and yield 0.
    pub fn handle_line(&mut self, line: &str) -> ExitCode {
        let line = line.trim();
        if line.is_empty() {
            return 0;
        }
        self.env.history.push(line);
        let mut stdout = io::stdout();
        match self.execute_line(line, &mut stdout) {
            Ok(code) => code,
            Err(err) => {
                eprintln!("{}", err);
                err.exit_code()
            }
        }
    }

    /// Interactive Read-Eval-Print Loop.
    ///
    /// Runs until `exit` or end of input, then appends this session's history to the
    /// history file. Returns the code the shell should exit with.
    pub fn repl(&mut self) -> anyhow::Result<ExitCode> {
        let config = Config::builder()
            .completion_type(CompletionType::List)
            .auto_add_history(false)
            .build();
        let mut rl: Editor<ShellHelper, DefaultHistory> = Editor::with_config(config)?;
        rl.set_helper(Some(ShellHelper::new(self.env.search_path().to_vec())));
        for entry in self.env.history.entries() {
            rl.add_history_entry(entry.as_str())?;
        }

        while !self.env.should_exit {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.trim())?;
                    }
                    self.handle_line(&line);
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    info!("end of input");
                    self.env.request_exit(0);
                }
                Err(err) => {
                    self.shutdown();
                    return Err(err.into());
                }
            }
        }

        self.shutdown();
        Ok(self.env.exit_code)
    }

    /// Flush this session's history to the history file.
    pub fn shutdown(&mut self) {
        self.env.save_history();
    }
}

impl Default for Interpreter {
    /// An interpreter configured from the process environment.
    fn default() -> Self {
        Self::new(Environment::from_process())
    }
}
