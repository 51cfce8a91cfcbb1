use argh::FromArgs;
use pipeshell::{Environment, Interpreter, Settings};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "PIPESHELL_LOG";

/// A small interactive shell with pipelines, redirection and history.
#[derive(FromArgs)]
struct Cli {
    /// execute a single command line and exit with its status
    #[argh(option, short = 'c')]
    command: Option<String>,

    /// history file to load at startup and append to on exit (overrides HISTFILE)
    #[argh(option)]
    histfile: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli: Cli = argh::from_env();
    init_logging();

    let mut settings = Settings::from_process();
    if let Some(histfile) = cli.histfile {
        settings.histfile = Some(histfile);
    }
    let mut sh = Interpreter::new(Environment::new(settings));

    let code = match cli.command {
        Some(line) => {
            let mut stdout = io::stdout();
            match sh.execute_line(&line, &mut stdout) {
                Ok(code) if sh.env().should_exit => {
                    tracing::debug!(code, "exit requested");
                    sh.env().exit_code
                }
                Ok(code) => code,
                Err(err) => {
                    eprintln!("{}", err);
                    err.exit_code()
                }
            }
        }
        None => sh.repl()?,
    };
    std::process::exit(code)
}
