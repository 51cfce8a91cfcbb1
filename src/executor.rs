//! Running a [`Pipeline`]: builtin dispatch, process spawning, pipe wiring, reaping.
//!
//! Stages are dispatched left to right. A builtin runs synchronously and its output
//! text becomes the next stage's input; an external stage is spawned with its stdin
//! wired to the previous stage and its stdout to a pipe (or, on the final stage, to
//! the redirection target or the terminal). Consecutive external stages run
//! concurrently. Text destined for a child is written only after every stage has been
//! dispatched, then all children are reaped.
//!
//! Descriptor ownership: a pipe's read end is moved into the consumer's `Command`,
//! which is dropped right after spawning, so the parent never holds a pipe end a child
//! waits on. Redirection files stay open until every child is reaped. All of this is
//! released on every exit path, including an aborted pipeline.

use crate::builtin::Builtin;
use crate::command::{ExitCode, exit_code_of};
use crate::env::Environment;
use crate::error::ShellError;
use crate::external::{find_command_path, spawn_program};
use crate::io_adapters::{StageInput, open_redirect, redirect_stdio};
use crate::parser::{Pipeline, Redirection, Stage};
use std::fs::File;
use std::io::{self, Write};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};
use tracing::{debug, warn};

struct SpawnedStage {
    name: String,
    child: Child,
    is_last: bool,
}

/// Everything one pipeline invocation owns until it is finished.
#[derive(Default)]
struct PipelineRun {
    children: Vec<SpawnedStage>,
    /// Builtin output waiting to be written into a child's stdin.
    feeds: Vec<(ChildStdin, Vec<u8>)>,
    /// Redirection files, closed only after every child is reaped.
    redirect_files: Vec<File>,
}

impl PipelineRun {
    /// Feed pending text, wait for every child, then release redirection files.
    ///
    /// Returns the status of the final stage if it was an external process.
    fn finish(mut self) -> Option<ExitCode> {
        for (mut stdin, text) in self.feeds.drain(..) {
            if let Err(err) = stdin.write_all(&text) {
                if err.kind() != io::ErrorKind::BrokenPipe {
                    warn!(%err, "could not feed builtin output to next stage");
                }
            }
        }

        let mut last_status = None;
        for mut stage in self.children {
            match stage.child.wait() {
                Ok(status) => {
                    debug!(command = %stage.name, pid = stage.child.id(), %status, "reaped");
                    if stage.is_last {
                        last_status = Some(exit_code_of(status));
                    }
                }
                Err(err) => warn!(command = %stage.name, %err, "wait failed"),
            }
        }
        debug!(files = self.redirect_files.len(), "closing redirection targets");
        last_status
    }
}

/// Execute `pipeline`, writing the final stage's builtin output to `final_stdout`
/// unless it is redirected.
///
/// A stage naming an unknown command, or one that fails to start, aborts the
/// pipeline: no later stage is dispatched, already spawned stages are still reaped,
/// and the error is returned after cleanup.
pub(crate) fn execute_pipeline(
    pipeline: Pipeline,
    env: &mut Environment,
    final_stdout: &mut dyn Write,
) -> Result<ExitCode, ShellError> {
    let standalone = pipeline.command_count() == 1;
    let last_index = pipeline.stages.len().saturating_sub(1);
    let redirection = pipeline.redirection;

    let mut run = PipelineRun::default();
    let mut input = StageInput::Inherit;
    let mut status = 0;
    let mut failure = None;

    for (i, stage) in pipeline.stages.into_iter().enumerate() {
        let Some(name) = stage.command() else {
            debug!(stage = i, "skipping empty stage");
            continue;
        };
        let is_last = i == last_index;
        let no_redirection = Redirection::default();
        let stage_redirection = if is_last { &redirection } else { &no_redirection };

        let result = match Builtin::lookup(name) {
            Some(builtin) => {
                // builtins ignore their input; dropping it closes any pipe from the previous stage
                drop(std::mem::replace(&mut input, StageInput::Inherit));
                run_builtin(builtin, &stage, standalone, is_last, stage_redirection, env, final_stdout)
                    .map(|(code, output)| {
                        if let Some(text) = output {
                            input = StageInput::Text(text);
                        }
                        code
                    })
            }
            None => {
                let stage_input = std::mem::replace(&mut input, StageInput::Inherit);
                spawn_external(&stage, stage_input, is_last, stage_redirection, env, &mut run).map(
                    |next| {
                        if let Some(pipe) = next {
                            input = StageInput::Pipe(pipe);
                        }
                        0
                    },
                )
            }
        };

        match result {
            Ok(code) => status = code,
            Err(err) => {
                failure = Some(err);
                break;
            }
        }
    }

    // output of a final stage that was empty, or of the stage before an abort
    drop(input);
    let last_status = run.finish();

    match failure {
        Some(err) => Err(err),
        None => Ok(last_status.unwrap_or(status)),
    }
}

/// Run a builtin stage. Returns its status and, for a non-final stage, the text to
/// hand to the next stage.
fn run_builtin(
    builtin: Builtin,
    stage: &Stage,
    standalone: bool,
    is_last: bool,
    redirection: &Redirection,
    env: &mut Environment,
    final_stdout: &mut dyn Write,
) -> Result<(ExitCode, Option<Vec<u8>>), ShellError> {
    // `exit` inside a pipeline does not end the session
    if builtin == Builtin::Exit && !standalone {
        debug!("ignoring exit inside a pipeline");
        return Ok((0, (!is_last).then(Vec::new)));
    }

    let mut output = Vec::new();
    let code = builtin.run(stage.arguments(), &mut output, env)?;
    debug!(builtin = builtin.name(), code, bytes = output.len(), "builtin finished");

    if !is_last {
        return Ok((code, Some(output)));
    }

    match &redirection.stdout {
        Some(target) => open_redirect(target)?.write_all(&output)?,
        None => {
            final_stdout.write_all(&output)?;
            final_stdout.flush()?;
        }
    }
    // builtins produce no stderr text, but the target is still created or truncated
    if let Some(target) = &redirection.stderr {
        open_redirect(target)?;
    }
    Ok((code, None))
}

/// Resolve and spawn an external stage. Returns the read end of its stdout pipe when
/// it feeds another stage.
fn spawn_external(
    stage: &Stage,
    input: StageInput,
    is_last: bool,
    redirection: &Redirection,
    env: &Environment,
    run: &mut PipelineRun,
) -> Result<Option<ChildStdout>, ShellError> {
    let name = stage.command().unwrap_or_default();
    let program = find_command_path(env.search_path(), name)
        .ok_or_else(|| ShellError::CommandNotFound(name.to_string()))?
        .into_owned();

    let stdout = if !is_last {
        Stdio::piped()
    } else if let Some(target) = &redirection.stdout {
        let file = open_redirect(target)?;
        let stdio = redirect_stdio(&file, target)?;
        run.redirect_files.push(file);
        stdio
    } else {
        Stdio::inherit()
    };
    let stderr = match &redirection.stderr {
        Some(target) => {
            let file = open_redirect(target)?;
            let stdio = redirect_stdio(&file, target)?;
            run.redirect_files.push(file);
            stdio
        }
        None => Stdio::inherit(),
    };
    let (stdin, pending_text) = input.into_stdio();

    let mut child = spawn_program(&program, name, stage.arguments(), stdin, stdout, stderr)
        .map_err(|source| ShellError::Spawn {
            command: name.to_string(),
            source,
        })?;
    debug!(command = name, program = %program.display(), pid = child.id(), "spawned");

    if let Some(text) = pending_text {
        if let Some(child_stdin) = child.stdin.take() {
            run.feeds.push((child_stdin, text));
        }
    }
    let next = child.stdout.take();
    run.children.push(SpawnedStage {
        name: name.to_string(),
        child,
        is_last,
    });
    Ok(next)
}
