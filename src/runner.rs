//! Subprocess execution for `run-example` and `deploy`.
//!
//! An entry's `cli_args` become a [`CommandSpec`]; the child inherits the
//! parent environment with the entry's `env` laid over it and runs from the
//! examples root. Every way a run can go wrong short of a broken wait loop is
//! reported as a [`RunOutcome`], not an error.

use crate::catalog::Entry;
use anyhow::{Context, Result, bail};
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    pub fn from_entry(entry: &Entry) -> Result<Self> {
        let Some((program, args)) = entry.cli_args.as_deref().and_then(<[String]>::split_first)
        else {
            bail!("{} has no command to run", entry.repo_relative_path);
        };
        Ok(Self {
            program: OsString::from(program),
            args: args.iter().map(OsString::from).collect(),
        })
    }

    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|part| part.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Success { elapsed: Duration },
    /// `code` is `None` when the child died from a signal.
    Failed { code: Option<i32>, elapsed: Duration },
    TimedOut { elapsed: Duration },
    SpawnFailed { error: String, elapsed: Duration },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success { .. })
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            RunOutcome::Success { elapsed }
            | RunOutcome::Failed { elapsed, .. }
            | RunOutcome::TimedOut { elapsed }
            | RunOutcome::SpawnFailed { elapsed, .. } => *elapsed,
        }
    }

    /// One-line human summary, e.g. `Success after 1.25s`.
    pub fn describe(&self) -> String {
        let secs = self.elapsed().as_secs_f64();
        match self {
            RunOutcome::Success { .. } => format!("Success after {secs:.2}s"),
            RunOutcome::Failed {
                code: Some(code), ..
            } => format!("Failed after {secs:.2}s with return code {code}"),
            RunOutcome::Failed { code: None, .. } => {
                format!("Failed after {secs:.2}s: terminated by signal")
            }
            RunOutcome::TimedOut { .. } => format!("Timed out after {secs:.2}s"),
            RunOutcome::SpawnFailed { error, .. } => {
                format!("Failed after {secs:.2}s with exception: {error}")
            }
        }
    }
}

/// Run `entry` from `cwd`, killing it once `timeout` has elapsed.
pub fn run_entry(entry: &Entry, cwd: &Path, timeout: Option<Duration>) -> Result<RunOutcome> {
    let spec = CommandSpec::from_entry(entry)?;
    let mut command = Command::new(&spec.program);
    command.args(&spec.args);
    command.current_dir(cwd);
    command.envs(&entry.env);
    debug!(example = %entry.repo_relative_path, command = %spec.display(), "spawning example");

    let started = Instant::now();
    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            let error = format!("{}: {err}", spec.program.to_string_lossy());
            warn!(example = %entry.repo_relative_path, %error, "failed to start example");
            return Ok(RunOutcome::SpawnFailed {
                error,
                elapsed: started.elapsed(),
            });
        }
    };

    loop {
        if let Some(status) = child
            .try_wait()
            .with_context(|| format!("waiting for {}", spec.display()))?
        {
            let outcome = finished(status, started.elapsed());
            info!(
                example = %entry.repo_relative_path,
                outcome = %outcome.describe(),
                "example finished"
            );
            return Ok(outcome);
        }
        if timeout.is_some_and(|limit| started.elapsed() >= limit) {
            // The child may exit between try_wait and kill; either way it is gone.
            let _ = child.kill();
            child
                .wait()
                .with_context(|| format!("reaping {}", spec.display()))?;
            let elapsed = started.elapsed();
            warn!(
                example = %entry.repo_relative_path,
                secs = elapsed.as_secs_f64(),
                "example timed out"
            );
            return Ok(RunOutcome::TimedOut { elapsed });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn finished(status: ExitStatus, elapsed: Duration) -> RunOutcome {
    if status.success() {
        RunOutcome::Success { elapsed }
    } else {
        RunOutcome::Failed {
            code: status.code(),
            elapsed,
        }
    }
}
