// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External command execution.
//!
//! Every interaction with `systemctl` or `docker` goes through a
//! [`CommandRunner`]. The runner only reports what happened. It never treats a
//! nonzero exit code as an error, so callers decide what an exit code means
//! for their own step.
//!
//! Command lines are split on whitespace. There is no quoting or escaping
//! support, so arguments cannot contain spaces.

use std::process::Command;
use tracing::debug;

/// Captured result of one command execution.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output of the command as lossy UTF-8.
    pub output: String,

    /// Exit code of the command, or `-1` if it was terminated by a signal.
    pub exit_code: i32,
}

impl CommandOutput {
    /// Construct new command output.
    pub fn new(output: impl Into<String>, exit_code: i32) -> Self {
        Self {
            output: output.into(),
            exit_code,
        }
    }

    /// Command exited with code zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Execute command lines.
pub trait CommandRunner {
    /// Run a whitespace separated command line to completion.
    ///
    /// Blocks until the child process exits. No timeout applies.
    ///
    /// # Errors
    ///
    /// - Return [`CommandError::Empty`] if command line has no program.
    /// - Return [`CommandError::Spawn`] if the process cannot be run.
    fn run(&self, command: &str) -> Result<CommandOutput>;
}

impl<R> CommandRunner for &R
where
    R: CommandRunner + ?Sized,
{
    fn run(&self, command: &str) -> Result<CommandOutput> {
        (**self).run(command)
    }
}

/// Runs commands as child processes of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    /// Construct new system command runner.
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &str) -> Result<CommandOutput> {
        let mut tokens = command.split_whitespace();
        let program = tokens.next().ok_or(CommandError::Empty)?;

        debug!("running {command:?}");
        let output = Command::new(program)
            .args(tokens)
            .output()
            .map_err(|err| CommandError::Spawn {
                source: err,
                command: command.to_string(),
            })?;

        let stderr = String::from_utf8_lossy(output.stderr.as_slice());
        if !stderr.is_empty() {
            debug!("stderr of {command:?}: {stderr}");
        }

        Ok(CommandOutput {
            output: String::from_utf8_lossy(output.stdout.as_slice()).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

/// Command execution error types.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Command line did not name a program.
    #[error("cannot run empty command line")]
    Empty,

    /// Process could not be spawned or waited on.
    #[error("failed to run command {command:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        command: String,
    },
}

/// Friendly result alias :3
pub type Result<T, E = CommandError> = std::result::Result<T, E>;
