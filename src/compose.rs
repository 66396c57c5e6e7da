// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Docker Compose invocation.

use crate::command::{CommandError, CommandRunner};

use std::path::Path;
use tracing::{debug, info};

/// Recreate and rebuild every service of a compose file in detached mode.
///
/// Returns once `docker compose` itself returns. Containers are not waited on
/// to become healthy.
///
/// # Errors
///
/// - Return [`ComposeError::Failed`] if `docker compose up` exits nonzero.
/// - Return [`ComposeError::Command`] if `docker` cannot be run at all.
pub fn compose_up(runner: &impl CommandRunner, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    info!("running docker compose up with path: {}", path.display());

    let result = runner.run(&format!(
        "docker compose -f {} up --force-recreate --build -d",
        path.display()
    ))?;
    debug!(
        "docker compose up output: {} returncode: {}",
        result.output, result.exit_code
    );

    if !result.success() {
        return Err(ComposeError::Failed {
            exit_code: result.exit_code,
            output: result.output,
        });
    }

    info!("docker compose succeeded");

    Ok(())
}

/// Docker Compose error types.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// `docker compose up` exited nonzero.
    #[error("docker compose up failed with return code: {exit_code} and output: {output}")]
    Failed { exit_code: i32, output: String },

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Friendly result alias :3
pub type Result<T, E = ComposeError> = std::result::Result<T, E>;
