// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Machine update jobs.
//!
//! A job brings one machine's compose services up to date by running its
//! [`MachineProfile`] in three phases:
//!
//! 1. Verify every required ZFS volume is mounted.
//! 2. Write every env file from resolved secrets.
//! 3. Bring up every compose file in the order listed.
//!
//! Each phase finishes before the next one starts, and the first failure
//! stops the job. Nothing is rolled back. If the third of five compose files
//! fails, the first two stay up and the last two are never attempted. Every
//! step can be safely repeated, so running the job again is the way to
//! recover.

use crate::{
    command::CommandRunner,
    compose::{compose_up, ComposeError},
    config::{MachineProfile, Registry},
    env_file::EnvFileError,
    mount::{check_mount, MountError},
    secrets::{EnvSource, Secrets, SecretsError},
};

use tracing::{debug, info, instrument};

/// Run update job of a machine profile.
///
/// # Errors
///
/// - Return [`UpdateError::Mount`] if a volume is not mounted.
/// - Return [`UpdateError::Secrets`] if a secret file needs an unresolved
///   variable.
/// - Return [`UpdateError::EnvFile`] if a secret file cannot be written.
/// - Return [`UpdateError::Compose`] if a compose file fails to come up.
#[instrument(skip_all, fields(working_dir = %profile.working_dir.display()), level = "debug")]
pub fn run_job(
    runner: &impl CommandRunner,
    profile: &MachineProfile,
    secrets: &Secrets,
) -> Result<()> {
    for volume in &profile.mounts {
        check_mount(runner, volume)?;
    }

    for spec in &profile.secret_files {
        secrets.env_file(spec)?.write(profile.resolve(&spec.path))?;
    }

    for path in profile.compose_paths() {
        compose_up(runner, path)?;
    }

    Ok(())
}

/// Resolve machine names to jobs and run them.
#[derive(Debug)]
pub struct Updater<R>
where
    R: CommandRunner,
{
    registry: Registry,
    runner: R,
}

impl<R> Updater<R>
where
    R: CommandRunner,
{
    /// Construct new updater.
    pub fn new(registry: Registry, runner: R) -> Self {
        Self { registry, runner }
    }

    /// Update target machine.
    ///
    /// Secrets are resolved from `env` after lookup, before the job starts.
    ///
    /// # Errors
    ///
    /// - Return [`UpdateError::UnknownMachine`] if machine has no profile.
    ///   Nothing is executed in this case.
    /// - Return [`UpdateError::Secrets`] if a required variable is not set.
    /// - Return any error of [`run_job`].
    pub fn update(&self, machine: impl AsRef<str>, env: &impl EnvSource) -> Result<()> {
        let machine = machine.as_ref();
        info!("starting docker update for {machine}");

        let profile = self
            .registry
            .lookup(machine)
            .ok_or_else(|| UpdateError::UnknownMachine(machine.to_string()))?;
        debug!("{profile:?}");

        let secrets = Secrets::resolve(profile.required_variables(), env)?;
        run_job(&self.runner, profile, &secrets)?;

        info!("docker update succeeded for {machine}");

        Ok(())
    }
}

/// Update error types.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// Machine name is not in registry.
    #[error("'{0}' is invalid or not supported")]
    UnknownMachine(String),

    #[error(transparent)]
    Mount(#[from] MountError),

    #[error(transparent)]
    Secrets(#[from] SecretsError),

    #[error(transparent)]
    EnvFile(#[from] EnvFileError),

    #[error(transparent)]
    Compose(#[from] ComposeError),
}

/// Friendly result alias :3
pub type Result<T, E = UpdateError> = std::result::Result<T, E>;
