// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! ZFS mount verification.
//!
//! Each ZFS dataset that a machine needs is mounted through a systemd mount
//! unit named `ZFS-{pool}-{dataset}.mount`. Before touching anything on a
//! machine, every required unit must report `active (mounted)` through
//! `systemctl status`. This is a point-in-time check. Nothing waits for a
//! unit to come up.

use crate::command::{CommandError, CommandRunner};

use serde::Deserialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::info;

const MOUNTED_PATTERN: &str = "active (mounted)";

/// ZFS dataset that must be mounted.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Volume {
    /// Name of the ZFS pool.
    pub pool: String,

    /// Name of the dataset inside the pool.
    pub dataset: String,
}

impl Volume {
    /// Construct new volume identifier.
    pub fn new(pool: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            pool: pool.into(),
            dataset: dataset.into(),
        }
    }

    /// Name of systemd mount unit backing this volume.
    pub fn unit_name(&self) -> String {
        format!("{self}.mount")
    }
}

impl Display for Volume {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "ZFS-{}-{}", self.pool, self.dataset)
    }
}

/// Verify that a volume is mounted.
///
/// # Errors
///
/// - Return [`MountError::NotMounted`] if status output does not report the
///   unit as mounted. Takes priority over a bad exit code.
/// - Return [`MountError::ExitStatus`] if status query exits nonzero.
/// - Return [`MountError::Command`] if status query cannot be run at all.
pub fn check_mount(runner: &impl CommandRunner, volume: &Volume) -> Result<()> {
    info!("checking if {volume} is up");

    let result = runner.run(&format!("systemctl status {}", volume.unit_name()))?;

    if !result.output.contains(MOUNTED_PATTERN) {
        return Err(MountError::NotMounted {
            volume: volume.to_string(),
            output: result.output,
            exit_code: result.exit_code,
        });
    }

    if !result.success() {
        return Err(MountError::ExitStatus {
            volume: volume.to_string(),
            output: result.output,
            exit_code: result.exit_code,
        });
    }

    info!("{volume} is up");

    Ok(())
}

/// Mount verification error types.
#[derive(Debug, thiserror::Error)]
pub enum MountError {
    /// Mount unit is not reported as mounted.
    #[error("{volume} is not up with output: {output} returncode: {exit_code}")]
    NotMounted {
        volume: String,
        output: String,
        exit_code: i32,
    },

    /// Mount unit looks mounted, but status query still failed.
    #[error("{volume} status check failed with output: {output} returncode: {exit_code}")]
    ExitStatus {
        volume: String,
        output: String,
        exit_code: i32,
    },

    /// Status query could not be run.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Friendly result alias :3
pub type Result<T, E = MountError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{fake::ScriptedRunner, CommandOutput};
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    #[test]
    fn check_mount_queries_zfs_mount_unit() -> anyhow::Result<()> {
        let runner = ScriptedRunner::new([CommandOutput::new(
            "● ZFS-my_pool-my_data_set.mount\n   Active: active (mounted) since Mon",
            0,
        )]);

        check_mount(&runner, &Volume::new("my_pool", "my_data_set"))?;
        assert_eq!(
            runner.calls(),
            vec!["systemctl status ZFS-my_pool-my_data_set.mount"]
        );

        Ok(())
    }

    #[test_case("active (mounted)", 0, true; "mounted")]
    #[test_case("active (mounted)", 3, false; "mounted but nonzero exit")]
    #[test_case("inactive", 0, false; "inactive")]
    #[test_case("inactive (dead)", 3, false; "dead")]
    #[test_case("", 4, false; "no such unit")]
    #[test]
    fn check_mount_requires_pattern_and_zero_exit(output: &str, exit_code: i32, expect: bool) {
        let runner = ScriptedRunner::new([CommandOutput::new(output, exit_code)]);
        let result = check_mount(&runner, &Volume::new("Main", "Docker"));
        pretty_assertions::assert_eq!(result.is_ok(), expect);
    }

    #[test]
    fn check_mount_reports_missing_pattern_first() {
        let runner = ScriptedRunner::new([CommandOutput::new("inactive", 3)]);
        let result = check_mount(&runner, &Volume::new("Main", "Docker"));
        assert!(matches!(result, Err(MountError::NotMounted { exit_code: 3, .. })));
    }

    #[test]
    fn check_mount_error_names_unit_and_output() {
        let runner = ScriptedRunner::new([CommandOutput::new("inactive", 0)]);
        let error = check_mount(&runner, &Volume::new("my_pool", "my_data_set"))
            .unwrap_err()
            .to_string();
        assert_eq!(
            error,
            "ZFS-my_pool-my_data_set is not up with output: inactive returncode: 0"
        );
    }

    #[test]
    fn check_mount_distinguishes_bad_exit_code() {
        let runner = ScriptedRunner::new([CommandOutput::new("active (mounted)", 1)]);
        let error = check_mount(&runner, &Volume::new("Storage", "Main")).unwrap_err();
        assert!(matches!(error, MountError::ExitStatus { exit_code: 1, .. }));
        assert!(error.to_string().contains("ZFS-Storage-Main"));
    }
}
