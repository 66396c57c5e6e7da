// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Refresh Docker Compose services on homelab machines.
//!
//! Each machine has a fixed set of ZFS volumes that must be mounted, env files
//! holding secrets, and compose files to bring up. Updating a machine checks
//! the mounts, writes the env files, then recreates and rebuilds every compose
//! project in order. The first failure stops the update.

pub mod command;
pub mod compose;
pub mod config;
pub mod env_file;
pub mod job;
pub mod mount;
pub mod path;
pub mod secrets;

pub use command::{CommandOutput, CommandRunner, SystemRunner};
pub use config::{MachineProfile, Registry, SecretFileSpec};
pub use job::{run_job, UpdateError, Updater};
pub use secrets::{EnvSource, ProcessEnv, Secrets};
