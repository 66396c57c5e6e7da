// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Machine registry layout.
//!
//! Every machine that can be updated is described by a __machine profile__:
//! the ZFS volumes it needs mounted, the env files it needs written, and the
//! compose files it needs brought up. Profiles are plain data, one executor
//! runs all of them.
//!
//! # General Layout
//!
//! A registry is a TOML table of profiles keyed by machine name:
//!
//! ```toml
//! [machine.jeeves-jr]
//! working_dir = "/ZFS/Main/Docker/jeeves-jr"
//! mounts = [{ pool = "Main", dataset = "Docker" }]
//! compose_files = ["docker-compose.yml"]
//!
//! [[machine.jeeves-jr.secret_file]]
//! path = "cloudflare_tunnel.env"
//! variables = ["TUNNEL_TOKEN"]
//! ```
//!
//! Relative secret file and compose file paths are resolved against the
//! working directory of their profile. All paths go through shell expansion
//! when parsed. Unknown keys are rejected, so a mistyped `mounts` cannot
//! silently drop a mount requirement.
//!
//! Commands are split on whitespace without any quoting. Thus, the working
//! directory, compose file paths, and pool or dataset names must not contain
//! whitespace.
//!
//! # Registry Lookup
//!
//! [`Registry::discover`] picks the registry to use:
//!
//! 1. The registry file passed explicitly, if any.
//! 2. `$XDG_CONFIG_HOME/docker-update/machines.toml`, if it exists.
//! 3. [`Registry::builtin`], the profiles of the homelab machines.

use crate::{mount::Volume, path::default_registry_path};

use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs::read_to_string,
    iter::once,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// Set of machine profiles keyed by machine name.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Registry {
    /// Machine profiles.
    #[serde(rename = "machine", default)]
    pub machines: BTreeMap<String, MachineProfile>,
}

impl Registry {
    /// Profiles of the homelab machines.
    pub fn builtin() -> Self {
        let mut machines = BTreeMap::new();
        machines.insert(
            "jeeves-jr".into(),
            MachineProfile {
                working_dir: "/ZFS/Main/Docker/jeeves-jr".into(),
                mounts: vec![Volume::new("Main", "Docker")],
                secret_files: vec![SecretFileSpec::new(
                    "cloudflare_tunnel.env",
                    ["TUNNEL_TOKEN"],
                )],
                compose_files: vec!["docker-compose.yml".into()],
            },
        );
        machines.insert(
            "jeeves".into(),
            MachineProfile {
                working_dir: "/ZFS/Media/Docker/Docker/jeeves".into(),
                mounts: vec![Volume::new("Media", "Docker"), Volume::new("Storage", "Main")],
                secret_files: vec![
                    SecretFileSpec::new(
                        "postgres/postgres.env",
                        ["POSTGRES_USER", "POSTGRES_PASSWORD"],
                    ),
                    SecretFileSpec::new(
                        "qbittorrent/vpn.env",
                        ["PIA_USERNAME", "PIA_PASSWORD", "LAN_NETWORK"],
                    ),
                ],
                compose_files: vec![
                    "endlessh/docker-compose.yml".into(),
                    "sccache/docker-compose.yml".into(),
                    "postgres/docker-compose.yml".into(),
                    "qbittorrent/docker-compose.yml".into(),
                ],
            },
        );

        Self { machines }
    }

    /// Load registry from TOML file.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if file cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file is not a valid registry.
    /// - Return [`ConfigError::ShellExpansion`] if a path cannot be expanded.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        read_to_string(path.as_ref())
            .map_err(|err| ConfigError::Read {
                source: err,
                path: path.as_ref().to_path_buf(),
            })?
            .parse()
    }

    /// Select registry to use.
    ///
    /// An explicit path always wins, and must be readable. Otherwise the
    /// default registry path is used if a file exists there, falling back to
    /// the built-in registry.
    ///
    /// # Errors
    ///
    /// - Return any error of [`Registry::load`] for the selected file.
    pub fn discover(explicit: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = explicit {
            debug!("using machine registry at {}", path.display());
            return Self::load(path);
        }

        match default_registry_path() {
            Ok(path) if path.exists() => {
                debug!("using machine registry at {}", path.display());
                Self::load(path)
            }
            _ => {
                debug!("using built-in machine registry");
                Ok(Self::builtin())
            }
        }
    }

    /// Lookup profile by exact machine name.
    pub fn lookup(&self, machine: impl AsRef<str>) -> Option<&MachineProfile> {
        self.machines.get(machine.as_ref())
    }
}

impl FromStr for Registry {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut registry: Registry = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        for profile in registry.machines.values_mut() {
            profile.working_dir = expand_path(&profile.working_dir)?;
            for secret_file in &mut profile.secret_files {
                secret_file.path = expand_path(&secret_file.path)?;
            }
            for compose_file in &mut profile.compose_files {
                *compose_file = expand_path(compose_file)?;
            }
        }

        // INVARIANT: Anything that ends up on a command line has no whitespace.
        for (machine, profile) in &registry.machines {
            let paths = once(profile.working_dir.clone())
                .chain(profile.compose_paths())
                .map(|path| path.to_string_lossy().into_owned());
            let names = profile
                .mounts
                .iter()
                .flat_map(|volume| [volume.pool.clone(), volume.dataset.clone()]);

            if let Some(value) = paths
                .chain(names)
                .find(|value| value.contains(char::is_whitespace))
            {
                return Err(ConfigError::Whitespace {
                    machine: machine.clone(),
                    value,
                });
            }
        }

        Ok(registry)
    }
}

/// Everything one machine needs to be updated.
///
/// # Invariant
///
/// - All mounts are verified before any secret file is written or any compose
///   file is brought up.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachineProfile {
    /// Directory that relative paths are resolved against.
    pub working_dir: PathBuf,

    /// Volumes that must be mounted, checked in order.
    #[serde(default)]
    pub mounts: Vec<Volume>,

    /// Env files to write, in order.
    #[serde(rename = "secret_file", default)]
    pub secret_files: Vec<SecretFileSpec>,

    /// Compose files to bring up, in order.
    #[serde(default)]
    pub compose_files: Vec<PathBuf>,
}

impl MachineProfile {
    /// Resolve path relative to working directory.
    ///
    /// Absolute paths are returned as is.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.working_dir.join(path)
    }

    /// Absolute paths of compose files in order.
    pub fn compose_paths(&self) -> Vec<PathBuf> {
        self.compose_files
            .iter()
            .map(|path| self.resolve(path))
            .collect()
    }

    /// Every environment variable the profile reads, without duplicates.
    pub fn required_variables(&self) -> Vec<&str> {
        let mut variables: Vec<&str> = Vec::new();
        for name in self
            .secret_files
            .iter()
            .flat_map(|spec| spec.variables.iter())
        {
            if !variables.contains(&name.as_str()) {
                variables.push(name.as_str());
            }
        }

        variables
    }
}

/// Env file to write from environment variables.
///
/// Each variable becomes a `NAME=value` line, in the order listed.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretFileSpec {
    /// Target path of env file.
    pub path: PathBuf,

    /// Environment variables to write.
    pub variables: Vec<String>,
}

impl SecretFileSpec {
    /// Construct new secret file specification.
    pub fn new(
        path: impl Into<PathBuf>,
        variables: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            path: path.into(),
            variables: variables.into_iter().map(Into::into).collect(),
        }
    }
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read registry file.
    #[error("failed to read machine registry at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize registry.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to perform shell expansion on registry path.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Registry value would be split apart on the command line.
    #[error("machine {machine:?} has whitespace in {value:?}")]
    Whitespace { machine: String, value: String },
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
