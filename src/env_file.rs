// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Env file serialization.
//!
//! Containers pick up their secrets from env files sitting next to their
//! compose files. An env file is a plain listing of `KEY=VALUE` lines, one per
//! entry, with a trailing newline.
//!
//! # Pitfalls
//!
//! Files are written in place with default permissions. They hold plaintext
//! secrets, so whoever can read the directory can read the secrets. Parent
//! directories are never created here; they belong to the compose project.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::write,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Ordered listing of env file entries.
///
/// # Invariant
///
/// - Keys are unique. Inserting an existing key replaces its value, keeping
///   its original position.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnvFile {
    entries: Vec<(String, String)>,
}

impl EnvFile {
    /// Construct new empty env file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, old)) => *old = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Lookup value of entry.
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key.as_ref())
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over entry keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Env file has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write env file to target path, replacing whatever was there.
    ///
    /// # Errors
    ///
    /// - Return [`EnvFileError::Write`] if file cannot be written.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        info!("creating env file at path: {}", path.as_ref().display());
        debug!("env file keys: {:?}", self.keys().collect::<Vec<_>>());

        write_env_blob(path, self.to_string())
    }
}

impl Display for EnvFile {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let lines = self
            .entries
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>();

        writeln!(fmt, "{}", lines.join("\n"))
    }
}

impl<K, V> FromIterator<(K, V)> for EnvFile
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut env_file = Self::new();
        for (key, value) in iter {
            env_file.insert(key, value);
        }

        env_file
    }
}

/// Write preformatted env file content verbatim.
///
/// # Errors
///
/// - Return [`EnvFileError::Write`] if file cannot be written.
pub fn write_env_blob(path: impl AsRef<Path>, blob: impl AsRef<str>) -> Result<()> {
    write(path.as_ref(), blob.as_ref().as_bytes()).map_err(|err| EnvFileError::Write {
        source: err,
        path: path.as_ref().to_path_buf(),
    })
}

/// Env file error types.
#[derive(Debug, thiserror::Error)]
pub enum EnvFileError {
    /// Env file could not be written.
    #[error("failed to write env file at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = EnvFileError> = std::result::Result<T, E>;
