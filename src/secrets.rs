// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Secret resolution.
//!
//! Secrets reach the env files through environment variables. They are read
//! once, up front, into a [`Secrets`] record so that nothing further down the
//! job reads the process environment directly. There are no defaults: a
//! missing variable stops the run.

use crate::{config::SecretFileSpec, env_file::EnvFile};

use std::{
    collections::{BTreeMap, HashMap},
    env::VarError,
    fmt::{Debug, Formatter, Result as FmtResult},
};

/// Source of environment variables.
pub trait EnvSource {
    /// Lookup variable by name.
    ///
    /// # Errors
    ///
    /// - Return [`VarError::NotPresent`] if variable is not set.
    /// - Return [`VarError::NotUnicode`] if variable is set, but not valid
    ///   unicode.
    fn var(&self, name: &str) -> std::result::Result<String, VarError>;
}

/// Environment of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> std::result::Result<String, VarError> {
        std::env::var(name)
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> std::result::Result<String, VarError> {
        self.get(name).cloned().ok_or(VarError::NotPresent)
    }
}

/// Resolved secret values keyed by variable name.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Secrets {
    values: BTreeMap<String, String>,
}

impl Secrets {
    /// Resolve listing of variables from environment.
    ///
    /// # Errors
    ///
    /// - Return [`SecretsError::MissingVariable`] for the first variable that
    ///   is not set.
    /// - Return [`SecretsError::NotUnicode`] for the first variable that is
    ///   set, but not valid unicode.
    pub fn resolve<'a>(
        names: impl IntoIterator<Item = &'a str>,
        env: &impl EnvSource,
    ) -> Result<Self> {
        let mut values = BTreeMap::new();
        for name in names {
            let value = env.var(name).map_err(|err| match err {
                VarError::NotPresent => SecretsError::MissingVariable(name.to_string()),
                VarError::NotUnicode(_) => SecretsError::NotUnicode(name.to_string()),
            })?;
            values.insert(name.to_string(), value);
        }

        Ok(Self { values })
    }

    /// Lookup resolved value.
    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        self.values.get(name.as_ref()).map(String::as_str)
    }

    /// Build env file content for a secret file.
    ///
    /// # Errors
    ///
    /// - Return [`SecretsError::MissingVariable`] if spec names a variable
    ///   that was never resolved.
    pub fn env_file(&self, spec: &SecretFileSpec) -> Result<EnvFile> {
        spec.variables
            .iter()
            .map(|name| {
                self.get(name)
                    .map(|value| (name.as_str(), value))
                    .ok_or_else(|| SecretsError::MissingVariable(name.clone()))
            })
            .collect()
    }
}

// Values stay out of logs.
impl Debug for Secrets {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.debug_set().entries(self.values.keys()).finish()
    }
}

/// Secret resolution error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum SecretsError {
    /// Required environment variable is not set.
    #[error("environment variable {0:?} is not set")]
    MissingVariable(String),

    /// Required environment variable is not valid unicode.
    #[error("environment variable {0:?} is not valid unicode")]
    NotUnicode(String),
}

/// Friendly result alias :3
pub type Result<T, E = SecretsError> = std::result::Result<T, E>;
