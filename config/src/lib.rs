//! Configuration loading and shared configuration types for the rule
//! consolidation job.
//!
//! Configuration is assembled from `configuration/base.yaml`, an
//! environment-specific overlay selected via `APP_ENVIRONMENT`, and
//! `APP_`-prefixed environment variables. See [`load::load_config`].

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

pub mod environment;
pub mod load;
pub mod shared;

/// A secret string that supports serialization.
///
/// Wraps [`SecretString`] so secrets stay redacted in debug output while still
/// round-tripping through serde, which the hierarchical config loader needs.
#[derive(Clone)]
pub struct SerializableSecretString(SecretString);

impl SerializableSecretString {
    /// Returns the inner secret value.
    ///
    /// Callers must take care not to log or persist the returned value.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for SerializableSecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SerializableSecretString([REDACTED])")
    }
}

impl From<String> for SerializableSecretString {
    fn from(value: String) -> Self {
        Self(SecretString::new(value))
    }
}

impl From<SecretString> for SerializableSecretString {
    fn from(value: SecretString) -> Self {
        Self(value)
    }
}

impl Serialize for SerializableSecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.expose_secret())
    }
}

impl<'de> Deserialize<'de> for SerializableSecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self(SecretString::new(value)))
    }
}
