//! Core types for the secret bootstrap pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use zeroize::Zeroizing;

use super::error::{BootstrapError, BootstrapResult};

// ============================================================================
// Credentials
// ============================================================================

/// A Doppler service token.
///
/// Never printed: `Debug` is redacted and the backing memory is wiped on drop.
#[derive(Clone)]
pub struct SecretToken(Zeroizing<String>);

impl SecretToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Zeroizing::new(token.into()))
    }

    /// Build a token from a raw environment value. Blank values yield `None`.
    pub fn from_env_value(value: String) -> Option<Self> {
        if value.trim().is_empty() {
            None
        } else {
            Some(Self::new(value))
        }
    }

    /// The raw token, for authentication and key derivation only.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretToken([REDACTED])")
    }
}

// ============================================================================
// Bundle
// ============================================================================

/// Where a bundle came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretSource {
    /// Live response from the secrets API.
    Remote,
    /// Decrypted fallback cache file.
    Fallback,
}

impl fmt::Display for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretSource::Remote => f.write_str("secrets API"),
            SecretSource::Fallback => f.write_str("fallback file"),
        }
    }
}

/// A flat set of secrets, ready to be merged into an environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretBundle {
    entries: BTreeMap<String, String>,
}

impl SecretBundle {
    /// Parse a JSON object of string keys to string values.
    ///
    /// Every entry is validated before the bundle is returned, so a bundle
    /// either applies completely or not at all.
    pub fn parse(bytes: &[u8], source: SecretSource) -> BootstrapResult<Self> {
        let entries: BTreeMap<String, String> =
            serde_json::from_slice(bytes).map_err(|error| BootstrapError::Parse {
                source_kind: source,
                error,
            })?;

        for (key, value) in &entries {
            if let Some(reason) = invalid_entry_reason(key, value) {
                return Err(BootstrapError::InvalidEntry {
                    source_kind: source,
                    key: key.clone(),
                    reason,
                });
            }
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn invalid_entry_reason(key: &str, value: &str) -> Option<&'static str> {
    if key.is_empty() {
        Some("variable name is empty")
    } else if key.contains('=') {
        Some("variable name contains '='")
    } else if key.contains('\0') {
        Some("variable name contains a NUL byte")
    } else if value.contains('\0') {
        Some("value contains a NUL byte")
    } else {
        None
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Which branch a load took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// No token configured; nothing was attempted.
    Disabled,
    /// Secrets were fetched from the API and applied.
    Remote { keys: Vec<String> },
    /// The API was unavailable; cached secrets were applied.
    Fallback { keys: Vec<String> },
    /// The API was unavailable and no fallback file could be used.
    Unavailable,
}

impl LoadOutcome {
    /// Source of the applied secrets, if any were applied.
    pub fn source(&self) -> Option<SecretSource> {
        match self {
            LoadOutcome::Remote { .. } => Some(SecretSource::Remote),
            LoadOutcome::Fallback { .. } => Some(SecretSource::Fallback),
            LoadOutcome::Disabled | LoadOutcome::Unavailable => None,
        }
    }

    /// Names of the variables that were applied.
    pub fn keys(&self) -> &[String] {
        match self {
            LoadOutcome::Remote { keys } | LoadOutcome::Fallback { keys } => keys,
            LoadOutcome::Disabled | LoadOutcome::Unavailable => &[],
        }
    }
}

impl fmt::Display for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadOutcome::Disabled => f.write_str("no token configured, secrets bootstrap disabled"),
            LoadOutcome::Remote { keys } => {
                write!(f, "loaded {} secret(s) from the secrets API", keys.len())
            }
            LoadOutcome::Fallback { keys } => write!(
                f,
                "secrets API unavailable, loaded {} secret(s) from the fallback file",
                keys.len()
            ),
            LoadOutcome::Unavailable => {
                f.write_str("secrets API unavailable and no fallback file, nothing loaded")
            }
        }
    }
}

/// Redact a secret value for display (show first 2 and last 2 chars).
pub fn redact_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 6 {
        return "***".to_string();
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}…{tail}")
}

// ============================================================================
// Tests
// ============================================================================
