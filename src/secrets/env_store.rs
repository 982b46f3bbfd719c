//! Environment stores that a secret bundle is merged into.

use std::collections::HashMap;

use super::types::SecretBundle;

/// A key-value environment that secrets are written into.
pub trait EnvironmentStore {
    /// Set `key` to `value`, overwriting any existing value.
    fn set(&mut self, key: &str, value: &str);

    /// Merge every entry of `bundle`. Keys not in the bundle are untouched.
    fn apply(&mut self, bundle: &SecretBundle) {
        for (key, value) in bundle.iter() {
            self.set(key, value);
        }
    }
}

/// The real process environment.
///
/// Writes go through `std::env::set_var`, which is only sound while no other
/// thread reads the environment; call it before spawning workers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl ProcessEnvironment {
    pub fn new() -> Self {
        Self
    }
}

impl EnvironmentStore for ProcessEnvironment {
    fn set(&mut self, key: &str, value: &str) {
        std::env::set_var(key, value);
    }
}

/// An in-memory environment, used by `check` and in tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryEnvironment {
    vars: HashMap<String, String>,
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for MemoryEnvironment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvironmentStore for MemoryEnvironment {
    fn set(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }
}
