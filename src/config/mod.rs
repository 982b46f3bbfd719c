mod defaults;

pub use defaults::*;

use crate::secrets::{RetryConfig, SecretToken};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Bootstrap configuration, sourced from the process environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Doppler service token. `None` disables the whole pipeline.
    pub token: Option<SecretToken>,
    /// Where the encrypted copy of the last good bundle lives.
    pub fallback_file_path: Option<PathBuf>,
    /// API base URL the download path is joined onto.
    pub api_base_url: String,
    /// Timeout applied to each download attempt.
    pub request_timeout: Duration,
    /// Retry policy for transient transport failures.
    pub retry: RetryConfig,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config {
            token: lookup(ENV_TOKEN).and_then(SecretToken::from_env_value),
            fallback_file_path: lookup(ENV_FALLBACK_FILE_PATH)
                .and_then(non_blank)
                .map(PathBuf::from),
            ..Config::default()
        };

        if let Some(url) = lookup(ENV_API_URL).and_then(non_blank) {
            config.api_base_url = url;
        }

        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS).and_then(non_blank) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => warn!(
                    value = %raw,
                    "Ignoring invalid {ENV_REQUEST_TIMEOUT_SECS}, using default"
                ),
            }
        }

        debug!(
            enabled = config.is_enabled(),
            fallback = config.fallback_file_path.is_some(),
            api_base_url = %config.api_base_url,
            "Loaded bootstrap configuration"
        );

        config
    }

    /// Whether a token is configured.
    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// Replace the fallback path, e.g. from a command line flag.
    pub fn with_fallback_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.fallback_file_path = Some(path.into());
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            fallback_file_path: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry: RetryConfig::default(),
        }
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_is_disabled() {
        let config = Config::from_lookup(lookup_from(&[]));
        assert!(!config.is_enabled());
        assert!(config.fallback_file_path.is_none());
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(
            config.request_timeout,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
    }

    #[test]
    fn blank_token_is_disabled() {
        let config = Config::from_lookup(lookup_from(&[(ENV_TOKEN, "   ")]));
        assert!(!config.is_enabled());
    }

    #[test]
    fn token_and_fallback_are_read() {
        let config = Config::from_lookup(lookup_from(&[
            (ENV_TOKEN, "dp.st.dev.abc"),
            (ENV_FALLBACK_FILE_PATH, "/tmp/secrets.enc"),
        ]));
        assert!(config.is_enabled());
        assert_eq!(config.token.unwrap().expose(), "dp.st.dev.abc");
        assert_eq!(
            config.fallback_file_path,
            Some(PathBuf::from("/tmp/secrets.enc"))
        );
    }

    #[test]
    fn blank_fallback_path_is_ignored() {
        let config = Config::from_lookup(lookup_from(&[
            (ENV_TOKEN, "token"),
            (ENV_FALLBACK_FILE_PATH, ""),
        ]));
        assert!(config.fallback_file_path.is_none());
    }

    #[test]
    fn api_url_and_timeout_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            (ENV_API_URL, "http://127.0.0.1:9000/v3/"),
            (ENV_REQUEST_TIMEOUT_SECS, "3"),
        ]));
        assert_eq!(config.api_base_url, "http://127.0.0.1:9000/v3/");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn invalid_timeout_keeps_default() {
        for raw in ["soon", "0", "-1"] {
            let config = Config::from_lookup(lookup_from(&[(ENV_REQUEST_TIMEOUT_SECS, raw)]));
            assert_eq!(
                config.request_timeout,
                Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
            );
        }
    }

    #[test]
    fn fallback_flag_overrides_environment() {
        let config = Config::from_lookup(lookup_from(&[(ENV_FALLBACK_FILE_PATH, "/a")]))
            .with_fallback_file_path("/b");
        assert_eq!(config.fallback_file_path, Some(PathBuf::from("/b")));
    }
}
