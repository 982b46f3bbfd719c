//! Default configuration constants used across the system.

/// Default Doppler API base URL. Must end with `/` so relative joins keep
/// the version segment.
pub const DEFAULT_API_BASE_URL: &str = "https://api.doppler.com/v3/";

/// Secrets download endpoint, relative to the API base URL.
pub const SECRETS_DOWNLOAD_PATH: &str = "configs/config/secrets/download?format=json";

/// Default per-attempt request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Total download attempts (first try plus retries).
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry.
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 300;

/// Backoff factor applied to each subsequent retry delay.
pub const DEFAULT_RETRY_BACKOFF_FACTOR: f64 = 2.0;

/// PBKDF2 iterations for the fallback cache key.
pub const DEFAULT_KDF_ITERATIONS: u32 = 1 << 16;

/// Environment variable holding the Doppler service token.
pub const ENV_TOKEN: &str = "DOPPLER_TOKEN";

/// Environment variable holding the fallback cache path.
pub const ENV_FALLBACK_FILE_PATH: &str = "DOPPLER_FALLBACK_FILE_PATH";

/// Environment variable overriding the API base URL.
pub const ENV_API_URL: &str = "DOPPLER_API_URL";

/// Environment variable overriding the request timeout, in seconds.
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "DOPPLER_REQUEST_TIMEOUT_SECS";
