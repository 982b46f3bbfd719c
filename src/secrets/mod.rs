//! Secrets bootstrap (Doppler).
//!
//! Fetches the secrets document at startup and merges it into the
//! environment, keeping an encrypted copy on disk for when the API is down:
//! - `client` + `retry`: authenticated download with backoff
//! - `cipher`: AES-256-GCM records keyed from the service token
//! - `fallback`: the cache file itself
//! - `loader`: the decision logic

pub mod cipher;
pub mod client;
pub mod env_store;
pub mod error;
pub mod fallback;
pub mod loader;
pub mod retry;
pub mod types;

pub use cipher::Cipher;
pub use client::{DopplerClient, RemoteResponse, SecretsTransport};
pub use env_store::{EnvironmentStore, MemoryEnvironment, ProcessEnvironment};
pub use error::{BootstrapError, BootstrapResult};
pub use fallback::FallbackStore;
pub use loader::{load_secrets, load_secrets_blocking, load_secrets_with, SecretLoader};
pub use retry::{retry, RetryConfig, RetryableError};
pub use types::{redact_secret, LoadOutcome, SecretBundle, SecretSource, SecretToken};
