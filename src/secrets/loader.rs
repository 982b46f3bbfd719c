//! Startup loader: fetch secrets, fall back to the encrypted cache.
//!
//! One call does the whole job:
//! 1. no token -> nothing happens
//! 2. API answers with success -> apply, then refresh the cache
//! 3. API rejects or is unreachable -> apply the cache, if there is one
//!
//! Unavailability is absorbed. A corrupt response or cache is not: it is
//! returned so the host can halt startup.

use tracing::{debug, error, info, warn};

use super::cipher::Cipher;
use super::client::{DopplerClient, SecretsTransport};
use super::env_store::{EnvironmentStore, ProcessEnvironment};
use super::error::{BootstrapError, BootstrapResult};
use super::fallback::FallbackStore;
use super::types::{LoadOutcome, SecretBundle, SecretSource, SecretToken};
use crate::config::Config;

/// Ties the transport, the fallback cache and the cipher together.
pub struct SecretLoader<T> {
    token: Option<SecretToken>,
    transport: T,
    fallback: FallbackStore,
    cipher: Cipher,
}

impl SecretLoader<DopplerClient> {
    /// Build a loader that talks to the Doppler API described by `config`.
    pub fn from_config(config: &Config) -> BootstrapResult<Self> {
        Ok(Self::new(config, DopplerClient::from_config(config)?))
    }
}

impl<T: SecretsTransport> SecretLoader<T> {
    pub fn new(config: &Config, transport: T) -> Self {
        Self {
            token: config.token.clone(),
            transport,
            fallback: FallbackStore::new(config.fallback_file_path.clone()),
            cipher: Cipher::default(),
        }
    }

    /// Use a cipher with a non-default work factor.
    pub fn with_cipher(mut self, cipher: Cipher) -> Self {
        self.cipher = cipher;
        self
    }

    /// Fetch secrets and merge them into `env`.
    pub async fn fetch_environment_variables<E>(&self, env: &mut E) -> BootstrapResult<LoadOutcome>
    where
        E: EnvironmentStore + ?Sized,
    {
        let Some(token) = self.token.as_ref() else {
            debug!("No token configured, skipping secrets bootstrap");
            return Ok(LoadOutcome::Disabled);
        };

        match self.transport.download(token).await {
            Ok(response) if response.is_success() => {
                let bundle = SecretBundle::parse(&response.body, SecretSource::Remote)?;
                env.apply(&bundle);
                info!(
                    transport = self.transport.name(),
                    keys = bundle.len(),
                    "Loaded secrets from secrets API"
                );
                self.store_fallback(token, &response.body);
                Ok(LoadOutcome::Remote {
                    keys: bundle.keys().map(String::from).collect(),
                })
            }
            Ok(response) => {
                warn!(
                    transport = self.transport.name(),
                    status = response.status,
                    "Secrets API rejected the request, trying fallback file"
                );
                self.use_fallback_if_present(token, env)
            }
            Err(e) => {
                warn!(
                    transport = self.transport.name(),
                    error = %e,
                    "Secrets API unreachable, trying fallback file"
                );
                self.use_fallback_if_present(token, env)
            }
        }
    }

    /// Encrypt and persist the body exactly as fetched. Failures are logged
    /// and swallowed: the secrets are already applied.
    fn store_fallback(&self, token: &SecretToken, body: &[u8]) {
        let Some(path) = self.fallback.path() else {
            return;
        };

        let result = self
            .cipher
            .encrypt(body, token)
            .and_then(|record| self.fallback.write(&record));

        match result {
            Ok(()) => debug!(path = %path.display(), "Refreshed fallback file"),
            Err(e) => error!(
                path = %path.display(),
                error = %e,
                "Failed to refresh fallback file, continuing with fetched secrets"
            ),
        }
    }

    fn use_fallback_if_present<E>(
        &self,
        token: &SecretToken,
        env: &mut E,
    ) -> BootstrapResult<LoadOutcome>
    where
        E: EnvironmentStore + ?Sized,
    {
        let Some(record) = self.fallback.read()? else {
            match self.fallback.path() {
                Some(path) => warn!(path = %path.display(), "Fallback file not found, no secrets loaded"),
                None => warn!("No fallback file configured, no secrets loaded"),
            }
            return Ok(LoadOutcome::Unavailable);
        };

        let plaintext = self.cipher.decrypt(&record, token)?;
        let bundle = SecretBundle::parse(&plaintext, SecretSource::Fallback)?;
        env.apply(&bundle);

        info!(keys = bundle.len(), "Loaded secrets from fallback file");
        Ok(LoadOutcome::Fallback {
            keys: bundle.keys().map(String::from).collect(),
        })
    }
}

/// Load secrets described by the process environment into the process
/// environment. Call once, before other initialization.
pub async fn load_secrets() -> BootstrapResult<LoadOutcome> {
    load_secrets_with(&Config::from_env(), &mut ProcessEnvironment::new()).await
}

/// Load secrets with an explicit configuration and target environment.
pub async fn load_secrets_with<E>(config: &Config, env: &mut E) -> BootstrapResult<LoadOutcome>
where
    E: EnvironmentStore + ?Sized,
{
    if !config.is_enabled() {
        debug!("No token configured, skipping secrets bootstrap");
        return Ok(LoadOutcome::Disabled);
    }
    SecretLoader::from_config(config)?
        .fetch_environment_variables(env)
        .await
}

/// Blocking form of [`load_secrets`] for synchronous startup code.
///
/// Drives the load on a private current-thread runtime; must not be called
/// from inside an async context.
pub fn load_secrets_blocking() -> BootstrapResult<LoadOutcome> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(BootstrapError::Runtime)?;
    runtime.block_on(load_secrets())
}
