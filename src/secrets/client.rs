//! Doppler secrets download client.
//!
//! Performs one authenticated GET against the secrets download endpoint,
//! retrying transient transport failures. Any HTTP status is handed back to
//! the caller untouched.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::error::{BootstrapError, BootstrapResult};
use super::retry::{retry, RetryConfig};
use super::types::SecretToken;
use crate::config::{Config, SECRETS_DOWNLOAD_PATH};

/// Status and body of a download attempt that reached the server.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: Bytes,
}

impl RemoteResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can fetch the raw secrets document.
#[async_trait]
pub trait SecretsTransport: Send + Sync {
    /// Display name for logging.
    fn name(&self) -> &str;

    /// Fetch the secrets document. `Err` means no response was obtained.
    async fn download(&self, token: &SecretToken) -> BootstrapResult<RemoteResponse>;
}

/// HTTP transport against the Doppler API.
#[derive(Debug, Clone)]
pub struct DopplerClient {
    http: Client,
    download_url: Url,
    retry: RetryConfig,
}

impl DopplerClient {
    pub fn new(base_url: &str, timeout: Duration, retry: RetryConfig) -> BootstrapResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .build()?;

        Ok(Self {
            http,
            download_url: download_url(base_url)?,
            retry,
        })
    }

    pub fn from_config(config: &Config) -> BootstrapResult<Self> {
        Self::new(
            &config.api_base_url,
            config.request_timeout,
            config.retry.clone(),
        )
    }
}

#[async_trait]
impl SecretsTransport for DopplerClient {
    fn name(&self) -> &str {
        "doppler"
    }

    #[instrument(skip_all, fields(url = %self.download_url))]
    async fn download(&self, token: &SecretToken) -> BootstrapResult<RemoteResponse> {
        let response = retry(&self.retry, || async {
            let response = self
                .http
                .get(self.download_url.clone())
                .basic_auth(token.expose(), Some(""))
                .send()
                .await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(RemoteResponse { status, body })
        })
        .await?;

        debug!(
            status = response.status,
            bytes = response.body.len(),
            "Secrets API responded"
        );
        Ok(response)
    }
}

/// Join the download path onto `base_url`, treating the base as a directory.
fn download_url(base_url: &str) -> BootstrapResult<Url> {
    let invalid = |message: String| BootstrapError::InvalidUrl {
        url: base_url.to_string(),
        message,
    };

    let mut base = base_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }

    let base = Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
    if base.cannot_be_a_base() {
        return Err(invalid("URL cannot be used as a base".to_string()));
    }
    base.join(SECRETS_DOWNLOAD_PATH)
        .map_err(|e| invalid(e.to_string()))
}

fn user_agent() -> String {
    format!("doppler-bootstrap/{}", env!("CARGO_PKG_VERSION"))
}
