use crate::error::{IsRetryable, PushError};
use backon::{ExponentialBuilder, Retryable};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error};
use url::Url;

/// Tokens are refreshed this long before the upstream expiry.
const EXPIRY_SKEW: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Supplies bearer tokens for the FCM API.
pub struct AccessTokenSource {
    inner: Source,
}

enum Source {
    /// Fixed token from configuration.
    Static(String),
    /// GCE metadata-server style endpoint, cached until shortly before expiry.
    Metadata {
        client: reqwest::Client,
        url: Url,
        retry_policy: ExponentialBuilder,
        cached: Mutex<Option<CachedToken>>,
    },
}

impl AccessTokenSource {
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            inner: Source::Static(token.into()),
        }
    }

    pub fn metadata(client: reqwest::Client, url: Url) -> Self {
        let retry_policy = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(3)
            .with_jitter();

        Self {
            inner: Source::Metadata {
                client,
                url,
                retry_policy,
                cached: Mutex::new(None),
            },
        }
    }

    pub async fn bearer(&self) -> Result<String, PushError> {
        match &self.inner {
            Source::Static(token) => Ok(token.clone()),
            Source::Metadata {
                client,
                url,
                retry_policy,
                cached,
            } => {
                let mut slot = cached.lock().await;
                if let Some(token) = slot.as_ref()
                    && Instant::now() < token.refresh_at
                {
                    return Ok(token.value.clone());
                }

                let fresh = (|| async { fetch_metadata_token(client, url).await })
                    .retry(*retry_policy)
                    .when(|e: &PushError| e.is_retryable())
                    .notify(|err, dur: Duration| {
                        error!("Access token fetch retrying after {:?}: {}", dur, err);
                    })
                    .await?;

                let lifetime = Duration::from_secs(fresh.expires_in.unwrap_or(300));
                let refresh_at = Instant::now() + lifetime.saturating_sub(EXPIRY_SKEW);
                debug!(expires_in = lifetime.as_secs(), "Access token refreshed");

                let value = fresh.access_token;
                *slot = Some(CachedToken {
                    value: value.clone(),
                    refresh_at,
                });
                Ok(value)
            }
        }
    }
}

async fn fetch_metadata_token(
    client: &reqwest::Client,
    url: &Url,
) -> Result<MetadataTokenResponse, PushError> {
    let resp = client
        .get(url.clone())
        .header("Metadata-Flavor", "Google")
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(PushError::TokenStatus(status));
    }

    let token: MetadataTokenResponse = resp.json().await?;
    if token.access_token.is_empty() {
        return Err(PushError::Credential(
            "token endpoint returned an empty access_token".to_string(),
        ));
    }
    Ok(token)
}
