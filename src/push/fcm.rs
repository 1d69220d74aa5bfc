use super::{AccessTokenSource, PushMessage, PushTransport};
use crate::config::FcmConfig;
use crate::error::{HeraldError, PushError};
use crate::utils::logging::{UPSTREAM_BODY_PREVIEW_CHARS, token_preview, with_pretty_json_debug};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use herald_schema::{FcmErrorBody, FcmMessage, FcmNotification, FcmSendRequest, FcmSendResponse};
use reqwest::StatusCode;
use reqwest::header::{CONNECTION, HeaderMap, HeaderValue};
use std::{num::NonZeroU32, sync::Arc, time::Duration};
use tracing::debug;
use url::Url;

pub const FCM_USER_AGENT: &str = concat!("herald/", env!("CARGO_PKG_VERSION"));

/// FCM HTTP v1 transport.
pub struct FcmTransport {
    client: reqwest::Client,
    send_url: Url,
    tokens: AccessTokenSource,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl FcmTransport {
    /// Builds the transport with its own HTTP client and token source.
    pub fn new(cfg: &FcmConfig) -> Result<Self, HeraldError> {
        let mut headers = HeaderMap::new();
        let mut builder = reqwest::Client::builder()
            .user_agent(FCM_USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30));

        if let Some(proxy_url) = cfg.proxy.clone() {
            let proxy = reqwest::Proxy::all(proxy_url.as_str()).map_err(|e| {
                HeraldError::UnexpectedError(format!("invalid fcm.proxy url: {e}"))
            })?;
            builder = builder.proxy(proxy);
        }

        if cfg.enable_multiplexing {
            builder = builder.http2_adaptive_window(true);
        } else {
            headers.insert(CONNECTION, HeaderValue::from_static("close"));

            builder = builder
                .http1_only()
                .pool_max_idle_per_host(0)
                .pool_idle_timeout(Duration::from_secs(0));
        }

        let client = builder.default_headers(headers).build().map_err(|e| {
            HeraldError::UnexpectedError(format!("initialize FCM HTTP client failed: {e}"))
        })?;

        let tokens = match cfg.access_token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => AccessTokenSource::fixed(token),
            _ => AccessTokenSource::metadata(client.clone(), cfg.token_url.clone()),
        };

        Self::with_client(cfg, client, tokens)
    }

    pub fn with_client(
        cfg: &FcmConfig,
        client: reqwest::Client,
        tokens: AccessTokenSource,
    ) -> Result<Self, HeraldError> {
        let send_url = cfg
            .api_url
            .join(&format!("v1/projects/{}/messages:send", cfg.project_id))
            .map_err(|e| HeraldError::UnexpectedError(format!("invalid FCM send url: {e}")))?;

        let per_second = u32::try_from(cfg.sends_per_second.max(1)).unwrap_or(u32::MAX);
        let per_second = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        Ok(Self {
            client,
            send_url,
            tokens,
            limiter,
        })
    }

    pub fn send_url(&self) -> &Url {
        &self.send_url
    }
}

#[async_trait]
impl PushTransport for FcmTransport {
    async fn ready(&self) {
        self.limiter.until_ready().await;
    }

    /// Does not pace itself; await [`PushTransport::ready`] first.
    async fn send(&self, message: &PushMessage) -> Result<String, PushError> {
        let bearer = self.tokens.bearer().await?;

        let body = FcmSendRequest {
            message: FcmMessage {
                token: message.token.clone(),
                notification: FcmNotification {
                    title: message.title.clone(),
                    body: message.body.clone(),
                },
                data: message.data.clone().filter(|d| !d.is_empty()),
            },
        };

        let resp = self
            .client
            .post(self.send_url.clone())
            .bearer_auth(bearer)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            let receipt: FcmSendResponse = resp.json().await?;
            return Ok(receipt.name);
        }

        let bytes = resp.bytes().await.unwrap_or_default();
        let err = match serde_json::from_slice::<FcmErrorBody>(&bytes) {
            Ok(parsed) if parsed.error_code().is_some() => {
                with_pretty_json_debug(&parsed, |pretty| {
                    debug!(
                        %status,
                        token = %token_preview(&message.token),
                        body = %pretty,
                        "FCM structured error"
                    );
                });
                PushError::rejected(parsed.messaging_code(), parsed.message())
            }
            _ => {
                let raw = String::from_utf8_lossy(&bytes);
                let preview = format!("{:.len$}", raw, len = UPSTREAM_BODY_PREVIEW_CHARS);
                debug!(
                    %status,
                    token = %token_preview(&message.token),
                    body = %preview,
                    "FCM unstructured error"
                );
                PushError::rejected(code_from_status(status), preview)
            }
        };
        Err(err)
    }
}

/// Status-only fallback. A bare 404 is not treated as a dead token: without the
/// FCM error detail it usually means a wrong project or URL.
fn code_from_status(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "messaging/invalid-argument",
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "messaging/third-party-auth-error",
        StatusCode::TOO_MANY_REQUESTS => "messaging/message-rate-exceeded",
        StatusCode::INTERNAL_SERVER_ERROR => "messaging/internal-error",
        StatusCode::SERVICE_UNAVAILABLE => "messaging/server-unavailable",
        _ => "messaging/unknown-error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_not_found_is_not_a_dead_token() {
        let code = code_from_status(StatusCode::NOT_FOUND);
        assert!(!crate::error::is_dead_token_code(code));
    }

    #[test]
    fn send_url_is_scoped_to_project() {
        let cfg = FcmConfig {
            project_id: "acn-test".to_string(),
            ..FcmConfig::default()
        };
        let transport = FcmTransport::with_client(
            &cfg,
            reqwest::Client::new(),
            AccessTokenSource::fixed("t"),
        )
        .expect("build transport");

        assert_eq!(
            transport.send_url().as_str(),
            "https://fcm.googleapis.com/v1/projects/acn-test/messages:send"
        );
    }
}
