use serde::{Deserialize, Serialize};
use url::Url;

/// Firebase Cloud Messaging transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FcmConfig {
    /// Firebase project id used in the send URL.
    /// TOML: `fcm.project_id`.
    #[serde(default)]
    pub project_id: String,

    /// Base URL of the FCM HTTP v1 API.
    /// TOML: `fcm.api_url`. Default: `https://fcm.googleapis.com`.
    #[serde(default = "default_api_url")]
    pub api_url: Url,

    /// Static bearer token. When unset, tokens are fetched from `token_url`.
    /// TOML: `fcm.access_token`.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Metadata-server style token endpoint (`Metadata-Flavor: Google`).
    /// TOML: `fcm.token_url`.
    #[serde(default = "default_token_url")]
    pub token_url: Url,

    /// Optional upstream HTTP proxy for the FCM client.
    /// TOML: `fcm.proxy`. Example: `http://127.0.0.1:1080`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Allow HTTP/2 multiplexing; disabled forces HTTP/1.
    /// TOML: `fcm.enable_multiplexing`. Default: `false`.
    #[serde(default)]
    pub enable_multiplexing: bool,

    /// Outbound send rate shared by every caller of the transport.
    /// TOML: `fcm.sends_per_second`. Default: `500`.
    #[serde(default = "default_sends_per_second")]
    pub sends_per_second: usize,
}

impl Default for FcmConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            api_url: default_api_url(),
            access_token: None,
            token_url: default_token_url(),
            proxy: None,
            enable_multiplexing: false,
            sends_per_second: default_sends_per_second(),
        }
    }
}

fn default_api_url() -> Url {
    Url::parse("https://fcm.googleapis.com").expect("valid FCM API URL")
}

fn default_token_url() -> Url {
    Url::parse(
        "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token",
    )
    .expect("valid metadata token URL")
}

fn default_sends_per_second() -> usize {
    500
}
