use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delivery behaviour shared by every notification flow.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    /// Upper bound on a single per-token send.
    /// TOML: `notify.send_timeout_ms`. Default: `5000`.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,

    /// Decrement the enquiring agent's `inboundEnquiryCredits` on every enquiry.
    /// TOML: `notify.charge_enquiry_credits`. Default: `false`.
    #[serde(default)]
    pub charge_enquiry_credits: bool,
}

impl NotifyConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms.max(1))
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: default_send_timeout_ms(),
            charge_enquiry_credits: false,
        }
    }
}

fn default_send_timeout_ms() -> u64 {
    5000
}
