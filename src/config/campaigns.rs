use crate::campaigns::schedule::{DailyAt, ScheduleParseError};
use crate::store::MAX_BATCH_WRITES;
use serde::{Deserialize, Serialize};

/// Periodic campaign configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignsConfig {
    /// Run the aging/delisting sweep every day.
    /// TOML: `campaigns.aging_enabled`. Default: `true`.
    #[serde(default = "default_true")]
    pub aging_enabled: bool,

    /// Daily UTC time of the sweep, `HH:MM`.
    /// TOML: `campaigns.aging_at`. Default: `09:00`.
    #[serde(default = "default_aging_at")]
    pub aging_at: String,

    /// Run the micromarket digest every day.
    /// TOML: `campaigns.digest_enabled`. Default: `true`.
    #[serde(default = "default_true")]
    pub digest_enabled: bool,

    /// Daily UTC time of the digest, `HH:MM`.
    /// TOML: `campaigns.digest_at`. Default: `18:00`.
    #[serde(default = "default_digest_at")]
    pub digest_at: String,

    /// Documents per page when scanning collections. Clamped to `1..=500`.
    /// TOML: `campaigns.page_size`. Default: `500`.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Write computed `ageOfInventory`/`ageOfStatus` back during the sweep.
    /// TOML: `campaigns.persist_ages`. Default: `false`.
    #[serde(default)]
    pub persist_ages: bool,
}

impl CampaignsConfig {
    pub fn aging_at(&self) -> Result<DailyAt, ScheduleParseError> {
        self.aging_at.parse()
    }

    pub fn digest_at(&self) -> Result<DailyAt, ScheduleParseError> {
        self.digest_at.parse()
    }

    pub fn page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_BATCH_WRITES)
    }
}

impl Default for CampaignsConfig {
    fn default() -> Self {
        Self {
            aging_enabled: true,
            aging_at: default_aging_at(),
            digest_enabled: true,
            digest_at: default_digest_at(),
            page_size: default_page_size(),
            persist_ages: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_aging_at() -> String {
    "09:00".to_string()
}

fn default_digest_at() -> String {
    "18:00".to_string()
}

fn default_page_size() -> usize {
    MAX_BATCH_WRITES
}
