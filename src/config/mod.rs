mod basic;
mod campaigns;
mod collections;
mod fcm;
mod notify;

pub use basic::BasicConfig;
pub use campaigns::CampaignsConfig;
pub use collections::CollectionsConfig;
pub use fcm::FcmConfig;
pub use notify::NotifyConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::LazyLock};

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Push transport settings (see `fcm` table in config.toml).
    #[serde(default)]
    pub fcm: FcmConfig,

    /// Delivery behaviour (see `notify` table in config.toml).
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Document store collection names (see `collections` table in config.toml).
    #[serde(default)]
    pub collections: CollectionsConfig,

    /// Periodic jobs (see `campaigns` table in config.toml).
    #[serde(default)]
    pub campaigns: CampaignsConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "HERALD_";

impl Config {
    /// Builds a Figment that merges defaults, an optional config TOML file and
    /// `HERALD_`-prefixed environment variables (`__` separates tables).
    pub fn figment() -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads configuration and validates fields the process cannot run without.
    pub fn load() -> Self {
        let cfg: Self = Self::figment()
            .extract()
            .unwrap_or_else(|err| panic!("failed to extract configuration: {err}"));
        if cfg.fcm.project_id.trim().is_empty() {
            panic!("fcm.project_id must be set (HERALD_FCM__PROJECT_ID)");
        }
        if let Err(err) = cfg.campaigns.aging_at() {
            panic!("campaigns.aging_at is invalid: {err}");
        }
        if let Err(err) = cfg.campaigns.digest_at() {
            panic!("campaigns.digest_at is invalid: {err}");
        }
        cfg
    }
}

/// Global, lazily-initialized configuration instance.
pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::load);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_extract_cleanly() {
        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .extract()
            .expect("defaults should extract");

        assert_eq!(cfg.basic.listen_port, 3000);
        assert_eq!(cfg.collections.listings, "ACN123");
        assert_eq!(cfg.notify.send_timeout_ms, 5000);
        assert_eq!(cfg.campaigns.page_size(), 500);
    }

    #[test]
    fn toml_overrides_nested_tables() {
        let raw = r#"
            [fcm]
            project_id = "acn-prod"
            sends_per_second = 50

            [campaigns]
            page_size = 9000
            digest_at = "07:30"
        "#;
        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(raw))
            .extract()
            .expect("toml should extract");

        assert_eq!(cfg.fcm.project_id, "acn-prod");
        assert_eq!(cfg.fcm.sends_per_second, 50);
        assert_eq!(cfg.campaigns.page_size(), 500);
        assert_eq!(cfg.campaigns.digest_at().expect("valid").to_string(), "07:30");
    }
}
