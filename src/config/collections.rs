use serde::{Deserialize, Serialize};

/// Collection names in the document store.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionsConfig {
    #[serde(default = "default_agents")]
    pub agents: String,

    #[serde(default = "default_listings")]
    pub listings: String,

    #[serde(default = "default_qc")]
    pub qc: String,

    #[serde(default = "default_enquiries")]
    pub enquiries: String,
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            agents: default_agents(),
            listings: default_listings(),
            qc: default_qc(),
            enquiries: default_enquiries(),
        }
    }
}

fn default_agents() -> String {
    "agents".to_string()
}

fn default_listings() -> String {
    "ACN123".to_string()
}

fn default_qc() -> String {
    "QC_Inventories".to_string()
}

fn default_enquiries() -> String {
    "enquiries".to_string()
}
