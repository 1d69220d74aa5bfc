use crate::error::HeraldError;
use crate::models::agent_fields;
use crate::store::DocumentStore;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// How the token field is stored, which decides how a dead token is pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenShape {
    List,
    Scalar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTokens {
    pub tokens: Vec<String>,
    pub shape: TokenShape,
}

impl ResolvedTokens {
    /// Normalizes a scalar-or-list token field. Null, empty and non-string
    /// entries are dropped.
    pub fn from_field(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Array(items)) => Self {
                tokens: items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect(),
                shape: TokenShape::List,
            },
            Some(Value::String(token)) if !token.is_empty() => Self {
                tokens: vec![token.clone()],
                shape: TokenShape::Scalar,
            },
            _ => Self {
                tokens: Vec::new(),
                shape: TokenShape::Scalar,
            },
        }
    }
}

/// Maps an agent key to the device tokens on its record.
#[derive(Clone)]
pub struct TokenResolver {
    store: Arc<dyn DocumentStore>,
    agents: Arc<str>,
}

impl TokenResolver {
    pub fn new(store: Arc<dyn DocumentStore>, agents_collection: &str) -> Self {
        Self {
            store,
            agents: Arc::from(agents_collection),
        }
    }

    pub fn agents_collection(&self) -> &str {
        &self.agents
    }

    /// `Ok(None)` when the agent record does not exist.
    pub async fn resolve(&self, agent_key: &str) -> Result<Option<ResolvedTokens>, HeraldError> {
        let Some(doc) = self.store.get(&self.agents, agent_key).await? else {
            return Ok(None);
        };

        let resolved = ResolvedTokens::from_field(doc.get(agent_fields::TOKENS));
        if resolved.tokens.is_empty() {
            warn!(agent = %agent_key, shape = ?resolved.shape, "Agent has no device tokens");
        } else {
            debug!(
                agent = %agent_key,
                tokens = resolved.tokens.len(),
                shape = ?resolved.shape,
                "Resolved device tokens"
            );
        }
        Ok(Some(resolved))
    }
}
