use crate::push::PushMessage;
use serde::Serialize;
use std::collections::BTreeMap;

/// Title, body and optional string payload of one logical notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

impl NotificationMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Copy addressed to one token; an empty payload is left off entirely.
    pub fn addressed_to(&self, token: &str) -> PushMessage {
        PushMessage {
            token: token.to_string(),
            title: self.title.clone(),
            body: self.body.clone(),
            data: (!self.data.is_empty()).then(|| self.data.clone()),
        }
    }
}

/// Result of one multicast attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    pub success: bool,
    /// Tokens that accepted the message.
    pub sent: usize,
    /// Tokens attempted.
    pub total: usize,
    /// Dead tokens pruned from the agent record.
    pub removed: usize,
    pub agent_found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn agent_not_found(agent_key: &str) -> Self {
        Self {
            success: false,
            sent: 0,
            total: 0,
            removed: 0,
            agent_found: false,
            message: Some(format!("Agent {agent_key} not found")),
            error: None,
        }
    }

    /// Failure raised before any token was attempted.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            sent: 0,
            total: 0,
            removed: 0,
            agent_found: false,
            message: None,
            error: Some(error.into()),
        }
    }

    pub fn from_counts(
        sent: usize,
        total: usize,
        removed: usize,
        last_error: Option<String>,
    ) -> Self {
        let error = match (sent, total) {
            (0, 0) => Some("agent has no registered device tokens".to_string()),
            (0, _) => Some(last_error.unwrap_or_else(|| "no token accepted delivery".to_string())),
            _ => None,
        };
        Self {
            success: sent > 0,
            sent,
            total,
            removed,
            agent_found: true,
            message: None,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_is_omitted() {
        let msg = NotificationMessage::new("t", "b").addressed_to("tok");
        assert_eq!(msg.data, None);

        let msg = NotificationMessage::new("t", "b")
            .with_data("event", "listing_published")
            .addressed_to("tok");
        assert_eq!(
            msg.data.as_ref().and_then(|d| d.get("event")).map(String::as_str),
            Some("listing_published")
        );
    }

    #[test]
    fn partial_success_is_success() {
        let outcome = DeliveryOutcome::from_counts(1, 3, 1, Some("x".to_string()));
        assert!(outcome.success);
        assert_eq!(outcome.error, None);
    }

    #[test]
    fn zero_tokens_differs_from_not_found() {
        let empty = DeliveryOutcome::from_counts(0, 0, 0, None);
        let missing = DeliveryOutcome::agent_not_found("CP9");
        assert!(!empty.success && !missing.success);
        assert!(empty.agent_found);
        assert!(!missing.agent_found);
    }
}
