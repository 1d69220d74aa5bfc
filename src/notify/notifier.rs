use super::{DeliveryOutcome, NotificationMessage, ResolvedTokens, TokenResolver, TokenShape};
use crate::error::{HeraldError, PushError};
use crate::models::agent_fields;
use crate::push::{PushMessage, PushTransport};
use crate::store::{DocumentStore, FieldOp};
use crate::utils::logging::token_preview;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};

pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(5000);

/// Fans one notification out to every device token of an agent.
///
/// Tokens are attempted one after another. A failure on one token never stops
/// the rest; tokens the transport reports as dead are pruned from the agent
/// record, every other failure is logged and left alone.
#[derive(Clone)]
pub struct MulticastNotifier {
    store: Arc<dyn DocumentStore>,
    transport: Arc<dyn PushTransport>,
    resolver: TokenResolver,
    send_timeout: Duration,
}

impl MulticastNotifier {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        transport: Arc<dyn PushTransport>,
        agents_collection: &str,
    ) -> Self {
        Self {
            resolver: TokenResolver::new(store.clone(), agents_collection),
            store,
            transport,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Never fails: store and transport errors are folded into the outcome.
    pub async fn deliver(&self, agent_key: &str, message: NotificationMessage) -> DeliveryOutcome {
        match self.try_deliver(agent_key, &message).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(agent = %agent_key, error = %e, "Error processing notification for agent");
                DeliveryOutcome::failed(e.to_string())
            }
        }
    }

    async fn try_deliver(
        &self,
        agent_key: &str,
        message: &NotificationMessage,
    ) -> Result<DeliveryOutcome, HeraldError> {
        let Some(ResolvedTokens { tokens, shape }) = self.resolver.resolve(agent_key).await? else {
            info!(agent = %agent_key, "Agent not found");
            return Ok(DeliveryOutcome::agent_not_found(agent_key));
        };

        let mut sent = 0;
        let mut removed = 0;
        let mut last_error = None;

        for token in &tokens {
            match self.send_with_timeout(message.addressed_to(token)).await {
                Ok(receipt) => {
                    sent += 1;
                    info!(
                        agent = %agent_key,
                        token = %token_preview(token),
                        receipt = %receipt,
                        "Sent notification"
                    );
                }
                Err(err) if err.is_dead_token() => {
                    if self.prune_token(agent_key, token, shape).await {
                        removed += 1;
                    }
                    last_error = Some(err.to_string());
                }
                Err(err) => {
                    warn!(
                        agent = %agent_key,
                        token = %token_preview(token),
                        code = %err.code(),
                        error = %err,
                        "Failed to send notification"
                    );
                    last_error = Some(err.to_string());
                }
            }
        }

        Ok(DeliveryOutcome::from_counts(
            sent,
            tokens.len(),
            removed,
            last_error,
        ))
    }

    /// Races the send against the timeout. The send runs on its own task, so
    /// losing the race abandons it rather than cancelling it. The transport's
    /// pacing wait happens first and is not timed.
    async fn send_with_timeout(&self, message: PushMessage) -> Result<String, PushError> {
        self.transport.ready().await;
        let transport = Arc::clone(&self.transport);
        let send = tokio::spawn(async move { transport.send(&message).await });

        match tokio::time::timeout(self.send_timeout, send).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(PushError::Internal(join_err.to_string())),
            Err(_) => Err(PushError::Timeout(self.send_timeout)),
        }
    }

    /// Returns whether the store accepted the repair.
    async fn prune_token(&self, agent_key: &str, token: &str, shape: TokenShape) -> bool {
        let op = match shape {
            TokenShape::List => {
                FieldOp::ArrayRemove(agent_fields::TOKENS.to_string(), Value::from(token))
            }
            TokenShape::Scalar => FieldOp::Delete(agent_fields::TOKENS.to_string()),
        };

        match self
            .store
            .update(self.resolver.agents_collection(), agent_key, vec![op])
            .await
        {
            Ok(_) => {
                info!(
                    agent = %agent_key,
                    token = %token_preview(token),
                    shape = ?shape,
                    "Removed expired token"
                );
                true
            }
            Err(e) => {
                error!(
                    agent = %agent_key,
                    token = %token_preview(token),
                    error = %e,
                    "Failed to remove expired token"
                );
                false
            }
        }
    }
}
