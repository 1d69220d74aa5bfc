//! Push delivery transport.

pub mod access_token;
pub mod fcm;

pub use access_token::AccessTokenSource;
pub use fcm::FcmTransport;

use crate::error::PushError;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// One notification addressed to one device token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    /// `None` when the caller had nothing to attach; never an empty map.
    pub data: Option<BTreeMap<String, String>>,
}

/// Sends single-token messages. Implementations return an opaque receipt.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Waits until the transport may accept another send. Callers await this
    /// before timing `send`, so queueing never counts against a send timeout.
    async fn ready(&self) {}

    async fn send(&self, message: &PushMessage) -> Result<String, PushError>;
}
