//! Token resolution, multicast delivery and message templates.

pub mod notifier;
pub mod outcome;
pub mod templates;
pub mod tokens;

pub use notifier::MulticastNotifier;
pub use outcome::{DeliveryOutcome, NotificationMessage};
pub use tokens::{ResolvedTokens, TokenResolver, TokenShape};
