pub mod campaigns;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod notify;
pub mod push;
pub mod server;
pub mod store;
pub mod utils;

pub use error::{HeraldError, PushError};
pub use notify::{DeliveryOutcome, MulticastNotifier, NotificationMessage};
pub use store::DocumentStore;
