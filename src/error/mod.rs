mod herald;
mod push;

pub use herald::{ApiErrorBody, ApiErrorObject, HeraldError};
pub use push::{PushError, TIMEOUT_CODE, is_dead_token_code};

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}
