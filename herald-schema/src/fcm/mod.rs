//! Firebase Cloud Messaging HTTP v1 wire types.

mod fcm_error;
mod send_request;

pub use fcm_error::{FcmErrorBody, FcmErrorDetail, FcmErrorObject};
pub use send_request::{FcmMessage, FcmNotification, FcmSendRequest, FcmSendResponse};
