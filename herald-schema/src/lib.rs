pub mod fcm;

pub use fcm::{
    FcmErrorBody, FcmErrorDetail, FcmErrorObject, FcmMessage, FcmNotification, FcmSendRequest,
    FcmSendResponse,
};
