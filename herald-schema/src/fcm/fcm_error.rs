use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const FCM_ERROR_TYPE: &str = "type.googleapis.com/google.firebase.fcm.v1.FcmError";

/// Google API error envelope returned by the FCM v1 endpoint.
#[derive(Debug, Deserialize, Serialize)]
pub struct FcmErrorBody {
    #[serde(rename = "error")]
    #[serde(default)]
    pub inner: FcmErrorObject,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FcmErrorObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Canonical Google status, e.g. `NOT_FOUND`, `INVALID_ARGUMENT`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FcmErrorDetail>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FcmErrorDetail {
    #[serde(rename = "@type", skip_serializing_if = "Option::is_none")]
    pub type_url: Option<String>,

    #[serde(rename = "errorCode", skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl FcmErrorBody {
    /// FCM-specific `errorCode` from the details list, falling back to the
    /// canonical status.
    pub fn error_code(&self) -> Option<&str> {
        self.inner
            .details
            .iter()
            .find(|d| d.type_url.as_deref() == Some(FCM_ERROR_TYPE))
            .and_then(|d| d.error_code.as_deref())
            .or(self.inner.status.as_deref())
    }

    /// Maps the upstream error onto the `messaging/*` code family used by the
    /// Firebase Admin SDKs.
    pub fn messaging_code(&self) -> &'static str {
        match self.error_code() {
            Some("UNREGISTERED") => "messaging/registration-token-not-registered",
            Some("INVALID_ARGUMENT") if self.mentions_registration_token() => {
                "messaging/invalid-registration-token"
            }
            Some("INVALID_ARGUMENT") => "messaging/invalid-argument",
            Some("SENDER_ID_MISMATCH") => "messaging/mismatched-credential",
            Some("QUOTA_EXCEEDED" | "RESOURCE_EXHAUSTED") => "messaging/message-rate-exceeded",
            Some("UNAVAILABLE") => "messaging/server-unavailable",
            Some("INTERNAL") => "messaging/internal-error",
            Some("THIRD_PARTY_AUTH_ERROR" | "UNAUTHENTICATED" | "PERMISSION_DENIED") => {
                "messaging/third-party-auth-error"
            }
            _ => "messaging/unknown-error",
        }
    }

    pub fn message(&self) -> &str {
        self.inner.message.as_deref().unwrap_or("")
    }

    fn mentions_registration_token(&self) -> bool {
        self.inner
            .message
            .as_deref()
            .is_some_and(|m| m.to_ascii_lowercase().contains("registration token"))
    }
}
