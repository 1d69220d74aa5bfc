use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of `POST /v1/projects/{project_id}/messages:send`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FcmSendRequest {
    pub message: FcmMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FcmMessage {
    pub token: String,

    pub notification: FcmNotification,

    /// FCM only accepts string values here. An empty map is rejected by some
    /// client SDKs, so callers leave this `None` instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FcmNotification {
    pub title: String,
    pub body: String,
}

/// Successful send response; `name` is the message resource name
/// (`projects/{project}/messages/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FcmSendResponse {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serialize_omits_missing_data() {
        let req = FcmSendRequest {
            message: FcmMessage {
                token: "tok-1".to_string(),
                notification: FcmNotification {
                    title: "Listing Live!".to_string(),
                    body: "Your listing is live".to_string(),
                },
                data: None,
            },
        };

        let out = serde_json::to_value(&req).expect("serialize request");
        assert_eq!(
            out,
            json!({
                "message": {
                    "token": "tok-1",
                    "notification": { "title": "Listing Live!", "body": "Your listing is live" }
                }
            })
        );
    }

    #[test]
    fn serialize_keeps_data_when_present() {
        let mut data = BTreeMap::new();
        data.insert("propertyId".to_string(), "P-1".to_string());
        let req = FcmSendRequest {
            message: FcmMessage {
                token: "tok-1".to_string(),
                notification: FcmNotification {
                    title: "t".to_string(),
                    body: "b".to_string(),
                },
                data: Some(data),
            },
        };

        let out = serde_json::to_value(&req).expect("serialize request");
        assert_eq!(out["message"]["data"], json!({ "propertyId": "P-1" }));
    }
}
