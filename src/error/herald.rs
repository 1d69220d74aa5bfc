use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum HeraldError {
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Invalid store request: {0}")]
    InvalidRequest(String),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl HeraldError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        HeraldError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

impl IntoResponse for HeraldError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            HeraldError::NotFound { collection, id } => {
                let status = StatusCode::NOT_FOUND;
                let body = ApiErrorObject {
                    code: "NOT_FOUND".to_string(),
                    message: format!("{collection}/{id} not found"),
                    details: None,
                };
                (status, body)
            }

            HeraldError::DatabaseError(_)
            | HeraldError::JsonError(_)
            | HeraldError::RactorError(_)
            | HeraldError::InvalidRequest(_)
            | HeraldError::UnexpectedError(_) => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let body = ApiErrorObject {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                    details: None,
                };
                (status, body)
            }
        };
        (status, Json(ApiErrorBody { inner: error_body })).into_response()
    }
}

/// Standardized API error response payload.
#[derive(Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}
