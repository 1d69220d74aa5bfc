use crate::error::HeraldError;
use crate::events::{EnquiryOutcome, QcOutcome};
use crate::notify::DeliveryOutcome;
use crate::server::router::HeraldState;
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};

pub async fn publish_listing_handler(
    State(state): State<HeraldState>,
    Path(id): Path<String>,
) -> Result<Json<DeliveryOutcome>, HeraldError> {
    Ok(Json(state.events.publish_listing(&id).await?))
}

pub async fn qc_status_handler(
    State(state): State<HeraldState>,
    Path(id): Path<String>,
) -> Result<Json<QcOutcome>, HeraldError> {
    Ok(Json(state.events.qc_status_changed(&id).await?))
}

pub async fn enquiry_handler(
    State(state): State<HeraldState>,
    Path(id): Path<String>,
) -> Result<Json<EnquiryOutcome>, HeraldError> {
    Ok(Json(state.events.enquiry_received(&id).await?))
}

pub fn router() -> Router<HeraldState> {
    Router::new()
        .route("/property/{id}", post(publish_listing_handler))
        .route("/qcstatus/{id}", post(qc_status_handler))
        .route("/enquiries/{id}", post(enquiry_handler))
}

/// Informational echoes.
pub mod echo {
    use crate::server::router::HeraldState;
    use axum::{Router, extract::Path, routing::get};

    pub async fn root() -> &'static str {
        "Hello World!"
    }

    pub async fn property(Path(id): Path<String>) -> String {
        format!("Property {id} details")
    }

    pub async fn qc_status(Path(id): Path<String>) -> String {
        format!("Property {id} details")
    }

    pub async fn enquiry(Path(id): Path<String>) -> String {
        format!("Enquiry {id} details")
    }

    pub fn router() -> Router<HeraldState> {
        Router::new()
            .route("/", get(root))
            .route("/property/{id}", get(property))
            .route("/qcStatus/{id}", get(qc_status))
            .route("/enquiries/{id}", get(enquiry))
    }
}
