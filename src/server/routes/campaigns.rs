use crate::campaigns::{DigestReport, SweepReport};
use crate::error::HeraldError;
use crate::server::router::HeraldState;
use axum::{Json, Router, extract::State, routing::post};

/// Runs the aging sweep now and waits for every reminder to settle.
pub async fn run_aging_handler(
    State(state): State<HeraldState>,
) -> Result<Json<SweepReport>, HeraldError> {
    Ok(Json(state.aging.run().await?))
}

pub async fn run_digest_handler(
    State(state): State<HeraldState>,
) -> Result<Json<DigestReport>, HeraldError> {
    Ok(Json(state.digest.run().await?))
}

pub fn router() -> Router<HeraldState> {
    Router::new()
        .route("/campaigns/aging:run", post(run_aging_handler))
        .route("/campaigns/digest:run", post(run_digest_handler))
}
