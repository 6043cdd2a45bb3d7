use axum::{extract::State, response::Json};

use super::AppState;
use crate::error::Result;
use crate::models::{Envelope, HealthResponse};
use crate::repositories::NamesRepository;

pub const HEALTHY_MESSAGE: &str = "Backend is running and connected to the database!";

/// `GET /`: proves a round trip to the database by reading its version.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    let mut conn = state.provider.acquire().await?;
    let db_version = state
        .provider
        .run_bounded(NamesRepository::server_version(&mut conn))
        .await?;

    tracing::debug!(db_version = %db_version, "health check passed");

    Ok(Json(HealthResponse {
        envelope: Envelope::success(HEALTHY_MESSAGE),
        db_version,
    }))
}
