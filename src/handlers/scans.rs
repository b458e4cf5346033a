//! Scan handlers

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::{AppState, AppResult};
use crate::models::{ScanRequest, ThreatRecord};
use crate::middleware::auth::UserContext;

/// Scan submitted content and store the resulting threat record
pub async fn create(
    State(state): State<AppState>,
    user: UserContext,
    Json(req): Json<ScanRequest>,
) -> AppResult<(StatusCode, Json<ThreatRecord>)> {
    req.validate()?;

    let record = state.engine.scan(user.user_id, &req.content, &req.source_type).await?;
    Ok((StatusCode::CREATED, Json(record)))
}
