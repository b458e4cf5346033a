//! Pattern catalog handlers

use axum::{extract::State, Json};

use crate::{AppState, AppResult};
use crate::models::ThreatPattern;
use crate::middleware::auth::UserContext;

/// Active patterns in catalog order
pub async fn list(
    State(state): State<AppState>,
    _user: UserContext,
) -> AppResult<Json<Vec<ThreatPattern>>> {
    let patterns = state.engine.active_patterns().await?;
    Ok(Json(patterns))
}
