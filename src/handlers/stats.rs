//! Daily statistics handlers

use axum::{extract::{State, Query}, Json};
use chrono::Utc;

use crate::{AppState, AppResult};
use crate::models::{DailyStats, StatsQuery};
use crate::middleware::auth::UserContext;

/// Counters for one day (defaults to today, UTC)
pub async fn daily(
    State(state): State<AppState>,
    user: UserContext,
    Query(query): Query<StatsQuery>,
) -> AppResult<Json<DailyStats>> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let stats = state.engine.daily_stats(user.user_id, date).await?;
    Ok(Json(stats))
}
