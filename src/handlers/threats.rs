//! Threat record handlers

use axum::{extract::{State, Path, Query}, Json};
use uuid::Uuid;

use crate::{AppState, AppResult};
use crate::models::{ThreatFilter, ThreatRecord};
use crate::middleware::auth::UserContext;

/// List the caller's most recent threats
pub async fn list(
    State(state): State<AppState>,
    user: UserContext,
    Query(filter): Query<ThreatFilter>,
) -> AppResult<Json<Vec<ThreatRecord>>> {
    let limit = filter.limit.unwrap_or(state.config.recent_threats_limit);
    let threats = state.engine.list_recent_threats(user.user_id, limit).await?;
    Ok(Json(threats))
}

/// Get single threat
pub async fn get(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ThreatRecord>> {
    let threat = state.engine.get_threat(id).await?;
    user.require_owner(&threat)?;
    Ok(Json(threat))
}

pub async fn acknowledge(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ThreatRecord>> {
    user.require_owner(&state.engine.get_threat(id).await?)?;
    Ok(Json(state.engine.acknowledge(id).await?))
}

pub async fn resolve(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ThreatRecord>> {
    user.require_owner(&state.engine.get_threat(id).await?)?;
    Ok(Json(state.engine.resolve(id).await?))
}

pub async fn mark_false_positive(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ThreatRecord>> {
    user.require_owner(&state.engine.get_threat(id).await?)?;
    Ok(Json(state.engine.mark_false_positive(id).await?))
}
