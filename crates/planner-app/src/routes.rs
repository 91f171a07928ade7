use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use planner_core::{SprintPlanningReport, SprintStatusReport};
use serde_json::{Value, json};
use time::OffsetDateTime;
use tracing::info;

use crate::AppState;
use crate::error::ApiError;

pub(crate) async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "sprint-planner" }))
}

pub(crate) async fn sprint_planning(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SprintPlanningReport>, ApiError> {
    let source = state.connect(bearer_token(&headers)).await?;
    let report = state.service().plan(&source).await?;
    info!(
        sprints = report.velocity.sprints.len(),
        backlog = report.backlog.items.len(),
        team = report.team.len(),
        no_sprints = report.no_sprints,
        "sprint planning report ready"
    );
    Ok(Json(report))
}

pub(crate) async fn sprint_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SprintStatusReport>, ApiError> {
    let source = state.connect(bearer_token(&headers)).await?;
    let report = state
        .service()
        .sprint_status(&source, OffsetDateTime::now_utc())
        .await?
        .ok_or(ApiError::NoActiveSprint)?;
    Ok(Json(report))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_owned())
}
