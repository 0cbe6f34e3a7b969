use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rk_protocol::{Goal, GoalKind, Run};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_TRIGGERED_BY: &str = "api";

#[derive(Debug, Deserialize)]
pub struct CreateRunRequest {
    pub goal: String,
    /// `deployment` or `code_generation`. Inferred from the goal text when
    /// absent.
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub triggered_by: Option<String>,
}

impl CreateRunRequest {
    fn goal(&self) -> Result<Goal, AppError> {
        match &self.kind {
            Some(name) => GoalKind::from_name(name)
                .map(|kind| Goal::new(kind, self.goal.clone()))
                .ok_or_else(|| AppError::BadRequest(format!("Unknown goal kind: {name}"))),
            None => Ok(Goal::infer(self.goal.clone())),
        }
    }
}

pub async fn create_run(
    State(state): State<AppState>,
    Json(payload): Json<CreateRunRequest>,
) -> Result<(StatusCode, Json<Run>), AppError> {
    let goal = payload.goal()?;
    let triggered_by = payload
        .triggered_by
        .as_deref()
        .filter(|by| !by.trim().is_empty())
        .unwrap_or(DEFAULT_TRIGGERED_BY);

    let id = state.engine.create_run(goal, triggered_by).await?;
    let run = state
        .engine
        .get_run(id)
        .await
        .ok_or_else(|| AppError::Internal(format!("Run {id} vanished after creation")))?;

    Ok((StatusCode::CREATED, Json(run)))
}

pub async fn list_runs(State(state): State<AppState>) -> Json<Vec<Run>> {
    Json(state.engine.list_runs().await)
}

pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Run>, AppError> {
    match state.engine.get_run(id).await {
        Some(run) => Ok(Json(run)),
        None => Err(AppError::NotFound(format!("Run not found: {id}"))),
    }
}

pub async fn cancel_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Run>, AppError> {
    let run = state.engine.cancel_run(id).await?;
    Ok(Json(run))
}
