use axum::extract::State;
use axum::Json;
use rk_protocol::RunTemplate;

use crate::state::AppState;

pub async fn list_templates(State(state): State<AppState>) -> Json<Vec<RunTemplate>> {
    Json(
        state
            .engine
            .templates()
            .templates()
            .into_iter()
            .cloned()
            .collect(),
    )
}
