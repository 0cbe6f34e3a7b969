use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

use crate::state::AppState;

pub const SSE_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub run_id: Option<Uuid>,
}

/// Server-sent name of an event, e.g. `stage.status`.
pub fn event_name(event: &rk_protocol::Event) -> &'static str {
    use rk_protocol::Event as E;
    match event {
        E::RunCreated { .. } => "run.created",
        E::RunStatusUpdate { .. } => "run.status",
        E::StageStatusUpdate { .. } => "stage.status",
        E::StageLogChunk { .. } => "stage.log",
        E::RunCompleted { .. } => "run.completed",
        E::RunFailed { .. } => "run.failed",
        E::RunCancelled { .. } => "run.cancelled",
    }
}

fn to_sse_event(event: &rk_protocol::Event) -> Option<Event> {
    match Event::default().event(event_name(event)).json_data(event) {
        Ok(sse) => Some(sse),
        Err(e) => {
            tracing::warn!("Failed to encode event: {}", e);
            None
        }
    }
}

/// Push stream of engine events, optionally restricted to one run.
///
/// Subscribers that fall behind skip the events they missed.
pub async fn events_stream(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let filter = query.run_id;
    let stream = BroadcastStream::new(state.engine.subscribe()).filter_map(move |received| {
        let event = match received {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!("SSE subscriber lagged: {}", e);
                return None;
            }
        };
        if filter.is_some_and(|id| event.run_id() != id) {
            return None;
        }
        to_sse_event(&event).map(Ok)
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(SSE_KEEP_ALIVE_INTERVAL))
}
