//! Custom assertion and polling helpers for engine tests.

use rk_core::Engine;
use rk_protocol::{Event, Run, StageStatus};
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Assert the status of every stage, in order.
#[allow(dead_code)]
pub fn assert_stage_statuses(run: &Run, expected: &[StageStatus]) {
    let actual: Vec<StageStatus> = run.stages.iter().map(|stage| stage.status).collect();
    assert_eq!(actual, expected, "stage statuses of run {}", run.id);
}

/// Poll `get_run` until `predicate` holds, panicking after five seconds.
#[allow(dead_code)]
pub async fn wait_until<F>(engine: &Engine, id: Uuid, predicate: F) -> Run
where
    F: Fn(&Run) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let run = engine.get_run(id).await.expect("run should exist");
        if predicate(&run) {
            return run;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached for run {id}: {run:?}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// `wait_for` with a five second guard.
#[allow(dead_code)]
pub async fn finish(engine: &Engine, id: Uuid) -> Run {
    tokio::time::timeout(Duration::from_secs(5), engine.wait_for(id))
        .await
        .expect("run should finish in time")
        .expect("run should exist")
}

/// Collect events for `run_id` until its terminal event arrives.
#[allow(dead_code)]
pub async fn collect_events(rx: &mut broadcast::Receiver<Event>, run_id: Uuid) -> Vec<Event> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event should arrive in time")
            .expect("event channel should stay open");
        if event.run_id() != run_id {
            continue;
        }
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            return events;
        }
    }
}

/// Assert that the event sequence starts with creation and ends with a
/// terminal event.
#[allow(dead_code)]
pub fn assert_event_sequence(events: &[Event]) {
    assert!(
        matches!(events.first(), Some(Event::RunCreated { .. })),
        "First event should be RunCreated, got: {:?}",
        events.first()
    );
    assert!(
        events.last().is_some_and(Event::is_terminal),
        "Last event should be terminal, got: {:?}",
        events.last()
    );
}

/// Count log chunk events.
#[allow(dead_code)]
pub fn count_log_chunks(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::StageLogChunk { .. }))
        .count()
}
