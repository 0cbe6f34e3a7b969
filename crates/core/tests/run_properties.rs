//! Invariants that hold for every run, checked against live executions.
//!
//! - A failure at stage k leaves 1..k-1 completed and k+1..N pending
//! - A run is completed exactly when all of its stages are
//! - Finished stages never change status
//! - Progress never decreases
//! - Concurrent readers always see the full stage list

mod common;

use common::*;
use rk_core::executors::{ExecutorRegistry, MockExecutor};
use rk_protocol::{Goal, GoalKind, Run, RunStatus, StageKind, StageStatus, StageTemplate};
use std::time::Duration;

const KINDS: [StageKind; 6] = [
    StageKind::Checkout,
    StageKind::Install,
    StageKind::Build,
    StageKind::Test,
    StageKind::Deploy,
    StageKind::Notify,
];

fn six_stage_template() -> rk_protocol::RunTemplate {
    rk_protocol::RunTemplate::new(
        GoalKind::Deployment,
        KINDS
            .iter()
            .map(|kind| StageTemplate::new(kind.as_str(), *kind))
            .collect(),
    )
}

/// Checks the invariants between two consecutive snapshots of one run.
fn assert_no_regression(previous: &Run, current: &Run) {
    assert_eq!(current.stages.len(), previous.stages.len());
    assert!(
        current.progress >= previous.progress,
        "progress went from {} to {}",
        previous.progress,
        current.progress
    );
    for (before, after) in previous.stages.iter().zip(&current.stages) {
        if before.status.is_terminal() {
            assert_eq!(
                before.status, after.status,
                "stage '{}' changed after finishing",
                before.id
            );
        }
    }
    if previous.status.is_terminal() {
        assert_eq!(previous.status, current.status);
    }
}

fn assert_terminal_exclusivity(run: &Run) {
    let all_completed = run
        .stages
        .iter()
        .all(|stage| stage.status == StageStatus::Completed);
    assert_eq!(run.status == RunStatus::Completed, all_completed);
}

#[tokio::test]
async fn test_failure_at_each_position() {
    for k in 0..KINDS.len() {
        let registry = ExecutorRegistry::new()
            .with(KINDS[k], MockExecutor::failing("stage broke"))
            .with_fallback(MockExecutor::success());
        let engine = engine_with(registry, catalog_with(six_stage_template()));

        let id = engine
            .create_run(Goal::new(GoalKind::Deployment, "deploy"), "user1")
            .await
            .unwrap();
        let run = finish(&engine, id).await;

        assert_eq!(run.status, RunStatus::Failed);
        assert_terminal_exclusivity(&run);
        for (i, stage) in run.stages.iter().enumerate() {
            let expected = match i.cmp(&k) {
                std::cmp::Ordering::Less => StageStatus::Completed,
                std::cmp::Ordering::Equal => StageStatus::Failed,
                std::cmp::Ordering::Greater => StageStatus::Pending,
            };
            assert_eq!(stage.status, expected, "stage {i} when stage {k} fails");
        }
    }
}

#[tokio::test]
async fn test_completed_iff_all_stages_completed() {
    let engine = engine_with(
        ExecutorRegistry::new().with_fallback(MockExecutor::success()),
        catalog_with(six_stage_template()),
    );
    let ok = engine
        .create_run(Goal::new(GoalKind::Deployment, "deploy"), "user1")
        .await
        .unwrap();
    let cancelled = engine
        .create_run(Goal::new(GoalKind::Deployment, "deploy"), "user1")
        .await
        .unwrap();
    engine.cancel_run(cancelled).await.unwrap();

    for id in [ok, cancelled] {
        let run = finish(&engine, id).await;
        assert_terminal_exclusivity(&run);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_snapshots_never_regress() {
    let registry = ExecutorRegistry::new()
        .with(StageKind::Deploy, MockExecutor::failing("deploy broke"))
        .with_fallback(MockExecutor::success().with_delay(Duration::from_millis(15)));
    let engine = engine_with(registry, catalog_with(six_stage_template()));

    let id = engine
        .create_run(Goal::new(GoalKind::Deployment, "deploy"), "user1")
        .await
        .unwrap();

    let mut previous = engine.get_run(id).await.unwrap();
    let mut observed = 1;
    while !previous.is_terminal() {
        tokio::time::sleep(Duration::from_millis(1)).await;
        let current = engine.get_run(id).await.unwrap();
        assert_no_regression(&previous, &current);
        previous = current;
        observed += 1;
    }

    let settled = finish(&engine, id).await;
    assert_no_regression(&previous, &settled);
    assert_eq!(settled.status, RunStatus::Failed);
    assert!(observed > 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_see_full_stage_list() {
    let engine = engine_with(
        ExecutorRegistry::new()
            .with_fallback(MockExecutor::success().with_delay(Duration::from_millis(10))),
        catalog_with(six_stage_template()),
    );
    let id = engine
        .create_run(Goal::new(GoalKind::Deployment, "deploy"), "user1")
        .await
        .unwrap();

    let mut readers = Vec::new();
    for _ in 0..3 {
        let engine = engine.clone();
        readers.push(tokio::spawn(async move {
            loop {
                let run = engine.get_run(id).await.unwrap();
                assert_eq!(run.stages.len(), KINDS.len());
                if run.is_terminal() {
                    return run.status;
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    for reader in readers {
        assert_eq!(reader.await.unwrap(), RunStatus::Completed);
    }
}

#[tokio::test]
async fn test_double_cancel_matches_single_cancel() {
    async fn cancelled_run(times: usize) -> Run {
        let engine = engine_with(
            ExecutorRegistry::new().with_fallback(MockExecutor::success()),
            catalog_with(six_stage_template()),
        );
        let id = engine
            .create_run(Goal::new(GoalKind::Deployment, "deploy"), "user1")
            .await
            .unwrap();
        for _ in 0..times {
            engine.cancel_run(id).await.unwrap();
        }
        finish(&engine, id).await
    }

    let once = cancelled_run(1).await;
    let twice = cancelled_run(2).await;

    assert_eq!(once.status, twice.status);
    assert_eq!(once.error, twice.error);
    let statuses = |run: &Run| run.stages.iter().map(|s| s.status).collect::<Vec<_>>();
    assert_eq!(statuses(&once), statuses(&twice));
    assert_eq!(once.progress, twice.progress);
}
