//! Executor that runs a configured shell command.

use crate::executors::base::{RunContext, StageError, StageEvent, StageExecutor, StageStream};
use crate::executors::command::{CommandEvent, CommandRunner};
use async_trait::async_trait;
use rk_protocol::{ShellCommand, Stage};
use std::path::{Path, PathBuf};
use tokio_stream::StreamExt;

/// Runs one command line per stage, logging every output line.
///
/// A zero exit code completes the stage with `{"exit_code": 0}` as output;
/// anything else fails it. The run, goal and stage are exposed to the
/// command as `RUNKIT_*` environment variables.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    command: String,
    working_dir: PathBuf,
}

impl ShellExecutor {
    pub fn new(command: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            working_dir: working_dir.into(),
        }
    }

    /// Build from a `config.toml` entry, resolving `cwd` against `root`.
    pub fn from_config(config: &ShellCommand, root: &Path) -> Self {
        let working_dir = match &config.cwd {
            Some(cwd) => root.join(cwd),
            None => root.to_path_buf(),
        };
        Self::new(config.command.clone(), working_dir)
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn envs(stage: &Stage, context: &RunContext) -> Vec<(String, String)> {
        vec![
            ("RUNKIT_RUN_ID".to_string(), context.run_id.to_string()),
            ("RUNKIT_GOAL".to_string(), context.goal.description.clone()),
            ("RUNKIT_GOAL_KIND".to_string(), context.goal.kind.to_string()),
            ("RUNKIT_TRIGGERED_BY".to_string(), context.triggered_by.clone()),
            ("RUNKIT_STAGE_ID".to_string(), stage.id.clone()),
            ("RUNKIT_STAGE_KIND".to_string(), stage.kind.to_string()),
        ]
    }
}

#[async_trait]
impl StageExecutor for ShellExecutor {
    async fn check_availability(&self) -> bool {
        !self.command.trim().is_empty()
    }

    async fn execute(&self, stage: &Stage, context: &RunContext) -> Result<StageStream, StageError> {
        let command = self.command.clone();
        let mut output = CommandRunner::spawn(
            command.clone(),
            self.working_dir.clone(),
            Self::envs(stage, context),
        );

        let stream = async_stream::stream! {
            yield Ok(StageEvent::Log(format!("$ {command}")));

            while let Some(event) = output.next().await {
                match event {
                    Ok(CommandEvent::Stdout(line)) => yield Ok(StageEvent::Log(line)),
                    Ok(CommandEvent::Stderr(line)) => yield Ok(StageEvent::Log(format!("stderr: {line}"))),
                    Ok(CommandEvent::Exited(Some(0))) => {
                        yield Ok(StageEvent::Output(serde_json::json!({ "exit_code": 0 })));
                        yield Ok(StageEvent::Completed);
                        return;
                    }
                    Ok(CommandEvent::Exited(Some(code))) => {
                        yield Err(StageError::Execution(format!(
                            "'{command}' exited with code {code}"
                        )));
                        return;
                    }
                    Ok(CommandEvent::Exited(None)) => {
                        yield Err(StageError::Execution(format!(
                            "'{command}' was terminated by a signal"
                        )));
                        return;
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rk_protocol::{Goal, GoalKind, StageKind, StageTemplate};
    use uuid::Uuid;

    fn stage() -> Stage {
        Stage::from_template(&StageTemplate::new("build", StageKind::Build))
    }

    fn context() -> RunContext {
        RunContext::new(
            Uuid::new_v4(),
            Goal::new(GoalKind::Deployment, "deploy to staging"),
            "user1",
        )
    }

    #[tokio::test]
    async fn test_shell_executor_success() {
        let executor = ShellExecutor::new("echo \"$RUNKIT_STAGE_ID for $RUNKIT_GOAL\"", ".");
        let stream = executor.execute(&stage(), &context()).await.unwrap();
        let events: Vec<_> = stream.collect().await;

        assert_eq!(
            events[0],
            Ok(StageEvent::Log(
                "$ echo \"$RUNKIT_STAGE_ID for $RUNKIT_GOAL\"".to_string()
            ))
        );
        assert_eq!(
            events[1],
            Ok(StageEvent::Log("build for deploy to staging".to_string()))
        );
        assert_eq!(
            events[2],
            Ok(StageEvent::Output(serde_json::json!({ "exit_code": 0 })))
        );
        assert_eq!(events[3], Ok(StageEvent::Completed));
    }

    #[tokio::test]
    async fn test_shell_executor_nonzero_exit_fails() {
        let executor = ShellExecutor::new("exit 2", ".");
        let stream = executor.execute(&stage(), &context()).await.unwrap();
        let events: Vec<_> = stream.collect().await;

        match events.last() {
            Some(Err(StageError::Execution(msg))) => assert!(msg.contains("exited with code 2")),
            other => panic!("Expected execution failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_shell_executor_from_config_resolves_cwd() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/marker.txt"), "here").unwrap();

        let config = ShellCommand {
            command: "cat marker.txt".to_string(),
            cwd: Some("sub".to_string()),
        };
        let executor = ShellExecutor::from_config(&config, dir.path());
        assert_eq!(executor.command(), "cat marker.txt");

        let stream = executor.execute(&stage(), &context()).await.unwrap();
        let events: Vec<_> = stream.collect().await;
        assert!(events.contains(&Ok(StageEvent::Log("here".to_string()))));
        assert_eq!(events.last(), Some(&Ok(StageEvent::Completed)));
    }

    #[tokio::test]
    async fn test_shell_executor_blank_command_unavailable() {
        let executor = ShellExecutor::new("  ", ".");
        assert!(!executor.check_availability().await);
    }
}
