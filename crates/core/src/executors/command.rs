//! Subprocess runner used by shell-backed executors.
//!
//! Spawns a command line through `sh -c` and turns its stdout and stderr
//! into a single stream of lines, followed by the exit code.

use crate::executors::base::StageError;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::process::Command;
use tokio_stream::Stream;

/// One item of a running command's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
    Stdout(String),
    Stderr(String),
    /// The process exited. `None` when it was killed by a signal.
    Exited(Option<i32>),
}

pub type CommandStream = Pin<Box<dyn Stream<Item = Result<CommandEvent, StageError>> + Send>>;

pub struct CommandRunner;

impl CommandRunner {
    /// Run `command_line` with `sh -c` in `working_dir`.
    ///
    /// Empty lines are skipped. The child is killed if the stream is dropped
    /// before the process exits, so timeouts and cancellation do not leak
    /// processes.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rk_core::executors::command::CommandRunner;
    /// use tokio_stream::StreamExt;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let stream = CommandRunner::spawn("echo hello".to_string(), ".".into(), vec![]);
    ///     let events: Vec<_> = stream.collect().await;
    ///     println!("Got {} events", events.len());
    /// }
    /// ```
    pub fn spawn(
        command_line: String,
        working_dir: PathBuf,
        envs: Vec<(String, String)>,
    ) -> CommandStream {
        let stream = async_stream::stream! {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(&command_line);
            cmd.current_dir(&working_dir);
            cmd.envs(envs);
            cmd.stdin(Stdio::null());
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
            cmd.kill_on_drop(true);

            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(e) => {
                    yield Err(StageError::Execution(format!(
                        "Failed to spawn command '{command_line}': {e}"
                    )));
                    return;
                }
            };

            let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
                (Some(stdout), Some(stderr)) => (stdout, stderr),
                _ => {
                    yield Err(StageError::Execution(
                        "Failed to capture command output".to_string()
                    ));
                    return;
                }
            };

            let mut out_lines = BufReader::new(stdout).lines();
            let mut err_lines = BufReader::new(stderr).lines();
            let mut out_done = false;
            let mut err_done = false;

            while !(out_done && err_done) {
                let (from_stderr, line) = tokio::select! {
                    line = out_lines.next_line(), if !out_done => (false, line),
                    line = err_lines.next_line(), if !err_done => (true, line),
                };

                match line {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) if from_stderr => yield Ok(CommandEvent::Stderr(line)),
                    Ok(Some(line)) => yield Ok(CommandEvent::Stdout(line)),
                    // EOF or a read error both end that pipe
                    _ if from_stderr => err_done = true,
                    _ => out_done = true,
                }
            }

            match child.wait().await {
                Ok(status) => yield Ok(CommandEvent::Exited(status.code())),
                Err(e) => yield Err(StageError::Execution(format!(
                    "Failed to wait for command '{command_line}': {e}"
                ))),
            }
        };

        Box::pin(stream)
    }
}
