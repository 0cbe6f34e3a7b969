use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use colored::{ColoredString, Colorize};
use rk_core::config::load_config;
use rk_core::executors::{ExecutorRegistry, MockExecutor};
use rk_core::init::{generate_runkit_structure, InitOptions};
use rk_core::Engine;
use rk_protocol::{Goal, GoalKind, Run, RunStatus, StageStatus};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "runkit")]
#[command(about = "Drive goals through ordered stages", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root holding the `.runkit/` directory.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Log engine activity to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a run for a goal and follow it until it finishes.
    Run {
        /// Free-text goal, e.g. "deploy the web app to staging".
        goal: String,

        /// Goal kind. Inferred from the goal text when omitted.
        #[arg(long, value_parser = parse_goal_kind)]
        kind: Option<GoalKind>,

        /// Actor recorded as having triggered the run.
        #[arg(long = "by", default_value = "cli")]
        triggered_by: String,

        /// Interval between progress polls.
        #[arg(long, default_value_t = 200)]
        poll_ms: u64,

        /// Simulated duration of stages that have no configured command.
        #[arg(long, default_value_t = 500)]
        simulate_ms: u64,

        /// Print the final run as JSON instead of a live log.
        #[arg(long)]
        json: bool,
    },

    /// List the stage templates in effect for this project.
    Templates {
        #[arg(long)]
        json: bool,
    },

    /// Serve the HTTP API.
    Serve {
        #[arg(long, default_value = "127.0.0.1:7070")]
        addr: SocketAddr,

        /// Simulated duration of stages that have no configured command.
        #[arg(long, default_value_t = 500)]
        simulate_ms: u64,
    },

    /// Write a `.runkit/` directory with the default config and templates.
    Init {
        /// Overwrite an existing `.runkit/` directory.
        #[arg(long)]
        force: bool,

        /// Only write `config.toml`.
        #[arg(long)]
        minimal: bool,
    },
}

fn parse_goal_kind(name: &str) -> Result<GoalKind, String> {
    GoalKind::from_name(name).ok_or_else(|| {
        let known: Vec<_> = GoalKind::ALL.iter().map(GoalKind::as_str).collect();
        format!("unknown goal kind '{name}' (expected one of: {})", known.join(", "))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            goal,
            kind,
            triggered_by,
            poll_ms,
            simulate_ms,
            json,
        } => {
            let goal = match kind {
                Some(kind) => Goal::new(kind, goal),
                None => Goal::infer(goal),
            };
            let engine = build_engine(&cli.root, simulate_ms).await?;
            run_goal(&engine, goal, &triggered_by, poll_ms, json).await
        }
        Commands::Templates { json } => list_templates(&cli.root, json).await,
        Commands::Serve { addr, simulate_ms } => {
            let engine = build_engine(&cli.root, simulate_ms).await?;
            rk_server::serve(addr, engine).await.map_err(|e| eyre!(e))
        }
        Commands::Init { force, minimal } => init(cli.root, force, minimal).await,
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Engine over the project's config. Stage kinds without a configured
/// command are simulated.
async fn build_engine(root: &Path, simulate_ms: u64) -> Result<Engine> {
    let config = load_config(root).await?;
    let registry = ExecutorRegistry::new()
        .with_shell_commands(&config.global.executors, root)
        .with_fallback(MockExecutor::success().with_delay(Duration::from_millis(simulate_ms)));

    tracing::debug!(?registry, "Executors ready");
    Ok(Engine::new(
        registry,
        config.templates.clone(),
        config.engine_config(),
    ))
}

async fn run_goal(
    engine: &Engine,
    goal: Goal,
    triggered_by: &str,
    poll_ms: u64,
    json: bool,
) -> Result<()> {
    let id = engine.create_run(goal, triggered_by).await?;
    let run = follow_run(engine, id, poll_ms, json).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print_summary(&run);
    }

    match run.status {
        RunStatus::Completed => Ok(()),
        _ => Err(eyre!(
            "run {} {}: {}",
            run.id,
            status_str(run.status),
            run.error.as_deref().unwrap_or("no error recorded")
        )),
    }
}

/// Poll the run until it is terminal, printing new log lines as they appear.
/// Ctrl-C cancels the run.
async fn follow_run(engine: &Engine, id: Uuid, poll_ms: u64, quiet: bool) -> Result<Run> {
    let mut ticker = tokio::time::interval(Duration::from_millis(poll_ms.max(1)));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;
    let mut printed: Vec<usize> = Vec::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            signal = &mut ctrl_c, if !interrupted => {
                signal?;
                interrupted = true;
                eprintln!("{}", "Cancelling run...".yellow());
                engine.cancel_run(id).await?;
            }
        }

        let run = engine
            .get_run(id)
            .await
            .ok_or_else(|| eyre!("run {id} is no longer held by the engine"))?;

        if !quiet {
            print_new_log_lines(&run, &mut printed);
        }
        if run.is_terminal() {
            return Ok(run);
        }
    }
}

fn print_new_log_lines(run: &Run, printed: &mut Vec<usize>) {
    printed.resize(run.stages.len(), 0);
    for (stage, seen) in run.stages.iter().zip(printed.iter_mut()) {
        for line in stage.log.iter().skip(*seen) {
            println!("{} {}", format!("[{}]", stage.id).cyan(), line);
        }
        *seen = stage.log.len();
    }
}

fn print_summary(run: &Run) {
    println!();
    println!(
        "Run {} {} ({:.0}%)",
        run.id,
        status_word(run.status),
        run.progress
    );
    for stage in &run.stages {
        let timing = stage
            .duration_ms
            .map(|ms| format!(" {ms}ms"))
            .unwrap_or_default();
        println!(
            "  {:<10} {}{}",
            stage_word(stage.status),
            stage.name,
            timing.dimmed()
        );
    }
    if let Some(error) = &run.error {
        println!("{} {}", "error:".red().bold(), error);
    }
}

fn status_str(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Pending => "pending",
        RunStatus::Running => "running",
        RunStatus::Completed => "completed",
        RunStatus::Failed => "failed",
        RunStatus::Cancelled => "cancelled",
    }
}

fn status_word(status: RunStatus) -> ColoredString {
    let word = status_str(status);
    match status {
        RunStatus::Pending => word.normal(),
        RunStatus::Running => word.blue(),
        RunStatus::Completed => word.green(),
        RunStatus::Failed => word.red(),
        RunStatus::Cancelled => word.yellow(),
    }
}

fn stage_word(status: StageStatus) -> ColoredString {
    match status {
        StageStatus::Pending => "pending".dimmed(),
        StageStatus::Running => "running".blue(),
        StageStatus::Completed => "completed".green(),
        StageStatus::Failed => "failed".red(),
    }
}

async fn list_templates(root: &Path, json: bool) -> Result<()> {
    let config = load_config(root).await?;
    let templates = config.templates.templates();

    if json {
        println!("{}", serde_json::to_string_pretty(&templates)?);
        return Ok(());
    }

    for template in templates {
        println!("{}", template.goal.as_str().bold());
        for (i, stage) in template.stages.iter().enumerate() {
            println!(
                "  {}. {} {}",
                i + 1,
                stage.display_name(),
                format!("[{}]", stage.kind.as_str()).dimmed()
            );
        }
    }
    Ok(())
}

async fn init(target_dir: PathBuf, force: bool, minimal: bool) -> Result<()> {
    let written = generate_runkit_structure(InitOptions {
        target_dir,
        force,
        minimal,
    })
    .await?;

    println!("{}", "Initialized runkit project".green());
    for path in written {
        println!("  {}", path.display());
    }
    Ok(())
}
