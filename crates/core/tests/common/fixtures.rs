//! Test fixtures for creating templates, engines and config directories.

use rk_core::executors::ExecutorRegistry;
use rk_core::templates::TemplateCatalog;
use rk_core::{Engine, EngineConfig};
use rk_protocol::{GoalKind, RunTemplate, StageKind, StageTemplate};
use std::time::Duration;
use tempfile::TempDir;

/// A deployment template with one stage per `(id, kind)` pair.
pub fn deployment_template(stages: &[(&str, StageKind)]) -> RunTemplate {
    RunTemplate::new(
        GoalKind::Deployment,
        stages
            .iter()
            .map(|(id, kind)| StageTemplate::new(*id, *kind))
            .collect(),
    )
}

/// `build`, `deploy`, `notify`.
pub fn build_deploy_notify() -> RunTemplate {
    deployment_template(&[
        ("build", StageKind::Build),
        ("deploy", StageKind::Deploy),
        ("notify", StageKind::Notify),
    ])
}

/// The built-in catalog with the deployment template replaced.
pub fn catalog_with(template: RunTemplate) -> TemplateCatalog {
    TemplateCatalog::builtin()
        .with(template)
        .expect("test template should be valid")
}

/// Engine with the default config.
pub fn engine_with(registry: ExecutorRegistry, templates: TemplateCatalog) -> Engine {
    Engine::new(registry, templates, EngineConfig::default())
}

/// Engine with a short stage timeout.
#[allow(dead_code)]
pub fn engine_with_timeout(
    registry: ExecutorRegistry,
    templates: TemplateCatalog,
    stage_timeout: Duration,
) -> Engine {
    Engine::new(
        registry,
        templates,
        EngineConfig {
            stage_timeout,
            ..EngineConfig::default()
        },
    )
}

/// Create a temporary project with a `.runkit/` directory holding the given
/// `config.toml` and template files.
#[allow(dead_code)]
pub fn create_test_project(config_toml: &str, templates: &[(&str, &str)]) -> std::io::Result<TempDir> {
    let temp_dir = tempfile::tempdir()?;
    let rk_dir = temp_dir.path().join(".runkit");

    std::fs::create_dir_all(rk_dir.join("templates"))?;
    std::fs::write(rk_dir.join("config.toml"), config_toml)?;
    for (name, content) in templates {
        std::fs::write(rk_dir.join("templates").join(name), content)?;
    }

    Ok(temp_dir)
}
