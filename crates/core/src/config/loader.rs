//! Configuration file loader for the `.runkit/` directory structure.
//!
//! This module loads and parses:
//! - `config.toml`: Global settings
//! - `templates/*.yaml`: Stage template overrides, one goal kind per file

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use crate::config::models::AppConfig;
use crate::templates::TemplateCatalog;
use rk_protocol::config_models::GlobalConfig;
use rk_protocol::stage_models::RunTemplate;
use std::collections::HashSet;
use std::path::Path;
use walkdir::WalkDir;

/// Name of the configuration directory under a project root.
pub const CONFIG_DIR: &str = ".runkit";

/// Loads all configuration from the `.runkit/` directory.
///
/// # Arguments
///
/// * `root` - Root directory containing the `.runkit/` folder
///
/// # Returns
///
/// An `AppConfig` with the global settings and the template catalog. Missing
/// directories or files fall back to the defaults: default settings and the
/// built-in templates.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - Files exist but cannot be read
/// - Files have invalid TOML or YAML syntax
/// - A template has empty or duplicate stage ids
/// - Two template files define the same goal kind
/// - Settings are out of range (zero timeout, blank executor command)
pub async fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let rk_dir = root.join(CONFIG_DIR);

    if !rk_dir.exists() {
        tracing::debug!(path = %rk_dir.display(), "No config directory, using defaults");
        return Ok(AppConfig::default());
    }

    let global = load_global_config(&rk_dir)?;
    let templates = load_templates(&rk_dir)?;

    tracing::debug!(
        path = %rk_dir.display(),
        executors = global.executors.len(),
        templates = templates.len(),
        "Loaded configuration"
    );

    Ok(AppConfig { global, templates })
}

/// Loads global configuration from `config.toml`.
fn load_global_config(rk_dir: &Path) -> ConfigResult<GlobalConfig> {
    let config_path = rk_dir.join("config.toml");

    if !config_path.exists() {
        return Ok(GlobalConfig::default());
    }

    let content =
        std::fs::read_to_string(&config_path).map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;

    let config: GlobalConfig =
        toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: config_path.clone(),
            source,
        })?;

    if config.stage_timeout_secs == 0 {
        return Err(ConfigError::InvalidConfig {
            path: config_path,
            reason: "stage_timeout_secs must be greater than zero".to_string(),
        });
    }
    if let Some((kind, _)) = config
        .executors
        .iter()
        .find(|(_, command)| command.command.trim().is_empty())
    {
        return Err(ConfigError::InvalidConfig {
            path: config_path,
            reason: format!("executor command for '{kind}' is empty"),
        });
    }

    Ok(config)
}

/// Loads template overrides from `templates/*.yaml` on top of the built-ins.
fn load_templates(rk_dir: &Path) -> ConfigResult<TemplateCatalog> {
    let templates_dir = rk_dir.join("templates");
    let mut catalog = TemplateCatalog::builtin();

    if !templates_dir.exists() {
        return Ok(catalog);
    }

    let mut seen = HashSet::new();

    for entry in WalkDir::new(&templates_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ConfigError::DirectoryWalk {
            path: templates_dir.clone(),
            source,
        })?;

        let path = entry.path();

        let ext = path.extension().and_then(|s| s.to_str());
        if ext != Some("yaml") && ext != Some("yml") {
            continue;
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let template: RunTemplate =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
                path: path.to_path_buf(),
                source,
            })?;

        if !seen.insert(template.goal) {
            return Err(ConfigError::InvalidConfig {
                path: path.to_path_buf(),
                reason: format!("template for '{}' is defined more than once", template.goal),
            });
        }

        tracing::debug!(
            path = %path.display(),
            goal = %template.goal,
            stages = template.stages.len(),
            "Loaded template override"
        );

        catalog
            .insert(template)
            .map_err(|source| ConfigError::InvalidTemplate {
                path: path.to_path_buf(),
                source,
            })?;
    }

    Ok(catalog)
}
