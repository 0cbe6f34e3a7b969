//! Configuration models that aggregate all settings.

use crate::engine::EngineConfig;
use crate::templates::TemplateCatalog;
use rk_protocol::config_models::GlobalConfig;

/// Unified application configuration loaded from the `.runkit/` directory.
///
/// This structure aggregates all configuration sources:
/// - `config.toml`: Global settings
/// - `templates/*.yaml`: Stage template overrides on top of the built-ins
///
/// # Example
///
/// ```rust,no_run
/// use rk_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Loaded {} templates", config.templates.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Global settings from `config.toml`.
    pub global: GlobalConfig,

    /// The built-in templates with any overrides applied.
    pub templates: TemplateCatalog,
}

impl AppConfig {
    /// Engine settings derived from the global config.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::from(&self.global)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            global: GlobalConfig::default(),
            templates: TemplateCatalog::builtin(),
        }
    }
}
