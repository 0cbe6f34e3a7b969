//! Directory structure and file generation for `.runkit` initialization.

use super::assets::{get_asset, list_assets};
use super::error::{InitError, InitResult};
use crate::config::CONFIG_DIR;
use std::fs;
use std::path::{Path, PathBuf};

/// Options for initializing a `.runkit` directory.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Target directory where `.runkit` will be created.
    pub target_dir: PathBuf,

    /// Overwrite existing files if the directory already exists.
    pub force: bool,

    /// Only write `config.toml`; the built-in templates stay in effect.
    pub minimal: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            target_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            force: false,
            minimal: false,
        }
    }
}

/// Generate a `.runkit` directory:
///
/// ```text
/// .runkit/
/// ├── config.toml
/// └── templates/          (unless minimal)
///     ├── code_generation.yaml
///     └── deployment.yaml
/// ```
///
/// Returns the paths written, in order.
///
/// # Errors
/// - `DirectoryExists` if `.runkit` exists and `force` is not set
/// - `AssetNotFound` if an embedded file is missing
/// - `DirectoryCreate` / `FileWrite` on file system failures
pub async fn generate_runkit_structure(options: InitOptions) -> InitResult<Vec<PathBuf>> {
    let rk_dir = options.target_dir.join(CONFIG_DIR);

    if rk_dir.exists() && !options.force {
        return Err(InitError::DirectoryExists(rk_dir));
    }

    fs::create_dir_all(&rk_dir).map_err(|source| InitError::DirectoryCreate {
        path: rk_dir.clone(),
        source,
    })?;

    let mut written = vec![write_asset_file(&rk_dir, "config.toml")?];

    if !options.minimal {
        for path in list_assets("templates/") {
            written.push(write_asset_file(&rk_dir, &path)?);
        }
    }

    tracing::info!(path = %rk_dir.display(), files = written.len(), "Initialized runkit directory");
    Ok(written)
}

fn write_asset_file(rk_dir: &Path, asset_path: &str) -> InitResult<PathBuf> {
    let content =
        get_asset(asset_path).ok_or_else(|| InitError::AssetNotFound(asset_path.to_string()))?;

    let target_path = rk_dir.join(asset_path);

    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|source| InitError::DirectoryCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(&target_path, content).map_err(|source| InitError::FileWrite {
        path: target_path.clone(),
        source,
    })?;

    Ok(target_path)
}
