//! Scaffold files embedded into the binary.
//!
//! Everything under the crate's `assets/` directory is embedded at compile
//! time. With the `debug-embed` feature the files are read from disk in
//! debug builds as well, so edits show up without a rebuild of the asset
//! table.

use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/assets"]
pub struct ScaffoldAssets;

/// Content of an embedded file, by path relative to `assets/`.
///
/// # Example
/// ```
/// use rk_core::init::assets::get_asset;
///
/// let config = get_asset("config.toml").expect("config.toml should exist");
/// assert!(config.contains("stage_timeout_secs"));
/// ```
pub fn get_asset(path: &str) -> Option<String> {
    ScaffoldAssets::get(path).map(|file| String::from_utf8_lossy(file.data.as_ref()).to_string())
}

/// Embedded paths starting with `prefix`, sorted.
pub fn list_assets(prefix: &str) -> Vec<String> {
    let mut paths: Vec<String> = ScaffoldAssets::iter()
        .filter(|path| path.starts_with(prefix))
        .map(|path| path.to_string())
        .collect();
    paths.sort();
    paths
}
