//! Scaffolding for new `.runkit/` directories.
//!
//! `runkit init` writes a commented `config.toml` and the built-in stage
//! templates as editable YAML files.
//!
//! # Example
//!
//! ```no_run
//! use rk_core::init::{generate_runkit_structure, InitOptions};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = InitOptions {
//!     target_dir: PathBuf::from("."),
//!     force: false,
//!     minimal: false,
//! };
//!
//! let written = generate_runkit_structure(options).await?;
//! println!("Wrote {} files", written.len());
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod error;
pub mod generator;

pub use assets::{get_asset, list_assets};
pub use error::{InitError, InitResult};
pub use generator::{generate_runkit_structure, InitOptions};
