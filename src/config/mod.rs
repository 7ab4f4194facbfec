//! Configuration Management
//!
//! Hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/codextract/config.toml)
//! 3. Project config (.codextract/config.toml)
//! 4. Explicit `--config` file
//! 5. Environment variables (CODEXTRACT_*)
//! 6. CLI arguments (highest priority, applied by each command)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
