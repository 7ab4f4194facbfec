//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/codextract/config.toml)
//! 3. Project config (.codextract/config.toml)
//! 4. Explicit `--config` file
//! 5. Environment variables (CODEXTRACT_<SECTION>__<KEY>)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use super::types::Config;
use crate::types::{CodexError, Result};

const ENV_PREFIX: &str = "CODEXTRACT_";
const APP_DIR: &str = "codextract";
const PROJECT_DIR: &str = ".codextract";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → global → project → explicit file → env vars
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        if let Some(path) = explicit
            && !path.exists()
        {
            return Err(CodexError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let mut files = Vec::new();
        if let Some(global) = Self::global_config_path() {
            files.push(global);
        }
        files.push(Self::project_config_path());
        files.extend(explicit.map(Path::to_path_buf));

        let figment = Self::layered(&files).merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(figment)
    }

    /// Load defaults overlaid with a single file
    pub fn load_from_file(path: &Path) -> Result<Config> {
        Self::extract(Self::layered(&[path.to_path_buf()]))
    }

    /// Defaults followed by every existing file in order
    fn layered(files: &[PathBuf]) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        for file in files.iter().filter(|f| f.exists()) {
            debug!("Loading config from: {}", file.display());
            figment = figment.merge(Toml::file(file));
        }
        figment
    }

    fn extract(figment: Figment) -> Result<Config> {
        let config: Config = figment
            .extract()
            .map_err(|e| CodexError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/codextract/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join(APP_DIR))
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn project_config_path() -> PathBuf {
        PathBuf::from(PROJECT_DIR).join("config.toml")
    }

    /// Config file targeted by `init` and `edit`
    pub fn target_path(global: bool) -> Result<PathBuf> {
        if global {
            Self::global_config_path().ok_or_else(|| {
                CodexError::Config("Cannot determine global config path".to_string())
            })
        } else {
            Ok(Self::project_config_path())
        }
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Render the effective configuration as `toml` or `json`
    pub fn render(config: &Config, format: &str) -> Result<String> {
        match format.to_ascii_lowercase().as_str() {
            "json" => Ok(serde_json::to_string_pretty(config)?),
            "toml" => toml::to_string_pretty(config).map_err(|e| CodexError::Config(e.to_string())),
            other => Err(CodexError::Config(format!(
                "Invalid format '{}'. Valid values: toml, json",
                other
            ))),
        }
    }

    /// Write a commented default file. Returns `false` when a file already
    /// exists and `force` is not set.
    pub fn init_at(path: &Path, force: bool) -> Result<bool> {
        if path.exists() && !force {
            info!("Config exists: {}", path.display());
            return Ok(false);
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, Self::default_config_file())?;
        info!("Created config: {}", path.display());
        Ok(true)
    }

    /// Edit config file with default editor
    pub fn edit_config(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(CodexError::Config(format!(
                "Config file does not exist: {}. Run `codextract config init` first",
                path.display()
            )));
        }

        let editor = env::var("EDITOR").unwrap_or_else(|_| {
            if cfg!(target_os = "macos") {
                "open".to_string()
            } else if cfg!(target_os = "windows") {
                "notepad".to_string()
            } else {
                "vi".to_string()
            }
        });

        let status = Command::new(&editor).arg(path).status().map_err(|e| {
            CodexError::Config(format!("Failed to launch editor {}: {}", editor, e))
        })?;

        if !status.success() {
            return Err(CodexError::Config("Editor exited with error".to_string()));
        }
        Ok(())
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn default_config_file() -> String {
        r#"# codextract configuration
# Global: ~/.config/codextract/config.toml
# Project: .codextract/config.toml (overrides global)
# Environment: CODEXTRACT_<SECTION>__<KEY>, e.g. CODEXTRACT_VBA_OPTIMIZER__INDENT_SIZE=2

version = "1.0"

[vba_extractor]
# auto | native | olevba
method = "auto"
create_individual_files = true
create_concatenated_file = true
olevba_command = "olevba"
timeout_secs = 120

[python_analyzer]
include_subdirs = true
max_workers = 4
exclude_dirs = ["__pycache__", ".git", "venv", ".venv", "node_modules"]
# File-name globs, e.g. ["test_*"]
exclude_patterns = []
report_format = "html"

[folder_scanner]
include_content = true
include_binary = false
max_file_size_kb = 1024
# Names or globs; uncomment to replace the built-in list
# excluded_dirs = [".git", "node_modules", "*.egg-info"]
# excluded_extensions = [".exe", ".dll", ".png"]
output_format = "txt"

[vba_optimizer]
remove_comments = false
auto_indent = true
remove_empty_lines = true
rename_unused_vars = false
minify = false
indent_size = 4
create_backup = true

[export]
# json | csv | txt | html | markdown
default_format = "html"
include_timestamp = true
compress_output = false

[logging]
level = "info"
# Empty disables the log file
file = ""
"#
        .to_string()
    }
}
