//! Config Command
//!
//! Manage codextract configuration.
//!
//! Usage:
//!   codextract config show [-f toml|json]
//!   codextract config path
//!   codextract config edit [-g]
//!   codextract config init [-g] [--force]

use std::path::Path;

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the effective configuration
pub fn show(config_path: Option<&Path>, format: &str) -> Result<()> {
    let config = ConfigLoader::load(config_path)?;
    println!("{}", ConfigLoader::render(&config, format)?.trim_end());
    Ok(())
}

/// Show configuration paths
pub fn path(config_path: Option<&Path>) -> Result<()> {
    let mark = |p: &Path| if p.exists() { "✓" } else { "✗" };

    println!("Configuration paths:");
    println!();
    match ConfigLoader::global_config_path() {
        Some(global) => println!("  Global:   {} {}", mark(&global), global.display()),
        None => println!("  Global:   (not available)"),
    }
    let project = ConfigLoader::project_config_path();
    println!("  Project:  {} {}", mark(&project), project.display());
    if let Some(explicit) = config_path {
        println!("  Explicit: {} {}", mark(explicit), explicit.display());
    }
    Ok(())
}

/// Edit configuration file
pub fn edit(global: bool) -> Result<()> {
    let path = ConfigLoader::target_path(global)?;
    ConfigLoader::edit_config(&path)?;
    Output::new().success(&format!("Config saved: {}", path.display()));
    Ok(())
}

/// Initialize global or project configuration
pub fn init(global: bool, force: bool) -> Result<()> {
    let out = Output::new();
    let path = ConfigLoader::target_path(global)?;
    if ConfigLoader::init_at(&path, force)? {
        out.success(&format!(
            "Initialized {} configuration",
            if global { "global" } else { "project" }
        ));
        println!("  Config: {}", path.display());
    } else {
        out.warning(&format!(
            "Config already exists: {} (use --force to overwrite)",
            path.display()
        ));
    }
    Ok(())
}
