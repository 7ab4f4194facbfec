//! CLI Common Utilities
//!
//! Shared config loading and report export for command handlers.

use std::path::{Path, PathBuf};

use crate::cli::ui::Output;
use crate::config::{Config, ConfigLoader};
use crate::export::{ExportFormat, ExportManager, ExportOutcome, Report, create_archive};
use crate::types::Result;
use crate::util::{format_size, timestamp};

/// Command execution context
pub struct CommandContext {
    pub config: Config,
    pub output: Output,
}

impl CommandContext {
    /// Load the merged configuration, honoring an explicit `--config` file
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        Ok(Self::with_config(ConfigLoader::load(config_path)?))
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            output: Output::new(),
        }
    }

    /// Export `report` to `path` and print the outcome. When
    /// `export.compress_output` is set the written file is also zipped.
    pub fn export_report(
        &self,
        report: &Report,
        path: &Path,
        format: Option<ExportFormat>,
    ) -> Result<Vec<ExportOutcome>> {
        let outcome = ExportManager::new().export(report, path, format)?;
        self.output.success(&format!(
            "Report written: {} ({}, {})",
            outcome.path.display(),
            outcome.format,
            format_size(outcome.size)
        ));

        let mut outcomes = vec![outcome];
        if let Some(archive) = self.compress(&[path.to_path_buf()])? {
            outcomes.push(archive);
        }
        Ok(outcomes)
    }

    /// Where a report goes: the explicit path, or a default name in the
    /// working directory when only a format was requested
    pub fn report_target(
        &self,
        explicit: Option<PathBuf>,
        format: Option<ExportFormat>,
        stem: &str,
    ) -> Option<PathBuf> {
        explicit.or_else(|| {
            format.map(|f| default_report_path(&self.config, Path::new("."), stem, f))
        })
    }

    /// Format for a report at `path`: the explicit one, else the file
    /// extension, else `default` when the path has no extension. An unknown
    /// extension is an error rather than a silent substitution.
    pub fn resolve_format(
        &self,
        path: &Path,
        explicit: Option<ExportFormat>,
        default: ExportFormat,
    ) -> Result<ExportFormat> {
        match explicit {
            Some(format) => Ok(format),
            None => Ok(ExportFormat::detect(path)?.unwrap_or(default)),
        }
    }

    /// Zip `files` next to the first one when compression is enabled
    pub fn compress(&self, files: &[PathBuf]) -> Result<Option<ExportOutcome>> {
        let Some(first) = files.first() else {
            return Ok(None);
        };
        if !self.config.export.compress_output {
            return Ok(None);
        }
        let archive = create_archive(files, &first.with_extension("zip"))?;
        self.output.success(&format!(
            "Archive written: {} ({})",
            archive.path.display(),
            format_size(archive.size)
        ));
        Ok(Some(archive))
    }
}

/// Default report location for `stem` inside `dir`, with a timestamp suffix
/// when `include_timestamp` is enabled
pub fn default_report_path(
    config: &Config,
    dir: &Path,
    stem: &str,
    format: ExportFormat,
) -> PathBuf {
    let name = if config.export.include_timestamp {
        format!("{}_{}.{}", stem, timestamp(), format.extension())
    } else {
        format!("{}.{}", stem, format.extension())
    };
    dir.join(name)
}
