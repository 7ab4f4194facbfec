//! Report exporters
//!
//! Every tool result converts into a [`Report`] via [`ToReport`]; an
//! [`Exporter`] renders that report into one output format. The
//! [`ExportManager`] owns the registered exporters and writes files.

pub mod archive;
pub mod csv;
pub mod html;
pub mod json;
pub mod markdown;
pub mod report;
pub mod text;

pub use archive::create_archive;
pub use report::{Report, ReportSection, ReportTable, ToReport};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::types::{CodexError, Result};

// =============================================================================
// Formats
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    #[serde(alias = "text")]
    Txt,
    #[serde(alias = "htm")]
    Html,
    #[serde(alias = "md")]
    Markdown,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Json,
        ExportFormat::Csv,
        ExportFormat::Txt,
        ExportFormat::Html,
        ExportFormat::Markdown,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Txt => "txt",
            Self::Html => "html",
            Self::Markdown => "markdown",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            other => other.name(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Csv => "CSV",
            Self::Txt => "Plain text",
            Self::Html => "HTML",
            Self::Markdown => "Markdown",
        }
    }

    /// Infer the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            "txt" => Some(Self::Txt),
            "html" | "htm" => Some(Self::Html),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Format named by the file extension: `Ok(None)` when there is no
    /// extension, an `Export` error when it names no known format
    pub fn detect(path: &Path) -> Result<Option<Self>> {
        match path.extension() {
            None => Ok(None),
            Some(ext) => ext.to_string_lossy().parse().map(Some),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportFormat {
    type Err = CodexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "txt" | "text" => Ok(Self::Txt),
            "html" | "htm" => Ok(Self::Html),
            "md" | "markdown" => Ok(Self::Markdown),
            other => Err(CodexError::Export(format!(
                "Unsupported format '{}'. Available: {}",
                other,
                available_list(&ExportFormat::ALL)
            ))),
        }
    }
}

fn available_list(formats: &[ExportFormat]) -> String {
    formats
        .iter()
        .map(|f| f.name())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Exporter
// =============================================================================

/// Renders a report into one output format
pub trait Exporter: Send + Sync {
    fn format(&self) -> ExportFormat;

    fn render(&self, report: &Report) -> Result<Vec<u8>>;
}

/// Result of writing one export file
#[derive(Debug, Clone, Serialize)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub format: String,
    pub size: u64,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

pub struct ExportManager {
    exporters: BTreeMap<ExportFormat, Box<dyn Exporter>>,
}

impl Default for ExportManager {
    fn default() -> Self {
        let mut manager = Self::empty();
        manager.register(Box::new(json::JsonExporter));
        manager.register(Box::new(self::csv::CsvExporter));
        manager.register(Box::new(text::TextExporter));
        manager.register(Box::new(html::HtmlExporter));
        manager.register(Box::new(markdown::MarkdownExporter));
        manager
    }
}

impl ExportManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager with no exporters registered
    pub fn empty() -> Self {
        Self {
            exporters: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, exporter: Box<dyn Exporter>) {
        self.exporters.insert(exporter.format(), exporter);
    }

    pub fn available_formats(&self) -> Vec<ExportFormat> {
        self.exporters.keys().copied().collect()
    }

    /// Write `report` to `path`. Without an explicit format it is inferred
    /// from the file extension; an unknown or missing extension is an error.
    pub fn export(
        &self,
        report: &Report,
        path: &Path,
        format: Option<ExportFormat>,
    ) -> Result<ExportOutcome> {
        let start = Instant::now();
        let format = match format {
            Some(format) => format,
            None => ExportFormat::detect(path)?.ok_or_else(|| {
                CodexError::Export(format!(
                    "Cannot infer a format for '{}'. Available: {}",
                    path.display(),
                    available_list(&self.available_formats())
                ))
            })?,
        };

        let exporter = self.exporters.get(&format).ok_or_else(|| {
            CodexError::Export(format!(
                "Unsupported format '{}'. Available: {}",
                format,
                available_list(&self.available_formats())
            ))
        })?;

        let bytes = exporter.render(report)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &bytes)?;

        let outcome = ExportOutcome {
            path: path.to_path_buf(),
            format: format.name().to_string(),
            size: bytes.len() as u64,
            elapsed: start.elapsed(),
        };
        info!(path = %path.display(), format = %format, size = outcome.size, "Exported report");
        Ok(outcome)
    }

    /// Export once per format, deriving each file name from `base` with the
    /// format's extension
    pub fn export_multiple(
        &self,
        report: &Report,
        base: &Path,
        formats: &[ExportFormat],
    ) -> Result<Vec<ExportOutcome>> {
        let mut outcomes = Vec::with_capacity(formats.len());
        for format in formats {
            let path = base.with_extension(format.extension());
            debug!(path = %path.display(), "Exporting");
            outcomes.push(self.export(report, &path, Some(*format))?);
        }
        Ok(outcomes)
    }
}
