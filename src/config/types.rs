//! Configuration Types
//!
//! One section per tool plus export and logging settings. Every section
//! deserializes with defaults so partial files are valid.

use serde::{Deserialize, Serialize};

use crate::constants::{python, scanner, vba};
use crate::export::ExportFormat;
use crate::types::{CodexError, Result};
use crate::vba::ExtractionMethod;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    pub vba_extractor: VbaExtractorConfig,

    pub python_analyzer: PythonAnalyzerConfig,

    pub folder_scanner: FolderScannerConfig,

    pub vba_optimizer: VbaOptimizerConfig,

    pub export: ExportConfig,

    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            vba_extractor: VbaExtractorConfig::default(),
            python_analyzer: PythonAnalyzerConfig::default(),
            folder_scanner: FolderScannerConfig::default(),
            vba_optimizer: VbaOptimizerConfig::default(),
            export: ExportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `CodexError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.python_analyzer.max_workers == 0 {
            return Err(CodexError::Config(
                "python_analyzer.max_workers must be greater than 0".to_string(),
            ));
        }

        let indent = self.vba_optimizer.indent_size;
        if indent == 0 || indent > 16 {
            return Err(CodexError::Config(format!(
                "vba_optimizer.indent_size must be between 1 and 16, got {}",
                indent
            )));
        }

        if self.folder_scanner.max_file_size_kb == 0 {
            return Err(CodexError::Config(
                "folder_scanner.max_file_size_kb must be greater than 0".to_string(),
            ));
        }

        if self.vba_extractor.timeout_secs == 0 {
            return Err(CodexError::Config(
                "vba_extractor.timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// VBA Extraction
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VbaExtractorConfig {
    pub method: ExtractionMethod,

    /// Write one file per module
    pub create_individual_files: bool,

    /// Write all modules into a single `.txt` file
    pub create_concatenated_file: bool,

    /// Command used for the olevba backend
    pub olevba_command: String,

    pub timeout_secs: u64,
}

impl Default for VbaExtractorConfig {
    fn default() -> Self {
        Self {
            method: ExtractionMethod::Auto,
            create_individual_files: true,
            create_concatenated_file: true,
            olevba_command: vba::DEFAULT_OLEVBA_COMMAND.to_string(),
            timeout_secs: vba::DEFAULT_OLEVBA_TIMEOUT_SECS,
        }
    }
}

// =============================================================================
// Python Analysis
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PythonAnalyzerConfig {
    pub include_subdirs: bool,

    /// Files analyzed concurrently
    pub max_workers: usize,

    /// Directory names never descended into
    pub exclude_dirs: Vec<String>,

    /// File-name globs to skip, e.g. `test_*`
    pub exclude_patterns: Vec<String>,

    pub report_format: ExportFormat,
}

impl Default for PythonAnalyzerConfig {
    fn default() -> Self {
        Self {
            include_subdirs: true,
            max_workers: python::DEFAULT_MAX_WORKERS,
            exclude_dirs: strings(python::DEFAULT_EXCLUDE_DIRS),
            exclude_patterns: Vec::new(),
            report_format: ExportFormat::Html,
        }
    }
}

// =============================================================================
// Folder Scanning
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderScannerConfig {
    pub include_content: bool,

    pub include_binary: bool,

    /// Largest file whose content is embedded
    pub max_file_size_kb: u64,

    /// Directory names or globs
    pub excluded_dirs: Vec<String>,

    /// Extensions including the dot, e.g. `.exe`
    pub excluded_extensions: Vec<String>,

    pub output_format: ExportFormat,
}

impl Default for FolderScannerConfig {
    fn default() -> Self {
        Self {
            include_content: true,
            include_binary: false,
            max_file_size_kb: scanner::DEFAULT_MAX_FILE_SIZE_KB,
            excluded_dirs: strings(scanner::DEFAULT_EXCLUDED_DIRS),
            excluded_extensions: strings(scanner::DEFAULT_EXCLUDED_EXTENSIONS),
            output_format: ExportFormat::Txt,
        }
    }
}

// =============================================================================
// VBA Optimization
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VbaOptimizerConfig {
    pub remove_comments: bool,
    pub auto_indent: bool,
    pub remove_empty_lines: bool,
    pub rename_unused_vars: bool,
    pub minify: bool,
    pub indent_size: usize,

    /// Keep a `.bak` copy when overwriting the input
    pub create_backup: bool,
}

impl Default for VbaOptimizerConfig {
    fn default() -> Self {
        Self {
            remove_comments: false,
            auto_indent: true,
            remove_empty_lines: true,
            rename_unused_vars: false,
            minify: false,
            indent_size: 4,
            create_backup: true,
        }
    }
}

// =============================================================================
// Export & Logging
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub default_format: ExportFormat,

    /// Append `_YYYYMMDD_HHMMSS` to generated report names
    pub include_timestamp: bool,

    /// Zip the written reports
    pub compress_output: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_format: ExportFormat::Html,
            include_timestamp: true,
            compress_output: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,

    /// Log file path; empty disables file logging
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.vba_optimizer.indent_size, 4);
        assert!(config.folder_scanner.excluded_dirs.contains(&"*.egg-info".to_string()));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = Config::default();
        config.vba_optimizer.indent_size = 17;
        assert!(matches!(config.validate(), Err(CodexError::Config(_))));

        let mut config = Config::default();
        config.python_analyzer.max_workers = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.folder_scanner.max_file_size_kb = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.vba_extractor.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [vba_extractor]
            method = "native"

            [export]
            default_format = "md"
            "#,
        )
        .unwrap();
        assert_eq!(config.vba_extractor.method, ExtractionMethod::Native);
        assert!(config.vba_extractor.create_individual_files);
        assert_eq!(config.export.default_format, ExportFormat::Markdown);
        assert_eq!(config.python_analyzer, PythonAnalyzerConfig::default());
    }
}
