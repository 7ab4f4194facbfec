//! codextract - Code extraction and analysis toolkit
//!
//! Four independent file-processing tools behind one CLI:
//!
//! - **VBA extraction**: read macro modules out of Office files (OLE2 and
//!   OOXML) with a native MS-OVBA reader or an external `olevba` process
//! - **VBA analysis & cleanup**: procedure/variable inventory and text
//!   passes (comments, indentation, unused variables, minify)
//! - **Python analysis**: tree-sitter based structure and line metrics
//! - **Directory scanning**: tree, per-file metadata and content report
//!
//! Every result converts into an [`export::Report`] and can be written as
//! JSON, CSV, plain text, HTML or Markdown.
//!
//! ## Quick Start
//!
//! ```ignore
//! use codextract::{Config, VbaExtractor, ExtractOptions};
//!
//! let config = Config::default();
//! let extractor = VbaExtractor::new(&config.vba_extractor);
//! let report = extractor
//!     .extract(Path::new("Book1.xlsm"), Some(Path::new("out")), &ExtractOptions::default())
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`vba`]: Office containers, extraction backends, analyzer, optimizer
//! - [`python`]: Python project analysis
//! - [`scanner`]: Directory scanning and reports
//! - [`export`]: Format-neutral reports and exporters
//! - [`config`]: Layered configuration

pub mod cli;
pub mod config;
pub mod constants;
pub mod export;
pub mod python;
pub mod scanner;
pub mod types;
pub mod util;
pub mod vba;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::{CodexError, Result};

// =============================================================================
// Tool Re-exports
// =============================================================================

pub use export::{ExportFormat, ExportManager, Report, ToReport};
pub use python::{FileAnalysis, PythonAnalyzer, analyze_file};
pub use scanner::{FolderScanner, ScanOptions, ScanResult};
pub use vba::{ExtractOptions, ExtractionMethod, ExtractionReport, VbaExtractor, optimize};
