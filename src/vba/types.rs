//! VBA extraction types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::types::CodexError;

/// Kind of a VBA module, as declared in the project or inferred from its code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Standard,
    Class,
    Form,
    Document,
    Unknown,
}

impl ModuleKind {
    /// File extension used when writing the module out
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Standard => "bas",
            Self::Class | Self::Document => "cls",
            Self::Form => "frm",
            Self::Unknown => "txt",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Standard => "Standard Module",
            Self::Class => "Class Module",
            Self::Form => "UserForm",
            Self::Document => "Document Module",
            Self::Unknown => "Unknown",
        }
    }

    /// Infer the kind from `Attribute VB_*` lines at the top of exported code
    pub fn infer_from_code(code: &str) -> Self {
        let predeclared_true = code.contains("Attribute VB_PredeclaredId = True");
        let has_form_base = code.contains("Attribute VB_Base")
            || code.lines().any(|l| l.trim_start().starts_with("Begin {"));

        if predeclared_true && has_form_base {
            Self::Form
        } else if code.contains("Attribute VB_PredeclaredId") {
            Self::Class
        } else if code.trim_start().starts_with("Attribute VB_") {
            Self::Standard
        } else {
            Self::Unknown
        }
    }
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One extracted module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VbaModule {
    pub name: String,
    pub kind: ModuleKind,
    pub code: String,
    pub source_file: PathBuf,
    /// Location of the module stream inside the container
    pub stream_path: String,
}

impl VbaModule {
    pub fn line_count(&self) -> usize {
        self.code.lines().count()
    }

    pub fn is_blank(&self) -> bool {
        self.code.trim().is_empty()
    }
}

/// Extraction backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    #[default]
    Auto,
    Native,
    Olevba,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Native => "native",
            Self::Olevba => "olevba",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionMethod {
    type Err = CodexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "native" => Ok(Self::Native),
            "olevba" => Ok(Self::Olevba),
            other => Err(CodexError::Config(format!(
                "Invalid extraction method '{}'. Valid values: auto, native, olevba",
                other
            ))),
        }
    }
}

/// Result of extracting one Office file
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub source_file: PathBuf,
    pub modules: Vec<VbaModule>,
    pub method_used: ExtractionMethod,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
    /// Files written to the output directory, if any
    pub written_files: Vec<PathBuf>,
}

impl ExtractionReport {
    pub fn total_modules(&self) -> usize {
        self.modules.len()
    }

    pub fn total_lines(&self) -> usize {
        self.modules.iter().map(VbaModule::line_count).sum()
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}
