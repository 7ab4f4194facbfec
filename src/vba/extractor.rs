//! VBA Extraction
//!
//! Two interchangeable backends sit behind the `VbaBackend` trait:
//!
//! - `NativeBackend`: reads OLE2/OOXML containers in-process (always available)
//! - `OlevbaBackend`: runs the external `olevba --json` tool
//!
//! `ExtractionMethod::Auto` tries native first and falls back to olevba
//! when the native reader fails on something olevba may handle.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::container;
use super::types::{ExtractionMethod, ExtractionReport, ModuleKind, VbaModule};
use super::writer;
use crate::config::VbaExtractorConfig;
use crate::constants::vba::SUPPORTED_EXTENSIONS;
use crate::types::{CodexError, Result};
use crate::util::json_string;

/// Whether the file extension belongs to an Office format that can carry VBA
pub fn is_supported_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

// =============================================================================
// Backend Trait
// =============================================================================

#[async_trait]
pub trait VbaBackend: Send + Sync {
    /// Backend name used in logs and errors
    fn name(&self) -> &str;

    async fn is_available(&self) -> bool;

    /// Extract every module of the file, including blank ones
    async fn extract(&self, path: &Path) -> Result<Vec<VbaModule>>;
}

/// In-process container reader
#[derive(Debug, Default, Clone)]
pub struct NativeBackend;

#[async_trait]
impl VbaBackend for NativeBackend {
    fn name(&self) -> &str {
        "native"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn extract(&self, path: &Path) -> Result<Vec<VbaModule>> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || container::read_modules(&path))
            .await
            .map_err(|e| CodexError::backend("native", format!("task failed: {}", e)))?
    }
}

/// External `olevba` process
#[derive(Debug, Clone)]
pub struct OlevbaBackend {
    command: String,
    timeout_secs: u64,
}

impl OlevbaBackend {
    pub fn new(command: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            command: command.into(),
            timeout_secs,
        }
    }

    /// Resolve the configured command to an executable path
    pub fn resolve_command(&self) -> Option<PathBuf> {
        resolve_executable(&self.command)
    }
}

/// Find an executable by explicit path or on `PATH`
fn resolve_executable(command: &str) -> Option<PathBuf> {
    let direct = Path::new(command);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_path_buf());
    }
    which::which(command).ok()
}

/// Parse `olevba --json` output into modules
pub fn parse_olevba_json(stdout: &str, source: &Path) -> Result<Vec<VbaModule>> {
    let value: Value = serde_json::from_str(stdout.trim())
        .map_err(|e| CodexError::backend("olevba", format!("invalid JSON output: {}", e)))?;
    let entries = value
        .as_array()
        .ok_or_else(|| CodexError::backend("olevba", "expected a JSON array"))?;

    let mut saw_file = false;
    let mut modules = Vec::new();

    for entry in entries {
        if json_string(entry, "type").as_deref() == Some("error") {
            let message = json_string(entry, "error").unwrap_or_else(|| "unknown error".into());
            return Err(CodexError::backend("olevba", message));
        }
        let Some(macros) = entry.get("macros") else {
            continue;
        };
        saw_file = true;

        for m in macros.as_array().into_iter().flatten() {
            let code = json_string(m, "code").unwrap_or_default();
            let vba_filename = json_string(m, "vba_filename").unwrap_or_default();
            let (name, kind) = name_and_kind(&vba_filename, &code);
            let stream = json_string(m, "ole_stream").unwrap_or_default();
            let stream_path = match json_string(m, "subfilename") {
                Some(sub) if !sub.is_empty() && sub != source.to_string_lossy() => {
                    format!("{}:{}", sub, stream)
                }
                _ => stream,
            };

            modules.push(VbaModule {
                name,
                kind,
                code: code.replace("\r\n", "\n"),
                source_file: source.to_path_buf(),
                stream_path,
            });
        }
    }

    if !saw_file {
        return Err(CodexError::backend("olevba", "no file entries in output"));
    }
    Ok(modules)
}

/// Module name and kind from an olevba file name such as `Module1.bas`
fn name_and_kind(vba_filename: &str, code: &str) -> (String, ModuleKind) {
    let path = Path::new(vba_filename);
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Unnamed".to_string());
    let kind = match path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("bas") => ModuleKind::Standard,
        Some("cls") => ModuleKind::Class,
        Some("frm") => ModuleKind::Form,
        _ => ModuleKind::infer_from_code(code),
    };
    (name, kind)
}

#[async_trait]
impl VbaBackend for OlevbaBackend {
    fn name(&self) -> &str {
        "olevba"
    }

    async fn is_available(&self) -> bool {
        self.resolve_command().is_some()
    }

    async fn extract(&self, path: &Path) -> Result<Vec<VbaModule>> {
        debug!("Running {} --json {}", self.command, path.display());

        let child = Command::new(&self.command)
            .arg("--json")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CodexError::backend("olevba", format!("failed to spawn: {}", e)))?;

        let duration = Duration::from_secs(self.timeout_secs);
        let output = timeout(duration, child.wait_with_output())
            .await
            .map_err(|_| CodexError::timeout("olevba", duration))?
            .map_err(|e| CodexError::backend("olevba", format!("execution failed: {}", e)))?;

        // olevba uses non-zero exit codes for findings, so trust the JSON over the status
        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_olevba_json(&stdout, path) {
            Ok(modules) => Ok(modules),
            Err(e) if !output.status.success() => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let message = if stderr.trim().is_empty() {
                    e.to_string()
                } else {
                    stderr.trim().to_string()
                };
                Err(CodexError::backend("olevba", message))
            }
            Err(e) => Err(e),
        }
    }
}

// =============================================================================
// Extractor
// =============================================================================

/// Per-run extraction options
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    pub method: ExtractionMethod,
    pub create_individual_files: bool,
    pub create_concatenated_file: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            method: ExtractionMethod::Auto,
            create_individual_files: true,
            create_concatenated_file: true,
        }
    }
}

impl From<&VbaExtractorConfig> for ExtractOptions {
    fn from(config: &VbaExtractorConfig) -> Self {
        Self {
            method: config.method,
            create_individual_files: config.create_individual_files,
            create_concatenated_file: config.create_concatenated_file,
        }
    }
}

pub struct VbaExtractor {
    native: Arc<dyn VbaBackend>,
    olevba: Arc<dyn VbaBackend>,
}

impl VbaExtractor {
    pub fn new(config: &VbaExtractorConfig) -> Self {
        Self::with_backends(
            Arc::new(NativeBackend),
            Arc::new(OlevbaBackend::new(&config.olevba_command, config.timeout_secs)),
        )
    }

    pub fn with_backends(native: Arc<dyn VbaBackend>, olevba: Arc<dyn VbaBackend>) -> Self {
        Self { native, olevba }
    }

    /// Methods usable on this host
    pub async fn available_methods(&self) -> Vec<ExtractionMethod> {
        let mut methods = vec![ExtractionMethod::Auto, ExtractionMethod::Native];
        if self.olevba.is_available().await {
            methods.push(ExtractionMethod::Olevba);
        }
        methods
    }

    /// Extract all modules of `path`, writing files to `output_dir` when given.
    pub async fn extract(
        &self,
        path: &Path,
        output_dir: Option<&Path>,
        options: &ExtractOptions,
    ) -> Result<ExtractionReport> {
        if !path.exists() {
            return Err(CodexError::not_found(path));
        }
        if !is_supported_file(path) {
            return Err(CodexError::unsupported(path));
        }

        let start = Instant::now();
        let (modules, method_used) = self.run_backends(path, options.method).await?;

        let modules: Vec<VbaModule> = modules.into_iter().filter(|m| !m.is_blank()).collect();
        if modules.is_empty() {
            return Err(CodexError::NoVbaCode(path.to_path_buf()));
        }

        info!(
            "Extracted {} modules from {} ({})",
            modules.len(),
            path.display(),
            method_used
        );

        let mut written_files = Vec::new();
        if let Some(dir) = output_dir {
            if options.create_individual_files {
                written_files.extend(writer::write_individual(&modules, path, dir)?);
            }
            if options.create_concatenated_file {
                written_files.push(writer::write_concatenated(&modules, path, dir)?);
            }
        }

        Ok(ExtractionReport {
            source_file: path.to_path_buf(),
            modules,
            method_used,
            elapsed: start.elapsed(),
            written_files,
        })
    }

    async fn run_backends(
        &self,
        path: &Path,
        method: ExtractionMethod,
    ) -> Result<(Vec<VbaModule>, ExtractionMethod)> {
        match method {
            ExtractionMethod::Native => Ok((self.native.extract(path).await?, ExtractionMethod::Native)),
            ExtractionMethod::Olevba => {
                if !self.olevba.is_available().await {
                    return Err(CodexError::BackendUnavailable(self.olevba.name().to_string()));
                }
                Ok((self.olevba.extract(path).await?, ExtractionMethod::Olevba))
            }
            ExtractionMethod::Auto => match self.native.extract(path).await {
                Ok(modules) => Ok((modules, ExtractionMethod::Native)),
                Err(e) if e.is_backend_recoverable() && self.olevba.is_available().await => {
                    warn!(
                        "{} extraction failed ({}), falling back to {}",
                        self.native.name(),
                        e,
                        self.olevba.name()
                    );
                    Ok((self.olevba.extract(path).await?, ExtractionMethod::Olevba))
                }
                Err(e) => Err(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vba::container::{build_ole_project, build_ooxml_package};
    use crate::vba::project::ModuleRecordType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct MockBackend {
        name: &'static str,
        available: bool,
        result: fn(&Path) -> Result<Vec<VbaModule>>,
        calls: AtomicUsize,
    }

    impl MockBackend {
        fn new(name: &'static str, available: bool, result: fn(&Path) -> Result<Vec<VbaModule>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                available,
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl VbaBackend for MockBackend {
        fn name(&self) -> &str {
            self.name
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        async fn extract(&self, path: &Path) -> Result<Vec<VbaModule>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)(path)
        }
    }

    fn one_module(path: &Path) -> Result<Vec<VbaModule>> {
        Ok(vec![VbaModule {
            name: "FromOlevba".into(),
            kind: ModuleKind::Standard,
            code: "Sub X()\nEnd Sub".into(),
            source_file: path.to_path_buf(),
            stream_path: "VBA/FromOlevba".into(),
        }])
    }

    fn broken(path: &Path) -> Result<Vec<VbaModule>> {
        Err(CodexError::NoVbaProject(path.to_path_buf()))
    }

    fn blank_only(path: &Path) -> Result<Vec<VbaModule>> {
        Ok(vec![VbaModule {
            name: "Sheet1".into(),
            kind: ModuleKind::Document,
            code: "  \n".into(),
            source_file: path.to_path_buf(),
            stream_path: "VBA/Sheet1".into(),
        }])
    }

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"placeholder").unwrap();
        path
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_file(Path::new("a.xlsm")));
        assert!(is_supported_file(Path::new("A.XLSM")));
        assert!(is_supported_file(Path::new("deck.ppsm")));
        assert!(!is_supported_file(Path::new("a.xlsx")));
        assert!(!is_supported_file(Path::new("README")));
    }

    #[tokio::test]
    async fn test_missing_and_unsupported_files() {
        let extractor = VbaExtractor::new(&VbaExtractorConfig::default());
        let result = extractor
            .extract(Path::new("/nonexistent/book.xlsm"), None, &ExtractOptions::default())
            .await;
        assert!(matches!(result, Err(CodexError::NotFound(_))));

        let dir = TempDir::new().unwrap();
        let pdf = touch(&dir, "report.pdf");
        let result = extractor.extract(&pdf, None, &ExtractOptions::default()).await;
        assert!(matches!(result, Err(CodexError::UnsupportedFile { .. })));
    }

    #[tokio::test]
    async fn test_auto_falls_back_to_olevba() {
        let dir = TempDir::new().unwrap();
        let file = touch(&dir, "book.xlsm");
        let native = MockBackend::new("native", true, broken);
        let olevba = MockBackend::new("olevba", true, one_module);
        let extractor = VbaExtractor::with_backends(native.clone(), olevba.clone());

        let report = extractor
            .extract(&file, None, &ExtractOptions::default())
            .await
            .unwrap();
        assert_eq!(report.method_used, ExtractionMethod::Olevba);
        assert_eq!(report.modules[0].name, "FromOlevba");
        assert_eq!(native.calls.load(Ordering::SeqCst), 1);
        assert_eq!(olevba.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_auto_without_fallback_returns_native_error() {
        let dir = TempDir::new().unwrap();
        let file = touch(&dir, "book.xlsm");
        let extractor = VbaExtractor::with_backends(
            MockBackend::new("native", true, broken),
            MockBackend::new("olevba", false, one_module),
        );
        let result = extractor.extract(&file, None, &ExtractOptions::default()).await;
        assert!(matches!(result, Err(CodexError::NoVbaProject(_))));
    }

    #[tokio::test]
    async fn test_explicit_unavailable_method() {
        let dir = TempDir::new().unwrap();
        let file = touch(&dir, "book.xlsm");
        let extractor = VbaExtractor::with_backends(
            MockBackend::new("native", true, one_module),
            MockBackend::new("olevba", false, one_module),
        );
        let options = ExtractOptions {
            method: ExtractionMethod::Olevba,
            ..Default::default()
        };
        let result = extractor.extract(&file, None, &options).await;
        assert!(matches!(result, Err(CodexError::BackendUnavailable(_))));
        assert_eq!(
            extractor.available_methods().await,
            vec![ExtractionMethod::Auto, ExtractionMethod::Native]
        );
    }

    #[tokio::test]
    async fn test_blank_modules_mean_no_code() {
        let dir = TempDir::new().unwrap();
        let file = touch(&dir, "book.xlsm");
        let extractor = VbaExtractor::with_backends(
            MockBackend::new("native", true, blank_only),
            MockBackend::new("olevba", true, one_module),
        );
        let result = extractor.extract(&file, None, &ExtractOptions::default()).await;
        assert!(matches!(result, Err(CodexError::NoVbaCode(_))));
    }

    #[tokio::test]
    async fn test_native_end_to_end_with_output() {
        let dir = TempDir::new().unwrap();
        let project = build_ole_project(
            "",
            &[
                ("Module1", ModuleRecordType::Procedural, "Sub Main()\n    Debug.Print 1\nEnd Sub\n"),
                ("Sheet1", ModuleRecordType::DocumentOrClass, ""),
            ],
            Some("Document=Sheet1/&H00000000\r\nModule=Module1\r\n"),
        );
        let file = dir.path().join("Book1.xlsm");
        std::fs::write(&file, build_ooxml_package(&project)).unwrap();
        let out = dir.path().join("out");

        let extractor = VbaExtractor::new(&VbaExtractorConfig::default());
        let options = ExtractOptions {
            method: ExtractionMethod::Native,
            ..Default::default()
        };
        let report = extractor.extract(&file, Some(&out), &options).await.unwrap();

        assert_eq!(report.total_modules(), 1);
        assert_eq!(report.total_lines(), 3);
        assert_eq!(report.written_files.len(), 2);
        assert!(out.join("Module1.bas").exists());
        assert!(out.join("Book1_all_vba.txt").exists());
    }

    #[test]
    fn test_parse_olevba_json() {
        let json = r#"[
            {"script_name": "olevba", "version": "0.60", "type": "MetaInformation"},
            {"file": "book.xlsm", "type": "OpenXML", "container": null,
             "macros": [
                {"vba_filename": "Module1.bas", "subfilename": "xl/vbaProject.bin",
                 "ole_stream": "VBA/Module1", "code": "Sub A()\r\nEnd Sub"},
                {"vba_filename": "ThisWorkbook.cls", "subfilename": "xl/vbaProject.bin",
                 "ole_stream": "VBA/ThisWorkbook", "code": ""}
             ]}
        ]"#;
        let modules = parse_olevba_json(json, Path::new("book.xlsm")).unwrap();
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].name, "Module1");
        assert_eq!(modules[0].kind, ModuleKind::Standard);
        assert_eq!(modules[0].code, "Sub A()\nEnd Sub");
        assert_eq!(modules[0].stream_path, "xl/vbaProject.bin:VBA/Module1");
        assert_eq!(modules[1].kind, ModuleKind::Class);
    }

    #[test]
    fn test_parse_olevba_json_errors() {
        assert!(parse_olevba_json("not json", Path::new("a.xls")).is_err());
        assert!(parse_olevba_json("{}", Path::new("a.xls")).is_err());

        let error = r#"[{"file": "a.xls", "type": "error", "error": "file not found"}]"#;
        let err = parse_olevba_json(error, Path::new("a.xls")).unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_resolve_command() {
        let missing = OlevbaBackend::new("codextract-no-such-tool", 30);
        assert!(missing.resolve_command().is_none());

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("olevba");
        std::fs::write(&script, "").unwrap();
        let explicit = OlevbaBackend::new(script.display().to_string(), 30);
        assert_eq!(explicit.resolve_command(), Some(script));

        let gone = OlevbaBackend::new(dir.path().join("nope").display().to_string(), 30);
        assert!(gone.resolve_command().is_none());
    }

    #[tokio::test]
    #[ignore = "requires olevba installed"]
    async fn test_olevba_available() {
        let backend = OlevbaBackend::new("olevba", 30);
        assert!(backend.is_available().await);
    }
}
