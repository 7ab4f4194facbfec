//! Recursive directory walk with optional content capture.

use chrono::{DateTime, Local};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize, Serializer};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::FolderScannerConfig;
use crate::constants::scanner::{
    BINARY_EXTENSIONS, BINARY_PREVIEW_BYTES, DEFAULT_EXCLUDED_DIRS, DEFAULT_EXCLUDED_EXTENSIONS,
    DEFAULT_MAX_FILE_SIZE_KB,
};
use crate::types::{CodexError, Result};
use crate::util::{decode_text, hex_dump};

fn serialize_secs<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Local>,
    /// Lowercase, with the leading dot; empty when the name has none
    pub extension: String,
    pub is_binary: bool,
    pub content: Option<String>,
    pub encoding: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub path: PathBuf,
    pub name: String,
    pub files: Vec<FileEntry>,
    pub subdirectories: Vec<DirectoryEntry>,
}

impl DirectoryEntry {
    /// Files in this directory and below
    pub fn total_files(&self) -> usize {
        self.files.len() + self.subdirectories.iter().map(Self::total_files).sum::<usize>()
    }

    /// Directories below this one
    pub fn total_directories(&self) -> usize {
        self.subdirectories.len()
            + self
                .subdirectories
                .iter()
                .map(Self::total_directories)
                .sum::<usize>()
    }

    /// Bytes in this directory and below
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum::<u64>()
            + self.subdirectories.iter().map(Self::total_size).sum::<u64>()
    }

    /// Depth-first iterator over every file, this directory's files first
    pub fn walk_files(&self) -> Vec<&FileEntry> {
        let mut out: Vec<&FileEntry> = self.files.iter().collect();
        for sub in &self.subdirectories {
            out.extend(sub.walk_files());
        }
        out
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub root_path: PathBuf,
    pub root: Option<DirectoryEntry>,
    pub total_files: usize,
    pub total_directories: usize,
    pub total_size: u64,
    #[serde(serialize_with = "serialize_secs")]
    pub scan_time: Duration,
    pub errors: Vec<String>,
    pub cancelled: bool,
}

// =============================================================================
// Options
// =============================================================================

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Directory names or globs
    pub excluded_dirs: Vec<String>,
    /// Lowercase extensions with the leading dot
    pub excluded_extensions: Vec<String>,
    pub max_file_size: u64,
    pub include_content: bool,
    pub include_binary: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
            excluded_extensions: DEFAULT_EXCLUDED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE_KB * 1024,
            include_content: true,
            include_binary: false,
        }
    }
}

impl From<&FolderScannerConfig> for ScanOptions {
    fn from(config: &FolderScannerConfig) -> Self {
        Self {
            excluded_dirs: config.excluded_dirs.clone(),
            excluded_extensions: config.excluded_extensions.clone(),
            max_file_size: config.max_file_size_kb * 1024,
            include_content: config.include_content,
            include_binary: config.include_binary,
        }
    }
}

fn normalize_extension(ext: &str) -> String {
    let lower = ext.trim().to_lowercase();
    if lower.is_empty() || lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}

fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

// =============================================================================
// Scanner
// =============================================================================

type ProgressCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Directory exclusions: exact names plus globs matched against the name
#[derive(Debug, Clone, Default)]
struct DirFilter {
    names: Vec<String>,
    globs: Vec<glob::Pattern>,
}

impl DirFilter {
    fn new(entries: &[String]) -> Self {
        let mut filter = Self::default();
        for entry in entries {
            if entry.contains(['*', '?', '[']) {
                match glob::Pattern::new(entry) {
                    Ok(pattern) => filter.globs.push(pattern),
                    Err(e) => warn!("Ignoring invalid directory pattern '{}': {}", entry, e),
                }
            } else {
                filter.names.push(entry.clone());
            }
        }
        filter
    }

    fn matches(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name) || self.globs.iter().any(|g| g.matches(name))
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Pop the innermost open directory into its parent
fn close_directory(stack: &mut Vec<DirectoryEntry>) {
    if let Some(done) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.subdirectories.push(done);
        }
    }
}

pub struct FolderScanner {
    options: ScanOptions,
    dir_filter: DirFilter,
    excluded_extensions: Vec<String>,
    stop_flag: Arc<AtomicBool>,
    on_progress: Option<ProgressCallback>,
}

impl Default for FolderScanner {
    fn default() -> Self {
        Self::new(ScanOptions::default())
    }
}

impl FolderScanner {
    pub fn new(options: ScanOptions) -> Self {
        let excluded_extensions = options
            .excluded_extensions
            .iter()
            .map(|e| normalize_extension(e))
            .collect();

        Self {
            dir_filter: DirFilter::new(&options.excluded_dirs),
            options,
            excluded_extensions,
            stop_flag: Arc::new(AtomicBool::new(false)),
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Request cancellation. The flag is never cleared, so a stop requested
    /// before `scan` starts still takes effect.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Shared flag that cancels the scan when set, e.g. from a Ctrl-C handler
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_flag)
    }

    fn should_stop(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }

    fn is_excluded_file(&self, name: &str) -> bool {
        let ext = extension_of(name);
        !ext.is_empty() && self.excluded_extensions.contains(&ext)
    }

    pub fn scan(&self, dir: &Path) -> Result<ScanResult> {
        if !dir.exists() {
            return Err(CodexError::not_found(dir));
        }
        if !dir.is_dir() {
            return Err(CodexError::NotADirectory(dir.to_path_buf()));
        }

        let start = Instant::now();
        let mut errors = Vec::new();

        let root = self.walk(dir, &mut errors);
        let cancelled = self.should_stop();

        let (total_files, total_directories, total_size) = root
            .as_ref()
            .map(|r| (r.total_files(), r.total_directories(), r.total_size()))
            .unwrap_or_default();

        info!(
            "Scanned {}: {} files, {} directories, {} errors",
            dir.display(),
            total_files,
            total_directories,
            errors.len()
        );

        Ok(ScanResult {
            root_path: dir.to_path_buf(),
            root,
            total_files,
            total_directories,
            total_size,
            scan_time: start.elapsed(),
            errors,
            cancelled,
        })
    }

    /// Depth-first sorted walk folded back into the nested directory tree.
    /// `None` when the scan was stopped before the root was visited.
    fn walk(&self, dir: &Path, errors: &mut Vec<String>) -> Option<DirectoryEntry> {
        let filter = self.dir_filter.clone();
        let walker = WalkBuilder::new(dir)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                !(is_dir && entry.depth() > 0 && filter.matches(&entry.file_name().to_string_lossy()))
            })
            .build();

        // Open directories from the root down to the parent of the current entry
        let mut stack: Vec<DirectoryEntry> = Vec::new();
        for item in walker {
            if self.should_stop() {
                break;
            }
            let entry = match item {
                Ok(entry) => entry,
                Err(e) => {
                    errors.push(format!("Error reading {}", e));
                    continue;
                }
            };
            let Some(file_type) = entry.file_type() else {
                continue;
            };

            while stack.len() > entry.depth() {
                close_directory(&mut stack);
            }

            let path = entry.path();
            if file_type.is_dir() {
                if let Some(callback) = &self.on_progress {
                    callback(&format!("Scanning: {}", path.display()));
                }
                stack.push(DirectoryEntry {
                    path: path.to_path_buf(),
                    name: dir_name(path),
                    ..Default::default()
                });
                continue;
            }

            // Symlinked directories are never followed; symlinked files are listed
            let is_file = file_type.is_file()
                || (file_type.is_symlink() && fs::metadata(path).is_ok_and(|m| m.is_file()));
            if !is_file || self.is_excluded_file(&entry.file_name().to_string_lossy()) {
                continue;
            }
            let file = self.scan_file(path);
            if let Some(parent) = stack.last_mut() {
                parent.files.push(file);
            }
        }

        while stack.len() > 1 {
            close_directory(&mut stack);
        }
        stack.pop()
    }

    fn scan_file(&self, path: &Path) -> FileEntry {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = extension_of(&name);

        let mut entry = FileEntry {
            path: path.to_path_buf(),
            name,
            size: 0,
            modified: Local::now(),
            is_binary: BINARY_EXTENSIONS.contains(&extension.as_str()),
            extension,
            content: None,
            encoding: "utf-8".to_string(),
            error: None,
        };

        match fs::metadata(path) {
            Ok(metadata) => {
                entry.size = metadata.len();
                if let Ok(modified) = metadata.modified() {
                    entry.modified = DateTime::<Local>::from(modified);
                }
            }
            Err(e) => {
                entry.error = Some(e.to_string());
                return entry;
            }
        }

        let wants_content = self.options.include_content
            && entry.size <= self.options.max_file_size
            && (!entry.is_binary || self.options.include_binary);
        if wants_content {
            let read = if entry.is_binary {
                read_binary_preview(path).map(|content| (content, "binary".to_string()))
            } else {
                fs::read(path).map(|bytes| {
                    let (text, encoding) = decode_text(&bytes);
                    (text, encoding.as_str().to_string())
                })
            };
            match read {
                Ok((content, encoding)) => {
                    entry.content = Some(content);
                    entry.encoding = encoding;
                }
                Err(e) => {
                    if entry.is_binary {
                        entry.encoding = "binary".to_string();
                    }
                    entry.error = Some(e.to_string());
                }
            }
        }

        debug!("Scanned file {} ({} bytes)", entry.path.display(), entry.size);
        entry
    }
}

fn read_binary_preview(path: &Path) -> std::io::Result<String> {
    let mut data = Vec::with_capacity(BINARY_PREVIEW_BYTES);
    fs::File::open(path)?
        .take(BINARY_PREVIEW_BYTES as u64)
        .read_to_end(&mut data)?;
    Ok(format!(
        "[Binary content - {} bytes shown]\n{}",
        data.len(),
        hex_dump(&data)
    ))
}
