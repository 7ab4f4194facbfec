//! Directory Scanner
//!
//! Walks a directory tree into an in-memory hierarchy, then renders it as
//! a tree, flat file rows, per-extension totals or a full text report.

pub mod folder;
pub mod report;
pub mod tree;

pub use folder::{DirectoryEntry, FileEntry, FolderScanner, ScanOptions, ScanResult};
pub use report::write_text_report;
pub use tree::{ExtensionStat, FlatFile, extension_stats, files_flat, generate_tree};
