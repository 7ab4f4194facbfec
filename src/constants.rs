//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// VBA extraction constants
pub mod vba {
    /// Office file extensions that may carry a VBA project
    pub const SUPPORTED_EXTENSIONS: &[&str] = &[
        "xlsm", "xlsb", "xls", "xla", "xlam", // Excel
        "docm", "doc", "dotm", // Word
        "pptm", "ppt", "potm", "ppsm", // PowerPoint
    ];

    /// OLE2 compound document signature
    pub const OLE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

    /// ZIP local file header signature (OOXML packages)
    pub const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

    /// Default command for the external olevba backend
    pub const DEFAULT_OLEVBA_COMMAND: &str = "olevba";

    /// Default timeout for one olevba run (seconds)
    pub const DEFAULT_OLEVBA_TIMEOUT_SECS: u64 = 120;

    /// Width of the `=` rule in individual module headers
    pub const MODULE_HEADER_RULE: usize = 60;
}

/// Folder scanner constants
pub mod scanner {
    /// Default maximum file size whose content is embedded (KiB)
    pub const DEFAULT_MAX_FILE_SIZE_KB: u64 = 1024;

    /// Bytes shown in the hex dump of binary files
    pub const BINARY_PREVIEW_BYTES: usize = 1024;

    /// Directories skipped by default
    pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
        "__pycache__",
        ".git",
        ".svn",
        ".hg",
        "node_modules",
        ".venv",
        "venv",
        "env",
        ".idea",
        ".vscode",
        "dist",
        "build",
        ".eggs",
        "*.egg-info",
        ".tox",
        ".pytest_cache",
        ".mypy_cache",
    ];

    /// File extensions skipped by default
    pub const DEFAULT_EXCLUDED_EXTENSIONS: &[&str] = &[
        ".exe", ".dll", ".so", ".dylib", ".o", ".obj", ".pyc", ".pyo", ".pyd", ".class", ".jpg",
        ".jpeg", ".png", ".gif", ".bmp", ".ico", ".svg", ".mp3", ".mp4", ".avi", ".mov", ".wav",
        ".zip", ".tar", ".gz", ".rar", ".7z", ".pdf", ".doc", ".docx", ".xls", ".xlsx",
    ];

    /// Extensions treated as binary content
    pub const BINARY_EXTENSIONS: &[&str] = &[
        ".exe", ".dll", ".so", ".dylib", ".o", ".obj", ".pyc", ".pyo", ".pyd", ".class", ".jpg",
        ".jpeg", ".png", ".gif", ".bmp", ".ico", ".mp3", ".mp4", ".avi", ".mov", ".wav", ".zip",
        ".tar", ".gz", ".rar", ".7z", ".pdf",
    ];
}

/// Python analyzer constants
pub mod python {
    /// Default number of files analyzed concurrently
    pub const DEFAULT_MAX_WORKERS: usize = 4;

    /// Directories skipped by default
    pub const DEFAULT_EXCLUDE_DIRS: &[&str] =
        &["__pycache__", ".git", "venv", ".venv", "node_modules"];

    /// Standard library modules never reported as external dependencies
    pub const STDLIB_MODULES: &[&str] = &[
        "__future__",
        "abc",
        "argparse",
        "ast",
        "asyncio",
        "base64",
        "collections",
        "contextlib",
        "copy",
        "csv",
        "dataclasses",
        "datetime",
        "decimal",
        "email",
        "enum",
        "functools",
        "glob",
        "hashlib",
        "html",
        "http",
        "importlib",
        "inspect",
        "io",
        "itertools",
        "json",
        "logging",
        "math",
        "multiprocessing",
        "operator",
        "os",
        "pathlib",
        "pickle",
        "platform",
        "queue",
        "re",
        "shutil",
        "socket",
        "sqlite3",
        "string",
        "subprocess",
        "sys",
        "tempfile",
        "threading",
        "time",
        "typing",
        "unittest",
        "urllib",
        "uuid",
        "warnings",
        "weakref",
        "xml",
        "zipfile",
    ];
}

/// Binary inspection constants
pub mod binary {
    /// Bytes sampled when sniffing for binary content
    pub const SNIFF_SAMPLE_SIZE: usize = 8192;

    /// Share of non-text bytes above which a sample is considered binary
    pub const NON_TEXT_THRESHOLD: f64 = 0.30;

    /// Default bytes shown by the hexdump command
    pub const DEFAULT_HEX_PREVIEW_BYTES: usize = 512;
}

/// Report rendering constants
pub mod report {
    /// Rows rendered in text and HTML tables
    pub const MAX_TABLE_ROWS: usize = 100;

    /// Rows rendered in Markdown tables
    pub const MAX_MARKDOWN_ROWS: usize = 50;

    /// Width of heavy rules in text reports
    pub const RULE_WIDTH: usize = 80;

    /// Width of light rules in text reports
    pub const SUBRULE_WIDTH: usize = 40;
}
