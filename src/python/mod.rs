//! Python Project Analysis
//!
//! Static structure and line metrics for `.py` files, parsed with tree-sitter.

pub mod analyzer;
pub mod summary;

pub use analyzer::{
    ClassInfo, DirectoryOptions, FileAnalysis, FunctionInfo, PythonAnalyzer, analyze_file,
    collect_python_files, external_dependencies,
};
pub use summary::{ProjectSummary, generate_summary};
