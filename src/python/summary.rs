//! Project-level rollup of per-file Python analyses.

use serde::Serialize;

use super::analyzer::{FileAnalysis, external_dependencies};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub total_files: usize,
    pub total_lines: usize,
    pub total_code_lines: usize,
    pub total_comment_lines: usize,
    pub total_classes: usize,
    pub total_functions: usize,
    pub average_lines_per_file: f64,
    /// comments / code in percent
    pub documentation_ratio: f64,
    pub external_dependencies: Vec<String>,
    pub files_with_errors: Vec<String>,
}

pub fn generate_summary(analyses: &[FileAnalysis]) -> ProjectSummary {
    let total_lines: usize = analyses.iter().map(|a| a.line_count).sum();
    let total_code_lines: usize = analyses.iter().map(|a| a.code_lines).sum();
    let total_comment_lines: usize = analyses.iter().map(|a| a.comment_lines).sum();

    ProjectSummary {
        total_files: analyses.len(),
        total_lines,
        total_code_lines,
        total_comment_lines,
        total_classes: analyses.iter().map(|a| a.classes.len()).sum(),
        total_functions: analyses.iter().map(FileAnalysis::total_functions).sum(),
        average_lines_per_file: if analyses.is_empty() {
            0.0
        } else {
            total_lines as f64 / analyses.len() as f64
        },
        documentation_ratio: if total_code_lines == 0 {
            0.0
        } else {
            total_comment_lines as f64 / total_code_lines as f64 * 100.0
        },
        external_dependencies: external_dependencies(analyses),
        files_with_errors: analyses
            .iter()
            .filter(|a| a.parse_error.is_some())
            .map(|a| a.path.clone())
            .collect(),
    }
}
