//! Format-neutral report model and conversions from every tool's result.

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::json;
use std::fmt::Display;

use crate::python::{FileAnalysis, generate_summary};
use crate::scanner::{FlatFile, ScanResult, extension_stats, files_flat, generate_tree};
use crate::types::Result;
use crate::util::format_size;
use crate::vba::analyzer::InventoryRow;
use crate::vba::{ExtractionReport, VbaAnalysis, generate_statistics, inventory_rows};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub title: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// What every exporter renders
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub title: String,
    pub generated_at: DateTime<Local>,
    /// Ordered label/value pairs
    pub statistics: Vec<(String, String)>,
    pub sections: Vec<ReportSection>,
    pub table: Option<ReportTable>,
    /// Complete typed result, used by the JSON exporter
    pub data: serde_json::Value,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            generated_at: Local::now(),
            statistics: Vec::new(),
            sections: Vec::new(),
            table: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn stat(mut self, label: impl Into<String>, value: impl Display) -> Self {
        self.statistics.push((label.into(), value.to_string()));
        self
    }

    /// Add a section; empty sections are dropped
    pub fn section(mut self, title: impl Into<String>, lines: Vec<String>) -> Self {
        if !lines.is_empty() {
            self.sections.push(ReportSection {
                title: title.into(),
                lines,
            });
        }
        self
    }

    pub fn table(mut self, headers: &[&str], rows: Vec<Vec<String>>) -> Self {
        self.table = Some(ReportTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        });
        self
    }

    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn generated_display(&self) -> String {
        self.generated_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Conversion of a tool result into a [`Report`]
pub trait ToReport {
    fn to_report(&self) -> Result<Report>;
}

impl ToReport for ExtractionReport {
    fn to_report(&self) -> Result<Report> {
        let rows = self
            .modules
            .iter()
            .map(|m| {
                vec![
                    m.name.clone(),
                    m.kind.label().to_string(),
                    m.line_count().to_string(),
                    m.stream_path.clone(),
                ]
            })
            .collect();

        Ok(Report::new("VBA Extraction Report")
            .stat("Source File", self.source_file.display())
            .stat("Method", self.method_used)
            .stat("Total Modules", self.total_modules())
            .stat("Total Lines", self.total_lines())
            .stat("Elapsed", format!("{:.2}s", self.elapsed.as_secs_f64()))
            .section(
                "Written Files",
                self.written_files.iter().map(|p| p.display().to_string()).collect(),
            )
            .table(&["Module", "Type", "Lines", "Stream"], rows)
            .data(serde_json::to_value(self)?))
    }
}

fn count_lines<'a>(counts: impl IntoIterator<Item = (&'a String, &'a usize)>) -> Vec<String> {
    counts
        .into_iter()
        .map(|(name, count)| format!("{}: {}", name, count))
        .collect()
}

impl ToReport for [VbaAnalysis] {
    fn to_report(&self) -> Result<Report> {
        let stats = generate_statistics(self);
        let top_types = stats
            .top_variable_types(10)
            .into_iter()
            .map(|(name, count)| format!("{}: {}", name, count))
            .collect();
        let rows = inventory_rows(self).iter().map(InventoryRow::to_cells).collect();

        Ok(Report::new("VBA Analysis Report")
            .stat("Modules", stats.total_modules)
            .stat("Procedures", stats.total_procedures)
            .stat("Variables", stats.total_variables)
            .stat("Constants", stats.total_constants)
            .section("Procedures by Type", count_lines(&stats.procedures_by_type))
            .section("Procedures by Scope", count_lines(&stats.procedures_by_scope))
            .section("Variable Types (Top 10)", top_types)
            .table(&InventoryRow::HEADERS, rows)
            .data(json!({ "statistics": stats, "modules": self })))
    }
}

impl ToReport for [FileAnalysis] {
    fn to_report(&self) -> Result<Report> {
        let summary = generate_summary(self);
        let rows = self
            .iter()
            .map(|a| {
                vec![
                    a.name.clone(),
                    a.path.clone(),
                    a.line_count.to_string(),
                    a.code_lines.to_string(),
                    a.comment_lines.to_string(),
                    a.docstring_lines.to_string(),
                    a.classes.len().to_string(),
                    a.total_functions().to_string(),
                    format!("{:.1}", a.documentation_ratio()),
                    a.parse_error.clone().unwrap_or_default(),
                ]
            })
            .collect();

        Ok(Report::new("Python Analysis Report")
            .stat("Total Files", summary.total_files)
            .stat("Total Lines", summary.total_lines)
            .stat("Code Lines", summary.total_code_lines)
            .stat("Comment Lines", summary.total_comment_lines)
            .stat("Classes", summary.total_classes)
            .stat("Functions", summary.total_functions)
            .stat("Average Lines per File", format!("{:.1}", summary.average_lines_per_file))
            .stat("Documentation Ratio", format!("{:.1}%", summary.documentation_ratio))
            .section("External Dependencies", summary.external_dependencies.clone())
            .section("Files with Errors", summary.files_with_errors.clone())
            .table(
                &[
                    "File",
                    "Path",
                    "Lines",
                    "Code",
                    "Comments",
                    "Docstrings",
                    "Classes",
                    "Functions",
                    "Doc Ratio %",
                    "Error",
                ],
                rows,
            )
            .data(json!({ "summary": summary, "files": self })))
    }
}

impl ToReport for ScanResult {
    fn to_report(&self) -> Result<Report> {
        let by_extension = extension_stats(self)
            .into_iter()
            .map(|s| format!("{}: {} files, {}", s.extension, s.count, format_size(s.size)))
            .collect();
        let tree = if self.root.is_some() {
            generate_tree(self, false).lines().map(String::from).collect()
        } else {
            Vec::new()
        };
        let rows = files_flat(self).iter().map(FlatFile::to_cells).collect();

        Ok(Report::new("Directory Scan Report")
            .stat("Root", self.root_path.display())
            .stat("Total Files", self.total_files)
            .stat("Total Directories", self.total_directories)
            .stat("Total Size", format_size(self.total_size))
            .stat("Scan Time", format!("{:.2}s", self.scan_time.as_secs_f64()))
            .stat("Errors", self.errors.len())
            .section("Directory Tree", tree)
            .section("By Extension", by_extension)
            .section("Errors", self.errors.clone())
            .table(&FlatFile::HEADERS, rows)
            .data(serde_json::to_value(self)?))
    }
}
