use std::fmt::Write as _;

use super::{ExportFormat, Exporter, Report};
use crate::constants::report::MAX_MARKDOWN_ROWS;
use crate::types::Result;

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// GitHub-flavored Markdown report
pub struct MarkdownExporter;

impl MarkdownExporter {
    pub fn render_string(report: &Report) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}\n", report.title);
        let _ = writeln!(out, "**Generated:** {}\n", report.generated_display());

        if !report.statistics.is_empty() {
            out.push_str("## Summary\n\n| Metric | Value |\n|--------|-------|\n");
            for (label, value) in &report.statistics {
                let _ = writeln!(out, "| {} | {} |", cell(label), cell(value));
            }
            out.push('\n');
        }

        for section in &report.sections {
            let _ = writeln!(out, "## {}\n", section.title);
            out.push_str("```\n");
            for line in &section.lines {
                let _ = writeln!(out, "{}", line);
            }
            out.push_str("```\n\n");
        }

        if let Some(table) = report.table.as_ref().filter(|t| !t.rows.is_empty()) {
            let _ = writeln!(out, "## Details\n");
            let headers: Vec<String> = table.headers.iter().map(|h| cell(h)).collect();
            let _ = writeln!(out, "| {} |", headers.join(" | "));
            let _ = writeln!(out, "|{}", "---|".repeat(headers.len()));
            for row in table.rows.iter().take(MAX_MARKDOWN_ROWS) {
                let cells: Vec<String> = row.iter().map(|c| cell(c)).collect();
                let _ = writeln!(out, "| {} |", cells.join(" | "));
            }
            if table.rows.len() > MAX_MARKDOWN_ROWS {
                let _ = writeln!(
                    out,
                    "\n*Showing {} of {} rows.*",
                    MAX_MARKDOWN_ROWS,
                    table.rows.len()
                );
            }
            out.push('\n');
        }

        out.push_str("---\n*Generated by codextract*\n");
        out
    }
}

impl Exporter for MarkdownExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Markdown
    }

    fn render(&self, report: &Report) -> Result<Vec<u8>> {
        Ok(Self::render_string(report).into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_layout() {
        let rows = (0..60).map(|i| vec![format!("a|{}", i)]).collect();
        let report = Report::new("Python Analysis Report")
            .stat("Total Files", 60)
            .section("External Dependencies", vec!["requests".to_string()])
            .table(&["File"], rows);
        let md = MarkdownExporter::render_string(&report);

        assert!(md.starts_with("# Python Analysis Report\n\n**Generated:** "));
        assert!(md.contains("| Metric | Value |\n|--------|-------|\n| Total Files | 60 |\n"));
        assert!(md.contains("## External Dependencies\n\n```\nrequests\n```\n"));
        assert!(md.contains("| File |\n|---|\n| a\\|0 |\n"));
        assert!(md.contains("| a\\|49 |"));
        assert!(!md.contains("| a\\|50 |"));
        assert!(md.contains("*Showing 50 of 60 rows.*"));
        assert!(md.ends_with("*Generated by codextract*\n"));
    }
}
