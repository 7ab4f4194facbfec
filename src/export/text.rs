use std::fmt::Write as _;

use super::{ExportFormat, Exporter, Report};
use crate::constants::report::{MAX_TABLE_ROWS, RULE_WIDTH, SUBRULE_WIDTH};
use crate::types::Result;

/// Framed plain-text report
pub struct TextExporter;

impl TextExporter {
    pub fn render_string(report: &Report) -> String {
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "-".repeat(SUBRULE_WIDTH);
        let mut out = String::new();

        let _ = writeln!(out, "{}", heavy);
        let _ = writeln!(out, " {}", report.title);
        let _ = writeln!(out, "{}", heavy);
        let _ = writeln!(out, " Generated: {}", report.generated_display());
        let _ = writeln!(out, "{}\n", heavy);

        if !report.statistics.is_empty() {
            let _ = writeln!(out, "STATISTICS");
            let _ = writeln!(out, "{}", light);
            for (label, value) in &report.statistics {
                let _ = writeln!(out, "  {}: {}", label, value);
            }
            out.push('\n');
        }

        for section in &report.sections {
            let _ = writeln!(out, "{}", section.title.to_uppercase());
            let _ = writeln!(out, "{}", light);
            for line in &section.lines {
                let _ = writeln!(out, "  {}", line);
            }
            out.push('\n');
        }

        if let Some(table) = report.table.as_ref().filter(|t| !t.rows.is_empty()) {
            let _ = writeln!(out, "DETAILS ({} rows)", table.rows.len());
            let _ = writeln!(out, "{}", light);
            let _ = writeln!(out, "  {}", table.headers.join(" | "));
            for row in table.rows.iter().take(MAX_TABLE_ROWS) {
                let _ = writeln!(out, "  {}", row.join(" | "));
            }
            if table.rows.len() > MAX_TABLE_ROWS {
                let _ = writeln!(out, "  ... {} more rows", table.rows.len() - MAX_TABLE_ROWS);
            }
            out.push('\n');
        }

        let _ = writeln!(out, "{}", heavy);
        let _ = writeln!(out, " End of Report");
        let _ = writeln!(out, "{}", heavy);
        out
    }
}

impl Exporter for TextExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Txt
    }

    fn render(&self, report: &Report) -> Result<Vec<u8>> {
        Ok(Self::render_string(report).into_bytes())
    }
}
