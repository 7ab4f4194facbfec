use html_escape::encode_text;
use std::fmt::Write as _;

use super::{ExportFormat, Exporter, Report};
use crate::constants::report::MAX_TABLE_ROWS;
use crate::types::Result;

const STYLE: &str = r#"
    :root {
        --bg: #0f172a;
        --bg-secondary: #1e293b;
        --text: #f1f5f9;
        --text-secondary: #94a3b8;
        --border: #334155;
        --primary: #3b82f6;
    }
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body {
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        background: var(--bg);
        color: var(--text);
        line-height: 1.6;
        padding: 2rem;
    }
    .container { max-width: 1200px; margin: 0 auto; }
    h1 { font-size: 2rem; margin-bottom: 0.5rem; color: var(--primary); }
    .meta { color: var(--text-secondary); font-size: 0.875rem; margin-bottom: 2rem; }
    .section {
        background: var(--bg-secondary);
        border: 1px solid var(--border);
        border-radius: 8px;
        padding: 1.5rem;
        margin-bottom: 1.5rem;
        overflow-x: auto;
    }
    .section h2 {
        font-size: 1.25rem;
        margin-bottom: 1rem;
        padding-bottom: 0.5rem;
        border-bottom: 1px solid var(--border);
    }
    .stats-grid {
        display: grid;
        grid-template-columns: repeat(auto-fit, minmax(150px, 1fr));
        gap: 1rem;
    }
    .stat-card {
        background: var(--bg);
        border: 1px solid var(--border);
        border-radius: 6px;
        padding: 1rem;
        text-align: center;
    }
    .stat-value { font-size: 1.5rem; font-weight: 700; color: var(--primary); word-break: break-all; }
    .stat-label { font-size: 0.75rem; color: var(--text-secondary); text-transform: uppercase; }
    pre { font-family: 'Cascadia Code', Consolas, monospace; font-size: 0.85rem; white-space: pre-wrap; }
    table { width: 100%; border-collapse: collapse; }
    th, td { padding: 0.5rem 0.75rem; text-align: left; border-bottom: 1px solid var(--border); }
    th { font-weight: 600; color: var(--text-secondary); font-size: 0.75rem; text-transform: uppercase; }
    tr:hover { background: var(--bg); }
    .footer {
        text-align: center;
        margin-top: 2rem;
        padding-top: 1rem;
        border-top: 1px solid var(--border);
        color: var(--text-secondary);
        font-size: 0.875rem;
    }
"#;

/// Standalone dark-themed HTML page
pub struct HtmlExporter;

impl HtmlExporter {
    pub fn render_string(report: &Report) -> String {
        let title = encode_text(&report.title);
        let mut body = String::new();

        if !report.statistics.is_empty() {
            body.push_str("<div class=\"section\"><h2>Statistics</h2><div class=\"stats-grid\">\n");
            for (label, value) in &report.statistics {
                let _ = writeln!(
                    body,
                    "<div class=\"stat-card\"><div class=\"stat-value\">{}</div><div class=\"stat-label\">{}</div></div>",
                    encode_text(value),
                    encode_text(label)
                );
            }
            body.push_str("</div></div>\n");
        }

        for section in &report.sections {
            let _ = writeln!(
                body,
                "<div class=\"section\"><h2>{}</h2><pre>{}</pre></div>",
                encode_text(&section.title),
                encode_text(&section.lines.join("\n"))
            );
        }

        if let Some(table) = report.table.as_ref().filter(|t| !t.rows.is_empty()) {
            let _ = write!(
                body,
                "<div class=\"section\"><h2>Details ({} total)</h2><table><thead><tr>",
                table.rows.len()
            );
            for header in &table.headers {
                let _ = write!(body, "<th>{}</th>", encode_text(header));
            }
            body.push_str("</tr></thead><tbody>\n");
            for row in table.rows.iter().take(MAX_TABLE_ROWS) {
                body.push_str("<tr>");
                for cell in row {
                    let _ = write!(body, "<td>{}</td>", encode_text(cell));
                }
                body.push_str("</tr>\n");
            }
            body.push_str("</tbody></table></div>\n");
        }

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
<div class="container">
<h1>{title}</h1>
<p class="meta">Generated on {generated} by codextract</p>
{body}<div class="footer"><p>Generated by codextract v{version}</p></div>
</div>
</body>
</html>
"#,
            title = title,
            style = STYLE,
            generated = report.generated_display(),
            body = body,
            version = env!("CARGO_PKG_VERSION"),
        )
    }
}

impl Exporter for HtmlExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Html
    }

    fn render(&self, report: &Report) -> Result<Vec<u8>> {
        Ok(Self::render_string(report).into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_everything() {
        let report = Report::new("<Report & Co>")
            .stat("Path", "C:\\a<b>")
            .section("Notes", vec!["x < y".to_string()])
            .table(&["Name"], vec![vec!["<script>".to_string()]]);
        let html = HtmlExporter::render_string(&report);

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>&lt;Report &amp; Co&gt;</title>"));
        assert!(html.contains("C:\\a&lt;b&gt;"));
        assert!(html.contains("<pre>x &lt; y</pre>"));
        assert!(html.contains("<td>&lt;script&gt;</td>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_table_is_capped() {
        let rows = (0..150).map(|i| vec![format!("row{}", i)]).collect();
        let html = HtmlExporter::render_string(&Report::new("T").table(&["N"], rows));
        assert!(html.contains("Details (150 total)"));
        assert!(html.contains("<td>row99</td>"));
        assert!(!html.contains("<td>row100</td>"));
    }
}
