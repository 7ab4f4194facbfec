//! Plain-text scan report.

use std::io::Write;

use super::folder::{DirectoryEntry, ScanResult};
use super::tree::generate_tree;
use crate::constants::report::{RULE_WIDTH, SUBRULE_WIDTH};
use crate::types::Result;
use crate::util::{display_timestamp, format_size};

const UTF8_BOM: &str = "\u{feff}";

/// Write the full directory report: header, tree, file contents, errors.
pub fn write_text_report<W: Write>(result: &ScanResult, writer: &mut W, include_content: bool) -> Result<()> {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(SUBRULE_WIDTH);

    write!(writer, "{}", UTF8_BOM)?;
    writeln!(writer, "DIRECTORY SCAN REPORT")?;
    writeln!(writer, "{}", heavy)?;
    writeln!(writer, "Root: {}", result.root_path.display())?;
    writeln!(writer, "Date: {}", display_timestamp())?;
    writeln!(writer, "Total Files: {}", result.total_files)?;
    writeln!(writer, "Total Directories: {}", result.total_directories)?;
    writeln!(writer, "Total Size: {}", format_size(result.total_size))?;
    writeln!(writer, "Scan Time: {:.2}s", result.scan_time.as_secs_f64())?;
    if result.cancelled {
        writeln!(writer, "Status: cancelled (partial results)")?;
    }
    writeln!(writer, "{}\n", heavy)?;

    writeln!(writer, "DIRECTORY STRUCTURE:")?;
    writeln!(writer, "{}", light)?;
    writeln!(writer, "{}\n", generate_tree(result, true))?;

    if include_content {
        if let Some(root) = &result.root {
            writeln!(writer, "{}", heavy)?;
            writeln!(writer, "FILE CONTENTS:")?;
            writeln!(writer, "{}\n", heavy)?;
            write_contents(root, writer)?;
        }
    }

    if !result.errors.is_empty() {
        writeln!(writer, "\n{}", heavy)?;
        writeln!(writer, "ERRORS:")?;
        writeln!(writer, "{}", light)?;
        for error in &result.errors {
            writeln!(writer, "  - {}", error)?;
        }
    }

    writer.flush()?;
    Ok(())
}

fn write_contents<W: Write>(entry: &DirectoryEntry, writer: &mut W) -> Result<()> {
    let frame = "#".repeat(RULE_WIDTH);
    for file in &entry.files {
        let Some(content) = file.content.as_deref().filter(|c| !c.is_empty()) else {
            continue;
        };
        writeln!(writer, "\n{}", frame)?;
        writeln!(writer, "# FILE: {}", file.path.display())?;
        writeln!(writer, "# Size: {}", format_size(file.size))?;
        writeln!(writer, "# Encoding: {}", file.encoding)?;
        writeln!(writer, "{}\n", frame)?;
        write!(writer, "{}\n\n", content)?;
    }
    for sub in &entry.subdirectories {
        write_contents(sub, writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::folder::FolderScanner;
    use crate::scanner::folder::tests::fixture;

    fn render(result: &ScanResult, include_content: bool) -> String {
        let mut buf = Vec::new();
        write_text_report(result, &mut buf, include_content).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_report_sections() {
        let dir = fixture();
        let result = FolderScanner::default().scan(dir.path()).unwrap();
        let text = render(&result, true);

        assert!(text.starts_with("\u{feff}DIRECTORY SCAN REPORT\n"));
        assert!(text.contains("Total Files: 4\n"));
        assert!(text.contains("Total Directories: 2\n"));
        assert!(text.contains("DIRECTORY STRUCTURE:\n"));
        assert!(text.contains("FILE CONTENTS:\n"));
        assert!(text.contains("# Encoding: utf-8\n"));
        assert!(text.contains("fn main() {}"));
        assert!(!text.contains("ERRORS:"));

        // Root files come before subdirectory files
        let a = text.find("a.txt\n").unwrap();
        let deep = text.find("deep.txt\n").unwrap();
        assert!(a < deep);
    }

    #[test]
    fn test_report_without_content_lists_errors() {
        let dir = fixture();
        let mut result = FolderScanner::default().scan(dir.path()).unwrap();
        result.errors.push("Permission denied: /locked".to_string());
        let text = render(&result, false);

        assert!(!text.contains("FILE CONTENTS:"));
        assert!(text.contains("ERRORS:\n"));
        assert!(text.ends_with("  - Permission denied: /locked\n"));
    }
}
