use super::{ExportFormat, Exporter, Report};
use crate::types::{CodexError, Result};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Table rows behind a UTF-8 BOM so spreadsheet tools pick the right encoding.
/// Without a table the statistics become one header row and one value row.
pub struct CsvExporter;

impl Exporter for CsvExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn render(&self, report: &Report) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(UTF8_BOM.to_vec());

        match &report.table {
            Some(table) => {
                writer.write_record(&table.headers)?;
                for row in &table.rows {
                    writer.write_record(row)?;
                }
            }
            None => {
                writer.write_record(report.statistics.iter().map(|(label, _)| label))?;
                writer.write_record(report.statistics.iter().map(|(_, value)| value))?;
            }
        }

        writer
            .into_inner()
            .map_err(|e| CodexError::Export(format!("CSV flush failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_with_bom() {
        let report = Report::new("T").table(
            &["Name", "Note"],
            vec![vec!["a".into(), "has, comma".into()], vec!["b".into(), "plain".into()]],
        );
        let bytes = CsvExporter.render(&report).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert_eq!(text, "Name,Note\na,\"has, comma\"\nb,plain\n");
    }

    #[test]
    fn test_statistics_fallback() {
        let report = Report::new("T").stat("Files", 2).stat("Lines", 40);
        let bytes = CsvExporter.render(&report).unwrap();
        assert_eq!(&bytes[3..], b"Files,Lines\n2,40\n");
    }
}
