use super::{ExportFormat, Exporter, Report};
use crate::types::Result;

/// Pretty-printed `data` of the report
pub struct JsonExporter;

impl Exporter for JsonExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn render(&self, report: &Report) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(&report.data)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}
