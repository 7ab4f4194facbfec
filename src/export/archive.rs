use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;

use super::ExportOutcome;
use crate::types::Result;

/// Bundle `files` into a deflated zip at `archive`, stored by base name.
/// Paths that do not exist are skipped.
pub fn create_archive(files: &[PathBuf], archive: &Path) -> Result<ExportOutcome> {
    let start = Instant::now();
    if let Some(parent) = archive.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut zip = zip::ZipWriter::new(BufWriter::new(File::create(archive)?));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for file in files {
        if !file.is_file() {
            warn!(path = %file.display(), "Skipping missing file");
            continue;
        }
        let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        debug!(entry = name, "Adding to archive");
        zip.start_file(name, options)?;
        zip.write_all(&std::fs::read(file)?)?;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    drop(writer);

    Ok(ExportOutcome {
        path: archive.to_path_buf(),
        format: "zip".to_string(),
        size: std::fs::metadata(archive)?.len(),
        elapsed: start.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_archive_existing_files_only() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("report.json");
        let b = dir.path().join("report.csv");
        std::fs::write(&a, "{}").unwrap();
        std::fs::write(&b, "x,y\n").unwrap();
        let missing = dir.path().join("gone.txt");
        let archive = dir.path().join("out/bundle.zip");

        let outcome = create_archive(&[a, b, missing], &archive).unwrap();
        assert!(outcome.size > 0);

        let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        assert_eq!(zip.len(), 2);
        let mut content = String::new();
        zip.by_name("report.csv")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "x,y\n");
    }
}
