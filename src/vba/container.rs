//! Office containers: OLE2 compound files and OOXML packages.
//!
//! Locates every VBA project storage and turns its module streams into source text.

use cfb::CompoundFile;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use super::ovba::decompress;
use super::project::{ModuleRecordType, decode_codepage, parse_dir_stream, parse_project_stream};
use super::types::{ModuleKind, VbaModule};
use crate::constants::vba::{OLE_MAGIC, ZIP_MAGIC};
use crate::types::{CodexError, Result};

/// Kind of container detected from the file's magic number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Ole,
    Ooxml,
}

impl ContainerKind {
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(&OLE_MAGIC) {
            Some(Self::Ole)
        } else if data.starts_with(&ZIP_MAGIC) {
            Some(Self::Ooxml)
        } else {
            None
        }
    }
}

/// Read all VBA modules from an Office file on disk.
pub fn read_modules(path: &Path) -> Result<Vec<VbaModule>> {
    let data = std::fs::read(path)?;
    read_modules_from_bytes(data, path)
}

/// Read all VBA modules from an in-memory Office file.
pub fn read_modules_from_bytes(data: Vec<u8>, source: &Path) -> Result<Vec<VbaModule>> {
    match ContainerKind::detect(&data) {
        Some(ContainerKind::Ole) => {
            let mut comp = CompoundFile::open(Cursor::new(data))?;
            read_ole(&mut comp, source, "")?
                .ok_or_else(|| CodexError::NoVbaProject(source.to_path_buf()))
        }
        Some(ContainerKind::Ooxml) => read_ooxml(data, source),
        None => Err(CodexError::NoVbaProject(source.to_path_buf())),
    }
}

/// OOXML packages keep the VBA project as an embedded compound file part
fn read_ooxml(data: Vec<u8>, source: &Path) -> Result<Vec<VbaModule>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
    let mut found_project = false;
    let mut modules = Vec::new();

    for i in 0..archive.len() {
        let mut part = archive.by_index(i)?;
        let part_name = part.name().to_string();
        if !part_name.to_lowercase().ends_with("vbaproject.bin") {
            continue;
        }

        debug!("Found VBA project part: {}", part_name);
        let mut buf = Vec::new();
        part.read_to_end(&mut buf)?;
        drop(part);

        let mut comp = CompoundFile::open(Cursor::new(buf))?;
        if let Some(found) = read_ole(&mut comp, source, &format!("{}:", part_name))? {
            found_project = true;
            modules.extend(found);
        }
    }

    if !found_project {
        return Err(CodexError::NoVbaProject(source.to_path_buf()));
    }
    Ok(modules)
}

/// `None` when the compound file holds no VBA storage
fn read_ole<F: Read + Seek>(
    comp: &mut CompoundFile<F>,
    source: &Path,
    prefix: &str,
) -> Result<Option<Vec<VbaModule>>> {
    let vba_storages: Vec<PathBuf> = comp
        .walk()
        .filter(|entry| entry.is_stream() && entry.name().eq_ignore_ascii_case("dir"))
        .filter_map(|entry| entry.path().parent().map(Path::to_path_buf))
        .filter(|parent| {
            parent
                .file_name()
                .is_some_and(|n| n.to_string_lossy().eq_ignore_ascii_case("vba"))
        })
        .collect();

    if vba_storages.is_empty() {
        return Ok(None);
    }

    let mut modules = Vec::new();
    for storage in vba_storages {
        debug!("Reading VBA storage {}", stream_label(&storage));
        modules.extend(read_vba_storage(comp, &storage, source, prefix)?);
    }
    Ok(Some(modules))
}

fn read_vba_storage<F: Read + Seek>(
    comp: &mut CompoundFile<F>,
    storage: &Path,
    source: &Path,
    prefix: &str,
) -> Result<Vec<VbaModule>> {
    let dir_data = decompress(&read_stream(comp, &storage.join("dir"))?)?;
    let dir = parse_dir_stream(&dir_data)?;
    debug!(
        "Project '{}': {} modules, code page {}",
        dir.project_name,
        dir.modules.len(),
        dir.code_page
    );

    let project_path = storage
        .parent()
        .map(|p| p.join("PROJECT"))
        .unwrap_or_else(|| PathBuf::from("/PROJECT"));
    let declared_kinds: HashMap<String, ModuleKind> = match read_stream(comp, &project_path) {
        Ok(bytes) => parse_project_stream(&decode_codepage(&bytes, dir.code_page)),
        Err(e) => {
            debug!("No PROJECT stream at {}: {}", project_path.display(), e);
            HashMap::new()
        }
    };

    let mut modules = Vec::with_capacity(dir.modules.len());
    for record in &dir.modules {
        let stream_path = storage.join(&record.stream_name);
        let data = match read_stream(comp, &stream_path) {
            Ok(data) => data,
            Err(e) => {
                warn!("Module '{}': cannot read stream: {}", record.name, e);
                continue;
            }
        };
        let offset = record.text_offset as usize;
        if offset > data.len() {
            warn!(
                "Module '{}': text offset {} beyond stream length {}",
                record.name,
                offset,
                data.len()
            );
            continue;
        }

        let raw = match decompress(&data[offset..]) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Module '{}': skipping corrupt source: {}", record.name, e);
                continue;
            }
        };
        let code = normalize_newlines(&decode_codepage(&raw, dir.code_page));

        let kind = match declared_kinds.get(&record.name) {
            Some(kind) => *kind,
            None => match record.record_type {
                ModuleRecordType::Procedural => ModuleKind::Standard,
                ModuleRecordType::DocumentOrClass => match ModuleKind::infer_from_code(&code) {
                    ModuleKind::Form => ModuleKind::Form,
                    _ => ModuleKind::Class,
                },
            },
        };

        modules.push(VbaModule {
            name: record.name.clone(),
            kind,
            code,
            source_file: source.to_path_buf(),
            stream_path: format!("{}{}", prefix, stream_label(&stream_path)),
        });
    }

    Ok(modules)
}

fn read_stream<F: Read + Seek>(comp: &mut CompoundFile<F>, path: &Path) -> Result<Vec<u8>> {
    let mut stream = comp.open_stream(path)?;
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Stream path with `/` separators and no leading root
fn stream_label(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Build an in-memory compound file holding one VBA project.
/// Each module is `(name, record type, code)`.
#[cfg(test)]
pub(crate) fn build_ole_project(
    storage_root: &str,
    modules: &[(&str, ModuleRecordType, &str)],
    project_text: Option<&str>,
) -> Vec<u8> {
    use super::ovba::compress_literal;
    use super::project::sample_dir_stream;
    use std::io::Write;

    let mut comp = CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    let root = storage_root.trim_end_matches('/');
    if !root.is_empty() {
        comp.create_storage(root).unwrap();
    }
    let vba = format!("{}/VBA", root);
    comp.create_storage(&vba).unwrap();

    let records: Vec<(&str, ModuleRecordType)> = modules.iter().map(|(n, t, _)| (*n, *t)).collect();
    let dir = compress_literal(&sample_dir_stream(1252, &records));
    comp.create_stream(format!("{}/dir", vba))
        .unwrap()
        .write_all(&dir)
        .unwrap();

    for (name, _, code) in modules {
        let compressed = compress_literal(code.replace('\n', "\r\n").as_bytes());
        comp.create_stream(format!("{}/{}", vba, name))
            .unwrap()
            .write_all(&compressed)
            .unwrap();
    }

    if let Some(text) = project_text {
        comp.create_stream(format!("{}/PROJECT", root))
            .unwrap()
            .write_all(text.as_bytes())
            .unwrap();
    }

    comp.flush().unwrap();
    comp.into_inner().into_inner()
}

/// Wrap a compound file as the `xl/vbaProject.bin` part of a minimal OOXML package
#[cfg(test)]
pub(crate) fn build_ooxml_package(vba_project: &[u8]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer.start_file("[Content_Types].xml", options).unwrap();
    writer.write_all(b"<Types/>").unwrap();
    writer.start_file("xl/vbaProject.bin", options).unwrap();
    writer.write_all(vba_project).unwrap();
    writer.finish().unwrap().into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULE1: &str = "Attribute VB_Name = \"Module1\"\nSub Hello()\n    MsgBox \"Hi\"\nEnd Sub\n";
    const WORKBOOK: &str = "Attribute VB_Name = \"ThisWorkbook\"\nAttribute VB_PredeclaredId = True\n";

    fn sample_project() -> Vec<u8> {
        build_ole_project(
            "",
            &[
                ("Module1", ModuleRecordType::Procedural, MODULE1),
                ("ThisWorkbook", ModuleRecordType::DocumentOrClass, WORKBOOK),
            ],
            Some("Document=ThisWorkbook/&H00000000\r\nModule=Module1\r\n"),
        )
    }

    #[test]
    fn test_detect_container() {
        assert_eq!(ContainerKind::detect(&OLE_MAGIC), Some(ContainerKind::Ole));
        assert_eq!(ContainerKind::detect(b"PK\x03\x04rest"), Some(ContainerKind::Ooxml));
        assert_eq!(ContainerKind::detect(b"%PDF"), None);
    }

    #[test]
    fn test_read_ole_project() {
        let modules = read_modules_from_bytes(sample_project(), Path::new("book.xls")).unwrap();
        assert_eq!(modules.len(), 2);

        let m1 = &modules[0];
        assert_eq!(m1.name, "Module1");
        assert_eq!(m1.kind, ModuleKind::Standard);
        assert_eq!(m1.code, MODULE1);
        assert_eq!(m1.stream_path, "VBA/Module1");

        assert_eq!(modules[1].kind, ModuleKind::Document);
    }

    #[test]
    fn test_kind_from_record_type_without_project_stream() {
        let data = build_ole_project(
            "/Macros",
            &[
                ("NewMacros", ModuleRecordType::Procedural, MODULE1),
                ("Class1", ModuleRecordType::DocumentOrClass, WORKBOOK),
            ],
            None,
        );
        let modules = read_modules_from_bytes(data, Path::new("doc.doc")).unwrap();
        assert_eq!(modules[0].kind, ModuleKind::Standard);
        assert_eq!(modules[0].stream_path, "Macros/VBA/NewMacros");
        assert_eq!(modules[1].kind, ModuleKind::Class);
    }

    #[test]
    fn test_read_ooxml_package() {
        let package = build_ooxml_package(&sample_project());
        let modules = read_modules_from_bytes(package, Path::new("book.xlsm")).unwrap();
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].stream_path, "xl/vbaProject.bin:VBA/Module1");
    }

    #[test]
    fn test_no_vba_project() {
        let mut comp = CompoundFile::create(Cursor::new(Vec::new())).unwrap();
        comp.create_storage("/Workbook").unwrap();
        comp.flush().unwrap();
        let data = comp.into_inner().into_inner();
        assert!(matches!(
            read_modules_from_bytes(data, Path::new("plain.xls")),
            Err(CodexError::NoVbaProject(_))
        ));

        let package = {
            use std::io::Write;
            let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
            writer
                .start_file("[Content_Types].xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"<Types/>").unwrap();
            writer.finish().unwrap().into_inner()
        };
        assert!(matches!(
            read_modules_from_bytes(package, Path::new("plain.xlsx")),
            Err(CodexError::NoVbaProject(_))
        ));

        assert!(matches!(
            read_modules_from_bytes(b"not an office file".to_vec(), Path::new("x.xls")),
            Err(CodexError::NoVbaProject(_))
        ));
    }

    #[test]
    fn test_corrupt_module_is_skipped() {
        use std::io::Write;

        let data = sample_project();
        let mut comp = CompoundFile::open(Cursor::new(data)).unwrap();
        comp.create_stream("/VBA/Module1")
            .unwrap()
            .write_all(&[0x02, 0xFF, 0xFF])
            .unwrap();
        comp.flush().unwrap();
        let data = comp.into_inner().into_inner();

        let modules = read_modules_from_bytes(data, Path::new("book.xls")).unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].name, "ThisWorkbook");
        assert_eq!(modules[0].code, WORKBOOK);
    }

    #[test]
    fn test_normalize_newlines() {
        assert_eq!(normalize_newlines("a\r\nb\rc\n"), "a\nb\nc\n");
    }
}
