//! VBA project metadata: the `dir` stream and the `PROJECT` stream.

use encoding_rs::{
    BIG5, EUC_KR, Encoding, GBK, MACINTOSH, SHIFT_JIS, UTF_8, UTF_16LE, WINDOWS_874,
    WINDOWS_1250, WINDOWS_1251, WINDOWS_1252, WINDOWS_1253, WINDOWS_1254, WINDOWS_1255,
    WINDOWS_1256, WINDOWS_1257, WINDOWS_1258,
};
use std::collections::HashMap;

use super::types::ModuleKind;
use crate::types::{CodexError, Result};

// dir stream record identifiers
const PROJECTCODEPAGE: u16 = 0x0003;
const PROJECTNAME: u16 = 0x0004;
const PROJECTVERSION: u16 = 0x0009;
const PROJECTVERSION_DATA_LEN: usize = 6;
const MODULENAME: u16 = 0x0019;
const MODULENAMEUNICODE: u16 = 0x0047;
const MODULESTREAMNAME: u16 = 0x001A;
const MODULESTREAMNAMEUNICODE: u16 = 0x0032;
const MODULEOFFSET: u16 = 0x0031;
const MODULETYPE_PROCEDURAL: u16 = 0x0021;
const MODULETYPE_DOCUMENT: u16 = 0x0022;
const MODULE_TERMINATOR: u16 = 0x002B;
const DIR_TERMINATOR: u16 = 0x0010;

const DEFAULT_CODE_PAGE: u16 = 1252;

/// Module type as recorded in the dir stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleRecordType {
    Procedural,
    DocumentOrClass,
}

/// One module entry of the dir stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    pub name: String,
    pub stream_name: String,
    pub text_offset: u32,
    pub record_type: ModuleRecordType,
}

/// Parsed dir stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirInfo {
    pub code_page: u16,
    pub project_name: String,
    pub modules: Vec<ModuleRecord>,
}

/// Map a Windows code page to an encoding. Unknown pages use Windows-1252.
pub fn encoding_for_codepage(code_page: u16) -> &'static Encoding {
    match code_page {
        874 => WINDOWS_874,
        932 => SHIFT_JIS,
        936 => GBK,
        949 => EUC_KR,
        950 => BIG5,
        1200 => UTF_16LE,
        1250 => WINDOWS_1250,
        1251 => WINDOWS_1251,
        1252 => WINDOWS_1252,
        1253 => WINDOWS_1253,
        1254 => WINDOWS_1254,
        1255 => WINDOWS_1255,
        1256 => WINDOWS_1256,
        1257 => WINDOWS_1257,
        1258 => WINDOWS_1258,
        10000 => MACINTOSH,
        65001 => UTF_8,
        _ => WINDOWS_1252,
    }
}

/// Decode bytes stored in the project's code page
pub fn decode_codepage(bytes: &[u8], code_page: u16) -> String {
    let (text, _, _) = encoding_for_codepage(code_page).decode(bytes);
    text.into_owned()
}

fn decode_utf16(bytes: &[u8]) -> String {
    let (text, _, _) = UTF_16LE.decode(bytes);
    text.into_owned()
}

#[derive(Default)]
struct PartialModule {
    name: Option<String>,
    unicode_name: Option<String>,
    stream_name: Option<String>,
    unicode_stream_name: Option<String>,
    text_offset: Option<u32>,
    record_type: Option<ModuleRecordType>,
}

impl PartialModule {
    fn finish(self) -> Result<ModuleRecord> {
        let name = self
            .unicode_name
            .filter(|n| !n.is_empty())
            .or(self.name)
            .ok_or_else(|| CodexError::DirStream("module without a name".to_string()))?;
        let stream_name = self
            .stream_name
            .filter(|n| !n.is_empty())
            .or(self.unicode_stream_name)
            .unwrap_or_else(|| name.clone());
        Ok(ModuleRecord {
            name,
            stream_name,
            text_offset: self.text_offset.unwrap_or(0),
            record_type: self.record_type.unwrap_or(ModuleRecordType::Procedural),
        })
    }
}

/// Parse a decompressed dir stream.
pub fn parse_dir_stream(data: &[u8]) -> Result<DirInfo> {
    let mut code_page = DEFAULT_CODE_PAGE;
    let mut project_name = String::new();
    let mut modules = Vec::new();
    let mut current: Option<PartialModule> = None;
    let mut pos = 0;

    while pos + 6 <= data.len() {
        let id = u16::from_le_bytes([data[pos], data[pos + 1]]);
        let size = u32::from_le_bytes([data[pos + 2], data[pos + 3], data[pos + 4], data[pos + 5]])
            as usize;
        pos += 6;

        // PROJECTVERSION's size field is a reserved constant, not the data length
        let len = if id == PROJECTVERSION {
            PROJECTVERSION_DATA_LEN
        } else {
            size
        };
        if pos + len > data.len() {
            return Err(CodexError::DirStream(format!(
                "record 0x{:04X} at offset {} overruns the stream",
                id,
                pos - 6
            )));
        }
        let body = &data[pos..pos + len];
        pos += len;

        match id {
            PROJECTCODEPAGE if body.len() >= 2 => {
                code_page = u16::from_le_bytes([body[0], body[1]]);
            }
            PROJECTNAME => project_name = decode_codepage(body, code_page),
            MODULENAME => {
                if let Some(done) = current.take() {
                    modules.push(done.finish()?);
                }
                current = Some(PartialModule {
                    name: Some(decode_codepage(body, code_page)),
                    ..Default::default()
                });
            }
            MODULENAMEUNICODE => {
                if let Some(m) = current.as_mut() {
                    m.unicode_name = Some(decode_utf16(body));
                }
            }
            MODULESTREAMNAME => {
                if let Some(m) = current.as_mut() {
                    m.stream_name = Some(decode_codepage(body, code_page));
                }
            }
            MODULESTREAMNAMEUNICODE => {
                if let Some(m) = current.as_mut() {
                    m.unicode_stream_name = Some(decode_utf16(body));
                }
            }
            MODULEOFFSET if body.len() >= 4 => {
                if let Some(m) = current.as_mut() {
                    m.text_offset = Some(u32::from_le_bytes([body[0], body[1], body[2], body[3]]));
                }
            }
            MODULETYPE_PROCEDURAL => {
                if let Some(m) = current.as_mut() {
                    m.record_type = Some(ModuleRecordType::Procedural);
                }
            }
            MODULETYPE_DOCUMENT => {
                if let Some(m) = current.as_mut() {
                    m.record_type = Some(ModuleRecordType::DocumentOrClass);
                }
            }
            MODULE_TERMINATOR => {
                if let Some(done) = current.take() {
                    modules.push(done.finish()?);
                }
            }
            DIR_TERMINATOR => break,
            _ => {}
        }
    }

    if let Some(done) = current.take() {
        modules.push(done.finish()?);
    }

    Ok(DirInfo {
        code_page,
        project_name,
        modules,
    })
}

/// Parse the `PROJECT` stream into module kinds keyed by module name.
pub fn parse_project_stream(text: &str) -> HashMap<String, ModuleKind> {
    let mut kinds = HashMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            break;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        let kind = match key.trim() {
            "Module" => ModuleKind::Standard,
            "Class" => ModuleKind::Class,
            "BaseClass" => ModuleKind::Form,
            "Document" => ModuleKind::Document,
            _ => continue,
        };
        let name = value.split('/').next().unwrap_or(value).trim();
        if !name.is_empty() {
            kinds.insert(name.to_string(), kind);
        }
    }

    kinds
}

/// Build dir stream bytes from `(id, data)` records.
#[cfg(test)]
pub(crate) fn build_dir_stream(records: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (id, data) in records {
        out.extend_from_slice(&id.to_le_bytes());
        if *id == PROJECTVERSION {
            out.extend_from_slice(&4u32.to_le_bytes());
        } else {
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        }
        out.extend_from_slice(data);
    }
    out
}

/// Minimal dir stream describing the given `(module name, kind)` pairs, all with text offset 0
#[cfg(test)]
pub(crate) fn sample_dir_stream(code_page: u16, modules: &[(&str, ModuleRecordType)]) -> Vec<u8> {
    let mut records = vec![
        (0x0001, 1u32.to_le_bytes().to_vec()),
        (PROJECTCODEPAGE, code_page.to_le_bytes().to_vec()),
        (PROJECTNAME, b"VBAProject".to_vec()),
        (PROJECTVERSION, vec![0x01, 0, 0, 0, 0x02, 0]),
        (0x000F, (modules.len() as u16).to_le_bytes().to_vec()),
    ];
    for (name, record_type) in modules {
        records.push((MODULENAME, name.as_bytes().to_vec()));
        records.push((MODULESTREAMNAME, name.as_bytes().to_vec()));
        records.push((MODULEOFFSET, 0u32.to_le_bytes().to_vec()));
        let type_id = match record_type {
            ModuleRecordType::Procedural => MODULETYPE_PROCEDURAL,
            ModuleRecordType::DocumentOrClass => MODULETYPE_DOCUMENT,
        };
        records.push((type_id, Vec::new()));
        records.push((MODULE_TERMINATOR, Vec::new()));
    }
    records.push((DIR_TERMINATOR, Vec::new()));
    build_dir_stream(&records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dir_stream() {
        let data = sample_dir_stream(
            1252,
            &[
                ("Module1", ModuleRecordType::Procedural),
                ("ThisWorkbook", ModuleRecordType::DocumentOrClass),
            ],
        );
        let info = parse_dir_stream(&data).unwrap();
        assert_eq!(info.code_page, 1252);
        assert_eq!(info.project_name, "VBAProject");
        assert_eq!(info.modules.len(), 2);
        assert_eq!(info.modules[0].name, "Module1");
        assert_eq!(info.modules[0].record_type, ModuleRecordType::Procedural);
        assert_eq!(info.modules[1].stream_name, "ThisWorkbook");
        assert_eq!(
            info.modules[1].record_type,
            ModuleRecordType::DocumentOrClass
        );
    }

    #[test]
    fn test_unicode_name_and_offset() {
        let unicode: Vec<u8> = "Módulo"
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        let data = build_dir_stream(&[
            (PROJECTCODEPAGE, 1252u16.to_le_bytes().to_vec()),
            (MODULENAME, b"M\xF3dulo".to_vec()),
            (MODULENAMEUNICODE, unicode),
            (MODULESTREAMNAME, b"Stream1".to_vec()),
            (MODULEOFFSET, 1234u32.to_le_bytes().to_vec()),
            (MODULE_TERMINATOR, Vec::new()),
        ]);
        let info = parse_dir_stream(&data).unwrap();
        assert_eq!(info.modules[0].name, "Módulo");
        assert_eq!(info.modules[0].stream_name, "Stream1");
        assert_eq!(info.modules[0].text_offset, 1234);
    }

    #[test]
    fn test_overrun_is_an_error() {
        let mut data = Vec::new();
        data.extend_from_slice(&PROJECTNAME.to_le_bytes());
        data.extend_from_slice(&100u32.to_le_bytes());
        data.extend_from_slice(b"short");
        assert!(matches!(
            parse_dir_stream(&data),
            Err(CodexError::DirStream(_))
        ));
    }

    #[test]
    fn test_parse_project_stream() {
        let text = "ID=\"{00000000-0000-0000-0000-000000000000}\"\r\n\
                    Document=ThisWorkbook/&H00000000\r\n\
                    Document=Sheet1/&H00000000\r\n\
                    Module=Module1\r\n\
                    Class=Class1\r\n\
                    BaseClass=UserForm1\r\n\
                    Name=\"VBAProject\"\r\n\
                    [Host Extender Info]\r\n\
                    Module=NotAModule\r\n";
        let kinds = parse_project_stream(text);
        assert_eq!(kinds.get("ThisWorkbook"), Some(&ModuleKind::Document));
        assert_eq!(kinds.get("Sheet1"), Some(&ModuleKind::Document));
        assert_eq!(kinds.get("Module1"), Some(&ModuleKind::Standard));
        assert_eq!(kinds.get("Class1"), Some(&ModuleKind::Class));
        assert_eq!(kinds.get("UserForm1"), Some(&ModuleKind::Form));
        assert!(!kinds.contains_key("NotAModule"));
        assert!(!kinds.contains_key("Name"));
    }

    #[test]
    fn test_decode_codepage() {
        assert_eq!(decode_codepage(b"caf\xE9", 1252), "café");
        assert_eq!(decode_codepage(b"\xC0\xE1", 1251), "Аб");
        assert_eq!(decode_codepage(b"caf\xE9", 9999), "café");
    }
}
