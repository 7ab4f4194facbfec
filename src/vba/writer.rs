//! Output files for extracted modules.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::types::VbaModule;
use crate::constants::report::{RULE_WIDTH, SUBRULE_WIDTH};
use crate::constants::vba::MODULE_HEADER_RULE;
use crate::types::Result;
use crate::util::{display_timestamp, sanitize_filename};

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Render one module with its comment header
pub fn render_module(module: &VbaModule, source: &Path, timestamp: &str) -> String {
    let mut out = String::with_capacity(module.code.len() + 256);
    let _ = writeln!(out, "' Module: {}", module.name);
    let _ = writeln!(out, "' Type: {}", module.kind);
    let _ = writeln!(out, "' Source: {}", file_name_of(source));
    let _ = writeln!(out, "' Extracted: {}", timestamp);
    let _ = writeln!(out, "' {}", "=".repeat(MODULE_HEADER_RULE));
    out.push('\n');
    out.push_str(&module.code);
    out
}

/// Render every module into one document with a table of contents
pub fn render_concatenated(modules: &[VbaModule], source: &Path, timestamp: &str) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let frame = "#".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    let mut out = String::new();
    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out, " VBA CODE EXTRACTED FROM: {}", file_name_of(source));
    let _ = writeln!(out, " Extraction Date: {}", timestamp);
    let _ = writeln!(out, " Total Modules: {}", modules.len());
    let _ = writeln!(out, "{}\n", heavy);

    out.push_str("TABLE OF CONTENTS:\n");
    let _ = writeln!(out, "{}", "-".repeat(SUBRULE_WIDTH));
    for (i, module) in modules.iter().enumerate() {
        let _ = writeln!(out, "{:3}. {} ({})", i + 1, module.name, module.kind);
    }
    let _ = writeln!(out, "\n{}\n", heavy);

    for (i, module) in modules.iter().enumerate() {
        let _ = writeln!(out, "\n{}", frame);
        let _ = writeln!(out, "# MODULE {}: {}", i + 1, module.name);
        let _ = writeln!(out, "# Type: {}", module.kind);
        let _ = writeln!(out, "# Lines: {}", module.line_count());
        let _ = writeln!(out, "{}\n", frame);
        out.push_str(&module.code);
        let _ = writeln!(out, "\n\n{}", light);
    }

    let _ = writeln!(out, "\n{}", heavy);
    out.push_str(" END OF FILE\n");
    let _ = writeln!(out, "{}", heavy);
    out
}

/// `<name>.<ext>`, or `<name>_<n>.<ext>` when an earlier module of this
/// batch already took the name. Comparison ignores case.
fn unique_file_name(module: &VbaModule, taken: &mut HashSet<String>) -> String {
    let stem = sanitize_filename(&module.name);
    let ext = module.kind.extension();
    let mut name = format!("{}.{}", stem, ext);
    let mut n = 2;
    while !taken.insert(name.to_lowercase()) {
        name = format!("{}_{}.{}", stem, n, ext);
        n += 1;
    }
    name
}

/// Write one file per module. Returns the written paths.
pub fn write_individual(modules: &[VbaModule], source: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;
    let timestamp = display_timestamp();

    let mut taken = HashSet::new();
    let mut written = Vec::with_capacity(modules.len());
    for module in modules {
        let path = output_dir.join(unique_file_name(module, &mut taken));
        fs::write(&path, render_module(module, source, &timestamp))?;
        debug!("Wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Write `<source stem>_all_vba.txt`. Returns its path.
pub fn write_concatenated(modules: &[VbaModule], source: &Path, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vba".to_string());
    let path = output_dir.join(sanitize_filename(&format!("{}_all_vba.txt", stem)));
    fs::write(&path, render_concatenated(modules, source, &display_timestamp()))?;
    debug!("Wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vba::types::ModuleKind;
    use tempfile::TempDir;

    fn module(name: &str, kind: ModuleKind, code: &str) -> VbaModule {
        VbaModule {
            name: name.to_string(),
            kind,
            code: code.to_string(),
            source_file: PathBuf::from("Book1.xlsm"),
            stream_path: format!("VBA/{}", name),
        }
    }

    #[test]
    fn test_render_module_header() {
        let m = module("Module1", ModuleKind::Standard, "Sub A()\nEnd Sub\n");
        let text = render_module(&m, Path::new("/data/Book1.xlsm"), "2024-01-01 10:00:00");
        let expected = format!(
            "' Module: Module1\n' Type: Standard Module\n' Source: Book1.xlsm\n' Extracted: 2024-01-01 10:00:00\n' {}\n\nSub A()\nEnd Sub\n",
            "=".repeat(60)
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_concatenated_layout() {
        let modules = vec![
            module("Module1", ModuleKind::Standard, "Sub A()\nEnd Sub"),
            module("Class1", ModuleKind::Class, "Private x As Long"),
        ];
        let text = render_concatenated(&modules, Path::new("Book1.xlsm"), "2024-01-01 10:00:00");

        assert!(text.starts_with(&"=".repeat(80)));
        assert!(text.contains(" VBA CODE EXTRACTED FROM: Book1.xlsm\n"));
        assert!(text.contains(" Total Modules: 2\n"));
        assert!(text.contains("  1. Module1 (Standard Module)\n"));
        assert!(text.contains("  2. Class1 (Class Module)\n"));
        assert!(text.contains("# MODULE 2: Class1\n# Type: Class Module\n# Lines: 1\n"));
        assert!(text.ends_with(&format!(" END OF FILE\n{}\n", "=".repeat(80))));
    }

    #[test]
    fn test_write_files() {
        let dir = TempDir::new().unwrap();
        let modules = vec![
            module("Module1", ModuleKind::Standard, "Sub A()\nEnd Sub"),
            module("UserForm1", ModuleKind::Form, "Private Sub UserForm_Click()\nEnd Sub"),
        ];
        let source = Path::new("Book1.xlsm");

        let written = write_individual(&modules, source, dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(dir.path().join("Module1.bas").exists());
        assert!(dir.path().join("UserForm1.frm").exists());

        let concat = write_concatenated(&modules, source, dir.path()).unwrap();
        assert_eq!(concat, dir.path().join("Book1_all_vba.txt"));
        let content = fs::read_to_string(concat).unwrap();
        assert!(content.contains("Private Sub UserForm_Click()"));
    }

    #[test]
    fn test_colliding_names_get_suffixes() {
        let dir = TempDir::new().unwrap();
        let modules = vec![
            module("Module1", ModuleKind::Standard, "' first"),
            module("Module1", ModuleKind::Standard, "' second"),
            module("module1", ModuleKind::Standard, "' third"),
            module("Module1", ModuleKind::Class, "' class"),
        ];

        let written = write_individual(&modules, Path::new("Book1.xlsm"), dir.path()).unwrap();
        let names: Vec<String> = written.iter().map(|p| file_name_of(p)).collect();
        assert_eq!(names, vec!["Module1.bas", "Module1_2.bas", "module1_3.bas", "Module1.cls"]);

        assert!(fs::read_to_string(&written[0]).unwrap().ends_with("' first"));
        assert!(fs::read_to_string(&written[1]).unwrap().ends_with("' second"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 4);
    }
}
