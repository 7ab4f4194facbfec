//! Tree rendering and flat views over a scan result.

use serde::Serialize;
use std::collections::HashMap;

use super::folder::{DirectoryEntry, ScanResult};
use crate::util::format_size;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Render the scanned hierarchy, directories before files.
pub fn generate_tree(result: &ScanResult, include_files: bool) -> String {
    let Some(root) = &result.root else {
        return "No data".to_string();
    };
    let mut lines = Vec::new();
    tree_lines(root, "", true, include_files, &mut lines);
    lines.join("\n")
}

fn tree_lines(entry: &DirectoryEntry, prefix: &str, is_last: bool, include_files: bool, lines: &mut Vec<String>) {
    let connector = if is_last { LAST_BRANCH } else { BRANCH };
    lines.push(format!("{}{}{}/", prefix, connector, entry.name));

    let child_prefix = format!("{}{}", prefix, if is_last { SPACE } else { PIPE });
    let file_count = if include_files { entry.files.len() } else { 0 };
    let total = entry.subdirectories.len() + file_count;

    for (i, sub) in entry.subdirectories.iter().enumerate() {
        tree_lines(sub, &child_prefix, i + 1 == total, include_files, lines);
    }
    for (i, file) in entry.files.iter().take(file_count).enumerate() {
        let last = entry.subdirectories.len() + i + 1 == total;
        let connector = if last { LAST_BRANCH } else { BRANCH };
        lines.push(format!(
            "{}{}{} ({})",
            child_prefix,
            connector,
            file.name,
            format_size(file.size)
        ));
    }
}

/// One file of a scan, flattened for tabular export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatFile {
    pub name: String,
    pub path: String,
    pub relative_path: String,
    pub directory: String,
    pub extension: String,
    pub size: u64,
    pub size_formatted: String,
    pub modified: String,
    pub is_binary: bool,
    pub encoding: String,
    pub has_content: bool,
    pub error: String,
}

impl FlatFile {
    pub const HEADERS: [&'static str; 12] = [
        "Name",
        "Path",
        "Relative Path",
        "Directory",
        "Extension",
        "Size (bytes)",
        "Size",
        "Modified",
        "Binary",
        "Encoding",
        "Has Content",
        "Error",
    ];

    pub fn to_cells(&self) -> Vec<String> {
        let yes_no = |b: bool| if b { "Yes" } else { "No" }.to_string();
        vec![
            self.name.clone(),
            self.path.clone(),
            self.relative_path.clone(),
            self.directory.clone(),
            self.extension.clone(),
            self.size.to_string(),
            self.size_formatted.clone(),
            self.modified.clone(),
            yes_no(self.is_binary),
            self.encoding.clone(),
            yes_no(self.has_content),
            self.error.clone(),
        ]
    }
}

/// Every file of the scan with paths relative to the root
pub fn files_flat(result: &ScanResult) -> Vec<FlatFile> {
    let Some(root) = &result.root else {
        return Vec::new();
    };

    root.walk_files()
        .into_iter()
        .map(|file| {
            let relative = file
                .path
                .strip_prefix(&root.path)
                .unwrap_or(&file.path)
                .to_path_buf();
            let directory = relative
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ".".to_string());

            FlatFile {
                name: file.name.clone(),
                path: file.path.display().to_string(),
                relative_path: relative.display().to_string(),
                directory,
                extension: file.extension.clone(),
                size: file.size,
                size_formatted: format_size(file.size),
                modified: file.modified.format("%Y-%m-%d %H:%M:%S").to_string(),
                is_binary: file.is_binary,
                encoding: file.encoding.clone(),
                has_content: file.content.is_some(),
                error: file.error.clone().unwrap_or_default(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionStat {
    pub extension: String,
    pub count: usize,
    pub size: u64,
}

/// File count and bytes per extension, largest first
pub fn extension_stats(result: &ScanResult) -> Vec<ExtensionStat> {
    let mut by_ext: HashMap<String, ExtensionStat> = HashMap::new();
    for file in result.root.iter().flat_map(|r| r.walk_files()) {
        let key = if file.extension.is_empty() {
            "(no extension)".to_string()
        } else {
            file.extension.clone()
        };
        let stat = by_ext.entry(key.clone()).or_insert_with(|| ExtensionStat {
            extension: key,
            count: 0,
            size: 0,
        });
        stat.count += 1;
        stat.size += file.size;
    }

    let mut stats: Vec<ExtensionStat> = by_ext.into_values().collect();
    stats.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.extension.cmp(&b.extension)));
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::folder::FolderScanner;
    use crate::scanner::folder::tests::fixture;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    #[test]
    fn test_generate_tree() {
        let dir = fixture();
        let mut result = FolderScanner::default().scan(dir.path()).unwrap();
        // Stable root name regardless of the temp dir
        if let Some(root) = result.root.as_mut() {
            root.name = "project".to_string();
        }

        let expected = [
            "└── project/",
            "    ├── src/",
            "    │   ├── nested/",
            "    │   │   └── deep.txt (4 B)",
            "    │   └── main.rs (13 B)",
            "    ├── a.txt (5 B)",
            "    └── b.py (12 B)",
        ]
        .join("\n");
        assert_eq!(generate_tree(&result, true), expected);

        let dirs_only = ["└── project/", "    └── src/", "        └── nested/"].join("\n");
        assert_eq!(generate_tree(&result, false), dirs_only);
    }

    #[test]
    fn test_no_data() {
        let result = ScanResult {
            root_path: PathBuf::from("x"),
            root: None,
            total_files: 0,
            total_directories: 0,
            total_size: 0,
            scan_time: Duration::ZERO,
            errors: vec![],
            cancelled: true,
        };
        assert_eq!(generate_tree(&result, true), "No data");
        assert!(files_flat(&result).is_empty());
        assert!(extension_stats(&result).is_empty());
    }

    #[test]
    fn test_files_flat_and_extension_stats() {
        let dir = fixture();
        std::fs::write(dir.path().join("Makefile"), "all:\n").unwrap();
        let result = FolderScanner::default().scan(dir.path()).unwrap();

        let flat = files_flat(&result);
        let deep = flat.iter().find(|f| f.name == "deep.txt").unwrap();
        assert_eq!(deep.relative_path, Path::new("src").join("nested").join("deep.txt").display().to_string());
        assert_eq!(deep.directory, Path::new("src").join("nested").display().to_string());
        assert_eq!(deep.size_formatted, "4 B");
        assert!(deep.has_content);
        let top = flat.iter().find(|f| f.name == "a.txt").unwrap();
        assert_eq!(top.directory, ".");
        let cells = top.to_cells();
        assert_eq!(cells.len(), FlatFile::HEADERS.len());
        assert_eq!(cells[1], top.path);
        assert_eq!(cells[8], "No");
        assert_eq!(cells[10], "Yes");
        assert_eq!(cells[11], "");

        let stats = extension_stats(&result);
        let order: Vec<&str> = stats.iter().map(|s| s.extension.as_str()).collect();
        assert_eq!(order, vec![".rs", ".py", ".txt", "(no extension)"]);
        let txt = stats.iter().find(|s| s.extension == ".txt").unwrap();
        assert_eq!((txt.count, txt.size), (2, 9));
    }
}
