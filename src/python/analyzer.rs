//! Python source analysis with tree-sitter
//!
//! Extracts imports, classes, functions, module variables and line metrics
//! from `.py` files, one blocking task per file.

use chrono::{DateTime, Local};
use futures::StreamExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tree_sitter::Node;

use crate::config::PythonAnalyzerConfig;
use crate::constants::python::{DEFAULT_EXCLUDE_DIRS, DEFAULT_MAX_WORKERS, STDLIB_MODULES};
use crate::types::{CodexError, Result};
use crate::util::decode_text;

/// Node kinds adding one branch to cyclomatic complexity
const BRANCH_KINDS: &[&str] = &[
    "if_statement",
    "elif_clause",
    "while_statement",
    "for_statement",
    "except_clause",
    "except_group_clause",
    "with_statement",
    "assert_statement",
    "for_in_clause",
    "boolean_operator",
];

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub line: usize,
    pub args: Vec<String>,
    pub return_type: Option<String>,
    pub decorators: Vec<String>,
    pub docstring: Option<String>,
    pub is_async: bool,
    pub is_method: bool,
    pub complexity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    pub line: usize,
    pub bases: Vec<String>,
    pub methods: Vec<FunctionInfo>,
    pub attributes: Vec<String>,
    pub docstring: Option<String>,
    pub decorators: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub path: String,
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Local>,
    pub line_count: usize,
    pub code_lines: usize,
    pub comment_lines: usize,
    pub blank_lines: usize,
    pub docstring_lines: usize,
    pub imports: Vec<String>,
    pub from_imports: Vec<String>,
    pub classes: Vec<ClassInfo>,
    pub functions: Vec<FunctionInfo>,
    pub global_variables: Vec<String>,
    pub dependencies: BTreeSet<String>,
    pub has_main: bool,
    pub encoding: String,
    pub parse_error: Option<String>,
}

impl FileAnalysis {
    fn empty(path: &Path, size: u64, modified: DateTime<Local>) -> Self {
        Self {
            path: path.display().to_string(),
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size,
            modified,
            line_count: 0,
            code_lines: 0,
            comment_lines: 0,
            blank_lines: 0,
            docstring_lines: 0,
            imports: Vec::new(),
            from_imports: Vec::new(),
            classes: Vec::new(),
            functions: Vec::new(),
            global_variables: Vec::new(),
            dependencies: BTreeSet::new(),
            has_main: false,
            encoding: "utf-8".to_string(),
            parse_error: None,
        }
    }

    /// Placeholder entry for a file that could not be analyzed at all
    pub fn failed(path: &Path, error: impl Into<String>) -> Self {
        let mut analysis = Self::empty(path, 0, Local::now());
        analysis.parse_error = Some(error.into());
        analysis
    }

    /// (comments + docstrings) / (code + comments + docstrings) in percent
    pub fn documentation_ratio(&self) -> f64 {
        let documented = self.comment_lines + self.docstring_lines;
        let total = self.code_lines + documented;
        if total == 0 {
            return 0.0;
        }
        documented as f64 / total as f64 * 100.0
    }

    /// Functions plus class methods
    pub fn total_functions(&self) -> usize {
        self.functions.len() + self.classes.iter().map(|c| c.methods.len()).sum::<usize>()
    }
}

// =============================================================================
// Single File
// =============================================================================

fn node_text(node: Node<'_>, src: &[u8]) -> String {
    node.utf8_text(src).unwrap_or("").to_string()
}

fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

/// Pre-order list of `root` and all its descendants
fn descendants(root: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        out.push(node);
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    out
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Same cleanup as Python's `inspect.cleandoc`
fn clean_docstring(raw: &str) -> String {
    let expanded = raw.replace('\t', "        ");
    let lines: Vec<&str> = expanded.split('\n').collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<&str> = Vec::with_capacity(lines.len());
    if let Some(first) = lines.first() {
        cleaned.push(first.trim_start());
    }
    for line in lines.iter().skip(1) {
        cleaned.push(line.get(margin..).unwrap_or(""));
    }

    while cleaned.last().is_some_and(|l| l.is_empty()) {
        cleaned.pop();
    }
    let leading = cleaned.iter().take_while(|l| l.is_empty()).count();
    cleaned[leading..].join("\n")
}

/// Body of a string literal without prefix and quotes
fn string_literal_body(literal: &str) -> &str {
    let unprefixed = literal.trim_start_matches(|c: char| "rRuUbBfF".contains(c));
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if unprefixed.len() >= quote.len() * 2
            && unprefixed.starts_with(quote)
            && unprefixed.ends_with(quote)
        {
            return &unprefixed[quote.len()..unprefixed.len() - quote.len()];
        }
    }
    unprefixed
}

/// Docstring of a module root or a class/function body block
fn docstring_of(body: Node<'_>, src: &[u8]) -> Option<String> {
    let first = named_children(body)
        .into_iter()
        .find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let literal = named_children(first).into_iter().next()?;
    if literal.kind() != "string" {
        return None;
    }
    let raw = node_text(literal, src);
    Some(clean_docstring(string_literal_body(&raw)))
}

fn decorators_of(definition: Node<'_>, src: &[u8]) -> Vec<String> {
    let Some(parent) = definition.parent().filter(|p| p.kind() == "decorated_definition") else {
        return Vec::new();
    };
    named_children(parent)
        .into_iter()
        .filter(|n| n.kind() == "decorator")
        .map(|n| node_text(n, src).trim().trim_start_matches('@').trim().to_string())
        .collect()
}

/// The class whose body directly holds this definition
fn enclosing_class(definition: Node<'_>) -> Option<Node<'_>> {
    let mut parent = definition.parent()?;
    if parent.kind() == "decorated_definition" {
        parent = parent.parent()?;
    }
    if parent.kind() != "block" {
        return None;
    }
    parent.parent().filter(|owner| owner.kind() == "class_definition")
}

fn parameter_text(param: Node<'_>, src: &[u8]) -> Option<String> {
    match param.kind() {
        "identifier" | "list_splat_pattern" | "dictionary_splat_pattern" => Some(node_text(param, src)),
        "default_parameter" => param.child_by_field_name("name").map(|n| node_text(n, src)),
        "typed_parameter" | "typed_default_parameter" => {
            let name = match param.child_by_field_name("name") {
                Some(n) => node_text(n, src),
                None => named_children(param)
                    .into_iter()
                    .next()
                    .map(|n| node_text(n, src))?,
            };
            match param.child_by_field_name("type") {
                Some(ty) => Some(format!("{}: {}", name, node_text(ty, src))),
                None => Some(name),
            }
        }
        _ => None,
    }
}

fn complexity_of(function: Node<'_>) -> usize {
    1 + descendants(function)
        .into_iter()
        .skip(1)
        .filter(|n| BRANCH_KINDS.contains(&n.kind()))
        .count()
}

fn analyze_function(node: Node<'_>, src: &[u8], is_method: bool) -> FunctionInfo {
    let mut cursor = node.walk();
    let is_async = node.children(&mut cursor).any(|c| c.kind() == "async");

    let args = node
        .child_by_field_name("parameters")
        .map(|params| {
            named_children(params)
                .into_iter()
                .filter_map(|p| parameter_text(p, src))
                .collect()
        })
        .unwrap_or_default();

    FunctionInfo {
        name: node
            .child_by_field_name("name")
            .map(|n| node_text(n, src))
            .unwrap_or_default(),
        line: line_of(node),
        args,
        return_type: node.child_by_field_name("return_type").map(|n| node_text(n, src)),
        decorators: decorators_of(node, src),
        docstring: node.child_by_field_name("body").and_then(|b| docstring_of(b, src)),
        is_async,
        is_method,
        complexity: complexity_of(node),
    }
}

/// Names bound by a plain, chained or annotated assignment statement
fn assignment_targets(statement: Node<'_>, src: &[u8], out: &mut Vec<String>) {
    if statement.kind() != "expression_statement" {
        return;
    }
    for child in named_children(statement) {
        let mut current = Some(child);
        while let Some(assignment) = current.filter(|n| n.kind() == "assignment") {
            if let Some(left) = assignment
                .child_by_field_name("left")
                .filter(|l| l.kind() == "identifier")
            {
                out.push(node_text(left, src));
            }
            current = assignment.child_by_field_name("right");
        }
    }
}

fn analyze_class(node: Node<'_>, src: &[u8]) -> ClassInfo {
    let bases = node
        .child_by_field_name("superclasses")
        .map(|args| {
            named_children(args)
                .into_iter()
                .filter(|a| !matches!(a.kind(), "keyword_argument" | "comment"))
                .map(|a| node_text(a, src))
                .collect()
        })
        .unwrap_or_default();

    let mut methods = Vec::new();
    let mut attributes = Vec::new();
    let body = node.child_by_field_name("body");

    if let Some(body) = body {
        for item in named_children(body) {
            let definition = match item.kind() {
                "decorated_definition" => item.child_by_field_name("definition"),
                _ => Some(item),
            };
            match definition {
                Some(def) if def.kind() == "function_definition" => {
                    methods.push(analyze_function(def, src, true));
                }
                _ => assignment_targets(item, src, &mut attributes),
            }
        }
    }

    ClassInfo {
        name: node
            .child_by_field_name("name")
            .map(|n| node_text(n, src))
            .unwrap_or_default(),
        line: line_of(node),
        bases,
        methods,
        attributes,
        docstring: body.and_then(|b| docstring_of(b, src)),
        decorators: decorators_of(node, src),
    }
}

fn record_import(analysis: &mut FileAnalysis, module: String) {
    if let Some(root) = module.split('.').next().filter(|r| !r.is_empty()) {
        analysis.dependencies.insert(root.to_string());
    }
    analysis.imports.push(module);
}

fn analyze_tree(root: Node<'_>, src: &[u8], analysis: &mut FileAnalysis) {
    for node in descendants(root) {
        match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                let names: Vec<Node<'_>> = node.children_by_field_name("name", &mut cursor).collect();
                for name in names {
                    let module = match name.kind() {
                        "aliased_import" => name.child_by_field_name("name").map(|n| node_text(n, src)),
                        _ => Some(node_text(name, src)),
                    };
                    if let Some(module) = module {
                        record_import(analysis, module);
                    }
                }
            }
            "import_from_statement" => {
                if let Some(module) = node.child_by_field_name("module_name") {
                    let text = node_text(module, src);
                    if module.kind() != "relative_import" {
                        if let Some(root) = text.split('.').next() {
                            analysis.dependencies.insert(root.to_string());
                        }
                    }
                    analysis.from_imports.push(text);
                }
            }
            "future_import_statement" => {
                analysis.dependencies.insert("__future__".to_string());
                analysis.from_imports.push("__future__".to_string());
            }
            "class_definition" => analysis.classes.push(analyze_class(node, src)),
            "function_definition" if enclosing_class(node).is_none() => {
                analysis.functions.push(analyze_function(node, src, false));
            }
            _ => {}
        }
    }

    for statement in named_children(root) {
        assignment_targets(statement, src, &mut analysis.global_variables);
    }

    // Module, class and function docstrings
    let mut docstring_lines = docstring_of(root, src)
        .filter(|d| !d.is_empty())
        .map_or(0, |d| d.split('\n').count());
    let nested = analysis
        .classes
        .iter()
        .map(|c| &c.docstring)
        .chain(analysis.functions.iter().map(|f| &f.docstring))
        .chain(analysis.classes.iter().flat_map(|c| c.methods.iter().map(|m| &m.docstring)));
    for doc in nested.flatten().filter(|d| !d.is_empty()) {
        docstring_lines += doc.split('\n').count();
    }
    analysis.docstring_lines = docstring_lines;
}

fn first_error_line(root: Node<'_>) -> usize {
    descendants(root)
        .into_iter()
        .find(|n| n.is_error() || n.is_missing())
        .map_or(1, line_of)
}

fn python_parser() -> Result<tree_sitter::Parser> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| CodexError::Parse {
            message: format!("Failed to set Python language: {}", e),
            path: String::new(),
        })?;
    Ok(parser)
}

/// Analyze one Python file. Read and syntax failures land in `parse_error`.
pub fn analyze_file(path: &Path) -> Result<FileAnalysis> {
    if !path.is_file() {
        return Err(CodexError::not_found(path));
    }
    let metadata = std::fs::metadata(path)?;
    let modified = metadata
        .modified()
        .map(DateTime::<Local>::from)
        .unwrap_or_else(|_| Local::now());
    let mut analysis = FileAnalysis::empty(path, metadata.len(), modified);

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            analysis.parse_error = Some(e.to_string());
            return Ok(analysis);
        }
    };
    let (decoded, encoding) = decode_text(&bytes);
    let content = decoded.replace("\r\n", "\n");
    analysis.encoding = encoding.as_str().to_string();

    let lines: Vec<&str> = content.split('\n').collect();
    analysis.line_count = lines.len();
    analysis.blank_lines = lines.iter().filter(|l| l.trim().is_empty()).count();
    analysis.comment_lines = lines.iter().filter(|l| l.trim().starts_with('#')).count();
    let non_code = analysis.blank_lines + analysis.comment_lines;

    let mut parser = python_parser()?;
    let tree = parser.parse(&content, None).ok_or_else(|| CodexError::Parse {
        message: "Failed to parse Python file".to_string(),
        path: analysis.path.clone(),
    })?;
    let root = tree.root_node();

    if root.has_error() {
        analysis.parse_error = Some(format!("Syntax error at line {}", first_error_line(root)));
        analysis.code_lines = analysis.line_count.saturating_sub(non_code);
        debug!("{}: {}", analysis.path, analysis.parse_error.as_deref().unwrap_or_default());
        return Ok(analysis);
    }

    analyze_tree(root, content.as_bytes(), &mut analysis);
    analysis.has_main = content.contains("if __name__");
    analysis.code_lines = analysis
        .line_count
        .saturating_sub(non_code + analysis.docstring_lines);

    debug!(
        "{}: {} classes, {} functions",
        analysis.path,
        analysis.classes.len(),
        analysis.total_functions()
    );
    Ok(analysis)
}

// =============================================================================
// Directory
// =============================================================================

/// File selection for a directory run
#[derive(Debug, Clone)]
pub struct DirectoryOptions {
    pub include_subdirs: bool,
    /// Regex searched in each file name
    pub pattern: Option<String>,
    pub exclude_dirs: Vec<String>,
    /// File-name globs
    pub exclude_patterns: Vec<String>,
}

impl Default for DirectoryOptions {
    fn default() -> Self {
        Self {
            include_subdirs: true,
            pattern: None,
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl From<&PythonAnalyzerConfig> for DirectoryOptions {
    fn from(config: &PythonAnalyzerConfig) -> Self {
        Self {
            include_subdirs: config.include_subdirs,
            pattern: None,
            exclude_dirs: config.exclude_dirs.clone(),
            exclude_patterns: config.exclude_patterns.clone(),
        }
    }
}

/// `.py` files under `dir`, sorted by path
pub fn collect_python_files(dir: &Path, options: &DirectoryOptions) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(CodexError::not_found(dir));
    }
    if !dir.is_dir() {
        return Err(CodexError::NotADirectory(dir.to_path_buf()));
    }

    let pattern = options.pattern.as_deref().map(Regex::new).transpose()?;
    let excluded_globs = options
        .exclude_patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p)
                .map_err(|e| CodexError::Config(format!("Invalid exclude pattern '{}': {}", p, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    let exclude_dirs = options.exclude_dirs.clone();
    let walker = ignore::WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(false)
        .max_depth(if options.include_subdirs { None } else { Some(1) })
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir
                && entry.depth() > 0
                && exclude_dirs
                    .iter()
                    .any(|d| entry.file_name().to_string_lossy() == d.as_str()))
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !name.ends_with(".py") {
            continue;
        }
        if pattern.as_ref().is_some_and(|re| !re.is_match(&name)) {
            continue;
        }
        if excluded_globs.iter().any(|g| g.matches(&name)) {
            continue;
        }
        files.push(entry.into_path());
    }

    files.sort();
    Ok(files)
}

/// Directory-level analyzer bounded to `max_workers` concurrent files
pub struct PythonAnalyzer {
    max_workers: usize,
}

impl Default for PythonAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}

impl PythonAnalyzer {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    pub async fn analyze_directory(
        &self,
        dir: &Path,
        options: &DirectoryOptions,
    ) -> Result<Vec<FileAnalysis>> {
        let files = collect_python_files(dir, options)?;
        info!("Analyzing {} Python files in {}", files.len(), dir.display());

        let mut results: Vec<FileAnalysis> = futures::stream::iter(files)
            .map(|path| async move {
                let task_path = path.clone();
                match tokio::task::spawn_blocking(move || analyze_file(&task_path)).await {
                    Ok(Ok(analysis)) => analysis,
                    Ok(Err(e)) => {
                        warn!("Failed to analyze {}: {}", path.display(), e);
                        FileAnalysis::failed(&path, e.to_string())
                    }
                    Err(e) => FileAnalysis::failed(&path, e.to_string()),
                }
            })
            .buffer_unordered(self.max_workers)
            .collect()
            .await;

        results.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(results)
    }
}

/// Dependencies outside the standard library, sorted
pub fn external_dependencies(analyses: &[FileAnalysis]) -> Vec<String> {
    analyses
        .iter()
        .flat_map(|a| a.dependencies.iter())
        .filter(|d| !STDLIB_MODULES.contains(&d.as_str()))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#""""Inventory helpers.

Loads and prices stock.
"""
import os
import numpy as np
import xml.etree.ElementTree
from collections import OrderedDict
from .models import Item
from . import utils

LIMIT = 10
a = b = 2

# pricing
@dataclass
class Item(Base, metaclass=Meta):
    """A stock item."""
    name: str
    count = 0

    def price(self, rate: float = 1.0) -> float:
        if rate > 1 and self.count or rate < 0:
            return 0.0
        return rate

    @staticmethod
    async def fetch(*args, **kwargs):
        """Fetch remotely."""
        return [x for x in args if x]


async def load(path, *, strict: bool = False):
    def inner():
        pass
    with open(path) as f:
        return f.read()


if __name__ == "__main__":
    load("x")
"#;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_analyze_sample() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "inventory.py", SAMPLE);
        let analysis = analyze_file(&path).unwrap();

        assert!(analysis.parse_error.is_none());
        assert_eq!(analysis.name, "inventory.py");
        assert_eq!(analysis.imports, vec!["os", "numpy", "xml.etree.ElementTree"]);
        assert_eq!(analysis.from_imports, vec!["collections", ".models", "."]);
        assert_eq!(
            analysis.dependencies.iter().cloned().collect::<Vec<_>>(),
            vec!["collections", "numpy", "os", "xml"]
        );
        assert_eq!(analysis.global_variables, vec!["LIMIT", "a", "b"]);
        assert!(analysis.has_main);

        assert_eq!(analysis.classes.len(), 1);
        let class = &analysis.classes[0];
        assert_eq!(class.name, "Item");
        assert_eq!(class.bases, vec!["Base"]);
        assert_eq!(class.decorators, vec!["dataclass"]);
        assert_eq!(class.attributes, vec!["name", "count"]);
        assert_eq!(class.docstring.as_deref(), Some("A stock item."));

        let price = &class.methods[0];
        assert_eq!(price.args, vec!["self", "rate: float"]);
        assert_eq!(price.return_type.as_deref(), Some("float"));
        assert!(price.is_method);
        // if + two boolean operators
        assert_eq!(price.complexity, 4);

        let fetch = &class.methods[1];
        assert!(fetch.is_async);
        assert_eq!(fetch.args, vec!["*args", "**kwargs"]);
        assert_eq!(fetch.decorators, vec!["staticmethod"]);
        // comprehension `for` counts, its `if` does not
        assert_eq!(fetch.complexity, 2);

        // Async functions are listed once; nested functions are included
        let names: Vec<&str> = analysis.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["load", "inner"]);
        assert_eq!(analysis.functions[0].args, vec!["path", "strict: bool"]);
        assert_eq!(analysis.functions[0].complexity, 2);
        assert_eq!(analysis.total_functions(), 4);
    }

    #[test]
    fn test_line_metrics() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "inventory.py", SAMPLE);
        let analysis = analyze_file(&path).unwrap();

        let lines: Vec<&str> = SAMPLE.split('\n').collect();
        let blank = lines.iter().filter(|l| l.trim().is_empty()).count();
        assert_eq!(analysis.line_count, lines.len());
        assert_eq!(analysis.blank_lines, blank);
        assert_eq!(analysis.comment_lines, 1);
        // module docstring (3 lines) + class + fetch
        assert_eq!(analysis.docstring_lines, 5);
        assert_eq!(analysis.code_lines, lines.len() - blank - 1 - 5);
        assert!(analysis.documentation_ratio() > 0.0);
    }

    #[test]
    fn test_syntax_error() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "broken.py", "import os\n\ndef broken(:\n    pass\n");
        let analysis = analyze_file(&path).unwrap();

        let error = analysis.parse_error.as_deref().unwrap();
        assert!(error.starts_with("Syntax error at line 3"), "{}", error);
        assert!(analysis.imports.is_empty());
        assert_eq!(analysis.code_lines, 5 - 2);
    }

    #[test]
    fn test_clean_docstring() {
        assert_eq!(clean_docstring("Summary.\n\n    Detail one.\n      Nested.\n    "), "Summary.\n\nDetail one.\n  Nested.");
        assert_eq!(clean_docstring("\n    Leading blank.\n"), "Leading blank.");
        assert_eq!(string_literal_body(r#"r"""raw""""#), "raw");
        assert_eq!(string_literal_body("'single'"), "single");
    }

    #[test]
    fn test_latin1_file_is_decoded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.py");
        std::fs::write(&path, b"# caf\xe9\nx = 1\n").unwrap();
        let analysis = analyze_file(&path).unwrap();
        assert_eq!(analysis.encoding, "windows-1252");
        assert_eq!(analysis.global_variables, vec!["x"]);
    }

    #[tokio::test]
    async fn test_analyze_directory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.py", "import requests\n");
        write(dir.path(), "test_main.py", "import pytest\n");
        write(dir.path(), "pkg/util.py", "import os\n");
        write(dir.path(), "venv/lib/site.py", "import hidden\n");
        write(dir.path(), "broken.py", "def (\n");
        write(dir.path(), "notes.txt", "import nothing\n");

        let analyzer = PythonAnalyzer::new(2);
        let options = DirectoryOptions {
            exclude_patterns: vec!["test_*".to_string()],
            ..Default::default()
        };
        let results = analyzer.analyze_directory(dir.path(), &options).await.unwrap();

        let names: Vec<&str> = results.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["broken.py", "main.py", "util.py"]);
        assert!(results[0].parse_error.is_some());
        assert_eq!(external_dependencies(&results), vec!["requests"]);

        let top_level = DirectoryOptions {
            include_subdirs: false,
            pattern: Some("^ma".to_string()),
            ..Default::default()
        };
        let results = analyzer.analyze_directory(dir.path(), &top_level).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "main.py");
    }

    #[tokio::test]
    async fn test_analyze_directory_errors() {
        let analyzer = PythonAnalyzer::default();
        let missing = analyzer
            .analyze_directory(Path::new("/nonexistent/codextract"), &DirectoryOptions::default())
            .await;
        assert!(matches!(missing, Err(CodexError::NotFound(_))));

        let dir = TempDir::new().unwrap();
        let bad = DirectoryOptions {
            pattern: Some("(".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            analyzer.analyze_directory(dir.path(), &bad).await,
            Err(CodexError::Regex(_))
        ));
    }
}
