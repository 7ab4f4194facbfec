//! VBA source inventory
//!
//! Line-oriented regex extraction of procedures, variables, constants and
//! module-level definitions, plus aggregate statistics and a text report.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::types::VbaModule;
use crate::constants::report::{RULE_WIDTH, SUBRULE_WIDTH};
use crate::types::{CodexError, Result};
use crate::util::{decode_text, display_timestamp};

/// Extensions of exported VBA source files
pub const SOURCE_EXTENSIONS: &[&str] = &["bas", "cls", "frm"];

static PROCEDURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(Public|Private|Friend)?\s*(Sub|Function|Property\s+(?:Get|Let|Set))\s+(\w+)\s*\(([^)]*)\)(?:\s+As\s+(\w+))?",
    )
    .unwrap()
});

static VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(Dim|Private|Public|Global|Static)\s+(.*\bAs\b.*)$").unwrap()
});

/// Keywords that turn a scope modifier into something other than a variable declaration
static NOT_VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(Sub|Function|Property|Const|Declare|Type|Enum|Event)\b").unwrap()
});

/// One declarator: `name[(bounds)] [As [New] Type]`
static DECLARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:WithEvents\s+)?(\w+)\s*(\([^)]*\))?\s*(?:As\s+(?:New\s+)?([\w.]+(?:\s*\*\s*\d+)?))?\s*$")
        .unwrap()
});

static CONST_TYPED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(Public|Private)?\s*Const\s+(\w+)\s+As\s+(\w+)\s*=\s*(.+)$").unwrap()
});

static CONST_SIMPLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(Public|Private)?\s*Const\s+(\w+)\s*=\s*(.+)$").unwrap()
});

static PROCEDURE_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*End\s+(Sub|Function|Property)\b").unwrap());

static TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(Public|Private)?\s*Type\s+(\w+)").unwrap());

static ENUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(Public|Private)?\s*Enum\s+(\w+)").unwrap());

static DECLARE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\s*(Public|Private)?\s*Declare\s+(PtrSafe\s+)?(Sub|Function)\s+(\w+)\s+Lib\s+"([^"]+)""#)
        .unwrap()
});

static OPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*Option\s+(Explicit|Base|Compare|Private)\b\s*(.*)$").unwrap()
});

static VB_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?im)^\s*Attribute\s+VB_Name\s*=\s*"([^"]+)""#).unwrap());

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VbaProcedure {
    pub name: String,
    /// `Sub`, `Function`, `Property Get`, `Property Let` or `Property Set`
    pub procedure_type: String,
    pub scope: String,
    pub parameters: String,
    pub return_type: Option<String>,
    pub module_name: String,
    pub line: usize,
    pub signature: String,
}

/// A variable or constant declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VbaVariable {
    pub name: String,
    pub var_type: String,
    /// `Dim`, `Private`, `Public`, `Global`, `Static` or `Const`
    pub declaration: String,
    /// Declaration keyword for Private/Public/Global, otherwise `Local` or `Module`
    pub scope: String,
    pub value: Option<String>,
    pub module_name: String,
    pub procedure_name: Option<String>,
    pub line: usize,
    pub source: String,
}

impl VbaVariable {
    pub fn is_constant(&self) -> bool {
        self.declaration == "Const"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefinitionKind {
    Type,
    Enum,
    #[serde(rename = "API")]
    ApiDeclaration,
    Option,
}

impl DefinitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Type => "Type",
            Self::Enum => "Enum",
            Self::ApiDeclaration => "API",
            Self::Option => "Option",
        }
    }
}

/// Module-level definition: user type, enum, API declaration or Option statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VbaDefinition {
    pub kind: DefinitionKind,
    pub name: String,
    pub scope: String,
    /// DLL for API declarations
    pub library: Option<String>,
    pub line: usize,
}

/// Analysis of one module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VbaAnalysis {
    pub source_file: String,
    pub module_name: String,
    pub procedures: Vec<VbaProcedure>,
    pub variables: Vec<VbaVariable>,
    pub definitions: Vec<VbaDefinition>,
}

impl VbaAnalysis {
    pub fn total_procedures(&self) -> usize {
        self.procedures.len()
    }

    /// `<source file>::<module>`, unique across workbooks
    pub fn module_key(&self) -> String {
        if self.source_file.is_empty() {
            self.module_name.clone()
        } else {
            format!("{}::{}", self.source_file, self.module_name)
        }
    }

    pub fn total_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn total_constants(&self) -> usize {
        self.variables.iter().filter(|v| v.is_constant()).count()
    }
}

// =============================================================================
// Extraction
// =============================================================================

/// Canonical spelling of a keyword matched case-insensitively
fn canonical(keyword: &str) -> String {
    keyword
        .split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn capture(caps: &regex::Captures<'_>, i: usize) -> Option<String> {
    caps.get(i).map(|m| m.as_str().to_string())
}

fn extract_procedures(lines: &[&str], module_name: &str) -> Vec<VbaProcedure> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| {
            let caps = PROCEDURE_RE.captures(line)?;
            Some(VbaProcedure {
                name: caps[3].to_string(),
                procedure_type: canonical(&caps[2]),
                scope: caps
                    .get(1)
                    .map(|m| canonical(m.as_str()))
                    .unwrap_or_else(|| "Public".to_string()),
                parameters: caps[4].trim().to_string(),
                return_type: capture(&caps, 5),
                module_name: module_name.to_string(),
                line: i + 1,
                signature: line.trim().to_string(),
            })
        })
        .collect()
}

fn extract_variables(lines: &[&str], module_name: &str, procedures: &[VbaProcedure]) -> Vec<VbaVariable> {
    let mut variables = Vec::new();
    let mut current_procedure: Option<String> = None;

    for (i, line) in lines.iter().enumerate() {
        let line_no = i + 1;
        if let Some(proc) = procedures.iter().find(|p| p.line == line_no) {
            current_procedure = Some(proc.name.clone());
        }
        if PROCEDURE_END_RE.is_match(line) {
            current_procedure = None;
            continue;
        }

        let const_scope = |caps: &regex::Captures<'_>| {
            caps.get(1).map(|m| canonical(m.as_str())).unwrap_or_else(|| {
                if current_procedure.is_some() {
                    "Private".to_string()
                } else {
                    "Public".to_string()
                }
            })
        };

        if let Some(caps) = CONST_TYPED_RE.captures(line) {
            variables.push(VbaVariable {
                name: caps[2].to_string(),
                var_type: caps[3].to_string(),
                declaration: "Const".to_string(),
                scope: const_scope(&caps),
                value: Some(caps[4].trim().to_string()),
                module_name: module_name.to_string(),
                procedure_name: current_procedure.clone(),
                line: line_no,
                source: line.trim().to_string(),
            });
            continue;
        }

        if let Some(caps) = CONST_SIMPLE_RE.captures(line) {
            variables.push(VbaVariable {
                name: caps[2].to_string(),
                var_type: "Variant".to_string(),
                declaration: "Const".to_string(),
                scope: const_scope(&caps),
                value: Some(caps[3].trim().to_string()),
                module_name: module_name.to_string(),
                procedure_name: current_procedure.clone(),
                line: line_no,
                source: line.trim().to_string(),
            });
            continue;
        }

        if let Some(caps) = VARIABLE_RE.captures(line) {
            if NOT_VARIABLE_RE.is_match(&caps[2]) {
                continue;
            }
            let declaration = canonical(&caps[1]);
            let scope = match declaration.as_str() {
                "Private" | "Public" | "Global" => declaration.clone(),
                _ if current_procedure.is_some() => "Local".to_string(),
                _ => "Module".to_string(),
            };

            for (name, var_type) in parse_declarators(&caps[2]) {
                variables.push(VbaVariable {
                    name,
                    var_type,
                    declaration: declaration.clone(),
                    scope: scope.clone(),
                    value: None,
                    module_name: module_name.to_string(),
                    procedure_name: current_procedure.clone(),
                    line: line_no,
                    source: line.trim().to_string(),
                });
            }
        }
    }

    variables
}

/// Split on commas outside parentheses
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Names and types of a declarator list such as `a, b As Long, c() As String`.
/// An untyped name takes the type of the next typed one, or `Variant`.
fn parse_declarators(list: &str) -> Vec<(String, String)> {
    let list = list.split('\'').next().unwrap_or(list);
    let parsed: Vec<(String, bool, Option<String>)> = split_top_level(list)
        .into_iter()
        .filter_map(|piece| {
            let caps = DECLARATOR_RE.captures(piece)?;
            Some((caps[1].to_string(), caps.get(2).is_some(), capture(&caps, 3)))
        })
        .collect();

    let mut pending_type: Option<String> = None;
    let mut out: Vec<(String, String)> = parsed
        .into_iter()
        .rev()
        .map(|(name, is_array, declared)| {
            if declared.is_some() {
                pending_type = declared.clone();
            }
            let base = declared
                .or_else(|| pending_type.clone())
                .unwrap_or_else(|| "Variant".to_string());
            let var_type = if is_array { format!("{}()", base) } else { base };
            (name, var_type)
        })
        .collect();
    out.reverse();
    out
}

fn extract_definitions(lines: &[&str]) -> Vec<VbaDefinition> {
    let scope_of = |caps: &regex::Captures<'_>| {
        caps.get(1)
            .map(|m| canonical(m.as_str()))
            .unwrap_or_else(|| "Public".to_string())
    };

    let mut definitions = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let line_no = i + 1;
        let definition = if let Some(caps) = DECLARE_RE.captures(line) {
            VbaDefinition {
                kind: DefinitionKind::ApiDeclaration,
                name: caps[4].to_string(),
                scope: scope_of(&caps),
                library: capture(&caps, 5),
                line: line_no,
            }
        } else if let Some(caps) = TYPE_RE.captures(line) {
            VbaDefinition {
                kind: DefinitionKind::Type,
                name: caps[2].to_string(),
                scope: scope_of(&caps),
                library: None,
                line: line_no,
            }
        } else if let Some(caps) = ENUM_RE.captures(line) {
            VbaDefinition {
                kind: DefinitionKind::Enum,
                name: caps[2].to_string(),
                scope: scope_of(&caps),
                library: None,
                line: line_no,
            }
        } else if let Some(caps) = OPTION_RE.captures(line) {
            let rest = caps[2].trim();
            let name = if rest.is_empty() {
                canonical(&caps[1])
            } else {
                format!("{} {}", canonical(&caps[1]), rest)
            };
            VbaDefinition {
                kind: DefinitionKind::Option,
                name,
                scope: "Module".to_string(),
                library: None,
                line: line_no,
            }
        } else {
            continue;
        };
        definitions.push(definition);
    }
    definitions
}

/// Analyze the code of one module.
pub fn analyze_code(code: &str, module_name: &str, source_file: &str) -> VbaAnalysis {
    let lines: Vec<&str> = code.split('\n').map(|l| l.trim_end_matches('\r')).collect();
    let procedures = extract_procedures(&lines, module_name);
    let variables = extract_variables(&lines, module_name, &procedures);
    let definitions = extract_definitions(&lines);

    VbaAnalysis {
        source_file: source_file.to_string(),
        module_name: module_name.to_string(),
        procedures,
        variables,
        definitions,
    }
}

/// Analyze extracted modules
pub fn analyze_modules(modules: &[VbaModule]) -> Vec<VbaAnalysis> {
    modules
        .iter()
        .map(|m| analyze_code(&m.code, &m.name, &m.source_file.to_string_lossy()))
        .collect()
}

/// Analyze an exported `.bas`, `.cls` or `.frm` file.
/// The module name comes from `Attribute VB_Name`, falling back to the file stem.
pub fn analyze_source_file(path: &Path) -> Result<VbaAnalysis> {
    if !path.is_file() {
        return Err(CodexError::not_found(path));
    }
    let (code, _) = decode_text(&std::fs::read(path)?);
    let module_name = VB_NAME_RE
        .captures(&code)
        .map(|c| c[1].to_string())
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "Module1".to_string());
    Ok(analyze_code(&code, &module_name, &path.to_string_lossy()))
}

/// Whether a path is an exported VBA source file
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext.as_str()))
}

/// Exported VBA source files directly inside `dir`, sorted by path
pub fn collect_source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(CodexError::NotADirectory(dir.to_path_buf()));
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_source_file(p))
        .collect();
    files.sort();
    Ok(files)
}

// =============================================================================
// Statistics & Report
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VbaStatistics {
    pub total_modules: usize,
    pub total_procedures: usize,
    pub total_variables: usize,
    pub total_constants: usize,
    pub procedures_by_type: BTreeMap<String, usize>,
    pub procedures_by_scope: BTreeMap<String, usize>,
    pub variables_by_type: BTreeMap<String, usize>,
    pub variables_by_declaration: BTreeMap<String, usize>,
    pub procedures_per_module: BTreeMap<String, usize>,
    pub variables_per_module: BTreeMap<String, usize>,
}

impl VbaStatistics {
    /// Variable types by descending count, ties by name
    pub fn top_variable_types(&self, n: usize) -> Vec<(&str, usize)> {
        let mut types: Vec<(&str, usize)> = self
            .variables_by_type
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        types.truncate(n);
        types
    }
}

pub fn generate_statistics(results: &[VbaAnalysis]) -> VbaStatistics {
    let mut stats = VbaStatistics {
        total_modules: results.len(),
        ..Default::default()
    };

    for result in results {
        stats.total_procedures += result.total_procedures();
        stats.total_variables += result.total_variables();
        stats.total_constants += result.total_constants();
        let key = result.module_key();
        *stats.procedures_per_module.entry(key.clone()).or_default() += result.total_procedures();
        *stats.variables_per_module.entry(key).or_default() += result.total_variables();

        for proc in &result.procedures {
            *stats
                .procedures_by_type
                .entry(proc.procedure_type.clone())
                .or_default() += 1;
            *stats.procedures_by_scope.entry(proc.scope.clone()).or_default() += 1;
        }
        for var in &result.variables {
            *stats.variables_by_type.entry(var.var_type.clone()).or_default() += 1;
            *stats
                .variables_by_declaration
                .entry(var.declaration.clone())
                .or_default() += 1;
        }
    }

    stats
}

/// Plain-text analysis report
pub fn generate_report(results: &[VbaAnalysis]) -> String {
    let stats = generate_statistics(results);
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(SUBRULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out, " VBA ANALYSIS REPORT");
    let _ = writeln!(out, " Date: {}", display_timestamp());
    let _ = writeln!(out, "{}\n", heavy);

    let _ = writeln!(out, "SUMMARY:\n{}", light);
    let _ = writeln!(out, "  Modules analyzed: {}", stats.total_modules);
    let _ = writeln!(out, "  Procedures: {}", stats.total_procedures);
    let _ = writeln!(out, "  Variables: {}", stats.total_variables);
    let _ = writeln!(out, "  Constants: {}\n", stats.total_constants);

    if !stats.procedures_by_type.is_empty() {
        let _ = writeln!(out, "PROCEDURES BY TYPE:\n{}", light);
        for (kind, count) in &stats.procedures_by_type {
            let _ = writeln!(out, "  {}: {}", kind, count);
        }
        out.push('\n');
    }

    if !stats.procedures_by_scope.is_empty() {
        let _ = writeln!(out, "PROCEDURES BY SCOPE:\n{}", light);
        for (scope, count) in &stats.procedures_by_scope {
            let _ = writeln!(out, "  {}: {}", scope, count);
        }
        out.push('\n');
    }

    if !stats.variables_by_type.is_empty() {
        let _ = writeln!(out, "VARIABLE TYPES (TOP 10):\n{}", light);
        for (var_type, count) in stats.top_variable_types(10) {
            let _ = writeln!(out, "  {}: {}", var_type, count);
        }
        out.push('\n');
    }

    let _ = writeln!(out, "DETAILS BY MODULE:\n{}", light);
    for result in results {
        let _ = writeln!(out, "\n  Module: {}", result.module_name);
        let _ = writeln!(out, "    Procedures: {}", result.total_procedures());
        let _ = writeln!(out, "    Variables: {}", result.total_variables());
        let _ = writeln!(out, "    Constants: {}", result.total_constants());
        if !result.procedures.is_empty() {
            out.push_str("    Procedures:\n");
            for proc in result.procedures.iter().take(10) {
                let _ = writeln!(
                    out,
                    "      - {} {} {}",
                    proc.scope, proc.procedure_type, proc.name
                );
            }
        }
    }

    let _ = writeln!(out, "\n{}", heavy);
    out.push_str(" END OF REPORT\n");
    out.push_str(&heavy);
    out
}

/// One flat inventory row (procedure or variable) for tabular export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryRow {
    pub workbook: String,
    pub module: String,
    pub procedure: String,
    pub procedure_type: String,
    pub scope: String,
    pub declaration: String,
    pub variable_name: String,
    pub variable_type: String,
    pub value: String,
    pub line: usize,
    pub source: String,
}

impl InventoryRow {
    pub const HEADERS: [&'static str; 11] = [
        "Workbook",
        "Module",
        "Procedure",
        "Procedure Type",
        "Scope",
        "Declaration",
        "Variable Name",
        "Variable Type",
        "Value",
        "Line",
        "Source",
    ];

    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.workbook.clone(),
            self.module.clone(),
            self.procedure.clone(),
            self.procedure_type.clone(),
            self.scope.clone(),
            self.declaration.clone(),
            self.variable_name.clone(),
            self.variable_type.clone(),
            self.value.clone(),
            self.line.to_string(),
            self.source.clone(),
        ]
    }
}

/// Flatten analyses into procedure rows followed by variable rows, per module
pub fn inventory_rows(results: &[VbaAnalysis]) -> Vec<InventoryRow> {
    let mut rows = Vec::new();
    for result in results {
        for proc in &result.procedures {
            rows.push(InventoryRow {
                workbook: result.source_file.clone(),
                module: result.module_name.clone(),
                procedure: proc.name.clone(),
                procedure_type: proc.procedure_type.clone(),
                scope: proc.scope.clone(),
                declaration: "Procedure".to_string(),
                variable_name: String::new(),
                variable_type: proc.return_type.clone().unwrap_or_default(),
                value: String::new(),
                line: proc.line,
                source: proc.signature.clone(),
            });
        }
        for var in &result.variables {
            rows.push(InventoryRow {
                workbook: result.source_file.clone(),
                module: result.module_name.clone(),
                procedure: var.procedure_name.clone().unwrap_or_default(),
                procedure_type: String::new(),
                scope: var.scope.clone(),
                declaration: var.declaration.clone(),
                variable_name: var.name.clone(),
                variable_type: var.var_type.clone(),
                value: var.value.clone().unwrap_or_default(),
                line: var.line,
                source: var.source.clone(),
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"Attribute VB_Name = "Calc"
Option Explicit
Option Base 1
Private Declare PtrSafe Function GetTickCount Lib "kernel32" () As Long
Public Const APP_NAME As String = "Calc"
Const MAX_ITEMS = 100
Private mTotal As Double
Dim counter As Long, index As Integer
Public Type Point
    X As Double
    Y As Double
End Type
Private Enum Color
    Red
End Enum

Public Function Add(ByVal a As Double, ByVal b As Double) As Double
    Dim result As Double
    Const FACTOR = 2
    Static calls As Long
    result = a + b
    Add = result
End Function

Sub Reset()
    mTotal = 0
End Sub

private property get Total() as Double
    Total = mTotal
End Property
"#;

    fn sample() -> VbaAnalysis {
        analyze_code(SAMPLE, "Calc", "Book1.xlsm")
    }

    #[test]
    fn test_procedures() {
        let analysis = sample();
        let procs: Vec<(&str, &str, &str, usize)> = analysis
            .procedures
            .iter()
            .map(|p| (p.name.as_str(), p.procedure_type.as_str(), p.scope.as_str(), p.line))
            .collect();
        assert_eq!(
            procs,
            vec![
                ("Add", "Function", "Public", 17),
                ("Reset", "Sub", "Public", 25),
                ("Total", "Property Get", "Private", 29),
            ]
        );
        let add = &analysis.procedures[0];
        assert_eq!(add.parameters, "ByVal a As Double, ByVal b As Double");
        assert_eq!(add.return_type.as_deref(), Some("Double"));
        assert_eq!(
            add.signature,
            "Public Function Add(ByVal a As Double, ByVal b As Double) As Double"
        );
    }

    #[test]
    fn test_variables_and_scopes() {
        let analysis = sample();
        let find = |name: &str| {
            analysis
                .variables
                .iter()
                .find(|v| v.name == name)
                .unwrap_or_else(|| panic!("missing {}", name))
        };

        let m_total = find("mTotal");
        assert_eq!(m_total.scope, "Private");
        assert_eq!(m_total.procedure_name, None);

        assert_eq!(find("counter").scope, "Module");
        assert_eq!(find("index").var_type, "Integer");
        assert_eq!(find("index").line, 8);

        let result = find("result");
        assert_eq!(result.scope, "Local");
        assert_eq!(result.procedure_name.as_deref(), Some("Add"));
        assert_eq!(find("calls").declaration, "Static");
        assert_eq!(find("calls").scope, "Local");
    }

    #[test]
    fn test_declarator_lists() {
        let code = "Dim a, b As Long\nPrivate arr() As String, n As Integer ' note, x\nPrivate WithEvents app As Application\nPublic Sub Go()\nEnd Sub";
        let analysis = analyze_code(code, "M", "");
        let vars: Vec<(&str, &str)> = analysis
            .variables
            .iter()
            .map(|v| (v.name.as_str(), v.var_type.as_str()))
            .collect();
        assert_eq!(
            vars,
            vec![
                ("a", "Long"),
                ("b", "Long"),
                ("arr", "String()"),
                ("n", "Integer"),
                ("app", "Application"),
            ]
        );
    }

    #[test]
    fn test_constants() {
        let analysis = sample();
        let consts: Vec<&VbaVariable> = analysis.variables.iter().filter(|v| v.is_constant()).collect();
        assert_eq!(consts.len(), 3);
        assert_eq!(analysis.total_constants(), 3);

        assert_eq!(consts[0].name, "APP_NAME");
        assert_eq!(consts[0].var_type, "String");
        assert_eq!(consts[0].value.as_deref(), Some("\"Calc\""));
        assert_eq!(consts[0].scope, "Public");

        assert_eq!(consts[1].name, "MAX_ITEMS");
        assert_eq!(consts[1].var_type, "Variant");
        assert_eq!(consts[1].scope, "Public");

        assert_eq!(consts[2].name, "FACTOR");
        assert_eq!(consts[2].scope, "Private");
    }

    #[test]
    fn test_definitions() {
        let analysis = sample();
        let defs: Vec<(DefinitionKind, &str)> = analysis
            .definitions
            .iter()
            .map(|d| (d.kind, d.name.as_str()))
            .collect();
        assert_eq!(
            defs,
            vec![
                (DefinitionKind::Option, "Explicit"),
                (DefinitionKind::Option, "Base 1"),
                (DefinitionKind::ApiDeclaration, "GetTickCount"),
                (DefinitionKind::Type, "Point"),
                (DefinitionKind::Enum, "Color"),
            ]
        );
        assert_eq!(analysis.definitions[2].library.as_deref(), Some("kernel32"));
        assert_eq!(analysis.definitions[2].scope, "Private");
    }

    #[test]
    fn test_statistics() {
        let results = vec![sample(), analyze_code("Sub A()\nEnd Sub", "Other", "Book1.xlsm")];
        let stats = generate_statistics(&results);
        assert_eq!(stats.total_modules, 2);
        assert_eq!(stats.total_procedures, 4);
        assert_eq!(stats.total_constants, 3);
        assert_eq!(stats.procedures_by_type.get("Sub"), Some(&2));
        assert_eq!(stats.procedures_by_scope.get("Private"), Some(&1));
        assert_eq!(stats.variables_by_declaration.get("Dim"), Some(&3));
        assert_eq!(stats.procedures_per_module.get("Book1.xlsm::Other"), Some(&1));
        assert_eq!(stats.top_variable_types(1), vec![("Double", 2)]);
    }

    #[test]
    fn test_same_module_name_in_different_workbooks() {
        let results = vec![
            analyze_code("Sub A()\nEnd Sub\nSub B()\nEnd Sub", "Module1", "Book1.xlsm"),
            analyze_code("Sub C()\nEnd Sub", "Module1", "Book2.xlsm"),
        ];
        let stats = generate_statistics(&results);
        assert_eq!(stats.procedures_per_module.len(), 2);
        assert_eq!(stats.procedures_per_module.get("Book1.xlsm::Module1"), Some(&2));
        assert_eq!(stats.procedures_per_module.get("Book2.xlsm::Module1"), Some(&1));
        assert_eq!(
            stats.procedures_per_module.values().sum::<usize>(),
            stats.total_procedures
        );
    }

    #[test]
    fn test_report_sections() {
        let report = generate_report(&[sample()]);
        assert!(report.contains(" VBA ANALYSIS REPORT"));
        assert!(report.contains("  Procedures: 3"));
        assert!(report.contains("PROCEDURES BY TYPE:"));
        assert!(report.contains("  Property Get: 1"));
        assert!(report.contains("      - Public Function Add"));
        assert!(report.ends_with(&"=".repeat(80)));
    }

    #[test]
    fn test_inventory_rows() {
        let rows = inventory_rows(&[sample()]);
        let analysis = sample();
        assert_eq!(rows.len(), analysis.procedures.len() + analysis.variables.len());
        assert_eq!(rows[0].declaration, "Procedure");
        assert_eq!(rows[0].variable_type, "Double");
        assert_eq!(rows[0].to_cells().len(), InventoryRow::HEADERS.len());
        let last = rows.last().unwrap();
        assert_eq!(last.variable_name, "calls");
        assert_eq!(last.procedure, "Add");
    }

    #[test]
    fn test_analyze_source_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Calc.bas"), SAMPLE).unwrap();
        std::fs::write(dir.path().join("Helper.cls"), "Sub Help()\r\nEnd Sub\r\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "Sub NotVba()").unwrap();

        let files = collect_source_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);

        let calc = analyze_source_file(&files[0]).unwrap();
        assert_eq!(calc.module_name, "Calc");
        let helper = analyze_source_file(&files[1]).unwrap();
        assert_eq!(helper.module_name, "Helper");
        assert_eq!(helper.procedures[0].name, "Help");
        assert_eq!(helper.procedures[0].signature, "Sub Help()");
    }
}
