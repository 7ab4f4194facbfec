//! VBA source cleanup passes
//!
//! Text-level transformations over a module's source: comment removal,
//! auto-indentation, unused `Dim` renaming, blank-line collapsing and minification.
//! Passes always run in that order; each is optional.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

use crate::config::VbaOptimizerConfig;
use crate::types::{CodexError, Result};
use crate::util::decode_text;

static INDENT_INCREASE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    keyword_patterns(&[
        r"^((Private|Public|Friend)\s+)?(Static\s+)?(Sub|Function|Property\s+(Get|Let|Set))\b",
        r"^If\b.*\bThen$",
        r"^Select\s+Case\b",
        r"^For\b",
        r"^Do\b",
        r"^While\b",
        r"^With\b",
        r"^((Private|Public)\s+)?Type\b",
        r"^((Private|Public)\s+)?Enum\b",
    ])
});

static INDENT_DECREASE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    keyword_patterns(&[
        r"^End\s+(Sub|Function|Property|If|Select|With|Type|Enum)\b",
        r"^Next\b",
        r"^Loop\b",
        r"^Wend\b",
    ])
});

/// Printed one level lower without changing the current level
static INDENT_OUTDENT: LazyLock<Vec<Regex>> =
    LazyLock::new(|| keyword_patterns(&[r"^ElseIf\b", r"^Else\b", r"^Case\b"]));

static DIM_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*Dim\s+(\w+)").unwrap());

static PROCEDURE_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*((Public|Private|Friend)\s+)?(Sub|Function|Property)\b").unwrap()
});

static DIM_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?im)^\s*Dim\s+").unwrap());

fn keyword_patterns(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .unwrap()
        })
        .collect()
}

// =============================================================================
// Options & Results
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationOptions {
    pub remove_comments: bool,
    pub auto_indent: bool,
    pub remove_empty_lines: bool,
    pub rename_unused_vars: bool,
    pub minify: bool,
    pub indent_size: usize,
}

impl Default for OptimizationOptions {
    fn default() -> Self {
        Self {
            remove_comments: false,
            auto_indent: false,
            remove_empty_lines: false,
            rename_unused_vars: false,
            minify: false,
            indent_size: 4,
        }
    }
}

impl From<&VbaOptimizerConfig> for OptimizationOptions {
    fn from(config: &VbaOptimizerConfig) -> Self {
        Self {
            remove_comments: config.remove_comments,
            auto_indent: config.auto_indent,
            remove_empty_lines: config.remove_empty_lines,
            rename_unused_vars: config.rename_unused_vars,
            minify: config.minify,
            indent_size: config.indent_size,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub original_code: String,
    pub optimized_code: String,
    pub modifications: Vec<String>,
    pub original_lines: usize,
    pub optimized_lines: usize,
    pub original_size: usize,
    pub optimized_size: usize,
}

impl OptimizationResult {
    /// Size reduction in percent (0 for empty input)
    pub fn size_reduction(&self) -> f64 {
        percent_reduction(self.original_size, self.optimized_size)
    }

    /// Line reduction in percent (0 for empty input)
    pub fn line_reduction(&self) -> f64 {
        percent_reduction(self.original_lines, self.optimized_lines)
    }
}

fn percent_reduction(before: usize, after: usize) -> f64 {
    if before == 0 {
        return 0.0;
    }
    (before as f64 - after as f64) / before as f64 * 100.0
}

/// Line-level statistics of a piece of VBA code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CodeStatistics {
    pub total_lines: usize,
    pub code_lines: usize,
    pub empty_lines: usize,
    pub comment_lines: usize,
    pub procedures: usize,
    pub variables: usize,
    pub characters: usize,
}

// =============================================================================
// Passes
// =============================================================================

/// Byte offset of the comment starting on this line, if any.
/// `"` toggles string state, so a doubled `""` inside a literal toggles twice.
fn comment_start(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let indent = line.len() - trimmed.len();
    if is_rem_statement(trimmed) {
        return Some(indent);
    }

    let mut in_string = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '\'' if !in_string => return Some(i),
            _ => {}
        }
    }
    None
}

fn is_rem_statement(trimmed: &str) -> bool {
    match (trimmed.get(..3), trimmed.get(3..)) {
        (Some(head), Some(rest)) => {
            head.eq_ignore_ascii_case("rem") && rest.chars().next().is_none_or(char::is_whitespace)
        }
        _ => false,
    }
}

/// Remove comments; whole-line comments disappear with their line.
pub fn remove_comments(code: &str) -> (String, usize) {
    let mut kept = Vec::new();
    let mut removed = 0;

    for line in code.split('\n') {
        match comment_start(line) {
            Some(pos) => {
                removed += 1;
                let rest = line[..pos].trim_end();
                if !rest.is_empty() {
                    kept.push(rest.to_string());
                }
            }
            None => kept.push(line.to_string()),
        }
    }

    (kept.join("\n"), removed)
}

/// Re-indent block structure with `indent_size` spaces per level.
pub fn auto_indent(code: &str, indent_size: usize) -> String {
    let unit = " ".repeat(indent_size);
    let mut level: usize = 0;
    let mut out = Vec::new();

    for line in code.split('\n') {
        let stripped = line.trim();
        if stripped.is_empty() {
            out.push(String::new());
            continue;
        }
        // Block keywords are matched against the code part only
        let code_part = match comment_start(stripped) {
            Some(0) => "",
            Some(pos) => stripped[..pos].trim_end(),
            None => stripped,
        };

        if INDENT_DECREASE.iter().any(|re| re.is_match(code_part)) {
            level = level.saturating_sub(1);
        }

        let print_level = if INDENT_OUTDENT.iter().any(|re| re.is_match(code_part)) {
            level.saturating_sub(1)
        } else {
            level
        };
        out.push(format!("{}{}", unit.repeat(print_level), stripped));

        if INDENT_INCREASE.iter().any(|re| re.is_match(code_part)) {
            level += 1;
        }
    }

    out.join("\n")
}

/// Prefix `unused_` to `Dim` names never referenced on any other line.
pub fn rename_unused_variables(code: &str) -> (String, usize) {
    let lines: Vec<&str> = code.split('\n').collect();

    let mut declared: Vec<String> = Vec::new();
    for line in &lines {
        if let Some(caps) = DIM_NAME_RE.captures(line) {
            let name = caps[1].to_string();
            if !declared.iter().any(|d| d.eq_ignore_ascii_case(&name)) {
                declared.push(name);
            }
        }
    }

    let usage_lines: Vec<&str> = lines
        .iter()
        .filter(|l| !DIM_NAME_RE.is_match(l))
        .copied()
        .collect();

    let mut result = code.to_string();
    let mut renamed = 0;

    for name in declared {
        let escaped = regex::escape(&name);
        let Ok(usage) = Regex::new(&format!(r"(?i)\b{}\b", escaped)) else {
            continue;
        };
        if usage_lines.iter().any(|l| usage.is_match(l)) {
            continue;
        }
        let Ok(declaration) = Regex::new(&format!(r"(?i)\b(Dim\s+){}\b", escaped)) else {
            continue;
        };
        if declaration.is_match(&result) {
            let replacement = format!("${{1}}unused_{}", name);
            result = declaration.replace_all(&result, replacement.as_str()).into_owned();
            renamed += 1;
        }
    }

    (result, renamed)
}

/// Collapse runs of blank lines into one.
pub fn remove_empty_lines(code: &str) -> (String, usize) {
    let mut kept = Vec::new();
    let mut removed = 0;
    let mut prev_empty = false;

    for line in code.split('\n') {
        let empty = line.trim().is_empty();
        if empty && prev_empty {
            removed += 1;
            continue;
        }
        kept.push(line);
        prev_empty = empty;
    }

    (kept.join("\n"), removed)
}

/// Collapse whitespace runs outside string literals
fn minify_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_string = false;

    for c in line.chars() {
        if c == '"' {
            in_string = !in_string;
            out.push(c);
        } else if in_string {
            out.push(c);
        } else if c == ' ' || c == '\t' {
            if !out.ends_with(' ') {
                out.push(' ');
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Drop blank lines, trim every line and collapse inner whitespace.
pub fn minify(code: &str) -> String {
    code.split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(minify_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run the enabled passes in order.
pub fn optimize(code: &str, options: &OptimizationOptions) -> OptimizationResult {
    let mut optimized = code.to_string();
    let mut modifications = Vec::new();

    if options.remove_comments {
        let (out, count) = remove_comments(&optimized);
        optimized = out;
        if count > 0 {
            modifications.push(format!("Removed {} comments", count));
        }
    }

    if options.auto_indent {
        optimized = auto_indent(&optimized, options.indent_size);
        modifications.push("Applied auto-indentation".to_string());
    }

    if options.rename_unused_vars {
        let (out, count) = rename_unused_variables(&optimized);
        optimized = out;
        if count > 0 {
            modifications.push(format!("Renamed {} unused variables", count));
        }
    }

    if options.remove_empty_lines {
        let (out, count) = remove_empty_lines(&optimized);
        optimized = out;
        if count > 0 {
            modifications.push(format!("Removed {} empty lines", count));
        }
    }

    if options.minify {
        optimized = minify(&optimized);
        modifications.push("Minified code".to_string());
    }

    debug!("Optimization applied: {:?}", modifications);

    OptimizationResult {
        original_lines: code.lines().count(),
        original_size: code.chars().count(),
        optimized_lines: optimized.lines().count(),
        optimized_size: optimized.chars().count(),
        original_code: code.to_string(),
        optimized_code: optimized,
        modifications,
    }
}

/// Count total, code, empty and comment lines, procedures, `Dim` statements and characters.
pub fn analyze_code(code: &str) -> CodeStatistics {
    let lines: Vec<&str> = code.split('\n').collect();
    let empty_lines = lines.iter().filter(|l| l.trim().is_empty()).count();
    let comment_lines = lines
        .iter()
        .filter(|l| {
            let t = l.trim();
            t.starts_with('\'') || is_rem_statement(t)
        })
        .count();

    CodeStatistics {
        total_lines: lines.len(),
        code_lines: lines.len() - empty_lines - comment_lines,
        empty_lines,
        comment_lines,
        procedures: PROCEDURE_COUNT_RE.find_iter(code).count(),
        variables: DIM_COUNT_RE.find_iter(code).count(),
        characters: code.chars().count(),
    }
}

// =============================================================================
// Examples
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationKind {
    RemoveComments,
    AutoIndent,
    RemoveEmptyLines,
    RenameUnusedVars,
    Minify,
}

impl OptimizationKind {
    pub const ALL: [OptimizationKind; 5] = [
        Self::RemoveComments,
        Self::AutoIndent,
        Self::RemoveEmptyLines,
        Self::RenameUnusedVars,
        Self::Minify,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::RemoveComments => "comments",
            Self::AutoIndent => "indent",
            Self::RemoveEmptyLines => "empty-lines",
            Self::RenameUnusedVars => "rename",
            Self::Minify => "minify",
        }
    }

    /// Before/after pair demonstrating this pass
    pub fn example(&self) -> (&'static str, &'static str) {
        match self {
            Self::RemoveComments => (
                "' This is a comment\nDim x As Integer ' inline comment\nx = 5",
                "Dim x As Integer\nx = 5",
            ),
            Self::AutoIndent => (
                "Sub Test()\nDim x As Integer\nIf x > 0 Then\nMsgBox \"Positive\"\nEnd If\nEnd Sub",
                "Sub Test()\n    Dim x As Integer\n    If x > 0 Then\n        MsgBox \"Positive\"\n    End If\nEnd Sub",
            ),
            Self::RemoveEmptyLines => (
                "Line 1\n\n\n\nLine 2\n\nLine 3",
                "Line 1\n\nLine 2\n\nLine 3",
            ),
            Self::RenameUnusedVars => (
                "Dim unusedVar As String\nDim usedVar As Integer\nusedVar = 10",
                "Dim unused_unusedVar As String\nDim usedVar As Integer\nusedVar = 10",
            ),
            Self::Minify => (
                "Sub Test()\n    Dim x As Integer\n    x = 5\nEnd Sub",
                "Sub Test()\nDim x As Integer\nx = 5\nEnd Sub",
            ),
        }
    }

    /// Options enabling only this pass
    pub fn options(&self) -> OptimizationOptions {
        let mut options = OptimizationOptions::default();
        match self {
            Self::RemoveComments => options.remove_comments = true,
            Self::AutoIndent => options.auto_indent = true,
            Self::RemoveEmptyLines => options.remove_empty_lines = true,
            Self::RenameUnusedVars => options.rename_unused_vars = true,
            Self::Minify => options.minify = true,
        }
        options
    }
}

impl FromStr for OptimizationKind {
    type Err = CodexError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|k| k.name() == lower)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|k| k.name()).collect();
                CodexError::Config(format!(
                    "Unknown optimization '{}'. Valid values: {}",
                    s,
                    names.join(", ")
                ))
            })
    }
}

// =============================================================================
// File Helper
// =============================================================================

#[derive(Debug, Clone)]
pub struct OptimizedFile {
    pub result: OptimizationResult,
    pub written: PathBuf,
    pub backup: Option<PathBuf>,
}

/// Optimize a source file. Without `output` the input is rewritten in place,
/// after copying it to `<file>.bak` when `create_backup` is set.
pub fn optimize_file(
    input: &Path,
    output: Option<&Path>,
    options: &OptimizationOptions,
    create_backup: bool,
) -> Result<OptimizedFile> {
    if !input.is_file() {
        return Err(CodexError::not_found(input));
    }
    let (code, encoding) = decode_text(&std::fs::read(input)?);
    debug!("Read {} ({})", input.display(), encoding);

    // CRLF in, CRLF out
    let crlf = code.contains("\r\n");
    let normalized = if crlf { code.replace("\r\n", "\n") } else { code };
    let result = optimize(&normalized, options);

    let target = output.unwrap_or(input).to_path_buf();
    let mut backup = None;
    if create_backup && target.exists() {
        let mut name = target.as_os_str().to_owned();
        name.push(".bak");
        let backup_path = PathBuf::from(name);
        std::fs::copy(&target, &backup_path)?;
        backup = Some(backup_path);
    }

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let text = if crlf {
        result.optimized_code.replace('\n', "\r\n")
    } else {
        result.optimized_code.clone()
    };
    std::fs::write(&target, text)?;

    Ok(OptimizedFile {
        result,
        written: target,
        backup,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_examples_hold() {
        for kind in OptimizationKind::ALL {
            let (before, after) = kind.example();
            let result = optimize(before, &kind.options());
            assert_eq!(result.optimized_code, after, "example for {}", kind.name());
        }
    }

    #[test]
    fn test_comment_inside_string_is_kept() {
        let code = "MsgBox \"It's fine\" ' real comment\nx = \"a \"\"quoted\"\" 'word\"";
        let (out, count) = remove_comments(code);
        assert_eq!(out, "MsgBox \"It's fine\"\nx = \"a \"\"quoted\"\" 'word\"");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_rem_and_indented_comments() {
        let code = "Sub A()\n    ' indented note\n    Rem old style\n    x = 1\nEnd Sub";
        let (out, count) = remove_comments(code);
        assert_eq!(out, "Sub A()\n    x = 1\nEnd Sub");
        assert_eq!(count, 2);
        // `Remove` is an identifier, not a Rem statement
        assert_eq!(remove_comments("Remove x").1, 0);
    }

    #[test]
    fn test_auto_indent_blocks() {
        let code = "Private Sub Route(x As Long)\nSelect Case x\nCase 1\nFor i = 1 To 3\nDebug.Print i\nNext i\nCase Else\nIf x > 5 Then ' big\nx = 5\nElse\nx = 0\nEnd If\nEnd Select\nEnd Sub";
        let expected = "Private Sub Route(x As Long)\n    Select Case x\n    Case 1\n        For i = 1 To 3\n            Debug.Print i\n        Next i\n    Case Else\n        If x > 5 Then ' big\n            x = 5\n        Else\n            x = 0\n        End If\n    End Select\nEnd Sub";
        assert_eq!(auto_indent(code, 4), expected);
    }

    #[test]
    fn test_auto_indent_single_line_if_and_types() {
        let code = "Public Type Point\nX As Long\nEnd Type\nIf a Then b = 1\nc = 2";
        assert_eq!(
            auto_indent(code, 2),
            "Public Type Point\n  X As Long\nEnd Type\nIf a Then b = 1\nc = 2"
        );
        // Unbalanced closers never go negative
        assert_eq!(auto_indent("End Sub\nx = 1", 4), "End Sub\nx = 1");
    }

    #[test]
    fn test_rename_is_case_insensitive() {
        let code = "Dim Total As Long\nDim tmp As Long\ntotal = 1";
        let (out, count) = rename_unused_variables(code);
        assert_eq!(out, "Dim Total As Long\nDim unused_tmp As Long\ntotal = 1");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_minify_preserves_strings() {
        assert_eq!(
            minify("  x  =   \"a   b\"  &  y  \n\n\tz\t=\t1"),
            "x = \"a   b\" & y\nz = 1"
        );
    }

    #[test]
    fn test_result_metrics() {
        let options = OptimizationOptions {
            remove_empty_lines: true,
            ..Default::default()
        };
        let result = optimize("a\n\n\n\nb", &options);
        assert_eq!(result.original_lines, 5);
        assert_eq!(result.optimized_lines, 3);
        assert!((result.line_reduction() - 40.0).abs() < 1e-9);
        assert_eq!(result.modifications, vec!["Removed 2 empty lines"]);

        let empty = optimize("", &options);
        assert_eq!(empty.size_reduction(), 0.0);
        assert_eq!(empty.line_reduction(), 0.0);
    }

    #[test]
    fn test_analyze_code() {
        let code = "' header\nOption Explicit\n\nPublic Sub A()\n    Dim x As Long\n    Dim y As Long\nEnd Sub\nFunction B()\nEnd Function";
        let stats = analyze_code(code);
        assert_eq!(stats.total_lines, 9);
        assert_eq!(stats.empty_lines, 1);
        assert_eq!(stats.comment_lines, 1);
        assert_eq!(stats.code_lines, 7);
        assert_eq!(stats.procedures, 2);
        assert_eq!(stats.variables, 2);
        assert_eq!(stats.characters, code.chars().count());
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("indent".parse::<OptimizationKind>().unwrap(), OptimizationKind::AutoIndent);
        assert_eq!(
            "EMPTY_LINES".parse::<OptimizationKind>().unwrap(),
            OptimizationKind::RemoveEmptyLines
        );
        assert!("obfuscate".parse::<OptimizationKind>().is_err());
    }

    #[test]
    fn test_optimize_file_in_place_with_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Module1.bas");
        std::fs::write(&path, "Sub A()\r\n' note\r\nx = 1\r\nEnd Sub\r\n").unwrap();

        let options = OptimizationOptions {
            remove_comments: true,
            auto_indent: true,
            ..Default::default()
        };
        let outcome = optimize_file(&path, None, &options, true).unwrap();

        let backup = outcome.backup.unwrap();
        assert_eq!(backup, dir.path().join("Module1.bas.bak"));
        assert!(std::fs::read_to_string(&backup).unwrap().contains("' note"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Sub A()\r\n    x = 1\r\nEnd Sub\r\n"
        );
    }

    #[test]
    fn test_optimize_file_to_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.bas");
        let output = dir.path().join("out/clean.bas");
        std::fs::write(&input, "x  =  1\n").unwrap();

        let options = OptimizationOptions {
            minify: true,
            ..Default::default()
        };
        let outcome = optimize_file(&input, Some(&output), &options, true).unwrap();
        assert!(outcome.backup.is_none());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "x = 1");
        assert_eq!(std::fs::read_to_string(&input).unwrap(), "x  =  1\n");

        assert!(matches!(
            optimize_file(&dir.path().join("missing.bas"), None, &options, false),
            Err(CodexError::NotFound(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_remove_empty_lines_is_idempotent(code in "[a-z \n]{0,200}") {
            let (once, _) = remove_empty_lines(&code);
            let (twice, removed) = remove_empty_lines(&once);
            prop_assert_eq!(once, twice);
            prop_assert_eq!(removed, 0);
        }

        #[test]
        fn prop_minify_never_grows(code in "[a-zA-Z0-9 \"'\t\n=]{0,200}") {
            prop_assert!(minify(&code).len() <= code.len());
        }

        #[test]
        fn prop_auto_indent_preserves_line_count(code in "(Sub A\\(\\)|End Sub|If x Then|End If|For i|Next|x = 1|\n){0,40}") {
            prop_assert_eq!(auto_indent(&code, 4).split('\n').count(), code.split('\n').count());
        }
    }
}
