//! VBA Commands
//!
//! Usage:
//!   codextract vba extract <file> [-o DIR] [--method auto|native|olevba]
//!   codextract vba analyze <path> [--report FILE] [--format F]
//!   codextract vba optimize <file> [-o FILE] [--remove-comments] ...
//!   codextract vba example <kind>

use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::CommandContext;
use crate::export::{ExportFormat, ToReport};
use crate::types::{CodexError, Result};
use crate::util::{format_size, truncate_string};
use crate::vba::analyzer::{analyze_source_file, collect_source_files, is_source_file};
use crate::vba::optimizer::{OptimizationKind, OptimizationOptions, analyze_code, optimize_file};
use crate::vba::{
    ExtractOptions, ExtractionMethod, VbaAnalysis, VbaExtractor, generate_report,
    generate_statistics, is_supported_file,
};

// =============================================================================
// extract
// =============================================================================

pub struct ExtractArgs {
    pub file: PathBuf,
    pub output: Option<PathBuf>,
    pub method: Option<ExtractionMethod>,
    pub no_individual: bool,
    pub no_concat: bool,
    pub report: Option<PathBuf>,
}

/// `<dir>/<stem>_vba` next to the source file
fn default_output_dir(file: &Path) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "macros".to_string());
    file.parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{}_vba", stem))
}

pub async fn extract(ctx: &CommandContext, args: ExtractArgs) -> Result<()> {
    let mut options = ExtractOptions::from(&ctx.config.vba_extractor);
    if let Some(method) = args.method {
        options.method = method;
    }
    if args.no_individual {
        options.create_individual_files = false;
    }
    if args.no_concat {
        options.create_concatenated_file = false;
    }

    let output_dir = args.output.unwrap_or_else(|| default_output_dir(&args.file));
    let writes = options.create_individual_files || options.create_concatenated_file;

    let extractor = VbaExtractor::new(&ctx.config.vba_extractor);
    let available = extractor.available_methods().await;
    info!(
        "Available methods: {}",
        available.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ")
    );
    let report = extractor
        .extract(&args.file, writes.then_some(output_dir.as_path()), &options)
        .await?;

    let out = &ctx.output;
    out.header("VBA Extraction");
    out.field("Source", report.source_file.display());
    out.field("Method", report.method_used);
    out.field("Modules", report.total_modules());
    out.field("Lines", report.total_lines());
    out.field("Elapsed", format!("{:.2}s", report.elapsed.as_secs_f64()));

    out.section("Modules");
    for module in &report.modules {
        println!(
            "  {:<32} {:<10} {:>6} lines",
            truncate_string(&module.name, 32),
            module.kind.label(),
            module.line_count()
        );
    }

    if !report.written_files.is_empty() {
        out.success(&format!(
            "Wrote {} files to {}",
            report.written_files.len(),
            output_dir.display()
        ));
        ctx.compress(&report.written_files)?;
    }

    if let Some(path) = args.report {
        let format = ctx.resolve_format(&path, None, ctx.config.export.default_format)?;
        ctx.export_report(&report.to_report()?, &path, Some(format))?;
    }
    Ok(())
}

// =============================================================================
// analyze
// =============================================================================

pub struct AnalyzeArgs {
    pub path: PathBuf,
    pub report: Option<PathBuf>,
    pub format: Option<ExportFormat>,
}

/// Analyze an Office file, a single exported module, or a directory of modules
async fn collect_analyses(ctx: &CommandContext, path: &Path) -> Result<Vec<VbaAnalysis>> {
    if !path.exists() {
        return Err(CodexError::not_found(path));
    }
    if path.is_dir() {
        let files = collect_source_files(path)?;
        info!("Analyzing {} VBA source files in {}", files.len(), path.display());
        return files.iter().map(|f| analyze_source_file(f)).collect();
    }
    if is_source_file(path) {
        return Ok(vec![analyze_source_file(path)?]);
    }
    if is_supported_file(path) {
        let extractor = VbaExtractor::new(&ctx.config.vba_extractor);
        let options = ExtractOptions {
            create_individual_files: false,
            create_concatenated_file: false,
            ..ExtractOptions::from(&ctx.config.vba_extractor)
        };
        let report = extractor.extract(path, None, &options).await?;
        return Ok(crate::vba::analyzer::analyze_modules(&report.modules));
    }
    Err(CodexError::unsupported(path))
}

pub async fn analyze(ctx: &CommandContext, args: AnalyzeArgs) -> Result<()> {
    let analyses = collect_analyses(ctx, &args.path).await?;
    let stats = generate_statistics(&analyses);

    let out = &ctx.output;
    out.header("VBA Analysis");
    out.field("Modules", stats.total_modules);
    out.field("Procedures", stats.total_procedures);
    out.field("Variables", stats.total_variables);
    out.field("Constants", stats.total_constants);

    if !stats.procedures_by_type.is_empty() {
        out.section("Procedures by type");
        for (kind, count) in &stats.procedures_by_type {
            println!("  {:<16} {}", kind, count);
        }
    }
    let top_types = stats.top_variable_types(10);
    if !top_types.is_empty() {
        out.section("Top variable types");
        for (ty, count) in top_types {
            println!("  {:<16} {}", ty, count);
        }
    }

    if let Some(path) = ctx.report_target(args.report, args.format, "vba_analysis") {
        let format = ctx.resolve_format(&path, args.format, ctx.config.export.default_format)?;
        if format == ExportFormat::Txt {
            write_text(ctx, &path, &generate_report(&analyses))?;
        } else {
            ctx.export_report(&analyses.as_slice().to_report()?, &path, Some(format))?;
        }
    }
    Ok(())
}

/// The analyzer's own text report, with per-module detail
fn write_text(ctx: &CommandContext, path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    ctx.output.success(&format!(
        "Report written: {} (txt, {})",
        path.display(),
        format_size(text.len() as u64)
    ));
    ctx.compress(&[path.to_path_buf()])?;
    Ok(())
}

// =============================================================================
// optimize
// =============================================================================

pub struct OptimizeArgs {
    pub file: PathBuf,
    pub output: Option<PathBuf>,
    pub remove_comments: bool,
    pub auto_indent: bool,
    pub remove_empty_lines: bool,
    pub rename_unused: bool,
    pub minify: bool,
    pub indent_size: Option<usize>,
    pub no_backup: bool,
    pub stats: bool,
}

impl OptimizeArgs {
    fn any_pass(&self) -> bool {
        self.remove_comments
            || self.auto_indent
            || self.remove_empty_lines
            || self.rename_unused
            || self.minify
    }

    /// Explicit pass flags replace the configured selection
    fn options(&self, ctx: &CommandContext) -> Result<OptimizationOptions> {
        let mut options = OptimizationOptions::from(&ctx.config.vba_optimizer);
        if self.any_pass() {
            options.remove_comments = self.remove_comments;
            options.auto_indent = self.auto_indent;
            options.remove_empty_lines = self.remove_empty_lines;
            options.rename_unused_vars = self.rename_unused;
            options.minify = self.minify;
        }
        if let Some(size) = self.indent_size {
            if size == 0 || size > 16 {
                return Err(CodexError::Config(format!(
                    "Indent size must be between 1 and 16, got {}",
                    size
                )));
            }
            options.indent_size = size;
        }
        Ok(options)
    }
}

pub fn optimize(ctx: &CommandContext, args: OptimizeArgs) -> Result<()> {
    let options = args.options(ctx)?;
    let create_backup = ctx.config.vba_optimizer.create_backup && !args.no_backup;
    let optimized = optimize_file(&args.file, args.output.as_deref(), &options, create_backup)?;
    let result = &optimized.result;

    let out = &ctx.output;
    out.header("VBA Optimization");
    if result.modifications.is_empty() {
        out.info("No passes changed the code");
    }
    for message in &result.modifications {
        out.success(message);
    }
    out.field(
        "Lines",
        format!(
            "{} -> {} ({:.1}% reduction)",
            result.original_lines,
            result.optimized_lines,
            result.line_reduction()
        ),
    );
    out.field(
        "Size",
        format!(
            "{} -> {} ({:.1}% reduction)",
            format_size(result.original_size as u64),
            format_size(result.optimized_size as u64),
            result.size_reduction()
        ),
    );
    if let Some(backup) = &optimized.backup {
        out.info(&format!("Backup: {}", backup.display()));
    }
    out.success(&format!("Written: {}", optimized.written.display()));

    if args.stats {
        for (title, code) in [
            ("Before", &result.original_code),
            ("After", &result.optimized_code),
        ] {
            let stats = analyze_code(code);
            out.section(title);
            out.field("Total lines", stats.total_lines);
            out.field("Code lines", stats.code_lines);
            out.field("Empty lines", stats.empty_lines);
            out.field("Comment lines", stats.comment_lines);
            out.field("Procedures", stats.procedures);
            out.field("Variables", stats.variables);
            out.field("Characters", stats.characters);
        }
    }
    Ok(())
}

// =============================================================================
// example
// =============================================================================

pub fn example(ctx: &CommandContext, kind: &str) -> Result<()> {
    let kind: OptimizationKind = kind.parse()?;
    let (before, after) = kind.example();
    ctx.output.section(&format!("{} - before", kind.name()));
    ctx.output.block(before);
    ctx.output.section(&format!("{} - after", kind.name()));
    ctx.output.block(after);
    Ok(())
}
