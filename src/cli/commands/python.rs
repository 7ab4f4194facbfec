//! Python Command
//!
//! Usage:
//!   codextract python <dir> [--no-recursive] [--pattern REGEX] [--exclude DIR]...
//!                           [--report FILE] [--format F]

use std::path::PathBuf;

use crate::cli::CommandContext;
use crate::export::{ExportFormat, ToReport};
use crate::python::{DirectoryOptions, PythonAnalyzer, generate_summary};
use crate::types::Result;

pub struct PythonArgs {
    pub dir: PathBuf,
    pub no_recursive: bool,
    pub pattern: Option<String>,
    pub exclude: Vec<String>,
    pub report: Option<PathBuf>,
    pub format: Option<ExportFormat>,
}

impl PythonArgs {
    fn options(&self, ctx: &CommandContext) -> DirectoryOptions {
        let mut options = DirectoryOptions::from(&ctx.config.python_analyzer);
        if self.no_recursive {
            options.include_subdirs = false;
        }
        options.pattern = self.pattern.clone();
        options.exclude_dirs.extend(self.exclude.iter().cloned());
        options
    }
}

pub async fn run(ctx: &CommandContext, args: PythonArgs) -> Result<()> {
    let options = args.options(ctx);
    let analyzer = PythonAnalyzer::new(ctx.config.python_analyzer.max_workers);
    let analyses = analyzer.analyze_directory(&args.dir, &options).await?;
    let summary = generate_summary(&analyses);

    let out = &ctx.output;
    out.header("Python Analysis");
    out.field("Directory", args.dir.display());
    out.field("Files", summary.total_files);
    out.field("Lines", summary.total_lines);
    out.field("Code lines", summary.total_code_lines);
    out.field("Comment lines", summary.total_comment_lines);
    out.field("Classes", summary.total_classes);
    out.field("Functions", summary.total_functions);
    out.field("Avg lines/file", format!("{:.1}", summary.average_lines_per_file));
    out.field("Documentation", format!("{:.1}%", summary.documentation_ratio));

    if !summary.external_dependencies.is_empty() {
        out.section("External dependencies");
        for dep in &summary.external_dependencies {
            println!("  {}", dep);
        }
    }
    for file in &summary.files_with_errors {
        out.warning(&format!("Could not parse: {}", file));
    }

    if let Some(path) = ctx.report_target(args.report, args.format, "python_analysis") {
        let format = ctx.resolve_format(&path, args.format, ctx.config.python_analyzer.report_format)?;
        ctx.export_report(&analyses.as_slice().to_report()?, &path, Some(format))?;
    }
    Ok(())
}
