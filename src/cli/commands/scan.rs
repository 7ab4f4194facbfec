//! Scan Command
//!
//! Usage:
//!   codextract scan <dir> [-o FILE] [--format F] [--no-content] [--include-binary]
//!                         [--max-size-kb N] [--tree-only]

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing::{debug, info};

use crate::cli::CommandContext;
use crate::export::{ExportFormat, ToReport};
use crate::scanner::{FolderScanner, ScanOptions, ScanResult, extension_stats, generate_tree, write_text_report};
use crate::types::{CodexError, Result};
use crate::util::format_size;

pub struct ScanArgs {
    pub dir: PathBuf,
    pub output: Option<PathBuf>,
    pub format: Option<ExportFormat>,
    pub no_content: bool,
    pub include_binary: bool,
    pub max_size_kb: Option<u64>,
    pub tree_only: bool,
}

impl ScanArgs {
    fn options(&self, ctx: &CommandContext) -> Result<ScanOptions> {
        let mut options = ScanOptions::from(&ctx.config.folder_scanner);
        if self.no_content || self.tree_only {
            options.include_content = false;
        }
        if self.include_binary {
            options.include_binary = true;
        }
        if let Some(kb) = self.max_size_kb {
            if kb == 0 {
                return Err(CodexError::Config(
                    "--max-size-kb must be greater than 0".to_string(),
                ));
            }
            options.max_file_size = kb * 1024;
        }
        Ok(options)
    }
}

/// Run the scan on a blocking thread; Ctrl-C stops it with partial results
async fn scan_cancellable(ctx: &CommandContext, dir: &Path, options: ScanOptions) -> Result<ScanResult> {
    let scanner = FolderScanner::new(options).with_progress(|path| debug!("Scanning {}", path));
    let stop = scanner.stop_handle();
    let root = dir.to_path_buf();
    let mut task = tokio::task::spawn_blocking(move || scanner.scan(&root));

    let joined = tokio::select! {
        joined = &mut task => joined,
        _ = tokio::signal::ctrl_c() => {
            ctx.output.warning("Cancelling scan...");
            stop.store(true, Ordering::SeqCst);
            task.await
        }
    };
    joined.map_err(|e| {
        if e.is_cancelled() {
            CodexError::Cancelled
        } else {
            CodexError::Io(std::io::Error::other(e.to_string()))
        }
    })?
}

/// Plain-text reports keep file contents; other formats go through the exporters
fn write_output(
    ctx: &CommandContext,
    result: &ScanResult,
    path: &Path,
    format: ExportFormat,
    include_content: bool,
) -> Result<()> {
    if format != ExportFormat::Txt {
        ctx.export_report(&result.to_report()?, path, Some(format))?;
        return Ok(());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    write_text_report(result, &mut writer, include_content)?;
    writer.flush()?;
    drop(writer);

    let size = std::fs::metadata(path)?.len();
    ctx.output.success(&format!(
        "Report written: {} (txt, {})",
        path.display(),
        format_size(size)
    ));
    ctx.compress(&[path.to_path_buf()])?;
    Ok(())
}

pub async fn run(ctx: &CommandContext, args: ScanArgs) -> Result<()> {
    let options = args.options(ctx)?;
    let include_content = options.include_content;
    let result = scan_cancellable(ctx, &args.dir, options).await?;
    info!(
        "Scanned {} files in {} directories",
        result.total_files, result.total_directories
    );

    let out = &ctx.output;
    if args.tree_only {
        let tree = generate_tree(&result, true);
        match &args.output {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, format!("{}\n", tree))?;
                out.success(&format!("Tree written: {}", path.display()));
            }
            None => out.block(&tree),
        }
        return Ok(());
    }

    out.header("Directory Scan");
    out.field("Root", result.root_path.display());
    out.field("Files", result.total_files);
    out.field("Directories", result.total_directories);
    out.field("Size", format_size(result.total_size));
    out.field("Scan time", format!("{:.2}s", result.scan_time.as_secs_f64()));

    let stats = extension_stats(&result);
    if !stats.is_empty() {
        out.section("Largest extensions");
        for stat in stats.iter().take(10) {
            println!(
                "  {:<16} {:>6} files {:>12}",
                stat.extension,
                stat.count,
                format_size(stat.size)
            );
        }
    }
    if result.cancelled {
        out.warning("Scan cancelled, results are partial");
    }
    for error in &result.errors {
        out.warning(error);
    }

    if let Some(path) = ctx.report_target(args.output, args.format, "directory_scan") {
        let format = ctx.resolve_format(&path, args.format, ctx.config.folder_scanner.output_format)?;
        write_output(ctx, &result, &path, format, include_content)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::scanner::folder::tests::fixture;

    fn args(dir: PathBuf) -> ScanArgs {
        ScanArgs {
            dir,
            output: None,
            format: None,
            no_content: false,
            include_binary: false,
            max_size_kb: None,
            tree_only: false,
        }
    }

    #[test]
    fn test_overrides() {
        let ctx = CommandContext::with_config(Config::default());
        let mut a = args(PathBuf::from("."));
        a.tree_only = true;
        a.include_binary = true;
        a.max_size_kb = Some(2);
        let options = a.options(&ctx).unwrap();
        assert!(!options.include_content);
        assert!(options.include_binary);
        assert_eq!(options.max_file_size, 2048);

        a.max_size_kb = Some(0);
        assert!(a.options(&ctx).is_err());
    }

    #[tokio::test]
    async fn test_text_and_json_reports() {
        let dir = fixture();
        let out = tempfile::TempDir::new().unwrap();
        let ctx = CommandContext::with_config(Config::default());

        let txt = out.path().join("scan.txt");
        let mut a = args(dir.path().to_path_buf());
        a.output = Some(txt.clone());
        run(&ctx, a).await.unwrap();
        let text = std::fs::read_to_string(&txt).unwrap();
        assert!(text.contains("DIRECTORY SCAN REPORT"));
        assert!(text.contains("hello"));

        let json = out.path().join("scan.json");
        let mut a = args(dir.path().to_path_buf());
        a.output = Some(json.clone());
        run(&ctx, a).await.unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(value["total_files"], 4);
    }

    #[tokio::test]
    async fn test_tree_only_to_file() {
        let dir = fixture();
        let out = tempfile::TempDir::new().unwrap();
        let ctx = CommandContext::with_config(Config::default());
        let target = out.path().join("tree.txt");

        let mut a = args(dir.path().to_path_buf());
        a.tree_only = true;
        a.output = Some(target.clone());
        run(&ctx, a).await.unwrap();

        let tree = std::fs::read_to_string(&target).unwrap();
        assert!(tree.starts_with("└── "));
        assert!(tree.contains("main.rs"));
        assert!(!tree.contains("node_modules"));
    }

    #[tokio::test]
    async fn test_missing_root() {
        let ctx = CommandContext::with_config(Config::default());
        let err = run(&ctx, args(PathBuf::from("/nonexistent/codextract-scan")))
            .await
            .unwrap_err();
        assert!(matches!(err, CodexError::NotFound(_)));
    }
}
