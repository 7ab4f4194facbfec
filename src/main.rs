use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use codextract::cli::CommandContext;
use codextract::cli::commands::{self, python::PythonArgs, scan::ScanArgs, vba::*};
use codextract::config::{Config, ConfigLoader};
use codextract::constants::binary::DEFAULT_HEX_PREVIEW_BYTES;
use codextract::export::ExportFormat;
use codextract::vba::ExtractionMethod;

#[derive(Parser)]
#[command(name = "codextract")]
#[command(
    version,
    about = "Extract and analyze VBA macros, Python projects and directory trees"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Extra config file merged after the global and project files
    #[arg(long, short, global = true, env = "CODEXTRACT_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// VBA macro extraction, analysis and cleanup
    Vba {
        #[command(subcommand)]
        action: VbaAction,
    },

    /// Analyze a Python project
    Python {
        #[arg(help = "Project directory")]
        dir: PathBuf,
        #[arg(long, help = "Only analyze the top-level directory")]
        no_recursive: bool,
        #[arg(long, help = "Regex a file name must match")]
        pattern: Option<String>,
        #[arg(long, help = "Additional directory name to skip (repeatable)")]
        exclude: Vec<String>,
        #[arg(long, help = "Write a report to this file")]
        report: Option<PathBuf>,
        #[arg(short = 'f', long, value_parser = parse_format, help = "Report format: json, csv, txt, html, markdown")]
        format: Option<ExportFormat>,
    },

    /// Scan a directory tree
    Scan {
        #[arg(help = "Directory to scan")]
        dir: PathBuf,
        #[arg(long, short, help = "Report output file")]
        output: Option<PathBuf>,
        #[arg(short = 'f', long, value_parser = parse_format, help = "Report format: json, csv, txt, html, markdown")]
        format: Option<ExportFormat>,
        #[arg(long, help = "Do not embed file contents")]
        no_content: bool,
        #[arg(long, help = "Embed hex previews of binary files")]
        include_binary: bool,
        #[arg(long, help = "Largest file whose content is embedded (KiB)")]
        max_size_kb: Option<u64>,
        #[arg(long, help = "Only print the directory tree")]
        tree_only: bool,
    },

    /// Hexadecimal preview of a file
    Hexdump {
        file: PathBuf,
        #[arg(long, short, default_value_t = DEFAULT_HEX_PREVIEW_BYTES, help = "Bytes to show")]
        bytes: usize,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum VbaAction {
    /// Extract VBA modules from an Office file
    Extract {
        file: PathBuf,
        #[arg(long, short, help = "Output directory (default: <file stem>_vba)")]
        output: Option<PathBuf>,
        #[arg(long, value_parser = parse_method, help = "Extraction method: auto, native, olevba")]
        method: Option<ExtractionMethod>,
        #[arg(long, help = "Skip per-module files")]
        no_individual: bool,
        #[arg(long, help = "Skip the concatenated file")]
        no_concat: bool,
        #[arg(long, help = "Write an extraction report to this file")]
        report: Option<PathBuf>,
    },
    /// Procedure and variable inventory
    Analyze {
        #[arg(help = "Office file, .bas/.cls/.frm file or directory of them")]
        path: PathBuf,
        #[arg(long, help = "Write a report to this file")]
        report: Option<PathBuf>,
        #[arg(short = 'f', long, value_parser = parse_format, help = "Report format: json, csv, txt, html, markdown")]
        format: Option<ExportFormat>,
    },
    /// Clean up an exported VBA source file
    Optimize {
        file: PathBuf,
        #[arg(long, short, help = "Output file (default: overwrite input)")]
        output: Option<PathBuf>,
        #[arg(long)]
        remove_comments: bool,
        #[arg(long)]
        auto_indent: bool,
        #[arg(long)]
        remove_empty_lines: bool,
        #[arg(long)]
        rename_unused: bool,
        #[arg(long)]
        minify: bool,
        #[arg(long, help = "Spaces per indentation level (1-16)")]
        indent_size: Option<usize>,
        #[arg(long, help = "Do not keep a .bak copy when overwriting")]
        no_backup: bool,
        #[arg(long, help = "Print before/after code statistics")]
        stats: bool,
    },
    /// Show the before/after example of one optimization
    Example {
        #[arg(help = "comments, indent, empty-lines, rename, minify")]
        kind: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'f', long, default_value = "toml", help = "Output format: toml, json")]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Edit configuration file with $EDITOR
    Edit {
        #[arg(long, short, help = "Edit global config")]
        global: bool,
    },
    /// Write a commented default configuration file
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    s.parse().map_err(|e: codextract::CodexError| e.to_string())
}

fn parse_method(s: &str) -> Result<ExtractionMethod, String> {
    s.parse().map_err(|e: codextract::CodexError| e.to_string())
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mcodextract encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

/// Console layer plus an optional non-ANSI file layer
fn init_logging(cli: &Cli, config: Option<&Config>) -> anyhow::Result<()> {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        config.map(|c| c.logging.level.as_str()).unwrap_or("info")
    };

    let log_file = config
        .map(|c| c.logging.file.trim())
        .filter(|f| !f.is_empty())
        .map(|f| -> anyhow::Result<_> {
            let path = Path::new(f);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Ok(OpenOptions::new().create(true).append(true).open(path)?)
        })
        .transpose()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(log_file.map(|file| fmt::layer().with_ansi(false).with_writer(Arc::new(file))))
        .init();
    Ok(())
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    // Config commands must work even when the merged config is invalid
    let config = match &cli.command {
        Commands::Config { .. } => None,
        _ => Some(ConfigLoader::load(config_path)?),
    };
    init_logging(&cli, config.as_ref())?;
    let ctx = CommandContext::with_config(config.unwrap_or_default());
    let rt = Runtime::new()?;

    match cli.command {
        Commands::Vba { action } => match action {
            VbaAction::Extract {
                file,
                output,
                method,
                no_individual,
                no_concat,
                report,
            } => rt.block_on(extract(
                &ctx,
                ExtractArgs {
                    file,
                    output,
                    method,
                    no_individual,
                    no_concat,
                    report,
                },
            ))?,
            VbaAction::Analyze {
                path,
                report,
                format,
            } => rt.block_on(analyze(
                &ctx,
                AnalyzeArgs {
                    path,
                    report,
                    format,
                },
            ))?,
            VbaAction::Optimize {
                file,
                output,
                remove_comments,
                auto_indent,
                remove_empty_lines,
                rename_unused,
                minify,
                indent_size,
                no_backup,
                stats,
            } => optimize(
                &ctx,
                OptimizeArgs {
                    file,
                    output,
                    remove_comments,
                    auto_indent,
                    remove_empty_lines,
                    rename_unused,
                    minify,
                    indent_size,
                    no_backup,
                    stats,
                },
            )?,
            VbaAction::Example { kind } => example(&ctx, &kind)?,
        },
        Commands::Python {
            dir,
            no_recursive,
            pattern,
            exclude,
            report,
            format,
        } => rt.block_on(commands::python::run(
            &ctx,
            PythonArgs {
                dir,
                no_recursive,
                pattern,
                exclude,
                report,
                format,
            },
        ))?,
        Commands::Scan {
            dir,
            output,
            format,
            no_content,
            include_binary,
            max_size_kb,
            tree_only,
        } => rt.block_on(commands::scan::run(
            &ctx,
            ScanArgs {
                dir,
                output,
                format,
                no_content,
                include_binary,
                max_size_kb,
                tree_only,
            },
        ))?,
        Commands::Hexdump { file, bytes } => commands::hexdump::run(&ctx, &file, bytes)?,
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => commands::config::show(config_path, &format)?,
            ConfigAction::Path => commands::config::path(config_path)?,
            ConfigAction::Edit { global } => commands::config::edit(global)?,
            ConfigAction::Init { global, force } => commands::config::init(global, force)?,
        },
    }

    Ok(())
}
