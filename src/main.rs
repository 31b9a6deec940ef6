//! CLI entry point for `unmht`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use unmht::config::Config;
use unmht::export::{self, ExportSummary};
use unmht::extract::{ExtractOptions, ExtractionResult, Extractor};

#[derive(Parser)]
#[command(
    name = "unmht",
    version,
    about = "Unpack MHT/MHTML web archives",
    long_about = "Unpack MHT/MHTML web archives and saved e-mail messages into a \
                  directory of cross-linked files that opens in any browser."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract an archive into a directory
    Extract {
        /// Archive to extract (.mht, .mhtml, .eml)
        #[arg(value_name = "FILE")]
        path: PathBuf,
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
        /// Keep references as cid: links instead of relinking to files
        #[arg(long)]
        cid: bool,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what an archive contains
    Info {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
        /// List every part
        #[arg(long)]
        parts: bool,
    },
    /// Show or create the configuration file
    Config {
        /// Write a default configuration file
        #[arg(long)]
        init: bool,
        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = unmht::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Extract {
            path,
            output,
            cid,
            json,
        } => cmd_extract(&path, &output, cid, json, &config),
        Commands::Info { path, json, parts } => cmd_info(&path, json, parts, &config),
        Commands::Config { init, show } => cmd_config(init, show, &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = unmht::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, unmht::config::LOG_FILE_NAME);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "unmht", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Read and extract an archive.
fn load(path: &Path, options: ExtractOptions) -> anyhow::Result<ExtractionResult> {
    if !path.exists() {
        return Err(unmht::UnmhtError::FileNotFound(path.to_path_buf()).into());
    }
    let data = std::fs::read(path).map_err(|e| unmht::UnmhtError::io(path, e))?;
    let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let uri = unmht::path::file_uri(&absolute);
    tracing::debug!(uri = %uri, bytes = data.len(), "Extracting");
    Ok(Extractor::new(options).extract(&uri, &data)?)
}

/// Extract an archive into a directory.
fn cmd_extract(
    path: &Path,
    output: &Path,
    cid: bool,
    json: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let mut options = config.extract.clone();
    options.cid_mode |= cid;

    let start = Instant::now();
    let result = load(path, options)?;

    let pb = ProgressBar::new(result.parts.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Writing [{bar:40.cyan/blue}] {pos}/{len} parts")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let summary = export::write_bundle(&result, output, &config.export, &|current, total| {
        pb.set_length(total as u64);
        pb.set_position(current as u64);
    })?;
    pb.finish_and_clear();
    let elapsed = start.elapsed();

    if json {
        print_extract_json(path, output, &result, &summary, elapsed)?;
    } else {
        print_extract_table(path, output, &result, &summary, elapsed);
    }
    Ok(())
}

/// Show the contents of an archive without writing anything.
fn cmd_info(path: &Path, json: bool, parts: bool, config: &Config) -> anyhow::Result<()> {
    let result = load(path, config.extract.clone())?;
    if json {
        print_info_json(path, &result, parts)
    } else {
        print_info_table(path, &result, parts);
        Ok(())
    }
}

fn cmd_config(init: bool, show: bool, config: &Config) -> anyhow::Result<()> {
    if init {
        if let Some(path) = unmht::config::config_file_path() {
            if path.exists() {
                anyhow::bail!("Config file already exists: {}", path.display());
            }
        }
        let path = unmht::config::save_config(&Config::default())?;
        println!("  Wrote default configuration to {}", path.display());
    }

    if show || !init {
        match unmht::config::config_file_path() {
            Some(path) => println!("# {}", path.display()),
            None => println!("# (no configuration directory)"),
        }
        println!("# log: {}", unmht::config::log_file_path(config).display());
        print!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}

fn format_date(result: &ExtractionResult) -> String {
    result
        .date
        .map(|d| d.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Print the extraction summary as a human-readable table.
fn print_extract_table(
    path: &Path,
    output: &Path,
    result: &ExtractionResult,
    summary: &ExportSummary,
    elapsed: std::time::Duration,
) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  {:<20} {}", "Archive", path.display());
    println!("  {:<20} {}", "Subject", result.subject);
    println!("  {:<20} {}", "Date", format_date(result));
    println!("  {:<20} {}", "Parts", result.parts.len());
    println!("  {:<20} {}", "Files written", summary.files);
    println!("  {:<20} {}", "Bytes written", format_size(summary.bytes, BINARY));
    println!("  {:<20} {}", "Output", output.display());
    if let Some(file) = &summary.start_file {
        println!("  {:<20} {}", "Start page", output.join(file).display());
    }
    println!("  {:<20} {:.2?}", "Time", elapsed);
    println!();
}

/// Print the extraction summary as JSON.
fn print_extract_json(
    path: &Path,
    output: &Path,
    result: &ExtractionResult,
    summary: &ExportSummary,
    elapsed: std::time::Duration,
) -> anyhow::Result<()> {
    let out = serde_json::json!({
        "file": path.to_string_lossy(),
        "output": output.to_string_lossy(),
        "subject": result.subject,
        "date": result.date.map(|d| d.to_rfc3339()),
        "part_count": result.parts.len(),
        "start": result.start_part().ref_name,
        "summary": summary,
        "time_ms": elapsed.as_millis(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// Print archive information as a human-readable table.
fn print_info_table(path: &Path, result: &ExtractionResult, parts: bool) {
    use humansize::{format_size, BINARY};

    let start = result.start_part();
    println!();
    println!("  {:<20} {}", "Archive", path.display());
    println!("  {:<20} {}", "Subject", result.subject);
    println!("  {:<20} {}", "Date", format_date(result));
    println!("  {:<20} {} ({})", "Start part", start.path, start.mimetype);
    println!("  {:<20} {}", "Parts", result.parts.len());
    println!("  {:<20} {}", "Total size", format_size(result.size, BINARY));

    if parts {
        println!();
        println!(
            "  {:<10} {:<24} {:<12} {:>10}  {:<30} {}",
            "Path", "Type", "Charset", "Size", "Reference", "Location"
        );
        println!("  {}", "-".repeat(110));
        for p in &result.parts {
            let marker = if p.is_start_part { "*" } else { " " };
            let reference: String = p.ref_name.chars().take(30).collect();
            println!(
                "{marker} {:<10} {:<24} {:<12} {:>10}  {:<30} {}",
                p.path,
                p.mimetype,
                p.charset,
                format_size(p.content.len(), BINARY),
                reference,
                p.location
            );
        }
    }
    println!();
}

/// Print archive information as JSON.
fn print_info_json(path: &Path, result: &ExtractionResult, parts: bool) -> anyhow::Result<()> {
    let mut out = serde_json::json!({
        "file": path.to_string_lossy(),
        "original": result.original,
        "subject": result.subject,
        "date": result.date.map(|d| d.to_rfc3339()),
        "start": result.start_part().path,
        "part_count": result.parts.len(),
        "size": result.size,
    });
    if parts {
        let items: Vec<serde_json::Value> = result
            .parts
            .iter()
            .map(|p| {
                serde_json::json!({
                    "path": p.path,
                    "mimetype": p.mimetype,
                    "charset": p.charset,
                    "size": p.content.len(),
                    "ref_name": p.ref_name,
                    "location": p.location,
                    "leaf_name": p.leaf_name,
                    "is_start": p.is_start_part,
                })
            })
            .collect();
        out["parts"] = serde_json::Value::Array(items);
    }
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
