// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! tidydir: sort a folder into category subfolders by extension
//!
//! Command line front end for the organizer, the move log and the dashboard.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use tidydir::config::AppConfig;
use tidydir::db::{RecordStore, TIMESTAMP_FORMAT};
use tidydir::organizer::{OrganizeRunSummary, Organizer, RunStatus, SourcePolicy};
use tidydir::{report, web, Result, TidyError};

/// tidydir CLI - extension based folder organizer
#[derive(Parser, Debug)]
#[command(name = "tidydir")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "1.0.0")]
#[command(about = "Sort files into category folders and keep a log of every move", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Organize a directory into category folders
    Organize {
        /// Directory to organize
        dir: PathBuf,

        /// Organize the upload directory if DIR does not exist
        #[arg(long)]
        fallback: bool,

        /// Show the planned moves without touching anything
        #[arg(long)]
        dry_run: bool,

        /// Write a PDF report into the directory afterwards
        #[arg(long)]
        report: bool,
    },

    /// Query the move log
    Records {
        #[command(subcommand)]
        action: RecordsCommands,
    },

    /// Write the PDF report for a directory
    Report {
        /// Directory whose moves are reported
        dir: PathBuf,
    },

    /// Serve the web dashboard
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory that receives uploads
        #[arg(short, long)]
        upload_dir: Option<PathBuf>,

        /// Open the dashboard in a browser
        #[arg(long)]
        open: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Initialize a new tidydir project
    Init {
        /// Directory to initialize (default: current)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum RecordsCommands {
    /// List moves, newest first
    List {
        /// Maximum number to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Moves per category
    Summary,

    /// Moves per day
    Daily,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if !cli.quiet {
        info!("tidydir v1.0.0");
    }

    let config = AppConfig::load(&cli.config)?;
    let json = cli.format == "json";

    match cli.command {
        Some(Commands::Organize { dir, fallback, dry_run, report }) => {
            run_organize(config, dir, fallback, dry_run, report, json).await
        }
        Some(Commands::Records { action }) => run_records_command(config, action, json),
        Some(Commands::Report { dir }) => run_report(config, dir),
        Some(Commands::Serve { host, port, upload_dir, open }) => {
            run_serve(config, host, port, upload_dir, open).await
        }
        Some(Commands::Config { action }) => run_config_command(config, action, &cli.config),
        Some(Commands::Init { dir, force }) => run_init(dir, force),
        None => {
            // Default: serve the dashboard
            run_serve(config, None, None, None, false).await
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Organize one directory, or print the plan on a dry run
async fn run_organize(
    config: AppConfig,
    dir: PathBuf,
    fallback: bool,
    dry_run: bool,
    write_report: bool,
    json: bool,
) -> Result<()> {
    let store = RecordStore::from_config(&config)?;
    let mut organizer = Organizer::from_config(&config, Arc::new(store.clone()));
    if fallback {
        organizer = organizer.with_policy(SourcePolicy::FallbackToDefault);
    }

    if dry_run {
        warn!("DRY RUN MODE - files will not be moved");
        let plan = organizer.plan(&dir)?;
        if json {
            return print_json(&plan);
        }
        if plan.is_empty() {
            println!("Nothing to organize in {:?}", dir);
        }
        for planned in &plan {
            let marker = if planned.occupied { "!" } else { "→" };
            println!("  {} {} {:?}", planned.filename, marker, planned.destination);
        }
        return Ok(());
    }

    let summary = tokio::task::spawn_blocking(move || organizer.organize(&dir))
        .await
        .map_err(|e| TidyError::Server(format!("Organizer task failed: {}", e)))??;

    if json {
        print_json(&summary)?;
    } else {
        print_summary(&summary);
    }

    if write_report && summary.status != RunStatus::DirectoryNotFound {
        let path = report::write_pdf_report(&store, &summary.source, &config.report)?;
        if !json {
            println!("Report written to {:?}", path);
        }
    }

    match summary.status {
        RunStatus::DirectoryNotFound => Err(TidyError::DirectoryNotFound(summary.source)),
        _ => Ok(()),
    }
}

fn print_summary(summary: &OrganizeRunSummary) {
    println!("{}", summary.message());
    if summary.total_moved > 0 {
        for (category, count) in summary.per_category.iter().filter(|(_, n)| **n > 0) {
            println!("  {:<12} {}", category, count);
        }
    }
    for failure in &summary.failures {
        println!("  ✗ {}: {}", failure.filename, failure.reason);
    }
}

fn run_records_command(config: AppConfig, action: RecordsCommands, json: bool) -> Result<()> {
    let store = RecordStore::from_config(&config)?;

    match action {
        RecordsCommands::List { limit } => {
            let records = match limit {
                Some(limit) => store.list_recent(limit)?,
                None => store.list_all()?,
            };
            if json {
                return print_json(&records);
            }
            println!("{} of {} moves:", records.len(), store.count()?);
            for stored in &records {
                let r = &stored.record;
                println!(
                    "  {}  {:<10} {} → {}",
                    r.timestamp.format(TIMESTAMP_FORMAT),
                    r.category,
                    r.filename,
                    r.destination_path
                );
            }
        }
        RecordsCommands::Summary => {
            let summary = report::category_summary(&store)?;
            if json {
                return print_json(&summary);
            }
            for count in store.count_by_category()? {
                println!("  {:<12} {}", count.category, count.count);
            }
        }
        RecordsCommands::Daily => {
            let chart = report::chart_data(&store)?;
            if json {
                return print_json(&chart);
            }
            for (day, count) in chart.labels.iter().zip(&chart.counts) {
                println!("  {}  {}", day, count);
            }
        }
    }

    Ok(())
}

fn run_report(config: AppConfig, dir: PathBuf) -> Result<()> {
    if !dir.is_dir() {
        return Err(TidyError::DirectoryNotFound(dir));
    }
    let store = RecordStore::from_config(&config)?;
    let path = report::write_pdf_report(&store, &dir, &config.report)?;
    println!("Report written to {:?}", path);
    Ok(())
}

async fn run_serve(
    mut config: AppConfig,
    host: Option<String>,
    port: Option<u16>,
    upload_dir: Option<PathBuf>,
    open: bool,
) -> Result<()> {
    // Apply CLI overrides
    if let Some(host) = host {
        config.web.host = host;
    }
    if let Some(port) = port {
        config.web.port = port;
    }
    if let Some(dir) = upload_dir {
        config.organizer.upload_dir = dir.to_string_lossy().to_string();
    }

    let store = RecordStore::from_config(&config)?;
    info!("Database: {}", config.database.path);
    info!("Upload directory: {}", config.organizer.upload_dir);

    if open {
        let url = format!("http://{}:{}/dashboard", config.web.host, config.web.port);
        if let Err(e) = open_browser(&url) {
            error!("Failed to open browser: {}", e);
        }
    }

    web::start_server(config, store).await
}

fn open_browser(url: &str) -> std::io::Result<()> {
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd").args(["/c", "start", url]).spawn()?;
    }
    Ok(())
}

fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            print_json(&config)?;
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Upload directory: {}", config.organizer.upload_dir);
            println!("  Categories: {}", config.classification_table().categories().join(", "));
            println!("  Database: {}", config.database.path);
        }
    }

    Ok(())
}

/// Initialize a new tidydir project
fn run_init(dir: Option<PathBuf>, force: bool) -> Result<()> {
    let target = dir.unwrap_or_else(|| PathBuf::from("."));
    let config_path = target.join("config.json");

    if config_path.exists() && !force {
        return Err(TidyError::Config(
            "config.json already exists. Use --force to overwrite".to_string(),
        ));
    }

    let upload_dir = target.join("uploads");
    std::fs::create_dir_all(&upload_dir)?;

    let mut config = AppConfig::default();
    config.organizer.upload_dir = upload_dir.to_string_lossy().to_string();
    config.database.path = target.join("file_records.db").to_string_lossy().to_string();
    config.save(&config_path)?;

    println!("tidydir initialized in {:?}", target);
    println!("\nCreated:");
    println!("  - config.json");
    println!("  - uploads/");
    println!("\nNext steps:");
    println!("  1. Organize a folder: tidydir organize ~/Downloads");
    println!("  2. Open the dashboard: tidydir serve");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["tidydir"]).unwrap();
        assert!(!cli.verbose);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_organize_command() {
        let cli = Cli::try_parse_from([
            "tidydir", "organize", "/tmp/downloads", "--dry-run", "--fallback"
        ]).unwrap();

        match cli.command {
            Some(Commands::Organize { dir, fallback, dry_run, report }) => {
                assert!(dry_run);
                assert!(fallback);
                assert!(!report);
                assert_eq!(dir, PathBuf::from("/tmp/downloads"));
            }
            _ => panic!("Expected Organize command"),
        }
    }

    #[test]
    fn test_cli_records_list_with_format() {
        let cli = Cli::try_parse_from([
            "tidydir", "records", "list", "--limit", "5", "--format", "json"
        ]).unwrap();

        assert_eq!(cli.format, "json");
        match cli.command {
            Some(Commands::Records { action: RecordsCommands::List { limit } }) => {
                assert_eq!(limit, Some(5));
            }
            _ => panic!("Expected Records List command"),
        }
    }

    #[test]
    fn test_cli_serve_overrides() {
        let cli = Cli::try_parse_from([
            "tidydir", "serve", "--port", "8080", "--upload-dir", "/srv/inbox", "--open"
        ]).unwrap();

        match cli.command {
            Some(Commands::Serve { host, port, upload_dir, open }) => {
                assert!(host.is_none());
                assert_eq!(port, Some(8080));
                assert_eq!(upload_dir, Some(PathBuf::from("/srv/inbox")));
                assert!(open);
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["tidydir", "--format", "xml", "records", "summary"]).is_err());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        run_init(Some(dir.path().to_path_buf()), false).unwrap();
        assert!(dir.path().join("uploads").is_dir());

        let config = AppConfig::load(&dir.path().join("config.json")).unwrap();
        assert!(config.organizer.upload_dir.ends_with("uploads"));

        let err = run_init(Some(dir.path().to_path_buf()), false).unwrap_err();
        assert!(matches!(err, TidyError::Config(_)));
        run_init(Some(dir.path().to_path_buf()), true).unwrap();
    }
}
