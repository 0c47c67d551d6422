//! ioc-sweep: indicator-of-compromise sweep agent.
//!
//! This is the main entry point for the CLI application.

use ioc_sweep::core::config::Config;
use ioc_sweep::core::error::{Error, Result};
use ioc_sweep::core::settings::{SettingsProvider, SettingsStore};
use ioc_sweep::core::types::ScanReport;
use ioc_sweep::detection::cache::{HASH_CACHE_FILE, IP_CACHE_FILE, PROCESS_LIST_FILE};
use ioc_sweep::detection::FileIndicatorCache;
use ioc_sweep::scanner::{ReportStore, ScanEngine, ScanService};
use ioc_sweep::ui::cli::{Cli, Commands, OutputFormat, ReportAction, SettingsAction};
use ioc_sweep::ui::report::{render_report, render_report_summary};
use ioc_sweep::utils::logging::{init_logging, LogConfig};
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::debug!("{} error: {:?}", e.category(), e);
            eprintln!("Error: {}", e);
            if let Some(hint) = e.suggestion() {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config = match &cli.config {
        Some(path) => Config::load(path).and_then(|c| c.validate().map(|_| c)),
        None => Ok(Config::load_or_default()),
    };

    let log_config = match (&config, cli.verbose) {
        (_, true) => LogConfig::verbose(),
        (Ok(config), false) => LogConfig::from_config(config),
        (Err(_), false) => LogConfig::default(),
    };
    init_logging(log_config)?;

    log::debug!("ioc-sweep v{}", env!("CARGO_PKG_VERSION"));
    let config = config?;
    log::debug!("Data directory: {}", config.data_dir().display());

    match cli.command {
        Some(Commands::Scan { no_store, workers }) => {
            run_scan(&config, no_store, workers, cli.format).await
        }
        Some(Commands::Reports { action }) => run_reports(&config, action, cli.format),
        Some(Commands::Settings { action }) => run_settings(&config, action),
        Some(Commands::Status) => run_status(&config, cli.format),
        Some(Commands::Info) => run_info(&config),
        None => {
            println!("ioc-sweep - Indicator-of-compromise sweep agent");
            println!();
            println!("Use --help for usage information");
            println!();
            println!("Quick start:");
            println!("  ioc-sweep scan             Run a scan and store the report");
            println!("  ioc-sweep reports list     View recent reports");
            println!("  ioc-sweep settings show    View scan settings");
            Ok(())
        }
    }
}

/// Run one scan pass.
async fn run_scan(
    config: &Config,
    no_store: bool,
    workers: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let data_dir = config.data_dir();
    let settings: Arc<dyn SettingsProvider> = Arc::new(SettingsStore::in_dir(&data_dir));

    let mut engine = ScanEngine::from_config(config, settings)?;
    if let Some(workers) = workers {
        engine = engine.with_hash_workers(workers);
    }
    let engine = Arc::new(engine);

    let report = if no_store {
        engine.run().await?
    } else {
        let store = Arc::new(ReportStore::open_default(&data_dir)?);
        ScanService::new(engine, store).start_scan().await?
    };

    if report.is_skipped() && format == OutputFormat::Text {
        println!("All checks are disabled in the scan settings; nothing was scanned.");
    }
    print_report(&report, format)
}

fn print_report(report: &ScanReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => print!("{}", render_report(report)),
    }
    Ok(())
}

/// Browse stored reports.
fn run_reports(config: &Config, action: ReportAction, format: OutputFormat) -> Result<()> {
    let store = ReportStore::open_default(&config.data_dir())?;

    match action {
        ReportAction::List { limit } => {
            let reports = store.list(limit)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
                OutputFormat::Text => {
                    if reports.is_empty() {
                        println!("No reports stored.");
                    }
                    for report in &reports {
                        println!("{}", render_report_summary(report));
                    }
                }
            }
        }
        ReportAction::Show { timestamp } => {
            let report = store
                .load(&timestamp)?
                .ok_or(Error::ReportNotFound(timestamp))?;
            print_report(&report, format)?;
        }
        ReportAction::Delete { timestamp } => {
            if !store.delete(&timestamp)? {
                return Err(Error::ReportNotFound(timestamp));
            }
            println!("Deleted report {}.", timestamp);
        }
        ReportAction::Clear { yes } => {
            if !yes && !confirm("Delete all stored reports?")? {
                println!("Aborted.");
                return Ok(());
            }
            let removed = store.clear()?;
            println!("Deleted {} report(s).", removed);
        }
    }

    Ok(())
}

/// Manage scan settings.
fn run_settings(config: &Config, action: SettingsAction) -> Result<()> {
    let store = SettingsStore::in_dir(&config.data_dir());

    match action {
        SettingsAction::Show => {
            println!("{}", serde_json::to_string_pretty(&store.load()?)?);
        }
        SettingsAction::Import { file } => {
            let settings = store.import(&file)?;
            log::info!("Imported settings from {}", file.display());
            println!(
                "Settings imported: {} directories, checks enabled: {:?}",
                settings.scanned_directories.len(),
                settings.enabled_checks()
            );
        }
        SettingsAction::Reset { yes } => {
            if !yes && !confirm("Reset scan settings to defaults?")? {
                println!("Aborted.");
                return Ok(());
            }
            store.reset()?;
            println!("Scan settings reset to defaults.");
        }
        SettingsAction::Path => {
            println!("{}", store.path().display());
        }
    }

    Ok(())
}

/// Show the latest report and indicator cache state.
fn run_status(config: &Config, format: OutputFormat) -> Result<()> {
    let data_dir = config.data_dir();
    let store = ReportStore::open_default(&data_dir)?;
    let latest = store.list(1)?.into_iter().next();
    let cache = FileIndicatorCache::in_data_dir(&data_dir);
    let settings = SettingsStore::in_dir(&data_dir).load()?;

    let cache_files: Vec<(&str, bool)> = [HASH_CACHE_FILE, IP_CACHE_FILE, PROCESS_LIST_FILE]
        .into_iter()
        .map(|name| (name, cache.dir().join(name).is_file()))
        .collect();

    match format {
        OutputFormat::Json => {
            let status = serde_json::json!({
                "stored_reports": store.count()?,
                "latest_report": latest,
                "enabled_checks": settings.enabled_checks(),
                "indicator_cache": cache_files
                    .iter()
                    .map(|(name, present)| (name.to_string(), *present))
                    .collect::<std::collections::BTreeMap<_, _>>(),
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        OutputFormat::Text => {
            println!("Stored Reports:  {}", store.count()?);
            match &latest {
                Some(report) => println!("Latest Report:   {}", render_report_summary(report)),
                None => println!("Latest Report:   (none)"),
            }
            println!("Enabled Checks:  {:?}", settings.enabled_checks());
            println!();
            println!("Indicator Cache ({}):", cache.dir().display());
            for (name, present) in cache_files {
                println!("  {:<16} {}", name, if present { "present" } else { "missing" });
            }
        }
    }

    Ok(())
}

/// Show application information.
fn run_info(config: &Config) -> Result<()> {
    let data_dir = config.data_dir();

    println!("ioc-sweep - Indicator-of-compromise sweep agent");
    println!();
    println!("Version:          {}", env!("CARGO_PKG_VERSION"));
    println!("Config Path:      {}", Config::default_config_path().display());
    println!("Data Directory:   {}", data_dir.display());
    println!("Settings Path:    {}", SettingsStore::in_dir(&data_dir).path().display());
    println!();
    println!("Feeds:");
    println!("  Hash List:      {}", config.feeds.hash_list_url);
    println!("  IP List:        {}", config.feeds.ip_list_url);
    println!("  Timeout:        {} seconds", config.feeds.timeout_secs);
    println!();
    println!("Scan Engine:");
    println!("  Hash Workers:   {}", config.scan.hash_workers);
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
