mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::path::Path;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use media_import_core::history::record_entries;
use media_import_core::{
    ImportHistory, MediaEntry, MediaScanner, ScanMode, ScanResult, ScannerConfig,
    SqliteImportHistory,
};
use progress::CliObserver;
use serde_json::json;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let mut config = match media_import_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    match args.command {
        Some(Commands::Scan {
            directory,
            mode,
            no_recursive,
            list,
            json,
        }) => {
            config.recursive &= !no_recursive;
            if let Err(err) = run_scan(&config, &directory, mode.into(), list, json).await {
                error!("Error: {:#}", err);
            }
        }
        Some(Commands::Import {
            directory,
            mode,
            no_recursive,
        }) => {
            config.recursive &= !no_recursive;
            if let Err(err) = run_import(&config, &directory, mode.into()).await {
                error!("Error: {:#}", err);
            }
        }
        Some(Commands::HistoryCount) => match open_history(&config) {
            Ok(history) => match (history.len(), history.record_count()) {
                (Ok(identities), Ok(records)) => println!(
                    "{} distinct identities in {} import records",
                    identities, records
                ),
                (Err(e), _) | (_, Err(e)) => error!("Error reading history: {}", e),
            },
            Err(e) => error!("Error: {:#}", e),
        },
        Some(Commands::ClearHistory) => {
            match confirm("Delete every import record? Files already imported will look new again") {
                Ok(true) => match open_history(&config) {
                    Ok(history) => match history.clear() {
                        Ok(removed) => println!("{} import records deleted", removed),
                        Err(e) => error!("Error clearing history: {}", e),
                    },
                    Err(e) => error!("Error: {:#}", e),
                },
                _ => {
                    process::exit(0);
                }
            }
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn open_history(config: &ScannerConfig) -> anyhow::Result<Arc<SqliteImportHistory>> {
    let history = SqliteImportHistory::open(&config.history_db_path)
        .with_context(|| format!("opening import history {}", config.history_db_path))?;
    Ok(Arc::new(history))
}

async fn scan(
    config: &ScannerConfig,
    history: Arc<SqliteImportHistory>,
    directory: &Path,
    mode: ScanMode,
) -> anyhow::Result<ScanResult> {
    let scanner = MediaScanner::new(config, history)?;
    scanner.add_observer(Arc::new(CliObserver::new()));
    let result = scanner.scan_directory(directory, mode)?;
    Ok(result.when_final().await)
}

async fn run_scan(
    config: &ScannerConfig,
    directory: &Path,
    mode: ScanMode,
    list: bool,
    as_json: bool,
) -> anyhow::Result<()> {
    let history = open_history(config)?;
    let result = scan(config, history, directory, mode).await?;

    if as_json {
        let entries: Vec<_> = result
            .file_entries()
            .iter()
            .chain(result.duplicate_entries().iter())
            .map(entry_json)
            .collect();
        let report = json!({
            "scan_id": result.id(),
            "mode": result.mode(),
            "canceled": result.is_canceled(),
            "statistics": result.statistics(),
            "entries": entries,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if list {
        for entry in result.file_entries() {
            println!("  {} {}", "NEW".green(), entry.relative_path().display());
        }
        for entry in result.duplicate_entries() {
            println!(
                "  {} {}",
                entry.disposition().to_string().yellow(),
                entry.relative_path().display()
            );
        }
    }

    print_summary(&result);
    Ok(())
}

async fn run_import(config: &ScannerConfig, directory: &Path, mode: ScanMode) -> anyhow::Result<()> {
    let history = open_history(config)?;
    let result = scan(config, Arc::clone(&history), directory, mode).await?;
    print_summary(&result);

    if result.is_canceled() {
        info!("Scan was canceled, nothing recorded");
        return Ok(());
    }

    let recorded = record_entries(history.as_ref(), &result.file_entries())?;
    info!(
        "{} new files recorded, history now holds {} identities",
        format!("{}", recorded).green(),
        format!("{}", history.len()?).cyan(),
    );
    Ok(())
}

fn entry_json(entry: &MediaEntry) -> serde_json::Value {
    json!({
        "path": entry.path(),
        "size": entry.size(),
        "identity": entry.identity(),
        "disposition": entry.disposition(),
    })
}

fn print_summary(result: &ScanResult) {
    let stats = result.statistics();
    println!();
    info!(
        "Scan {} {} in {}",
        result.id(),
        if result.is_canceled() { "canceled" } else { "finished" },
        format!("{:.2}s", stats.scan_duration_ms as f64 / 1000.0).green(),
    );
    info!(
        "{} new files ({} bytes), {} duplicates, {} unreadable",
        format!("{}", stats.new_file_count).green(),
        format!("{}", stats.total_size_bytes).green(),
        format!("{}", stats.duplicates.values().sum::<usize>()).yellow(),
        format!("{}", stats.candidates.failed).red(),
    );
    for (disposition, count) in &stats.duplicates {
        info!("  {}: {}", disposition, count);
    }
}

/// Ask a yes/no question on stdout. Anything but an explicit yes declines.
fn confirm(question: &str) -> io::Result<bool> {
    print!("{} [y/N]: ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
