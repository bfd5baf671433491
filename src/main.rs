use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use humansize::{BINARY, format_size};
use indicatif::{ProgressBar, ProgressStyle};
use mac_cleaner::backup::BackupManager;
use mac_cleaner::cleaner::{CleanOptions, clean_results};
use mac_cleaner::config::{ConfigStore, ConfirmMode};
use mac_cleaner::model::{CATEGORIES, CategoryId, CleanableItem, ScanResult};
use mac_cleaner::orchestrator::{ScanOptions, run_all_scans};
use mac_cleaner::paths;
use mac_cleaner::safety::PathGuard;
use mac_cleaner::scanner::{ScanContext, Scanner, get_all_scanners, scanner_for};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct CleanArgs {
    /// Category id to clean (repeatable)
    #[arg(short, long = "category", required = true)]
    categories: Vec<CategoryId>,
    /// Report what would be removed without touching the disk
    #[arg(long)]
    dry_run: bool,
    /// Move items into a backup session instead of deleting them
    #[arg(long)]
    backup: bool,
    /// Confirm the removal
    #[arg(short, long)]
    yes: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Scan every enabled category and report reclaimable space
    Scan {
        /// Print results as JSON
        #[arg(long)]
        json: bool,
        /// Run scanners one after another
        #[arg(long)]
        sequential: bool,
    },
    /// Remove what a scan finds in the given categories
    Clean(CleanArgs),
    /// List backup sessions
    Backups {
        /// Expire sessions older than the retention window first
        #[arg(long)]
        prune: bool,
    },
    /// Move a backup session's contents back to their original locations
    Restore { session: PathBuf },
    /// Print the effective configuration
    Config,
    /// List known categories
    Categories,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

fn scan(
    home: &Path,
    scanners: &[Box<dyn Scanner>],
    store: &ConfigStore,
    sequential: bool,
) -> Vec<ScanResult> {
    let config = store.get();
    let ctx = ScanContext::new(home, Arc::clone(&config));
    let mut options = ScanOptions::from_config(&config);
    if sequential {
        options.parallel = false;
    }

    let bar = progress_bar(scanners.len());
    let on_progress = |done: usize, _total: usize, category: CategoryId| {
        bar.set_position(done as u64);
        bar.set_message(category.name());
    };
    let results = run_all_scans(scanners, &ctx, options, Some(&on_progress));
    bar.finish_and_clear();
    results
}

fn print_results(results: &[ScanResult]) {
    let mut total = 0;
    for result in results {
        let status = result.error.as_deref().unwrap_or("");
        println!(
            "{:<16} {:<24} {:>12} {:>7} items {status}",
            result.category.as_str(),
            result.category.name(),
            format_size(result.total_size, BINARY),
            result.items.len()
        );
        total += result.total_size;
    }
    println!("Total reclaimable: {}", format_size(total, BINARY));
}

fn run_clean(
    home: &Path,
    store: &ConfigStore,
    manager: &BackupManager,
    args: &CleanArgs,
) -> Result<ExitCode> {
    if !args.dry_run && !args.yes {
        bail!("refusing to delete without --yes (use --dry-run to preview)");
    }

    let config = store.get();
    let scanners: Vec<Box<dyn Scanner>> = args
        .categories
        .iter()
        .filter_map(|&category| {
            let scanner = scanner_for(category, home, &config);
            if scanner.is_none() {
                eprintln!("{category}: no scanner available, skipping");
            }
            scanner
        })
        .collect();
    let results = scan(home, &scanners, store, false);

    let policy = config.confirmation_policy();
    for result in &results {
        if policy.mode(result.category) == ConfirmMode::PerItem {
            println!("{} ({}):", result.category.name(), result.category.safety().as_str());
            for item in &result.items {
                println!("  {:>12}  {}", format_size(item.size, BINARY), item.path.display());
            }
        }
    }

    let use_backup = args.backup || config.backup_enabled;
    let guard = PathGuard::new(home);
    let options = CleanOptions {
        dry_run: args.dry_run,
        backup: use_backup.then_some(manager),
    };

    let total_items: usize = results.iter().map(|r| r.items.len()).sum();
    let bar = progress_bar(total_items);
    let done = std::cell::Cell::new(0u64);
    let on_item = |_: usize, _: usize, item: &CleanableItem| {
        done.set(done.get() + 1);
        bar.set_position(done.get());
        bar.set_message(item.name.clone());
    };
    let cleaned = clean_results(&guard, &results, options, Some(&on_item));
    bar.finish_and_clear();

    let verb = if args.dry_run { "Would free" } else { "Freed" };
    let mut failures = 0;
    for result in &cleaned {
        let name = result.category.map_or("", CategoryId::name);
        println!(
            "{name:<24} {verb} {:>12} ({} items)",
            format_size(result.freed_space, BINARY),
            result.cleaned_items
        );
        for error in &result.errors {
            eprintln!("  {error}");
        }
        failures += result.errors.len();
    }
    if use_backup && !args.dry_run {
        println!("Backups kept under {}", manager.root().display());
    }

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging();

    let home = paths::resolve_home().context("Home directory not found")?;
    let store = ConfigStore::new(&home);
    let config = store.get();
    let manager = BackupManager::new(&home, config.backup_retention_days);
    if config.backup_enabled {
        manager.clean_old_backups();
    }

    match cli.command {
        Command::Scan { json, sequential } => {
            let scanners = get_all_scanners(&home, &config);
            let results = scan(&home, &scanners, &store, sequential);
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_results(&results);
            }
        }
        Command::Clean(args) => return run_clean(&home, &store, &manager, &args),
        Command::Backups { prune } => {
            if prune {
                println!("Expired {} session(s)", manager.clean_old_backups());
            }
            for info in manager.list_backups() {
                println!("{:>12}  {}", format_size(info.size, BINARY), info.path.display());
            }
        }
        Command::Restore { session } => {
            let report = manager.restore_backup(&session);
            println!("Restored {} item(s), {} failed", report.success, report.failed);
            for error in &report.errors {
                eprintln!("  {error}");
            }
            if report.failed > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Config => println!("{}", serde_json::to_string_pretty(&*config)?),
        Command::Categories => {
            for descriptor in &CATEGORIES {
                println!(
                    "{:<16} {:<24} {:<8} {}",
                    descriptor.id.as_str(),
                    descriptor.name,
                    descriptor.safety.as_str(),
                    descriptor.note.unwrap_or("")
                );
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
