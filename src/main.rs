//! # diskscope CLI
//!
//! The command-line front end for the `diskscope` library. It scans the
//! given root, prints a top-level summary, the largest directories and
//! files, and per-category reclaimable-space insights with exact totals.
//!
//! # Exit Codes
//!
//! - `0`: Success.
//! - `1`: An error occurred; the message is printed to stderr.

use clap::Parser;
use colored::*;
use humansize::{format_size, DECIMAL};
use serde::Serialize;
use std::process;

use diskscope::{
    cli::{Cli, Commands},
    filter_insights, top_nodes, AnalysisReport, Analyzer, AppConfig, InsightBundle,
    InsightCategory, NodeKind, Result, ScanDisplay, ScanNode, ScanStats,
};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(command) = &cli.command {
        return handle_command(command.clone(), &cli);
    }

    let mut config = AppConfig::load(cli.config.as_ref())?;
    if let Some(depth) = cli.max_depth {
        config.max_depth = Some(depth);
    }
    if let Some(workers) = cli.workers {
        config.scan_workers = workers.max(1);
    }
    if let Some(top) = cli.top {
        config.top_count = top.max(1);
    }

    let show_progress = !cli.quiet && !cli.json;
    let report = if show_progress {
        let display = ScanDisplay::new();
        let analyzer = Analyzer::new(config.clone()).with_progress(display.callback());
        let report = analyzer.analyze(&cli.path);
        display.finish();
        report?
    } else {
        Analyzer::new(config.clone()).analyze(&cli.path)?
    };

    if cli.json {
        print_json(&report)?;
        return Ok(());
    }

    let categories = if cli.categories.is_empty() {
        InsightCategory::ALL.to_vec()
    } else {
        cli.categories.clone()
    };

    print_summary(&report, config.top_count);
    print_top_nodes(&report.snapshot.root, config.top_count);
    print_insights(
        &report.insights,
        &categories,
        &report.snapshot.root.path,
        config.top_count,
    );
    print_footer(&report.snapshot.stats, &report);

    Ok(())
}

fn handle_command(command: Commands, cli: &Cli) -> Result<()> {
    match command {
        Commands::Init { global } => {
            let config = AppConfig::default();
            let toml = toml::to_string_pretty(&config)?;

            let config_path = if global {
                AppConfig::default_config_path()
            } else {
                std::env::current_dir()?.join(".diskscope.toml")
            };

            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&config_path, toml)?;
            println!("Created configuration file: {}", config_path.display());
        }
        Commands::Config => {
            let config = AppConfig::load(cli.config.as_ref())?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

/// JSON payload: statistics plus the insight bundle. The full tree is left
/// out on purpose; it can run to millions of nodes.
#[derive(Serialize)]
struct JsonReport<'a> {
    root: &'a str,
    stats: &'a ScanStats,
    total_size_bytes: u64,
    total_disk_usage: u64,
    scan_seconds: f64,
    insights: &'a InsightBundle,
}

fn print_json(report: &AnalysisReport) -> Result<()> {
    let payload = JsonReport {
        root: &report.snapshot.root.path,
        stats: &report.snapshot.stats,
        total_size_bytes: report.snapshot.root.size_bytes,
        total_disk_usage: report.snapshot.root.disk_usage,
        scan_seconds: report.scan_duration.as_secs_f64(),
        insights: &report.insights,
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn trim_root<'a>(path: &'a str, root: &str) -> &'a str {
    path.strip_prefix(root)
        .map(|rest| rest.trim_start_matches('/'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(path)
}

fn kind_tag(node: &ScanNode) -> ColoredString {
    if node.is_dir() {
        "DIR ".bright_cyan()
    } else {
        "FILE".dimmed()
    }
}

fn print_summary(report: &AnalysisReport, top: usize) {
    let root = &report.snapshot.root;
    println!();
    println!("{}  {}", "Summary of".bold(), root.path.bright_white());
    println!("{}", "━".repeat(60).bright_black());

    for child in root.children.iter().take(top) {
        println!(
            "  {} {:>10}  {}",
            kind_tag(child),
            format_size(child.disk_usage, DECIMAL).bright_green(),
            trim_root(&child.path, &root.path)
        );
    }
    println!(
        "  {}  {}",
        "Total".bold(),
        format_size(root.disk_usage, DECIMAL).bright_green().bold()
    );
}

fn print_top_nodes(root: &ScanNode, top: usize) {
    println!();
    println!("{}", "Largest directories".bold());
    for node in top_nodes(root, top, Some(NodeKind::Directory)) {
        println!(
            "  {:>10}  {}",
            format_size(node.disk_usage, DECIMAL).bright_green(),
            trim_root(&node.path, &root.path)
        );
    }

    println!();
    println!("{}", "Largest files".bold());
    for node in top_nodes(root, top, Some(NodeKind::File)) {
        println!(
            "  {:>10}  {}",
            format_size(node.disk_usage, DECIMAL).bright_green(),
            trim_root(&node.path, &root.path)
        );
    }
}

fn print_insights(
    bundle: &InsightBundle,
    categories: &[InsightCategory],
    root_path: &str,
    top: usize,
) {
    for &category in categories {
        let aggregate = bundle.aggregate(category);
        if aggregate.count == 0 {
            continue;
        }

        println!();
        println!(
            "{}  {} items • {}",
            category.label().bold().yellow(),
            aggregate.count.to_string().bright_white(),
            format_size(aggregate.disk_usage, DECIMAL).bright_green()
        );
        for insight in filter_insights(bundle, &[category]).iter().take(top) {
            println!(
                "  {:>10}  {}  {}",
                format_size(insight.disk_usage, DECIMAL).bright_green(),
                trim_root(&insight.path, root_path),
                format!("({})", insight.summary).dimmed()
            );
        }
    }
}

fn print_footer(stats: &ScanStats, report: &AnalysisReport) {
    let secs = report.scan_duration.as_secs_f64();
    let entries = stats.files + stats.directories;
    let rate = if secs > 0.0 {
        entries as f64 / secs
    } else {
        0.0
    };

    println!();
    println!(
        "{} {} files, {} dirs in {:.2}s ({:.0}/s)",
        "Scanned".dimmed(),
        stats.files.to_string().bright_white(),
        stats.directories.to_string().bright_white(),
        secs,
        rate
    );
    if stats.access_errors > 0 {
        println!(
            "{} {} entries could not be read",
            "⚠".yellow(),
            stats.access_errors.to_string().yellow()
        );
    }
}
