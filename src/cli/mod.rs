//! The command-line interface definition for `diskscope`.
//!
//! Parsed with `clap`. The CLI is a thin consumer of the library: flags map
//! onto [`AppConfig`](crate::config::AppConfig) overrides and display
//! options, and subcommands manage the configuration file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::types::InsightCategory;

/// A high-performance disk usage analyzer.
#[derive(Parser)]
#[command(name = "diskscope")]
#[command(about = "diskscope - find what is eating your disk")]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// The root path to analyze. Defaults to the current directory.
    #[arg(default_value = ".")]
    pub path: String,

    /// Number of rows shown per table.
    #[arg(short = 'n', long = "top")]
    pub top: Option<usize>,

    /// Maximum scan depth; unlimited when omitted.
    #[arg(long = "max-depth")]
    pub max_depth: Option<usize>,

    /// Number of scanner threads.
    #[arg(short = 'w', long = "workers")]
    pub workers: Option<usize>,

    /// Path to a configuration file (`.diskscope.toml`).
    /// When omitted, the current directory and its ancestors are searched.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Restrict insight tables to these categories
    /// (temp, cache, build_artifact). Can be repeated.
    #[arg(long = "category", value_parser = parse_category)]
    pub categories: Vec<InsightCategory>,

    /// Emit the scan statistics and insight bundle as JSON.
    #[arg(long = "json")]
    pub json: bool,

    /// Suppress progress output.
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Write a default configuration file.
    Init {
        /// Write to the global config directory instead of the current one.
        #[arg(long = "global")]
        global: bool,
    },

    /// Print the effective configuration as TOML.
    Config,
}

fn parse_category(value: &str) -> Result<InsightCategory, String> {
    match value {
        "temp" => Ok(InsightCategory::Temp),
        "cache" => Ok(InsightCategory::Cache),
        "build_artifact" | "build" => Ok(InsightCategory::BuildArtifact),
        other => Err(format!(
            "unknown category '{other}' (expected temp, cache, or build_artifact)"
        )),
    }
}
