//! Core data types shared across the `diskscope` crate.
//!
//! This module is the single home for the scan tree, scan statistics, the
//! insight model, and the error types. Everything here is plain data: the
//! scanner produces it, the insight engine consumes it, and the CLI renders
//! it. The display types derive `serde::Serialize` so they can be emitted as
//! JSON without a separate projection layer.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Whether a scanned node is a file or a directory.
///
/// Symbolic links are recorded as files and never descended into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A regular file (or a symlink, which is treated as one).
    File,
    /// A directory.
    Directory,
}

/// One node in the scanned tree.
///
/// Paths are absolute, forward-slash separated strings. For files,
/// `size_bytes` is the logical size and `disk_usage` the allocated size;
/// for directories both are zero until the size finalizer assigns the sum
/// over all descendants and sorts `children` largest-first by `disk_usage`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanNode {
    /// Absolute path, forward-slash separated.
    pub path: String,
    /// Final path component.
    pub name: String,
    /// File or directory.
    pub kind: NodeKind,
    /// Logical size in bytes.
    pub size_bytes: u64,
    /// Allocated size in bytes. Equals `size_bytes` when the platform
    /// cannot report allocation.
    pub disk_usage: u64,
    /// Child nodes; empty for files.
    pub children: Vec<ScanNode>,
}

impl ScanNode {
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}

/// Monotonic counters accumulated during a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Files recorded.
    pub files: u64,
    /// Directories recorded, including the root.
    pub directories: u64,
    /// Per-entry failures that were counted and skipped.
    pub access_errors: u64,
}

/// Options accepted by the scanner.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Depth ceiling. The root is depth 0; a directory at depth `d` is
    /// descended into iff `max_depth` is `None` or `d < max_depth`.
    pub max_depth: Option<usize>,
}

/// The result of a completed scan: the finalized tree plus statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanSnapshot {
    pub root: ScanNode,
    pub stats: ScanStats,
}

/// Why a scan failed as a whole.
///
/// Per-entry failures never surface here; they are counted in
/// [`ScanStats::access_errors`] and the scan continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanErrorKind {
    /// The root path does not exist.
    NotFound,
    /// The root exists but is not a directory.
    NotDirectory,
    /// The root could not be stat'ed.
    RootStatFailed,
    /// Cancellation was observed before the scan completed.
    Cancelled,
    /// A worker raised an unexpected failure.
    Internal,
}

impl fmt::Display for ScanErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanErrorKind::NotFound => "not found",
            ScanErrorKind::NotDirectory => "not a directory",
            ScanErrorKind::RootStatFailed => "root stat failed",
            ScanErrorKind::Cancelled => "cancelled",
            ScanErrorKind::Internal => "internal error",
        };
        f.write_str(s)
    }
}

/// A fatal scan failure.
#[derive(Debug, Clone, thiserror::Error, Serialize)]
#[error("scan failed at {path}: {message} ({kind})")]
pub struct ScanError {
    pub kind: ScanErrorKind,
    pub path: String,
    pub message: String,
}

impl ScanError {
    pub fn new(kind: ScanErrorKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Classification assigned to a matched node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    Temp,
    Cache,
    BuildArtifact,
}

impl InsightCategory {
    /// All categories, in reporting order.
    pub const ALL: [InsightCategory; 3] = [
        InsightCategory::Temp,
        InsightCategory::Cache,
        InsightCategory::BuildArtifact,
    ];

    /// The wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightCategory::Temp => "temp",
            InsightCategory::Cache => "cache",
            InsightCategory::BuildArtifact => "build_artifact",
        }
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            InsightCategory::Temp => "Temp",
            InsightCategory::Cache => "Cache",
            InsightCategory::BuildArtifact => "Build",
        }
    }

    /// Stable index into per-category arrays.
    pub(crate) fn index(&self) -> usize {
        match self {
            InsightCategory::Temp => 0,
            InsightCategory::Cache => 1,
            InsightCategory::BuildArtifact => 2,
        }
    }

    /// Single-bit mask used for one-rule-per-category dedup in the matcher.
    pub(crate) fn bit(&self) -> u8 {
        1 << self.index()
    }
}

/// One reclaimable-space finding: a node that matched a rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub path: String,
    pub size_bytes: u64,
    pub disk_usage: u64,
    pub kind: NodeKind,
    pub category: InsightCategory,
    /// Name of the rule that matched.
    pub summary: String,
}

/// Exact per-category aggregates over every match seen during traversal,
/// independent of the bounded top-K retention.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryAggregate {
    pub count: u64,
    pub size_bytes: u64,
    pub disk_usage: u64,
    pub paths: BTreeSet<String>,
}

/// The output of insight generation.
///
/// `insights` holds at most `max_insights_per_category` entries per category,
/// sorted by `disk_usage` descending. `by_category` is exact: it reflects
/// every match during traversal, not just the retained top-K.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InsightBundle {
    pub insights: Vec<Insight>,
    pub by_category: BTreeMap<InsightCategory, CategoryAggregate>,
}

impl InsightBundle {
    /// Exact aggregate for one category, zeroed when nothing matched.
    pub fn aggregate(&self, category: InsightCategory) -> CategoryAggregate {
        self.by_category.get(&category).cloned().unwrap_or_default()
    }
}

/// Advisory progress hook: `(current_path, files_so_far, directories_so_far)`.
/// Invoked from worker threads; implementations must tolerate concurrent calls.
pub type ProgressCallback = Arc<dyn Fn(&str, u64, u64) + Send + Sync>;

/// Cooperative cancellation probe polled by the scanner.
pub type CancelCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// The main error type for the `diskscope` crate.
///
/// Consolidates configuration, pattern-compilation, and scan failures so
/// that the CLI and embedders handle one error enum.
#[derive(Debug, thiserror::Error)]
pub enum DiskscopeError {
    /// An I/O error outside the scan itself (config files, output).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A TOML configuration file failed to parse.
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A configuration could not be serialized back to TOML.
    #[error("Configuration serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// A rule pattern fell through to the glob matcher and was invalid.
    #[error("Pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    /// The substring automaton could not be built from the rule set.
    #[error("Ruleset build error: {0}")]
    RulesetBuild(#[from] aho_corasick::BuildError),

    /// JSON serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A scan failed as a whole.
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// A specialized `Result` type using [`DiskscopeError`].
pub type Result<T> = std::result::Result<T, DiskscopeError>;
