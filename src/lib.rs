//! # diskscope
//!
//! `diskscope` is a high-performance disk usage analyzer: it measures every
//! file and directory under a root, classifies nodes as temporary files,
//! caches, or build artifacts against a configurable rule set, and surfaces
//! the largest space consumers so you can reclaim space.
//!
//! This library is the core behind the `diskscope` CLI, but can be embedded
//! on its own.
//!
//! # Features
//!
//! - **Parallel Scanning**: a fixed pool of workers drains a shared queue of
//!   pending directories, building a size-annotated tree.
//! - **Compiled Rules**: declarative path globs are compiled once per run
//!   into a dispatch structure that classifies millions of nodes in a single
//!   pass each.
//! - **Bounded Insights**: per-category top-K heaps cap memory while the
//!   per-category totals stay exact.
//! - **Cooperative Cancellation**: a caller-supplied probe stops a scan
//!   cleanly without leaking a partial tree.
//! - **Error Tolerance**: unreadable entries are counted and skipped; the
//!   scan keeps going so partial data is still useful.
//!
//! # Implementation Details
//!
//! An analysis runs in two phases:
//! 1. **Scanning**: a [`Scanner`](engine::Scanner) walks the directory tree
//!    through the filesystem adapter, then a single-threaded finalizer
//!    assigns directory sizes bottom-up and sorts children largest-first.
//! 2. **Insight generation**: a pruning traversal applies the compiled
//!    ruleset to the finalized tree, skipping the interiors of matched
//!    temp/cache regions whose ancestors already aggregate them.
//!
//! # Examples
//!
//! ```no_run
//! use diskscope::{Analyzer, AppConfig};
//!
//! fn run() -> diskscope::Result<()> {
//!     let config = AppConfig::default();
//!     let report = Analyzer::new(config).analyze("~/projects")?;
//!
//!     println!(
//!         "{} files in {:?}",
//!         report.snapshot.stats.files, report.scan_duration
//!     );
//!     for insight in report.insights.insights.iter().take(10) {
//!         println!("{}  {}", insight.path, insight.disk_usage);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod fs;
pub mod patterns;
pub mod tree;
pub mod types;
pub mod utils;

pub use config::{AppConfig, ApplyTo, PatternRule};
pub use engine::{filter_insights, generate_insights, Scanner};
pub use patterns::CompiledRuleSet;
pub use tree::{finalize_sizes, iter_nodes, top_nodes};
pub use types::{
    CancelCheck, CategoryAggregate, DiskscopeError, Insight, InsightBundle, InsightCategory,
    NodeKind, ProgressCallback, Result, ScanError, ScanErrorKind, ScanNode, ScanOptions,
    ScanSnapshot, ScanStats,
};
pub use utils::ScanDisplay;

use std::time::{Duration, Instant};

/// The combined result of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// The finalized tree and scan statistics.
    pub snapshot: ScanSnapshot,
    /// Classified findings with exact per-category totals.
    pub insights: InsightBundle,
    /// Wall-clock duration of the scan phase.
    pub scan_duration: Duration,
}

/// The primary interface for running a full analysis.
///
/// `Analyzer` composes the scanner and the insight engine behind one call.
/// It adds no semantics of its own: embedders needing finer control can use
/// [`engine::Scanner`] and [`engine::generate_insights`] directly.
#[derive(Clone)]
pub struct Analyzer {
    config: AppConfig,
    progress: Option<ProgressCallback>,
    cancel: Option<CancelCheck>,
}

impl Analyzer {
    /// Creates a new `Analyzer` with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            progress: None,
            cancel: None,
        }
    }

    /// Attaches an advisory progress callback, forwarded to the scanner.
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Attaches a cooperative cancellation probe, polled by the scanner.
    pub fn with_cancel_check(mut self, cancel: CancelCheck) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Scans `path` and generates insights over the resulting tree.
    ///
    /// # Errors
    ///
    /// Returns [`DiskscopeError::Scan`] for fatal scan failures (bad root,
    /// cancellation, worker fault) and [`DiskscopeError::Pattern`] when a
    /// configured pattern cannot be compiled.
    pub fn analyze(&self, path: &str) -> Result<AnalysisReport> {
        let mut scanner = Scanner::new(self.config.scan_workers);
        if let Some(progress) = &self.progress {
            scanner = scanner.with_progress(progress.clone());
        }
        if let Some(cancel) = &self.cancel {
            scanner = scanner.with_cancel_check(cancel.clone());
        }

        let options = ScanOptions {
            max_depth: self.config.max_depth,
        };
        let scan_start = Instant::now();
        let snapshot = scanner.scan(path, &options)?;
        let scan_duration = scan_start.elapsed();

        let insights = generate_insights(&snapshot.root, &self.config)?;

        Ok(AnalysisReport {
            snapshot,
            insights,
            scan_duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    /// A fixture-independent config: system temp dirs often live under
    /// paths that the builtin `tmp` rules would swallow whole.
    fn test_config() -> AppConfig {
        AppConfig {
            additional_temp_paths: Vec::new(),
            additional_cache_paths: Vec::new(),
            temp_patterns: vec![
                PatternRule::new("Log Files", "**/*.log", InsightCategory::Temp).files_only(),
            ],
            cache_patterns: vec![PatternRule::new(
                "pip Cache",
                "**/.cache/pip/**",
                InsightCategory::Cache,
            )],
            build_artifact_patterns: vec![PatternRule::new(
                "node_modules",
                "**/node_modules/**",
                InsightCategory::BuildArtifact,
            )
            .stops_recursion()],
            ..AppConfig::default()
        }
    }

    fn fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        temp.child("node_modules/pkg/index.js")
            .write_binary(&[0u8; 2048])
            .unwrap();
        temp.child(".cache/pip/wheel.whl")
            .write_binary(&[0u8; 4096])
            .unwrap();
        temp.child("app.log").write_str("log line").unwrap();
        temp.child("src/main.rs").write_str("fn main() {}").unwrap();
        temp
    }

    #[test]
    fn analyze_scans_and_classifies() {
        let temp = fixture();
        let report = Analyzer::new(test_config())
            .analyze(&temp.path().to_string_lossy())
            .unwrap();

        assert_eq!(report.snapshot.stats.files, 4);
        assert!(report.snapshot.root.size_bytes > 0);

        let categories: Vec<_> = report
            .insights
            .insights
            .iter()
            .map(|i| i.category)
            .collect();
        assert!(categories.contains(&InsightCategory::Temp));
        assert!(categories.contains(&InsightCategory::Cache));
        assert!(categories.contains(&InsightCategory::BuildArtifact));

        // node_modules stops recursion: the directory reports, its files don't.
        assert!(!report
            .insights
            .insights
            .iter()
            .any(|i| i.path.ends_with("index.js")));
    }

    #[test]
    fn analyze_surfaces_scan_errors() {
        let err = Analyzer::new(test_config())
            .analyze("/definitely/not/here")
            .unwrap_err();
        assert!(matches!(
            err,
            DiskscopeError::Scan(ScanError {
                kind: ScanErrorKind::NotFound,
                ..
            })
        ));
    }

    #[test]
    fn analyze_respects_cancellation() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let temp = fixture();
        let flag = Arc::new(AtomicBool::new(true));
        let probe = Arc::clone(&flag);
        let err = Analyzer::new(test_config())
            .with_cancel_check(Arc::new(move || probe.load(Ordering::Relaxed)))
            .analyze(&temp.path().to_string_lossy())
            .unwrap_err();

        assert!(matches!(
            err,
            DiskscopeError::Scan(ScanError {
                kind: ScanErrorKind::Cancelled,
                ..
            })
        ));
    }
}
