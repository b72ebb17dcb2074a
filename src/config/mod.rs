//! Configuration for `diskscope`.
//!
//! Defines the `.diskscope.toml` file format and the rule schema the insight
//! engine consumes. Loading searches the current directory and its ancestors,
//! then the platform config directory, and falls back to the builtin rule
//! catalog in [`defaults`]. All numeric knobs are clamped on load so the rest
//! of the crate can rely on their invariants (`scan_workers ≥ 1`,
//! `max_insights_per_category ≥ 10`).

pub mod defaults;

use crate::types::{InsightCategory, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Which node kinds a rule applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyTo {
    File,
    Dir,
    #[default]
    Both,
}

impl ApplyTo {
    /// Whether a node of the given kind is eligible under this rule.
    pub(crate) fn permits(self, is_dir: bool) -> bool {
        match self {
            ApplyTo::File => !is_dir,
            ApplyTo::Dir => is_dir,
            ApplyTo::Both => true,
        }
    }
}

/// One declarative classification rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRule {
    /// Human label, carried into the insight's `summary`.
    pub name: String,
    /// Path glob in the crate's fixed dialect (see the patterns module).
    pub pattern: String,
    pub category: InsightCategory,
    #[serde(default)]
    pub apply_to: ApplyTo,
    /// When true and the rule matches a directory, the insight engine does
    /// not descend into it.
    #[serde(default)]
    pub stop_recursion: bool,
}

impl PatternRule {
    pub fn new(
        name: impl Into<String>,
        pattern: impl Into<String>,
        category: InsightCategory,
    ) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            category,
            apply_to: ApplyTo::Both,
            stop_recursion: false,
        }
    }

    pub fn files_only(mut self) -> Self {
        self.apply_to = ApplyTo::File;
        self
    }

    pub fn dirs_only(mut self) -> Self {
        self.apply_to = ApplyTo::Dir;
        self
    }

    pub fn stops_recursion(mut self) -> Self {
        self.stop_recursion = true;
        self
    }
}

/// The full application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Extra absolute path bases classified as temp on prefix match.
    pub additional_temp_paths: Vec<String>,
    /// Extra absolute path bases classified as cache on prefix match.
    pub additional_cache_paths: Vec<String>,
    pub temp_patterns: Vec<PatternRule>,
    pub cache_patterns: Vec<PatternRule>,
    pub build_artifact_patterns: Vec<PatternRule>,
    /// Scanner depth ceiling; `None` scans the full tree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    /// Scanner thread count.
    pub scan_workers: usize,
    /// Rows shown per table in the CLI summary.
    pub top_count: usize,
    /// Per-category top-K heap capacity for retained insights.
    pub max_insights_per_category: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        let rules = &defaults::BUILTIN_RULES;
        Self {
            additional_temp_paths: Vec::new(),
            additional_cache_paths: defaults::default_additional_cache_paths(),
            temp_patterns: rules.temp.clone(),
            cache_patterns: rules.cache.clone(),
            build_artifact_patterns: rules.build_artifacts.clone(),
            max_depth: None,
            scan_workers: default_scan_workers(),
            top_count: 15,
            max_insights_per_category: 1000,
        }
    }
}

impl AppConfig {
    /// Loads the configuration.
    ///
    /// Precedence: an explicit `path`, then a `.diskscope.toml` found by
    /// searching upward from the current directory, then the global config
    /// file, then built-in defaults. The result is always normalized.
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = path
            .cloned()
            .or_else(Self::find_config_file)
            .unwrap_or_else(Self::default_config_path);

        let config = if config_path.exists() {
            let contents = fs::read_to_string(&config_path)?;
            toml::from_str(&contents)?
        } else {
            Self::default()
        };
        Ok(config.normalized())
    }

    /// Clamps numeric fields to their documented minimums.
    pub fn normalized(mut self) -> Self {
        self.scan_workers = self.scan_workers.max(1);
        self.top_count = self.top_count.max(1);
        self.max_insights_per_category = self.max_insights_per_category.max(10);
        self
    }

    fn find_config_file() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        for ancestor in current.ancestors() {
            let config = ancestor.join(".diskscope.toml");
            if config.exists() {
                return Some(config);
            }
        }
        None
    }

    /// The global configuration path used when no project file exists.
    pub fn default_config_path() -> PathBuf {
        ProjectDirs::from("com", "diskscope", "diskscope")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".diskscope.toml"))
    }
}

fn default_scan_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
