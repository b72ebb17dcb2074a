//! Insight generation: a pruning traversal over a finalized scan tree.
//!
//! One pre-order DFS applies the compiled ruleset to every node. Memory is
//! bounded by per-category top-K heaps while the per-category aggregates
//! stay exact: they count every match seen, not just the retained top-K.
//! Descendants of a matched temp or cache directory are skipped outright;
//! the ancestor insight already carries the subtree's aggregate size, so
//! enumerating them would only produce redundant entries.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};

use crate::config::{AppConfig, PatternRule};
use crate::fs::expand_user;
use crate::patterns::CompiledRuleSet;
use crate::types::{
    CategoryAggregate, Insight, InsightBundle, InsightCategory, Result, ScanNode,
};

/// Heap entry ordered by `(disk_usage, path)` so eviction is deterministic.
struct HeapEntry {
    disk_usage: u64,
    insight: Insight,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.disk_usage == other.disk_usage && self.insight.path == other.insight.path
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.disk_usage
            .cmp(&other.disk_usage)
            .then_with(|| self.insight.path.cmp(&other.insight.path))
    }
}

#[derive(Default)]
struct CategoryState {
    /// Bounded min-heap of retained insights.
    heap: BinaryHeap<Reverse<HeapEntry>>,
    /// Largest usage seen per path. Stale heap entries for upgraded paths
    /// are permitted; the final dedup keeps the largest per path.
    best_seen: HashMap<String, u64>,
    aggregate: CategoryAggregate,
}

struct Collector {
    states: [CategoryState; 3],
    capacity: usize,
}

impl Collector {
    fn new(capacity: usize) -> Self {
        Self {
            states: std::array::from_fn(|_| CategoryState::default()),
            capacity,
        }
    }

    fn record(&mut self, insight: Insight) {
        let state = &mut self.states[insight.category.index()];

        state.aggregate.count += 1;
        state.aggregate.size_bytes += insight.size_bytes;
        state.aggregate.disk_usage += insight.disk_usage;
        state.aggregate.paths.insert(insight.path.clone());

        if let Some(&previous) = state.best_seen.get(&insight.path) {
            if insight.disk_usage <= previous {
                return;
            }
        }
        state
            .best_seen
            .insert(insight.path.clone(), insight.disk_usage);

        let entry = HeapEntry {
            disk_usage: insight.disk_usage,
            insight,
        };
        if state.heap.len() < self.capacity {
            state.heap.push(Reverse(entry));
        } else if state
            .heap
            .peek()
            .is_some_and(|Reverse(smallest)| entry > *smallest)
        {
            state.heap.pop();
            state.heap.push(Reverse(entry));
        }
    }

    fn finish(self) -> InsightBundle {
        let mut insights = Vec::new();
        let mut by_category = BTreeMap::new();

        for (index, state) in self.states.into_iter().enumerate() {
            let category = InsightCategory::ALL[index];
            if state.aggregate.count > 0 {
                by_category.insert(category, state.aggregate);
            }
            // Largest-first extraction; dedup by path within the category so
            // stale entries for upgraded paths drop out. Cross-category
            // duplicates are kept so category filters stay exact.
            let mut kept: HashSet<String> = HashSet::new();
            for Reverse(entry) in state.heap.into_sorted_vec() {
                if kept.insert(entry.insight.path.clone()) {
                    insights.push(entry.insight);
                }
            }
        }

        insights.sort_by(|a, b| {
            b.disk_usage
                .cmp(&a.disk_usage)
                .then_with(|| a.path.cmp(&b.path))
        });
        InsightBundle {
            insights,
            by_category,
        }
    }
}

/// Builds the compiled ruleset for a configuration, including the
/// additional temp/cache path rules.
pub fn build_ruleset(config: &AppConfig) -> Result<CompiledRuleSet> {
    let mut additional: Vec<(String, PatternRule)> = Vec::new();
    for (category, sources) in [
        (InsightCategory::Temp, &config.additional_temp_paths),
        (InsightCategory::Cache, &config.additional_cache_paths),
    ] {
        for raw_base in sources {
            let base = expand_user(raw_base).trim_end_matches('/').to_string();
            let rule = PatternRule::new(
                format!("Additional {} path", category.as_str()),
                base.clone(),
                category,
            );
            additional.push((base, rule));
        }
    }

    CompiledRuleSet::compile(
        &[
            &config.temp_patterns,
            &config.cache_patterns,
            &config.build_artifact_patterns,
        ],
        &additional,
    )
}

/// Generates the insight bundle for a finalized tree.
///
/// Pure with respect to the tree: running it twice with the same tree and
/// configuration yields identical bundles.
///
/// # Errors
///
/// Fails only when a configured pattern cannot be compiled.
pub fn generate_insights(root: &ScanNode, config: &AppConfig) -> Result<InsightBundle> {
    let ruleset = build_ruleset(config)?;
    Ok(apply_ruleset(root, &ruleset, config.max_insights_per_category))
}

/// The traversal itself, reusable with a pre-built ruleset.
pub fn apply_ruleset(
    root: &ScanNode,
    ruleset: &CompiledRuleSet,
    max_per_category: usize,
) -> InsightBundle {
    let mut collector = Collector::new(max_per_category);
    let mut stack: Vec<(&ScanNode, bool)> = vec![(root, false)];

    while let Some((node, inside_matched_region)) = stack.pop() {
        if inside_matched_region {
            continue;
        }

        let lpath = node.path.to_ascii_lowercase();
        let lbase = node.name.to_ascii_lowercase();
        let matched = ruleset.match_all(&lpath, &lbase, node.is_dir(), &node.path);

        let mut in_temp_or_cache = false;
        let mut stop_recursion = false;
        for rule in &matched {
            collector.record(insight_for(node, rule));
            if matches!(
                rule.category,
                InsightCategory::Temp | InsightCategory::Cache
            ) {
                in_temp_or_cache = true;
            }
            if rule.stop_recursion {
                stop_recursion = true;
            }
        }

        if node.is_dir() && !stop_recursion {
            // Reversed so a LIFO stack visits children left to right.
            for child in node.children.iter().rev() {
                stack.push((child, in_temp_or_cache));
            }
        }
    }

    collector.finish()
}

fn insight_for(node: &ScanNode, rule: &PatternRule) -> Insight {
    Insight {
        path: node.path.clone(),
        size_bytes: node.size_bytes,
        disk_usage: node.disk_usage,
        kind: node.kind,
        category: rule.category,
        summary: rule.name.clone(),
    }
}

/// Returns the bundle's insights restricted to the given categories.
pub fn filter_insights<'a>(
    bundle: &'a InsightBundle,
    categories: &[InsightCategory],
) -> Vec<&'a Insight> {
    bundle
        .insights
        .iter()
        .filter(|insight| categories.contains(&insight.category))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::finalize_sizes;
    use crate::types::NodeKind;

    fn file(path: &str, size: u64) -> ScanNode {
        ScanNode {
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap().to_string(),
            kind: NodeKind::File,
            size_bytes: size,
            disk_usage: size,
            children: Vec::new(),
        }
    }

    fn dir(path: &str, children: Vec<ScanNode>) -> ScanNode {
        ScanNode {
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap().to_string(),
            kind: NodeKind::Directory,
            size_bytes: 0,
            disk_usage: 0,
            children,
        }
    }

    fn tree_with(children: Vec<ScanNode>) -> ScanNode {
        let mut root = dir("/root", children);
        finalize_sizes(&mut root);
        root
    }

    #[test]
    fn detects_cache_directories() {
        let root = tree_with(vec![dir(
            "/root/.cache",
            vec![dir(
                "/root/.cache/pip",
                vec![file("/root/.cache/pip/wheel.whl", 3 * 1024 * 1024)],
            )],
        )]);

        // Additional cache paths depend on the environment's home directory;
        // drop them so only the pattern rules decide.
        let config = AppConfig {
            additional_cache_paths: Vec::new(),
            ..AppConfig::default()
        };
        let bundle = generate_insights(&root, &config).unwrap();
        assert!(bundle
            .insights
            .iter()
            .any(|i| i.category == InsightCategory::Cache && i.path.contains(".cache/pip")));
    }

    #[test]
    fn detects_temp_files() {
        let root = tree_with(vec![dir(
            "/root/logs",
            vec![file("/root/logs/trace.log", 2 * 1024 * 1024)],
        )]);

        let bundle = generate_insights(&root, &AppConfig::default()).unwrap();
        assert!(bundle
            .insights
            .iter()
            .any(|i| i.category == InsightCategory::Temp && i.path.ends_with("trace.log")));
    }

    #[test]
    fn stop_recursion_yields_one_insight_for_the_directory() {
        let root = tree_with(vec![dir(
            "/root/project",
            vec![dir(
                "/root/project/node_modules",
                vec![
                    file("/root/project/node_modules/a.js", 100),
                    file("/root/project/node_modules/b.js", 100),
                ],
            )],
        )]);

        let bundle = generate_insights(&root, &AppConfig::default()).unwrap();
        let artifacts: Vec<_> = bundle
            .insights
            .iter()
            .filter(|i| i.category == InsightCategory::BuildArtifact)
            .collect();
        assert_eq!(artifacts.len(), 1);
        assert!(artifacts[0].path.ends_with("node_modules"));
        assert_eq!(artifacts[0].size_bytes, 200);
        assert!(!bundle.insights.iter().any(|i| i.path.ends_with(".js")));
    }

    #[test]
    fn descendants_of_temp_regions_are_skipped() {
        let root = tree_with(vec![dir(
            "/root/tmp",
            vec![file("/root/tmp/big.log", 500)],
        )]);

        let bundle = generate_insights(&root, &AppConfig::default()).unwrap();
        assert!(bundle.insights.iter().any(|i| i.path == "/root/tmp"));
        // big.log would match the log rule, but its ancestor already
        // aggregates it.
        assert!(!bundle.insights.iter().any(|i| i.path == "/root/tmp/big.log"));
    }

    #[test]
    fn retained_insights_are_capped_but_aggregates_stay_exact() {
        let files: Vec<ScanNode> = (0..25)
            .map(|i| file(&format!("/root/app_{i:02}.log"), 100 + i as u64))
            .collect();
        let root = tree_with(files);

        let config = AppConfig {
            max_insights_per_category: 10,
            ..AppConfig::default()
        };
        let bundle = generate_insights(&root, &config).unwrap();

        let temp: Vec<_> = bundle
            .insights
            .iter()
            .filter(|i| i.category == InsightCategory::Temp)
            .collect();
        assert_eq!(temp.len(), 10);
        // The 10 largest survive.
        assert!(temp.iter().all(|i| i.size_bytes >= 115));

        let aggregate = bundle.aggregate(InsightCategory::Temp);
        assert_eq!(aggregate.count, 25);
        assert_eq!(aggregate.paths.len(), 25);
        assert_eq!(
            aggregate.size_bytes,
            (0..25u64).map(|i| 100 + i).sum::<u64>()
        );
        assert!(aggregate.count >= temp.len() as u64);
    }

    #[test]
    fn cross_category_matches_are_kept_per_category() {
        let config = AppConfig {
            temp_patterns: vec![PatternRule::new("t", "**/shared", InsightCategory::Temp)],
            cache_patterns: vec![PatternRule::new("c", "**/shared", InsightCategory::Cache)],
            build_artifact_patterns: Vec::new(),
            additional_cache_paths: Vec::new(),
            ..AppConfig::default()
        };
        let root = tree_with(vec![file("/root/shared", 64)]);

        let bundle = generate_insights(&root, &config).unwrap();
        assert_eq!(bundle.insights.len(), 2);
        let cats: Vec<_> = bundle.insights.iter().map(|i| i.category).collect();
        assert!(cats.contains(&InsightCategory::Temp));
        assert!(cats.contains(&InsightCategory::Cache));
        // At most one entry per (path, category).
        assert_eq!(bundle.aggregate(InsightCategory::Temp).count, 1);
    }

    #[test]
    fn insights_are_sorted_by_disk_usage_descending() {
        let root = tree_with(vec![
            file("/root/a.log", 10),
            file("/root/b.log", 300),
            file("/root/c.log", 40),
        ]);

        let bundle = generate_insights(&root, &AppConfig::default()).unwrap();
        let usages: Vec<_> = bundle.insights.iter().map(|i| i.disk_usage).collect();
        let mut sorted = usages.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(usages, sorted);
    }

    #[test]
    fn generation_is_idempotent() {
        let root = tree_with(vec![
            dir("/root/tmp", vec![file("/root/tmp/x", 10)]),
            dir(
                "/root/node_modules",
                vec![file("/root/node_modules/y.js", 20)],
            ),
            file("/root/app.log", 30),
        ]);
        let config = AppConfig::default();

        let first = generate_insights(&root, &config).unwrap();
        let second = generate_insights(&root, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn additional_cache_path_classifies_subtree_root() {
        let config = AppConfig {
            additional_cache_paths: vec!["/root/scratch".to_string()],
            ..AppConfig::default()
        };
        let root = tree_with(vec![dir(
            "/root/scratch",
            vec![file("/root/scratch/blob", 4096)],
        )]);

        let bundle = generate_insights(&root, &config).unwrap();
        let hit = bundle
            .insights
            .iter()
            .find(|i| i.path == "/root/scratch")
            .unwrap();
        assert_eq!(hit.category, InsightCategory::Cache);
        assert_eq!(hit.summary, "Additional cache path");
        // Additional paths mark a temp/cache region, so the descent stops.
        assert!(!bundle.insights.iter().any(|i| i.path.ends_with("blob")));
    }

    #[test]
    fn filter_insights_selects_categories() {
        let root = tree_with(vec![
            dir("/root/tmp", vec![]),
            dir("/root/.npm", vec![file("/root/.npm/pkg", 10)]),
        ]);
        let bundle = generate_insights(&root, &AppConfig::default()).unwrap();

        let cache_only = filter_insights(&bundle, &[InsightCategory::Cache]);
        assert!(!cache_only.is_empty());
        assert!(cache_only
            .iter()
            .all(|i| i.category == InsightCategory::Cache));

        let none = filter_insights(&bundle, &[]);
        assert!(none.is_empty());
    }

    #[test]
    fn empty_tree_produces_empty_bundle() {
        let root = tree_with(vec![]);
        let bundle = generate_insights(&root, &AppConfig::default()).unwrap();
        assert!(bundle.insights.is_empty());
        assert!(bundle.by_category.is_empty());
    }
}
