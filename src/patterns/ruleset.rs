//! The compiled rule set and its single-pass matching loop.
//!
//! Rules from all categories are compiled once per run into two dispatch
//! blocks, one consulted for files and one for directories (`apply_to =
//! both` rules land in both). Within a block, matchers are grouped by kind:
//! an exact basename map, an Aho-Corasick automaton over all `Contains`
//! keys, suffix and prefix lists, and a glob fallback. [`match_all`] walks
//! the phases in a fixed order and reports at most one rule per category.
//!
//! [`match_all`]: CompiledRuleSet::match_all

use aho_corasick::AhoCorasick;
use glob::Pattern;
use std::collections::HashMap;

use super::compiler::{compile_pattern, Matcher, MatcherKind};
use crate::config::PatternRule;
use crate::types::Result;

type RuleId = usize;

/// Fallback matcher for patterns that defy classification.
///
/// Mirrors shell-glob matching against the full path and the basename; a
/// trailing `/**` is stripped for a preliminary attempt so that
/// `**/x/y/**`-style globs also match the `x/y` directory itself.
struct GlobMatcher {
    full: Pattern,
    stripped: Option<Pattern>,
}

impl GlobMatcher {
    fn compile(lowered: &str) -> Result<Self> {
        let stripped = lowered
            .strip_suffix("/**")
            .map(Pattern::new)
            .transpose()?;
        Ok(Self {
            full: Pattern::new(lowered)?,
            stripped,
        })
    }

    fn matches(&self, lpath: &str, lbase: &str) -> bool {
        if let Some(base_pattern) = &self.stripped {
            if base_pattern.matches(lpath) {
                return true;
            }
        }
        self.full.matches(lpath) || self.full.matches(lbase)
    }
}

/// One dispatch block: every matcher applicable to one node kind.
#[derive(Default)]
struct RuleBlock {
    /// Basename -> rules, O(1) lookup.
    exact: HashMap<String, Vec<RuleId>>,
    /// Substring automaton over all `Contains` keys; `None` when the block
    /// has no `Contains` rules.
    ac: Option<AhoCorasick>,
    /// Parallel to the automaton's pattern ids: `(rule, end_only)`.
    /// `end_only` marks the trailing-segment key, which only matches at the
    /// end of the path.
    ac_rules: Vec<(RuleId, bool)>,
    ends_with: Vec<(String, RuleId)>,
    starts_with: Vec<(String, RuleId)>,
    globs: Vec<(GlobMatcher, RuleId)>,
}

#[derive(Default)]
struct BlockBuilder {
    block: RuleBlock,
    contains: Vec<(String, String, RuleId)>,
}

impl BlockBuilder {
    fn add(&mut self, matcher: &Matcher, id: RuleId) -> Result<()> {
        match matcher.kind {
            MatcherKind::Exact => {
                self.block
                    .exact
                    .entry(matcher.value.clone())
                    .or_default()
                    .push(id);
            }
            MatcherKind::Contains => {
                self.contains
                    .push((matcher.value.clone(), matcher.alt.clone(), id));
            }
            MatcherKind::EndsWith => {
                self.block.ends_with.push((matcher.value.clone(), id));
            }
            MatcherKind::StartsWith => {
                self.block.starts_with.push((matcher.value.clone(), id));
            }
            MatcherKind::Glob => {
                self.block
                    .globs
                    .push((GlobMatcher::compile(&matcher.value)?, id));
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<RuleBlock> {
        if !self.contains.is_empty() {
            let mut keys = Vec::with_capacity(self.contains.len() * 2);
            for (value, alt, id) in self.contains {
                keys.push(value);
                self.block.ac_rules.push((id, false));
                keys.push(alt);
                self.block.ac_rules.push((id, true));
            }
            self.block.ac = Some(AhoCorasick::new(&keys)?);
        }
        Ok(self.block)
    }
}

/// All pattern rules from all categories, compiled for single-pass matching.
pub struct CompiledRuleSet {
    /// Rules in declaration order; dispatch structures refer to them by index.
    rules: Vec<PatternRule>,
    for_file: RuleBlock,
    for_dir: RuleBlock,
    /// User-configured path bases, matched on the raw-case path.
    additional: Vec<(String, RuleId)>,
}

impl CompiledRuleSet {
    /// Compiles rule lists (one per category; each rule carries its own
    /// category) plus pre-normalized `(base_path, rule)` pairs for the
    /// additional temp/cache roots.
    ///
    /// # Errors
    ///
    /// Fails when a fallback glob pattern is invalid or the substring
    /// automaton cannot be built.
    pub fn compile(
        categories: &[&[PatternRule]],
        additional_paths: &[(String, PatternRule)],
    ) -> Result<Self> {
        let mut rules = Vec::new();
        let mut file_builder = BlockBuilder::default();
        let mut dir_builder = BlockBuilder::default();

        for rule_list in categories {
            for rule in *rule_list {
                let id = rules.len();
                rules.push(rule.clone());
                for matcher in compile_pattern(&rule.pattern) {
                    if rule.apply_to.permits(false) {
                        file_builder.add(&matcher, id)?;
                    }
                    if rule.apply_to.permits(true) {
                        dir_builder.add(&matcher, id)?;
                    }
                }
            }
        }

        let mut additional = Vec::with_capacity(additional_paths.len());
        for (base, rule) in additional_paths {
            let id = rules.len();
            rules.push(rule.clone());
            additional.push((base.trim_end_matches('/').to_string(), id));
        }

        log::debug!(
            "compiled ruleset: {} rules, {} additional paths",
            rules.len() - additional.len(),
            additional.len()
        );

        Ok(Self {
            rules,
            for_file: file_builder.finish()?,
            for_dir: dir_builder.finish()?,
            additional,
        })
    }

    /// Returns every matched rule for one node, at most one per category.
    ///
    /// `lpath` and `lbase` must be pre-lowercased (ASCII); `raw_path` is the
    /// original-case path consulted only by the additional-path rules.
    /// Phases run in `Exact -> Contains -> EndsWith -> StartsWith -> Glob ->
    /// Additional` order; within a phase, rules fire in declaration order.
    /// The first rule to claim a category wins it.
    pub fn match_all<'a>(
        &'a self,
        lpath: &str,
        lbase: &str,
        is_dir: bool,
        raw_path: &str,
    ) -> Vec<&'a PatternRule> {
        let block = if is_dir { &self.for_dir } else { &self.for_file };
        let mut matched: Vec<&PatternRule> = Vec::new();
        let mut seen: u8 = 0;

        if let Some(hits) = block.exact.get(lbase) {
            for &id in hits {
                self.claim(id, &mut seen, &mut matched);
            }
        }

        if let Some(ac) = &block.ac {
            let mut hits: Vec<RuleId> = Vec::new();
            for mat in ac.find_overlapping_iter(lpath) {
                let (id, end_only) = block.ac_rules[mat.pattern().as_usize()];
                if end_only && mat.end() != lpath.len() {
                    continue;
                }
                hits.push(id);
            }
            // The automaton reports hits in text order; restore declaration
            // order before claiming categories.
            hits.sort_unstable();
            hits.dedup();
            for id in hits {
                self.claim(id, &mut seen, &mut matched);
            }
        }

        for (suffix, id) in &block.ends_with {
            if lbase.ends_with(suffix.as_str()) {
                self.claim(*id, &mut seen, &mut matched);
            }
        }

        for (prefix, id) in &block.starts_with {
            if lbase.starts_with(prefix.as_str()) {
                self.claim(*id, &mut seen, &mut matched);
            }
        }

        for (glob, id) in &block.globs {
            if glob.matches(lpath, lbase) {
                self.claim(*id, &mut seen, &mut matched);
            }
        }

        for (base, id) in &self.additional {
            if !self.rules[*id].apply_to.permits(is_dir) {
                continue;
            }
            let under_base = raw_path
                .strip_prefix(base.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
            if under_base {
                self.claim(*id, &mut seen, &mut matched);
            }
        }

        matched
    }

    fn claim<'a>(&'a self, id: RuleId, seen: &mut u8, matched: &mut Vec<&'a PatternRule>) {
        let rule = &self.rules[id];
        let bit = rule.category.bit();
        if *seen & bit == 0 {
            *seen |= bit;
            matched.push(rule);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApplyTo, PatternRule};
    use crate::types::InsightCategory;

    fn rule(name: &str, pattern: &str) -> PatternRule {
        PatternRule::new(name, pattern, InsightCategory::Temp)
    }

    fn compile(rules: &[PatternRule]) -> CompiledRuleSet {
        CompiledRuleSet::compile(&[rules], &[]).unwrap()
    }

    #[test]
    fn apply_to_file_never_matches_directories() {
        let rs = compile(&[rule("r", "**/*.log").files_only()]);
        assert!(rs.match_all("/a/b/foo.log", "foo.log", true, "/a/b/foo.log").is_empty());
        assert_eq!(rs.match_all("/a/b/foo.log", "foo.log", false, "/a/b/foo.log").len(), 1);
    }

    #[test]
    fn apply_to_dir_never_matches_files() {
        let rs = compile(&[rule("r", "**/*.egg-info").dirs_only()]);
        assert!(rs
            .match_all("/a/foo.egg-info", "foo.egg-info", false, "/a/foo.egg-info")
            .is_empty());
        assert_eq!(
            rs.match_all("/a/foo.egg-info", "foo.egg-info", true, "/a/foo.egg-info")
                .len(),
            1
        );
    }

    #[test]
    fn apply_to_both_matches_files_and_dirs() {
        let rs = compile(&[rule("r", "**/node_modules/**")]);
        for is_dir in [false, true] {
            assert_eq!(
                rs.match_all("/x/node_modules/y", "y", is_dir, "/x/node_modules/y")
                    .len(),
                1
            );
        }
    }

    #[test]
    fn first_match_wins_within_a_category() {
        let rs = compile(&[rule("r1", "**/foo"), rule("r2", "**/foo")]);
        let matched = rs.match_all("/x/foo", "foo", false, "/x/foo");
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "r1");
    }

    #[test]
    fn all_matching_categories_are_returned() {
        let temp = vec![rule("t", "**/foo")];
        let cache = vec![PatternRule::new("c", "**/foo", InsightCategory::Cache)];
        let rs = CompiledRuleSet::compile(&[&temp, &cache], &[]).unwrap();

        let matched = rs.match_all("/x/foo", "foo", false, "/x/foo");
        let cats: Vec<_> = matched.iter().map(|r| r.category).collect();
        assert_eq!(cats, vec![InsightCategory::Temp, InsightCategory::Cache]);
    }

    #[test]
    fn contains_fires_mid_path() {
        let rs = compile(&[rule("r", "**/tmp/**")]);
        assert_eq!(rs.match_all("/a/tmp/b/c", "c", false, "/a/tmp/b/c").len(), 1);
    }

    #[test]
    fn contains_trailing_segment_fires_only_at_path_end() {
        let rs = compile(&[rule("r", "**/tmp/**")]);
        // End-of-path form matches.
        assert_eq!(rs.match_all("/a/tmp", "tmp", true, "/a/tmp").len(), 1);
        // A basename merely starting with the segment does not.
        assert!(rs.match_all("/a/tmp_old", "tmp_old", true, "/a/tmp_old").is_empty());
        // Mid-path still matches via the slash-delimited key.
        assert_eq!(rs.match_all("/a/tmp/b", "b", false, "/a/tmp/b").len(), 1);
    }

    #[test]
    fn exact_matches_on_basename() {
        let rs = compile(&[rule("r", "**/.DS_Store").files_only()]);
        assert_eq!(
            rs.match_all("/a/b/.ds_store", ".ds_store", false, "/a/b/.DS_Store")
                .len(),
            1
        );
        assert!(rs.match_all("/a/b/other", "other", false, "/a/b/other").is_empty());
    }

    #[test]
    fn endswith_and_startswith_match_basenames() {
        let rs = compile(&[
            rule("logs", "**/*.log").files_only(),
            rule("npm", "**/npm-debug.log*").files_only(),
        ]);
        assert_eq!(rs.match_all("/a/b/foo.log", "foo.log", false, "/a/b/foo.log").len(), 1);
        assert_eq!(
            rs.match_all("/a/npm-debug.log.1", "npm-debug.log.1", false, "/a/npm-debug.log.1")
                .len(),
            1
        );
    }

    #[test]
    fn glob_fallback_matches_both_path_and_basename() {
        let rs = compile(&[rule("r", "src/*.py")]);
        assert_eq!(rs.match_all("src/main.py", "main.py", false, "src/main.py").len(), 1);
    }

    #[test]
    fn automaton_absent_without_contains_rules() {
        let rs = compile(&[rule("r", "**/.DS_Store").files_only()]);
        assert!(rs.for_file.ac.is_none());
        assert!(rs.for_dir.ac.is_none());
    }

    #[test]
    fn automaton_present_in_both_blocks_for_both_rules() {
        let rs = compile(&[rule("r", "**/tmp/**")]);
        assert!(rs.for_file.ac.is_some());
        assert!(rs.for_dir.ac.is_some());
    }

    #[test]
    fn brace_expansion_end_to_end() {
        let rs = compile(&[rule("swaps", "**/*.{swp,swo,bak}").files_only()]);
        for base in ["f.swp", "f.swo", "f.bak"] {
            let path = format!("/a/{base}");
            assert_eq!(rs.match_all(&path, base, false, &path).len(), 1, "{base}");
        }
        assert!(rs.match_all("/a/f.py", "f.py", false, "/a/f.py").is_empty());
    }

    #[test]
    fn case_insensitive_when_caller_lowercases() {
        let rs = compile(&[rule("r", "**/node_modules/**")]);
        let raw = "/a/NODE_MODULES/x.js";
        let lowered = raw.to_ascii_lowercase();
        assert_eq!(rs.match_all(&lowered, "x.js", false, raw).len(), 1);
    }

    #[test]
    fn additional_path_matches_exactly_and_by_prefix() {
        let extra = PatternRule::new("extra", "**/*", InsightCategory::Cache);
        let rs = CompiledRuleSet::compile(
            &[],
            &[("/home/user/.cache".to_string(), extra)],
        )
        .unwrap();

        assert_eq!(
            rs.match_all("/home/user/.cache", ".cache", true, "/home/user/.cache").len(),
            1
        );
        assert_eq!(
            rs.match_all(
                "/home/user/.cache/pip/foo",
                "foo",
                false,
                "/home/user/.cache/pip/foo"
            )
            .len(),
            1
        );
        // A sibling whose name shares the prefix is not under the base.
        assert!(rs
            .match_all(
                "/home/user/.cachex/foo",
                "foo",
                false,
                "/home/user/.cacheX/foo"
            )
            .is_empty());
    }

    #[test]
    fn additional_path_respects_apply_to() {
        let extra = PatternRule::new("extra", "**/*", InsightCategory::Cache).dirs_only();
        let rs = CompiledRuleSet::compile(&[], &[("/base".to_string(), extra)]).unwrap();
        assert!(rs.match_all("/base/f", "f", false, "/base/f").is_empty());
        assert_eq!(rs.match_all("/base/d", "d", true, "/base/d").len(), 1);
    }

    #[test]
    fn compilation_is_deterministic() {
        let rules: Vec<PatternRule> = vec![
            rule("a", "**/tmp/**"),
            rule("b", "**/*.log").files_only(),
            rule("c", "**/.cache/pip/**"),
            PatternRule::new("d", "**/target/**", InsightCategory::BuildArtifact),
        ];
        let rs1 = compile(&rules);
        let rs2 = compile(&rules);

        let probes = [
            ("/a/tmp/x", "x", false),
            ("/a/b/app.log", "app.log", false),
            ("/a/.cache/pip/y", "y", true),
            ("/a/target", "target", true),
            ("/a/src/lib.rs", "lib.rs", false),
        ];
        for (lpath, lbase, is_dir) in probes {
            let m1: Vec<_> = rs1
                .match_all(lpath, lbase, is_dir, lpath)
                .iter()
                .map(|r| r.name.clone())
                .collect();
            let m2: Vec<_> = rs2
                .match_all(lpath, lbase, is_dir, lpath)
                .iter()
                .map(|r| r.name.clone())
                .collect();
            assert_eq!(m1, m2);
        }
    }

    #[test]
    fn builtin_catalog_smoke() {
        use crate::config::AppConfig;
        let config = AppConfig::default();
        let rs = CompiledRuleSet::compile(
            &[
                &config.temp_patterns,
                &config.cache_patterns,
                &config.build_artifact_patterns,
            ],
            &[],
        )
        .unwrap();

        let cases: &[(&str, bool, InsightCategory)] = &[
            ("/a/tmp/b", false, InsightCategory::Temp),
            ("/a/b/app.log", false, InsightCategory::Temp),
            ("/a/.DS_Store", false, InsightCategory::Temp),
            ("/a/.cache/pip/foo", false, InsightCategory::Cache),
            ("/a/.cargo/registry/foo", false, InsightCategory::Cache),
            ("/a/node_modules/foo", false, InsightCategory::BuildArtifact),
            ("/a/.venv/lib/foo", false, InsightCategory::BuildArtifact),
            ("/a/target/release/bin", false, InsightCategory::BuildArtifact),
            ("/a/foo.egg-info", true, InsightCategory::BuildArtifact),
        ];
        for (path, is_dir, category) in cases {
            let lpath = path.to_ascii_lowercase();
            let lbase = lpath.rsplit('/').next().unwrap().to_string();
            let matched = rs.match_all(&lpath, &lbase, *is_dir, path);
            assert!(
                matched.iter().any(|r| r.category == *category),
                "{path} should match {category:?}"
            );
        }

        // apply_to = dir keeps the egg-info rule away from files.
        let matched = rs.match_all("/a/foo.egg-info", "foo.egg-info", false, "/a/foo.egg-info");
        assert!(matched.iter().all(|r| r.name != "Python Egg Info"));
    }

    #[test]
    fn permits_covers_all_variants() {
        assert!(ApplyTo::Both.permits(true) && ApplyTo::Both.permits(false));
        assert!(ApplyTo::Dir.permits(true) && !ApplyTo::Dir.permits(false));
        assert!(ApplyTo::File.permits(false) && !ApplyTo::File.permits(true));
    }
}
