//! The builtin rule catalog.
//!
//! These rules cover the temp files, tool caches, and build artifacts of the
//! common development toolchains. They are the default rule set when no
//! configuration file overrides them; user config replaces whole category
//! lists rather than merging rule-by-rule.

use super::PatternRule;
use crate::types::InsightCategory;
use once_cell::sync::Lazy;

/// The builtin rules, grouped by category.
pub struct BuiltinRules {
    pub temp: Vec<PatternRule>,
    pub cache: Vec<PatternRule>,
    pub build_artifacts: Vec<PatternRule>,
}

/// Lazily-built catalog shared by every [`AppConfig::default`](super::AppConfig).
pub static BUILTIN_RULES: Lazy<BuiltinRules> = Lazy::new(|| BuiltinRules {
    temp: temp_rules(),
    cache: cache_rules(),
    build_artifacts: build_artifact_rules(),
});

/// Path bases treated as cache regardless of pattern rules. Tilde is
/// expanded when the insight engine builds its ruleset.
pub fn default_additional_cache_paths() -> Vec<String> {
    vec!["~/.cache".to_string()]
}

fn temp(name: &str, pattern: &str) -> PatternRule {
    PatternRule::new(name, pattern, InsightCategory::Temp)
}

fn cache(name: &str, pattern: &str) -> PatternRule {
    PatternRule::new(name, pattern, InsightCategory::Cache)
}

fn artifact(name: &str, pattern: &str) -> PatternRule {
    PatternRule::new(name, pattern, InsightCategory::BuildArtifact).stops_recursion()
}

fn temp_rules() -> Vec<PatternRule> {
    vec![
        temp("System Temp", "**/tmp/**"),
        temp("User Temp", "**/.tmp/**"),
        temp("Log Files", "**/*.log").files_only(),
        temp("Python Bytecode", "**/__pycache__/**"),
        temp("Pytest Cache", "**/.pytest_cache/**"),
        temp("Mypy Cache", "**/.mypy_cache/**"),
        temp("Ruff Cache", "**/.ruff_cache/**"),
        temp("Coverage Files", "**/.coverage*"),
        temp("Editor Swaps", "**/*.{swp,swo,tmp,bak}").files_only(),
        temp("macOS Metadata", "**/.DS_Store").files_only(),
        temp("npm Logs", "**/npm-debug.log*").files_only(),
        temp("Yarn Logs", "**/yarn-error.log*").files_only(),
        temp("Crash Reports", "**/Library/Application Support/CrashReporter/**"),
        temp("SQLite Journals", "**/*.db-journal").files_only(),
    ]
}

fn cache_rules() -> Vec<PatternRule> {
    vec![
        // Package managers
        cache("npm Cache", "**/.npm/**"),
        cache("Yarn Cache", "**/.cache/yarn/**"),
        cache("pnpm Store", "**/.pnpm-store/**"),
        cache("pip Cache", "**/.cache/pip/**"),
        cache("uv Cache", "**/.cache/uv/**"),
        cache("poetry Cache", "**/.cache/pypoetry/**"),
        cache("conda Packages", "**/.conda/pkgs/**"),
        cache("NuGet Cache", "**/.nuget/packages/**"),
        cache("Composer Cache", "**/.composer/cache/**"),
        cache("Bundler Cache", "**/.bundle/cache/**"),
        // JVM ecosystem
        cache("Gradle Cache", "**/.gradle/**"),
        cache("Maven Repo", "**/.m2/repository/**"),
        cache("Ivy Cache", "**/.ivy2/cache/**"),
        cache("SBT Boot", "**/.sbt/**"),
        cache("Coursier Cache", "**/.cache/coursier/**"),
        // Rust / Go
        cache("Cargo Registry", "**/.cargo/registry/**"),
        cache("rustup Downloads", "**/.rustup/downloads/**"),
        cache("Go Module Cache", "**/go/pkg/mod/**"),
        cache("Go Build Cache", "**/.cache/go-build/**"),
        // JS build tool caches
        cache("Turbo Cache", "**/.turbo/**"),
        cache("Parcel Cache", "**/.parcel-cache/**"),
        cache("Node GYP", "**/.node-gyp/**"),
        // Containers / infra
        cache("Kube Cache", "**/.kube/cache/**"),
        cache("Ansible Temp", "**/.ansible/tmp/**"),
        // ML model caches
        cache("HuggingFace Cache", "**/.cache/huggingface/**"),
        cache("PyTorch Cache", "**/.cache/torch/**"),
        cache("Whisper Cache", "**/.cache/whisper/**"),
        cache("Ollama Models", "**/.ollama/**"),
        // Linters / pre-commit
        cache("pre-commit Cache", "**/.cache/pre-commit/**"),
    ]
}

fn build_artifact_rules() -> Vec<PatternRule> {
    vec![
        // JS / Node
        artifact("node_modules", "**/node_modules/**"),
        artifact("Bower Components", "**/bower_components/**"),
        artifact("Next.js build", "**/.next/**"),
        artifact("Nuxt build", "**/.nuxt/**"),
        // Python
        artifact("Python venv", "**/.venv/**"),
        artifact("Python venv", "**/venv/**"),
        artifact("Python cache", "**/__pycache__/**"),
        artifact("Python Egg Info", "**/*.egg-info").dirs_only(),
        artifact("tox env", "**/.tox/**"),
        // Generic build outputs
        artifact("Build dir", "**/build/**"),
        artifact("Dist dir", "**/dist/**"),
        artifact("Object files", "**/obj/**"),
        artifact("Coverage artifacts", "**/coverage/**"),
        // Native toolchains
        artifact("Rust target", "**/target/**"),
        artifact("Swift build", "**/.build/**"),
        artifact("CMake build", "**/CMakeFiles/**"),
        artifact("Zig cache", "**/zig-cache/**"),
    ]
}
