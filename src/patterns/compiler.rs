//! Pattern classification: turning declarative globs into fast matchers.
//!
//! The dialect is deliberately small and ASCII-case-insensitive. Each rule
//! pattern is expanded over `{a,b,c}` alternations and every expanded
//! sub-pattern is classified once, at compile time, into one of five matcher
//! kinds. The hot loop never re-parses a pattern.

/// How one expanded sub-pattern is matched at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MatcherKind {
    /// `**/segment/**`: path contains `/segment/`, or ends with `/segment`.
    Contains,
    /// `**/*suffix`: basename ends with `suffix`.
    EndsWith,
    /// `**/prefix*`: basename starts with `prefix`.
    StartsWith,
    /// `**/literal`: basename equals `literal`.
    Exact,
    /// Anything else: shell-glob fallback.
    Glob,
}

/// One compiled matcher. `value` and `alt` are lowercased at compile time so
/// callers can pass pre-lowercased paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Matcher {
    pub(crate) kind: MatcherKind,
    pub(crate) value: String,
    /// `Contains` only: the end-of-path variant without the trailing slash.
    pub(crate) alt: String,
}

impl Matcher {
    fn glob(pattern: &str) -> Self {
        Matcher {
            kind: MatcherKind::Glob,
            value: pattern.to_ascii_lowercase(),
            alt: String::new(),
        }
    }
}

fn has_glob_chars(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Classifies one expanded pattern into a fast string matcher.
pub(crate) fn classify(pattern: &str) -> Matcher {
    let Some(rest) = pattern.strip_prefix("**/") else {
        return Matcher::glob(pattern);
    };

    // **/segment/** or **/path/to/thing/**: contains check on the path
    if let Some(middle) = rest.strip_suffix("/**") {
        if !has_glob_chars(middle) {
            let mid = middle.to_ascii_lowercase();
            return Matcher {
                kind: MatcherKind::Contains,
                value: format!("/{mid}/"),
                alt: format!("/{mid}"),
            };
        }
        return Matcher::glob(pattern);
    }

    // **/*.ext: endswith check on the basename
    if let Some(suffix) = rest.strip_prefix('*') {
        if !has_glob_chars(suffix) {
            return Matcher {
                kind: MatcherKind::EndsWith,
                value: suffix.to_ascii_lowercase(),
                alt: String::new(),
            };
        }
    }

    // **/prefix*: startswith check on the basename
    if let Some(prefix) = rest.strip_suffix('*') {
        if !has_glob_chars(prefix) {
            return Matcher {
                kind: MatcherKind::StartsWith,
                value: prefix.to_ascii_lowercase(),
                alt: String::new(),
            };
        }
    }

    // **/exact: exact basename match
    if !has_glob_chars(rest) {
        return Matcher {
            kind: MatcherKind::Exact,
            value: rest.to_ascii_lowercase(),
            alt: String::new(),
        };
    }

    Matcher::glob(pattern)
}

/// Expands the first `{a,b,c}` group left-to-right, recursively.
///
/// The first `{` is paired with the first following `}`; nesting is not
/// balanced. Patterns without a complete group pass through unchanged.
pub(crate) fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(start) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };
    let Some(end) = pattern[start + 1..].find('}').map(|off| start + 1 + off) else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..start];
    let suffix = &pattern[end + 1..];
    let mut expanded = Vec::new();
    for choice in pattern[start + 1..end].split(',') {
        expanded.extend(expand_braces(&format!("{prefix}{choice}{suffix}")));
    }
    expanded
}

/// Expands and classifies a raw rule pattern.
pub(crate) fn compile_pattern(pattern: &str) -> Vec<Matcher> {
    expand_braces(pattern).iter().map(|p| classify(p)).collect()
}
