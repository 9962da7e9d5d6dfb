//! Compile glob and regex patterns used by allow/block/secrets lists once
//! per process. Bad regexes are logged and dropped rather than propagated.

use regex::Regex;

/// Convert a glob string to an anchored, case-insensitive regex pattern:
/// non-metacharacters are escaped, `*` becomes `.*`.
pub fn glob_to_regex_pattern(glob: &str) -> String {
    let mut out = String::from("(?i)^");
    for ch in glob.chars() {
        if ch == '*' {
            out.push_str(".*");
        } else {
            out.push_str(&regex::escape(&ch.to_string()));
        }
    }
    out.push('$');
    out
}

/// Compile a glob string. Returns `None` (after logging) if the resulting
/// regex somehow fails to compile.
pub fn compile_glob(glob: &str) -> Option<Regex> {
    let pattern = glob_to_regex_pattern(glob);
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::warn!("dropping unparsable glob pattern {glob:?}: {err}");
            None
        }
    }
}

/// Compile a raw regex string from config. Returns `None` (after logging)
/// on a compile error; callers must never propagate this as an
/// initialization failure.
pub fn compile_regex(source: &str) -> Option<Regex> {
    match Regex::new(source) {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::warn!("dropping unparsable regex pattern {source:?}: {err}");
            None
        }
    }
}

/// A compiled set of glob patterns, plus the fact (checked once at compile
/// time) of whether the raw list was empty or contained the `"*"` wildcard.
pub struct GlobSet {
    compiled: Vec<Regex>,
    is_wildcard_or_empty: bool,
}

impl GlobSet {
    pub fn compile(globs: &[String]) -> Self {
        let is_wildcard_or_empty = globs.is_empty() || globs.iter().any(|g| g == "*");
        let compiled = globs.iter().filter_map(|g| compile_glob(g)).collect();
        Self {
            compiled,
            is_wildcard_or_empty,
        }
    }

    /// True if the raw list was empty or contained a literal `"*"` entry.
    pub fn is_wildcard_or_empty(&self) -> bool {
        self.is_wildcard_or_empty
    }

    pub fn matches(&self, text: &str) -> bool {
        self.compiled.iter().any(|re| re.is_match(text))
    }

    /// The first matching pattern's source, if any.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.compiled
            .iter()
            .find(|re| re.is_match(text))
            .map(|re| re.as_str())
    }
}
