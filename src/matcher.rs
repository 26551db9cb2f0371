//! Path exclusion rules for staging.
//!
//! Each configured ignore entry becomes one [`Rule`]. A [`PathMatcher`] checks
//! a candidate path, relative to the source root, against its rules in order.
//! The first rule that matches excludes the path. Paths that match no rule
//! are staged.
//!
//! Entries are classified when they are parsed:
//!
//! - `dir/` (trailing separator) is a [`Rule::PrefixDirectory`] and excludes
//!   the directory and everything beneath it.
//! - `dir/file.txt` (interior separator) is a [`Rule::Exact`] and excludes
//!   only that path.
//! - `name` (no separator) is a [`Rule::Basename`] and excludes any path whose
//!   final component is `name`.

use camino::Utf8Path;
use log::trace;
use std::fmt;

/// A single exclusion rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Matches one normalised path exactly.
    Exact(String),
    /// Matches a directory and all of its descendants. Stored without the
    /// trailing separator.
    PrefixDirectory(String),
    /// Matches any path whose final component equals the stored name.
    Basename(String),
}

impl Rule {
    /// Parse a configured ignore entry.
    ///
    /// Returns `None` for entries that can never match anything (empty after
    /// normalisation, or containing a NUL byte).
    ///
    /// # Examples
    ///
    /// ```
    /// use stagehand::matcher::Rule;
    ///
    /// assert_eq!(Rule::parse("build/"), Some(Rule::PrefixDirectory("build".to_owned())));
    /// assert_eq!(Rule::parse("src/app.js"), Some(Rule::Exact("src/app.js".to_owned())));
    /// assert_eq!(Rule::parse(".git"), Some(Rule::Basename(".git".to_owned())));
    /// assert_eq!(Rule::parse("/"), None);
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.contains('\0') {
            return None;
        }

        let unified = raw.replace('\\', "/");
        let is_directory = unified.ends_with('/');
        let path = normalise_path(&unified);

        if path.is_empty() {
            return None;
        }

        if is_directory {
            Some(Self::PrefixDirectory(path))
        } else if path.contains('/') {
            Some(Self::Exact(path))
        } else {
            Some(Self::Basename(path))
        }
    }

    /// Check the rule against an already normalised candidate.
    fn matches_normalised(&self, candidate: &str) -> bool {
        match self {
            Self::Exact(path) => candidate == path,
            Self::PrefixDirectory(dir) => candidate
                .strip_prefix(dir.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
            Self::Basename(name) => candidate.rsplit('/').next() == Some(name.as_str()),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(path) => write!(f, "{path}"),
            Self::PrefixDirectory(dir) => write!(f, "{dir}/"),
            Self::Basename(name) => write!(f, "{name}"),
        }
    }
}

/// Ordered, immutable collection of exclusion rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a rule set from configured ignore entries.
    ///
    /// Entries that cannot match anything are dropped.
    #[must_use]
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .filter_map(|pattern| {
                let parsed = Rule::parse(pattern.as_ref());
                if parsed.is_none() {
                    trace!("dropping ignore entry {:?}: it can never match", pattern.as_ref());
                }
                parsed
            })
            .collect();
        Self { rules }
    }

    /// Iterate the rules in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Number of usable rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true when there are no rules, so every path is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl From<Vec<Rule>> for RuleSet {
    fn from(rules: Vec<Rule>) -> Self {
        Self { rules }
    }
}

/// Decides whether paths under the source root are staged.
#[derive(Debug, Clone, Default)]
pub struct PathMatcher {
    rules: RuleSet,
}

impl PathMatcher {
    /// Create a matcher over the given rules.
    #[must_use]
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// The rules this matcher evaluates.
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Return the first rule that excludes `candidate`, if any.
    ///
    /// The repository root (an empty candidate) is never excluded.
    #[must_use]
    pub fn first_match(&self, candidate: &str) -> Option<&Rule> {
        let candidate = normalise_path(candidate);
        if candidate.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|rule| rule.matches_normalised(&candidate))
    }

    /// Returns true when `candidate` must not be staged.
    #[must_use]
    pub fn is_excluded(&self, candidate: &str) -> bool {
        self.first_match(candidate).is_some()
    }

    /// Convenience wrapper over [`Self::is_excluded`] for relative paths.
    #[must_use]
    pub fn is_path_excluded(&self, relative: &Utf8Path) -> bool {
        self.is_excluded(relative.as_str())
    }
}

/// Returns true when `candidate` is excluded by `rules`.
///
/// # Examples
///
/// ```
/// use stagehand::matcher::{RuleSet, matches};
///
/// let rules = RuleSet::from_patterns(["build/", "node_modules"]);
/// assert!(matches(&rules, "build/out.js"));
/// assert!(!matches(&rules, "buildx/out.js"));
/// assert!(matches(&rules, "a/b/node_modules"));
/// assert!(!matches(&RuleSet::default(), "anything"));
/// ```
#[must_use]
pub fn matches(rules: &RuleSet, candidate: &str) -> bool {
    let candidate = normalise_path(candidate);
    !candidate.is_empty() && rules.iter().any(|rule| rule.matches_normalised(&candidate))
}

/// Normalise a relative path to `/` separators with no leading `./` and no
/// trailing separator. `"."` normalises to the empty root path.
#[must_use]
pub fn normalise_path(raw: &str) -> String {
    let unified = raw.replace('\\', "/");
    let mut trimmed = unified.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed == "." {
        return String::new();
    }
    trimmed.to_owned()
}
