//! Component-wise numeric versions.
//!
//! `3.10` sorts after `3.9`: each dot-separated component compares as a
//! number, and missing trailing components count as zero.

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// A dotted numeric version such as `3.12.1`.
#[derive(Debug, Clone, Eq, Serialize)]
#[serde(into = "String")]
pub struct RuntimeVersion {
    parts: Vec<u64>,
}

impl RuntimeVersion {
    /// Parse the first dotted version found in `text`.
    ///
    /// Accepts bare versions (`3.10`) and tool output (`Python 3.11.4`).
    /// Pre-release suffixes such as `rc1` are dropped.
    pub fn parse(text: &str) -> Option<Self> {
        static VERSION: OnceLock<Regex> = OnceLock::new();
        let re = VERSION.get_or_init(|| Regex::new(r"\d+(?:\.\d+)*").expect("valid regex"));
        let found = re.find(text)?;
        let parts = found
            .as_str()
            .split('.')
            .map(|p| p.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .ok()?;
        Some(Self { parts })
    }

    /// Numeric components.
    pub fn parts(&self) -> &[u64] {
        &self.parts
    }

    /// `major.minor`, used for versioned package names.
    pub fn major_minor(&self) -> String {
        let major = self.parts.first().copied().unwrap_or(0);
        let minor = self.parts.get(1).copied().unwrap_or(0);
        format!("{major}.{minor}")
    }
}

impl PartialEq for RuntimeVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for RuntimeVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for RuntimeVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: Vec<String> = self.parts.iter().map(u64::to_string).collect();
        f.write_str(&text.join("."))
    }
}

impl From<RuntimeVersion> for String {
    fn from(v: RuntimeVersion) -> Self {
        v.to_string()
    }
}

/// True if `version` is at least `minimum`. Unparseable input is never
/// considered new enough.
pub fn version_ge(version: &str, minimum: &str) -> bool {
    match (RuntimeVersion::parse(version), RuntimeVersion::parse(minimum)) {
        (Some(v), Some(m)) => v >= m,
        _ => false,
    }
}
