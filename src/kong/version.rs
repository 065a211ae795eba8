//! Server version parsing

use super::error::KongError;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Parsed admin API server version
///
/// Ordering compares the numeric components first; a release sorts after
/// any suffixed build of the same number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KongVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    /// Anything after the numeric part, e.g. `rc1` or `enterprise-edition`
    pub pre: Option<String>,
}

impl KongVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }
}

impl Ord for KongVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for KongVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for KongVersion {
    type Err = KongError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let numeric_end = trimmed
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(trimmed.len());
        let (numeric, rest) = trimmed.split_at(numeric_end);

        let mut parts = numeric.split('.').filter(|p| !p.is_empty());
        let mut next = |required: bool| -> Result<u32, KongError> {
            match parts.next() {
                Some(p) => p.parse().map_err(|_| KongError::InvalidVersion(s.to_string())),
                None if required => Err(KongError::InvalidVersion(s.to_string())),
                None => Ok(0),
            }
        };

        let major = next(true)?;
        let minor = next(false)?;
        let patch = next(false)?;

        let pre = rest.trim_start_matches(['-', '.', '+']);
        Ok(Self {
            major,
            minor,
            patch,
            pre: (!pre.is_empty()).then(|| pre.to_string()),
        })
    }
}

impl fmt::Display for KongVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}
