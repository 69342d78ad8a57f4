//! Semantic version type

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::VersionError;

lazy_static! {
    // semver.org 2.0.0 grammar, anchored
    static ref STRICT_VERSION_RE: Regex = Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-((?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$"
    ).unwrap();
}

/// A pre-release identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Numeric(u64),
    AlphaNumeric(String),
}

impl Identifier {
    pub(crate) fn parse(s: &str) -> Self {
        match s.parse::<u64>() {
            Ok(n) if !s.starts_with('0') || s == "0" => Identifier::Numeric(n),
            _ => Identifier::AlphaNumeric(s.to_string()),
        }
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Identifier::Numeric(a), Identifier::Numeric(b)) => a.cmp(b),
            (Identifier::Numeric(_), Identifier::AlphaNumeric(_)) => Ordering::Less,
            (Identifier::AlphaNumeric(_), Identifier::Numeric(_)) => Ordering::Greater,
            (Identifier::AlphaNumeric(a), Identifier::AlphaNumeric(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Numeric(n) => write!(f, "{}", n),
            Identifier::AlphaNumeric(s) => f.write_str(s),
        }
    }
}

/// A semantic version (`MAJOR.MINOR.PATCH[-PRE][+BUILD]`).
///
/// Equality and ordering follow semver precedence rules, so build metadata
/// is carried for display but never compared.
#[derive(Debug, Clone)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Vec<Identifier>,
    pub build: Vec<String>,
}

impl Version {
    /// Create a release version without pre-release or build data
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: Vec::new(),
            build: Vec::new(),
        }
    }

    /// Parse a strict semantic version. No leading `v`, all three
    /// components required.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let caps = STRICT_VERSION_RE
            .captures(input)
            .ok_or_else(|| VersionError::InvalidVersion(input.to_string()))?;

        let component = |idx: usize| -> Result<u64, VersionError> {
            caps[idx]
                .parse::<u64>()
                .map_err(|_| VersionError::InvalidVersion(input.to_string()))
        };

        Ok(Self {
            major: component(1)?,
            minor: component(2)?,
            patch: component(3)?,
            pre: caps
                .get(4)
                .map(|m| m.as_str().split('.').map(Identifier::parse).collect())
                .unwrap_or_default(),
            build: caps
                .get(5)
                .map(|m| m.as_str().split('.').map(String::from).collect())
                .unwrap_or_default(),
        })
    }

    /// Whether this is a pre-release version
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    /// The same version with pre-release and build data stripped
    pub fn release(&self) -> Self {
        Self::new(self.major, self.minor, self.patch)
    }

    pub(crate) fn next_major(&self) -> Self {
        Self::new(self.major.saturating_add(1), 0, 0)
    }

    pub(crate) fn next_minor(&self) -> Self {
        Self::new(self.major, self.minor.saturating_add(1), 0)
    }

    pub(crate) fn next_patch(&self) -> Self {
        Self::new(self.major, self.minor, self.patch.saturating_add(1))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                // a release sorts after any of its pre-releases
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            let pre: Vec<String> = self.pre.iter().map(|i| i.to_string()).collect();
            write!(f, "-{}", pre.join("."))?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build.join("."))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_valid() {
        let version = v("1.2.3-rc.1+build.5");
        assert_eq!(version.major, 1);
        assert_eq!(version.minor, 2);
        assert_eq!(version.patch, 3);
        assert_eq!(
            version.pre,
            vec![Identifier::AlphaNumeric("rc".into()), Identifier::Numeric(1)]
        );
        assert_eq!(version.build, vec!["build", "5"]);
        assert_eq!(version.to_string(), "1.2.3-rc.1+build.5");
    }

    #[test]
    fn test_parse_invalid() {
        for input in ["", "1", "1.2", "v1.2.3", "1.2.3.4", "01.2.3", "1.2.3-", "1.2.3;", "1.2.x", " 1.2.3"] {
            assert!(Version::parse(input).is_err(), "expected {:?} to be rejected", input);
        }
    }

    #[test]
    fn test_parse_overflow() {
        assert!(Version::parse("99999999999999999999.0.0").is_err());
    }

    #[test]
    fn test_ordering() {
        let mut versions = vec![
            v("1.0.0"),
            v("1.0.0-alpha"),
            v("1.0.0-alpha.1"),
            v("1.0.0-beta.11"),
            v("1.0.0-beta.2"),
            v("1.0.0-beta"),
            v("1.0.0-alpha.beta"),
            v("1.0.0-rc.1"),
            v("0.9.9"),
        ];
        versions.sort();
        let sorted: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
        assert_eq!(
            sorted,
            vec![
                "0.9.9",
                "1.0.0-alpha",
                "1.0.0-alpha.1",
                "1.0.0-alpha.beta",
                "1.0.0-beta",
                "1.0.0-beta.2",
                "1.0.0-beta.11",
                "1.0.0-rc.1",
                "1.0.0",
            ]
        );
    }

    #[test]
    fn test_build_metadata_ignored_in_comparison() {
        assert_eq!(v("1.0.0+a"), v("1.0.0+b"));
    }
}
