//! Comparators and compound constraints shared by both range grammars

mod operator;

pub use operator::Operator;

use std::fmt;

use crate::version::Version;

/// Anything a version can be tested against
pub trait VersionConstraint: fmt::Display + fmt::Debug + Send + Sync {
    /// Check whether the version satisfies this constraint
    fn matches(&self, version: &Version) -> bool;
}

/// A single primitive test in a compiled range
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparator {
    /// `version <op> operand`
    Op(Operator, Version),
    /// Matches versions below `low` or at/above `high` (a negated wildcard)
    Outside(Version, Version),
    /// Matches nothing
    Never,
}

impl Comparator {
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Comparator::Op(op, operand) => op.compare(version, operand),
            Comparator::Outside(low, high) => version < low || version >= high,
            Comparator::Never => false,
        }
    }

    fn names_prerelease(&self) -> bool {
        match self {
            Comparator::Op(_, v) => v.is_prerelease(),
            Comparator::Outside(low, high) => low.is_prerelease() || high.is_prerelease(),
            Comparator::Never => false,
        }
    }
}

/// Disjunction of conjunctive comparator groups
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ComparatorSet {
    groups: Vec<Vec<Comparator>>,
    /// When set, pre-release versions only match a group that names a
    /// pre-release itself
    prerelease_opt_in: bool,
}

impl ComparatorSet {
    pub(crate) fn new(groups: Vec<Vec<Comparator>>, prerelease_opt_in: bool) -> Self {
        Self {
            groups,
            prerelease_opt_in,
        }
    }

    pub(crate) fn matches(&self, version: &Version) -> bool {
        self.groups.iter().any(|group| {
            if self.prerelease_opt_in
                && version.is_prerelease()
                && !group.iter().any(Comparator::names_prerelease)
            {
                return false;
            }
            group.iter().all(|c| c.matches(version))
        })
    }

    #[cfg(test)]
    pub(crate) fn groups(&self) -> &[Vec<Comparator>] {
        &self.groups
    }
}

/// Bounds of a caret range over a possibly partial version.
///
/// `^1.2.3` := `>=1.2.3 <2.0.0`, `^0.2.3` := `>=0.2.3 <0.3.0`,
/// `^0.0.3` := `>=0.0.3 <0.0.4`, `^0` := `<1.0.0`, `^0.0` := `<0.1.0`.
pub(crate) fn caret_bounds(low: &Version, minor_set: bool, patch_set: bool) -> (Version, Version) {
    let high = if low.major > 0 || !minor_set {
        low.next_major()
    } else if low.minor > 0 || !patch_set {
        low.next_minor()
    } else {
        low.next_patch()
    };
    (low.clone(), high)
}

/// Bounds of a tilde range: `~1.2.3` := `>=1.2.3 <1.3.0`, `~1` := `>=1.0.0 <2.0.0`.
pub(crate) fn tilde_bounds(low: &Version, minor_set: bool) -> (Version, Version) {
    let high = if minor_set {
        low.next_minor()
    } else {
        low.next_major()
    };
    (low.clone(), high)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_caret_bounds() {
        assert_eq!(caret_bounds(&v("1.2.3"), true, true).1, v("2.0.0"));
        assert_eq!(caret_bounds(&v("0.2.3"), true, true).1, v("0.3.0"));
        assert_eq!(caret_bounds(&v("0.0.3"), true, true).1, v("0.0.4"));
        assert_eq!(caret_bounds(&v("0.0.0"), false, false).1, v("1.0.0"));
        assert_eq!(caret_bounds(&v("0.0.0"), true, false).1, v("0.1.0"));
    }

    #[test]
    fn test_tilde_bounds() {
        assert_eq!(tilde_bounds(&v("1.2.3"), true).1, v("1.3.0"));
        assert_eq!(tilde_bounds(&v("1.0.0"), false).1, v("2.0.0"));
    }

    #[test]
    fn test_prerelease_opt_in() {
        let plain = ComparatorSet::new(
            vec![vec![Comparator::Op(Operator::GreaterThanOrEqual, v("1.0.0"))]],
            true,
        );
        assert!(plain.matches(&v("1.5.0")));
        assert!(!plain.matches(&v("1.5.0-rc.1")));

        let opted_in = ComparatorSet::new(
            vec![vec![Comparator::Op(Operator::GreaterThanOrEqual, v("1.0.0-alpha"))]],
            true,
        );
        assert!(opted_in.matches(&v("1.5.0-rc.1")));

        let ordering_only = ComparatorSet::new(
            vec![vec![Comparator::Op(Operator::GreaterThanOrEqual, v("1.0.0"))]],
            false,
        );
        assert!(ordering_only.matches(&v("1.5.0-rc.1")));
    }

    #[test]
    fn test_outside_and_never() {
        let outside = Comparator::Outside(v("1.2.0"), v("1.3.0"));
        assert!(outside.matches(&v("1.1.9")));
        assert!(!outside.matches(&v("1.2.5")));
        assert!(outside.matches(&v("1.3.0")));
        assert!(!Comparator::Never.matches(&v("0.0.1")));
    }
}
