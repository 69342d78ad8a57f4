//! Caret-style range grammar over full versions.
//!
//! ```text
//! range := group ( "||" group )*
//! group := term ( " " term )*
//! term  := op? MAJOR.MINOR.PATCH[-PRE][+BUILD]
//! op    := "=" | "==" | "!=" | "<" | "<=" | ">" | ">=" | "^"
//! ```
//!
//! Unlike [`VersionRange`](crate::VersionRange) there are no wildcards, no
//! `v` prefix and no comma separator, and pre-releases are compared purely by
//! precedence.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::constraint::{caret_bounds, Comparator, ComparatorSet, Operator, VersionConstraint};
use crate::error::VersionError;
use crate::version::Version;

lazy_static! {
    static ref ALLOWED_CHARS_RE: Regex = Regex::new(r"^[0-9A-Za-z.+<>=!^| \t-]+$").unwrap();
    static ref TERM_RE: Regex = Regex::new(r"^(==|=|!=|>=|<=|>|<|\^)?([0-9].*)$").unwrap();
}

/// A parsed caret-style range
#[derive(Debug, Clone)]
pub struct CaretRange {
    raw: String,
    set: ComparatorSet,
}

impl CaretRange {
    /// Parse a range expression such as `^1.2.3` or `>=1.0.0 <2.0.0 || 3.0.0`
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(VersionError::constraint(input, "empty range"));
        }
        if !ALLOWED_CHARS_RE.is_match(trimmed) {
            return Err(VersionError::constraint(input, "invalid character"));
        }

        let mut groups = Vec::new();
        for group in trimmed.split("||") {
            let terms: Vec<&str> = group.split_whitespace().collect();
            if terms.is_empty() {
                return Err(VersionError::constraint(input, "empty alternative"));
            }
            let mut comparators = Vec::new();
            for term in terms {
                comparators.extend(compile_term(input, term)?);
            }
            groups.push(comparators);
        }

        Ok(Self {
            raw: input.to_string(),
            set: ComparatorSet::new(groups, false),
        })
    }

    /// The caret range rooted at `version`: same major line, or same minor
    /// line for `0.x` versions.
    pub fn successors_of(version: &Version) -> Self {
        let (low, high) = caret_bounds(version, true, true);
        Self {
            raw: format!("^{}", version),
            set: ComparatorSet::new(
                vec![vec![
                    Comparator::Op(Operator::GreaterThanOrEqual, low),
                    Comparator::Op(Operator::LessThan, high),
                ]],
                false,
            ),
        }
    }

    /// The original expression
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl VersionConstraint for CaretRange {
    fn matches(&self, version: &Version) -> bool {
        self.set.matches(version)
    }
}

impl fmt::Display for CaretRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn compile_term(input: &str, term: &str) -> Result<Vec<Comparator>, VersionError> {
    let caps = TERM_RE
        .captures(term)
        .ok_or_else(|| VersionError::constraint(input, format!("invalid term \"{}\"", term)))?;
    let op = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    let version = Version::parse(&caps[2])
        .map_err(|_| VersionError::constraint(input, format!("invalid version \"{}\"", &caps[2])))?;

    if op == "^" {
        let (low, high) = caret_bounds(&version, true, true);
        return Ok(vec![
            Comparator::Op(Operator::GreaterThanOrEqual, low),
            Comparator::Op(Operator::LessThan, high),
        ]);
    }

    let op = Operator::parse(op)
        .ok_or_else(|| VersionError::constraint(input, format!("invalid operator \"{}\"", op)))?;
    Ok(vec![Comparator::Op(op, version)])
}
