//! Comparator-set range grammar used for user supplied version ranges.
//!
//! ```text
//! range  := group ( "||" group )*
//! group  := part ( "," part )*
//! part   := term ( " " term )* | partial " - " partial
//! term   := op? partial
//! op     := "=" | "==" | "!=" | "<" | "<=" | ">" | ">=" | "~" | "~>" | "^"
//! partial:= "v"? (num | x) ( "." (num | x) ( "." (num | x) pre? build? )? )?
//! x      := "x" | "X" | "*"
//! ```
//!
//! Missing components behave like wildcards, so `1.2` matches the same set
//! as `1.2.x`. Whitespace between an operator and its version is ignored.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::constraint::{caret_bounds, tilde_bounds, Comparator, ComparatorSet, Operator, VersionConstraint};
use crate::error::VersionError;
use crate::version::{Identifier, Version};

lazy_static! {
    static ref ALLOWED_CHARS_RE: Regex = Regex::new(r"^[0-9A-Za-z.+*<>=!~^|,\- \t-]+$").unwrap();
    static ref OR_RE: Regex = Regex::new(r"\|\|").unwrap();
    static ref OPERATOR_SPACE_RE: Regex = Regex::new(r"(~>|>=|<=|!=|==|[=<>~^])[ \t]+").unwrap();
    static ref TERM_RE: Regex = Regex::new(r"^(~>|>=|<=|!=|==|=|<|>|~|\^)?(.+)$").unwrap();
    static ref PARTIAL_VERSION_RE: Regex = Regex::new(
        r"^v?(\d+|[xX*])(?:\.(\d+|[xX*]))?(?:\.(\d+|[xX*]))?(?:-([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?(?:\+([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$"
    ).unwrap();
}

/// A version with possibly wildcarded trailing components
#[derive(Debug, Clone)]
struct Partial {
    /// Wildcards replaced by zero
    version: Version,
    /// Number of leading concrete components (0..=3)
    precision: u8,
}

impl Partial {
    fn parse(input: &str, text: &str) -> Result<Self, VersionError> {
        let caps = PARTIAL_VERSION_RE
            .captures(text)
            .ok_or_else(|| VersionError::constraint(input, format!("invalid version \"{}\"", text)))?;

        let mut numbers = [0u64; 3];
        let mut precision = 0u8;
        for (slot, idx) in [1usize, 2, 3].into_iter().enumerate() {
            let Some(m) = caps.get(idx) else { break };
            let Ok(n) = m.as_str().parse::<u64>() else {
                if m.as_str().chars().all(|c| c.is_ascii_digit()) {
                    return Err(VersionError::constraint(input, format!("version component \"{}\" overflows", m.as_str())));
                }
                // wildcard: everything after it is a wildcard too
                break;
            };
            numbers[slot] = n;
            precision += 1;
        }

        let mut version = Version::new(numbers[0], numbers[1], numbers[2]);
        if precision == 3 {
            if let Some(pre) = caps.get(4) {
                version.pre = pre.as_str().split('.').map(Identifier::parse).collect();
            }
        }

        Ok(Self { version, precision })
    }

    fn is_complete(&self) -> bool {
        self.precision == 3
    }

    /// First version past the wildcard span
    fn wildcard_ceiling(&self) -> Version {
        if self.precision <= 1 {
            self.version.next_major()
        } else {
            self.version.next_minor()
        }
    }
}

/// A parsed comparator-set version range
#[derive(Debug, Clone)]
pub struct VersionRange {
    raw: String,
    set: ComparatorSet,
}

impl VersionRange {
    /// Parse a range expression such as `>=1.2, <2 || ~3.1`
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(VersionError::constraint(input, "empty range"));
        }
        if !ALLOWED_CHARS_RE.is_match(trimmed) {
            return Err(VersionError::constraint(input, "invalid character"));
        }

        let groups = OR_RE
            .split(trimmed)
            .map(|group| parse_group(input, group))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: input.to_string(),
            set: ComparatorSet::new(groups, true),
        })
    }

    /// The original expression
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl VersionConstraint for VersionRange {
    fn matches(&self, version: &Version) -> bool {
        self.set.matches(version)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_group(input: &str, group: &str) -> Result<Vec<Comparator>, VersionError> {
    let normalized = OPERATOR_SPACE_RE.replace_all(group.trim(), "$1");
    if normalized.is_empty() {
        return Err(VersionError::constraint(input, "empty alternative"));
    }

    let mut comparators = Vec::new();
    for part in normalized.split(',') {
        let tokens: Vec<&str> = part.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(VersionError::constraint(input, "empty constraint between separators"));
        }

        let mut i = 0;
        while i < tokens.len() {
            if tokens.get(i + 1) == Some(&"-") {
                let upper = tokens
                    .get(i + 2)
                    .ok_or_else(|| VersionError::constraint(input, "hyphen range is missing its upper bound"))?;
                comparators.extend(compile_hyphen(input, tokens[i], upper)?);
                i += 3;
            } else {
                comparators.extend(compile_term(input, tokens[i])?);
                i += 1;
            }
        }
    }

    Ok(comparators)
}

fn compile_term(input: &str, term: &str) -> Result<Vec<Comparator>, VersionError> {
    let caps = TERM_RE
        .captures(term)
        .ok_or_else(|| VersionError::constraint(input, format!("invalid term \"{}\"", term)))?;
    let op = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    let partial = Partial::parse(input, &caps[2])?;

    use Operator::*;

    if partial.precision == 0 {
        return Ok(match op {
            "!=" | "<" | ">" => vec![Comparator::Never],
            _ => Vec::new(),
        });
    }

    let low = partial.version.clone();
    let complete = partial.is_complete();

    let comparators = match op {
        "~" | "~>" => {
            let (low, high) = tilde_bounds(&low, partial.precision >= 2);
            vec![Comparator::Op(GreaterThanOrEqual, low), Comparator::Op(LessThan, high)]
        }
        "^" => {
            let (low, high) = caret_bounds(&low, partial.precision >= 2, partial.precision >= 3);
            vec![Comparator::Op(GreaterThanOrEqual, low), Comparator::Op(LessThan, high)]
        }
        other => {
            let op = Operator::parse(other)
                .ok_or_else(|| VersionError::constraint(input, format!("invalid operator \"{}\"", other)))?;
            match (op, complete) {
                (op, true) => vec![Comparator::Op(op, low)],
                (Equal, false) => vec![
                    Comparator::Op(GreaterThanOrEqual, low),
                    Comparator::Op(LessThan, partial.wildcard_ceiling()),
                ],
                (NotEqual, false) => vec![Comparator::Outside(low, partial.wildcard_ceiling())],
                (GreaterThan, false) => vec![Comparator::Op(GreaterThanOrEqual, partial.wildcard_ceiling())],
                (LessThanOrEqual, false) => vec![Comparator::Op(LessThan, partial.wildcard_ceiling())],
                (GreaterThanOrEqual | LessThan, false) => vec![Comparator::Op(op, low)],
            }
        }
    };

    Ok(comparators)
}

fn compile_hyphen(input: &str, from: &str, to: &str) -> Result<Vec<Comparator>, VersionError> {
    let from = Partial::parse(input, from)?;
    let to = Partial::parse(input, to)?;

    let mut comparators = vec![Comparator::Op(Operator::GreaterThanOrEqual, from.version)];
    match to.precision {
        0 => {}
        3 => comparators.push(Comparator::Op(Operator::LessThanOrEqual, to.version)),
        _ => comparators.push(Comparator::Op(Operator::LessThan, to.wildcard_ceiling())),
    }
    Ok(comparators)
}
