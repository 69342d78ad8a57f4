//! Operator types for version comparators

use std::fmt;

use crate::version::Version;

/// Comparison operators for version comparators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equal (=)
    Equal,
    /// Not equal (!=)
    NotEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal (<=)
    LessThanOrEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,
}

impl Operator {
    /// Parse a plain comparison operator. Range operators (`~`, `^`) are
    /// grammar-specific and handled by the range parsers.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "" | "=" | "==" => Some(Operator::Equal),
            "!=" => Some(Operator::NotEqual),
            "<" => Some(Operator::LessThan),
            "<=" => Some(Operator::LessThanOrEqual),
            ">" => Some(Operator::GreaterThan),
            ">=" => Some(Operator::GreaterThanOrEqual),
            _ => None,
        }
    }

    /// Get the string representation of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
        }
    }

    /// Apply the operator with `version` on the left-hand side
    pub fn compare(&self, version: &Version, operand: &Version) -> bool {
        match self {
            Operator::Equal => version == operand,
            Operator::NotEqual => version != operand,
            Operator::LessThan => version < operand,
            Operator::LessThanOrEqual => version <= operand,
            Operator::GreaterThan => version > operand,
            Operator::GreaterThanOrEqual => version >= operand,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Operator::parse(""), Some(Operator::Equal));
        assert_eq!(Operator::parse("=="), Some(Operator::Equal));
        assert_eq!(Operator::parse(">="), Some(Operator::GreaterThanOrEqual));
        assert_eq!(Operator::parse("<>"), None);
        assert_eq!(Operator::parse("~"), None);
    }

    #[test]
    fn test_compare() {
        let a = Version::new(1, 2, 3);
        let b = Version::new(1, 3, 0);
        assert!(Operator::LessThan.compare(&a, &b));
        assert!(Operator::NotEqual.compare(&a, &b));
        assert!(!Operator::GreaterThanOrEqual.compare(&a, &b));
        assert!(Operator::LessThanOrEqual.compare(&a, &a));
    }
}
