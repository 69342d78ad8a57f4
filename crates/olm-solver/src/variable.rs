use std::borrow::Borrow;
use std::fmt;

use crate::constraint::Constraint;

/// Stable, unique name of a variable within one problem
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&String> for Identifier {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A selectable unit with the constraints attached to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    id: Identifier,
    constraints: Vec<Constraint>,
}

impl Variable {
    pub fn new(id: impl Into<Identifier>) -> Self {
        Self {
            id: id.into(),
            constraints: Vec::new(),
        }
    }

    /// Attach a constraint
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Attach several constraints, preserving order
    pub fn with_constraints(mut self, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        self.constraints.extend(constraints);
        self
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}
