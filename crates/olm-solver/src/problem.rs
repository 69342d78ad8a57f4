use std::fmt;

use crate::constraint::Constraint;
use crate::variable::Identifier;

/// A constraint together with the variable it is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedConstraint {
    pub variable: Identifier,
    pub constraint: Constraint,
}

impl fmt::Display for AppliedConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.constraint.describe(&self.variable))
    }
}

/// Explanation of why a problem has no solution.
///
/// Lists the constraints that took part in the conflicts found during the
/// search, in problem order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotSatisfiable {
    constraints: Vec<AppliedConstraint>,
}

impl NotSatisfiable {
    pub fn new(constraints: Vec<AppliedConstraint>) -> Self {
        Self { constraints }
    }

    pub fn constraints(&self) -> &[AppliedConstraint] {
        &self.constraints
    }
}

impl fmt::Display for NotSatisfiable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.constraints.iter().map(|c| c.to_string()).collect();
        write!(f, "constraints not satisfiable: {}", parts.join(", "))
    }
}
