//! Boolean constraint solver for bundle selection.
//!
//! A problem is an ordered list of [`Variable`]s. Each variable may be
//! selected or not, and carries [`Constraint`]s that restrict the selection:
//!
//! - [`Constraint::Mandatory`]: the variable must be selected
//! - [`Constraint::Prohibited`]: the variable must not be selected
//! - [`Constraint::Dependency`]: if selected, at least one of the listed
//!   variables must be selected. Earlier entries are preferred.
//! - [`Constraint::Conflict`]: the variable and the other one are never both selected
//! - [`Constraint::AtMost`]: at most `n` of the listed variables are selected
//!
//! # Algorithm Overview
//!
//! 1. **Rule Generation**: each constraint becomes a clause (or a cardinality rule)
//!    over signed literals
//! 2. **Unit Propagation**: force decisions that follow from current ones
//! 3. **Decision Making**: pick the first unresolved dependency of a selected
//!    variable and try its candidates in declared order
//! 4. **Backtracking**: on conflict, move to the next candidate of the most
//!    recent branch
//!
//! Variables not needed by any selected variable are left unselected, so the
//! solution is the preferred minimal selection.
//!
//! # Example
//!
//! ```
//! use olm_solver::{Constraint, Solver, Variable};
//!
//! let variables = vec![
//!     Variable::new("app")
//!         .with_constraint(Constraint::Mandatory)
//!         .with_constraint(Constraint::dependency(["lib-2", "lib-1"])),
//!     Variable::new("lib-2"),
//!     Variable::new("lib-1"),
//! ];
//!
//! let solution = Solver::new(variables).unwrap().solve().unwrap();
//! assert!(solution.is_selected("lib-2"));
//! assert!(!solution.is_selected("lib-1"));
//! ```

mod constraint;
mod decisions;
mod error;
mod problem;
mod rule;
mod solver;
mod variable;

#[cfg(test)]
mod tests;

pub use constraint::Constraint;
pub use decisions::Decisions;
pub use error::SolverError;
pub use problem::{AppliedConstraint, NotSatisfiable};
pub use rule::{Literal, Rule, RuleType};
pub use solver::{Solution, Solver};
pub use variable::{Identifier, Variable};
