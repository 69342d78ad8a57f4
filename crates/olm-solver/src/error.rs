use thiserror::Error;

use crate::problem::NotSatisfiable;
use crate::variable::Identifier;

/// Errors returned by [`Solver`](crate::Solver)
#[derive(Error, Debug, Clone)]
pub enum SolverError {
    /// No assignment satisfies every constraint
    #[error("{0}")]
    NotSatisfiable(NotSatisfiable),

    #[error("duplicate variable identifier \"{0}\"")]
    DuplicateIdentifier(Identifier),

    #[error("variable \"{variable}\" references unknown variable \"{reference}\"")]
    UnknownIdentifier {
        variable: Identifier,
        reference: Identifier,
    },

    #[error("solver exceeded maximum of {0} iterations")]
    IterationLimit(usize),
}

impl SolverError {
    /// Whether this is a legitimate "no solution" outcome rather than a
    /// failure of the solver itself
    pub fn is_unsatisfiable(&self) -> bool {
        matches!(self, SolverError::NotSatisfiable(_))
    }
}
