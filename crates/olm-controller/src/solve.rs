//! Bridge between resolution variables and the solver.

use std::sync::Arc;

use olm_solver::{Solver, SolverError, Variable};

use crate::catalog::CatalogBundle;
use crate::error::{ControllerError, Result};
use crate::variables::ResolutionVariable;

/// Bundles selected by a solve, in problem order
#[derive(Debug, Clone, Default)]
pub struct Selection {
    bundles: Vec<Arc<CatalogBundle>>,
}

impl Selection {
    pub fn bundles(&self) -> &[Arc<CatalogBundle>] {
        &self.bundles
    }

    /// The selected bundle of a package. Uniqueness guarantees there is at
    /// most one.
    pub fn for_package(&self, package: &str) -> Option<&Arc<CatalogBundle>> {
        self.bundles.iter().find(|b| b.package() == package)
    }
}

#[derive(Debug, Clone)]
pub struct SolverAdapter {
    max_iterations: usize,
}

impl Default for SolverAdapter {
    fn default() -> Self {
        Self {
            max_iterations: 100_000,
        }
    }
}

impl SolverAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Solve the problem and map selected bundle variables back to bundles.
    ///
    /// An unsatisfiable problem becomes [`ControllerError::Unsatisfiable`]
    /// carrying the solver's explanation; any other solver failure becomes
    /// [`ControllerError::Solver`].
    pub fn solve(&self, variables: &[ResolutionVariable]) -> Result<Selection> {
        let problem: Vec<Variable> = variables.iter().map(|v| v.to_solver_variable()).collect();
        let solution = Solver::new(problem)
            .and_then(|solver| solver.with_max_iterations(self.max_iterations).solve())
            .map_err(|err| match err {
                SolverError::NotSatisfiable(_) => ControllerError::Unsatisfiable(err.to_string()),
                other => ControllerError::Solver(other.to_string()),
            })?;

        let bundles: Vec<Arc<CatalogBundle>> = variables
            .iter()
            .filter(|v| solution.is_selected(v.id().as_str()))
            .filter_map(|v| v.bundle().cloned())
            .collect();
        log::debug!(
            "solver selected {}",
            bundles.iter().map(|b| b.name()).collect::<Vec<_>>().join(", ")
        );
        Ok(Selection { bundles })
    }
}
