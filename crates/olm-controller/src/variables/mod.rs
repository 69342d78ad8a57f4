//! Constraint problem construction for cluster-wide resolution.
//!
//! [`VariableBuilder`] expands every extension, every installed bundle and
//! every reachable catalog bundle into [`ResolutionVariable`]s. The output
//! order is fixed: required packages, installed packages, bundles, then
//! per-package uniqueness. Identifiers are derived from names only, so the
//! same inputs always produce the same problem.

mod builder;

pub use builder::VariableBuilder;

use std::sync::Arc;

use olm_solver::{Constraint, Identifier, Variable};

use crate::catalog::CatalogBundle;

/// What a variable stands for
#[derive(Debug, Clone)]
pub enum VariableKind {
    /// An extension's package must be installed
    RequiredPackage { extension: String, package: String },
    /// A package already installed outside of any extension's request
    InstalledPackage { package: String },
    /// One catalog bundle
    Bundle(Arc<CatalogBundle>),
    /// At most one bundle of a package may be selected
    BundleUniqueness { package: String },
}

#[derive(Debug, Clone)]
pub struct ResolutionVariable {
    id: Identifier,
    kind: VariableKind,
    constraints: Vec<Constraint>,
}

impl ResolutionVariable {
    pub fn new(id: impl Into<Identifier>, kind: VariableKind, constraints: Vec<Constraint>) -> Self {
        Self {
            id: id.into(),
            kind,
            constraints,
        }
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn kind(&self) -> &VariableKind {
        &self.kind
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn bundle(&self) -> Option<&Arc<CatalogBundle>> {
        match &self.kind {
            VariableKind::Bundle(bundle) => Some(bundle),
            _ => None,
        }
    }

    pub fn to_solver_variable(&self) -> Variable {
        Variable::new(self.id.clone()).with_constraints(self.constraints.iter().cloned())
    }
}

pub fn required_package_id(package: &str, extension: &str) -> Identifier {
    Identifier::new(format!("required package {} for {}", package, extension))
}

pub fn installed_package_id(package: &str) -> Identifier {
    Identifier::new(format!("installed package {}", package))
}

pub fn bundle_id(bundle: &CatalogBundle) -> Identifier {
    Identifier::new(format!("{}-{}-{}", bundle.catalog, bundle.package(), bundle.name()))
}

pub fn uniqueness_id(package: &str) -> Identifier {
    Identifier::new(format!("{} package uniqueness", package))
}
