use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;

use olm_solver::{Constraint, Identifier};

use super::{bundle_id, installed_package_id, required_package_id, uniqueness_id, ResolutionVariable, VariableKind};
use crate::catalog::{check_supported_dependencies, package_dependencies, CatalogBundle, CatalogSnapshot};
use crate::config::UpgradeEdges;
use crate::error::{ControllerError, Result};
use crate::extension::ClusterExtension;
use crate::filter::{filter, in_version_range, sort};
use crate::resolve::{candidate_bundles, successors, InstalledBundle};

/// Builds the cluster-wide constraint problem from one catalog snapshot
pub struct VariableBuilder<'a> {
    snapshot: &'a CatalogSnapshot,
    edges: UpgradeEdges,
}

impl<'a> VariableBuilder<'a> {
    pub fn new(snapshot: &'a CatalogSnapshot) -> Self {
        Self {
            snapshot,
            edges: UpgradeEdges::default(),
        }
    }

    pub fn with_upgrade_edges(mut self, edges: UpgradeEdges) -> Self {
        self.edges = edges;
        self
    }

    /// Expand extensions and installed bundles into solver variables
    pub fn build(&self, extensions: &[ClusterExtension], installed: &[InstalledBundle]) -> Result<Vec<ResolutionVariable>> {
        let mut variables = Vec::new();
        let mut roots: Vec<Arc<CatalogBundle>> = Vec::new();

        for extension in extensions {
            let current = installed.iter().find(|i| i.owner == extension.name());
            let candidates = candidate_bundles(extension, self.snapshot, current, self.edges)?;
            variables.push(ResolutionVariable::new(
                required_package_id(&extension.spec.package_name, extension.name()),
                VariableKind::RequiredPackage {
                    extension: extension.name().to_string(),
                    package: extension.spec.package_name.clone(),
                },
                vec![
                    Constraint::Mandatory,
                    Constraint::dependency(candidates.iter().map(|b| bundle_id(b))),
                ],
            ));
            roots.extend(candidates);
        }

        for bundle in installed {
            let requested = extensions
                .iter()
                .any(|e| e.name() == bundle.owner || e.spec.package_name == bundle.package);
            if requested {
                continue;
            }
            let candidates = self.installed_successors(bundle)?;
            variables.push(ResolutionVariable::new(
                installed_package_id(&bundle.package),
                VariableKind::InstalledPackage {
                    package: bundle.package.clone(),
                },
                vec![
                    Constraint::Mandatory,
                    Constraint::dependency(candidates.iter().map(|b| bundle_id(b))),
                ],
            ));
            roots.extend(candidates);
        }

        let bundle_variables = self.bundle_variables(roots)?;
        let uniqueness = Self::uniqueness_variables(&bundle_variables);
        variables.extend(bundle_variables);
        variables.extend(uniqueness);

        log::debug!("built {} resolution variables", variables.len());
        Ok(variables)
    }

    /// The installed bundle and its successors, best first
    fn installed_successors(&self, installed: &InstalledBundle) -> Result<Vec<Arc<CatalogBundle>>> {
        let bundles = self.snapshot.validated_package_bundles(&installed.package)?;
        let mut candidates = filter(&bundles, &successors(self.edges, installed));
        sort::rank(&mut candidates);
        Ok(candidates)
    }

    /// One variable per bundle reachable from the roots through declared
    /// dependencies, in discovery order
    fn bundle_variables(&self, roots: Vec<Arc<CatalogBundle>>) -> Result<Vec<ResolutionVariable>> {
        let mut seen: HashSet<Identifier> = HashSet::new();
        let mut queue: VecDeque<Arc<CatalogBundle>> = VecDeque::new();
        for bundle in roots {
            if seen.insert(bundle_id(&bundle)) {
                queue.push_back(bundle);
            }
        }

        let mut variables = Vec::new();
        while let Some(bundle) = queue.pop_front() {
            check_supported_dependencies(&bundle.bundle)?;

            let mut constraints = Vec::new();
            for dependency in package_dependencies(&bundle.bundle)? {
                let bundles = self.snapshot.validated_package_bundles(&dependency.package_name)?;
                let mut matches = filter(&bundles, &in_version_range(Arc::new(dependency.version_range)));
                if matches.is_empty() {
                    return Err(ControllerError::MissingDependency(bundle.name().to_string()));
                }
                sort::by_version(&mut matches);

                constraints.push(Constraint::dependency(matches.iter().map(|b| bundle_id(b))));
                for m in matches {
                    if seen.insert(bundle_id(&m)) {
                        queue.push_back(m);
                    }
                }
            }

            variables.push(ResolutionVariable::new(
                bundle_id(&bundle),
                VariableKind::Bundle(bundle),
                constraints,
            ));
        }
        Ok(variables)
    }

    /// At most one selected bundle per package, packages in first-seen order
    fn uniqueness_variables(bundles: &[ResolutionVariable]) -> Vec<ResolutionVariable> {
        let mut by_package: IndexMap<String, Vec<Identifier>> = IndexMap::new();
        for variable in bundles {
            if let Some(bundle) = variable.bundle() {
                by_package
                    .entry(bundle.package().to_string())
                    .or_default()
                    .push(variable.id().clone());
            }
        }

        by_package
            .into_iter()
            .map(|(package, ids)| {
                ResolutionVariable::new(
                    uniqueness_id(&package),
                    VariableKind::BundleUniqueness { package },
                    vec![Constraint::at_most(1, ids)],
                )
            })
            .collect()
    }
}
