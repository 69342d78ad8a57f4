use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use olm_semver::VersionRange;

use super::{current_installed, InstalledBundle, InstalledBundleLookup, Resolution, Resolver};
use crate::catalog::{check_supported_dependencies, CatalogBundle, CatalogProvider, CatalogSnapshot};
use crate::config::UpgradeEdges;
use crate::context::cancellable;
use crate::error::{ControllerError, Result};
use crate::extension::{ClusterExtension, UpgradeConstraintPolicy};
use crate::filter::{
    and, filter, in_channel, in_version_range, legacy_successors, semver_successors, sort, with_package_name, Predicate,
};

/// Human readable explanation of an empty candidate set, naming every
/// active clause
pub fn not_found_message(extension: &ClusterExtension, upgrade_from: Option<&InstalledBundle>) -> String {
    let spec = &extension.spec;
    let mut message = format!("no package {:?}", spec.package_name);
    if let Some(version) = &spec.version {
        message.push_str(&format!(" matching version {:?}", version));
    }
    if let Some(installed) = upgrade_from {
        message.push_str(&format!(
            " which upgrades currently installed version {:?}",
            installed.version.to_string()
        ));
    }
    message.push_str(" found");
    if let Some(channel) = &spec.channel {
        message.push_str(&format!(" in channel {:?}", channel));
    }
    message
}

/// Bundles acceptable as an upgrade from `installed`, the installed version
/// included
pub fn successors(edges: UpgradeEdges, installed: &InstalledBundle) -> Predicate<CatalogBundle> {
    match edges {
        UpgradeEdges::Semver => semver_successors(&installed.version),
        UpgradeEdges::Legacy => legacy_successors(&installed.bundle_name, &installed.version),
    }
}

/// Bundles of the requested package satisfying every active constraint,
/// best first.
///
/// The upgrade constraint applies only under the `Enforce` policy and only
/// when the installed bundle belongs to the requested package.
pub fn candidate_bundles(
    extension: &ClusterExtension,
    snapshot: &CatalogSnapshot,
    installed: Option<&InstalledBundle>,
    edges: UpgradeEdges,
) -> Result<Vec<Arc<CatalogBundle>>> {
    let spec = &extension.spec;
    let mut predicates: Vec<Predicate<CatalogBundle>> = vec![with_package_name(&spec.package_name)];

    if let Some(channel) = &spec.channel {
        predicates.push(in_channel(channel));
    }
    if let Some(version) = &spec.version {
        predicates.push(in_version_range(Arc::new(VersionRange::parse(version)?)));
    }

    let upgrade_from = installed.filter(|i| {
        spec.upgrade_constraint_policy == UpgradeConstraintPolicy::Enforce && i.package == spec.package_name
    });
    if let Some(installed) = upgrade_from {
        log::debug!(
            "restricting {} to {:?} successors of installed bundle {} {}",
            spec.package_name,
            edges,
            installed.bundle_name,
            installed.version
        );
        predicates.push(successors(edges, installed));
    }

    let bundles = snapshot.validated_package_bundles(&spec.package_name)?;
    let mut candidates = filter(&bundles, &and(predicates));
    if candidates.is_empty() {
        return Err(ControllerError::NoMatchingBundle(not_found_message(extension, upgrade_from)));
    }

    sort::rank(&mut candidates);
    log::debug!(
        "found {} candidate(s) for {}: {}",
        candidates.len(),
        extension.name(),
        candidates.iter().map(|b| b.name()).collect::<Vec<_>>().join(", ")
    );
    Ok(candidates)
}

/// Pick the single best bundle for an extension
pub fn select(
    extension: &ClusterExtension,
    snapshot: &CatalogSnapshot,
    installed: Option<&InstalledBundle>,
    edges: UpgradeEdges,
) -> Result<Resolution> {
    let candidates = candidate_bundles(extension, snapshot, installed, edges)?;
    let bundle = Arc::clone(&candidates[0]);
    check_supported_dependencies(&bundle.bundle)?;
    let version = bundle.parsed_version()?.clone();
    Ok(Resolution { bundle, version })
}

/// Resolves each extension on its own against the catalog
pub struct CatalogResolver {
    catalogs: Arc<dyn CatalogProvider>,
    installed: Arc<dyn InstalledBundleLookup>,
    edges: UpgradeEdges,
}

impl CatalogResolver {
    pub fn new(catalogs: Arc<dyn CatalogProvider>, installed: Arc<dyn InstalledBundleLookup>) -> Self {
        Self {
            catalogs,
            installed,
            edges: UpgradeEdges::default(),
        }
    }

    pub fn with_upgrade_edges(mut self, edges: UpgradeEdges) -> Self {
        self.edges = edges;
        self
    }
}

#[async_trait]
impl Resolver for CatalogResolver {
    async fn resolve(&self, ctx: &CancellationToken, extension: &ClusterExtension) -> Result<Resolution> {
        let installed = match extension.spec.upgrade_constraint_policy {
            UpgradeConstraintPolicy::Enforce => {
                current_installed(ctx, self.installed.as_ref(), extension.name()).await?
            }
            UpgradeConstraintPolicy::Ignore => None,
        };
        let snapshot = cancellable(ctx, self.catalogs.list_bundles()).await?;
        select(extension, &snapshot, installed.as_ref(), self.edges)
    }
}
