//! Bundle resolution.
//!
//! Two resolvers pick the bundle to install for an extension:
//!
//! - [`CatalogResolver`] narrows and ranks one package's bundles and takes
//!   the first.
//! - [`GlobalResolver`] builds a constraint problem over every extension and
//!   installed bundle in the cluster and lets the solver choose a mutually
//!   consistent selection.

mod catalog;
mod global;
mod installed;

pub use catalog::{candidate_bundles, not_found_message, select, successors, CatalogResolver};
pub use global::GlobalResolver;
pub use installed::{current_installed, DeployedBundleLookup, InstalledBundle, InstalledBundleLookup, LookupError};

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use olm_semver::Version;

use crate::catalog::CatalogBundle;
use crate::error::Result;
use crate::extension::ClusterExtension;

/// The bundle chosen for an extension
#[derive(Debug, Clone)]
pub struct Resolution {
    pub bundle: Arc<CatalogBundle>,
    pub version: Version,
}

#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, ctx: &CancellationToken, extension: &ClusterExtension) -> Result<Resolution>;
}
