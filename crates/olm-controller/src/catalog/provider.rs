use std::sync::Arc;

use async_trait::async_trait;

use super::{Catalog, CatalogSnapshot};
use crate::error::Result;

/// Source of catalog contents.
///
/// Every call returns a fully materialized snapshot.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn list_bundles(&self) -> Result<Arc<CatalogSnapshot>>;
}

/// Provider serving a fixed set of catalogs
#[derive(Debug, Clone)]
pub struct InMemoryCatalogProvider {
    snapshot: Arc<CatalogSnapshot>,
}

impl InMemoryCatalogProvider {
    pub fn new(catalogs: &[Catalog]) -> Result<Self> {
        Ok(Self {
            snapshot: Arc::new(CatalogSnapshot::from_catalogs(catalogs)?),
        })
    }

    pub fn from_snapshot(snapshot: Arc<CatalogSnapshot>) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl CatalogProvider for InMemoryCatalogProvider {
    async fn list_bundles(&self) -> Result<Arc<CatalogSnapshot>> {
        Ok(Arc::clone(&self.snapshot))
    }
}
