use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{not_found_message, InstalledBundleLookup, Resolution, Resolver};
use crate::catalog::{check_supported_dependencies, CatalogProvider};
use crate::config::UpgradeEdges;
use crate::context::cancellable;
use crate::error::{ControllerError, Result};
use crate::extension::ClusterExtension;
use crate::solve::SolverAdapter;
use crate::store::ExtensionStore;
use crate::variables::VariableBuilder;

/// Resolves an extension as part of one consistent selection over every
/// extension and installed bundle in the cluster
pub struct GlobalResolver {
    catalogs: Arc<dyn CatalogProvider>,
    installed: Arc<dyn InstalledBundleLookup>,
    extensions: Arc<dyn ExtensionStore>,
    adapter: SolverAdapter,
    edges: UpgradeEdges,
}

impl GlobalResolver {
    pub fn new(
        catalogs: Arc<dyn CatalogProvider>,
        installed: Arc<dyn InstalledBundleLookup>,
        extensions: Arc<dyn ExtensionStore>,
    ) -> Self {
        Self {
            catalogs,
            installed,
            extensions,
            adapter: SolverAdapter::new(),
            edges: UpgradeEdges::default(),
        }
    }

    pub fn with_adapter(mut self, adapter: SolverAdapter) -> Self {
        self.adapter = adapter;
        self
    }

    pub fn with_upgrade_edges(mut self, edges: UpgradeEdges) -> Self {
        self.edges = edges;
        self
    }
}

#[async_trait]
impl Resolver for GlobalResolver {
    async fn resolve(&self, ctx: &CancellationToken, extension: &ClusterExtension) -> Result<Resolution> {
        let snapshot = cancellable(ctx, self.catalogs.list_bundles()).await?;
        let mut extensions = cancellable(ctx, self.extensions.list()).await?;
        let installed = cancellable(ctx, async {
            self.installed.list().await.map_err(ControllerError::from)
        })
        .await?;

        // resolve against the object as given, not the stored copy
        match extensions.iter_mut().find(|e| e.name() == extension.name()) {
            Some(stored) => *stored = extension.clone(),
            None => extensions.push(extension.clone()),
        }

        let variables = VariableBuilder::new(&snapshot)
            .with_upgrade_edges(self.edges)
            .build(&extensions, &installed)?;
        let selection = self.adapter.solve(&variables)?;

        let bundle = selection
            .for_package(&extension.spec.package_name)
            .cloned()
            .ok_or_else(|| ControllerError::NoMatchingBundle(not_found_message(extension, None)))?;
        check_supported_dependencies(&bundle.bundle)?;
        let version = bundle.parsed_version()?.clone();
        log::info!("solver resolved {} to {}", extension.name(), bundle.name());
        Ok(Resolution { bundle, version })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::InMemoryApplySink;
    use crate::catalog::{Bundle, Catalog, InMemoryCatalogProvider, Property, PROPERTY_PACKAGE_DEPENDENCY};
    use crate::error::ErrorKind;
    use crate::resolve::DeployedBundleLookup;
    use crate::store::InMemoryExtensionStore;
    use serde_json::json;

    fn bundle(package: &str, version: &str, properties: Vec<Property>) -> Bundle {
        Bundle {
            name: format!("{}.v{}", package, version),
            package: package.to_string(),
            image: format!("quay.io/{}:v{}", package, version),
            version: version.to_string(),
            properties,
        }
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new("main");
        catalog.bundles = vec![
            bundle(
                "app",
                "2.0.0",
                vec![Property::new(
                    PROPERTY_PACKAGE_DEPENDENCY,
                    json!({"packageName": "lib", "versionRange": "^2.0.0"}),
                )],
            ),
            bundle(
                "app",
                "1.0.0",
                vec![Property::new(
                    PROPERTY_PACKAGE_DEPENDENCY,
                    json!({"packageName": "lib", "versionRange": "^1.0.0"}),
                )],
            ),
            bundle("lib", "1.0.0", vec![]),
            bundle("lib", "2.0.0", vec![]),
        ];
        catalog
    }

    async fn resolver(store: Arc<InMemoryExtensionStore>) -> GlobalResolver {
        GlobalResolver::new(
            Arc::new(InMemoryCatalogProvider::new(&[catalog()]).unwrap()),
            Arc::new(DeployedBundleLookup::new(
                Arc::new(InMemoryApplySink::new()),
                "olm.operatorframework.io",
            )),
            store,
        )
    }

    #[tokio::test]
    async fn test_resolves_highest_consistent_bundle() {
        let store = Arc::new(InMemoryExtensionStore::new());
        let r = resolver(Arc::clone(&store)).await;
        let ctx = CancellationToken::new();
        let resolution = r.resolve(&ctx, &ClusterExtension::new("app", "app")).await.unwrap();
        assert_eq!(resolution.bundle.name(), "app.v2.0.0");
    }

    #[tokio::test]
    async fn test_other_extensions_constrain_the_selection() {
        let store = Arc::new(InMemoryExtensionStore::new());
        store
            .insert(ClusterExtension::new("lib", "lib").with_version("1.0.0"))
            .await;
        let r = resolver(Arc::clone(&store)).await;
        let ctx = CancellationToken::new();
        let resolution = r.resolve(&ctx, &ClusterExtension::new("app", "app")).await.unwrap();
        assert_eq!(resolution.bundle.name(), "app.v1.0.0");
    }

    #[tokio::test]
    async fn test_conflicting_extensions_are_unsatisfiable() {
        let store = Arc::new(InMemoryExtensionStore::new());
        store
            .insert(ClusterExtension::new("lib", "lib").with_version("1.0.0"))
            .await;
        let r = resolver(Arc::clone(&store)).await;
        let ctx = CancellationToken::new();
        let err = r
            .resolve(&ctx, &ClusterExtension::new("app", "app").with_version("2.0.0"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsatisfiable);
        assert!(err.to_string().starts_with("constraints not satisfiable"));
    }
}
