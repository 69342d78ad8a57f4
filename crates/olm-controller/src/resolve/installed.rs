use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use olm_semver::Version;

use crate::apply::{label_key, ApplySink, LABEL_BUNDLE_NAME, LABEL_BUNDLE_VERSION, LABEL_OWNER_NAME, LABEL_PACKAGE_NAME};
use crate::context::cancellable;
use crate::error::{ControllerError, Result};

/// A bundle currently deployed for an extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBundle {
    /// Name of the extension owning the deployment
    pub owner: String,
    pub package: String,
    pub bundle_name: String,
    pub version: Version,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Nothing is installed; a first install
    #[error("no installed bundle")]
    NotFound,

    #[error("{0}")]
    Failed(String),
}

impl From<LookupError> for ControllerError {
    fn from(err: LookupError) -> Self {
        ControllerError::InstalledLookup(err.to_string())
    }
}

/// Source of what is currently installed
#[async_trait]
pub trait InstalledBundleLookup: Send + Sync {
    async fn current(&self, install_id: &str) -> std::result::Result<InstalledBundle, LookupError>;

    /// Every installed bundle, cluster-wide
    async fn list(&self) -> std::result::Result<Vec<InstalledBundle>, LookupError>;
}

/// The installed bundle for an extension, or `None` on a first install
pub async fn current_installed(
    ctx: &CancellationToken,
    lookup: &dyn InstalledBundleLookup,
    install_id: &str,
) -> Result<Option<InstalledBundle>> {
    cancellable(ctx, async {
        match lookup.current(install_id).await {
            Ok(installed) => Ok(Some(installed)),
            Err(LookupError::NotFound) => Ok(None),
            Err(err) => Err(err.into()),
        }
    })
    .await
}

/// Reads installed bundles from the identity labels stamped on deployed
/// objects
pub struct DeployedBundleLookup {
    sink: Arc<dyn ApplySink>,
    label_prefix: String,
}

impl DeployedBundleLookup {
    pub fn new(sink: Arc<dyn ApplySink>, label_prefix: impl Into<String>) -> Self {
        Self {
            sink,
            label_prefix: label_prefix.into(),
        }
    }

    fn label<'a>(&self, object: &'a Value, name: &str) -> Option<&'a str> {
        object
            .pointer("/metadata/labels")
            .and_then(|labels| labels.get(label_key(&self.label_prefix, name)))
            .and_then(Value::as_str)
    }

    /// `None` for objects carrying no bundle identity
    fn from_object(&self, object: &Value) -> std::result::Result<Option<InstalledBundle>, LookupError> {
        let (owner, package, bundle_name, version) = match (
            self.label(object, LABEL_OWNER_NAME),
            self.label(object, LABEL_PACKAGE_NAME),
            self.label(object, LABEL_BUNDLE_NAME),
            self.label(object, LABEL_BUNDLE_VERSION),
        ) {
            (Some(o), Some(p), Some(b), Some(v)) => (o, p, b, v),
            _ => return Ok(None),
        };
        let version = Version::parse(version)
            .map_err(|e| LookupError::Failed(format!("installed bundle {:?}: {}", bundle_name, e)))?;
        Ok(Some(InstalledBundle {
            owner: owner.to_string(),
            package: package.to_string(),
            bundle_name: bundle_name.to_string(),
            version,
        }))
    }
}

#[async_trait]
impl InstalledBundleLookup for DeployedBundleLookup {
    async fn current(&self, install_id: &str) -> std::result::Result<InstalledBundle, LookupError> {
        let object = self
            .sink
            .get(install_id)
            .await
            .map_err(|e| LookupError::Failed(e.to_string()))?
            .ok_or(LookupError::NotFound)?;
        self.from_object(&object)?.ok_or(LookupError::NotFound)
    }

    async fn list(&self) -> std::result::Result<Vec<InstalledBundle>, LookupError> {
        let objects = self.sink.list().await.map_err(|e| LookupError::Failed(e.to_string()))?;
        let mut installed = Vec::new();
        for object in &objects {
            if let Some(bundle) = self.from_object(object)? {
                installed.push(bundle);
            }
        }
        Ok(installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::InMemoryApplySink;
    use serde_json::json;

    const PREFIX: &str = "olm.operatorframework.io";

    fn deployed(owner: &str, package: &str, bundle: &str, version: &str) -> Value {
        json!({
            "metadata": {
                "name": owner,
                "labels": {
                    "olm.operatorframework.io/owner-name": owner,
                    "olm.operatorframework.io/package-name": package,
                    "olm.operatorframework.io/bundle-name": bundle,
                    "olm.operatorframework.io/bundle-version": version,
                }
            }
        })
    }

    #[tokio::test]
    async fn test_current() {
        let sink = Arc::new(InMemoryApplySink::new());
        sink.insert("argo", deployed("argo", "argocd", "argocd.v0.38.0", "0.38.0")).await;
        let lookup = DeployedBundleLookup::new(sink, PREFIX);

        let installed = lookup.current("argo").await.unwrap();
        assert_eq!(installed.package, "argocd");
        assert_eq!(installed.version, Version::new(0, 38, 0));
        assert_eq!(lookup.current("other").await.unwrap_err(), LookupError::NotFound);
    }

    #[tokio::test]
    async fn test_unlabelled_object_is_not_installed() {
        let sink = Arc::new(InMemoryApplySink::new());
        sink.insert("bare", json!({"metadata": {"name": "bare"}})).await;
        let lookup = DeployedBundleLookup::new(sink, PREFIX);
        assert_eq!(lookup.current("bare").await.unwrap_err(), LookupError::NotFound);
        assert!(lookup.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_version_fails() {
        let sink = Arc::new(InMemoryApplySink::new());
        sink.insert("x", deployed("x", "p", "p.vbad", "bad")).await;
        let lookup = DeployedBundleLookup::new(sink, PREFIX);
        assert!(matches!(lookup.current("x").await, Err(LookupError::Failed(_))));

        let ctx = CancellationToken::new();
        let err = current_installed(&ctx, &lookup, "x").await.unwrap_err();
        assert!(matches!(err, ControllerError::InstalledLookup(_)));
    }

    #[tokio::test]
    async fn test_current_installed_not_found_is_none() {
        let lookup = DeployedBundleLookup::new(Arc::new(InMemoryApplySink::new()), PREFIX);
        let ctx = CancellationToken::new();
        assert!(current_installed(&ctx, &lookup, "x").await.unwrap().is_none());
    }
}
