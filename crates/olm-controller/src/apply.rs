//! Deployed representation of an installed bundle.
//!
//! The controller renders the object it wants deployed as plain JSON and
//! hands it to an [`ApplySink`]. Nothing is written when the deployed object
//! already contains everything the desired one specifies.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

use crate::catalog::CatalogBundle;
use crate::error::{ControllerError, Result};
use crate::extension::ClusterExtension;
use crate::source::UnpackResult;

pub const LABEL_OWNER_NAME: &str = "owner-name";
pub const LABEL_PACKAGE_NAME: &str = "package-name";
pub const LABEL_BUNDLE_NAME: &str = "bundle-name";
pub const LABEL_BUNDLE_VERSION: &str = "bundle-version";

/// Qualified label key, e.g. `olm.operatorframework.io/bundle-name`
pub fn label_key(prefix: &str, name: &str) -> String {
    format!("{}/{}", prefix, name)
}

#[async_trait]
pub trait ApplySink: Send + Sync {
    /// Currently deployed object for an extension
    async fn get(&self, name: &str) -> Result<Option<Value>>;

    async fn list(&self) -> Result<Vec<Value>>;

    /// Apply the desired object, returning what is deployed afterwards
    async fn apply(&self, desired: &Value) -> Result<Value>;
}

/// Render the object to deploy for an extension and its resolved bundle
pub fn desired_deployment(
    extension: &ClusterExtension,
    bundle: &CatalogBundle,
    unpack: &UnpackResult,
    label_prefix: &str,
) -> Value {
    let mut labels = Map::new();
    labels.insert(label_key(label_prefix, LABEL_OWNER_NAME), json!(extension.name()));
    labels.insert(label_key(label_prefix, LABEL_PACKAGE_NAME), json!(bundle.package()));
    labels.insert(label_key(label_prefix, LABEL_BUNDLE_NAME), json!(bundle.name()));
    labels.insert(
        label_key(label_prefix, LABEL_BUNDLE_VERSION),
        json!(bundle.bundle.version),
    );

    json!({
        "kind": "BundleDeployment",
        "metadata": {
            "name": extension.name(),
            "labels": labels,
        },
        "spec": {
            "installNamespace": extension.spec.install_namespace,
            "serviceAccountName": extension.spec.service_account,
            "source": {
                "image": bundle.image(),
                "content": unpack.content,
            },
        },
    })
}

/// Whether `existing` already contains everything `desired` specifies.
///
/// Null values, empty maps and empty arrays in `desired` count as unset and
/// match anything. Fields only present in `existing` are ignored.
pub fn deep_derivative(desired: &Value, existing: &Value) -> bool {
    match (desired, existing) {
        (Value::Null, _) => true,
        (Value::Object(d), _) if d.is_empty() => true,
        (Value::Array(d), _) if d.is_empty() => true,
        (Value::Object(d), Value::Object(e)) => d
            .iter()
            .all(|(k, v)| deep_derivative(v, e.get(k).unwrap_or(&Value::Null))),
        (Value::Array(d), Value::Array(e)) => {
            d.len() == e.len() && d.iter().zip(e).all(|(dv, ev)| deep_derivative(dv, ev))
        }
        (d, e) => d == e,
    }
}

/// Health of a deployed object as reported by its own status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployedState {
    Succeeded,
    Reconciling,
    Failed(String),
    /// No status the controller can interpret
    Unobservable,
}

impl DeployedState {
    /// Read `status.conditions`; a failure outranks an in-progress
    /// reconcile, which outranks success
    pub fn from_deployed(deployed: &Value) -> Self {
        let conditions = match deployed.pointer("/status/conditions").and_then(Value::as_array) {
            Some(c) => c,
            None => return DeployedState::Unobservable,
        };
        let active = |kind: &str| {
            conditions.iter().find(|c| {
                c.get("type").and_then(Value::as_str) == Some(kind)
                    && c.get("status").and_then(Value::as_str) == Some("True")
            })
        };

        if let Some(failed) = active("ReconcileFailed") {
            let message = failed.get("message").and_then(Value::as_str).unwrap_or_default();
            DeployedState::Failed(message.to_string())
        } else if active("Reconciling").is_some() {
            DeployedState::Reconciling
        } else if active("ReconcileSucceeded").is_some() {
            DeployedState::Succeeded
        } else {
            DeployedState::Unobservable
        }
    }
}

/// Sink keeping deployed objects in memory.
///
/// Applying merges the desired object over the existing one, keeping any
/// `status` set through [`InMemoryApplySink::set_status`].
#[derive(Debug, Default)]
pub struct InMemoryApplySink {
    objects: RwLock<BTreeMap<String, Value>>,
    failure: RwLock<Option<ControllerError>>,
    applies: AtomicUsize,
}

impl InMemoryApplySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following apply fail with `error`, or succeed again with
    /// `None`
    pub async fn fail_with(&self, error: Option<ControllerError>) {
        *self.failure.write().await = error;
    }

    /// Simulate the deployed object reporting its own status
    pub async fn set_status(&self, name: &str, status: Value) {
        if let Some(Value::Object(object)) = self.objects.write().await.get_mut(name) {
            object.insert("status".to_string(), status);
        }
    }

    pub async fn insert(&self, name: impl Into<String>, object: Value) {
        self.objects.write().await.insert(name.into(), object);
    }

    /// Number of writes performed
    pub fn applies(&self) -> usize {
        self.applies.load(Ordering::SeqCst)
    }
}

fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(t), Value::Object(p)) => {
            for (k, v) in p {
                merge(t.entry(k.clone()).or_insert(Value::Null), v);
            }
        }
        (t, p) => *t = p.clone(),
    }
}

#[async_trait]
impl ApplySink for InMemoryApplySink {
    async fn get(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.objects.read().await.get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<Value>> {
        Ok(self.objects.read().await.values().cloned().collect())
    }

    async fn apply(&self, desired: &Value) -> Result<Value> {
        if let Some(err) = self.failure.read().await.clone() {
            return Err(err);
        }
        let name = desired
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .ok_or_else(|| ControllerError::Apply("desired object has no metadata.name".to_string()))?
            .to_string();

        let mut objects = self.objects.write().await;
        let object = objects.entry(name).or_insert_with(|| json!({}));
        merge(object, desired);
        self.applies.fetch_add(1, Ordering::SeqCst);
        Ok(object.clone())
    }
}
