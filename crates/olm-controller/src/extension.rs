//! The extension object: a user's declared intent to install one package.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::conditions::Condition;

/// Identity of an extension in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub name: String,
}

impl ObjectKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    /// Incremented by the store on every spec change
    #[serde(default)]
    pub generation: i64,
    /// Optimistic concurrency token, bumped on every write
    #[serde(default)]
    pub resource_version: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finalizers: Vec<String>,
}

/// Whether resolution must stay on the installed bundle's successor line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeConstraintPolicy {
    #[default]
    Enforce,
    Ignore,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionSpec {
    pub package_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Version range in the comparator grammar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub upgrade_constraint_policy: UpgradeConstraintPolicy,
    #[serde(default)]
    pub install_namespace: String,
    #[serde(default)]
    pub service_account: String,
    #[serde(default)]
    pub paused: bool,
}

/// Identity of a resolved or installed bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_bundle: Option<BundleMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_bundle: Option<BundleMetadata>,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// A desired install of one package
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterExtension {
    pub metadata: ObjectMeta,
    pub spec: ExtensionSpec,
    #[serde(default)]
    pub status: ExtensionStatus,
}

/// The part of an extension a reconcile pass must never change
#[derive(Debug, PartialEq)]
pub struct ImmutableView<'a> {
    name: &'a str,
    generation: i64,
    labels: &'a BTreeMap<String, String>,
    annotations: &'a BTreeMap<String, String>,
    spec: &'a ExtensionSpec,
}

impl ClusterExtension {
    pub fn new(name: impl Into<String>, package_name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            metadata: ObjectMeta {
                name: name.clone(),
                generation: 1,
                ..Default::default()
            },
            spec: ExtensionSpec {
                package_name: package_name.into(),
                install_namespace: name,
                ..Default::default()
            },
            status: ExtensionStatus::default(),
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.spec.channel = Some(channel.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.spec.version = Some(version.into());
        self
    }

    pub fn with_upgrade_constraint_policy(mut self, policy: UpgradeConstraintPolicy) -> Self {
        self.spec.upgrade_constraint_policy = policy;
        self
    }

    pub fn with_paused(mut self, paused: bool) -> Self {
        self.spec.paused = paused;
        self
    }

    pub fn with_generation(mut self, generation: i64) -> Self {
        self.metadata.generation = generation;
        self
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.metadata.name)
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Identity and spec, excluding status, finalizers and the resource
    /// version
    pub fn immutable_view(&self) -> ImmutableView<'_> {
        ImmutableView {
            name: &self.metadata.name,
            generation: self.metadata.generation,
            labels: &self.metadata.labels,
            annotations: &self.metadata.annotations,
            spec: &self.spec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ext = ClusterExtension::new("prometheus", "prometheus-operator");
        assert_eq!(ext.metadata.generation, 1);
        assert_eq!(ext.spec.upgrade_constraint_policy, UpgradeConstraintPolicy::Enforce);
        assert_eq!(ext.spec.install_namespace, "prometheus");
        assert_eq!(ext.key(), ObjectKey::new("prometheus"));
    }

    #[test]
    fn test_immutable_view_ignores_status_and_finalizers() {
        let a = ClusterExtension::new("ext", "pkg").with_channel("stable");
        let mut b = a.clone();
        b.metadata.finalizers.push("cleanup".into());
        b.metadata.resource_version = 42;
        b.status.paused = true;
        assert_eq!(a.immutable_view(), b.immutable_view());

        b.spec.version = Some("1.0.0".into());
        assert_ne!(a.immutable_view(), b.immutable_view());
    }

    #[test]
    fn test_deserialize() {
        let json = r#"{
            "metadata": {"name": "argo", "generation": 3},
            "spec": {"packageName": "argocd-operator", "version": ">=0.6", "upgradeConstraintPolicy": "Ignore"}
        }"#;
        let ext: ClusterExtension = serde_json::from_str(json).unwrap();
        assert_eq!(ext.metadata.generation, 3);
        assert_eq!(ext.spec.version.as_deref(), Some(">=0.6"));
        assert_eq!(ext.spec.upgrade_constraint_policy, UpgradeConstraintPolicy::Ignore);
        assert!(ext.status.conditions.is_empty());
    }
}
