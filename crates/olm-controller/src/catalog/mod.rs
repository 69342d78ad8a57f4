//! Catalog data model.
//!
//! A [`Catalog`] is what a catalog source serves: packages, their channels,
//! the bundles that make up those channels, and deprecation notices.
//! Catalogs are flattened into an immutable [`CatalogSnapshot`] once per
//! reconcile pass.

mod properties;
mod provider;
mod snapshot;

pub use properties::{
    check_supported_dependencies, package_dependencies, PackageDependency, PROPERTY_GVK_REQUIRED,
    PROPERTY_PACKAGE, PROPERTY_PACKAGE_DEPENDENCY, PROPERTY_PACKAGE_REQUIRED, PROPERTY_CONSTRAINT,
    UNSUPPORTED_DEPENDENCY_PROPERTIES,
};
pub use provider::{CatalogProvider, InMemoryCatalogProvider};
pub use snapshot::{CatalogBundle, CatalogSnapshot, ChannelMembership};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A named provider of packages and bundles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub name: String,
    /// How often the source should be re-checked, if at all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_seconds: Option<u64>,
    #[serde(default)]
    pub packages: Vec<Package>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub bundles: Vec<Bundle>,
    #[serde(default)]
    pub deprecations: Vec<Deprecation>,
}

impl Catalog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            poll_interval_seconds: None,
            packages: Vec::new(),
            channels: Vec::new(),
            bundles: Vec::new(),
            deprecations: Vec::new(),
        }
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_seconds
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }
}

/// A logical install target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named release line within a package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub package: String,
    /// Ordered membership
    #[serde(default)]
    pub entries: Vec<ChannelEntry>,
}

/// A bundle's membership in a channel, with its upgrade edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skips: Vec<String>,
    /// Installed versions this entry upgrades directly, in the comparator
    /// range grammar
    #[serde(default, rename = "skipRange", skip_serializing_if = "Option::is_none")]
    pub skip_range: Option<String>,
}

/// One concrete installable version of a package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    /// Globally unique name
    pub name: String,
    pub package: String,
    /// Opaque content reference
    pub image: String,
    /// Raw version text; parsed when the snapshot is built
    pub version: String,
    #[serde(default)]
    pub properties: Vec<Property>,
}

/// A typed property attached to a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl Property {
    pub fn new(kind: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            value,
        }
    }
}

/// Deprecation notices for one package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deprecation {
    pub package: String,
    #[serde(default)]
    pub entries: Vec<DeprecationEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeprecationEntry {
    pub reference: DeprecationScope,
    pub message: String,
}

/// What a deprecation entry targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "schema", rename_all = "lowercase")]
pub enum DeprecationScope {
    Package,
    Channel { name: String },
    Bundle { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_catalog() {
        let json = r#"{
            "name": "operatorhub",
            "pollIntervalSeconds": 300,
            "packages": [{"name": "prometheus", "defaultChannel": "beta"}],
            "channels": [{"name": "beta", "package": "prometheus", "entries": [
                {"name": "prometheus.v1.0.0"},
                {"name": "prometheus.v1.0.1", "replaces": "prometheus.v1.0.0"}
            ]}],
            "bundles": [{
                "name": "prometheus.v1.0.0",
                "package": "prometheus",
                "image": "quay.io/operatorhubio/prometheus@sha256:abc",
                "version": "1.0.0",
                "properties": [{"type": "olm.package", "value": {"packageName": "prometheus", "version": "1.0.0"}}]
            }],
            "deprecations": [{"package": "prometheus", "entries": [
                {"reference": {"schema": "package"}, "message": "use something else"},
                {"reference": {"schema": "channel", "name": "beta"}, "message": "beta is gone"}
            ]}]
        }"#;

        let catalog: Catalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.name, "operatorhub");
        assert_eq!(catalog.poll_interval(), Some(Duration::from_secs(300)));
        assert_eq!(catalog.channels[0].entries[1].replaces.as_deref(), Some("prometheus.v1.0.0"));
        assert_eq!(catalog.bundles[0].properties[0].kind, "olm.package");
        assert_eq!(catalog.deprecations[0].entries[0].reference, DeprecationScope::Package);
        assert_eq!(
            catalog.deprecations[0].entries[1].reference,
            DeprecationScope::Channel { name: "beta".into() }
        );
    }

    #[test]
    fn test_zero_poll_interval_is_disabled() {
        let mut catalog = Catalog::new("c");
        catalog.poll_interval_seconds = Some(0);
        assert_eq!(catalog.poll_interval(), None);
    }
}
