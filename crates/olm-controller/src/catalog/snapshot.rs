use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use olm_semver::{Version, VersionError};

use super::{Bundle, Catalog, DeprecationEntry, DeprecationScope};
use crate::error::{ControllerError, Result};

/// A bundle's place in one channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMembership {
    pub channel: String,
    pub replaces: Option<String>,
    pub skips: Vec<String>,
    pub skip_range: Option<String>,
}

/// A bundle as seen by resolution: the bundle plus everything the snapshot
/// knows about it.
#[derive(Debug, Clone)]
pub struct CatalogBundle {
    pub catalog: String,
    pub bundle: Bundle,
    /// Channels containing this bundle, in catalog order
    pub channels: Vec<ChannelMembership>,
    /// Deprecation entries that apply to this bundle through any scope
    pub deprecations: Vec<DeprecationEntry>,
    pub poll_interval: Option<Duration>,
    version: std::result::Result<Version, VersionError>,
}

impl CatalogBundle {
    pub fn name(&self) -> &str {
        &self.bundle.name
    }

    pub fn package(&self) -> &str {
        &self.bundle.package
    }

    pub fn image(&self) -> &str {
        &self.bundle.image
    }

    /// The parsed version, if it is a valid semantic version
    pub fn semver(&self) -> Option<&Version> {
        self.version.as_ref().ok()
    }

    /// The parsed version, or an error naming the bundle and its raw version
    pub fn parsed_version(&self) -> Result<&Version> {
        self.version
            .as_ref()
            .map_err(|e| ControllerError::InvalidBundleVersion {
                bundle: self.bundle.name.clone(),
                version: self.bundle.version.clone(),
                reason: e.to_string(),
            })
    }

    pub fn in_channel(&self, channel: &str) -> bool {
        self.channels.iter().any(|m| m.channel == channel)
    }

    /// Whether a bundle-scoped deprecation entry targets this bundle
    pub fn is_deprecated(&self) -> bool {
        self.deprecations
            .iter()
            .any(|d| matches!(&d.reference, DeprecationScope::Bundle { name } if *name == self.bundle.name))
    }
}

/// Immutable, flattened view over one or more catalogs.
///
/// Built once per pass and shared by reference; nothing mutates it.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    bundles: Vec<Arc<CatalogBundle>>,
}

impl CatalogSnapshot {
    /// Flatten catalogs, attaching channel membership and deprecations to
    /// each bundle. Duplicate package or bundle names within a catalog are
    /// rejected.
    pub fn from_catalogs(catalogs: &[Catalog]) -> Result<Self> {
        let mut bundles = Vec::new();

        for catalog in catalogs {
            let invalid = |reason: String| ControllerError::InvalidCatalog {
                catalog: catalog.name.clone(),
                reason,
            };

            let mut packages = HashSet::new();
            for package in &catalog.packages {
                if !packages.insert(package.name.as_str()) {
                    return Err(invalid(format!("duplicate package {:?}", package.name)));
                }
            }

            let mut names = HashSet::new();
            for bundle in &catalog.bundles {
                if !names.insert(bundle.name.as_str()) {
                    return Err(invalid(format!("duplicate bundle {:?}", bundle.name)));
                }
            }

            for bundle in &catalog.bundles {
                let channels: Vec<ChannelMembership> = catalog
                    .channels
                    .iter()
                    .filter(|c| c.package == bundle.package)
                    .filter_map(|c| {
                        c.entries.iter().find(|e| e.name == bundle.name).map(|e| ChannelMembership {
                            channel: c.name.clone(),
                            replaces: e.replaces.clone(),
                            skips: e.skips.clone(),
                            skip_range: e.skip_range.clone(),
                        })
                    })
                    .collect();

                let deprecations: Vec<DeprecationEntry> = catalog
                    .deprecations
                    .iter()
                    .filter(|d| d.package == bundle.package)
                    .flat_map(|d| d.entries.iter())
                    .filter(|entry| match &entry.reference {
                        DeprecationScope::Package => true,
                        DeprecationScope::Channel { name } => channels.iter().any(|m| m.channel == *name),
                        DeprecationScope::Bundle { name } => *name == bundle.name,
                    })
                    .cloned()
                    .collect();

                bundles.push(Arc::new(CatalogBundle {
                    catalog: catalog.name.clone(),
                    version: Version::parse(&bundle.version),
                    bundle: bundle.clone(),
                    channels,
                    deprecations,
                    poll_interval: catalog.poll_interval(),
                }));
            }
        }

        log::debug!("built catalog snapshot with {} bundles", bundles.len());
        Ok(Self { bundles })
    }

    pub fn bundles(&self) -> &[Arc<CatalogBundle>] {
        &self.bundles
    }

    /// All bundles of one package, in catalog order
    pub fn package_bundles(&self, package: &str) -> Vec<Arc<CatalogBundle>> {
        self.bundles
            .iter()
            .filter(|b| b.package() == package)
            .cloned()
            .collect()
    }

    /// All bundles of one package, failing if any has an unparsable version
    pub fn validated_package_bundles(&self, package: &str) -> Result<Vec<Arc<CatalogBundle>>> {
        let bundles = self.package_bundles(package);
        for bundle in &bundles {
            bundle.parsed_version()?;
        }
        Ok(bundles)
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Channel, ChannelEntry, Deprecation, Package};

    fn bundle(name: &str, package: &str, version: &str) -> Bundle {
        Bundle {
            name: name.to_string(),
            package: package.to_string(),
            image: format!("registry/{}", name),
            version: version.to_string(),
            properties: Vec::new(),
        }
    }

    fn entry(name: &str) -> ChannelEntry {
        ChannelEntry {
            name: name.to_string(),
            replaces: None,
            skips: Vec::new(),
            skip_range: None,
        }
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new("main");
        catalog.packages.push(Package {
            name: "foo".into(),
            default_channel: Some("stable".into()),
            description: None,
        });
        catalog.bundles = vec![bundle("foo.v1", "foo", "1.0.0"), bundle("foo.v2", "foo", "2.0.0")];
        catalog.channels = vec![
            Channel {
                name: "stable".into(),
                package: "foo".into(),
                entries: vec![entry("foo.v1"), entry("foo.v2")],
            },
            Channel {
                name: "legacy".into(),
                package: "foo".into(),
                entries: vec![entry("foo.v1")],
            },
        ];
        catalog.deprecations = vec![Deprecation {
            package: "foo".into(),
            entries: vec![
                DeprecationEntry {
                    reference: DeprecationScope::Package,
                    message: "foo is deprecated".into(),
                },
                DeprecationEntry {
                    reference: DeprecationScope::Channel { name: "legacy".into() },
                    message: "legacy channel is deprecated".into(),
                },
                DeprecationEntry {
                    reference: DeprecationScope::Bundle { name: "foo.v1".into() },
                    message: "foo.v1 is deprecated".into(),
                },
            ],
        }];
        catalog
    }

    #[test]
    fn test_channel_membership_and_deprecations() {
        let snapshot = CatalogSnapshot::from_catalogs(&[catalog()]).unwrap();
        assert_eq!(snapshot.len(), 2);

        let v1 = &snapshot.bundles()[0];
        assert!(v1.in_channel("stable"));
        assert!(v1.in_channel("legacy"));
        assert_eq!(v1.deprecations.len(), 3);
        assert!(v1.is_deprecated());

        let v2 = &snapshot.bundles()[1];
        assert!(!v2.in_channel("legacy"));
        // package-scoped entry only
        assert_eq!(v2.deprecations.len(), 1);
        assert!(!v2.is_deprecated());
    }

    #[test]
    fn test_invalid_version_is_reported_not_skipped() {
        let mut c = catalog();
        c.bundles.push(bundle("foo.bad", "foo", "not-a-version"));
        let snapshot = CatalogSnapshot::from_catalogs(&[c]).unwrap();
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.bundles()[2].semver().is_none());

        let err = snapshot.validated_package_bundles("foo").unwrap_err();
        assert!(err.to_string().contains("\"foo.bad\""));
        assert!(err.to_string().contains("\"not-a-version\""));
    }

    #[test]
    fn test_duplicate_package_rejected() {
        let mut c = catalog();
        c.packages.push(c.packages[0].clone());
        let err = CatalogSnapshot::from_catalogs(&[c]).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidCatalog { .. }));
    }

    #[test]
    fn test_duplicate_bundle_rejected() {
        let mut c = catalog();
        c.bundles.push(bundle("foo.v1", "foo", "1.0.0"));
        assert!(CatalogSnapshot::from_catalogs(&[c]).is_err());
    }

    #[test]
    fn test_multiple_catalogs() {
        let mut other = Catalog::new("other");
        other.poll_interval_seconds = Some(60);
        other.bundles = vec![bundle("bar.v1", "bar", "1.0.0")];
        let snapshot = CatalogSnapshot::from_catalogs(&[catalog(), other]).unwrap();
        let bar = snapshot.package_bundles("bar");
        assert_eq!(bar.len(), 1);
        assert_eq!(bar[0].catalog, "other");
        assert_eq!(bar[0].poll_interval, Some(Duration::from_secs(60)));
    }
}
