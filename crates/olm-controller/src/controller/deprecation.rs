use crate::catalog::{CatalogBundle, DeprecationScope};
use crate::conditions::{ConditionSet, ConditionStatus, ConditionType, Reason};
use crate::extension::ClusterExtension;

/// Messages of the deprecation entries that apply to a resolved bundle, by
/// scope
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DeprecationStatus {
    pub package: Vec<String>,
    pub channel: Vec<String>,
    pub bundle: Vec<String>,
}

impl DeprecationStatus {
    /// Collect the entries relevant to this extension.
    ///
    /// A channel entry only counts when the extension pins that channel.
    pub fn of(extension: &ClusterExtension, bundle: &CatalogBundle) -> Self {
        let mut status = Self::default();
        for entry in &bundle.deprecations {
            match &entry.reference {
                DeprecationScope::Package => status.package.push(entry.message.clone()),
                DeprecationScope::Channel { name } => {
                    if extension.spec.channel.as_deref() == Some(name.as_str()) {
                        status.channel.push(entry.message.clone());
                    }
                }
                DeprecationScope::Bundle { name } => {
                    if name == bundle.name() {
                        status.bundle.push(entry.message.clone());
                    }
                }
            }
        }
        status
    }

    pub fn is_deprecated(&self) -> bool {
        !self.package.is_empty() || !self.channel.is_empty() || !self.bundle.is_empty()
    }

    /// Write all four deprecation conditions
    pub fn apply(&self, conditions: &mut ConditionSet) {
        let scoped = [
            (ConditionType::PackageDeprecated, &self.package),
            (ConditionType::ChannelDeprecated, &self.channel),
            (ConditionType::BundleDeprecated, &self.bundle),
        ];
        let mut all = Vec::new();
        for (condition_type, messages) in scoped {
            set(conditions, condition_type, messages);
            all.extend(messages.iter().cloned());
        }
        set(conditions, ConditionType::Deprecated, &all);
    }
}

fn set(conditions: &mut ConditionSet, condition_type: ConditionType, messages: &[String]) {
    conditions.set(
        condition_type,
        ConditionStatus::from(!messages.is_empty()),
        Reason::Deprecated,
        messages.join(";"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Bundle, Catalog, CatalogSnapshot, Channel, ChannelEntry, Deprecation, DeprecationEntry};
    use std::sync::Arc;

    fn deprecated_bundle() -> Arc<CatalogBundle> {
        let mut catalog = Catalog::new("main");
        catalog.bundles = vec![Bundle {
            name: "foo.v1.0.0".into(),
            package: "foo".into(),
            image: "quay.io/foo:v1.0.0".into(),
            version: "1.0.0".into(),
            properties: vec![],
        }];
        catalog.channels = vec![Channel {
            name: "beta".into(),
            package: "foo".into(),
            entries: vec![ChannelEntry {
                name: "foo.v1.0.0".into(),
                replaces: None,
                skips: vec![],
                skip_range: None,
            }],
        }];
        catalog.deprecations = vec![Deprecation {
            package: "foo".into(),
            entries: vec![
                DeprecationEntry {
                    reference: DeprecationScope::Bundle { name: "foo.v1.0.0".into() },
                    message: "bundle gone".into(),
                },
                DeprecationEntry {
                    reference: DeprecationScope::Channel { name: "beta".into() },
                    message: "beta gone".into(),
                },
                DeprecationEntry {
                    reference: DeprecationScope::Package,
                    message: "package gone".into(),
                },
            ],
        }];
        let snapshot = CatalogSnapshot::from_catalogs(&[catalog]).unwrap();
        Arc::clone(&snapshot.bundles()[0])
    }

    #[test]
    fn test_unpinned_channel_is_not_channel_deprecated() {
        let bundle = deprecated_bundle();
        let status = DeprecationStatus::of(&ClusterExtension::new("ext", "foo"), &bundle);
        assert!(status.channel.is_empty());

        let mut set = ConditionSet::new(1);
        status.apply(&mut set);
        assert_eq!(set.get(ConditionType::ChannelDeprecated).unwrap().status, ConditionStatus::False);
        let aggregate = set.get(ConditionType::Deprecated).unwrap();
        assert_eq!(aggregate.status, ConditionStatus::True);
        assert_eq!(aggregate.message, "package gone;bundle gone");
    }

    #[test]
    fn test_pinned_channel() {
        let bundle = deprecated_bundle();
        let status = DeprecationStatus::of(&ClusterExtension::new("ext", "foo").with_channel("beta"), &bundle);
        let mut set = ConditionSet::new(1);
        status.apply(&mut set);
        let channel = set.get(ConditionType::ChannelDeprecated).unwrap();
        assert_eq!(channel.status, ConditionStatus::True);
        assert_eq!(channel.message, "beta gone");
        assert_eq!(
            set.get(ConditionType::Deprecated).unwrap().message,
            "package gone;beta gone;bundle gone"
        );
    }

    #[test]
    fn test_nothing_deprecated() {
        let status = DeprecationStatus::default();
        assert!(!status.is_deprecated());
        let mut set = ConditionSet::new(1);
        status.apply(&mut set);
        for t in ConditionType::DEPRECATION {
            let v = set.get(t).unwrap();
            assert_eq!(v.status, ConditionStatus::False);
            assert_eq!(v.reason, Reason::Deprecated);
            assert_eq!(v.message, "");
        }
    }
}
