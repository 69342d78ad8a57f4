//! Well-known bundle property types

use serde::Deserialize;

use olm_semver::CaretRange;

use super::Bundle;
use crate::error::{ControllerError, Result};

/// Package name and version of the bundle itself
pub const PROPERTY_PACKAGE: &str = "olm.package";
/// Dependency on another package within a version range
pub const PROPERTY_PACKAGE_DEPENDENCY: &str = "olm.package.dependency";
/// Legacy package requirement
pub const PROPERTY_PACKAGE_REQUIRED: &str = "olm.package.required";
/// Requirement on a provided API group/version/kind
pub const PROPERTY_GVK_REQUIRED: &str = "olm.gvk.required";
/// Generic constraint-language expression
pub const PROPERTY_CONSTRAINT: &str = "olm.constraint";

/// Dependency kinds that resolution refuses to handle
pub const UNSUPPORTED_DEPENDENCY_PROPERTIES: [&str; 3] =
    [PROPERTY_PACKAGE_REQUIRED, PROPERTY_GVK_REQUIRED, PROPERTY_CONSTRAINT];

/// A declared dependency on bundles of another package
#[derive(Debug, Clone)]
pub struct PackageDependency {
    pub package_name: String,
    pub version_range: CaretRange,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPackageDependency {
    package_name: String,
    version_range: String,
}

/// Fail on the first property declaring an unsupported dependency kind
pub fn check_supported_dependencies(bundle: &Bundle) -> Result<()> {
    match bundle
        .properties
        .iter()
        .find(|p| UNSUPPORTED_DEPENDENCY_PROPERTIES.contains(&p.kind.as_str()))
    {
        Some(property) => Err(ControllerError::UnsupportedDependency {
            bundle: bundle.name.clone(),
            property: property.kind.clone(),
        }),
        None => Ok(()),
    }
}

/// Parse every supported package dependency declared by the bundle
pub fn package_dependencies(bundle: &Bundle) -> Result<Vec<PackageDependency>> {
    bundle
        .properties
        .iter()
        .filter(|p| p.kind == PROPERTY_PACKAGE_DEPENDENCY)
        .map(|property| {
            let malformed = |reason: String| ControllerError::InvalidDependency {
                bundle: bundle.name.clone(),
                property: property.kind.clone(),
                reason,
            };
            let raw: RawPackageDependency =
                serde_json::from_value(property.value.clone()).map_err(|e| malformed(e.to_string()))?;
            let version_range = CaretRange::parse(&raw.version_range).map_err(|e| malformed(e.to_string()))?;
            Ok(PackageDependency {
                package_name: raw.package_name,
                version_range,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Property;
    use olm_semver::{Version, VersionConstraint};
    use serde_json::json;

    fn bundle(properties: Vec<Property>) -> Bundle {
        Bundle {
            name: "foo.v1.0.0".to_string(),
            package: "foo".to_string(),
            image: "registry/foo:1.0.0".to_string(),
            version: "1.0.0".to_string(),
            properties,
        }
    }

    #[test]
    fn test_unsupported_properties_rejected() {
        for kind in UNSUPPORTED_DEPENDENCY_PROPERTIES {
            let b = bundle(vec![Property::new(kind, json!({}))]);
            let err = check_supported_dependencies(&b).unwrap_err();
            assert!(err.to_string().contains(&format!("{:?}", kind)));
        }
    }

    #[test]
    fn test_plain_properties_accepted() {
        let b = bundle(vec![
            Property::new(PROPERTY_PACKAGE, json!({"packageName": "foo", "version": "1.0.0"})),
            Property::new(
                PROPERTY_PACKAGE_DEPENDENCY,
                json!({"packageName": "bar", "versionRange": ">=1.0.0 <2.0.0"}),
            ),
        ]);
        assert!(check_supported_dependencies(&b).is_ok());
    }

    #[test]
    fn test_package_dependencies() {
        let b = bundle(vec![Property::new(
            PROPERTY_PACKAGE_DEPENDENCY,
            json!({"packageName": "bar", "versionRange": "^1.2.0"}),
        )]);
        let deps = package_dependencies(&b).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].package_name, "bar");
        assert!(deps[0].version_range.matches(&Version::new(1, 9, 0)));
        assert!(!deps[0].version_range.matches(&Version::new(2, 0, 0)));
    }

    #[test]
    fn test_malformed_dependency() {
        let b = bundle(vec![Property::new(
            PROPERTY_PACKAGE_DEPENDENCY,
            json!({"packageName": "bar", "versionRange": "1.x"}),
        )]);
        let err = package_dependencies(&b).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidDependency { .. }));

        let b = bundle(vec![Property::new(PROPERTY_PACKAGE_DEPENDENCY, json!("bar"))]);
        assert!(package_dependencies(&b).is_err());
    }
}
