use std::cmp::Ordering;
use std::sync::Arc;

use olm_semver::{CaretRange, Version, VersionConstraint, VersionRange};

use super::{or, Predicate};
use crate::catalog::CatalogBundle;

pub fn with_package_name(package: impl Into<String>) -> Predicate<CatalogBundle> {
    let package = package.into();
    Box::new(move |bundle| bundle.package() == package)
}

pub fn in_channel(channel: impl Into<String>) -> Predicate<CatalogBundle> {
    let channel = channel.into();
    Box::new(move |bundle| bundle.in_channel(&channel))
}

/// Bundles whose version satisfies the constraint. Bundles with an
/// unparsable version never match; callers validate versions up front.
pub fn in_version_range(constraint: Arc<dyn VersionConstraint>) -> Predicate<CatalogBundle> {
    Box::new(move |bundle| bundle.semver().is_some_and(|v| constraint.matches(v)))
}

/// Bundles of exactly this version, build metadata ignored
pub fn with_version(version: Version) -> Predicate<CatalogBundle> {
    Box::new(move |bundle| bundle.semver().is_some_and(|v| v.cmp(&version) == Ordering::Equal))
}

/// Bundles that replace `name` in any channel
pub fn replaces(name: impl Into<String>) -> Predicate<CatalogBundle> {
    let name = name.into();
    Box::new(move |bundle| {
        bundle
            .channels
            .iter()
            .any(|m| m.replaces.as_deref() == Some(name.as_str()))
    })
}

/// Bundles that skip `name` in any channel
pub fn skips(name: impl Into<String>) -> Predicate<CatalogBundle> {
    let name = name.into();
    Box::new(move |bundle| bundle.channels.iter().any(|m| m.skips.contains(&name)))
}

/// Bundles with a channel entry whose skip range covers `version`.
/// Unparsable skip ranges cover nothing.
pub fn skip_range_covers(version: Version) -> Predicate<CatalogBundle> {
    Box::new(move |bundle| {
        bundle.channels.iter().any(|m| {
            m.skip_range
                .as_deref()
                .and_then(|range| VersionRange::parse(range).ok())
                .is_some_and(|range| range.matches(&version))
        })
    })
}

/// The installed version plus its same-major successors
pub fn semver_successors(installed: &Version) -> Predicate<CatalogBundle> {
    in_version_range(Arc::new(CaretRange::successors_of(installed)))
}

/// The installed version plus every bundle whose channel entry replaces or
/// skips the installed bundle, by name or by skip range
pub fn legacy_successors(bundle_name: &str, installed: &Version) -> Predicate<CatalogBundle> {
    or(vec![
        replaces(bundle_name),
        skips(bundle_name),
        skip_range_covers(installed.clone()),
        with_version(installed.clone()),
    ])
}
