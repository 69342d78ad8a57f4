//! Candidate ordering.
//!
//! [`rank`] applies two stable sorts in a fixed order: version descending,
//! then non-deprecated before deprecated. The second sort keeps the version
//! order within each deprecation bucket, so the first candidate is the
//! highest non-deprecated version when one exists.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::catalog::CatalogBundle;

/// Stable sort by version, highest first. Unparsable versions sort last.
pub fn by_version(bundles: &mut [Arc<CatalogBundle>]) {
    bundles.sort_by(|a, b| match (a.semver(), b.semver()) {
        (Some(va), Some(vb)) => vb.cmp(va),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Stable sort putting non-deprecated bundles first
pub fn by_deprecation(bundles: &mut [Arc<CatalogBundle>]) {
    bundles.sort_by_key(|b| b.is_deprecated());
}

/// Order candidates by preference
pub fn rank(bundles: &mut [Arc<CatalogBundle>]) {
    by_version(bundles);
    by_deprecation(bundles);
}
