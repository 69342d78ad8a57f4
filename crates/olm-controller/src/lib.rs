//! Catalog bundle resolution and extension install reconciliation.
//!
//! A [`ClusterExtension`] declares which package a user wants installed,
//! optionally narrowed by channel and version range. The [`Reconciler`]
//! resolves it against the catalogs to one bundle, fetches the bundle's
//! content, applies the desired deployment and reports progress through a
//! fixed set of status conditions.
//!
//! Everything outside the controller is reached through traits so hosts can
//! plug in their own catalog source, content fetcher, deployment target and
//! object store. In-memory implementations of each ship with the crate.

pub mod apply;
pub mod catalog;
pub mod conditions;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod extension;
pub mod filter;
pub mod resolve;
pub mod solve;
pub mod source;
pub mod store;
pub mod variables;

pub use apply::{ApplySink, DeployedState, InMemoryApplySink};
pub use catalog::{Catalog, CatalogBundle, CatalogProvider, CatalogSnapshot, InMemoryCatalogProvider};
pub use conditions::{Condition, ConditionSet, ConditionStatus, ConditionType, Reason};
pub use config::{ControllerConfig, ResolutionMode, UpgradeEdges};
pub use controller::{Reconciler, ReconcilerBuilder};
pub use error::{ControllerError, ErrorKind, Result};
pub use extension::{ClusterExtension, ExtensionSpec, ExtensionStatus, ObjectKey, UpgradeConstraintPolicy};
pub use resolve::{CatalogResolver, GlobalResolver, InstalledBundle, InstalledBundleLookup, Resolution, Resolver};
pub use solve::{Selection, SolverAdapter};
pub use source::{ContentFetcher, StaticContentFetcher, UnpackCache, UnpackResult, UnpackState};
pub use store::{ExtensionStore, InMemoryExtensionStore};
pub use variables::{ResolutionVariable, VariableBuilder};
