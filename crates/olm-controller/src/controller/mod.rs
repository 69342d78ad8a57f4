//! The reconcile loop for cluster extensions.
//!
//! Each call to [`Reconciler::reconcile`] is one pass over one extension:
//!
//! 1. gated or paused extensions get every condition set Unknown and stop
//! 2. resolve a bundle
//! 3. fetch its content
//! 4. apply the desired deployment, skipping the write when nothing changed
//! 5. derive Progressing and Healthy from the deployed object's own status
//!
//! The condition set is rebuilt from scratch every pass. Status is written
//! back only when it changed, using the resource version read at the start
//! of the pass.

mod deprecation;

pub use deprecation::DeprecationStatus;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::apply::{deep_derivative, desired_deployment, ApplySink, DeployedState};
use crate::catalog::{CatalogBundle, CatalogProvider};
use crate::conditions::{ConditionSet, ConditionStatus, ConditionType, Reason};
use crate::config::{ControllerConfig, ResolutionMode};
use crate::context::cancellable;
use crate::error::{ControllerError, Result};
use crate::extension::{BundleMetadata, ClusterExtension, ObjectKey};
use crate::resolve::{CatalogResolver, DeployedBundleLookup, GlobalResolver, InstalledBundleLookup, Resolver};
use crate::solve::SolverAdapter;
use crate::source::{BundleSource, ContentFetcher, UnpackCache, UnpackResult, UnpackState};
use crate::store::ExtensionStore;

/// Drives extensions towards their declared state
pub struct Reconciler {
    store: Arc<dyn ExtensionStore>,
    resolver: Arc<dyn Resolver>,
    fetcher: Arc<dyn ContentFetcher>,
    cache: Option<Arc<UnpackCache>>,
    sink: Arc<dyn ApplySink>,
    config: ControllerConfig,
}

impl Reconciler {
    pub fn builder() -> ReconcilerBuilder {
        ReconcilerBuilder::new()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Run one pass over the extension named by `key`, returning how long
    /// to wait before the next periodic pass. Zero means event driven only.
    pub async fn reconcile(&self, ctx: &CancellationToken, key: &ObjectKey) -> Result<Duration> {
        let existing = match cancellable(ctx, self.store.get(key)).await? {
            Some(extension) => extension,
            None => {
                log::debug!("extension {} not found, nothing to do", key);
                return Ok(Duration::ZERO);
            }
        };

        let mut extension = existing.clone();
        let mut conditions = ConditionSet::new(extension.metadata.generation);
        let outcome = self.reconcile_extension(ctx, &mut extension, &mut conditions).await;

        if let Err(ControllerError::Cancelled) = &outcome {
            log::debug!("reconcile of {} cancelled, status not written", key);
            return Err(ControllerError::Cancelled);
        }

        conditions.apply(&mut extension.status.conditions, Utc::now());

        check_unchanged(&existing, &extension);

        if existing.status == extension.status {
            log::debug!("status of {} unchanged, skipping write", key);
        } else {
            let written = cancellable(
                ctx,
                self.store
                    .write_status(key, &extension.status, existing.metadata.resource_version),
            )
            .await;
            match (written, &outcome) {
                (Ok(version), _) => log::debug!("wrote status of {} at resource version {}", key, version),
                (Err(err), Ok(_)) => return Err(err),
                (Err(err), Err(_)) => log::warn!("failed to write status of {}: {}", key, err),
            }
        }

        if let Err(err) = &outcome {
            if err.is_retryable() {
                log::warn!("reconcile of {} failed: {}", key, err);
            } else {
                log::debug!("reconcile of {} failed: {}", key, err);
            }
        }
        outcome
    }

    async fn reconcile_extension(
        &self,
        ctx: &CancellationToken,
        extension: &mut ClusterExtension,
        conditions: &mut ConditionSet,
    ) -> Result<Duration> {
        extension.status.paused = extension.spec.paused;
        if !self.config.features.extension_api {
            conditions.set_all(ConditionStatus::Unknown, Reason::Gated, "extension feature is disabled");
            return Ok(Duration::ZERO);
        }

        if extension.spec.paused {
            conditions.set_all(ConditionStatus::Unknown, Reason::Paused, "extension is paused");
            return Ok(Duration::ZERO);
        }

        let resolution = match self.resolver.resolve(ctx, extension).await {
            Ok(resolution) => resolution,
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => {
                set_resolution_failed(conditions, &err);
                extension.status.resolved_bundle = None;
                extension.status.installed_bundle = None;
                return Err(err);
            }
        };

        let bundle = &resolution.bundle;
        let metadata = BundleMetadata {
            name: bundle.name().to_string(),
            version: resolution.version.to_string(),
        };
        log::info!("resolved {} to {} {}", extension.name(), metadata.name, metadata.version);
        extension.status.resolved_bundle = Some(metadata.clone());
        conditions.set(
            ConditionType::Resolved,
            ConditionStatus::True,
            Reason::Success,
            format!("resolved to {:?}", bundle.image()),
        );
        DeprecationStatus::of(extension, bundle).apply(conditions);

        let unpack = match self.unpack(ctx, &extension.key(), bundle).await {
            Ok(unpack) => unpack,
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => {
                set_unpack_failed(conditions, &err.to_string());
                return Err(err);
            }
        };

        match &unpack.state {
            UnpackState::Pending | UnpackState::Unpacking => {
                let reason = if unpack.state == UnpackState::Pending {
                    Reason::UnpackPending
                } else {
                    Reason::Unpacking
                };
                conditions.set(ConditionType::Unpacked, ConditionStatus::False, reason, &unpack.message);
                conditions.set(
                    ConditionType::Installed,
                    ConditionStatus::Unknown,
                    Reason::InstallationStatusUnknown,
                    "installation has not been attempted as unpack is pending",
                );
                return Ok(requeue_after(bundle));
            }
            UnpackState::Failed => {
                set_unpack_failed(conditions, &unpack.message);
                return Err(ControllerError::Unpack(unpack.message.clone()));
            }
            UnpackState::Unpacked => conditions.set(
                ConditionType::Unpacked,
                ConditionStatus::True,
                Reason::UnpackSuccess,
                format!("unpack successful: {}", unpack.message),
            ),
            UnpackState::Other(state) => panic!("unexpected unpack state {:?}", state),
        }

        let desired = desired_deployment(extension, bundle, &unpack, &self.config.install.label_prefix);
        let deployed = match self.install(ctx, extension.name(), &desired).await {
            Ok(deployed) => deployed,
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => {
                conditions.set(
                    ConditionType::Installed,
                    ConditionStatus::False,
                    Reason::InstallationFailed,
                    err.to_string(),
                );
                return Err(err);
            }
        };

        extension.status.installed_bundle = Some(metadata);
        conditions.set(
            ConditionType::Installed,
            ConditionStatus::True,
            Reason::Success,
            format!("installed from {:?}", bundle.image()),
        );
        set_health(conditions, &DeployedState::from_deployed(&deployed));

        Ok(requeue_after(bundle))
    }

    /// Fetch bundle content, going through the cache when enabled
    async fn unpack(&self, ctx: &CancellationToken, key: &ObjectKey, bundle: &CatalogBundle) -> Result<UnpackResult> {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(key, bundle.image()).await {
                log::debug!("using cached unpack result for {}", key);
                return Ok(cached);
            }
        }

        let source = BundleSource {
            name: bundle.name().to_string(),
            image: bundle.image().to_string(),
        };
        let result = cancellable(ctx, self.fetcher.fetch(key, &source)).await;

        if let Some(cache) = &self.cache {
            match &result {
                Ok(unpack) => match unpack.state {
                    UnpackState::Unpacked => cache.insert(key.clone(), unpack.clone()).await,
                    UnpackState::Failed => cache.invalidate(key).await,
                    _ => {}
                },
                Err(err) if !err.is_cancelled() => cache.invalidate(key).await,
                Err(_) => {}
            }
        }
        result
    }

    /// Apply the desired deployment unless the deployed object already
    /// contains it, returning the deployed object
    async fn install(
        &self,
        ctx: &CancellationToken,
        name: &str,
        desired: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        if let Some(existing) = cancellable(ctx, self.sink.get(name)).await? {
            if deep_derivative(desired, &existing) {
                log::debug!("deployment for {} is up to date", name);
                return Ok(existing);
            }
        }
        let deployed = cancellable(ctx, self.sink.apply(desired)).await?;
        log::info!("applied deployment for {}", name);
        Ok(deployed)
    }
}

/// A pass may only touch status, finalizers and the resource version.
/// Anything else is a bug in the reconciler itself.
fn check_unchanged(before: &ClusterExtension, after: &ClusterExtension) {
    if before.immutable_view() != after.immutable_view() {
        panic!("spec or metadata changed by reconciler");
    }
}

fn requeue_after(bundle: &CatalogBundle) -> Duration {
    bundle.poll_interval.unwrap_or(Duration::ZERO)
}

fn set_resolution_failed(conditions: &mut ConditionSet, err: &ControllerError) {
    let message = err.to_string();
    conditions.set(
        ConditionType::Resolved,
        ConditionStatus::False,
        Reason::ResolutionFailed,
        &message,
    );
    if let ControllerError::UnsupportedDependency { .. } = err {
        conditions.set(
            ConditionType::Installed,
            ConditionStatus::False,
            Reason::InstallationFailed,
            message,
        );
    } else {
        conditions.set(
            ConditionType::Installed,
            ConditionStatus::Unknown,
            Reason::InstallationStatusUnknown,
            "installation has not been attempted as resolution failed",
        );
    }
    for t in ConditionType::DEPRECATION {
        conditions.set(
            t,
            ConditionStatus::Unknown,
            Reason::Deprecated,
            "deprecation checks have not been attempted as resolution failed",
        );
    }
}

fn set_unpack_failed(conditions: &mut ConditionSet, message: &str) {
    conditions.set(
        ConditionType::Unpacked,
        ConditionStatus::False,
        Reason::UnpackFailed,
        message,
    );
    conditions.set(
        ConditionType::Installed,
        ConditionStatus::Unknown,
        Reason::InstallationStatusUnknown,
        "installation has not been attempted as unpack failed",
    );
}

fn set_health(conditions: &mut ConditionSet, state: &DeployedState) {
    let (progressing, health) = match state {
        DeployedState::Succeeded => (
            (ConditionStatus::False, Reason::Succeeded, "desired state reached".to_string()),
            (ConditionStatus::True, Reason::Healthy, "deployment is healthy".to_string()),
        ),
        DeployedState::Reconciling => (
            (ConditionStatus::True, Reason::Reconciling, "deployment is reconciling".to_string()),
            (
                ConditionStatus::Unknown,
                Reason::Unverifiable,
                "health cannot be verified while the deployment is reconciling".to_string(),
            ),
        ),
        DeployedState::Failed(message) => (
            (ConditionStatus::False, Reason::Failed, message.clone()),
            (ConditionStatus::False, Reason::Unhealthy, message.clone()),
        ),
        DeployedState::Unobservable => (
            (
                ConditionStatus::Unknown,
                Reason::Unverifiable,
                "deployment status is not observable".to_string(),
            ),
            (
                ConditionStatus::Unknown,
                Reason::Unverifiable,
                "deployment status is not observable".to_string(),
            ),
        ),
    };
    conditions.set(ConditionType::Progressing, progressing.0, progressing.1, progressing.2);
    conditions.set(ConditionType::Healthy, health.0, health.1, health.2);
}

/// Builder for [`Reconciler`].
///
/// The store, catalog provider, content fetcher and apply sink are
/// required. Without an explicit install-state lookup the deployed objects'
/// identity labels are read through the apply sink. Without an explicit
/// resolver one is picked by `resolution.mode`.
#[derive(Default)]
pub struct ReconcilerBuilder {
    store: Option<Arc<dyn ExtensionStore>>,
    catalogs: Option<Arc<dyn CatalogProvider>>,
    installed: Option<Arc<dyn InstalledBundleLookup>>,
    resolver: Option<Arc<dyn Resolver>>,
    fetcher: Option<Arc<dyn ContentFetcher>>,
    cache: Option<Arc<UnpackCache>>,
    sink: Option<Arc<dyn ApplySink>>,
    config: ControllerConfig,
}

impl ReconcilerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, store: Arc<dyn ExtensionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_catalogs(mut self, catalogs: Arc<dyn CatalogProvider>) -> Self {
        self.catalogs = Some(catalogs);
        self
    }

    pub fn with_installed_lookup(mut self, installed: Arc<dyn InstalledBundleLookup>) -> Self {
        self.installed = Some(installed);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn ContentFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Share an unpack cache; ignored when `unpack.cache` is off
    pub fn with_cache(mut self, cache: Arc<UnpackCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_apply_sink(mut self, sink: Arc<dyn ApplySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Reconciler> {
        let missing = |what: &str| ControllerError::Config(format!("{} is required", what));

        let store = self.store.ok_or_else(|| missing("extension store"))?;
        let catalogs = self.catalogs.ok_or_else(|| missing("catalog provider"))?;
        let fetcher = self.fetcher.ok_or_else(|| missing("content fetcher"))?;
        let sink = self.sink.ok_or_else(|| missing("apply sink"))?;
        let config = self.config;

        let installed = self.installed.unwrap_or_else(|| {
            Arc::new(DeployedBundleLookup::new(
                Arc::clone(&sink),
                config.install.label_prefix.clone(),
            ))
        });

        let edges = config.resolution.upgrade_constraints;
        let resolver = match self.resolver {
            Some(resolver) => resolver,
            None => match config.resolution.mode {
                ResolutionMode::Single => {
                    Arc::new(CatalogResolver::new(catalogs, installed).with_upgrade_edges(edges)) as Arc<dyn Resolver>
                }
                ResolutionMode::Global => Arc::new(
                    GlobalResolver::new(catalogs, installed, Arc::clone(&store))
                        .with_adapter(SolverAdapter::new().with_max_iterations(config.resolution.max_solver_iterations))
                        .with_upgrade_edges(edges),
                ),
            },
        };

        let cache = if config.unpack.cache {
            Some(self.cache.unwrap_or_default())
        } else {
            None
        };

        Ok(Reconciler {
            store,
            resolver,
            fetcher,
            cache,
            sink,
            config,
        })
    }
}
