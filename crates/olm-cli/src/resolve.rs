//! Resolve command - pick the bundle an extension would install.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde_json::{json, Map};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use olm_controller::{
    apply::{label_key, LABEL_BUNDLE_NAME, LABEL_BUNDLE_VERSION, LABEL_OWNER_NAME, LABEL_PACKAGE_NAME},
    resolve::DeployedBundleLookup,
    CatalogResolver, ClusterExtension, ControllerConfig, GlobalResolver, InMemoryApplySink, InMemoryCatalogProvider,
    InMemoryExtensionStore, Resolver, UpgradeConstraintPolicy, UpgradeEdges,
};
use olm_semver::Version;

/// Name given to the extension being resolved
const EXTENSION_NAME: &str = "olmctl";

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum UpgradePolicy {
    Enforce,
    Ignore,
}

impl From<UpgradePolicy> for UpgradeConstraintPolicy {
    fn from(policy: UpgradePolicy) -> Self {
        match policy {
            UpgradePolicy::Enforce => UpgradeConstraintPolicy::Enforce,
            UpgradePolicy::Ignore => UpgradeConstraintPolicy::Ignore,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Edges {
    Semver,
    Legacy,
}

impl From<Edges> for UpgradeEdges {
    fn from(edges: Edges) -> Self {
        match edges {
            Edges::Semver => UpgradeEdges::Semver,
            Edges::Legacy => UpgradeEdges::Legacy,
        }
    }
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Catalog file (JSON), can be given multiple times
    #[arg(short, long = "catalog", value_name = "FILE", required = true)]
    pub catalogs: Vec<PathBuf>,

    /// Package to resolve
    #[arg(short, long)]
    pub package: String,

    /// Only consider bundles in this channel
    #[arg(long)]
    pub channel: Option<String>,

    /// Version range, e.g. ">=1.0.0, <2.0.0"
    #[arg(long)]
    pub version: Option<String>,

    /// Version assumed to be installed already
    #[arg(long, value_name = "VERSION")]
    pub installed_version: Option<String>,

    /// Name of the installed bundle, defaults to "<package>.v<version>"
    #[arg(long, value_name = "NAME", requires = "installed_version")]
    pub installed_bundle: Option<String>,

    #[arg(long, value_enum, default_value = "enforce")]
    pub upgrade_policy: UpgradePolicy,

    /// What counts as an upgrade of the installed bundle
    #[arg(long, value_enum, default_value = "semver")]
    pub upgrade_edges: Edges,

    /// Use the constraint solver instead of single-package resolution
    #[arg(long)]
    pub global: bool,
}

pub async fn execute(args: ResolveArgs) -> Result<i32> {
    let catalogs = crate::load_catalogs(&args.catalogs)?;
    let provider = Arc::new(InMemoryCatalogProvider::new(&catalogs)?);

    let mut extension = ClusterExtension::new(EXTENSION_NAME, &args.package)
        .with_upgrade_constraint_policy(args.upgrade_policy.into());
    if let Some(channel) = &args.channel {
        extension = extension.with_channel(channel);
    }
    if let Some(version) = &args.version {
        extension = extension.with_version(version);
    }

    // The installed version is stamped on a deployed object, where the
    // lookup reads it back.
    let prefix = ControllerConfig::default().install.label_prefix;
    let sink = Arc::new(InMemoryApplySink::new());
    if let Some(installed) = &args.installed_version {
        let version = Version::parse(installed)
            .with_context(|| format!("Invalid installed version {:?}", installed))?;
        let mut labels = Map::new();
        labels.insert(label_key(&prefix, LABEL_OWNER_NAME), json!(EXTENSION_NAME));
        labels.insert(label_key(&prefix, LABEL_PACKAGE_NAME), json!(args.package));
        let bundle_name = args
            .installed_bundle
            .clone()
            .unwrap_or_else(|| format!("{}.v{}", args.package, version));
        labels.insert(label_key(&prefix, LABEL_BUNDLE_NAME), json!(bundle_name));
        labels.insert(label_key(&prefix, LABEL_BUNDLE_VERSION), json!(version.to_string()));
        sink.insert(
            EXTENSION_NAME,
            json!({"metadata": {"name": EXTENSION_NAME, "labels": labels}}),
        )
        .await;
    }
    let lookup = Arc::new(DeployedBundleLookup::new(sink, prefix));

    let resolver: Arc<dyn Resolver> = if args.global {
        let store = Arc::new(InMemoryExtensionStore::new());
        store.insert(extension.clone()).await;
        Arc::new(GlobalResolver::new(provider, lookup, store).with_upgrade_edges(args.upgrade_edges.into()))
    } else {
        Arc::new(CatalogResolver::new(provider, lookup).with_upgrade_edges(args.upgrade_edges.into()))
    };

    match resolver.resolve(&CancellationToken::new(), &extension).await {
        Ok(resolution) => {
            println!("bundle:  {}", resolution.bundle.name());
            println!("version: {}", resolution.version);
            println!("image:   {}", resolution.bundle.image());
            if resolution.bundle.is_deprecated() {
                println!("warning: bundle is deprecated");
            }
            Ok(0)
        }
        Err(e) => {
            eprintln!("Resolution failed: {}", e);
            Ok(1)
        }
    }
}
