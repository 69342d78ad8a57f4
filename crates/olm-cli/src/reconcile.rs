//! Reconcile command - drive one extension to a stable state.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use olm_controller::{
    conditions::find_condition, ClusterExtension, ConditionType, ControllerConfig, ExtensionStore, InMemoryApplySink,
    InMemoryCatalogProvider, InMemoryExtensionStore, Reconciler, StaticContentFetcher,
};

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Catalog file (JSON), can be given multiple times
    #[arg(short, long = "catalog", value_name = "FILE", required = true)]
    pub catalogs: Vec<PathBuf>,

    /// Extension file (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub extension: PathBuf,

    /// Controller configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Give up after this many passes
    #[arg(long, default_value = "10")]
    pub max_passes: usize,
}

pub async fn execute(args: ReconcileArgs) -> Result<i32> {
    let config = ControllerConfig::build(args.config.as_deref())?;
    let catalogs = crate::load_catalogs(&args.catalogs)?;

    let content = std::fs::read_to_string(&args.extension)
        .with_context(|| format!("Failed to read {}", args.extension.display()))?;
    let mut extension: ClusterExtension = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse extension {}", args.extension.display()))?;
    if extension.metadata.generation == 0 {
        extension.metadata.generation = 1;
    }

    let store = Arc::new(InMemoryExtensionStore::new());
    let key = store.insert(extension).await;
    let reconciler = Reconciler::builder()
        .with_store(store.clone())
        .with_catalogs(Arc::new(InMemoryCatalogProvider::new(&catalogs)?))
        .with_fetcher(Arc::new(StaticContentFetcher::new()))
        .with_apply_sink(Arc::new(InMemoryApplySink::new()))
        .with_config(config)
        .build()?;

    let ctx = CancellationToken::new();
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let mut previous = None;
    let mut outcome = Ok(std::time::Duration::ZERO);
    for pass in 1..=args.max_passes {
        outcome = reconciler.reconcile(&ctx, &key).await;
        let current = store
            .get(&key)
            .await?
            .and_then(|e| find_condition(&e.status.conditions, ConditionType::Installed).cloned())
            .map(|c| (c.status, c.reason, c.message));
        log::debug!("pass {} finished: {:?}", pass, outcome);

        let settled = current.is_some() && current == previous;
        let fatal = matches!(&outcome, Err(e) if !e.is_retryable() || e.is_cancelled());
        if settled || fatal {
            break;
        }
        previous = current;
    }

    if let Some(extension) = store.get(&key).await? {
        println!("{}", serde_json::to_string_pretty(&extension.status.conditions)?);
    }

    match outcome {
        Ok(requeue) => {
            if !requeue.is_zero() {
                log::info!("next periodic pass due in {}s", requeue.as_secs());
            }
            Ok(0)
        }
        Err(e) => {
            eprintln!("Reconcile failed: {}", e);
            Ok(1)
        }
    }
}
