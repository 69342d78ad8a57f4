mod reconcile;
mod resolve;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use olm_controller::Catalog;

#[derive(Parser, Debug)]
#[command(name = "olmctl")]
#[command(about = "Resolve catalog bundles and reconcile extensions offline")]
#[command(version)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a package to a single bundle
    Resolve(resolve::ResolveArgs),

    /// Run reconcile passes for an extension against in-memory collaborators
    Reconcile(reconcile::ReconcileArgs),
}

/// Read JSON catalog files in the order given
pub(crate) fn load_catalogs(paths: &[PathBuf]) -> Result<Vec<Catalog>> {
    paths
        .iter()
        .map(|path| {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let catalog: Catalog = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse catalog {}", path.display()))?;
            log::debug!("loaded catalog {} from {}", catalog.name, path.display());
            Ok(catalog)
        })
        .collect()
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run() -> Result<i32> {
    let args = Args::parse();
    init_logging(args.verbose);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| anyhow::anyhow!("Failed to create async runtime: {}", e))?;

    match args.command {
        Commands::Resolve(resolve_args) => rt.block_on(resolve::execute(resolve_args)),
        Commands::Reconcile(reconcile_args) => rt.block_on(reconcile::execute(reconcile_args)),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("Error: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
