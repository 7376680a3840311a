//! Single-cycle mode
//!
//! Runs exactly one poll cycle and prints the snapshot as JSON on stdout.

use crate::{
    cli::{init_logging, load_settings},
    config::CliOverrides,
    session::RefreshCoordinator,
};
use anyhow::{Context, Result};

/// Arguments for `pdsync once`
#[derive(Debug, Default)]
pub struct OnceArgs {
    pub config: Option<String>,
    pub verbose: bool,
}

/// Run one cycle; an error return makes the process exit non-zero
pub async fn run_once(args: OnceArgs) -> Result<()> {
    let settings = load_settings(&CliOverrides::with_config(args.config.as_deref()));
    init_logging(&settings, args.verbose);

    let coordinator = RefreshCoordinator::from_settings(&settings)
        .context("Failed to set up the refresh coordinator")?;

    let snapshot = coordinator.run_cycle().await.context("Poll cycle failed")?;

    tracing::debug!(
        "Fetched {} members and {} devices",
        snapshot.members.len(),
        snapshot.devices.len()
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    coordinator.shutdown().await;
    Ok(())
}
