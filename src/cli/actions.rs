//! Pause and resume from the command line

use crate::{
    cli::{init_logging, load_settings},
    config::CliOverrides,
    session::RefreshCoordinator,
    types::ActionResponse,
};
use anyhow::{Context, Result};

/// Arguments shared by `pdsync pause` and `pdsync resume`
#[derive(Debug)]
pub struct ActionArgs {
    pub child_id: String,
    /// `None` resumes
    pub minutes: Option<u32>,
    pub config: Option<String>,
    pub verbose: bool,
}

/// Apply a pause or resume and print the result as JSON
pub async fn run_action(args: ActionArgs) -> Result<()> {
    let settings = load_settings(&CliOverrides::with_config(args.config.as_deref()));
    init_logging(&settings, args.verbose);

    let coordinator = RefreshCoordinator::from_settings(&settings)
        .context("Failed to set up the refresh coordinator")?;

    let response = match args.minutes {
        Some(0) => anyhow::bail!("--minutes must be greater than 0; use `pdsync resume` instead"),
        Some(minutes) => {
            let duration_secs = u64::from(minutes) * 60;
            coordinator
                .pause_limits(&args.child_id, duration_secs)
                .await
                .with_context(|| format!("Failed to pause limits for {}", args.child_id))?;
            ActionResponse::new(&args.child_id, duration_secs)
        }
        None => {
            coordinator
                .resume_limits(&args.child_id)
                .await
                .with_context(|| format!("Failed to resume limits for {}", args.child_id))?;
            ActionResponse::new(&args.child_id, 0)
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    coordinator.shutdown().await;
    Ok(())
}
