//! Unified CLI for Parent Dashboard Sync
//!
//! # Usage
//!
//! ## Service Mode
//! ```bash
//! pdsync run --port 8787 --host 0.0.0.0
//! ```
//!
//! ## One Cycle
//! ```bash
//! pdsync once > snapshot.json
//! ```
//!
//! ## Seeding the Credential Store
//! ```bash
//! pdsync import --file cookies.json
//! ```
//!
//! ## Credential Sources
//! ```bash
//! pdsync check
//! pdsync clear
//! ```
//!
//! ## Screen-Time Actions
//! ```bash
//! pdsync pause --child amzn1.account.XXXX --minutes 30
//! pdsync resume --child amzn1.account.XXXX
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use parent_dashboard_sync::cli::{
    actions::{ActionArgs, run_action},
    check::{CheckArgs, run_check, run_clear},
    import::{ImportArgs, run_import},
    once::{OnceArgs, run_once},
    run::{RunArgs, run_service},
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "pdsync")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options every subcommand accepts
#[derive(Args, Debug, Clone, Default)]
struct GlobalOpts {
    /// Configuration file path
    #[arg(long)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the poll loop and the local status server
    Run {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        #[command(flatten)]
        opts: GlobalOpts,
    },

    /// Run a single poll cycle and print the snapshot as JSON
    Once {
        #[command(flatten)]
        opts: GlobalOpts,
    },

    /// Encrypt a cookie export into the credential store
    Import {
        /// Cookie JSON exported from the companion or a browser
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        opts: GlobalOpts,
    },

    /// Probe the companions and the credential store
    Check {
        #[command(flatten)]
        opts: GlobalOpts,
    },

    /// Delete the stored credentials
    Clear {
        #[command(flatten)]
        opts: GlobalOpts,
    },

    /// Pause screen-time limits for a child
    Pause {
        /// Child directed id
        #[arg(short, long, value_name = "ID", allow_hyphen_values = true)]
        child: String,

        /// Pause length in minutes
        #[arg(short, long)]
        minutes: u32,

        #[command(flatten)]
        opts: GlobalOpts,
    },

    /// Lift a pause for a child
    Resume {
        /// Child directed id
        #[arg(short, long, value_name = "ID", allow_hyphen_values = true)]
        child: String,

        #[command(flatten)]
        opts: GlobalOpts,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { port, host, opts } => {
            run_service(RunArgs {
                port,
                host,
                config: opts.config,
                verbose: opts.verbose,
            })
            .await
        }
        Commands::Once { opts } => {
            run_once(OnceArgs {
                config: opts.config,
                verbose: opts.verbose,
            })
            .await
        }
        Commands::Import { file, opts } => {
            run_import(ImportArgs {
                file,
                config: opts.config,
                verbose: opts.verbose,
            })
            .await
        }
        Commands::Check { opts } => {
            run_check(CheckArgs {
                config: opts.config,
                verbose: opts.verbose,
            })
            .await
        }
        Commands::Clear { opts } => {
            run_clear(CheckArgs {
                config: opts.config,
                verbose: opts.verbose,
            })
            .await
        }
        Commands::Pause {
            child,
            minutes,
            opts,
        } => {
            run_action(ActionArgs {
                child_id: child,
                minutes: Some(minutes),
                config: opts.config,
                verbose: opts.verbose,
            })
            .await
        }
        Commands::Resume { child, opts } => {
            run_action(ActionArgs {
                child_id: child,
                minutes: None,
                config: opts.config,
                verbose: opts.verbose,
            })
            .await
        }
    }
}
