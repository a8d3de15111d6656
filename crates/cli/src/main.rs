//! `annolink` -- copy annotations between CVAT instances and sample frames
//! without duplicates.
//!
//! Results are printed to stdout as JSON; logs go to stderr.
//!
//! # Environment variables
//!
//! See [`config::AppConfig::from_env`] and [`config::connection_from_env`].
//! A `.env` file in the working directory is loaded first.

mod commands;
mod config;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use annolink_core::types::RemoteId;

use crate::config::Role;

#[derive(Parser)]
#[command(name = "annolink")]
#[command(
    about = "Transfer CVAT annotations between instances and sample unique frames",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that instances are reachable and the credentials are accepted
    Ping {
        /// Instances to check (default: source and target)
        #[arg(value_enum)]
        roles: Vec<Role>,
    },

    /// Copy annotations from a source task/job to a target task/job
    Transfer {
        #[command(flatten)]
        pair: PairArgs,

        /// Remap and report, but do not write to the target
        #[arg(long)]
        dry_run: bool,

        /// Include the remapped payload in the output
        #[arg(long)]
        show_payload: bool,

        /// Frame policy override (heuristic, job_local, global)
        #[arg(long)]
        policy: Option<String>,
    },

    /// Show which source files pair with which target files
    PreviewMatches {
        #[command(flatten)]
        pair: PairArgs,
    },

    /// Show which files of a task/job carry annotations
    PreviewAnnotations {
        #[arg(long)]
        task: RemoteId,

        #[arg(long)]
        job: Option<RemoteId>,

        /// Instance to read from
        #[arg(long, value_enum, default_value = "source")]
        role: Role,

        /// Frame policy override (heuristic, job_local, global)
        #[arg(long)]
        policy: Option<String>,
    },

    /// Randomly select frames per job, skipping files present in a check task
    Sample {
        #[arg(long)]
        task: RemoteId,

        /// Sample only this job
        #[arg(long)]
        job: Option<RemoteId>,

        /// Frames to select per job
        #[arg(long)]
        count: usize,

        /// Task on the check instance whose files must not be selected
        #[arg(long)]
        check_task: Option<RemoteId>,

        /// Seed for a reproducible selection
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Source and target scopes of a transfer.
#[derive(Args, Debug)]
struct PairArgs {
    #[arg(long)]
    source_task: RemoteId,

    #[arg(long)]
    source_job: Option<RemoteId>,

    #[arg(long)]
    target_task: RemoteId,

    #[arg(long)]
    target_job: Option<RemoteId>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "annolink=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config::AppConfig::from_env()?;
    let ctx = commands::Context::new(config);

    match cli.command {
        Commands::Ping { roles } => ctx.ping(&roles).await,
        Commands::Transfer {
            pair,
            dry_run,
            show_payload,
            policy,
        } => {
            ctx.transfer(&pair.into(), policy.as_deref(), dry_run, show_payload)
                .await
        }
        Commands::PreviewMatches { pair } => ctx.preview_matches(&pair.into()).await,
        Commands::PreviewAnnotations {
            task,
            job,
            role,
            policy,
        } => {
            ctx.preview_annotations(role, task, job, policy.as_deref())
                .await
        }
        Commands::Sample {
            task,
            job,
            count,
            check_task,
            seed,
        } => ctx.sample(task, job, count, check_task, seed).await,
    }
}

impl From<PairArgs> for commands::Pair {
    fn from(args: PairArgs) -> Self {
        Self {
            source: annolink_core::segment::Scope::new(args.source_task, args.source_job),
            target: annolink_core::segment::Scope::new(args.target_task, args.target_job),
        }
    }
}
