use std::{path::PathBuf, sync::OnceLock};

use clap::{Parser, Subcommand};

/// Inspect ECS task definitions and container logs from the terminal.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the config file.
    #[arg(short, long, default_value = "ecscope.toml")]
    pub config: PathBuf,

    /// AWS region (overrides the config file and environment).
    #[arg(long)]
    pub region: Option<String>,

    /// AWS profile to pass through to the aws CLI.
    #[arg(long)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compare two task definition revisions and list the changes.
    Compare {
        /// Source task definition (family:revision or full ARN).
        source: String,
        /// Target task definition (family:revision or full ARN).
        target: String,
    },
    /// List recent revisions of a task definition family.
    Revisions {
        family: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Show recent log lines for a container of a running task.
    Logs {
        cluster: String,
        task: String,
        container: String,
        /// How many lines to fetch.
        #[arg(long)]
        lines: Option<usize>,
        /// CloudWatch filter pattern.
        #[arg(long)]
        filter: Option<String>,
    },
    /// Tail a container's logs live. `q` stops, `f` sets a filter, `c`
    /// clears it.
    Tail {
        cluster: String,
        task: String,
        container: String,
        /// Initial CloudWatch filter pattern.
        #[arg(long)]
        filter: Option<String>,
    },
    /// List log groups that look relevant to a cluster/container pair.
    LogGroups {
        cluster: String,
        container: String,
        #[arg(long)]
        service: Option<String>,
        #[arg(long)]
        family: Option<String>,
    },
}

static ARGS: OnceLock<Args> = OnceLock::new();

pub fn get_cli_args() -> &'static Args {
    ARGS.get_or_init(Args::parse)
}
