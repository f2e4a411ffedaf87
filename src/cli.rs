use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "workbench",
    version,
    about = "Conversational workbench for orchestrated sub-agents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every subcommand that builds a workbench.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Path to config file (overrides ./workbench.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Append orchestration events to this JSONL file
    #[arg(long)]
    pub audit_log: Option<PathBuf>,

    /// Start runs without waiting for approval
    #[arg(long)]
    pub no_approval: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit one prompt, drive the run to a terminal state, and print it
    Run {
        /// The prompt to orchestrate
        prompt: String,

        /// Reject the run instead of approving it
        #[arg(long, conflicts_with = "no_approval")]
        reject: bool,

        /// Stop the run after this many milliseconds
        #[arg(long)]
        stop_after_ms: Option<u64>,

        /// Save every generated artifact once the run finishes
        #[arg(long)]
        save_all: bool,

        /// Print the final run snapshot as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Interactive line-oriented console
    Console {
        #[command(flatten)]
        common: CommonArgs,
    },
}

impl Commands {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Commands::Run { common, .. } => common,
            Commands::Console { common } => common,
        }
    }
}
