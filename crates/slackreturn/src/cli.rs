use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// slackreturn – post job results to Slack
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Activate verbose output (-v, -vv, etc.)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Post one job result to the configured channel
    Notify {
        /// Job result JSON file ("-" or omitted reads stdin)
        #[arg(short, long, value_name = "FILE")]
        job: Option<PathBuf>,

        /// Use the named alternative configuration block
        #[arg(short = 'r', long)]
        return_config: Option<String>,
    },
    /// List channels visible to the configured token
    Rooms {
        /// Use the named alternative configuration block
        #[arg(short = 'r', long)]
        return_config: Option<String>,
    },
    /// List workspace members visible to the configured token
    Users {
        /// Use the named alternative configuration block
        #[arg(short = 'r', long)]
        return_config: Option<String>,
    },
    /// Print build information
    Version {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
