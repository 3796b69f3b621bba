use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use taskdeck_core::cli::KeyVal;
use taskdeck_shared::TaskFilter;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskdeck",
    version,
    about = "Taskdeck: terminal client for the taskdeck task server",
    infer_subcommands = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the task API, e.g. http://localhost:5001/api.
    #[arg(long = "api-url", global = true)]
    pub api_url: Option<String>,

    /// Local cache file.
    #[arg(long = "cache", global = true)]
    pub cache: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sync with the server and show tasks.
    #[command(visible_alias = "ls")]
    List {
        #[arg(short = 'f', long = "filter", default_value = "all")]
        filter: TaskFilter,

        /// Show the cached list without contacting the server.
        #[arg(long = "offline")]
        offline: bool,
    },

    /// Add a task.
    Add {
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        description: Vec<String>,
    },

    /// Flip a task between active and completed.
    Toggle { id: String },

    /// Change a task's description.
    Edit {
        id: String,
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        description: Vec<String>,
    },

    /// Delete a task.
    #[command(visible_alias = "rm")]
    Delete { id: String },

    /// Show total, active and completed counts from the cache.
    Stats,

    /// Show connection state and where things live.
    Status,
}

impl Default for Command {
    fn default() -> Self {
        Command::List {
            filter: TaskFilter::All,
            offline: false,
        }
    }
}
