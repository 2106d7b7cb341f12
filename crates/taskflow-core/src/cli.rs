use std::io::IsTerminal;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use taskflow_shared::TaskStatus;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::filter::TaskFilter;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskflow",
    version,
    about = "TaskFlow: personal task tracking against a local or remote task service"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Override a config key, e.g. `--rc backend=remote`.
    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the task service over HTTP.
    Serve {
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Sign in and remember the session.
    Login {
        username: String,
        /// Read from stdin when omitted.
        #[arg(long, env = "TASKFLOW_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the current session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// List tasks, optionally restricted to one status.
    List {
        #[arg(long, short = 's', default_value = "all")]
        status: TaskFilter,
    },
    /// Create a task.
    Add {
        #[arg(long, short = 't')]
        title: String,
        #[arg(long, short = 'd')]
        description: String,
        #[arg(long, short = 's', default_value = "pending")]
        status: TaskStatus,
    },
    /// Edit a task; unspecified fields keep their current value.
    Edit {
        id: String,
        #[arg(long, short = 't')]
        title: Option<String>,
        #[arg(long, short = 'd')]
        description: Option<String>,
        #[arg(long, short = 's')]
        status: Option<TaskStatus>,
        /// Skip the confirmation prompt.
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Delete a task.
    Delete {
        id: String,
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

impl Default for Command {
    fn default() -> Self {
        Command::List {
            status: TaskFilter::All,
        }
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
