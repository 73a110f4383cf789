use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Terminal dashboard for the ETX job runner
#[derive(Parser, Debug)]
#[command(name = "etx-dashboard", version)]
#[command(
    about = "Start ETX jobs, follow their logs and drive remote terminal sessions",
    long_about = None
)]
pub struct Cli {
    /// Backend URL (overrides ETX_BACKEND_URL)
    #[arg(short = 'u', long = "url", global = true)]
    pub url: Option<String>,

    /// Emit logs as JSON on stderr
    #[arg(long = "log-json", global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a job and follow it until it finishes
    Run(RunArgs),

    /// Print the job history, newest first
    History,

    /// Download the log file of a finished job
    Log {
        /// Job id as shown in the history
        job_id: String,

        /// Write the log here instead of stdout
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },

    /// List hostname candidates
    Hosts(HostArgs),

    /// Show, save, import or export settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Open a remote terminal session; stdin lines are sent as commands
    Terminal {
        /// interactive or automated
        #[arg(short = 'm', long = "mode", default_value = "interactive")]
        mode: String,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Action id (run-pipeline) or job type (pipeline)
    pub action: String,

    #[command(flatten)]
    pub host: HostArgs,

    /// Hostname for run_etx_commands (defaults to the last candidate)
    #[arg(long = "hostname")]
    pub hostname: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct HostArgs {
    /// Use GPU login nodes (default)
    #[arg(long = "gpu", conflicts_with = "cpu")]
    pub gpu: bool,

    /// Use CPU login nodes
    #[arg(long = "cpu")]
    pub cpu: bool,
}

impl HostArgs {
    pub fn is_gpu(&self) -> bool {
        !self.cpu
    }
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print the current settings
    Show {
        /// Read through the legacy text endpoint
        #[arg(long = "legacy")]
        legacy: bool,
    },

    /// Load a JSON settings object from a file and save it to the backend
    Save { file: PathBuf },

    /// Write the current settings to a settings text file
    Export { file: PathBuf },

    /// Read a settings text file and save it to the backend
    Import {
        file: PathBuf,

        /// Save through the legacy text endpoint
        #[arg(long = "legacy")]
        legacy: bool,
    },
}
