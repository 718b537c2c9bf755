//! CLI argument definitions for the `minutes` binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Meeting Notes: ask questions about your past meetings from the terminal.
#[derive(Parser, Debug)]
#[command(name = "minutes", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL, e.g. http://localhost:8000.
    #[arg(short = 's', long = "server", global = true)]
    pub server: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and remember the session.
    Login {
        email: String,
        /// Password. Falls back to MINUTES_PASSWORD, then a prompt.
        #[arg(short = 'p', long = "password")]
        password: Option<String>,
    },
    /// Create an account. Does not sign in.
    Register {
        email: String,
        #[arg(short = 'p', long = "password")]
        password: Option<String>,
    },
    /// Forget the stored session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Ask one question about past meetings.
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
        /// Only use this meeting.
        #[arg(short = 'm', long = "meeting")]
        meeting: Option<i64>,
        /// Only use meetings from this day (YYYY-MM-DD).
        #[arg(short = 'd', long = "date")]
        date: Option<NaiveDate>,
    },
    /// Interactive conversation.
    Chat,
    /// List processed meetings.
    History,
    /// Show one meeting with its summary and tasks.
    Show { id: i64 },
    /// Submit a meeting for task extraction.
    Process {
        #[command(flatten)]
        source: ProcessSource,
        #[arg(short = 't', long = "title")]
        title: Option<String>,
        /// Meeting day (YYYY-MM-DD).
        #[arg(short = 'd', long = "date")]
        date: Option<NaiveDate>,
    },
    /// Show how many meeting memories are stored.
    Memories,
}

/// Exactly one meeting source.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct ProcessSource {
    /// Read the transcript from this file.
    #[arg(long = "text")]
    pub text: Option<PathBuf>,
    /// Meeting recording or document URL.
    #[arg(long = "link")]
    pub link: Option<String>,
    /// Path to a file already available to the server.
    #[arg(long = "file")]
    pub file: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > MINUTES_CONFIG env var > ~/.minutes/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("MINUTES_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the backend base URL.
    ///
    /// Priority: --server flag > MINUTES_SERVER env var > config file value.
    pub fn resolve_server(&self, config_base_url: &str) -> String {
        if let Some(ref s) = self.server {
            return s.clone();
        }
        if let Ok(s) = std::env::var("MINUTES_SERVER") {
            if !s.trim().is_empty() {
                return s;
            }
        }
        config_base_url.to_string()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Resolve a password.
///
/// Priority: --password flag > MINUTES_PASSWORD env var. `None` means prompt.
pub fn resolve_password(flag: Option<String>) -> Option<String> {
    flag.or_else(|| std::env::var("MINUTES_PASSWORD").ok())
}

fn default_config_path() -> PathBuf {
    match minutes_core::config::home_dir() {
        Some(home) => home.join(".minutes").join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}
