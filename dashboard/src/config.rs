use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::{Error, Result};

#[derive(Parser, Debug, Clone)]
#[command(name = "dashboard")]
#[command(about = "Terminal dashboard for fire-risk sensor nodes")]
#[command(version)]
pub struct Config {
    /// Base URL of the node API
    #[arg(long, env = "API_URL", default_value = "http://127.0.0.1:8000")]
    pub api_url: String,

    /// How often the node list is refreshed
    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Per-request timeout
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = 5000)]
    pub request_timeout_ms: u64,

    /// Where logs go while the terminal UI owns the screen
    #[arg(long, env = "LOG_FILE", default_value = "dashboard.log")]
    pub log_file: PathBuf,

    /// Poll and log only, without the terminal UI
    #[arg(long, env = "HEADLESS")]
    pub headless: bool,

    /// Print the collected metrics on exit
    #[arg(long)]
    pub print_metrics: bool,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::Config(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
