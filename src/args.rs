use crate::logging::{LogFormat, LoggingConfig};
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "unimbus")]
#[command(about = "Starts the runtime and keeps it running until interrupted")]
#[command(version)]
pub struct Args {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<Level>,

    /// 日志格式 (pretty, json, compact)
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Configuration file, takes precedence over UNIMBUS_CONFIG
    #[arg(long)]
    pub config_file: Option<PathBuf>,

    /// Print the startup report as JSON once started
    #[arg(long)]
    pub report: bool,
}

impl Args {
    /// Applies command line overrides on top of `logging`.
    pub fn apply(&self, mut logging: LoggingConfig) -> LoggingConfig {
        if let Some(level) = self.log_level {
            logging.level = level;
        }
        if let Some(format) = self.log_format {
            logging.format = format;
        }
        logging
    }
}
