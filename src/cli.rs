//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Caching gateway for theme-park ride wait-time APIs
#[derive(Parser, Debug)]
#[command(name = "wait-times-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "WAIT_TIMES_CONFIG_FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "WAIT_TIMES_LOG_LEVEL", global = true)]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "WAIT_TIMES_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the gateway server (default)
    Serve,

    /// Fetch wait times from the upstream once and print them
    Fetch {
        /// Restrict the payload to a single ride
        #[arg(long)]
        ride_id: Option<i64>,
    },
}
