//! CLI command definitions and subcommands

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use switchboard_loops::prediction::DEFAULT_PREDICTION_PORT;

/// Port the loop test harness binds by default
pub const DEFAULT_LOOP_TEST_PORT: u16 = 5555;

/// Switchboard - message loops over request/reply and publish/subscribe sockets
#[derive(Debug, Parser)]
#[command(name = "switchboard", version)]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(short = 'l', long = "log-level", global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run an echo reply server and a request loop against it
    LoopTest {
        #[arg(short, long, default_value_t = DEFAULT_LOOP_TEST_PORT)]
        port: u16,

        /// Number of requests to feed
        #[arg(short, long, default_value_t = 10)]
        count: u32,

        /// Receive timeout of the reply server, in milliseconds
        #[arg(long, default_value_t = 2000)]
        timeout_ms: u64,
    },

    /// Serve touch predictions until a quit request or Ctrl-C
    Predict {
        #[arg(short, long, default_value_t = DEFAULT_PREDICTION_PORT)]
        port: u16,

        /// Receive timeout, in milliseconds
        #[arg(long, default_value_t = 2000)]
        timeout_ms: u64,
    },

    /// Ask a running prediction server to stop
    Quit {
        #[arg(long, default_value = "localhost")]
        host: String,

        #[arg(short, long, default_value_t = DEFAULT_PREDICTION_PORT)]
        port: u16,
    },

    /// Relay messages from a publish relay to subscribe relays
    Pubsub {
        #[arg(short, long, default_value_t = 5557)]
        port: u16,

        #[arg(short, long, default_value = "touch")]
        topic: String,

        /// Number of messages to publish
        #[arg(short, long, default_value_t = 10)]
        count: u32,
    },

    /// Launch a script and supervise it until its timeout
    Launch {
        script: PathBuf,

        /// Interpreter to run the script with
        #[arg(short, long, default_value = "python3")]
        interpreter: PathBuf,

        /// Port passed to the script as --port
        #[arg(short, long)]
        port: Option<u16>,

        /// Seconds to wait for the script; 0 leaves it running
        #[arg(short, long, default_value_t = 60)]
        timeout: u64,

        /// Run through sudo
        #[arg(long)]
        elevate: bool,

        /// Extra arguments for the script
        #[arg(last = true)]
        args: Vec<String>,
    },
}
