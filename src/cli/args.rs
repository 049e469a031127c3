//! Command-line arguments for the `agentx-subagentd` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::session::DEFAULT_SOCKET_PATH;
use crate::updater::DEFAULT_FREQUENCY_SECS;

/// Default Unix socket the bundled Redis-backed `DbAdapter` dials.
pub const DEFAULT_DB_SOCKET: &str = "/var/run/redis/redis.sock";

/// Process-level configuration: transport endpoints, refresh cadence, and
/// log verbosity (spec.md §6.5).
#[derive(Debug, Parser)]
#[command(name = "agentx-subagentd", version, about = "RFC 2741 AgentX subagent")]
pub struct Args {
    /// Path to the master agent's AgentX Unix-domain socket.
    #[arg(long, default_value = DEFAULT_SOCKET_PATH, value_name = "PATH")]
    pub agentx_socket: PathBuf,

    /// Path to the backing key-value store's Unix-domain socket.
    #[arg(long, default_value = DEFAULT_DB_SOCKET, value_name = "PATH")]
    pub db_socket: String,

    /// Seconds between `update_data` refresh cycles for every background
    /// updater (spec.md §4.4). Each updater's own `reinit_data` cadence is
    /// derived from this (roughly every twelfth cycle).
    #[arg(long, default_value_t = DEFAULT_FREQUENCY_SECS, value_name = "SECS")]
    pub update_frequency: u64,

    /// Increase log verbosity; repeatable (`-v` info, `-vv` debug, `-vvv`
    /// trace). Default is warn-level-and-above on this crate's own target,
    /// error elsewhere.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Install a `tracing-subscriber` fmt layer on stderr, filtered
    /// according to `-v`/`--verbose` and any `RUST_LOG` override.
    ///
    /// `RUST_LOG`, if set, always wins - this mirrors the common daemon
    /// convention of a CLI verbosity flag providing a sane default while an
    /// operator can still reach for the environment variable when they need
    /// finer-grained control (e.g. `RUST_LOG=agentx_subagent::wire=trace`).
    pub fn init_tracing(&self) {
        use tracing_subscriber::EnvFilter;

        let default_directive = match self.verbose {
            0 => "warn",
            1 => "agentx_subagent=info,warn",
            2 => "agentx_subagent=debug,warn",
            _ => "agentx_subagent=trace,debug",
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
