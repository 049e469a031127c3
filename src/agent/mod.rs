//! Process lifecycle: owns the session task and every updater task.
//!
//! Grounded in the reference `Agent.run_in_event_loop`/`Agent.shutdown`
//! pair: three independent signals (run-enabled, updaters-enabled, stopped)
//! collapsed here into one [`tokio_util::sync::CancellationToken`] plus a
//! bounded join timeout, since Rust's structured-concurrency idioms make a
//! single cancellation token sufficient where the reference needed three
//! separate flags to coordinate across green threads.

mod set_handler;

pub use set_handler::SetCoordinator;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::mib::MibTable;
use crate::session::{self, SessionConfig};
use crate::updater::{self, Updater, UpdaterConfig};

/// How long [`Supervisor::shutdown`] waits for updater tasks to finish
/// their current cycle before abandoning them (spec §4.6, §5).
const UPDATER_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// One registered background updater, paired with the cadence it runs at.
struct RegisteredUpdater {
    updater: Arc<dyn Updater>,
    config: UpdaterConfig,
}

/// Builds and runs the subagent: one session task plus N updater tasks,
/// sharing a [`MibTable`] and a [`SetCoordinator`].
///
/// Construct with [`Supervisor::new`], register updaters with
/// [`Supervisor::add_updater`], then [`Supervisor::run`] until a shutdown
/// signal arrives (SIGINT/SIGTERM at the process level, or an explicit
/// [`CancellationToken::cancel`] call from an embedder).
pub struct Supervisor {
    session_config: SessionConfig,
    mib: Arc<MibTable>,
    set_coordinator: Arc<SetCoordinator>,
    updaters: Vec<RegisteredUpdater>,
}

impl Supervisor {
    /// Start building a supervisor for the given session configuration and
    /// composed MIB table.
    pub fn new(session_config: SessionConfig, mib: Arc<MibTable>) -> Self {
        Self {
            session_config,
            mib,
            set_coordinator: Arc::new(SetCoordinator::new()),
            updaters: Vec::new(),
        }
    }

    /// Register a background updater to run at `config`'s cadence.
    pub fn add_updater(&mut self, updater: Arc<dyn Updater>, config: UpdaterConfig) -> &mut Self {
        self.updaters.push(RegisteredUpdater { updater, config });
        self
    }

    /// Run the session and every registered updater until `shutdown` is
    /// cancelled, then unwind in the order spec.md §4.6 describes:
    ///
    /// 1. the cancellation has already cleared the run-enabled condition
    ///    every task polls;
    /// 2. the session task observes it (on its next read-timeout tick or
    ///    immediately, via `tokio::select!`) and closes its connection;
    /// 3. updater tasks are given up to [`UPDATER_JOIN_TIMEOUT`] to finish
    ///    their current cycle and exit;
    /// 4. this function returns, signalling "stopped" to the caller.
    ///
    /// If any updater task panics, that is treated as a child-abnormal
    /// signal: shutdown is initiated for the whole subagent even though
    /// `shutdown` was not externally cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let session_handle: JoinHandle<()> = tokio::spawn(session::run(
            self.session_config,
            Arc::clone(&self.mib),
            Arc::clone(&self.set_coordinator),
            shutdown.clone(),
        ));

        let updater_names: Vec<String> = self.updaters.iter().map(|u| u.updater.name().to_string()).collect();
        let mut updaters: JoinSet<()> = JoinSet::new();
        for registered in self.updaters {
            let shutdown = shutdown.clone();
            updaters.spawn(updater::run(registered.updater, registered.config, shutdown));
        }

        // An updater task only ever returns by observing cancellation, so
        // any completion reaching `join_next` before `shutdown` was
        // cancelled is a panic - a child-abnormal signal that should itself
        // trigger shutdown of the whole subagent (spec.md §4.6).
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = updaters.join_next(), if !updaters.is_empty() => {
                tracing::error!("an updater task ended abnormally, initiating shutdown");
            }
        }

        shutdown.cancel();

        if session_handle.await.is_err() {
            tracing::error!("session task panicked during shutdown");
        }

        let join_all = async {
            while let Some(result) = updaters.join_next_with_id().await {
                if let Err(error) = result {
                    tracing::error!(%error, "updater task panicked");
                }
            }
        };
        if tokio::time::timeout(UPDATER_JOIN_TIMEOUT, join_all).await.is_err() {
            tracing::warn!(
                timeout_secs = UPDATER_JOIN_TIMEOUT.as_secs(),
                updaters = ?updater_names,
                "updater tasks did not finish within the shutdown timeout, abandoning them"
            );
            updaters.abort_all();
        }

        tracing::info!("subagent stopped");
    }
}
