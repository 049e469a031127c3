//! Periodic background refresh runtime.
//!
//! Each MIB subtree that backs itself with external data owns an
//! [`Updater`]: `update_data` refreshes values against a fixed index,
//! `reinit_data` rebuilds the index itself (e.g. which ports a LAG
//! currently aggregates) on a slower cadence. [`run`] drives one updater
//! until cancelled, grounded in the reference `MIBUpdater.start`/
//! `MIBTable.start_background_tasks` loop: a fixed-frequency sleep with
//! reproducible per-updater jitter, a reinit cycle counter that always
//! fires on the first iteration, and panic/error containment so one bad
//! refresh never kills the task.

use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Boxed async return type; see [`crate::handler::BoxFuture`] for the
/// dyn-compatibility rationale, identical here.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Default refresh cadence in seconds (reference `DEFAULT_UPDATE_FREQUENCY`).
pub const DEFAULT_FREQUENCY_SECS: u64 = 5;
/// Default full-reinit cadence in seconds (reference `DEFAULT_REINIT_RATE`).
pub const DEFAULT_REINIT_RATE_SECS: u64 = 60;

/// Refreshes one MIB subtree's cached data on a timer.
///
/// An implementor owns a cache slot published via an atomic swap (see the
/// concurrency model in [`crate::mibs`]); this trait only describes the
/// write side the updater runtime drives.
pub trait Updater: Send + Sync + 'static {
    /// Stable name identifying this updater: seeds its jitter sequence and
    /// labels its log lines. Typically the MIB module's name (e.g. `"arp"`).
    fn name(&self) -> &str;

    /// Refresh values against the current index. Called every cycle.
    fn update_data<'a>(&'a self) -> BoxFuture<'a, Result<()>>;

    /// Rebuild the index (e.g. interface/LAG membership maps). Called every
    /// `reinit_rate / frequency` cycles, and always on the very first one.
    /// Default is a no-op for updaters whose index never changes.
    fn reinit_data<'a>(&'a self) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Run-time configuration for one updater's loop.
#[derive(Debug, Clone, Copy)]
pub struct UpdaterConfig {
    pub frequency: Duration,
    pub reinit_rate: Duration,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            frequency: Duration::from_secs(DEFAULT_FREQUENCY_SECS),
            reinit_rate: Duration::from_secs(DEFAULT_REINIT_RATE_SECS),
        }
    }
}

impl UpdaterConfig {
    /// Number of `frequency`-sized cycles between `reinit_data` calls, at
    /// least 1 so a zero or sub-frequency `reinit_rate` still reinits every
    /// cycle rather than panicking on a divide by zero.
    fn reinit_every_cycles(&self) -> u64 {
        (self.reinit_rate.as_secs() / self.frequency.as_secs().max(1)).max(1)
    }
}

/// Deterministic `[-2, +2]` second jitter seeded from the updater's name and
/// cycle number, so the sleep sequence is reproducible across runs instead
/// of depending on OS entropy - tests can assert on it, and log timelines
/// replay identically.
fn jitter_seconds(name: &str, cycle: u64) -> i64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    name.hash(&mut hasher);
    cycle.hash(&mut hasher);
    (hasher.finish() % 5) as i64 - 2
}

fn cycle_sleep(config: &UpdaterConfig, name: &str, cycle: u64) -> Duration {
    let jitter = jitter_seconds(name, cycle);
    let secs = config.frequency.as_secs() as i64 + jitter;
    Duration::from_secs(secs.max(0) as u64)
}

/// Run one `update_data`/`reinit_data` call in its own task so a panic
/// inside it is caught by the `JoinHandle` rather than taking down the
/// updater loop, and log anything other than success.
async fn run_phase(updater: &Arc<dyn Updater>, phase: &'static str, reinit: bool) {
    let name = updater.name().to_string();
    let updater = Arc::clone(updater);
    let handle = tokio::spawn(async move {
        if reinit {
            updater.reinit_data().await
        } else {
            updater.update_data().await
        }
    });

    match handle.await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => {
            tracing::error!(updater = %name, phase, %error, "updater cycle returned an error");
        }
        Err(join_error) => {
            tracing::error!(updater = %name, phase, %join_error, "updater cycle panicked");
        }
    }
}

/// Drive `updater`'s refresh loop until `shutdown` is cancelled.
///
/// The cycle counter starts one past the reinit threshold so the very
/// first iteration always reinits, exactly as the reference
/// `MIBUpdater.update_counter` initialization does.
pub async fn run(updater: Arc<dyn Updater>, config: UpdaterConfig, shutdown: CancellationToken) {
    let reinit_every = config.reinit_every_cycles();
    let mut since_reinit = reinit_every;
    let mut cycle: u64 = 0;
    let name = updater.name().to_string();

    loop {
        if shutdown.is_cancelled() {
            tracing::debug!(updater = %name, "updater loop shutting down");
            return;
        }

        let reinit_due = since_reinit >= reinit_every;
        if reinit_due {
            run_phase(&updater, "reinit_data", true).await;
            since_reinit = 0;
        } else {
            since_reinit += 1;
        }

        run_phase(&updater, "update_data", false).await;

        let sleep = cycle_sleep(&config, &name, cycle);
        cycle += 1;

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(sleep) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct CountingUpdater {
        reinit_calls: AtomicU32,
        update_calls: AtomicU32,
        log: Mutex<Vec<&'static str>>,
    }

    impl CountingUpdater {
        fn new() -> Self {
            Self {
                reinit_calls: AtomicU32::new(0),
                update_calls: AtomicU32::new(0),
                log: Mutex::new(Vec::new()),
            }
        }
    }

    impl Updater for CountingUpdater {
        fn name(&self) -> &str {
            "counting"
        }

        fn update_data<'a>(&'a self) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move {
                self.update_calls.fetch_add(1, Ordering::SeqCst);
                self.log.lock().unwrap().push("update");
                Ok(())
            })
        }

        fn reinit_data<'a>(&'a self) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move {
                self.reinit_calls.fetch_add(1, Ordering::SeqCst);
                self.log.lock().unwrap().push("reinit");
                Ok(())
            })
        }
    }

    struct PanickingUpdater;

    impl Updater for PanickingUpdater {
        fn name(&self) -> &str {
            "panicking"
        }

        fn update_data<'a>(&'a self) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move { panic!("boom") })
        }
    }

    #[test]
    fn jitter_is_reproducible_per_name_and_cycle() {
        assert_eq!(jitter_seconds("arp", 0), jitter_seconds("arp", 0));
        assert!((-2..=2).contains(&jitter_seconds("arp", 0)));
        assert!((-2..=2).contains(&jitter_seconds("arp", 41)));
    }

    #[test]
    fn reinit_every_cycles_floors_division() {
        let config = UpdaterConfig {
            frequency: Duration::from_secs(5),
            reinit_rate: Duration::from_secs(60),
        };
        assert_eq!(config.reinit_every_cycles(), 12);
    }

    #[tokio::test]
    async fn first_cycle_always_reinits() {
        let counting = Arc::new(CountingUpdater::new());
        let updater: Arc<dyn Updater> = counting.clone();
        let shutdown = CancellationToken::new();
        let config = UpdaterConfig {
            frequency: Duration::from_millis(5),
            reinit_rate: Duration::from_millis(10),
        };

        let shutdown_clone = shutdown.clone();
        let task = tokio::spawn(async move { run(updater, config, shutdown_clone).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();
        let _ = task.await;

        assert!(counting.reinit_calls.load(Ordering::SeqCst) >= 1);
        assert!(counting.update_calls.load(Ordering::SeqCst) >= 1);
        assert_eq!(counting.log.lock().unwrap()[0], "reinit");
    }

    #[tokio::test]
    async fn panic_in_update_data_is_contained() {
        let updater: Arc<dyn Updater> = Arc::new(PanickingUpdater);
        run_phase(&updater, "update_data", false).await;
    }
}
