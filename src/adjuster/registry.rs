//! Resource table registry and the background sweeper bounding its memory.
//!
//! The registry is a sharded concurrent map from resource key to that
//! resource's [`SeriesStateTable`]. Shard locks only guard the map itself;
//! adjustment clones the table handle out and releases the shard before
//! taking the table lock, so creating a table for one resource never waits
//! on an in-flight adjustment of another.

use super::identity::ResourceKey;
use super::state::SeriesStateTable;
use crate::core::{Result, TrueResetError};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Resource tables scanned
    pub tables_scanned: usize,
    /// Series dropped for inactivity
    pub series_evicted: usize,
    /// Tables removed after their last series was dropped
    pub tables_evicted: usize,
}

/// Eviction counters accumulated across sweeps.
#[derive(Debug, Default)]
struct EvictionCounters {
    sweeps: AtomicU64,
    series_evicted: AtomicU64,
    tables_evicted: AtomicU64,
}

/// Mapping from resource key to its series table.
#[derive(Debug)]
pub struct ResourceTableRegistry {
    tables: DashMap<Arc<ResourceKey>, Arc<SeriesStateTable>>,
    max_idle: Duration,
    counters: EvictionCounters,
}

impl ResourceTableRegistry {
    /// Create a registry evicting series idle for longer than `max_idle`.
    pub fn new(max_idle: Duration) -> Self {
        Self {
            tables: DashMap::new(),
            max_idle,
            counters: EvictionCounters::default(),
        }
    }

    /// Inactivity interval, also the sweeper period
    pub fn max_idle(&self) -> Duration {
        self.max_idle
    }

    /// Table of `key`, created on first contact.
    pub fn get(&self, key: &Arc<ResourceKey>) -> Arc<SeriesStateTable> {
        // Fast path: shard read lock only
        if let Some(table) = self.tables.get(key) {
            return Arc::clone(table.value());
        }

        self.get_slow(key)
    }

    #[cold]
    fn get_slow(&self, key: &Arc<ResourceKey>) -> Arc<SeriesStateTable> {
        // The entry API holds the shard write lock, so concurrent first
        // contacts agree on one table.
        let table = self
            .tables
            .entry(Arc::clone(key))
            .or_insert_with(|| Arc::new(SeriesStateTable::new()));
        Arc::clone(table.value())
    }

    /// Whether a table exists for `key`
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.tables.contains_key(key)
    }

    /// Number of resource tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Total number of tracked series across all resources
    pub fn series_count(&self) -> usize {
        self.snapshot().iter().map(|(_, table)| table.len()).sum()
    }

    /// Series evicted since creation
    pub fn series_evicted(&self) -> u64 {
        self.counters.series_evicted.load(Ordering::Relaxed)
    }

    /// Tables evicted since creation
    pub fn tables_evicted(&self) -> u64 {
        self.counters.tables_evicted.load(Ordering::Relaxed)
    }

    /// Completed sweeps since creation
    pub fn sweeps(&self) -> u64 {
        self.counters.sweeps.load(Ordering::Relaxed)
    }

    /// Run one eviction pass as of `now`.
    ///
    /// Each table is locked only while its own series are scanned. A table
    /// left empty is removed unless an adjustment currently holds it.
    pub fn sweep(&self, now: Instant) -> SweepReport {
        let mut report = SweepReport::default();

        for (key, table) in self.snapshot() {
            report.tables_scanned += 1;
            report.series_evicted += table.evict_idle(now, self.max_idle);

            let empty = table.is_empty();
            drop(table);

            // Only the map may hold the table here; a concurrent adjustment
            // holding a clone keeps it alive.
            if empty
                && self
                    .tables
                    .remove_if(&key, |_, table| Arc::strong_count(table) == 1 && table.is_empty())
                    .is_some()
            {
                report.tables_evicted += 1;
            }
        }

        self.counters.sweeps.fetch_add(1, Ordering::Relaxed);
        self.counters
            .series_evicted
            .fetch_add(report.series_evicted as u64, Ordering::Relaxed);
        self.counters
            .tables_evicted
            .fetch_add(report.tables_evicted as u64, Ordering::Relaxed);

        report
    }

    fn snapshot(&self) -> Vec<(Arc<ResourceKey>, Arc<SeriesStateTable>)> {
        self.tables
            .iter()
            .map(|entry| (Arc::clone(entry.key()), Arc::clone(entry.value())))
            .collect()
    }
}

/// Handle to a running sweeper task.
///
/// Dropping the handle also stops the sweeper; [`SweeperHandle::shutdown`]
/// additionally waits for the task to exit.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Whether the sweeper task is still running
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the sweeper and wait for it to exit.
    pub async fn shutdown(self) -> Result<()> {
        // The task may already be gone, which is fine.
        let _ = self.shutdown_tx.send(true);
        self.task.await?;
        Ok(())
    }
}

/// Spawn the periodic sweeper for `registry` on the current Tokio runtime.
///
/// The sweep period is the registry's inactivity interval.
pub fn spawn_sweeper(registry: Arc<ResourceTableRegistry>) -> Result<SweeperHandle> {
    let period = registry.max_idle();
    if period.is_zero() {
        return Err(TrueResetError::config("sweep interval must be greater than 0"));
    }

    let runtime =
        tokio::runtime::Handle::try_current().map_err(|_| TrueResetError::RuntimeUnavailable)?;
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let task = runtime.spawn(async move {
        tracing::info!(interval = ?period, "State sweeper started");

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = registry.sweep(Instant::now());
                    tracing::debug!(
                        tables_scanned = report.tables_scanned,
                        series_evicted = report.series_evicted,
                        tables_evicted = report.tables_evicted,
                        "Swept idle series state"
                    );
                },
                // Either a shutdown request or the handle was dropped
                _ = shutdown_rx.changed() => break,
            }
        }

        tracing::info!("State sweeper stopped");
    });

    Ok(SweeperHandle { shutdown_tx, task })
}
