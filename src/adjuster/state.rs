//! Per-series epoch state and the per-resource table holding it.

use super::identity::{MetricKind, SeriesIdentity};
use ahash::AHashMap;
use parking_lot::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Last observed payload of a series, shaped by its metric kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    /// Single cumulative value (monotonic sums)
    Counter { value: f64 },
    /// Count and sum pair (histograms and summaries)
    Distribution { count: u64, sum: f64 },
}

/// How a decrease is recognised as a counter reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPolicy {
    /// Any decrease of the value, the count or the sum
    AnyDecrease,
    /// A decrease only counts when both sides of the comparison are
    /// non-zero; unset summary fields default to zero.
    IgnoreUnset,
}

impl Observation {
    /// Zero observation of the shape used by `kind`
    pub fn zero(kind: MetricKind) -> Self {
        if kind.is_distribution() {
            Observation::Distribution { count: 0, sum: 0.0 }
        } else {
            Observation::Counter { value: 0.0 }
        }
    }

    /// Whether moving from `previous` to `self` means the source restarted.
    ///
    /// Mismatched shapes are treated as a reset.
    pub fn is_reset_from(&self, previous: &Observation, policy: ResetPolicy) -> bool {
        match (self, previous) {
            (Observation::Counter { value }, Observation::Counter { value: prev }) => match policy
            {
                ResetPolicy::AnyDecrease => value < prev,
                ResetPolicy::IgnoreUnset => *value != 0.0 && *prev != 0.0 && value < prev,
            },
            (
                Observation::Distribution { count, sum },
                Observation::Distribution {
                    count: prev_count,
                    sum: prev_sum,
                },
            ) => match policy {
                ResetPolicy::AnyDecrease => count < prev_count || sum < prev_sum,
                ResetPolicy::IgnoreUnset => {
                    (*count != 0 && *prev_count != 0 && count < prev_count)
                        || (*sum != 0.0 && *prev_sum != 0.0 && sum < prev_sum)
                },
            },
            _ => true,
        }
    }
}

/// Tracked epoch of one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesState {
    /// Start of the current epoch
    pub start_time_unix_nano: u64,
    /// Last real observation of the series
    pub previous: Observation,
}

impl SeriesState {
    /// Fresh zero-valued state for a series of `kind`
    pub fn zero(kind: MetricKind) -> Self {
        Self {
            start_time_unix_nano: 0,
            previous: Observation::zero(kind),
        }
    }

    /// State opening a new epoch at `start_time_unix_nano`
    pub fn begin(start_time_unix_nano: u64, observation: Observation) -> Self {
        Self {
            start_time_unix_nano,
            previous: observation,
        }
    }
}

#[derive(Debug)]
struct TrackedSeries {
    state: SeriesState,
    last_touched: Instant,
}

/// All tracked series of one resource, behind a single lock.
#[derive(Debug, Default)]
pub struct SeriesStateTable {
    series: Mutex<AHashMap<SeriesIdentity, TrackedSeries>>,
}

impl SeriesStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the table lock. Every access goes through the returned guard,
    /// and the lock is released when it is dropped.
    pub fn lock(&self) -> LockedTable<'_> {
        self.lock_at(Instant::now())
    }

    /// Acquire the table lock, stamping touched entries with `now`.
    pub fn lock_at(&self, now: Instant) -> LockedTable<'_> {
        LockedTable {
            series: self.series.lock(),
            now,
        }
    }

    /// Number of tracked series
    pub fn len(&self) -> usize {
        self.series.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.lock().is_empty()
    }

    /// Drop every series idle for longer than `max_idle` as of `now`.
    /// Returns the number of series removed.
    pub fn evict_idle(&self, now: Instant, max_idle: Duration) -> usize {
        let mut series = self.series.lock();
        let before = series.len();
        series.retain(|_, tracked| now.saturating_duration_since(tracked.last_touched) <= max_idle);
        before - series.len()
    }
}

/// Exclusive access to a [`SeriesStateTable`].
///
/// State is handed out by value; changes only land through [`LockedTable::store`].
pub struct LockedTable<'a> {
    series: MutexGuard<'a, AHashMap<SeriesIdentity, TrackedSeries>>,
    now: Instant,
}

impl LockedTable<'_> {
    /// Existing state of `identity`, or a zero-valued entry created for it.
    /// The flag is `true` when the series was already tracked.
    pub fn get_or_create(&mut self, identity: &SeriesIdentity) -> (SeriesState, bool) {
        let now = self.now;
        if let Some(tracked) = self.series.get_mut(identity) {
            tracked.last_touched = now;
            return (tracked.state, true);
        }

        let state = SeriesState::zero(identity.kind());
        self.series.insert(
            identity.clone(),
            TrackedSeries {
                state,
                last_touched: now,
            },
        );
        (state, false)
    }

    /// Write back the state of `identity`.
    pub fn store(&mut self, identity: &SeriesIdentity, state: SeriesState) {
        let now = self.now;
        match self.series.get_mut(identity) {
            Some(tracked) => {
                tracked.state = state;
                tracked.last_touched = now;
            },
            None => {
                self.series.insert(
                    identity.clone(),
                    TrackedSeries {
                        state,
                        last_touched: now,
                    },
                );
            },
        }
    }

    /// Refresh the last access time of `identity`. Returns `false` if it is
    /// not tracked.
    pub fn touch(&mut self, identity: &SeriesIdentity) -> bool {
        let now = self.now;
        match self.series.get_mut(identity) {
            Some(tracked) => {
                tracked.last_touched = now;
                true
            },
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
