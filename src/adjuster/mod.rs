//! True reset point adjustment of cumulative metric start times.
//!
//! Scrape-style collection produces cumulative points whose start time is
//! unreliable and whose value silently drops when the source restarts. The
//! [`ResetAdjuster`] remembers, per series, the start of the current
//! accumulation epoch and the last observation:
//!
//! - The first point of an epoch keeps its own start time.
//! - Every later point of the epoch gets its start time rewritten to the
//!   epoch start.
//! - A decrease opens a new epoch at the decreasing point.
//! - Staleness markers inherit the epoch start without updating state.
//!
//! State is partitioned per resource. A batch locks each resource's table
//! once, so concurrent batches for different resources never contend, and
//! batches for the same resource apply in some serial order.

pub mod identity;
pub mod points;
pub mod registry;
pub mod state;

pub use identity::{MetricKind, ResourceKey, SeriesIdentity};
pub use points::CumulativePoint;
pub use registry::{spawn_sweeper, ResourceTableRegistry, SweepReport, SweeperHandle};
pub use state::{LockedTable, Observation, ResetPolicy, SeriesState, SeriesStateTable};

use crate::core::{AdjusterConfig, AdjustmentStrategy, ResourceKeyMode, Result};
use opentelemetry_proto::tonic::{
    collector::metrics::v1::ExportMetricsServiceRequest,
    metrics::v1::{metric::Data, AggregationTemporality, Metric, ResourceMetrics},
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Point-level counters.
#[derive(Debug, Default)]
struct AdjusterCounters {
    points_adjusted: AtomicU64,
    resets_detected: AtomicU64,
    series_created: AtomicU64,
    stale_points: AtomicU64,
    skipped_metrics: AtomicU64,
}

/// Snapshot of adjuster activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdjusterStats {
    /// Points whose start time was rewritten to their epoch start
    pub points_adjusted: u64,
    /// Decreases that opened a new epoch
    pub resets_detected: u64,
    /// Series seen for the first time (or again after eviction)
    pub series_created: u64,
    /// Staleness markers encountered on tracked series
    pub stale_points: u64,
    /// Metrics skipped because they carried no data
    pub skipped_metrics: u64,
    /// Series evicted by the sweeper
    pub series_evicted: u64,
    /// Resource tables evicted by the sweeper
    pub tables_evicted: u64,
    /// Resource tables currently tracked
    pub resources_tracked: usize,
}

/// Rewrites start times of cumulative points per the true reset point
/// strategy.
#[derive(Debug)]
pub struct ResetAdjuster {
    registry: Arc<ResourceTableRegistry>,
    resource_key: ResourceKeyMode,
    strategy: AdjustmentStrategy,
    counters: AdjusterCounters,
}

impl ResetAdjuster {
    /// Create an adjuster from validated configuration.
    ///
    /// The sweeper is not started; see [`ResetAdjuster::start_sweeper`].
    pub fn new(config: &AdjusterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_registry(
            Arc::new(ResourceTableRegistry::new(config.gc_interval)),
            config.resource_key,
        ))
    }

    /// Create an adjuster over an existing registry.
    pub fn with_registry(
        registry: Arc<ResourceTableRegistry>,
        resource_key: ResourceKeyMode,
    ) -> Self {
        Self {
            registry,
            resource_key,
            strategy: AdjustmentStrategy::TrueResetPoint,
            counters: AdjusterCounters::default(),
        }
    }

    /// Shared state registry
    pub fn registry(&self) -> &Arc<ResourceTableRegistry> {
        &self.registry
    }

    /// Configured strategy name
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.as_str()
    }

    /// Start the background sweeper on the current Tokio runtime.
    pub fn start_sweeper(&self) -> Result<SweeperHandle> {
        spawn_sweeper(Arc::clone(&self.registry))
    }

    /// Adjust an export request, returning it with start times rewritten.
    pub fn adjust_request(
        &self,
        mut request: ExportMetricsServiceRequest,
    ) -> ExportMetricsServiceRequest {
        self.adjust_metrics(&mut request.resource_metrics);
        request
    }

    /// Adjust a batch of resource groups in place.
    ///
    /// Never fails: empty groups, metrics without data and points without
    /// values are skipped.
    pub fn adjust_metrics(&self, resource_metrics: &mut [ResourceMetrics]) {
        for rm in resource_metrics.iter_mut() {
            self.adjust_resource(rm);
        }
    }

    fn adjust_resource(&self, rm: &mut ResourceMetrics) {
        let key = Arc::new(ResourceKey::from_resource(rm.resource.as_ref(), self.resource_key));
        let table = self.registry.get(&key);

        // The table lock is held for the whole resource group so nothing
        // else can modify the state used for comparisons.
        let mut locked = table.lock();
        for scope in &mut rm.scope_metrics {
            for metric in &mut scope.metrics {
                self.adjust_metric(&mut locked, &key, metric);
            }
        }
    }

    fn adjust_metric(
        &self,
        table: &mut LockedTable<'_>,
        resource: &Arc<ResourceKey>,
        metric: &mut Metric,
    ) {
        let Metric { name, data, .. } = metric;
        let name = name.as_str();

        let Some(data) = data.as_mut() else {
            tracing::info!(metric = %name, "Adjust - skipping metric without data");
            self.counters.skipped_metrics.fetch_add(1, Ordering::Relaxed);
            return;
        };

        match data {
            // Gauges are not cumulative
            Data::Gauge(_) => {},
            Data::Sum(sum) => {
                if !sum.is_monotonic || !is_cumulative(sum.aggregation_temporality) {
                    return;
                }
                self.adjust_points(
                    table,
                    resource,
                    name,
                    MetricKind::Sum,
                    &mut sum.data_points,
                    ResetPolicy::AnyDecrease,
                );
            },
            Data::Histogram(histogram) => {
                if !is_cumulative(histogram.aggregation_temporality) {
                    return;
                }
                self.adjust_points(
                    table,
                    resource,
                    name,
                    MetricKind::Histogram,
                    &mut histogram.data_points,
                    ResetPolicy::AnyDecrease,
                );
            },
            Data::ExponentialHistogram(histogram) => {
                if !is_cumulative(histogram.aggregation_temporality) {
                    return;
                }
                self.adjust_points(
                    table,
                    resource,
                    name,
                    MetricKind::ExponentialHistogram,
                    &mut histogram.data_points,
                    ResetPolicy::AnyDecrease,
                );
            },
            Data::Summary(summary) => {
                self.adjust_points(
                    table,
                    resource,
                    name,
                    MetricKind::Summary,
                    &mut summary.data_points,
                    ResetPolicy::IgnoreUnset,
                );
            },
        }
    }

    /// Apply the epoch rules to every point of one metric stream.
    fn adjust_points<P: CumulativePoint>(
        &self,
        table: &mut LockedTable<'_>,
        resource: &Arc<ResourceKey>,
        metric_name: &str,
        kind: MetricKind,
        points: &mut [P],
        policy: ResetPolicy,
    ) {
        for point in points.iter_mut() {
            let stale = point.no_recorded_value();
            let observation = point.observation();
            if observation.is_none() && !stale {
                tracing::trace!(metric = %metric_name, "Skipping point without value");
                continue;
            }

            let identity = SeriesIdentity::new(resource, metric_name, kind, point.attributes());
            let (tracked, existed) = table.get_or_create(&identity);

            if !existed {
                // First point of the series: it opens the epoch as-is.
                let first = observation.unwrap_or(tracked.previous);
                table.store(&identity, SeriesState::begin(point.start_time_unix_nano(), first));
                self.counters.series_created.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            let current = match observation {
                Some(current) if !stale => current,
                _ => {
                    point.set_start_time_unix_nano(tracked.start_time_unix_nano);
                    self.counters.stale_points.fetch_add(1, Ordering::Relaxed);
                    continue;
                },
            };

            if current.is_reset_from(&tracked.previous, policy) {
                tracing::debug!(
                    metric = %metric_name,
                    kind = kind.as_str(),
                    previous = ?tracked.previous,
                    current = ?current,
                    "Reset detected, opening new epoch"
                );
                table.store(&identity, SeriesState::begin(point.start_time_unix_nano(), current));
                self.counters.resets_detected.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            table.store(&identity, SeriesState::begin(tracked.start_time_unix_nano, current));
            point.set_start_time_unix_nano(tracked.start_time_unix_nano);
            self.counters.points_adjusted.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Snapshot of counters and registry size
    pub fn stats(&self) -> AdjusterStats {
        AdjusterStats {
            points_adjusted: self.counters.points_adjusted.load(Ordering::Relaxed),
            resets_detected: self.counters.resets_detected.load(Ordering::Relaxed),
            series_created: self.counters.series_created.load(Ordering::Relaxed),
            stale_points: self.counters.stale_points.load(Ordering::Relaxed),
            skipped_metrics: self.counters.skipped_metrics.load(Ordering::Relaxed),
            series_evicted: self.registry.series_evicted(),
            tables_evicted: self.registry.tables_evicted(),
            resources_tracked: self.registry.len(),
        }
    }
}

fn is_cumulative(temporality: i32) -> bool {
    temporality == AggregationTemporality::Cumulative as i32
}
