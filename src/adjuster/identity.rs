//! Resource and series identities.
//!
//! A series is addressed by the resource it belongs to, the metric's name
//! and kind, and the point's attribute set. Attribute sets are compared as
//! unordered sets, so they are rendered to strings and sorted on
//! construction.

use crate::core::ResourceKeyMode;
use opentelemetry_proto::tonic::{
    common::v1::{any_value::Value, AnyValue, KeyValue},
    metrics::v1::{metric::Data, Metric},
    resource::v1::Resource,
};
use std::fmt::Write as _;
use std::sync::Arc;

/// Resource attribute naming the job/service.
pub const SERVICE_NAME: &str = "service.name";
/// Resource attribute naming the instance.
pub const SERVICE_INSTANCE_ID: &str = "service.instance.id";

/// Stable identity of a resource, the unit of state partitioning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    attributes: Box<[(String, String)]>,
}

impl ResourceKey {
    /// Key from a job (service name) and instance id.
    pub fn service(job: &str, instance: &str) -> Self {
        Self {
            attributes: Box::new([
                (SERVICE_NAME.to_string(), job.to_string()),
                (SERVICE_INSTANCE_ID.to_string(), instance.to_string()),
            ]),
        }
    }

    /// Extract the key of a resource. Missing attributes key as empty
    /// strings, so a resource without identity still gets a table.
    pub fn from_resource(resource: Option<&Resource>, mode: ResourceKeyMode) -> Self {
        let attributes: &[KeyValue] = resource
            .map(|r| r.attributes.as_slice())
            .unwrap_or_default();

        match mode {
            ResourceKeyMode::ServiceIdentity => {
                let lookup = |key: &str| {
                    attributes
                        .iter()
                        .find(|kv| kv.key == key)
                        .map(render_key_value)
                        .unwrap_or_default()
                };
                Self::service(&lookup(SERVICE_NAME), &lookup(SERVICE_INSTANCE_ID))
            },
            ResourceKeyMode::AllAttributes => Self {
                attributes: sorted_attributes(attributes),
            },
        }
    }

    /// Sorted attribute pairs making up this key
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }
}

/// The closed set of metric kinds carried by OTLP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Point-in-time measurement
    Gauge,
    /// Counter, cumulative or delta
    Sum,
    /// Explicit bucket histogram
    Histogram,
    /// Base-2 exponential bucket histogram
    ExponentialHistogram,
    /// Quantile snapshot
    Summary,
}

impl MetricKind {
    /// Kind of a metric, `None` when it carries no data.
    pub fn of(metric: &Metric) -> Option<Self> {
        metric.data.as_ref().map(|data| match data {
            Data::Gauge(_) => MetricKind::Gauge,
            Data::Sum(_) => MetricKind::Sum,
            Data::Histogram(_) => MetricKind::Histogram,
            Data::ExponentialHistogram(_) => MetricKind::ExponentialHistogram,
            Data::Summary(_) => MetricKind::Summary,
        })
    }

    /// Name used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Sum => "sum",
            MetricKind::Histogram => "histogram",
            MetricKind::ExponentialHistogram => "exponential_histogram",
            MetricKind::Summary => "summary",
        }
    }

    /// Whether tracked state is a count/sum pair rather than a single value
    pub fn is_distribution(&self) -> bool {
        matches!(
            self,
            MetricKind::Histogram | MetricKind::ExponentialHistogram | MetricKind::Summary
        )
    }
}

/// Identity of one time series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesIdentity {
    resource: Arc<ResourceKey>,
    metric_name: String,
    kind: MetricKind,
    attributes: Box<[(String, String)]>,
}

impl SeriesIdentity {
    /// Build the identity of a data point.
    pub fn new(
        resource: &Arc<ResourceKey>,
        metric_name: &str,
        kind: MetricKind,
        attributes: &[KeyValue],
    ) -> Self {
        Self {
            resource: Arc::clone(resource),
            metric_name: metric_name.to_string(),
            kind,
            attributes: sorted_attributes(attributes),
        }
    }

    pub fn resource(&self) -> &ResourceKey {
        &self.resource
    }

    pub fn metric_name(&self) -> &str {
        &self.metric_name
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }
}

fn sorted_attributes(attributes: &[KeyValue]) -> Box<[(String, String)]> {
    let mut pairs: Vec<(String, String)> = attributes
        .iter()
        .map(|kv| (kv.key.clone(), render_key_value(kv)))
        .collect();
    pairs.sort_unstable();
    pairs.into_boxed_slice()
}

fn render_key_value(kv: &KeyValue) -> String {
    let mut out = String::new();
    if let Some(value) = &kv.value {
        render_any_value(value, &mut out);
    }
    out
}

fn render_any_value(value: &AnyValue, out: &mut String) {
    match &value.value {
        Some(Value::StringValue(s)) => out.push_str(s),
        Some(Value::BoolValue(b)) => {
            let _ = write!(out, "{}", b);
        },
        Some(Value::IntValue(i)) => {
            let _ = write!(out, "{}", i);
        },
        Some(Value::DoubleValue(d)) => {
            let _ = write!(out, "{}", d);
        },
        Some(Value::BytesValue(bytes)) => {
            for byte in bytes {
                let _ = write!(out, "{:02x}", byte);
            }
        },
        Some(Value::ArrayValue(array)) => {
            out.push('[');
            for (i, item) in array.values.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render_any_value(item, out);
            }
            out.push(']');
        },
        Some(Value::KvlistValue(list)) => {
            let mut entries: Vec<(&str, String)> = list
                .values
                .iter()
                .map(|kv| (kv.key.as_str(), render_key_value(kv)))
                .collect();
            entries.sort_unstable();
            out.push('{');
            for (i, (key, rendered)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}:{}", key, rendered);
            }
            out.push('}');
        },
        None => {},
    }
}
