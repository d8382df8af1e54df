//! Common test utilities and fixtures.

#![allow(dead_code)]

use opentelemetry_proto::tonic::{
    common::v1::{any_value::Value, AnyValue, KeyValue},
    metrics::v1::{
        metric::Data, number_data_point, AggregationTemporality, Gauge, Histogram,
        HistogramDataPoint, Metric, NumberDataPoint, ResourceMetrics, ScopeMetrics, Sum, Summary,
        SummaryDataPoint,
    },
    resource::v1::Resource,
};

pub fn string_kv(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue {
            value: Some(Value::StringValue(value.to_string())),
        }),
    }
}

/// Fixture builder for a single resource group with sensible defaults.
pub struct TestBatchBuilder {
    job: String,
    instance: String,
    metrics: Vec<Metric>,
}

impl TestBatchBuilder {
    pub fn new(job: &str) -> Self {
        Self {
            job: job.to_string(),
            instance: "instance-1".to_string(),
            metrics: Vec::new(),
        }
    }

    pub fn instance(mut self, instance: &str) -> Self {
        self.instance = instance.to_string();
        self
    }

    pub fn counter(self, name: &str, start: u64, value: f64) -> Self {
        self.counter_with(name, &[], start, value)
    }

    pub fn counter_with(mut self, name: &str, attrs: &[(&str, &str)], start: u64, value: f64) -> Self {
        self.metrics.push(metric(
            name,
            Data::Sum(Sum {
                data_points: vec![number_point(attrs, start, value)],
                aggregation_temporality: AggregationTemporality::Cumulative as i32,
                is_monotonic: true,
            }),
        ));
        self
    }

    pub fn gauge(mut self, name: &str, start: u64, value: f64) -> Self {
        self.metrics.push(metric(
            name,
            Data::Gauge(Gauge {
                data_points: vec![number_point(&[], start, value)],
            }),
        ));
        self
    }

    pub fn histogram(mut self, name: &str, start: u64, count: u64, sum: f64) -> Self {
        self.metrics.push(metric(
            name,
            Data::Histogram(Histogram {
                data_points: vec![HistogramDataPoint {
                    start_time_unix_nano: start,
                    time_unix_nano: start,
                    count,
                    sum: Some(sum),
                    ..Default::default()
                }],
                aggregation_temporality: AggregationTemporality::Cumulative as i32,
            }),
        ));
        self
    }

    pub fn summary(mut self, name: &str, start: u64, count: u64, sum: f64) -> Self {
        self.metrics.push(metric(
            name,
            Data::Summary(Summary {
                data_points: vec![SummaryDataPoint {
                    start_time_unix_nano: start,
                    time_unix_nano: start,
                    count,
                    sum,
                    ..Default::default()
                }],
            }),
        ));
        self
    }

    pub fn build(self) -> ResourceMetrics {
        ResourceMetrics {
            resource: Some(Resource {
                attributes: vec![
                    string_kv("service.name", &self.job),
                    string_kv("service.instance.id", &self.instance),
                ],
                dropped_attributes_count: 0,
            }),
            scope_metrics: vec![ScopeMetrics {
                scope: None,
                metrics: self.metrics,
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }
    }
}

fn metric(name: &str, data: Data) -> Metric {
    Metric {
        name: name.to_string(),
        description: String::new(),
        unit: String::new(),
        metadata: vec![],
        data: Some(data),
    }
}

fn number_point(attrs: &[(&str, &str)], start: u64, value: f64) -> NumberDataPoint {
    NumberDataPoint {
        attributes: attrs.iter().map(|(k, v)| string_kv(k, v)).collect(),
        start_time_unix_nano: start,
        time_unix_nano: start,
        value: Some(number_data_point::Value::AsDouble(value)),
        exemplars: vec![],
        flags: 0,
    }
}

/// Start times of every point in a resource group, in order.
pub fn start_times(rm: &ResourceMetrics) -> Vec<u64> {
    let mut starts = Vec::new();
    for scope in &rm.scope_metrics {
        for metric in &scope.metrics {
            match metric.data.as_ref() {
                Some(Data::Gauge(g)) => {
                    starts.extend(g.data_points.iter().map(|p| p.start_time_unix_nano))
                },
                Some(Data::Sum(s)) => {
                    starts.extend(s.data_points.iter().map(|p| p.start_time_unix_nano))
                },
                Some(Data::Histogram(h)) => {
                    starts.extend(h.data_points.iter().map(|p| p.start_time_unix_nano))
                },
                Some(Data::ExponentialHistogram(h)) => {
                    starts.extend(h.data_points.iter().map(|p| p.start_time_unix_nano))
                },
                Some(Data::Summary(s)) => {
                    starts.extend(s.data_points.iter().map(|p| p.start_time_unix_nano))
                },
                None => {},
            }
        }
    }
    starts
}
