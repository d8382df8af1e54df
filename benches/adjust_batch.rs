use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use opentelemetry_proto::tonic::{
    common::v1::{any_value::Value, AnyValue, KeyValue},
    metrics::v1::{
        metric::Data, number_data_point, AggregationTemporality, Histogram, HistogramDataPoint,
        Metric, NumberDataPoint, ResourceMetrics, ScopeMetrics, Sum,
    },
    resource::v1::Resource,
};
use truereset::core::AdjusterConfig;
use truereset::ResetAdjuster;

fn kv(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue {
            value: Some(Value::StringValue(value.to_string())),
        }),
    }
}

fn create_batch(resources: usize, series: usize, step: u64) -> Vec<ResourceMetrics> {
    (0..resources)
        .map(|r| {
            let counters = NumberDataPoint {
                start_time_unix_nano: step,
                time_unix_nano: step,
                value: Some(number_data_point::Value::AsInt(step as i64)),
                ..Default::default()
            };
            let histogram = HistogramDataPoint {
                start_time_unix_nano: step,
                time_unix_nano: step,
                count: step,
                sum: Some(step as f64),
                ..Default::default()
            };

            let metrics = vec![
                Metric {
                    name: "requests_total".to_string(),
                    data: Some(Data::Sum(Sum {
                        data_points: (0..series)
                            .map(|s| NumberDataPoint {
                                attributes: vec![kv("route", &format!("/route/{}", s))],
                                ..counters.clone()
                            })
                            .collect(),
                        aggregation_temporality: AggregationTemporality::Cumulative as i32,
                        is_monotonic: true,
                    })),
                    ..Default::default()
                },
                Metric {
                    name: "latency".to_string(),
                    data: Some(Data::Histogram(Histogram {
                        data_points: (0..series)
                            .map(|s| HistogramDataPoint {
                                attributes: vec![kv("route", &format!("/route/{}", s))],
                                ..histogram.clone()
                            })
                            .collect(),
                        aggregation_temporality: AggregationTemporality::Cumulative as i32,
                    })),
                    ..Default::default()
                },
            ];

            ResourceMetrics {
                resource: Some(Resource {
                    attributes: vec![
                        kv("service.name", "bench"),
                        kv("service.instance.id", &format!("instance-{}", r)),
                    ],
                    dropped_attributes_count: 0,
                }),
                scope_metrics: vec![ScopeMetrics {
                    scope: None,
                    metrics,
                    schema_url: String::new(),
                }],
                schema_url: String::new(),
            }
        })
        .collect()
}

fn bench_adjust_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("adjust_batch");

    for series in [10, 100, 1000] {
        let adjuster = ResetAdjuster::new(&AdjusterConfig::default()).unwrap();
        let mut warmup = create_batch(4, series, 1);
        adjuster.adjust_metrics(&mut warmup);

        group.bench_with_input(BenchmarkId::from_parameter(series), &series, |b, &series| {
            let mut step = 2;
            b.iter_batched(
                || {
                    step += 1;
                    create_batch(4, series, step)
                },
                |mut batch| {
                    adjuster.adjust_metrics(&mut batch);
                    black_box(batch)
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_adjust_batch);
criterion_main!(benches);
