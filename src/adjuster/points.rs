//! Uniform access to the cumulative OTLP data point types.

use super::state::Observation;
use opentelemetry_proto::tonic::{
    common::v1::KeyValue,
    metrics::v1::{
        number_data_point, DataPointFlags, ExponentialHistogramDataPoint, HistogramDataPoint,
        NumberDataPoint, SummaryDataPoint,
    },
};

/// A data point whose start time can be adjusted.
pub trait CumulativePoint {
    /// Point attributes
    fn attributes(&self) -> &[KeyValue];

    fn start_time_unix_nano(&self) -> u64;

    fn set_start_time_unix_nano(&mut self, start_time_unix_nano: u64);

    /// Raw OTLP flag bits
    fn flags(&self) -> u32;

    /// Observed payload, `None` when the point carries no value.
    fn observation(&self) -> Option<Observation>;

    /// Whether the point is a staleness marker
    fn no_recorded_value(&self) -> bool {
        self.flags() & DataPointFlags::NoRecordedValueMask as u32 != 0
    }
}

impl CumulativePoint for NumberDataPoint {
    fn attributes(&self) -> &[KeyValue] {
        &self.attributes
    }

    fn start_time_unix_nano(&self) -> u64 {
        self.start_time_unix_nano
    }

    fn set_start_time_unix_nano(&mut self, start_time_unix_nano: u64) {
        self.start_time_unix_nano = start_time_unix_nano;
    }

    fn flags(&self) -> u32 {
        self.flags
    }

    #[allow(clippy::cast_precision_loss)]
    fn observation(&self) -> Option<Observation> {
        let value = match self.value.as_ref()? {
            number_data_point::Value::AsDouble(v) => *v,
            number_data_point::Value::AsInt(v) => *v as f64,
        };
        Some(Observation::Counter { value })
    }
}

/// Implements [`CumulativePoint`] for count/sum distribution points. The
/// closure maps a point to its sum.
macro_rules! impl_distribution_point {
    ($point:ty, $sum:expr) => {
        impl CumulativePoint for $point {
            fn attributes(&self) -> &[KeyValue] {
                &self.attributes
            }

            fn start_time_unix_nano(&self) -> u64 {
                self.start_time_unix_nano
            }

            fn set_start_time_unix_nano(&mut self, start_time_unix_nano: u64) {
                self.start_time_unix_nano = start_time_unix_nano;
            }

            fn flags(&self) -> u32 {
                self.flags
            }

            fn observation(&self) -> Option<Observation> {
                let sum: fn(&$point) -> f64 = $sum;
                Some(Observation::Distribution {
                    count: self.count,
                    sum: sum(self),
                })
            }
        }
    };
}

// Unset optional sums compare as zero.
impl_distribution_point!(HistogramDataPoint, |p| p.sum.unwrap_or(0.0));
impl_distribution_point!(ExponentialHistogramDataPoint, |p| p.sum.unwrap_or(0.0));
impl_distribution_point!(SummaryDataPoint, |p| p.sum);
