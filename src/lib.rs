//! truereset - true reset point adjustment for cumulative OTEL metrics.
//!
//! Scrape-style collectors emit cumulative points without a reliable start
//! time, and the underlying counters reset silently when a process
//! restarts. This crate rewrites start times in place so every point of an
//! accumulation epoch shares the epoch's start, and a new epoch begins
//! exactly where a decrease is observed.
//!
//! # Architecture
//!
//! - `adjuster`: series identities, per-resource state tables, the sharded
//!   table registry with its background sweeper, and the batch adjuster
//! - `core`: configuration, errors and logging setup
//!
//! # Example
//!
//! ```no_run
//! use opentelemetry_proto::tonic::metrics::v1::ResourceMetrics;
//! use truereset::core::AdjusterConfig;
//! use truereset::ResetAdjuster;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adjuster = ResetAdjuster::new(&AdjusterConfig::default())?;
//!     let sweeper = adjuster.start_sweeper()?;
//!
//!     let mut batch: Vec<ResourceMetrics> = Vec::new(); // from the pipeline
//!     adjuster.adjust_metrics(&mut batch);
//!
//!     sweeper.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod adjuster;
pub mod core;

// Re-export core types for convenience
pub use crate::adjuster::{AdjusterStats, ResetAdjuster};
pub use crate::core::{AdjusterConfig, Result};
