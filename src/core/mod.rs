//! Error handling, configuration and logging shared by the adjuster.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{
    AdjusterConfig, AdjustmentStrategy, ConfigBuilder, LogLevel, LoggingConfig, ResourceKeyMode,
    STRATEGY_NAME,
};
pub use error::{Result, TrueResetError};
pub use logging::init_logging;
