//! Utilities module for logging, errors, and numeric helpers

pub mod error;
pub mod logging;

pub use error::{DeepLeafError, Result, ResultExt};
pub use logging::{init_logging, LogConfig, LogLevel};

/// Round to two decimals, the precision every reported confidence uses
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
