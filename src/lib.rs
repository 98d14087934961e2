pub mod client;
pub mod config;
pub mod domain;
pub mod driver;
pub mod error;
pub mod journey;
pub mod metrics;
pub mod telemetry;

pub use error::{LoadTestError, Result};
