//! A/B Test Significance Toolkit Library
//!
//! This library provides tools to:
//! - Decide whether two conversion rates differ significantly
//!   (Pearson chi-squared test with Yates' correction)
//! - Aggregate raw analytics events into per-version visitor/conversion counts
//! - Clean and summarize qualitative feedback from converting visitors
//! - Generate synthetic A/B traffic for trying the pipeline end to end
//! - Expose command metrics to Prometheus

pub mod analytics;
pub mod config;
pub mod error;
pub mod etl;
pub mod metrics;
pub mod simulation;

// Re-export common types
pub use analytics::{
    assess, evaluate, Assessment, ContingencyTable, GroupCounts, Observation, SignificanceLevel,
    TestResult, Verdict,
};
pub use config::Config;
pub use error::{Error, Result};

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Log directive applied on top of `RUST_LOG` by every binary.
pub const DEFAULT_LOG_DIRECTIVE: &str = "abtest_toolkit=info";

/// `RUST_LOG` filter with this crate's `info` output enabled.
pub fn env_filter() -> std::result::Result<EnvFilter, ParseError> {
    Ok(EnvFilter::from_default_env().add_directive(DEFAULT_LOG_DIRECTIVE.parse()?))
}

pub mod commands;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_enables_crate_info() {
        let filter = env_filter().unwrap();
        assert!(filter.to_string().contains(DEFAULT_LOG_DIRECTIVE));
    }
}
