//! A/B test analytics
//!
//! Provides:
//! - Observed counts and the 2×2 contingency table
//! - Chi-squared significance test with Yates' correction
//! - Text / JSON / YAML reports

pub mod contingency;
pub mod report;
pub mod significance;

pub use contingency::{ContingencyTable, GroupCounts, Observation};
pub use report::{print_report, render, render_text, OutputFormat};
pub use significance::{
    assess, chi_squared_test, evaluate, evaluate_observation, evaluate_with_alpha, Assessment,
    RateComparison, SignificanceLevel, TestResult, Verdict, DEFAULT_ALPHA,
};
