//! Significance check for literal counts
//!
//! Inputs are taken from the command line; labels and significance level
//! fall back to the configuration.

use tracing::info;

use crate::analytics::{assess, render, Assessment, Observation, OutputFormat, SignificanceLevel};
use crate::config::Config;
use crate::error::Result;
use crate::metrics;

#[derive(Debug, Clone)]
pub struct EvaluateArgs {
    pub visitors_a: u64,
    pub conversions_a: u64,
    pub visitors_b: u64,
    pub conversions_b: u64,
    /// Overrides the configured significance level
    pub alpha: Option<f64>,
    pub label_a: Option<String>,
    pub label_b: Option<String>,
    pub format: String,
}

/// CLI value wins over config.
pub fn resolve_alpha(cli: Option<f64>, config: &Config) -> Result<SignificanceLevel> {
    match cli {
        Some(value) => SignificanceLevel::new(value),
        None => Ok(config.alpha),
    }
}

/// Evaluate without printing.
pub fn evaluate(args: &EvaluateArgs, config: &Config) -> Result<Assessment> {
    let alpha = resolve_alpha(args.alpha, config)?;
    let observation = Observation::from_counts(
        args.visitors_a,
        args.conversions_a,
        args.visitors_b,
        args.conversions_b,
    )
    .with_labels(
        args.label_a.clone().unwrap_or_else(|| config.group_a.clone()),
        args.label_b.clone().unwrap_or_else(|| config.group_b.clone()),
    );

    let assessment = assess(&observation, alpha)?;
    metrics::record_evaluation(&assessment);

    info!(
        verdict = assessment.verdict.as_str(),
        p_value = ?assessment.result.map(|r| r.p_value),
        "Evaluation finished"
    );
    Ok(assessment)
}

pub fn run(args: &EvaluateArgs) -> Result<Assessment> {
    let format = OutputFormat::parse(&args.format)?;
    let config = Config::load()?;
    let assessment = evaluate(args, &config)?;
    println!("{}", render(&assessment, format)?);
    Ok(assessment)
}
