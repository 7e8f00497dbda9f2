//! Aggregate raw analytics events into per-version counts and test them
//!
//! Reads the events CSV (and optional feedback JSONL), writes the prepared
//! tables to the output directory and evaluates the two requested versions.

use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::analytics::{assess, render, Assessment, OutputFormat};
use crate::commands::evaluate::resolve_alpha;
use crate::config::Config;
use crate::error::Result;
use crate::etl::{observation_for, run_pipeline, EtlJob, EtlReport};
use crate::metrics;

#[derive(Debug, Clone)]
pub struct AggregateArgs {
    pub events: PathBuf,
    pub feedback: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub group_a: Option<String>,
    pub group_b: Option<String>,
    pub alpha: Option<f64>,
    pub format: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateOutcome {
    pub etl: EtlReport,
    pub assessment: Assessment,
}

pub fn job_for(args: &AggregateArgs, config: &Config) -> EtlJob {
    EtlJob {
        events_path: args.events.clone(),
        feedback_path: args.feedback.clone(),
        output_dir: args
            .output_dir
            .clone()
            .unwrap_or_else(|| config.output_dir.clone()),
        event_names: config.event_names.clone(),
    }
}

/// Run the ETL and evaluate the two configured versions.
pub fn aggregate(args: &AggregateArgs, config: &Config) -> Result<AggregateOutcome> {
    let alpha = resolve_alpha(args.alpha, config)?;
    let etl = run_pipeline(&job_for(args, config))?;

    let group_a = args.group_a.as_deref().unwrap_or(&config.group_a);
    let group_b = args.group_b.as_deref().unwrap_or(&config.group_b);
    let observation = observation_for(&etl.groups, group_a, group_b)?;

    let assessment = assess(&observation, alpha)?;
    metrics::record_evaluation(&assessment);

    info!(
        visitors = etl.visitors,
        verdict = assessment.verdict.as_str(),
        "Aggregation finished"
    );
    Ok(AggregateOutcome { etl, assessment })
}

fn print_summary(etl: &EtlReport) {
    println!("Events read: {}", etl.events_read);
    println!("Distinct visitors: {}", etl.visitors);
    for (version, counts) in &etl.groups {
        println!(
            "  {}: {} visitors, {} conversions",
            version, counts.visitors, counts.conversions
        );
    }
    for (version, summary) in &etl.feedback {
        println!(
            "  {} feedback: {} responses, avg rating {:.2}, avg time to convert {:.2}s",
            version,
            summary.responses,
            summary.average_star_rating,
            summary.average_time_to_convert_seconds
        );
    }
    println!("Outcomes written to {}", etl.outcomes_path.display());
    if let Some(path) = &etl.feedback_path {
        println!("Feedback written to {}", path.display());
    }
}

pub fn run(args: &AggregateArgs) -> Result<AggregateOutcome> {
    let format = OutputFormat::parse(&args.format)?;
    let config = Config::load()?;
    let outcome = aggregate(args, &config)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&outcome)?),
        OutputFormat::Text => {
            print_summary(&outcome.etl);
            println!();
            println!("{}", render(&outcome.assessment, format)?);
        }
    }
    Ok(outcome)
}
