//! Generate synthetic A/B traffic
//!
//! Writes the events CSV and the feedback JSONL that `aggregate` consumes.

use std::path::PathBuf;

use tracing::info;

use crate::analytics::{assess, render, Observation, OutputFormat};
use crate::config::Config;
use crate::error::Result;
use crate::etl::{ensure_dir, write_events_csv, write_feedback_jsonl};
use crate::metrics;
use crate::simulation::{simulate, Arm, SimulatedTraffic, SimulationConfig};

pub const EVENTS_FILE: &str = "events.csv";
pub const COMMENTS_FILE: &str = "user_comments.jsonl";

#[derive(Debug, Clone, Default)]
pub struct SimulateArgs {
    pub visitors_per_version: Option<u64>,
    pub rate_a: Option<f64>,
    pub rate_b: Option<f64>,
    pub comment_probability: Option<f64>,
    pub seed: Option<u64>,
    pub output_dir: Option<PathBuf>,
    /// Also run the significance test on the generated counts
    pub evaluate: bool,
}

#[derive(Debug, Clone)]
pub struct SimulateOutcome {
    pub traffic: SimulatedTraffic,
    pub events_path: PathBuf,
    pub comments_path: PathBuf,
}

pub fn simulation_config(args: &SimulateArgs, config: &Config) -> SimulationConfig {
    let mut sim = config.simulation_config();
    if let Some(n) = args.visitors_per_version {
        sim.visitors_per_version = n;
    }
    if let Some(rate) = args.rate_a {
        sim.conversion_rate_a = rate;
    }
    if let Some(rate) = args.rate_b {
        sim.conversion_rate_b = rate;
    }
    if let Some(p) = args.comment_probability {
        sim.comment_probability = p;
    }
    if args.seed.is_some() {
        sim.seed = args.seed;
    }
    sim
}

/// Simulate and write both files into the output directory.
pub fn generate(args: &SimulateArgs, config: &Config) -> Result<SimulateOutcome> {
    let sim = simulation_config(args, config);
    let traffic = simulate(&sim)?;

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output_dir.clone());
    ensure_dir(&output_dir)?;

    let events_path = output_dir.join(EVENTS_FILE);
    let comments_path = output_dir.join(COMMENTS_FILE);
    write_events_csv(&events_path, &traffic.events)?;
    write_feedback_jsonl(&comments_path, &traffic.feedback)?;

    info!(
        visits = traffic.visits.len(),
        conversions_a = traffic.conversions(Arm::A),
        conversions_b = traffic.conversions(Arm::B),
        comments = traffic.feedback.len(),
        "Simulation finished"
    );

    Ok(SimulateOutcome {
        traffic,
        events_path,
        comments_path,
    })
}

pub fn run(args: &SimulateArgs) -> Result<SimulateOutcome> {
    let config = Config::load()?;
    let outcome = generate(args, &config)?;
    let traffic = &outcome.traffic;

    println!("Simulated {} visits", traffic.visits.len());
    for (arm, label) in [(Arm::A, &config.group_a), (Arm::B, &config.group_b)] {
        println!(
            "  {}: {} visitors, {} conversions",
            label,
            traffic.visitors(arm),
            traffic.conversions(arm)
        );
    }
    println!("Comments collected: {}", traffic.feedback.len());
    println!("Events written to {}", outcome.events_path.display());
    println!("Comments written to {}", outcome.comments_path.display());

    if args.evaluate {
        let observation = Observation::from_counts(
            traffic.visitors(Arm::A),
            traffic.conversions(Arm::A),
            traffic.visitors(Arm::B),
            traffic.conversions(Arm::B),
        )
        .with_labels(config.group_a.clone(), config.group_b.clone());
        let assessment = assess(&observation, config.alpha)?;
        metrics::record_evaluation(&assessment);
        println!();
        println!("{}", render(&assessment, OutputFormat::Text)?);
    }

    Ok(outcome)
}
