//! Synthetic A/B traffic generator.
//!
//! Usage:
//!   cargo run --bin simulate_traffic -- --seed 42 --evaluate

use abtest_toolkit::commands::{simulate, SimulateArgs};
use abtest_toolkit::env_filter;
use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "simulate_traffic")]
#[command(about = "Simulate visitors, conversions and comments for two page versions")]
struct Args {
    /// Visitors per version
    #[arg(short = 'n', long)]
    visitors_per_version: Option<u64>,

    /// Conversion rate of version A
    #[arg(long)]
    rate_a: Option<f64>,

    /// Conversion rate of version B
    #[arg(long)]
    rate_b: Option<f64>,

    /// Chance that a converter leaves a comment
    #[arg(long)]
    comment_probability: Option<f64>,

    /// RNG seed
    #[arg(long, env = "AB_SIM_SEED")]
    seed: Option<u64>,

    /// Output directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Evaluate the generated counts
    #[arg(long, default_value_t = false)]
    evaluate: bool,
}

fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt().with_env_filter(env_filter()?).init();

    let args = Args::parse();

    simulate::run(&SimulateArgs {
        visitors_per_version: args.visitors_per_version,
        rate_a: args.rate_a,
        rate_b: args.rate_b,
        comment_probability: args.comment_probability,
        seed: args.seed,
        output_dir: args.output_dir,
        evaluate: args.evaluate,
    })?;

    Ok(())
}
