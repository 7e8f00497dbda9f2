//! Chi-squared significance check for two conversion counts.
//!
//! Usage:
//!   cargo run --bin chi_squared_test
//!   cargo run --bin chi_squared_test -- --visitors-a 1000 --conversions-a 200 --visitors-b 1000 --conversions-b 50

use abtest_toolkit::commands::{evaluate, EvaluateArgs};
use abtest_toolkit::env_filter;
use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;

#[derive(Parser, Debug)]
#[command(name = "chi_squared_test")]
#[command(about = "Chi-squared test for an A/B experiment")]
struct Args {
    /// Visitors who saw version A
    #[arg(long, default_value_t = 184)]
    visitors_a: u64,

    /// Conversions in version A
    #[arg(long, default_value_t = 11)]
    conversions_a: u64,

    /// Visitors who saw version B
    #[arg(long, default_value_t = 154)]
    visitors_b: u64,

    /// Conversions in version B
    #[arg(long, default_value_t = 8)]
    conversions_b: u64,

    /// Significance level
    #[arg(long, env = "AB_ALPHA")]
    alpha: Option<f64>,

    /// Output format: text | json | yaml
    #[arg(long, default_value = "text")]
    format: String,
}

fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt().with_env_filter(env_filter()?).init();

    let args = Args::parse();

    evaluate::run(&EvaluateArgs {
        visitors_a: args.visitors_a,
        conversions_a: args.conversions_a,
        visitors_b: args.visitors_b,
        conversions_b: args.conversions_b,
        alpha: args.alpha,
        label_a: None,
        label_b: None,
        format: args.format,
    })?;

    Ok(())
}
