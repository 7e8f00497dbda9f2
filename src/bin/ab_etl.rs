//! Prepare A/B test tables from raw analytics events.
//!
//! Usage:
//!   cargo run --bin ab_etl -- --events ab_test_output/events.csv --feedback ab_test_output/user_comments.jsonl

use abtest_toolkit::commands::{aggregate, AggregateArgs};
use abtest_toolkit::env_filter;
use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ab_etl")]
#[command(about = "Aggregate analytics events into A/B test results")]
struct Args {
    /// Events CSV export
    #[arg(long)]
    events: PathBuf,

    /// Feedback JSON lines
    #[arg(long)]
    feedback: Option<PathBuf>,

    /// Output directory for the prepared tables
    #[arg(long, env = "AB_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Version treated as group A
    #[arg(long, env = "AB_GROUP_A")]
    group_a: Option<String>,

    /// Version treated as group B
    #[arg(long, env = "AB_GROUP_B")]
    group_b: Option<String>,

    /// Output format: text | json | yaml
    #[arg(long, default_value = "text")]
    format: String,
}

fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt().with_env_filter(env_filter()?).init();

    let args = Args::parse();

    aggregate::run(&AggregateArgs {
        events: args.events,
        feedback: args.feedback,
        output_dir: args.output_dir,
        group_a: args.group_a,
        group_b: args.group_b,
        alpha: None,
        format: args.format,
    })?;

    Ok(())
}
