//! A/B test toolkit CLI - main entry point
//!
//! This is the unified CLI interface for evaluating, aggregating and
//! simulating A/B tests.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;

use abtest_toolkit::{commands, env_filter, metrics};
use tracing::warn;

#[derive(Parser)]
#[command(name = "abtest")]
#[command(about = "A/B test significance toolkit", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898);
    /// the process keeps serving after the command until Ctrl+C
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Test two groups given as literal counts
    Evaluate {
        /// Visitors who saw version A
        visitors_a: u64,

        /// Conversions in version A
        conversions_a: u64,

        /// Visitors who saw version B
        visitors_b: u64,

        /// Conversions in version B
        conversions_b: u64,

        /// Significance level (fallback: AB_ALPHA, config.yml, 0.05)
        #[arg(long)]
        alpha: Option<f64>,

        /// Label of group A
        #[arg(long)]
        label_a: Option<String>,

        /// Label of group B
        #[arg(long)]
        label_b: Option<String>,

        /// Output format: text | json | yaml
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Aggregate an events CSV and test two of its versions
    Aggregate {
        /// Events CSV (user_pseudo_id,event_name,test_version[,timestamp])
        #[arg(short, long)]
        events: PathBuf,

        /// Feedback JSON lines
        #[arg(short, long)]
        feedback: Option<PathBuf>,

        /// Directory for the prepared tables (fallback: AB_OUTPUT_DIR)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Version treated as group A (fallback: AB_GROUP_A)
        #[arg(long)]
        group_a: Option<String>,

        /// Version treated as group B (fallback: AB_GROUP_B)
        #[arg(long)]
        group_b: Option<String>,

        /// Significance level
        #[arg(long)]
        alpha: Option<f64>,

        /// Output format: text | json | yaml
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Generate synthetic traffic and feedback
    Simulate {
        /// Visitors assigned to each version
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

        /// RNG seed for reproducible runs (fallback: AB_SIM_SEED)
        #[arg(long)]
        seed: Option<u64>,

        /// Directory for events.csv and user_comments.jsonl
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Run the significance test on the generated counts
        #[arg(long, default_value_t = false)]
        evaluate: bool,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Evaluate { .. } => "evaluate",
            Commands::Aggregate { .. } => "aggregate",
            Commands::Simulate { .. } => "simulate",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt().with_env_filter(env_filter()?).init();

    let cli = Cli::parse();

    let serving_metrics = match cli.metrics_addr.as_deref() {
        Some(addr) => match addr.parse::<SocketAddr>() {
            Ok(socket) => {
                metrics::spawn_metrics_server(socket);
                true
            }
            Err(err) => {
                warn!(%addr, "Invalid metrics address: {}", err);
                false
            }
        },
        None => false,
    };

    let command_name = cli.command.name();
    metrics::record_command_start(command_name);
    let start = Instant::now();

    let result = execute_command(cli.command);

    metrics::record_command_result(command_name, start.elapsed(), result.is_ok());

    if serving_metrics {
        metrics::wait_for_shutdown().await;
    }

    result
}

fn execute_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Evaluate {
            visitors_a,
            conversions_a,
            visitors_b,
            conversions_b,
            alpha,
            label_a,
            label_b,
            format,
        } => {
            commands::evaluate::run(&commands::EvaluateArgs {
                visitors_a,
                conversions_a,
                visitors_b,
                conversions_b,
                alpha,
                label_a,
                label_b,
                format,
            })?;
        }
        Commands::Aggregate {
            events,
            feedback,
            output_dir,
            group_a,
            group_b,
            alpha,
            format,
        } => {
            commands::aggregate::run(&commands::AggregateArgs {
                events,
                feedback,
                output_dir,
                group_a,
                group_b,
                alpha,
                format,
            })?;
        }
        Commands::Simulate {
            visitors_per_version,
            rate_a,
            rate_b,
            comment_probability,
            seed,
            output_dir,
            evaluate,
        } => {
            commands::simulate::run(&commands::SimulateArgs {
                visitors_per_version,
                rate_a,
                rate_b,
                comment_probability,
                seed,
                output_dir,
                evaluate,
            })?;
        }
    }

    Ok(())
}
