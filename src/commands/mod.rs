//! Command implementations
//!
//! Each module corresponds to a subcommand in the CLI and to one of the
//! standalone binaries.

pub mod aggregate;
pub mod evaluate;
pub mod simulate;

// Re-export commonly used types
pub use aggregate::{run as aggregate_run, AggregateArgs, AggregateOutcome};
pub use evaluate::{run as evaluate_run, EvaluateArgs};
pub use simulate::{run as simulate_run, SimulateArgs, SimulateOutcome};
