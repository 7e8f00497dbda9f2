//! Event and feedback ETL.
//!
//! Provides:
//! - Analytics event CSV import and visitor/conversion aggregation
//! - Feedback JSON-lines import, cleaning and summary
//! - CSV export of the prepared tables

pub mod events;
pub mod feedback;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::analytics::GroupCounts;
use crate::Result;

pub use events::{
    observation_for, read_events, summarize, visitor_outcomes, write_events_csv,
    write_outcomes_csv, EventNames, EventRecord, VisitorOutcome,
};
pub use feedback::{
    clean_feedback, read_feedback, summarize_feedback, write_feedback_csv, write_feedback_jsonl,
    FeedbackRecord, FeedbackSummary,
};

pub const OUTCOMES_FILE: &str = "ab_test_results.csv";
pub const FEEDBACK_FILE: &str = "user_feedback.csv";

/// Inputs and destination of one ETL run.
#[derive(Debug, Clone)]
pub struct EtlJob {
    pub events_path: PathBuf,
    pub feedback_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub event_names: EventNames,
}

#[derive(Debug, Clone, Serialize)]
pub struct EtlReport {
    pub events_read: usize,
    pub visitors: usize,
    pub groups: BTreeMap<String, GroupCounts>,
    pub feedback: BTreeMap<String, FeedbackSummary>,
    pub outcomes_path: PathBuf,
    pub feedback_path: Option<PathBuf>,
}

/// Read, transform and write. Output files are overwritten.
pub fn run_pipeline(job: &EtlJob) -> Result<EtlReport> {
    info!("[1/3] Reading analytics events");
    let events = read_events(&job.events_path)?;
    let outcomes = visitor_outcomes(&events, &job.event_names);
    let groups = summarize(&outcomes);

    info!("[2/3] Reading feedback");
    let feedback = match &job.feedback_path {
        Some(path) => clean_feedback(read_feedback(path)?),
        None => Vec::new(),
    };

    info!("[3/3] Writing prepared tables");
    ensure_dir(&job.output_dir)?;
    let outcomes_path = job.output_dir.join(OUTCOMES_FILE);
    write_outcomes_csv(&outcomes_path, &outcomes)?;

    let feedback_path = if job.feedback_path.is_some() {
        let path = job.output_dir.join(FEEDBACK_FILE);
        write_feedback_csv(&path, &feedback)?;
        Some(path)
    } else {
        None
    };

    Ok(EtlReport {
        events_read: events.len(),
        visitors: outcomes.len(),
        groups,
        feedback: summarize_feedback(&feedback),
        outcomes_path,
        feedback_path,
    })
}

pub(crate) fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}
