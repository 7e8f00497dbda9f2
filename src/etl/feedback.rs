//! Qualitative feedback left by converting visitors.
//!
//! Stored as JSON lines, one [`FeedbackRecord`] per line.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Error, Result};

pub const MIN_STAR_RATING: u8 = 1;
pub const MAX_STAR_RATING: u8 = 5;
const TAG_SEPARATOR: &str = ";";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub user_pseudo_id: String,
    pub test_version: String,
    pub comment_text: String,
    pub star_rating: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    pub time_to_convert_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl FeedbackRecord {
    pub fn has_valid_rating(&self) -> bool {
        (MIN_STAR_RATING..=MAX_STAR_RATING).contains(&self.star_rating)
    }
}

/// Flat CSV row; tags are joined with `;`.
#[derive(Debug, Serialize)]
struct FeedbackRow<'a> {
    user_pseudo_id: &'a str,
    test_version: &'a str,
    comment_text: &'a str,
    star_rating: u8,
    tags: String,
    time_to_convert_seconds: f64,
}

impl<'a> From<&'a FeedbackRecord> for FeedbackRow<'a> {
    fn from(record: &'a FeedbackRecord) -> Self {
        Self {
            user_pseudo_id: &record.user_pseudo_id,
            test_version: &record.test_version,
            comment_text: &record.comment_text,
            star_rating: record.star_rating,
            tags: record.tags.join(TAG_SEPARATOR),
            time_to_convert_seconds: record.time_to_convert_seconds,
        }
    }
}

/// Per-version summary of the feedback.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FeedbackSummary {
    pub responses: u64,
    pub average_star_rating: f64,
    pub average_time_to_convert_seconds: f64,
    pub tag_counts: BTreeMap<String, u64>,
}

pub fn read_feedback<P: AsRef<Path>>(path: P) -> Result<Vec<FeedbackRecord>> {
    let file = std::fs::File::open(path.as_ref())?;
    let records = read_feedback_from(BufReader::new(file))?;
    info!(
        path = %path.as_ref().display(),
        records = records.len(),
        "Loaded feedback"
    );
    Ok(records)
}

/// Parse JSON lines. Blank lines are skipped; a malformed line fails with
/// its 1-based line number.
pub fn read_feedback_from<R: BufRead>(reader: R) -> Result<Vec<FeedbackRecord>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: FeedbackRecord = serde_json::from_str(&line)
            .map_err(|e| Error::SerializationError(format!("line {}: {}", idx + 1, e)))?;
        records.push(record);
    }
    Ok(records)
}

pub fn write_feedback_jsonl<P: AsRef<Path>>(path: P, records: &[FeedbackRecord]) -> Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path.as_ref())?);
    for record in records {
        serde_json::to_writer(&mut file, record)?;
        file.write_all(b"\n")?;
    }
    file.flush()?;
    info!(path = %path.as_ref().display(), records = records.len(), "Wrote feedback");
    Ok(())
}

/// Drop records whose star rating is outside 1..=5.
pub fn clean_feedback(records: Vec<FeedbackRecord>) -> Vec<FeedbackRecord> {
    let before = records.len();
    let cleaned: Vec<FeedbackRecord> = records
        .into_iter()
        .filter(FeedbackRecord::has_valid_rating)
        .collect();
    if cleaned.len() < before {
        warn!(
            dropped = before - cleaned.len(),
            "Dropped feedback with out-of-range star rating"
        );
    }
    cleaned
}

pub fn summarize_feedback(records: &[FeedbackRecord]) -> BTreeMap<String, FeedbackSummary> {
    let mut summary: BTreeMap<String, FeedbackSummary> = BTreeMap::new();
    let mut rating_sums: BTreeMap<&str, (u64, f64)> = BTreeMap::new();

    for record in records {
        let entry = summary.entry(record.test_version.clone()).or_default();
        entry.responses += 1;
        for tag in &record.tags {
            *entry.tag_counts.entry(tag.clone()).or_insert(0) += 1;
        }
        let sums = rating_sums.entry(&record.test_version).or_insert((0, 0.0));
        sums.0 += u64::from(record.star_rating);
        sums.1 += record.time_to_convert_seconds;
    }

    for (version, entry) in summary.iter_mut() {
        if let Some((stars, seconds)) = rating_sums.get(version.as_str()) {
            let n = entry.responses as f64;
            entry.average_star_rating = *stars as f64 / n;
            entry.average_time_to_convert_seconds = seconds / n;
        }
    }

    summary
}

pub fn write_feedback_csv<P: AsRef<Path>>(path: P, records: &[FeedbackRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for record in records {
        writer.serialize(FeedbackRow::from(record))?;
    }
    writer.flush()?;
    info!(
        path = %path.as_ref().display(),
        rows = records.len(),
        "Wrote feedback table"
    );
    Ok(())
}
