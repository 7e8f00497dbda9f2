//! Analytics event export → per-visitor conversion flags → group counts.
//!
//! Input is a CSV export with header
//! `user_pseudo_id,event_name,test_version[,timestamp]`.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analytics::{GroupCounts, Observation};
use crate::{Error, Result};

pub const PAGE_VIEW_EVENT: &str = "page_view";
pub const PURCHASE_CLICK_EVENT: &str = "purchase_click";

/// One raw analytics event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub user_pseudo_id: String,
    pub event_name: String,
    /// `None` for users outside the experiment.
    #[serde(default)]
    pub test_version: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl EventRecord {
    pub fn new(
        user_pseudo_id: impl Into<String>,
        event_name: impl Into<String>,
        test_version: Option<&str>,
    ) -> Self {
        Self {
            user_pseudo_id: user_pseudo_id.into(),
            event_name: event_name.into(),
            test_version: test_version.map(str::to_string),
            timestamp: None,
        }
    }
}

/// Which event names mark a visit and a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventNames {
    pub visit: String,
    pub conversion: String,
}

impl Default for EventNames {
    fn default() -> Self {
        Self {
            visit: PAGE_VIEW_EVENT.to_string(),
            conversion: PURCHASE_CLICK_EVENT.to_string(),
        }
    }
}

/// A visitor of one test version and whether they converted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VisitorOutcome {
    pub user_pseudo_id: String,
    pub test_version: String,
    pub is_converted: bool,
}

pub fn read_events<P: AsRef<Path>>(path: P) -> Result<Vec<EventRecord>> {
    let file = std::fs::File::open(path.as_ref())?;
    let events = read_events_from(file)?;
    info!(
        path = %path.as_ref().display(),
        events = events.len(),
        "Loaded analytics events"
    );
    Ok(events)
}

pub fn read_events_from<R: Read>(reader: R) -> Result<Vec<EventRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut events = Vec::new();
    for row in reader.deserialize::<EventRecord>() {
        let mut event = row?;
        if event
            .test_version
            .as_deref()
            .is_some_and(|v| v.trim().is_empty())
        {
            event.test_version = None;
        }
        events.push(event);
    }
    Ok(events)
}

pub fn write_events_csv<P: AsRef<Path>>(path: P, events: &[EventRecord]) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())?;
    write_events_to(file, events)?;
    info!(path = %path.as_ref().display(), events = events.len(), "Wrote events");
    Ok(())
}

pub fn write_events_to<W: Write>(writer: W, events: &[EventRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for event in events {
        writer.serialize(event)?;
    }
    writer.flush()?;
    Ok(())
}

/// Join visits with conversions.
///
/// Visitors are distinct `(user, version)` pairs that fired the visit
/// event; converters are distinct users that fired the conversion event.
/// Every visitor is kept (left join) and flagged when the user converted.
/// Events without a test version are ignored. Output is ordered by
/// version, then user.
pub fn visitor_outcomes(events: &[EventRecord], names: &EventNames) -> Vec<VisitorOutcome> {
    let assigned = events.iter().filter_map(|e| {
        e.test_version
            .as_deref()
            .map(|version| (e.user_pseudo_id.as_str(), e.event_name.as_str(), version))
    });

    let mut visitors: BTreeSet<(&str, &str)> = BTreeSet::new();
    let mut converters: HashSet<&str> = HashSet::new();

    for (user, event_name, version) in assigned {
        if event_name == names.visit {
            visitors.insert((version, user));
        } else if event_name == names.conversion {
            converters.insert(user);
        }
    }
    let unassigned = events.iter().filter(|e| e.test_version.is_none()).count();

    debug!(
        visitors = visitors.len(),
        converters = converters.len(),
        unassigned,
        "Aggregated events"
    );

    visitors
        .into_iter()
        .map(|(version, user)| VisitorOutcome {
            user_pseudo_id: user.to_string(),
            test_version: version.to_string(),
            is_converted: converters.contains(user),
        })
        .collect()
}

/// Visitor and conversion counts per test version.
pub fn summarize(outcomes: &[VisitorOutcome]) -> BTreeMap<String, GroupCounts> {
    let mut summary: BTreeMap<String, GroupCounts> = BTreeMap::new();
    for outcome in outcomes {
        let counts = summary.entry(outcome.test_version.clone()).or_default();
        counts.visitors += 1;
        if outcome.is_converted {
            counts.conversions += 1;
        }
    }
    summary
}

/// Pick two versions out of a summary as groups A and B.
pub fn observation_for(
    summary: &BTreeMap<String, GroupCounts>,
    version_a: &str,
    version_b: &str,
) -> Result<Observation> {
    let lookup = |version: &str| {
        summary.get(version).copied().ok_or_else(|| {
            let known: Vec<&str> = summary.keys().map(String::as_str).collect();
            Error::InvalidArgument(format!(
                "Test version '{}' not found in events (known: {})",
                version,
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            ))
        })
    };

    Ok(Observation::new(lookup(version_a)?, lookup(version_b)?).with_labels(version_a, version_b))
}

pub fn write_outcomes_csv<P: AsRef<Path>>(path: P, outcomes: &[VisitorOutcome]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for outcome in outcomes {
        writer.serialize(outcome)?;
    }
    writer.flush()?;
    info!(
        path = %path.as_ref().display(),
        rows = outcomes.len(),
        "Wrote visitor outcomes"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(user: &str, name: &str, version: Option<&str>) -> EventRecord {
        EventRecord::new(user, name, version)
    }

    #[test]
    fn test_read_events_with_and_without_version() {
        let data = "\
user_pseudo_id,event_name,test_version
u1,page_view,Version A
u2,page_view,
u3, purchase_click ,Version B
";
        let events = read_events_from(data.as_bytes()).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].test_version.as_deref(), Some("Version A"));
        assert_eq!(events[1].test_version, None);
        assert_eq!(events[2].event_name, "purchase_click");
        assert!(events[0].timestamp.is_none());
    }

    #[test]
    fn test_read_events_with_timestamp() {
        let data = "\
user_pseudo_id,event_name,test_version,timestamp
u1,page_view,Version A,2025-10-01T12:00:00Z
";
        let events = read_events_from(data.as_bytes()).unwrap();
        assert_eq!(
            events[0].timestamp.unwrap().to_rfc3339(),
            "2025-10-01T12:00:00+00:00"
        );
    }

    #[test]
    fn test_read_events_rejects_ragged_rows() {
        let data = "user_pseudo_id,event_name,test_version\nu1\n";
        assert!(matches!(
            read_events_from(data.as_bytes()),
            Err(Error::CsvError(_))
        ));
    }

    #[test]
    fn test_visitors_are_distinct() {
        let events = vec![
            ev("u1", "page_view", Some("A")),
            ev("u1", "page_view", Some("A")),
            ev("u2", "page_view", Some("A")),
        ];
        let outcomes = visitor_outcomes(&events, &EventNames::default());
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| !o.is_converted));
    }

    #[test]
    fn test_left_join_flags_converters() {
        let events = vec![
            ev("u1", "page_view", Some("A")),
            ev("u1", "purchase_click", Some("A")),
            ev("u1", "purchase_click", Some("A")),
            ev("u2", "page_view", Some("B")),
            ev("u3", "page_view", Some("B")),
            ev("u3", "purchase_click", Some("B")),
        ];
        let outcomes = visitor_outcomes(&events, &EventNames::default());
        let summary = summarize(&outcomes);

        assert_eq!(summary["A"], GroupCounts::new(1, 1));
        assert_eq!(summary["B"], GroupCounts::new(2, 1));
    }

    #[test]
    fn test_conversion_without_visit_is_not_counted() {
        let events = vec![
            ev("u1", "purchase_click", Some("A")),
            ev("u2", "page_view", Some("A")),
        ];
        let summary = summarize(&visitor_outcomes(&events, &EventNames::default()));
        assert_eq!(summary["A"], GroupCounts::new(1, 0));
    }

    #[test]
    fn test_unassigned_events_are_dropped() {
        let events = vec![
            ev("u1", "page_view", None),
            ev("u1", "purchase_click", None),
            ev("u2", "page_view", Some("A")),
        ];
        let outcomes = visitor_outcomes(&events, &EventNames::default());
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].user_pseudo_id, "u2");
    }

    #[test]
    fn test_custom_event_names() {
        let names = EventNames {
            visit: "session_start".to_string(),
            conversion: "checkout".to_string(),
        };
        let events = vec![
            ev("u1", "session_start", Some("A")),
            ev("u1", "checkout", Some("A")),
            ev("u2", "page_view", Some("A")),
        ];
        let summary = summarize(&visitor_outcomes(&events, &names));
        assert_eq!(summary["A"], GroupCounts::new(1, 1));
    }

    #[test]
    fn test_outcomes_sorted_by_version_then_user() {
        let events = vec![
            ev("z", "page_view", Some("B")),
            ev("b", "page_view", Some("A")),
            ev("a", "page_view", Some("B")),
        ];
        let outcomes = visitor_outcomes(&events, &EventNames::default());
        let keys: Vec<(&str, &str)> = outcomes
            .iter()
            .map(|o| (o.test_version.as_str(), o.user_pseudo_id.as_str()))
            .collect();
        assert_eq!(keys, vec![("A", "b"), ("B", "a"), ("B", "z")]);
    }

    #[test]
    fn test_observation_for_known_versions() {
        let mut summary = BTreeMap::new();
        summary.insert("Version A".to_string(), GroupCounts::new(184, 11));
        summary.insert("Version B".to_string(), GroupCounts::new(154, 8));

        let obs = observation_for(&summary, "Version B", "Version A").unwrap();
        assert_eq!(obs.label_a, "Version B");
        assert_eq!(obs.a, GroupCounts::new(154, 8));
        assert_eq!(obs.b, GroupCounts::new(184, 11));
    }

    #[test]
    fn test_observation_for_missing_version() {
        let mut summary = BTreeMap::new();
        summary.insert("Version A".to_string(), GroupCounts::new(10, 1));

        let err = observation_for(&summary, "Version A", "Version C").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Version C"));
        assert!(msg.contains("known: Version A"));
    }

    #[test]
    fn test_events_csv_round_trip_through_writer() {
        let events = vec![
            ev("u1", "page_view", Some("Version A")),
            ev("u2", "page_view", None),
        ];
        let mut buffer = Vec::new();
        write_events_to(&mut buffer, &events).unwrap();

        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with("user_pseudo_id,event_name,test_version,timestamp"));
        assert_eq!(read_events_from(buffer.as_slice()).unwrap(), events);
    }
}
