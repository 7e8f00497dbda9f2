//! Tests for aggregate command

use std::fs;
use std::path::Path;

use abtest_toolkit::commands::aggregate::aggregate;
use abtest_toolkit::commands::AggregateArgs;
use abtest_toolkit::etl::{FEEDBACK_FILE, OUTCOMES_FILE};
use abtest_toolkit::{Config, Error};

fn write_inputs(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let events = dir.join("events.csv");
    fs::write(
        &events,
        "user_pseudo_id,event_name,test_version\n\
         u1,page_view,Version A\n\
         u1,page_view,Version A\n\
         u1,purchase_click,Version A\n\
         u2,page_view,Version A\n\
         u3,page_view,Version B\n\
         u3,purchase_click,Version B\n\
         u4,page_view,Version B\n\
         u5,page_view,\n",
    )
    .unwrap();

    let feedback = dir.join("comments.jsonl");
    fs::write(
        &feedback,
        "{\"user_pseudo_id\":\"u1\",\"test_version\":\"Version A\",\"comment_text\":\"Not very exciting.\",\"star_rating\":2,\"tags\":[\"plain_design\"],\"time_to_convert_seconds\":5.5}\n\
         {\"user_pseudo_id\":\"u3\",\"test_version\":\"Version B\",\"comment_text\":\"Wow!\",\"star_rating\":9,\"tags\":[],\"time_to_convert_seconds\":3.0}\n",
    )
    .unwrap();

    (events, feedback)
}

#[test]
fn test_aggregate_writes_tables() {
    let dir = tempfile::tempdir().unwrap();
    let (events, feedback) = write_inputs(dir.path());
    let out = dir.path().join("out");

    let outcome = aggregate(
        &AggregateArgs {
            events,
            feedback: Some(feedback),
            output_dir: Some(out.clone()),
            group_a: None,
            group_b: None,
            alpha: None,
            format: "text".to_string(),
        },
        &Config::defaults(),
    )
    .unwrap();

    assert_eq!(outcome.etl.events_read, 8);
    assert_eq!(outcome.etl.visitors, 4);
    assert_eq!(outcome.assessment.observation.a.visitors, 2);
    assert_eq!(outcome.assessment.observation.a.conversions, 1);
    assert_eq!(outcome.assessment.observation.b.conversions, 1);

    // The out-of-range rating is dropped during cleaning
    assert_eq!(outcome.etl.feedback.len(), 1);
    assert!(out.join(OUTCOMES_FILE).exists());
    assert!(out.join(FEEDBACK_FILE).exists());
}

#[test]
fn test_aggregate_missing_events_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = aggregate(
        &AggregateArgs {
            events: dir.path().join("missing.csv"),
            feedback: None,
            output_dir: Some(dir.path().to_path_buf()),
            group_a: None,
            group_b: None,
            alpha: None,
            format: "text".to_string(),
        },
        &Config::defaults(),
    );
    assert!(matches!(result, Err(Error::IoError(_))));
}
