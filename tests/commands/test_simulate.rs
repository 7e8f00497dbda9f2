//! Tests for simulate command

use abtest_toolkit::commands::simulate::{generate, COMMENTS_FILE, EVENTS_FILE};
use abtest_toolkit::commands::SimulateArgs;
use abtest_toolkit::etl::read_events;
use abtest_toolkit::simulation::Arm;
use abtest_toolkit::Config;

#[test]
fn test_simulate_same_seed_same_files() {
    let dir = tempfile::tempdir().unwrap();
    let run = |name: &str| {
        let args = SimulateArgs {
            visitors_per_version: Some(30),
            seed: Some(99),
            output_dir: Some(dir.path().join(name)),
            ..Default::default()
        };
        generate(&args, &Config::defaults()).unwrap()
    };

    let first = run("first");
    let second = run("second");

    assert!(first.events_path.ends_with(EVENTS_FILE));
    assert!(first.comments_path.ends_with(COMMENTS_FILE));
    assert_eq!(first.traffic.visits, second.traffic.visits);

    // Timestamps start at the wall clock, so compare everything else
    let strip = |path: &std::path::Path| {
        read_events(path)
            .unwrap()
            .into_iter()
            .map(|e| (e.user_pseudo_id, e.event_name, e.test_version))
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(&first.events_path), strip(&second.events_path));
}

#[test]
fn test_simulate_balanced_arms() {
    let dir = tempfile::tempdir().unwrap();
    let args = SimulateArgs {
        visitors_per_version: Some(25),
        seed: Some(1),
        output_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let outcome = generate(&args, &Config::defaults()).unwrap();
    assert_eq!(outcome.traffic.visitors(Arm::A), 25);
    assert_eq!(outcome.traffic.visitors(Arm::B), 25);
}
