//! Tests for evaluate command

use abtest_toolkit::commands::evaluate::{evaluate, resolve_alpha};
use abtest_toolkit::commands::EvaluateArgs;
use abtest_toolkit::{Config, Error, Verdict};

fn args(va: u64, ca: u64, vb: u64, cb: u64) -> EvaluateArgs {
    EvaluateArgs {
        visitors_a: va,
        conversions_a: ca,
        visitors_b: vb,
        conversions_b: cb,
        alpha: None,
        label_a: None,
        label_b: None,
        format: "json".to_string(),
    }
}

#[test]
fn test_evaluate_default_labels() {
    let config = Config::defaults();
    let assessment = evaluate(&args(184, 11, 154, 8), &config).unwrap();
    assert_eq!(assessment.observation.label_a, config.group_a);
    assert_eq!(assessment.observation.label_b, config.group_b);
    assert_eq!(assessment.verdict, Verdict::NotSignificant);
}

#[test]
fn test_evaluate_alpha_override() {
    let mut a = args(200, 20, 200, 34);
    a.alpha = Some(0.1);
    let assessment = evaluate(&a, &Config::defaults()).unwrap();
    assert_eq!(assessment.alpha.value(), 0.1);
    assert_eq!(assessment.verdict, Verdict::Significant);
}

#[test]
fn test_evaluate_rejects_alpha_out_of_range() {
    let config = Config::defaults();
    for bad in [0.0, 1.0, -0.5, 1.5] {
        assert!(
            matches!(resolve_alpha(Some(bad), &config), Err(Error::InvalidInput(_))),
            "alpha {} accepted",
            bad
        );
    }
}

#[test]
fn test_evaluate_degenerate_is_not_significant() {
    let assessment = evaluate(&args(0, 0, 50, 0), &Config::defaults()).unwrap();
    assert!(assessment.is_degenerate());
    assert_eq!(assessment.verdict, Verdict::NotSignificant);
}
