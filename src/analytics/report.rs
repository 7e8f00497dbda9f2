//! Human-readable and machine-readable rendering of an [`Assessment`].

use std::fmt::Write as _;

use super::significance::Assessment;
use crate::{Error, Result};

const WIDTH: usize = 65;
const TITLE: &str = " A/B Test Significance Results ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "text" | "table" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(Error::InvalidArgument(format!(
                "Unsupported format '{}'. Use text|json|yaml",
                other
            ))),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

pub fn render(assessment: &Assessment, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(assessment)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(assessment)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(assessment)?),
    }
}

/// Print the rendered report to stdout.
pub fn print_report(assessment: &Assessment, format: OutputFormat) -> Result<()> {
    println!("{}", render(assessment, format)?);
    Ok(())
}

fn banner(title: &str) -> String {
    let pad = WIDTH.saturating_sub(title.chars().count());
    let left = pad / 2;
    format!("{}{}{}", "=".repeat(left), title, "=".repeat(pad - left))
}

fn percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

pub fn render_text(assessment: &Assessment) -> String {
    let obs = &assessment.observation;
    let cells = assessment.table.cells();
    let label_width = obs.label_a.chars().count().max(obs.label_b.chars().count()).max(12) + 2;
    let rule = "-".repeat(WIDTH);

    // fmt::Write into a String cannot fail
    let mut out = String::new();
    let _ = writeln!(out, "{}", banner(TITLE));
    let _ = writeln!(out, "Data:");
    for (label, group, rate) in [
        (&obs.label_a, &obs.a, assessment.rates.rate_a),
        (&obs.label_b, &obs.b, assessment.rates.rate_b),
    ] {
        let _ = writeln!(
            out,
            "  - {}: {} conversions out of {} visitors (Rate: {})",
            label,
            group.conversions,
            group.visitors,
            percent(rate)
        );
    }
    match assessment.rates.relative_lift {
        Some(lift) => {
            let _ = writeln!(
                out,
                "  - Difference: {:+.2} pp (relative lift {:+.2}%)",
                assessment.rates.absolute_difference * 100.0,
                lift * 100.0
            );
        }
        None => {
            let _ = writeln!(
                out,
                "  - Difference: {:+.2} pp",
                assessment.rates.absolute_difference * 100.0
            );
        }
    }

    let _ = writeln!(out, "\nContingency Table:");
    let _ = writeln!(
        out,
        "{:label_width$}{:^11} {:^15}",
        "",
        "Converted",
        "Not-Converted",
        label_width = label_width
    );
    for (label, row) in [(&obs.label_a, cells[0]), (&obs.label_b, cells[1])] {
        let _ = writeln!(
            out,
            "{:label_width$}{:^11} {:^15}",
            label,
            row[0],
            row[1],
            label_width = label_width
        );
    }

    let _ = writeln!(out, "\n{}", rule);
    match &assessment.result {
        Some(result) => {
            let _ = writeln!(out, "Chi-Squared Statistic: {:.4}", result.statistic);
            let _ = writeln!(out, "P-value: {:.4}", result.p_value);
        }
        None => {
            let _ = writeln!(
                out,
                "Chi-Squared Statistic: undefined (a row or column of the table sums to zero)"
            );
            let _ = writeln!(out, "P-value: undefined");
        }
    }
    let _ = writeln!(
        out,
        "Significance level: {} ({:.0}% confidence)",
        assessment.alpha,
        assessment.alpha.confidence_percent()
    );
    let _ = writeln!(out, "{}", rule);

    let _ = writeln!(out, "\nConclusion: {}", assessment.verdict.conclusion());
    let _ = writeln!(out, "{}", assessment.verdict.explanation());
    let _ = write!(out, "{}", "=".repeat(WIDTH));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::contingency::Observation;
    use crate::analytics::significance::{assess, SignificanceLevel};

    fn sample(va: u64, ca: u64, vb: u64, cb: u64) -> Assessment {
        assess(
            &Observation::from_counts(va, ca, vb, cb),
            SignificanceLevel::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("TEXT").unwrap(), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("table").unwrap(), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("json").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("yml").unwrap(), OutputFormat::Yaml);
        assert!(matches!(
            OutputFormat::parse("xml"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_text_report_sections() {
        let text = render_text(&sample(184, 11, 154, 8));

        assert!(text.contains("A/B Test Significance Results"));
        assert!(text.contains("Version A: 11 conversions out of 184 visitors (Rate: 5.98%)"));
        assert!(text.contains("Version B: 8 conversions out of 154 visitors (Rate: 5.19%)"));
        assert!(text.contains("Not-Converted"));
        assert!(text.contains("173"));
        assert!(text.contains("146"));
        assert!(text.contains("Chi-Squared Statistic: "));
        assert!(text.contains("P-value: "));
        assert!(text.contains("The result is not statistically significant."));
    }

    #[test]
    fn test_text_report_significant() {
        let text = render_text(&sample(1000, 200, 1000, 50));
        assert!(text.contains("The result is statistically significant."));
        assert!(text.contains("relative lift -75.00%"));
    }

    #[test]
    fn test_text_report_degenerate() {
        let text = render_text(&sample(100, 0, 100, 0));
        assert!(text.contains("undefined"));
        assert!(text.contains("not statistically significant"));
    }

    #[test]
    fn test_banner_width() {
        assert_eq!(banner(TITLE).chars().count(), WIDTH);
    }

    #[test]
    fn test_json_report() {
        let json = render(&sample(1000, 200, 1000, 50), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["verdict"], "significant");
        assert_eq!(value["alpha"], 0.05);
        assert_eq!(value["observation"]["a"]["visitors"], 1000);
        assert!(value["result"]["p_value"].as_f64().unwrap() < 0.05);
    }

    #[test]
    fn test_json_report_degenerate_has_null_result() {
        let json = render(&sample(10, 0, 10, 0), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["result"].is_null());
        assert_eq!(value["verdict"], "not_significant");
    }

    #[test]
    fn test_yaml_report() {
        let yaml = render(&sample(184, 11, 154, 8), OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("verdict: not_significant"));
        assert!(yaml.contains("label_a: Version A"));
    }
}
