//! Chi-squared test of independence for two-group conversion data.
//!
//! The statistic is Pearson's chi-squared on the 2×2 contingency table with
//! Yates' continuity correction: every observed cell is moved toward its
//! expected value by `min(0.5, |O - E|)` before summing `(O - E)² / E`.
//! The p-value is the upper tail of the chi-squared distribution with one
//! degree of freedom.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::fmt;
use tracing::debug;

use super::contingency::{ContingencyTable, GroupCounts, Observation};
use crate::{Error, Result};

/// 95% confidence, the usual threshold for A/B tests.
pub const DEFAULT_ALPHA: f64 = 0.05;

const YATES_CORRECTION: f64 = 0.5;
const DEGREES_OF_FREEDOM: u32 = 1;

/// Significance level, strictly between 0 and 1.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SignificanceLevel(f64);

impl SignificanceLevel {
    pub fn new(alpha: f64) -> Result<Self> {
        if !alpha.is_finite() || alpha <= 0.0 || alpha >= 1.0 {
            return Err(Error::InvalidInput(format!(
                "significance level must be in (0, 1), got {}",
                alpha
            )));
        }
        Ok(Self(alpha))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Confidence level in percent, e.g. 95 for alpha 0.05.
    pub fn confidence_percent(&self) -> f64 {
        (1.0 - self.0) * 100.0
    }
}

impl Default for SignificanceLevel {
    fn default() -> Self {
        Self(DEFAULT_ALPHA)
    }
}

impl TryFrom<f64> for SignificanceLevel {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SignificanceLevel> for f64 {
    fn from(level: SignificanceLevel) -> Self {
        level.0
    }
}

impl fmt::Display for SignificanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of comparing a p-value with the significance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Significant,
    NotSignificant,
}

impl Verdict {
    pub fn from_p_value(p_value: f64, alpha: SignificanceLevel) -> Self {
        if p_value < alpha.value() {
            Verdict::Significant
        } else {
            Verdict::NotSignificant
        }
    }

    pub fn is_significant(&self) -> bool {
        matches!(self, Verdict::Significant)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Significant => "significant",
            Verdict::NotSignificant => "not_significant",
        }
    }

    pub fn conclusion(&self) -> &'static str {
        match self {
            Verdict::Significant => "The result is statistically significant.",
            Verdict::NotSignificant => "The result is not statistically significant.",
        }
    }

    pub fn explanation(&self) -> &'static str {
        match self {
            Verdict::Significant => {
                "We can reject the null hypothesis. There is a real difference in conversion rates between the two versions."
            }
            Verdict::NotSignificant => {
                "We do not have enough evidence to reject the null hypothesis. The observed difference could be due to random chance."
            }
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Significant => "statistically significant",
            Verdict::NotSignificant => "not statistically significant",
        })
    }
}

/// Statistic and p-value of the independence test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
    pub degrees_of_freedom: u32,
    pub expected: [[f64; 2]; 2],
}

impl TestResult {
    pub fn verdict(&self, alpha: SignificanceLevel) -> Verdict {
        Verdict::from_p_value(self.p_value, alpha)
    }

    pub fn is_significant(&self, alpha: SignificanceLevel) -> bool {
        self.verdict(alpha).is_significant()
    }
}

/// Chi-squared test with Yates' correction on a 2×2 table.
pub fn chi_squared_test(table: &ContingencyTable) -> Result<TestResult> {
    let expected = table.expected().ok_or(Error::DegenerateTable {
        row_sums: table.row_sums(),
        column_sums: table.column_sums(),
    })?;

    let mut statistic = 0.0;
    for (i, row) in expected.iter().enumerate() {
        for (j, &e) in row.iter().enumerate() {
            let observed = table.cell(i, j) as f64;
            let diff = e - observed;
            let corrected = observed + diff.signum() * diff.abs().min(YATES_CORRECTION);
            statistic += (corrected - e).powi(2) / e;
        }
    }

    let distribution = ChiSquared::new(f64::from(DEGREES_OF_FREEDOM))
        .map_err(|e| Error::InvalidInput(e.to_string()))?;
    // Far in the tail the survival function may not be representable.
    let p_value = match distribution.sf(statistic) {
        p if p.is_nan() => 0.0,
        p => p.clamp(0.0, 1.0),
    };

    Ok(TestResult {
        statistic,
        p_value,
        degrees_of_freedom: DEGREES_OF_FREEDOM,
        expected,
    })
}

/// Evaluate an A/B result from raw counts.
pub fn evaluate(
    visitors_a: u64,
    conversions_a: u64,
    visitors_b: u64,
    conversions_b: u64,
) -> Result<TestResult> {
    evaluate_observation(&Observation::from_counts(
        visitors_a,
        conversions_a,
        visitors_b,
        conversions_b,
    ))
}

/// Like [`evaluate`], also classifying the result at `alpha`.
pub fn evaluate_with_alpha(
    visitors_a: u64,
    conversions_a: u64,
    visitors_b: u64,
    conversions_b: u64,
    alpha: f64,
) -> Result<(TestResult, Verdict)> {
    let alpha = SignificanceLevel::new(alpha)?;
    let result = evaluate(visitors_a, conversions_a, visitors_b, conversions_b)?;
    Ok((result, result.verdict(alpha)))
}

pub fn evaluate_observation(observation: &Observation) -> Result<TestResult> {
    let table = ContingencyTable::from_observation(observation)?;
    chi_squared_test(&table)
}

/// Conversion rates of both groups and the difference between them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateComparison {
    pub rate_a: f64,
    pub rate_b: f64,
    /// `rate_b - rate_a`
    pub absolute_difference: f64,
    /// `(rate_b - rate_a) / rate_a`, absent when group A never converted.
    pub relative_lift: Option<f64>,
}

impl RateComparison {
    pub fn new(a: &GroupCounts, b: &GroupCounts) -> Self {
        let rate_a = a.conversion_rate();
        let rate_b = b.conversion_rate();
        let relative_lift = if rate_a > 0.0 {
            Some((rate_b - rate_a) / rate_a)
        } else {
            None
        };
        Self {
            rate_a,
            rate_b,
            absolute_difference: rate_b - rate_a,
            relative_lift,
        }
    }
}

/// Everything the report needs about one evaluated experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub observation: Observation,
    pub table: ContingencyTable,
    pub alpha: SignificanceLevel,
    /// `None` when the table is degenerate.
    pub result: Option<TestResult>,
    pub verdict: Verdict,
    pub rates: RateComparison,
}

impl Assessment {
    pub fn is_degenerate(&self) -> bool {
        self.result.is_none()
    }
}

/// Validate, evaluate and classify an observation.
///
/// A degenerate table (no conversions at all, everyone converted, or an
/// empty group) has no defined statistic and is reported as not
/// significant. Invalid counts are still an error.
pub fn assess(observation: &Observation, alpha: SignificanceLevel) -> Result<Assessment> {
    let table = ContingencyTable::from_observation(observation)?;

    let result = match chi_squared_test(&table) {
        Ok(result) => Some(result),
        Err(Error::DegenerateTable {
            row_sums,
            column_sums,
        }) => {
            debug!(?row_sums, ?column_sums, "Degenerate contingency table");
            None
        }
        Err(e) => return Err(e),
    };

    let verdict = result
        .map(|r| r.verdict(alpha))
        .unwrap_or(Verdict::NotSignificant);

    debug!(
        statistic = ?result.map(|r| r.statistic),
        p_value = ?result.map(|r| r.p_value),
        alpha = alpha.value(),
        verdict = verdict.as_str(),
        "Evaluated A/B observation"
    );

    Ok(Assessment {
        observation: observation.clone(),
        table,
        alpha,
        result,
        verdict,
        rates: RateComparison::new(&observation.a, &observation.b),
    })
}
