//! Observed counts and the 2×2 contingency table built from them.
//!
//! Rows are test groups (A, B), columns are outcomes
//! (converted, not converted).

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_LABEL_A: &str = "Version A";
pub const DEFAULT_LABEL_B: &str = "Version B";

/// Visitor and conversion counts for one test group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupCounts {
    pub visitors: u64,
    pub conversions: u64,
}

impl GroupCounts {
    pub fn new(visitors: u64, conversions: u64) -> Self {
        Self {
            visitors,
            conversions,
        }
    }

    /// Fails when the group reports more conversions than visitors.
    pub fn validate(&self, label: &str) -> Result<()> {
        if self.conversions > self.visitors {
            return Err(Error::InvalidInput(format!(
                "{}: conversions ({}) exceed visitors ({})",
                label, self.conversions, self.visitors
            )));
        }
        Ok(())
    }

    pub fn non_conversions(&self) -> u64 {
        self.visitors.saturating_sub(self.conversions)
    }

    /// Conversion rate as a fraction; 0 for an empty group.
    pub fn conversion_rate(&self) -> f64 {
        if self.visitors == 0 {
            0.0
        } else {
            self.conversions as f64 / self.visitors as f64
        }
    }
}

/// Two groups of an A/B test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub label_a: String,
    pub a: GroupCounts,
    pub label_b: String,
    pub b: GroupCounts,
}

impl Observation {
    pub fn new(a: GroupCounts, b: GroupCounts) -> Self {
        Self {
            label_a: DEFAULT_LABEL_A.to_string(),
            a,
            label_b: DEFAULT_LABEL_B.to_string(),
            b,
        }
    }

    pub fn from_counts(
        visitors_a: u64,
        conversions_a: u64,
        visitors_b: u64,
        conversions_b: u64,
    ) -> Self {
        Self::new(
            GroupCounts::new(visitors_a, conversions_a),
            GroupCounts::new(visitors_b, conversions_b),
        )
    }

    pub fn with_labels(mut self, label_a: impl Into<String>, label_b: impl Into<String>) -> Self {
        self.label_a = label_a.into();
        self.label_b = label_b.into();
        self
    }

    /// Checks both groups and that the combined visitor count fits in `u64`.
    pub fn validate(&self) -> Result<()> {
        self.a.validate(&self.label_a)?;
        self.b.validate(&self.label_b)?;
        if self.a.visitors.checked_add(self.b.visitors).is_none() {
            return Err(Error::InvalidInput(format!(
                "counts too large: {} + {} visitors overflow",
                self.a.visitors, self.b.visitors
            )));
        }
        Ok(())
    }

    /// Same observation with groups A and B exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            label_a: self.label_b.clone(),
            a: self.b,
            label_b: self.label_a.clone(),
            b: self.a,
        }
    }
}

/// 2×2 table `[[conv_A, non_conv_A], [conv_B, non_conv_B]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyTable {
    cells: [[u64; 2]; 2],
}

impl ContingencyTable {
    /// Build the table, rejecting groups with conversions above visitors
    /// and totals beyond `u64::MAX`.
    pub fn from_observation(observation: &Observation) -> Result<Self> {
        observation.validate()?;
        Ok(Self {
            cells: [
                [observation.a.conversions, observation.a.non_conversions()],
                [observation.b.conversions, observation.b.non_conversions()],
            ],
        })
    }

    pub fn cells(&self) -> [[u64; 2]; 2] {
        self.cells
    }

    pub fn cell(&self, row: usize, col: usize) -> u64 {
        self.cells[row][col]
    }

    // Saturating so a deserialized table with oversized cells cannot panic;
    // tables from `from_observation` never saturate.
    pub fn row_sums(&self) -> [u64; 2] {
        [
            self.cells[0][0].saturating_add(self.cells[0][1]),
            self.cells[1][0].saturating_add(self.cells[1][1]),
        ]
    }

    pub fn column_sums(&self) -> [u64; 2] {
        [
            self.cells[0][0].saturating_add(self.cells[1][0]),
            self.cells[0][1].saturating_add(self.cells[1][1]),
        ]
    }

    pub fn total(&self) -> u64 {
        let [a, b] = self.row_sums();
        a.saturating_add(b)
    }

    /// Expected frequencies under independence: `row_i * col_j / total`.
    ///
    /// Returns `None` when any expected cell would be zero, i.e. a row or
    /// column sums to zero.
    pub fn expected(&self) -> Option<[[f64; 2]; 2]> {
        let c = self.cells.map(|row| row.map(|v| v as f64));
        let rows = [c[0][0] + c[0][1], c[1][0] + c[1][1]];
        let cols = [c[0][0] + c[1][0], c[0][1] + c[1][1]];
        if rows.contains(&0.0) || cols.contains(&0.0) {
            return None;
        }

        let total = rows[0] + rows[1];
        let mut expected = [[0.0; 2]; 2];
        for (i, row) in expected.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = rows[i] * cols[j] / total;
            }
        }
        Some(expected)
    }

    pub fn is_degenerate(&self) -> bool {
        self.expected().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_counts_rates() {
        let group = GroupCounts::new(184, 11);
        assert_eq!(group.non_conversions(), 173);
        assert!((group.conversion_rate() - 11.0 / 184.0).abs() < 1e-12);
        assert_eq!(GroupCounts::new(0, 0).conversion_rate(), 0.0);
    }

    #[test]
    fn test_group_counts_rejects_excess_conversions() {
        let err = GroupCounts::new(10, 11).validate("Version A").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains("Version A"));
    }

    #[test]
    fn test_table_layout_matches_observation() {
        let obs = Observation::from_counts(184, 11, 154, 8);
        let table = ContingencyTable::from_observation(&obs).unwrap();

        assert_eq!(table.cells(), [[11, 173], [8, 146]]);
        assert_eq!(table.row_sums(), [184, 154]);
        assert_eq!(table.column_sums(), [19, 319]);
        assert_eq!(table.total(), 338);
    }

    #[test]
    fn test_row_sums_equal_visitors() {
        for (va, ca, vb, cb) in [(1, 0, 1, 1), (500, 15, 500, 25), (7, 7, 3, 0)] {
            let obs = Observation::from_counts(va, ca, vb, cb);
            let table = ContingencyTable::from_observation(&obs).unwrap();
            assert_eq!(table.row_sums(), [va, vb]);
        }
    }

    #[test]
    fn test_expected_frequencies() {
        let obs = Observation::from_counts(30, 10, 30, 20);
        let table = ContingencyTable::from_observation(&obs).unwrap();
        let expected = table.expected().unwrap();

        for row in expected {
            for cell in row {
                assert!((cell - 15.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_expected_none_for_zero_column() {
        let obs = Observation::from_counts(100, 0, 120, 0);
        let table = ContingencyTable::from_observation(&obs).unwrap();
        assert!(table.expected().is_none());
        assert!(table.is_degenerate());
    }

    #[test]
    fn test_expected_none_for_empty_group() {
        let obs = Observation::from_counts(0, 0, 50, 5);
        let table = ContingencyTable::from_observation(&obs).unwrap();
        assert!(table.is_degenerate());
    }

    #[test]
    fn test_from_observation_rejects_invalid_group_b() {
        let obs = Observation::from_counts(10, 1, 5, 6);
        let err = ContingencyTable::from_observation(&obs).unwrap_err();
        assert!(err.to_string().contains("Version B"));
    }

    #[test]
    fn test_from_observation_rejects_overflowing_totals() {
        let obs = Observation::from_counts(u64::MAX, u64::MAX / 2, u64::MAX, u64::MAX / 2);
        let err = ContingencyTable::from_observation(&obs).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains("too large"));

        let obs = Observation::from_counts(u64::MAX, 0, 1, 1);
        assert!(ContingencyTable::from_observation(&obs).is_err());
    }

    #[test]
    fn test_largest_valid_table() {
        let half = u64::MAX / 2;
        let obs = Observation::from_counts(half, half / 3, half + 1, half / 2);
        let table = ContingencyTable::from_observation(&obs).unwrap();

        assert_eq!(table.total(), u64::MAX);
        assert_eq!(table.column_sums()[0], half / 3 + half / 2);
        let expected = table.expected().unwrap();
        assert!(expected.iter().flatten().all(|e| e.is_finite() && *e > 0.0));
    }

    #[test]
    fn test_swapped_exchanges_groups_and_labels() {
        let obs = Observation::from_counts(10, 1, 20, 2).with_labels("blue", "green");
        let swapped = obs.swapped();
        assert_eq!(swapped.label_a, "green");
        assert_eq!(swapped.a, GroupCounts::new(20, 2));
        assert_eq!(swapped.swapped(), obs);
    }
}
