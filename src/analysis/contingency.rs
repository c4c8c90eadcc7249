//! Cross tabulation and the chi-squared test of independence

use crate::structs::{ChiSquaredTest, ContingencyTable, EdaError, Result};
use ndarray::{Array1, Array2, Axis};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::collections::BTreeSet;
use std::fmt::Display;
use tracing::warn;

/// Expected counts below this make the chi-squared approximation unreliable
pub const MIN_EXPECTED_COUNT: f64 = 5.0;

impl ContingencyTable {
    /// Count co-occurrences of two equal-length label columns
    ///
    /// Rows follow the ordering of `rows`' labels, columns that of `cols`'
    /// labels, each restricted to levels that occur.
    ///
    /// # Errors
    /// Returns `InsufficientData` if the columns differ in length or are empty
    pub fn cross_tab<R, C>(rows: &[R], cols: &[C]) -> Result<Self>
    where
        R: Ord + Display,
        C: Ord + Display,
    {
        if rows.len() != cols.len() {
            return Err(EdaError::InsufficientData(format!(
                "cross tabulation: {} row labels vs {} column labels",
                rows.len(),
                cols.len()
            )));
        }
        if rows.is_empty() {
            return Err(EdaError::InsufficientData(
                "cross tabulation of empty columns".into(),
            ));
        }

        let row_levels: Vec<&R> = rows.iter().collect::<BTreeSet<_>>().into_iter().collect();
        let col_levels: Vec<&C> = cols.iter().collect::<BTreeSet<_>>().into_iter().collect();

        let mut counts = Array2::<f64>::zeros((row_levels.len(), col_levels.len()));
        for (r, c) in rows.iter().zip(cols) {
            // Both levels were collected from these same columns
            let i = row_levels.binary_search(&r).unwrap_or_default();
            let j = col_levels.binary_search(&c).unwrap_or_default();
            counts[[i, j]] += 1.0;
        }

        Ok(Self {
            row_labels: row_levels.iter().map(ToString::to_string).collect(),
            col_labels: col_levels.iter().map(ToString::to_string).collect(),
            counts,
        })
    }

    /// Counts as nested rows
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.counts.outer_iter().map(|row| row.to_vec()).collect()
    }
}

/// Expected counts under independence: `row_sum * col_sum / total`
fn expected_freq(observed: &Array2<f64>) -> Array2<f64> {
    let total = observed.sum();
    let row_sums: Array1<f64> = observed.sum_axis(Axis(1));
    let col_sums: Array1<f64> = observed.sum_axis(Axis(0));
    let rows = row_sums.insert_axis(Axis(1));
    let cols = col_sums.insert_axis(Axis(0));
    rows.dot(&cols) / total
}

/// Chi-squared test of independence over a contingency table
///
/// A 2x2 table (one degree of freedom) gets Yates' continuity
/// correction. Cells with an expected count below
/// [`MIN_EXPECTED_COUNT`] do not fail the test: they are counted in
/// `low_expected_cells` and logged.
///
/// # Errors
/// Returns `InsufficientData` if the table is smaller than 2x2, holds a
/// negative count, or has a zero expected count
pub fn chi2_contingency(table: &ContingencyTable) -> Result<ChiSquaredTest> {
    let observed = &table.counts;
    let (r, c) = observed.dim();
    if r < 2 || c < 2 {
        return Err(EdaError::InsufficientData(format!(
            "chi-squared test needs at least a 2x2 table, got {r}x{c}"
        )));
    }
    if observed.iter().any(|&v| v < 0.0 || !v.is_finite()) {
        return Err(EdaError::InsufficientData(
            "contingency table holds negative or non-finite counts".into(),
        ));
    }

    let expected = expected_freq(observed);
    if expected.iter().any(|&e| e <= 0.0 || e.is_nan()) {
        return Err(EdaError::InsufficientData(
            "contingency table has a zero expected count".into(),
        ));
    }

    let dof = (r - 1) * (c - 1);
    let yates_corrected = dof == 1;

    let statistic: f64 = observed
        .iter()
        .zip(expected.iter())
        .map(|(&o, &e)| {
            let diff = if yates_corrected {
                // Shift each observation toward its expectation by at most 0.5
                let d = (o - e).abs();
                d - d.min(0.5)
            } else {
                o - e
            };
            diff * diff / e
        })
        .sum();

    #[allow(clippy::cast_precision_loss)]
    let dist = ChiSquared::new(dof as f64)
        .map_err(|e| EdaError::InsufficientData(format!("chi-squared distribution: {e}")))?;
    let p_value = dist.sf(statistic).clamp(0.0, 1.0);

    let low_expected_cells = expected.iter().filter(|&&e| e < MIN_EXPECTED_COUNT).count();
    if low_expected_cells > 0 {
        warn!(
            low_expected_cells,
            cells = r * c,
            "expected counts below {MIN_EXPECTED_COUNT}; chi-squared p-value may be unreliable"
        );
    }

    Ok(ChiSquaredTest {
        statistic,
        dof,
        p_value,
        expected: expected.outer_iter().map(|row| row.to_vec()).collect(),
        low_expected_cells,
        yates_corrected,
    })
}
