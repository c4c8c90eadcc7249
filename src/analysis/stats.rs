use crate::structs::{ColumnSummary, ObservationTable, Result};

impl ColumnSummary {
    /// Calculate statistics for a slice of values
    ///
    /// Empty input gives NaN statistics with `count == 0`, and a single
    /// value gives a NaN standard deviation.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn calculate(name: &str, values: &[f64]) -> Self {
        let count = values.len();
        if count == 0 {
            return Self {
                name: name.to_string(),
                count,
                min: f64::NAN,
                max: f64::NAN,
                median: f64::NAN,
                mean: f64::NAN,
                std: f64::NAN,
            };
        }

        let mean = mean(values);
        let std = if count > 1 {
            let ss = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
            (ss / (count - 1) as f64).sqrt()
        } else {
            f64::NAN
        };

        let sorted = sorted(values);

        Self {
            name: name.to_string(),
            count,
            min: sorted[0],
            max: sorted[count - 1],
            median: percentile(&sorted, 50.0),
            mean,
            std,
        }
    }

    /// Whether the statistics describe any data
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.count > 0
    }

    /// Format as a summary string
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: n={}, min={:.2}, median={:.2}, max={:.2}, mean={:.2}, std={:.2}",
            self.name, self.count, self.min, self.median, self.max, self.mean, self.std
        )
    }
}

/// Summarise the named numeric columns of a table
///
/// # Errors
/// Returns `DataUnavailable` if a column does not exist
pub fn summarize(table: &ObservationTable, columns: &[&str]) -> Result<Vec<ColumnSummary>> {
    columns
        .iter()
        .map(|name| Ok(ColumnSummary::calculate(name, table.column(name)?)))
        .collect()
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Calculate percentile using linear interpolation
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub(crate) fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let k = (p / 100.0) * (sorted.len() - 1) as f64;
    let f = k.floor() as usize;
    let c = k.ceil() as usize;

    if f == c {
        sorted[f]
    } else {
        let d0 = sorted[f] * (c as f64 - k);
        let d1 = sorted[c] * (k - f as f64);
        d0 + d1
    }
}
