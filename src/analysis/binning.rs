//! Quantile binning

use super::stats::sorted;
use crate::structs::{Binned, EdaError, Result, Tertile};

/// Edges of `bins` equal-frequency intervals, `bins + 1` values
///
/// Cut points use linear interpolation between order statistics. The
/// position of cut `i` is `(n - 1) * i / bins`, computed from integers so
/// that cuts landing exactly on an observation stay exact.
#[allow(clippy::cast_precision_loss)]
fn quantile_edges(sorted: &[f64], bins: usize) -> Vec<f64> {
    let last = sorted.len() - 1;
    (0..=bins)
        .map(|i| {
            let num = last * i;
            let lo = num / bins;
            let rem = num % bins;
            if rem == 0 {
                sorted[lo]
            } else {
                let frac = rem as f64 / bins as f64;
                sorted[lo] + (sorted[lo + 1] - sorted[lo]) * frac
            }
        })
        .collect()
}

/// Cut `values` into `bins` quantile intervals, returning a bin index per value
/// and the edges used
///
/// A value `v` falls in bin `i` when `edges[i] < v <= edges[i + 1]`; the
/// first bin also takes `edges[0]`.
///
/// # Errors
/// Returns `DegenerateDistribution` if `values` is empty, holds a
/// non-finite value, `bins` is zero, or two edges coincide
pub fn qcut(values: &[f64], bins: usize) -> Result<(Vec<usize>, Vec<f64>)> {
    if bins == 0 {
        return Err(EdaError::DegenerateDistribution(
            "need at least one bin".into(),
        ));
    }
    if values.is_empty() {
        return Err(EdaError::DegenerateDistribution(
            "cannot bin an empty column".into(),
        ));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(EdaError::DegenerateDistribution(
            "column contains non-finite values".into(),
        ));
    }

    let sorted = sorted(values);
    let edges = quantile_edges(&sorted, bins);

    if edges.windows(2).any(|w| w[0] >= w[1]) {
        return Err(EdaError::DegenerateDistribution(format!(
            "bin edges must be unique, got {edges:?}"
        )));
    }

    let inner = &edges[1..bins];
    let indices = values
        .iter()
        .map(|&v| inner.iter().take_while(|&&e| v > e).count())
        .collect();

    Ok((indices, edges))
}

/// Cut `values` into Low / Medium / High tertiles
///
/// # Errors
/// Returns `DegenerateDistribution` when the tertile edges collapse,
/// e.g. for constant columns or columns with too few distinct values
pub fn qcut_tertiles(values: &[f64]) -> Result<Binned> {
    let (indices, edges) = qcut(values, Tertile::ALL.len())?;
    Ok(Binned {
        labels: indices.into_iter().map(|i| Tertile::ALL[i]).collect(),
        edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::ErrorKind;
    use std::collections::HashSet;

    #[test]
    fn test_tertiles_raw_hours() {
        let binned = qcut_tertiles(&[1000.0, 1050.0, 1020.0, 1080.0]).expect("bin");

        assert_eq!(binned.edges, vec![1000.0, 1020.0, 1050.0, 1080.0]);
        assert_eq!(
            binned.labels,
            vec![Tertile::Low, Tertile::Medium, Tertile::Low, Tertile::High]
        );
    }

    #[test]
    fn test_tertiles_raw_output() {
        let binned = qcut_tertiles(&[25.0, 26.0, 25.5, 27.0]).expect("bin");

        assert_eq!(
            binned.labels,
            vec![Tertile::Low, Tertile::Medium, Tertile::Low, Tertile::High]
        );
    }

    #[test]
    fn test_labels_from_fixed_set() {
        let values: Vec<f64> = (0..30_i32).map(|i| f64::from(i * 7 % 11) + f64::from(i) / 100.0).collect();
        let binned = qcut_tertiles(&values).expect("bin");

        assert_eq!(binned.labels.len(), values.len());
        let distinct: HashSet<Tertile> = binned.labels.iter().copied().collect();
        assert!(distinct.iter().all(|t| Tertile::ALL.contains(t)));
        assert_eq!(distinct.len(), 3);
        for t in Tertile::ALL {
            assert_eq!(binned.labels.iter().filter(|&&l| l == t).count(), 10);
        }
    }

    #[test]
    fn test_interpolated_edges() {
        let binned = qcut_tertiles(&[1.0, 2.0, 3.0, 4.0, 5.0]).expect("bin");

        assert!((binned.edges[1] - 7.0 / 3.0).abs() < 1e-12);
        assert!((binned.edges[2] - 11.0 / 3.0).abs() < 1e-12);
        assert_eq!(
            binned.labels,
            vec![Tertile::Low, Tertile::Low, Tertile::Medium, Tertile::High, Tertile::High]
        );
    }

    #[test]
    fn test_boundary_is_lower_inclusive() {
        let (indices, edges) = qcut(&[0.0, 1.0, 2.0, 3.0], 3).expect("bin");
        assert_eq!(edges, vec![0.0, 1.0, 2.0, 3.0]);
        // 1.0 sits on the first cut and belongs to the lower bin
        assert_eq!(indices, vec![0, 0, 1, 2]);
    }

    #[test]
    fn test_constant_column_is_degenerate() {
        let err = qcut_tertiles(&[5.0, 5.0, 5.0, 5.0]).expect_err("constant");
        assert_eq!(err.kind(), ErrorKind::DegenerateDistribution);
    }

    #[test]
    fn test_two_distinct_values_is_degenerate() {
        let err = qcut_tertiles(&[1.0, 1.0, 1.0, 2.0]).expect_err("two values");
        assert_eq!(err.kind(), ErrorKind::DegenerateDistribution);
    }

    #[test]
    fn test_empty_is_degenerate() {
        let err = qcut_tertiles(&[]).expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::DegenerateDistribution);
    }

    #[test]
    fn test_bins_recomputed_per_call() {
        let a = qcut_tertiles(&[1.0, 2.0, 3.0]).expect("bin");
        let b = qcut_tertiles(&[10.0, 20.0, 30.0]).expect("bin");
        assert_eq!(a.labels, b.labels);
        assert!((b.edges[1] - 50.0 / 3.0).abs() < 1e-12);
    }
}
