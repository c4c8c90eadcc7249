//! Pearson and rank correlations with two-sided p-values

use super::stats::mean;
use crate::structs::{Correlation, CorrelationMethod, EdaError, Result};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};
use std::cmp::Ordering;

/// Largest sample for which Kendall's p-value uses the exact distribution
const KENDALL_EXACT_MAX_N: usize = 33;

/// Two-sided p-value of a t statistic with `df` degrees of freedom
pub(crate) fn t_two_sided(t: f64, df: f64) -> Result<f64> {
    if t.is_nan() {
        return Err(EdaError::InsufficientData("t statistic is undefined".into()));
    }
    if t.is_infinite() {
        return Ok(0.0);
    }
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| EdaError::InsufficientData(format!("t distribution with df={df}: {e}")))?;
    Ok((2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
}

/// Two-sided p-value of a standard normal statistic
fn z_two_sided(z: f64) -> Result<f64> {
    if z.is_infinite() {
        return Ok(0.0);
    }
    let dist = Normal::new(0.0, 1.0)
        .map_err(|e| EdaError::InsufficientData(format!("normal distribution: {e}")))?;
    Ok((2.0 * dist.sf(z.abs())).clamp(0.0, 1.0))
}

fn check_pair(x: &[f64], y: &[f64], min_n: usize, what: &str) -> Result<()> {
    if x.len() != y.len() {
        return Err(EdaError::InsufficientData(format!(
            "{what}: sequences differ in length ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    if x.len() < min_n {
        return Err(EdaError::InsufficientData(format!(
            "{what}: need at least {min_n} observations, got {}",
            x.len()
        )));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(EdaError::InsufficientData(format!(
            "{what}: input contains non-finite values"
        )));
    }
    let constant = |v: &[f64]| v.iter().all(|&a| a == v[0]);
    if constant(x) || constant(y) {
        return Err(EdaError::InsufficientData(format!(
            "{what}: an input is constant"
        )));
    }
    Ok(())
}

/// Pearson product-moment coefficient; callers guarantee equal lengths
/// and non-zero variance
fn pearson_r(x: &[f64], y: &[f64]) -> f64 {
    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    (cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0)
}

/// t-test p-value for a correlation coefficient over `n` pairs
#[allow(clippy::cast_precision_loss)]
fn r_p_value(r: f64, n: usize) -> Result<f64> {
    let df = (n - 2) as f64;
    let t = r * (df / ((1.0 + r) * (1.0 - r))).sqrt();
    t_two_sided(t, df)
}

/// Pearson correlation
///
/// # Errors
/// Returns `InsufficientData` for unequal lengths, fewer than 3 pairs,
/// non-finite values or a constant input
pub fn pearson(x: &[f64], y: &[f64]) -> Result<Correlation> {
    check_pair(x, y, 3, "pearson")?;
    let r = pearson_r(x, y);
    Ok(Correlation {
        method: CorrelationMethod::Pearson,
        coefficient: r,
        p_value: r_p_value(r, x.len())?,
        n: x.len(),
    })
}

/// 1-based ranks, ties sharing the average of the ranks they span
#[allow(clippy::cast_precision_loss)]
pub(crate) fn midranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1 ..= end
        let rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}

/// Spearman rank correlation
///
/// Two pairs give `rho = ±1` with a p-value of 0, as in
/// [`linregress`](super::regression::linregress).
///
/// # Errors
/// Returns `InsufficientData` for unequal lengths, fewer than 2 pairs,
/// non-finite values or a constant input
pub fn spearman(x: &[f64], y: &[f64]) -> Result<Correlation> {
    check_pair(x, y, 2, "spearman")?;
    let rho = pearson_r(&midranks(x), &midranks(y));
    let p_value = if x.len() == 2 {
        0.0
    } else {
        r_p_value(rho, x.len())?
    };
    Ok(Correlation {
        method: CorrelationMethod::Spearman,
        coefficient: rho,
        p_value,
        n: x.len(),
    })
}

/// Tie group statistics of one variable
#[derive(Debug, Default, Clone, Copy)]
struct TieCounts {
    /// Tied pairs, `sum t(t-1)/2`
    pairs: f64,
    /// `sum t(t-1)(t-2)`
    v1: f64,
    /// `sum t(t-1)(2t+5)`
    v2: f64,
}

#[allow(clippy::cast_precision_loss)]
fn tie_counts(values: &[f64]) -> TieCounts {
    let sorted = super::stats::sorted(values);
    let mut counts = TieCounts::default();
    for group in sorted.chunk_by(|a, b| a == b) {
        let t = group.len() as f64;
        counts.pairs += t * (t - 1.0) / 2.0;
        counts.v1 += t * (t - 1.0) * (t - 2.0);
        counts.v2 += t * (t - 1.0) * (2.0 * t + 5.0);
    }
    counts
}

/// Probability that a random permutation of `n` items has at most `c`
/// inversions
#[allow(clippy::cast_precision_loss)]
fn inversions_cdf(n: usize, c: usize) -> f64 {
    // dist[k] = P(k inversions) for permutations of the items seen so far
    let mut dist = vec![0.0; c + 1];
    dist[0] = 1.0;
    for m in 2..=n {
        let mut next = vec![0.0; c + 1];
        let mut window = 0.0;
        for k in 0..=c {
            window += dist[k];
            if k >= m {
                window -= dist[k - m];
            }
            next[k] = window / m as f64;
        }
        dist = next;
    }
    dist.iter().sum()
}

/// Kendall's tau-b
///
/// The p-value is exact when neither input has ties and `n <= 33` (or
/// the ordering is within one swap of perfect), and uses the normal
/// approximation with tie-corrected variance otherwise.
///
/// # Errors
/// Same conditions as [`spearman`]
#[allow(clippy::cast_precision_loss)]
pub fn kendall(x: &[f64], y: &[f64]) -> Result<Correlation> {
    check_pair(x, y, 2, "kendall")?;
    let n = x.len();

    let mut concordant = 0usize;
    let mut discordant = 0usize;
    for i in 0..n {
        for j in (i + 1)..n {
            let sx = x[i].partial_cmp(&x[j]).unwrap_or(Ordering::Equal);
            let sy = y[i].partial_cmp(&y[j]).unwrap_or(Ordering::Equal);
            match (sx, sy) {
                (Ordering::Equal, _) | (_, Ordering::Equal) => {}
                (a, b) if a == b => concordant += 1,
                _ => discordant += 1,
            }
        }
    }

    let total = (n * (n - 1) / 2) as f64;
    let xt = tie_counts(x);
    let yt = tie_counts(y);
    let s = concordant as f64 - discordant as f64;
    let tau = (s / ((total - xt.pairs) * (total - yt.pairs)).sqrt()).clamp(-1.0, 1.0);

    let pairs = n * (n - 1) / 2;
    let c = discordant.min(pairs - discordant);
    let no_ties = xt.pairs == 0.0 && yt.pairs == 0.0;

    let p_value = if no_ties && (n <= KENDALL_EXACT_MAX_N || c <= 1) {
        (2.0 * inversions_cdf(n, c)).clamp(0.0, 1.0)
    } else {
        let nf = n as f64;
        let m = nf * (nf - 1.0);
        let var = (m * (2.0 * nf + 5.0) - xt.v2 - yt.v2) / 18.0
            + (2.0 * xt.pairs * yt.pairs) / m
            + xt.v1 * yt.v1 / (9.0 * m * (nf - 2.0));
        z_two_sided(s / var.sqrt())?
    };

    Ok(Correlation {
        method: CorrelationMethod::Kendall,
        coefficient: tau,
        p_value,
        n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::ErrorKind;

    const HOURS: [f64; 4] = [40.0, 42.0, 41.0, 43.0];
    const HOURLY_OUTPUT: [f64; 4] = [2.5, 2.62, 2.56, 2.67];

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_midranks() {
        assert_eq!(midranks(&[10.0, 30.0, 20.0]), vec![1.0, 3.0, 2.0]);
        assert_eq!(midranks(&[1.0, 2.0, 2.0, 3.0]), vec![1.0, 2.5, 2.5, 4.0]);
        assert_eq!(midranks(&[5.0, 5.0, 5.0]), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_sample_rank_correlations() {
        let rho = spearman(&HOURS, &HOURLY_OUTPUT).expect("spearman");
        let tau = kendall(&HOURS, &HOURLY_OUTPUT).expect("kendall");

        // Hourly output is strictly increasing in hours worked
        assert!(approx(rho.coefficient, 1.0));
        assert!(approx(rho.p_value, 0.0));
        assert!(approx(tau.coefficient, 1.0));
        // exact: 2 / 4!
        assert!(approx(tau.p_value, 2.0 / 24.0));
    }

    #[test]
    fn test_coefficients_bounded() {
        let series: [[f64; 6]; 4] = [
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            [6.0, 5.0, 4.0, 3.0, 2.0, 1.0],
            [3.0, 1.0, 6.0, 2.0, 5.0, 4.0],
            [0.5, 9.0, -2.0, 4.0, 3.3, 7.1],
        ];
        for a in &series {
            for b in &series {
                for c in [spearman(a, b), kendall(a, b), pearson(a, b)] {
                    let c = c.expect("correlation");
                    assert!((-1.0..=1.0).contains(&c.coefficient), "{c:?}");
                    assert!((0.0..=1.0).contains(&c.p_value), "{c:?}");
                }
            }
        }
    }

    #[test]
    fn test_spearman_known_value() {
        // d = [1, -1, 1, -1, 0], sum d^2 = 4, rho = 1 - 6*4 / (5*24) = 0.8
        let rho = spearman(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 1.0, 4.0, 3.0, 5.0]).expect("rho");
        assert!(approx(rho.coefficient, 0.8));
        // df = 3, t = 0.8 * sqrt(3 / 0.36)
        let t: f64 = 0.8 * (3.0_f64 / 0.36).sqrt();
        let dist = StudentsT::new(0.0, 1.0, 3.0).unwrap();
        assert!(approx(rho.p_value, 2.0 * dist.sf(t)));
    }

    #[test]
    fn test_pearson_p_value_df_one() {
        // n = 3 gives a Cauchy reference: sf(t) = 1/2 - atan(t)/pi
        let r = pearson(&[1.0, 2.0, 3.0], &[1.0, 3.0, 2.0]).expect("pearson");
        assert!(approx(r.coefficient, 0.5));
        let t = 0.5 / (0.75_f64).sqrt();
        let expected = 2.0 * (0.5 - t.atan() / std::f64::consts::PI);
        assert!((r.p_value - expected).abs() < 1e-7);
    }

    #[test]
    fn test_kendall_exact_small() {
        // one discordant pair out of 6: tau = (5 - 1) / 6
        let tau = kendall(&[1.0, 2.0, 3.0, 4.0], &[1.0, 3.0, 2.0, 4.0]).expect("tau");
        assert!(approx(tau.coefficient, 4.0 / 6.0));
        // P(inv <= 1) = (1 + 3) / 24
        assert!(approx(tau.p_value, 2.0 * 4.0 / 24.0));
    }

    #[test]
    fn test_kendall_with_ties() {
        let x = [1.0, 2.0, 2.0, 3.0, 4.0];
        let y = [1.0, 3.0, 2.0, 2.0, 5.0];
        let tau = kendall(&x, &y).expect("tau");

        // C = 7, D = 1, one tie in each variable: tau_b = 6 / sqrt(9 * 9)
        assert!(approx(tau.coefficient, 6.0 / 9.0));
        assert!(tau.p_value > 0.0 && tau.p_value < 1.0);
    }

    #[test]
    fn test_rank_correlations_two_pairs() {
        let rho = spearman(&[1.0, 2.0], &[3.0, 4.0]).expect("spearman");
        assert!(approx(rho.coefficient, 1.0));
        assert!(approx(rho.p_value, 0.0));
        assert_eq!(rho.n, 2);

        let rho = spearman(&[1.0, 2.0], &[4.0, 3.0]).expect("spearman");
        assert!(approx(rho.coefficient, -1.0));

        // both orderings of two items are equally likely
        let tau = kendall(&[1.0, 2.0], &[3.0, 4.0]).expect("kendall");
        assert!(approx(tau.coefficient, 1.0));
        assert!(approx(tau.p_value, 1.0));

        let tau = kendall(&[1.0, 2.0], &[4.0, 3.0]).expect("kendall");
        assert!(approx(tau.coefficient, -1.0));
        assert!(approx(tau.p_value, 1.0));
    }

    #[test]
    fn test_inversions_cdf() {
        assert!(approx(inversions_cdf(3, 0), 1.0 / 6.0));
        assert!(approx(inversions_cdf(3, 1), 3.0 / 6.0));
        assert!(approx(inversions_cdf(3, 3), 1.0));
        assert!(approx(inversions_cdf(4, 2), 9.0 / 24.0));
    }

    #[test]
    fn test_rejects_constant_and_short() {
        let err = spearman(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).expect_err("constant");
        assert_eq!(err.kind(), ErrorKind::InsufficientData);

        let err = kendall(&[1.0], &[2.0]).expect_err("short");
        assert_eq!(err.kind(), ErrorKind::InsufficientData);

        let err = pearson(&[1.0, 2.0], &[2.0, 1.0]).expect_err("short");
        assert_eq!(err.kind(), ErrorKind::InsufficientData);

        let err = pearson(&[1.0, 2.0, 3.0], &[1.0, 2.0]).expect_err("length");
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
    }
}
