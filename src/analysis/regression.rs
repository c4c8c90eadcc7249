//! Ordinary least squares for one predictor

use super::correlation::t_two_sided;
use super::stats::mean;
use crate::structs::{EdaError, Regression, Result};

/// Keeps the t statistic finite when `|r| == 1`
const TINY: f64 = 1.0e-20;

/// Fit `y = slope * x + intercept` by least squares
///
/// The p-value tests `slope == 0` against a t distribution with `n - 2`
/// degrees of freedom. With exactly two points the line is exact: the
/// standard errors are zero and the p-value is 0, or 1 if `y` is constant.
///
/// # Errors
/// Returns `InsufficientData` for unequal lengths, fewer than 2 points,
/// non-finite values or a constant `x`
#[allow(clippy::cast_precision_loss)]
pub fn linregress(x: &[f64], y: &[f64]) -> Result<Regression> {
    if x.len() != y.len() {
        return Err(EdaError::InsufficientData(format!(
            "regression: x has {} values, y has {}",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    if n < 2 {
        return Err(EdaError::InsufficientData(format!(
            "regression: need at least 2 points, got {n}"
        )));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(EdaError::InsufficientData(
            "regression: input contains non-finite values".into(),
        ));
    }

    let x_mean = mean(x);
    let y_mean = mean(y);

    let (mut ssxm, mut ssym, mut ssxym) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - x_mean;
        let dy = b - y_mean;
        ssxm += dx * dx;
        ssym += dy * dy;
        ssxym += dx * dy;
    }

    if ssxm == 0.0 {
        return Err(EdaError::InsufficientData(
            "regression: all x values are identical".into(),
        ));
    }

    let r = if ssym == 0.0 {
        0.0
    } else {
        (ssxym / (ssxm * ssym).sqrt()).clamp(-1.0, 1.0)
    };

    let slope = ssxym / ssxm;
    let intercept = y_mean - slope * x_mean;

    let (p_value, stderr, intercept_stderr) = if n == 2 {
        let p = if y[0] == y[1] { 1.0 } else { 0.0 };
        (p, 0.0, 0.0)
    } else {
        let df = (n - 2) as f64;
        let t = r * (df / ((1.0 - r + TINY) * (1.0 + r + TINY))).sqrt();
        let p = t_two_sided(t, df)?;
        let stderr = ((1.0 - r * r) * ssym / ssxm / df).max(0.0).sqrt();
        let intercept_stderr = stderr * (ssxm / n as f64 + x_mean * x_mean).sqrt();
        (p, stderr, intercept_stderr)
    };

    Ok(Regression {
        slope,
        intercept,
        r,
        r_squared: r * r,
        p_value,
        stderr,
        intercept_stderr,
        n,
    })
}
