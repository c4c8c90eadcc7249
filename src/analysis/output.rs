//! Report file writers for the analyze command

use crate::structs::{AnalysisResult, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Build the human readable overview of a run
#[must_use]
pub fn build_summary(source: &Path, result: &AnalysisResult) -> String {
    let mut s = format!("Source: {}\n", source.display());
    let _ = write!(s, "Rows: {}", result.row_count);
    if let (Some(first), Some(last)) = (result.first_quarter, result.last_quarter) {
        let _ = write!(s, " ({first} to {last})");
    }
    s.push_str("\n\nSummary statistics:\n");
    for summary in &result.summaries {
        let _ = writeln!(s, "  {}", summary.summary());
    }

    s.push_str("\nRegressions:\n");
    for reg in &result.regressions {
        let f = &reg.fit;
        let _ = writeln!(
            s,
            "  {} ~ {}: slope={:.4}, intercept={:.4}, r={:.4}, R²={:.4}, p={:.4e}",
            reg.y, reg.x, f.slope, f.intercept, f.r, f.r_squared, f.p_value
        );
    }

    if let Some(corr) = &result.correlations {
        let _ = writeln!(s, "\nCorrelations ({} vs {}):", corr.x, corr.y);
        for c in &corr.results {
            let _ = writeln!(
                s,
                "  {}: {:.4} (p={:.4e}, n={})",
                c.method, c.coefficient, c.p_value, c.n
            );
        }
    }

    match &result.independence {
        Some(ind) => {
            let t = &ind.test;
            let _ = writeln!(
                s,
                "\nIndependence of hours and output tertiles ({} merged quarters):",
                ind.merged_rows
            );
            let _ = writeln!(s, "  rows: {}", ind.row_labels.join(", "));
            let _ = writeln!(s, "  cols: {}", ind.col_labels.join(", "));
            for (label, row) in ind.row_labels.iter().zip(&ind.observed) {
                let cells: Vec<String> = row.iter().map(|v| format!("{v:.0}")).collect();
                let _ = writeln!(s, "  {label:>6}: {}", cells.join(" "));
            }
            let _ = writeln!(
                s,
                "  chi2={:.4}, dof={}, p={:.4e}{}",
                t.statistic,
                t.dof,
                t.p_value,
                if t.yates_corrected { " (Yates corrected)" } else { "" }
            );
            if t.low_expected_cells > 0 {
                let _ = writeln!(
                    s,
                    "  warning: {} cells have expected counts below 5",
                    t.low_expected_cells
                );
            }
        }
        None => s.push_str("\nIndependence test: not run\n"),
    }

    s
}

/// Write `summary.txt` - human readable overview
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_summary(output_dir: &Path, content: &str) -> Result<()> {
    let path = output_dir.join("summary.txt");
    fs::write(path, content)?;
    Ok(())
}

/// Write `stats.json` - machine-readable results
///
/// # Errors
/// Returns error if the result cannot be serialized or the file written
pub fn write_stats_json(output_dir: &Path, result: &AnalysisResult) -> Result<()> {
    let path = output_dir.join("stats.json");
    let json = serde_json::to_string_pretty(result)?;
    fs::write(path, json)?;
    Ok(())
}
