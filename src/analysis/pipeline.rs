//! Analysis pipeline that orchestrates the statistical computations

use super::table::{
    GROSS_ADDED_VALUE, HOURLY_OUTPUT, HOURS_WORKED, QUARTER, RAW_HOURLY_OUTPUT, RAW_HOURS_WORKED,
};
use super::{binning, contingency, correlation, merge, regression, stats};
use crate::structs::{
    AnalysisResult, ContingencyTable, CorrelationReport, EdaError, IndependenceReport,
    MissingPolicy, ObservationTable, RegressionReport, Result, Schema,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration for loading and analysis
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisConfig {
    pub missing_policy: MissingPolicy,
    pub tsv: bool,
}

/// Files a run reads; the raw tables come as a pair or not at all
#[derive(Debug, Clone)]
pub struct InputPaths {
    pub consulting: PathBuf,
    pub raw_tables: Option<(PathBuf, PathBuf)>,
}

/// Loaded pipeline inputs
#[derive(Debug, Clone, PartialEq)]
pub struct Inputs {
    pub consulting: ObservationTable,
    /// Raw hours and raw output tables
    pub raw_tables: Option<(ObservationTable, ObservationTable)>,
}

impl Inputs {
    /// Load every input file
    ///
    /// # Errors
    /// Returns `DataUnavailable` if any file fails to load or validate
    pub fn load(paths: &InputPaths, config: &AnalysisConfig) -> Result<Self> {
        let load = |path: &Path, schema: &Schema| {
            ObservationTable::load(path, schema, config.missing_policy, config.tsv)
        };

        let consulting = load(paths.consulting.as_path(), &Schema::consulting())?;
        let raw_tables = match &paths.raw_tables {
            Some((hours, output)) => Some((
                load(hours.as_path(), &Schema::raw_hours())?,
                load(output.as_path(), &Schema::raw_output())?,
            )),
            None => None,
        };

        Ok(Self {
            consulting,
            raw_tables,
        })
    }
}

fn regress(table: &ObservationTable, x: &str, y: &str) -> Result<RegressionReport> {
    let fit = regression::linregress(table.column(x)?, table.column(y)?)?;
    info!(x, y, slope = fit.slope, r_squared = fit.r_squared, p = fit.p_value, "regression");
    Ok(RegressionReport {
        x: x.to_string(),
        y: y.to_string(),
        fit,
    })
}

fn correlate(table: &ObservationTable, x: &str, y: &str) -> Result<CorrelationReport> {
    let xs = table.column(x)?;
    let ys = table.column(y)?;
    let results = vec![
        correlation::pearson(xs, ys)?,
        correlation::spearman(xs, ys)?,
        correlation::kendall(xs, ys)?,
    ];
    for c in &results {
        info!(method = %c.method, coefficient = c.coefficient, p = c.p_value, "correlation");
    }
    Ok(CorrelationReport {
        x: x.to_string(),
        y: y.to_string(),
        results,
    })
}

/// Merge the raw tables, bin both measures into tertiles and test the
/// bins for independence
///
/// # Errors
/// Returns the merge, binning or chi-squared error that stopped the stage
pub fn independence(
    raw_hours: &ObservationTable,
    raw_output: &ObservationTable,
) -> Result<IndependenceReport> {
    let merged = merge::inner_join(raw_hours, raw_output, QUARTER)?;
    if merged.is_empty() {
        return Err(EdaError::InsufficientData(
            "raw hours and raw output share no quarters".into(),
        ));
    }

    let hours_bins = binning::qcut_tertiles(merged.column(RAW_HOURS_WORKED)?)?;
    let output_bins = binning::qcut_tertiles(merged.column(RAW_HOURLY_OUTPUT)?)?;

    let table = ContingencyTable::cross_tab(&hours_bins.labels, &output_bins.labels)?;
    let test = contingency::chi2_contingency(&table)?;
    info!(
        merged = merged.row_count(),
        chi2 = test.statistic,
        dof = test.dof,
        p = test.p_value,
        "independence test"
    );

    Ok(IndependenceReport {
        merged_rows: merged.row_count(),
        observed: table.to_rows(),
        row_labels: table.row_labels,
        col_labels: table.col_labels,
        hours_bins,
        output_bins,
        test,
    })
}

/// Run the full analysis pipeline
///
/// # Errors
/// Returns error if the summary statistics or the primary regression
/// fail. The secondary regression, the correlations and the
/// independence stage are non-fatal (logged and set to `None` / skipped).
pub fn run_pipeline(inputs: &Inputs) -> Result<AnalysisResult> {
    let table = &inputs.consulting;

    let names = table.column_names();
    let summaries = stats::summarize(table, &names)?;

    let mut regressions = vec![regress(table, HOURS_WORKED, GROSS_ADDED_VALUE)?];
    match regress(table, HOURS_WORKED, HOURLY_OUTPUT) {
        Ok(r) => regressions.push(r),
        Err(e) => warn!("Hourly output regression failed: {e}"),
    }

    let correlations = match correlate(table, HOURS_WORKED, HOURLY_OUTPUT) {
        Ok(c) => Some(c),
        Err(e) => {
            warn!("Rank correlation failed: {e}");
            None
        }
    };

    let independence = match &inputs.raw_tables {
        Some((hours, output)) => match independence(hours, output) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Independence test failed: {e}");
                None
            }
        },
        None => None,
    };

    let range = table.quarter_range();

    Ok(AnalysisResult {
        row_count: table.row_count(),
        first_quarter: range.map(|(first, _)| first),
        last_quarter: range.map(|(_, last)| last),
        summaries,
        regressions,
        correlations,
        independence,
    })
}
