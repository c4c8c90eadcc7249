//! Consolidated public types for the consulting EDA crate
//!
//! This module contains the error type, the table types produced by the
//! loader and merger, and the immutable result values produced by the
//! analysis functions.

use ndarray::Array2;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum EdaError {
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Degenerate distribution: {0}")]
    DegenerateDistribution(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Classification of an [`EdaError`], for callers that branch on the failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DataUnavailable,
    InsufficientData,
    DegenerateDistribution,
    Io,
    Config,
}

impl EdaError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DataUnavailable(_) => ErrorKind::DataUnavailable,
            Self::InsufficientData(_) => ErrorKind::InsufficientData,
            Self::DegenerateDistribution(_) => ErrorKind::DegenerateDistribution,
            Self::Csv(_) | Self::Io(_) | Self::Json(_) => ErrorKind::Io,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

pub type Result<T> = std::result::Result<T, EdaError>;

// ============================================================================
// CSV Types
// ============================================================================

/// Represents a parsed CSV/TSV file with headers and rows
#[derive(Debug, Clone)]
pub struct CsvData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvData {
    /// Get number of rows
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get number of columns
    #[must_use]
    pub fn col_count(&self) -> usize {
        self.headers.len()
    }

    /// Get column index by name
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }
}

// ============================================================================
// Table Types
// ============================================================================

/// A period label of the form `YYYY Qn`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quarter {
    pub year: u16,
    pub quarter: u8,
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04} Q{}", self.year, self.quarter)
    }
}

impl Serialize for Quarter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What the loader does with a row missing a required numeric value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Fail the load with `DataUnavailable`
    #[default]
    Reject,
    /// Drop the row and keep loading
    DropRow,
}

/// Required columns of a table: the period key plus numeric measurements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub key: String,
    pub numeric: Vec<String>,
}

/// A named numeric column with no missing values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// Rows keyed by quarter, stored column-major
///
/// Every column has exactly `periods.len()` values. Construction goes
/// through the loader, [`ObservationTable::new`] or the merger, all of
/// which check this.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationTable {
    pub(crate) key: String,
    pub(crate) periods: Vec<Quarter>,
    pub(crate) columns: Vec<NumericColumn>,
}

// ============================================================================
// Analysis Types
// ============================================================================

/// Tertile bucket label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Tertile {
    Low,
    Medium,
    High,
}

impl Tertile {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for Tertile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column cut into tertiles, with the edges used for the cut
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binned {
    pub labels: Vec<Tertile>,
    /// `[min, q(1/3), q(2/3), max]`
    pub edges: Vec<f64>,
}

/// Ordinary least squares fit of `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r: f64,
    pub r_squared: f64,
    /// Two-sided p-value for the null hypothesis `slope == 0`
    pub p_value: f64,
    pub stderr: f64,
    pub intercept_stderr: f64,
    pub n: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    Pearson,
    Spearman,
    Kendall,
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pearson => "Pearson",
            Self::Spearman => "Spearman",
            Self::Kendall => "Kendall",
        };
        f.write_str(name)
    }
}

/// A correlation coefficient in `[-1, 1]` with its two-sided p-value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Correlation {
    pub method: CorrelationMethod,
    pub coefficient: f64,
    pub p_value: f64,
    pub n: usize,
}

/// Cross tabulation of two categorical columns
///
/// Only levels that occur at least once get a row or column.
#[derive(Debug, Clone, PartialEq)]
pub struct ContingencyTable {
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub counts: Array2<f64>,
}

/// Result of a chi-squared test of independence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChiSquaredTest {
    pub statistic: f64,
    pub dof: usize,
    pub p_value: f64,
    /// Expected counts under independence, row-major
    pub expected: Vec<Vec<f64>>,
    /// Number of cells with an expected count below 5
    pub low_expected_cells: usize,
    pub yates_corrected: bool,
}

/// Descriptive statistics for a numeric column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub mean: f64,
    /// Sample standard deviation (ddof = 1)
    pub std: f64,
}

/// A named regression, e.g. `Gross Added Value ~ Hours Worked`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionReport {
    pub x: String,
    pub y: String,
    pub fit: Regression,
}

/// Correlations between one pair of columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationReport {
    pub x: String,
    pub y: String,
    pub results: Vec<Correlation>,
}

/// Outcome of the merge / bin / chi-squared stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndependenceReport {
    pub merged_rows: usize,
    pub hours_bins: Binned,
    pub output_bins: Binned,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub observed: Vec<Vec<f64>>,
    pub test: ChiSquaredTest,
}

/// Everything one pipeline run produces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub row_count: usize,
    pub first_quarter: Option<Quarter>,
    pub last_quarter: Option<Quarter>,
    pub summaries: Vec<ColumnSummary>,
    pub regressions: Vec<RegressionReport>,
    pub correlations: Option<CorrelationReport>,
    pub independence: Option<IndependenceReport>,
}
