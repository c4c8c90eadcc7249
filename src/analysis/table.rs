//! Dataset loading and schema validation

use crate::structs::{
    CsvData, EdaError, MissingPolicy, NumericColumn, ObservationTable, Quarter, Result, Schema,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

pub const QUARTER: &str = "Quarter";
pub const SERVICES_TOTAL: &str = "Management Consulting Services Total (£m)";
pub const GROSS_ADDED_VALUE: &str = "Gross Added Value";
pub const HOURS_WORKED: &str = "Hours Worked";
pub const HOURLY_OUTPUT: &str = "Hourly Output";
pub const RAW_HOURS_WORKED: &str = "Raw Hours Worked";
pub const RAW_HOURLY_OUTPUT: &str = "Raw Hourly Output";

static QUARTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4}) Q([1-4])$").expect("static quarter pattern"));

/// Commas are only accepted as thousands grouping
static GROUPED_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?\d{1,3}(,\d{3})+(\.\d+)?$").expect("static grouped number pattern")
});

const MISSING_TOKENS: [&str; 5] = ["na", "n/a", "nan", "null", "-"];

impl FromStr for Quarter {
    type Err = EdaError;

    fn from_str(s: &str) -> Result<Self> {
        let caps = QUARTER_RE
            .captures(s.trim())
            .ok_or_else(|| EdaError::DataUnavailable(format!("invalid quarter label '{s}'")))?;
        let year = caps[1]
            .parse::<u16>()
            .map_err(|e| EdaError::DataUnavailable(format!("invalid year in '{s}': {e}")))?;
        let quarter = caps[2]
            .parse::<u8>()
            .map_err(|e| EdaError::DataUnavailable(format!("invalid quarter in '{s}': {e}")))?;
        Ok(Self { year, quarter })
    }
}

impl Schema {
    #[must_use]
    pub fn new(key: &str, numeric: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            numeric: numeric.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// The main quarterly consulting dataset
    #[must_use]
    pub fn consulting() -> Self {
        Self::new(
            QUARTER,
            &[SERVICES_TOTAL, GROSS_ADDED_VALUE, HOURS_WORKED, HOURLY_OUTPUT],
        )
    }

    #[must_use]
    pub fn raw_hours() -> Self {
        Self::new(QUARTER, &[RAW_HOURS_WORKED])
    }

    #[must_use]
    pub fn raw_output() -> Self {
        Self::new(QUARTER, &[RAW_HOURLY_OUTPUT])
    }
}

/// Parse a numeric cell. `Ok(None)` means the cell is missing.
fn parse_cell(raw: &str) -> std::result::Result<Option<f64>, ()> {
    let s = raw.trim();
    if s.is_empty() || MISSING_TOKENS.iter().any(|t| s.eq_ignore_ascii_case(t)) {
        return Ok(None);
    }
    let parsed = if s.contains(',') {
        if !GROUPED_NUMBER_RE.is_match(s) {
            return Err(());
        }
        s.replace(',', "").parse::<f64>()
    } else {
        s.parse::<f64>()
    };
    match parsed {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(()),
    }
}

impl ObservationTable {
    /// Build a table from in-memory columns
    ///
    /// # Errors
    /// Returns `DataUnavailable` if a column length differs from the number
    /// of periods, a value is not finite, or a column name repeats
    pub fn new(key: &str, periods: Vec<Quarter>, columns: Vec<NumericColumn>) -> Result<Self> {
        let mut seen = HashSet::new();
        for col in &columns {
            if col.name == key || !seen.insert(col.name.as_str()) {
                return Err(EdaError::DataUnavailable(format!(
                    "duplicate column '{}'",
                    col.name
                )));
            }
            if col.values.len() != periods.len() {
                return Err(EdaError::DataUnavailable(format!(
                    "column '{}' has {} values for {} periods",
                    col.name,
                    col.values.len(),
                    periods.len()
                )));
            }
            if let Some(pos) = col.values.iter().position(|v| !v.is_finite()) {
                return Err(EdaError::DataUnavailable(format!(
                    "column '{}' has a missing value at row {}",
                    col.name,
                    pos + 1
                )));
            }
        }
        Ok(Self {
            key: key.to_string(),
            periods,
            columns,
        })
    }

    /// Load and validate a CSV file against a schema
    ///
    /// # Errors
    /// Returns `DataUnavailable` if the file is missing or unreadable, a
    /// required column is absent, a quarter label is malformed, a numeric
    /// cell does not parse, or (under `MissingPolicy::Reject`) a value is
    /// missing
    pub fn load(path: &Path, schema: &Schema, policy: MissingPolicy, is_tsv: bool) -> Result<Self> {
        let csv = CsvData::from_file(path, is_tsv)
            .map_err(|e| EdaError::DataUnavailable(format!("{}: {e}", path.display())))?;
        let table = Self::from_csv(&csv, schema, policy)?;
        info!(
            path = %path.display(),
            rows = table.row_count(),
            file_columns = csv.col_count(),
            columns = table.columns.len(),
            "loaded table"
        );
        Ok(table)
    }

    /// Validate parsed CSV data against a schema
    ///
    /// # Errors
    /// See [`ObservationTable::load`]
    pub fn from_csv(csv: &CsvData, schema: &Schema, policy: MissingPolicy) -> Result<Self> {
        let require = |name: &str| {
            csv.column_index(name)
                .ok_or_else(|| EdaError::DataUnavailable(format!("missing required column '{name}'")))
        };
        let key_idx = require(schema.key.as_str())?;
        let numeric_idx = schema
            .numeric
            .iter()
            .map(|name| require(name.as_str()))
            .collect::<Result<Vec<_>>>()?;

        let mut periods = Vec::with_capacity(csv.row_count());
        let mut values: Vec<Vec<f64>> = vec![Vec::with_capacity(csv.row_count()); numeric_idx.len()];
        let mut dropped = 0usize;

        for row_idx in 0..csv.row_count() {
            let line = row_idx + 2;
            let label = csv.cell(row_idx, key_idx).unwrap_or("");
            let quarter: Quarter = label
                .parse()
                .map_err(|e| EdaError::DataUnavailable(format!("row {line}: {e}")))?;

            let mut cells: Vec<Option<f64>> = Vec::with_capacity(numeric_idx.len());
            for (&col_idx, name) in numeric_idx.iter().zip(&schema.numeric) {
                let raw = csv.cell(row_idx, col_idx).unwrap_or("");
                let cell = parse_cell(raw).map_err(|()| {
                    EdaError::DataUnavailable(format!(
                        "row {line}: column '{name}' is not numeric: '{raw}'"
                    ))
                })?;
                cells.push(cell);
            }

            if let Some(missing) = cells.iter().position(Option::is_none) {
                match policy {
                    MissingPolicy::Reject => {
                        return Err(EdaError::DataUnavailable(format!(
                            "row {line} ({quarter}): missing value in column '{}'",
                            schema.numeric[missing]
                        )));
                    }
                    MissingPolicy::DropRow => {
                        dropped += 1;
                        continue;
                    }
                }
            }

            periods.push(quarter);
            for (col, cell) in values.iter_mut().zip(cells) {
                col.extend(cell);
            }
        }

        if dropped > 0 {
            warn!(dropped, "dropped rows with missing values");
        }

        let columns = schema
            .numeric
            .iter()
            .zip(values)
            .map(|(name, values)| NumericColumn {
                name: name.clone(),
                values,
            })
            .collect();

        Self::new(&schema.key, periods, columns)
    }

    /// Number of rows
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.periods.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Name of the period key column
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn periods(&self) -> &[Quarter] {
        &self.periods
    }

    #[must_use]
    pub fn columns(&self) -> &[NumericColumn] {
        &self.columns
    }

    /// Names of the numeric columns, in table order
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Values of a numeric column
    ///
    /// # Errors
    /// Returns `DataUnavailable` if no such column exists
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| EdaError::DataUnavailable(format!("no column named '{name}'")))
    }

    /// First `n` rows as a new table
    #[must_use]
    pub fn head(&self, n: usize) -> Self {
        let n = n.min(self.row_count());
        Self {
            key: self.key.clone(),
            periods: self.periods[..n].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|c| NumericColumn {
                    name: c.name.clone(),
                    values: c.values[..n].to_vec(),
                })
                .collect(),
        }
    }

    /// Earliest and latest quarter present
    #[must_use]
    pub fn quarter_range(&self) -> Option<(Quarter, Quarter)> {
        let first = self.periods.iter().min()?;
        let last = self.periods.iter().max()?;
        Some((*first, *last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::ErrorKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "Quarter,Management Consulting Services Total (£m),Gross Added Value,Hours Worked,Hourly Output\n\
        2023 Q1,50,100,40,2.5\n\
        2023 Q2,55,110,42,2.62\n\
        2023 Q3,53,105,41,2.56\n\
        2023 Q4,57,115,43,2.67\n";

    fn create_test_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp file");
        file.write_all(content.as_bytes()).expect("write content");
        file
    }

    fn load(content: &str, policy: MissingPolicy) -> Result<ObservationTable> {
        let file = create_test_csv(content);
        ObservationTable::load(file.path(), &Schema::consulting(), policy, false)
    }

    #[test]
    fn test_quarter_parse_and_display() {
        let q: Quarter = "2023 Q4".parse().expect("parse");
        assert_eq!(q, Quarter { year: 2023, quarter: 4 });
        assert_eq!(q.to_string(), "2023 Q4");

        let padded: Quarter = "  1999 Q1 ".parse().expect("parse trimmed");
        assert_eq!(padded.year, 1999);
    }

    #[test]
    fn test_quarter_rejects_bad_labels() {
        for bad in ["2023 Q5", "2023 Q0", "23 Q1", "2023Q1", "2023 q1", "2023 Q1x", ""] {
            let err = bad.parse::<Quarter>().expect_err(bad);
            assert_eq!(err.kind(), ErrorKind::DataUnavailable, "{bad}");
        }
    }

    #[test]
    fn test_quarter_ordering() {
        let a: Quarter = "2022 Q4".parse().unwrap();
        let b: Quarter = "2023 Q1".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_load_sample() {
        let table = load(SAMPLE, MissingPolicy::Reject).expect("load");

        assert_eq!(table.row_count(), 4);
        assert_eq!(table.key(), QUARTER);
        for name in Schema::consulting().numeric {
            assert_eq!(table.column(&name).expect("column").len(), 4);
        }
        assert_eq!(table.column(HOURS_WORKED).unwrap(), &[40.0, 42.0, 41.0, 43.0]);
        for q in table.periods() {
            assert!(QUARTER_RE.is_match(&q.to_string()));
        }
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let err = ObservationTable::load(
            Path::new("/no/such/file.csv"),
            &Schema::consulting(),
            MissingPolicy::Reject,
            false,
        )
        .expect_err("missing file");
        assert_eq!(err.kind(), ErrorKind::DataUnavailable);
    }

    #[test]
    fn test_missing_column_is_unavailable() {
        let err = load("Quarter,Gross Added Value\n2023 Q1,100\n", MissingPolicy::Reject)
            .expect_err("missing columns");
        assert_eq!(err.kind(), ErrorKind::DataUnavailable);
        assert!(err.to_string().contains("Management Consulting"));
    }

    #[test]
    fn test_non_numeric_is_unavailable() {
        let content = SAMPLE.replace("2023 Q2,55,110,42", "2023 Q2,55,abc,42");
        let err = load(&content, MissingPolicy::DropRow).expect_err("non numeric");
        assert_eq!(err.kind(), ErrorKind::DataUnavailable);
    }

    #[test]
    fn test_bad_quarter_is_unavailable() {
        let content = SAMPLE.replace("2023 Q3", "2023-07");
        let err = load(&content, MissingPolicy::Reject).expect_err("bad quarter");
        assert_eq!(err.kind(), ErrorKind::DataUnavailable);
        assert!(err.to_string().contains("row 4"));
    }

    #[test]
    fn test_missing_value_policies() {
        let content = SAMPLE.replace("2023 Q2,55,110,42,2.62", "2023 Q2,55,,42,NA");

        let err = load(&content, MissingPolicy::Reject).expect_err("reject");
        assert_eq!(err.kind(), ErrorKind::DataUnavailable);

        let table = load(&content, MissingPolicy::DropRow).expect("drop");
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column(GROSS_ADDED_VALUE).unwrap(), &[100.0, 105.0, 115.0]);
    }

    #[test]
    fn test_thousands_separator() {
        let content = "Quarter,Raw Hours Worked\n2023 Q1,\"1,000\"\n2023 Q2,1050\n";
        let file = create_test_csv(content);
        let table =
            ObservationTable::load(file.path(), &Schema::raw_hours(), MissingPolicy::Reject, false)
                .expect("load");
        assert_eq!(table.column(RAW_HOURS_WORKED).unwrap(), &[1000.0, 1050.0]);
    }

    #[test]
    fn test_comma_must_group_thousands() {
        assert_eq!(parse_cell("1,234.5"), Ok(Some(1234.5)));
        assert_eq!(parse_cell("-12,000"), Ok(Some(-12000.0)));
        for bad in ["2,5", "1,2,3.4", "1234,567", ",123", "12,34"] {
            assert_eq!(parse_cell(bad), Err(()), "{bad}");
        }

        let content = "Quarter,Raw Hours Worked\n2023 Q1,\"2,5\"\n";
        let file = create_test_csv(content);
        let err =
            ObservationTable::load(file.path(), &Schema::raw_hours(), MissingPolicy::Reject, false)
                .expect_err("decimal comma");
        assert_eq!(err.kind(), ErrorKind::DataUnavailable);
    }

    #[test]
    fn test_new_validates_lengths() {
        let periods = vec!["2023 Q1".parse().unwrap()];
        let columns = vec![NumericColumn {
            name: "x".into(),
            values: vec![1.0, 2.0],
        }];
        let err = ObservationTable::new(QUARTER, periods, columns).expect_err("length mismatch");
        assert_eq!(err.kind(), ErrorKind::DataUnavailable);
    }

    #[test]
    fn test_head_and_range() {
        let table = load(SAMPLE, MissingPolicy::Reject).expect("load");
        let head = table.head(2);
        assert_eq!(head.row_count(), 2);
        assert_eq!(head.column(HOURLY_OUTPUT).unwrap(), &[2.5, 2.62]);

        let (first, last) = table.quarter_range().expect("range");
        assert_eq!(first.to_string(), "2023 Q1");
        assert_eq!(last.to_string(), "2023 Q4");
    }

    #[test]
    fn test_unknown_column() {
        let table = load(SAMPLE, MissingPolicy::Reject).expect("load");
        assert_eq!(
            table.column("Nope").expect_err("unknown").kind(),
            ErrorKind::DataUnavailable
        );
    }
}
