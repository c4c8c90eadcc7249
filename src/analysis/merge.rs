//! Inner join of two observation tables on the period key

use crate::structs::{EdaError, NumericColumn, ObservationTable, Quarter, Result};
use std::collections::HashMap;
use std::collections::HashSet;
use tracing::debug;

/// Join `left` and `right` on `key`, keeping only periods present in both
///
/// Rows come out in left-table order; a period repeated on either side
/// produces every pairing of its left and right rows. Non-key columns
/// present in both tables are suffixed `_x` (left) and `_y` (right).
///
/// # Errors
/// Returns `DataUnavailable` if either table is not keyed by `key`
pub fn inner_join(
    left: &ObservationTable,
    right: &ObservationTable,
    key: &str,
) -> Result<ObservationTable> {
    for (side, table) in [("left", left), ("right", right)] {
        if table.key() != key {
            return Err(EdaError::DataUnavailable(format!(
                "{side} table has no join key '{key}' (keyed by '{}')",
                table.key()
            )));
        }
    }

    let mut right_rows: HashMap<Quarter, Vec<usize>> = HashMap::new();
    for (i, q) in right.periods().iter().enumerate() {
        right_rows.entry(*q).or_default().push(i);
    }

    let pairs: Vec<(usize, usize)> = left
        .periods()
        .iter()
        .enumerate()
        .filter_map(|(i, q)| right_rows.get(q).map(|js| (i, js)))
        .flat_map(|(i, js)| js.iter().map(move |&j| (i, j)))
        .collect();

    let left_names: HashSet<&str> = left.column_names().into_iter().collect();
    let right_names: HashSet<&str> = right.column_names().into_iter().collect();

    let mut columns = project(left, "_x", &right_names, &pairs, |p| p.0);
    columns.extend(project(right, "_y", &left_names, &pairs, |p| p.1));

    let periods = pairs.iter().map(|&(i, _)| left.periods()[i]).collect();

    debug!(
        left = left.row_count(),
        right = right.row_count(),
        merged = pairs.len(),
        "inner join"
    );

    ObservationTable::new(key, periods, columns)
}

/// Copy `table`'s columns at the row indices chosen by `side`
fn project(
    table: &ObservationTable,
    suffix: &str,
    other: &HashSet<&str>,
    pairs: &[(usize, usize)],
    side: fn(&(usize, usize)) -> usize,
) -> Vec<NumericColumn> {
    table
        .columns()
        .iter()
        .map(|c| NumericColumn {
            name: if other.contains(c.name.as_str()) {
                format!("{}{suffix}", c.name)
            } else {
                c.name.clone()
            },
            values: pairs.iter().map(|p| c.values[side(p)]).collect(),
        })
        .collect()
}
