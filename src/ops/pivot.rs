use super::{numeric_values, reduce};
use crate::dataset::Dataset;
use crate::operation::PivotSpec;
use crate::value::Cell;
use std::collections::{HashMap, HashSet};

const KEY_SEPARATOR: &str = "|";

/// Joined key for a list of columns; missing columns and nulls contribute "".
fn composite_key(row: &[Cell], columns: &[Option<usize>]) -> String {
    columns
        .iter()
        .map(|c| c.and_then(|i| row.get(i)).map(Cell::key_string).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

struct OuterGroup<'a> {
    /// Row-key cells of the first row seen for this group.
    key_cells: Vec<Cell>,
    /// Member rows per inner key.
    cells: HashMap<String, Vec<&'a Vec<Cell>>>,
}

/// Reshapes rows into a cross-tabulation.
///
/// One output row per distinct row key, one output column per distinct column key and value
/// column, named `<column key>_<value column>`. Combinations without rows are null.
pub fn apply_pivot(dataset: &Dataset, spec: &PivotSpec) -> Dataset {
    let resolve = |names: &[String]| -> Vec<Option<usize>> {
        names.iter().map(|n| dataset.column_index(n)).collect()
    };
    let row_columns = resolve(&spec.rows);
    let column_columns = resolve(&spec.columns);
    let value_columns = resolve(&spec.values);

    let mut outer_slots: HashMap<String, usize> = HashMap::new();
    let mut outer: Vec<OuterGroup> = Vec::new();
    let mut inner_keys: Vec<String> = Vec::new();
    let mut seen_inner: HashSet<String> = HashSet::new();

    for row in dataset.rows() {
        let outer_key = composite_key(row, &row_columns);
        let inner_key = composite_key(row, &column_columns);
        if seen_inner.insert(inner_key.clone()) {
            inner_keys.push(inner_key.clone());
        }
        let slot = *outer_slots.entry(outer_key).or_insert_with(|| {
            let key_cells = row_columns
                .iter()
                .map(|c| c.and_then(|i| row.get(i)).cloned().unwrap_or(Cell::Null))
                .collect();
            outer.push(OuterGroup {
                key_cells,
                cells: HashMap::new(),
            });
            outer.len() - 1
        });
        outer[slot].cells.entry(inner_key).or_default().push(row);
    }

    let mut header: Vec<String> = spec.rows.clone();
    for inner_key in &inner_keys {
        for value in &spec.values {
            header.push(format!("{inner_key}_{value}"));
        }
    }

    let rows = outer
        .into_iter()
        .map(|group| {
            let mut out = group.key_cells;
            for inner_key in &inner_keys {
                let members = group.cells.get(inner_key);
                for column in &value_columns {
                    let cell = match (members, column) {
                        (None, _) => Cell::Null,
                        (Some(members), Some(index)) => reduce(
                            spec.aggregation,
                            &numeric_values(members.iter().map(|row| &row[*index])),
                        ),
                        (Some(_), None) => reduce(spec.aggregation, &[]),
                    };
                    out.push(cell);
                }
            }
            out
        })
        .collect();

    Dataset::from_parts(header, rows)
}
