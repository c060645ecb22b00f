use super::{numeric_values, reduce};
use crate::dataset::Dataset;
use crate::operation::AggregateSpec;
use crate::value::{Cell, CellKey};
use std::collections::HashMap;

/// Groups rows by the raw `group_by` cell and computes one column per metric.
///
/// Groups appear in first-seen order. An unknown `group_by` column leaves the dataset
/// unchanged; an unknown metric column aggregates over no values.
pub fn apply_aggregate(dataset: &Dataset, spec: &AggregateSpec) -> Dataset {
    let Some(group_index) = dataset.column_index(&spec.group_by) else {
        log::debug!(
            "aggregate column `{}` not found, rows pass through",
            spec.group_by
        );
        return dataset.clone();
    };

    let mut slots: HashMap<CellKey, usize> = HashMap::new();
    let mut groups: Vec<(&Cell, Vec<&Vec<Cell>>)> = Vec::new();
    for row in dataset.rows() {
        let key_cell = &row[group_index];
        let slot = *slots.entry(key_cell.key()).or_insert_with(|| {
            groups.push((key_cell, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row);
    }

    let metric_columns: Vec<Option<usize>> = spec
        .metrics
        .iter()
        .map(|m| dataset.column_index(&m.column))
        .collect();

    let header = std::iter::once(spec.group_by.clone())
        .chain(spec.metrics.iter().map(|m| m.output_name()))
        .collect();

    let rows = groups
        .into_iter()
        .map(|(key_cell, members)| {
            let mut out = Vec::with_capacity(spec.metrics.len() + 1);
            out.push(key_cell.clone());
            for (metric, column) in spec.metrics.iter().zip(&metric_columns) {
                let values = match column {
                    Some(index) => numeric_values(members.iter().map(|row| &row[*index])),
                    None => Vec::new(),
                };
                out.push(reduce(metric.function, &values));
            }
            out
        })
        .collect();

    Dataset::from_parts(header, rows)
}
