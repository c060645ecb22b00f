//! Per-column statistics for a finished dataset.

use crate::dataset::Dataset;
use crate::inference::{infer_column_type, ColumnType};
use crate::value::{Cell, CellKey};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub column_type: ColumnType,
    pub null_count: usize,
    pub distinct_count: usize,
    /// Present for number columns that hold at least one finite value.
    pub numeric: Option<NumericSummary>,
    /// Present for non-number columns that hold at least one non-null value.
    pub most_common: Option<Cell>,
}

impl Serialize for ColumnMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", &self.column_type)?;
        map.serialize_entry("nullCount", &self.null_count)?;
        map.serialize_entry("distinctCount", &self.distinct_count)?;
        if self.column_type == ColumnType::Number {
            let stat = |f: fn(&NumericSummary) -> f64| {
                self.numeric.as_ref().map(|n| Cell::Number(f(n)))
            };
            map.serialize_entry("min", &stat(|n| n.min))?;
            map.serialize_entry("max", &stat(|n| n.max))?;
            map.serialize_entry("mean", &stat(|n| n.mean))?;
        } else {
            map.serialize_entry("mostCommon", &self.most_common)?;
        }
        map.end()
    }
}

/// Column metadata keyed by header name, in header order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetadataMap {
    entries: Vec<(String, ColumnMetadata)>,
}

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces; a replaced entry keeps its original position.
    pub fn insert(&mut self, name: String, metadata: ColumnMetadata) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = metadata,
            None => self.entries.push((name, metadata)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ColumnMetadata> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, m)| m)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnMetadata)> {
        self.entries.iter().map(|(n, m)| (n.as_str(), m))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

impl Serialize for MetadataMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, metadata) in &self.entries {
            map.serialize_entry(name, metadata)?;
        }
        map.end()
    }
}

fn numeric_summary<'a>(cells: impl Iterator<Item = &'a Cell>) -> Option<NumericSummary> {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for n in cells.map(Cell::to_number).filter(|n| n.is_finite()) {
        count += 1;
        sum += n;
        min = min.min(n);
        max = max.max(n);
    }
    (count > 0).then(|| NumericSummary {
        min,
        max,
        mean: sum / count as f64,
    })
}

/// Most frequent value, tracked during a single scan.
///
/// The leader changes only when another value's running count strictly exceeds it, so on a
/// tie the value that reached the winning count first is kept.
fn most_common_value<'a>(cells: impl Iterator<Item = &'a Cell>) -> Option<Cell> {
    let mut counts: HashMap<CellKey, usize> = HashMap::new();
    let mut leader: Option<(&Cell, usize)> = None;
    for cell in cells {
        let count = counts.entry(cell.key()).or_insert(0);
        *count += 1;
        if leader.map_or(true, |(_, max)| *count > max) {
            leader = Some((cell, *count));
        }
    }
    leader.map(|(cell, _)| cell.clone())
}

/// Summarizes one column's data cells (header excluded).
pub fn summarize_column(cells: &[&Cell]) -> ColumnMetadata {
    let column_type = infer_column_type(cells.iter().copied());
    let null_count = cells.iter().filter(|c| c.is_null_like()).count();
    let present = || cells.iter().copied().filter(|c| !c.is_null_like());

    let mut distinct = std::collections::HashSet::new();
    let distinct_count = present().filter(|c| distinct.insert(c.key())).count();

    let (numeric, most_common) = if column_type == ColumnType::Number {
        (numeric_summary(present()), None)
    } else {
        (None, most_common_value(present()))
    };

    ColumnMetadata {
        column_type,
        null_count,
        distinct_count,
        numeric,
        most_common,
    }
}

/// One entry per header name.
pub fn summarize_dataset(dataset: &Dataset) -> MetadataMap {
    let mut metadata = MetadataMap::new();
    for (index, name) in dataset.header().iter().enumerate() {
        let cells: Vec<&Cell> = dataset.column(index).collect();
        metadata.insert(name.clone(), summarize_column(&cells));
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summarize(values: &[Cell]) -> ColumnMetadata {
        let refs: Vec<&Cell> = values.iter().collect();
        summarize_column(&refs)
    }

    #[test]
    fn test_numeric_column() {
        let meta = summarize(&[
            Cell::from("10"),
            Cell::from(20),
            Cell::Null,
            Cell::from("30"),
            Cell::from(""),
        ]);
        assert_eq!(meta.column_type, ColumnType::Number);
        assert_eq!(meta.null_count, 2);
        assert_eq!(meta.distinct_count, 3);
        assert_eq!(
            meta.numeric,
            Some(NumericSummary {
                min: 10.0,
                max: 30.0,
                mean: 20.0
            })
        );
        assert_eq!(meta.most_common, None);
    }

    #[test]
    fn test_non_numeric_cells_skip_stats() {
        let meta = summarize(&[
            Cell::from(1),
            Cell::from(2),
            Cell::from(3),
            Cell::from(4),
            Cell::from(5),
            Cell::from("n/a"),
        ]);
        assert_eq!(meta.column_type, ColumnType::Number);
        assert_eq!(meta.null_count, 0);
        assert_eq!(meta.numeric.map(|n| n.mean), Some(3.0));
    }

    #[test]
    fn test_most_common_tie_goes_to_first_to_reach_count() {
        let meta = summarize(&[
            Cell::from("b"),
            Cell::from("a"),
            Cell::from("a"),
            Cell::from("b"),
            Cell::from("c"),
        ]);
        assert_eq!(meta.column_type, ColumnType::String);
        // "a" reaches two before "b" does
        assert_eq!(meta.most_common, Some(Cell::from("a")));
        assert_eq!(meta.distinct_count, 3);
    }

    #[test]
    fn test_distinct_is_strict() {
        let meta = summarize(&[Cell::from("1"), Cell::from(1), Cell::from("x")]);
        assert_eq!(meta.distinct_count, 3);
    }

    #[test]
    fn test_empty_column() {
        let meta = summarize(&[]);
        assert_eq!(meta.column_type, ColumnType::Unknown);
        assert_eq!(meta.null_count, 0);
        assert_eq!(meta.distinct_count, 0);
        assert_eq!(
            serde_json::to_value(&meta).unwrap(),
            json!({"type": "unknown", "nullCount": 0, "distinctCount": 0, "mostCommon": null})
        );
    }

    #[test]
    fn test_serialized_number_column() {
        let meta = summarize(&[Cell::from(30), Cell::from(40)]);
        assert_eq!(
            serde_json::to_value(&meta).unwrap(),
            json!({"type": "number", "nullCount": 0, "distinctCount": 2, "min": 30, "max": 40, "mean": 35})
        );
    }

    #[test]
    fn test_duplicate_header_overwrites_in_place() {
        let ds = Dataset::from_json(&json!([["a", "b", "a"], ["x", 1, 2]])).unwrap();
        let metadata = summarize_dataset(&ds);
        assert_eq!(metadata.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(
            metadata.get("a").map(|m| m.column_type),
            Some(ColumnType::Number)
        );
    }
}
