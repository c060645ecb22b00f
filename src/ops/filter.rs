use crate::dataset::Dataset;
use crate::operation::{FilterOperator, FilterSpec};
use crate::value::Cell;

impl FilterOperator {
    /// Tests `cell` (left side) against the filter `value` (right side).
    pub fn matches(self, cell: &Cell, value: &Cell) -> bool {
        match self {
            FilterOperator::Equals => cell.loose_eq(value),
            FilterOperator::NotEquals => !cell.loose_eq(value),
            FilterOperator::GreaterThan => value.js_lt(cell),
            FilterOperator::LessThan => cell.js_lt(value),
            FilterOperator::Contains => cell.js_string().contains(&value.js_string()),
            FilterOperator::NotContains => !cell.js_string().contains(&value.js_string()),
        }
    }
}

/// Keeps the data rows whose cell in `spec.column` satisfies the predicate.
///
/// An unknown column leaves the dataset unchanged.
pub fn apply_filter(dataset: &Dataset, spec: &FilterSpec) -> Dataset {
    let Some(index) = dataset.column_index(&spec.column) else {
        log::debug!("filter column `{}` not found, rows pass through", spec.column);
        return dataset.clone();
    };
    let rows = dataset
        .rows()
        .iter()
        .filter(|row| spec.operator.matches(&row[index], &spec.value))
        .cloned()
        .collect();
    dataset.with_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn people() -> Dataset {
        Dataset::from_json(&json!([
            ["name", "age"],
            ["A", 30],
            ["B", "25"],
            ["C", null],
            ["Dana", "abc"],
        ]))
        .unwrap()
    }

    fn filter(column: &str, operator: FilterOperator, value: Cell) -> Dataset {
        apply_filter(
            &people(),
            &FilterSpec {
                column: column.to_string(),
                operator,
                value,
            },
        )
    }

    fn names(ds: &Dataset) -> Vec<String> {
        ds.rows().iter().map(|r| r[0].js_string()).collect()
    }

    #[test]
    fn test_equals_is_loose() {
        let out = filter("age", FilterOperator::Equals, Cell::from("30"));
        assert_eq!(names(&out), vec!["A"]);
        let out = filter("age", FilterOperator::Equals, Cell::from(25));
        assert_eq!(names(&out), vec!["B"]);
    }

    #[test]
    fn test_not_equals() {
        let out = filter("age", FilterOperator::NotEquals, Cell::from(30));
        assert_eq!(names(&out), vec!["B", "C", "Dana"]);
    }

    #[test]
    fn test_greater_than() {
        let out = filter("age", FilterOperator::GreaterThan, Cell::from(26));
        assert_eq!(names(&out), vec!["A"]);
    }

    #[test]
    fn test_less_than_counts_null_as_zero() {
        let out = filter("age", FilterOperator::LessThan, Cell::from(26));
        assert_eq!(names(&out), vec!["B", "C"]);
    }

    #[test]
    fn test_contains() {
        let out = filter("name", FilterOperator::Contains, Cell::from("a"));
        assert_eq!(names(&out), vec!["Dana"]);
        let out = filter("age", FilterOperator::Contains, Cell::from("ul"));
        assert_eq!(names(&out), vec!["C"]);
        let out = filter("name", FilterOperator::NotContains, Cell::from("a"));
        assert_eq!(names(&out), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_unknown_column_passes_through() {
        let out = filter("missing", FilterOperator::Equals, Cell::from(1));
        assert_eq!(out, people());
    }

    #[test]
    fn test_header_kept_when_nothing_matches() {
        let out = filter("name", FilterOperator::Equals, Cell::from("Z"));
        assert!(out.is_empty());
        assert_eq!(out.header(), people().header());
    }
}
