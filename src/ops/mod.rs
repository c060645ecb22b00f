//! The four data-shaping executors. Each takes a dataset by reference and returns a new one.

mod aggregate;
mod filter;
mod pivot;
mod sort;

pub use aggregate::apply_aggregate;
pub use filter::apply_filter;
pub use pivot::apply_pivot;
pub use sort::{apply_sort, stable_sort_by};

use crate::operation::AggregateFunction;
use crate::value::Cell;

/// Float-parses `cells`, dropping anything that is not numeric.
pub(crate) fn numeric_values<'a>(cells: impl Iterator<Item = &'a Cell>) -> Vec<f64> {
    cells.filter_map(Cell::parse_float).collect()
}

/// Applies an aggregation to already-parsed values.
///
/// An empty input gives 0 for `sum` and `count` and null for the rest.
pub(crate) fn reduce(function: AggregateFunction, values: &[f64]) -> Cell {
    if values.is_empty() {
        return match function {
            AggregateFunction::Sum | AggregateFunction::Count => Cell::Number(0.0),
            AggregateFunction::Avg | AggregateFunction::Min | AggregateFunction::Max => Cell::Null,
        };
    }
    let sum = || values.iter().sum::<f64>();
    Cell::Number(match function {
        AggregateFunction::Sum => sum(),
        AggregateFunction::Avg => sum() / values.len() as f64,
        AggregateFunction::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        AggregateFunction::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        AggregateFunction::Count => values.len() as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_mixed_column() {
        let cells = [Cell::from("10"), Cell::from("x"), Cell::from("20")];
        let values = numeric_values(cells.iter());
        assert_eq!(values, vec![10.0, 20.0]);
        assert_eq!(reduce(AggregateFunction::Count, &values), Cell::from(2));
        assert_eq!(reduce(AggregateFunction::Sum, &values), Cell::from(30));
        assert_eq!(reduce(AggregateFunction::Avg, &values), Cell::from(15));
        assert_eq!(reduce(AggregateFunction::Min, &values), Cell::from(10));
        assert_eq!(reduce(AggregateFunction::Max, &values), Cell::from(20));
    }

    #[test]
    fn test_reduce_empty() {
        assert_eq!(reduce(AggregateFunction::Sum, &[]), Cell::from(0));
        assert_eq!(reduce(AggregateFunction::Count, &[]), Cell::from(0));
        assert_eq!(reduce(AggregateFunction::Avg, &[]), Cell::Null);
        assert_eq!(reduce(AggregateFunction::Min, &[]), Cell::Null);
        assert_eq!(reduce(AggregateFunction::Max, &[]), Cell::Null);
    }
}
