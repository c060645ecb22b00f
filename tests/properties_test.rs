use proptest::prelude::*;
use sheetflow::ops::{apply_aggregate, apply_filter, apply_sort};
use sheetflow::{
    AggregateFunction, AggregateSpec, Cell, Dataset, FilterOperator, FilterSpec, MetricSpec,
    SortDirection, SortSpec,
};
use std::collections::HashSet;

fn any_cell() -> impl Strategy<Value = Cell> {
    prop_oneof![
        Just(Cell::Null),
        (-5i32..5).prop_map(Cell::from),
        prop::sample::select(vec!["a", "b", "ab", "", "3", "10"]).prop_map(Cell::from),
        any::<bool>().prop_map(Cell::Bool),
    ]
}

fn any_operator() -> impl Strategy<Value = FilterOperator> {
    prop::sample::select(vec![
        FilterOperator::Equals,
        FilterOperator::NotEquals,
        FilterOperator::GreaterThan,
        FilterOperator::LessThan,
        FilterOperator::Contains,
        FilterOperator::NotContains,
    ])
}

/// Columns `k`, `v` and `i`, where `i` is the original row position.
fn dataset(keys: Vec<Cell>, values: Vec<Cell>) -> Dataset {
    let rows = keys
        .into_iter()
        .zip(values)
        .enumerate()
        .map(|(i, (k, v))| vec![k, v, Cell::from(i as f64)])
        .collect();
    Dataset::new(vec!["k".into(), "v".into(), "i".into()], rows).unwrap()
}

fn positions(ds: &Dataset) -> Vec<f64> {
    ds.column(2).filter_map(Cell::parse_float).collect()
}

proptest! {
    #[test]
    fn filter_is_idempotent(
        cells in prop::collection::vec((any_cell(), any_cell()), 0..40),
        operator in any_operator(),
        value in any_cell(),
    ) {
        let (keys, values) = cells.into_iter().unzip();
        let ds = dataset(keys, values);
        let spec = FilterSpec { column: "k".into(), operator, value };
        let once = apply_filter(&ds, &spec);
        let twice = apply_filter(&once, &spec);
        prop_assert_eq!(&once, &twice);

        // kept rows stay in input order
        let kept = positions(&once);
        prop_assert!(kept.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(once.header(), ds.header());
    }

    #[test]
    fn sort_is_stable(
        keys in prop::collection::vec(-3i32..3, 0..60),
        descending in any::<bool>(),
    ) {
        let n = keys.len();
        let ds = dataset(keys.into_iter().map(Cell::from).collect(), vec![Cell::Null; n]);
        let direction = if descending {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        let sorted = apply_sort(
            &ds,
            &SortSpec {
                columns: vec!["k".into()],
                directions: vec![direction],
            },
        );

        let mut seen: Vec<f64> = positions(&sorted);
        seen.sort_by(|a, b| a.total_cmp(b));
        prop_assert_eq!(seen, (0..n).map(|i| i as f64).collect::<Vec<_>>());

        for pair in sorted.rows().windows(2) {
            let (a, b) = (pair[0][0].to_number(), pair[1][0].to_number());
            if descending {
                prop_assert!(a >= b);
            } else {
                prop_assert!(a <= b);
            }
            if a == b {
                prop_assert!(pair[0][2].to_number() < pair[1][2].to_number());
            }
        }
    }

    #[test]
    fn sort_by_two_keys_refines_the_first(
        pairs in prop::collection::vec((-2i32..2, -2i32..2), 0..40),
    ) {
        let (keys, values): (Vec<Cell>, Vec<Cell>) = pairs
            .iter()
            .map(|&(k, v)| (Cell::from(k), Cell::from(v)))
            .unzip();
        let ds = dataset(keys, values);
        let by_both = apply_sort(&ds, &SortSpec {
            columns: vec!["k".into(), "v".into()],
            directions: vec![],
        });
        let by_second_then_first = apply_sort(
            &apply_sort(&ds, &SortSpec { columns: vec!["v".into()], directions: vec![] }),
            &SortSpec { columns: vec!["k".into()], directions: vec![] },
        );
        prop_assert_eq!(by_both, by_second_then_first);
    }

    #[test]
    fn aggregate_has_one_row_per_group(
        cells in prop::collection::vec((any_cell(), any_cell()), 0..40),
    ) {
        let (keys, values): (Vec<Cell>, Vec<Cell>) = cells.into_iter().unzip();
        let groups: HashSet<String> = keys
            .iter()
            .map(|k| format!("{:?}", k))
            .collect();
        let numeric = values.iter().filter(|v| v.parse_float().is_some()).count();
        let ds = dataset(keys, values);

        let out = apply_aggregate(&ds, &AggregateSpec {
            group_by: "k".into(),
            metrics: vec![MetricSpec { column: "v".into(), function: AggregateFunction::Count }],
        });
        prop_assert_eq!(out.len(), groups.len());
        let counted: f64 = out.column(1).map(Cell::to_number).sum();
        prop_assert_eq!(counted, numeric as f64);
    }
}
