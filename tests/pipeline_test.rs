mod common;

use common::{op, people};
use serde_json::json;
use sheetflow::{transform, Cell, ColumnType, Error};

#[test]
fn test_group_average() {
    let result = transform(
        &json!([["name", "age"], ["A", 30], ["B", 25], ["A", 40]]),
        &json!([op(
            "aggregate",
            json!({"groupBy": "name", "metrics": [{"column": "age", "function": "avg"}]})
        )]),
    )
    .unwrap();

    assert_eq!(
        result.data.to_rows(),
        json!([["name", "age_avg"], ["A", 35], ["B", 25]])
    );
    assert_eq!(result.row_count, 3);
    assert_eq!(result.column_count, 2);
    assert_eq!(result.headers, vec!["name", "age_avg"]);

    let age = result.metadata.get("age_avg").unwrap();
    assert_eq!(age.column_type, ColumnType::Number);
    let numeric = age.numeric.as_ref().unwrap();
    assert_eq!((numeric.min, numeric.max, numeric.mean), (25.0, 35.0, 30.0));
}

#[test]
fn test_filter_then_sort() {
    let result = transform(
        &people(),
        &json!([
            op("filter", json!({"column": "city", "operator": "notEquals", "value": "Rome"})),
            op("sort", json!({"columns": ["age", "name"], "directions": ["desc", "asc"]})),
        ]),
    )
    .unwrap();

    let names: Vec<String> = result
        .data
        .column(0)
        .map(|cell| cell.js_string())
        .collect();
    // null compares as zero, so it sorts below every age
    assert_eq!(names, vec!["Ann", "Bob", "Eve", "Cid"]);
}

#[test]
fn test_numeric_filter_coerces_strings() {
    let result = transform(
        &json!([["id", "score"], ["a", "12"], ["b", "7"], ["c", "x"]]),
        &json!([op("filter", json!({"column": "score", "operator": "greaterThan", "value": 8}))]),
    )
    .unwrap();
    assert_eq!(result.data.to_rows(), json!([["id", "score"], ["a", "12"]]));
}

#[test]
fn test_pivot_sales() {
    let data = json!([
        ["region", "quarter", "sales"],
        ["N", "Q1", 10],
        ["N", "Q2", 5],
        ["S", "Q1", 7],
        ["N", "Q1", 3],
    ]);
    let result = transform(
        &data,
        &json!([op(
            "pivot",
            json!({"rows": ["region"], "columns": ["quarter"], "values": ["sales"], "aggregation": "sum"})
        )]),
    )
    .unwrap();
    assert_eq!(
        result.data.to_rows(),
        json!([
            ["region", "Q1_sales", "Q2_sales"],
            ["N", 13, 5],
            ["S", 7, null],
        ])
    );
}

#[test]
fn test_metadata_for_people() {
    let result = transform(&people(), &json!([])).unwrap();
    let names: Vec<&str> = result.metadata.names().collect();
    assert_eq!(names, vec!["name", "age", "city", "joined"]);

    let age = result.metadata.get("age").unwrap();
    assert_eq!(age.column_type, ColumnType::Number);
    assert_eq!(age.null_count, 1);
    assert_eq!(age.distinct_count, 3);

    let city = result.metadata.get("city").unwrap();
    assert_eq!(city.column_type, ColumnType::String);
    assert_eq!(city.most_common.as_ref().map(|c| c.js_string()), Some("Oslo".to_string()));

    let joined = result.metadata.get("joined").unwrap();
    assert_eq!(joined.column_type, ColumnType::Date);
    assert_eq!(joined.null_count, 1);
}

#[test]
fn test_most_common_tie_in_result() {
    let result = transform(&json!([["k"], ["b"], ["a"], ["a"], ["b"], ["c"]]), &json!([])).unwrap();
    let k = result.metadata.get("k").unwrap();
    assert_eq!(k.most_common, Some(Cell::from("a")));
}

#[test]
fn test_result_serialization() {
    let result = transform(&json!([["k"], ["x"], ["x"]]), &json!([])).unwrap();
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({
            "data": [["k"], ["x"], ["x"]],
            "metadata": {
                "k": {"type": "string", "nullCount": 0, "distinctCount": 1, "mostCommon": "x"}
            },
            "rowCount": 3,
            "columnCount": 1,
            "headers": ["k"]
        })
    );
}

#[test]
fn test_invalid_operation_reports_index() {
    let err = transform(
        &people(),
        &json!([
            op("sort", json!({"columns": ["age"]})),
            op("explode", json!({})),
        ]),
    )
    .unwrap_err();
    assert_eq!(err.operation_index(), Some(1));
    assert!(matches!(err, Error::Transform { .. }));
}

#[test]
fn test_rows_must_be_arrays() {
    let err = transform(&json!([["a"], 5]), &json!([])).unwrap_err();
    assert!(matches!(err, Error::MalformedInput { .. }));
}
