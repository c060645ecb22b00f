//! Pipeline operations and their wire format.
//!
//! On the wire every operation is `{ "type": <name>, "parameters": { ... } }`. Decoding is done
//! up front for the whole pipeline so a bad step fails before any row is touched.

use crate::error::{Error, Result};
use crate::value::Cell;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    NotContains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl AggregateFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Count => "count",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub column: String,
    pub operator: FilterOperator,
    pub value: Cell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    pub columns: Vec<String>,
    /// Parallel to `columns`; a missing entry sorts ascending.
    #[serde(default)]
    pub directions: Vec<SortDirection>,
}

impl SortSpec {
    pub fn direction(&self, key: usize) -> SortDirection {
        self.directions.get(key).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub column: String,
    pub function: AggregateFunction,
}

impl MetricSpec {
    /// Output column name, e.g. `age_avg`.
    pub fn output_name(&self) -> String {
        format!("{}_{}", self.column, self.function.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSpec {
    pub group_by: String,
    pub metrics: Vec<MetricSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotSpec {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub values: Vec<String>,
    pub aggregation: AggregateFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "parameters", rename_all = "lowercase")]
pub enum Operation {
    Filter(FilterSpec),
    Sort(SortSpec),
    Aggregate(AggregateSpec),
    Pivot(PivotSpec),
    /// Accepted for compatibility with chart-producing clients; leaves the data untouched.
    Chart(Value),
}

impl Operation {
    /// Decodes and validates the operation at `index` of a pipeline.
    pub fn from_wire(index: usize, value: &Value) -> Result<Self> {
        Operation::deserialize(value).map_err(|e| Error::transform(index, e.to_string()))
    }

    pub fn to_wire(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Filter(_) => "filter",
            Operation::Sort(_) => "sort",
            Operation::Aggregate(_) => "aggregate",
            Operation::Pivot(_) => "pivot",
            Operation::Chart(_) => "chart",
        }
    }

    /// Wire form of just the parameters.
    pub fn parameters(&self) -> Value {
        match self.to_wire() {
            Value::Object(mut map) => map.remove("parameters").unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }
}

/// One executed operation, as recorded next to an exported result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedTransformation {
    #[serde(rename = "type")]
    pub kind: String,
    pub parameters: Value,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline {
    operations: Vec<Operation>,
}

impl Pipeline {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    /// Decodes every step; the first invalid one fails the whole pipeline.
    pub fn from_json(value: &Value) -> Result<Self> {
        let steps = value
            .as_array()
            .ok_or_else(|| Error::malformed("pipeline must be a JSON array of operations"))?;
        let operations = steps
            .iter()
            .enumerate()
            .map(|(index, step)| Operation::from_wire(index, step))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { operations })
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn to_wire(&self) -> Value {
        Value::Array(self.operations.iter().map(Operation::to_wire).collect())
    }

    /// Records every step as applied at `at`.
    pub fn applied(&self, at: DateTime<Utc>) -> Vec<AppliedTransformation> {
        self.operations
            .iter()
            .map(|op| AppliedTransformation {
                kind: op.kind().to_string(),
                parameters: op.parameters(),
                applied_at: at,
            })
            .collect()
    }
}

impl FromStr for Pipeline {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)
            .map_err(|e| Error::malformed(format!("pipeline is not valid JSON: {e}")))?;
        Self::from_json(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_decode_all_kinds() {
        let pipeline = Pipeline::from_json(&json!([
            {"type": "filter", "parameters": {"column": "age", "operator": "greaterThan", "value": 25}},
            {"type": "sort", "parameters": {"columns": ["age", "name"], "directions": ["desc"]}},
            {"type": "aggregate", "parameters": {"groupBy": "name", "metrics": [{"column": "age", "function": "avg"}]}},
            {"type": "pivot", "parameters": {"rows": ["r"], "columns": ["c"], "values": ["v"], "aggregation": "sum"}},
            {"type": "chart", "parameters": {"kind": "bar"}},
        ]))
        .unwrap();

        let kinds: Vec<_> = pipeline.operations().iter().map(Operation::kind).collect();
        assert_eq!(kinds, vec!["filter", "sort", "aggregate", "pivot", "chart"]);

        match &pipeline.operations()[0] {
            Operation::Filter(spec) => {
                assert_eq!(spec.operator, FilterOperator::GreaterThan);
                assert_eq!(spec.value, Cell::from(25));
            }
            other => panic!("expected filter, got {other:?}"),
        }
        match &pipeline.operations()[1] {
            Operation::Sort(spec) => {
                assert_eq!(spec.direction(0), SortDirection::Desc);
                assert_eq!(spec.direction(1), SortDirection::Asc);
            }
            other => panic!("expected sort, got {other:?}"),
        }
        match &pipeline.operations()[2] {
            Operation::Aggregate(spec) => {
                assert_eq!(spec.group_by, "name");
                assert_eq!(spec.metrics[0].output_name(), "age_avg");
            }
            other => panic!("expected aggregate, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_reports_index() {
        let err = Pipeline::from_json(&json!([
            {"type": "sort", "parameters": {"columns": ["a"]}},
            {"type": "merge", "parameters": {}},
        ]))
        .unwrap_err();
        assert_eq!(err.operation_index(), Some(1));
        assert!(err.to_string().contains("merge"));
    }

    #[test]
    fn test_missing_parameter() {
        let err = Pipeline::from_json(&json!([
            {"type": "aggregate", "parameters": {"metrics": []}},
        ]))
        .unwrap_err();
        assert_eq!(err.operation_index(), Some(0));
        assert!(err.to_string().contains("groupBy"));
    }

    #[test]
    fn test_ill_typed_parameters() {
        for step in [
            json!({"type": "filter", "parameters": {"column": "a", "operator": "like", "value": 1}}),
            json!({"type": "sort", "parameters": {"columns": "a"}}),
            json!({"type": "pivot", "parameters": {"rows": [], "columns": [], "values": [], "aggregation": "median"}}),
            json!({"type": "filter", "parameters": {"column": "a", "operator": "equals", "value": [1]}}),
            json!({"parameters": {}}),
            json!("filter"),
        ] {
            let err = Pipeline::from_json(&json!([step])).unwrap_err();
            assert_eq!(err.operation_index(), Some(0), "step {step}");
        }
    }

    #[test]
    fn test_non_array_pipeline_is_malformed() {
        let err = Pipeline::from_json(&json!({"type": "sort"})).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
        assert!(matches!(
            "not json".parse::<Pipeline>(),
            Err(Error::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_wire_round_trip() {
        let wire = json!([
            {"type": "filter", "parameters": {"column": "name", "operator": "notContains", "value": "x"}},
            {"type": "aggregate", "parameters": {"groupBy": "g", "metrics": [{"column": "v", "function": "count"}]}},
        ]);
        let pipeline = Pipeline::from_json(&wire).unwrap();
        assert_eq!(pipeline.to_wire(), wire);
        assert_eq!(serde_json::to_value(&pipeline).unwrap(), wire);
    }

    #[test]
    fn test_applied_records() {
        let pipeline = Pipeline::from_json(&json!([
            {"type": "sort", "parameters": {"columns": ["a"], "directions": ["asc"]}},
        ]))
        .unwrap();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let applied = pipeline.applied(at);
        assert_eq!(
            serde_json::to_value(&applied).unwrap(),
            json!([{
                "type": "sort",
                "parameters": {"columns": ["a"], "directions": ["asc"]},
                "appliedAt": "2024-05-01T12:00:00Z"
            }])
        );
    }
}
