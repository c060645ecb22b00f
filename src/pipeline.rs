//! Runs a decoded pipeline over a dataset and profiles the outcome.

use crate::dataset::Dataset;
use crate::error::Result;
use crate::operation::{Operation, Pipeline};
use crate::ops::{apply_aggregate, apply_filter, apply_pivot, apply_sort};
use crate::summary::{summarize_dataset, MetadataMap};
use serde::Serialize;
use serde_json::Value;

/// Default number of rows (header included) in a preview.
pub const DEFAULT_PREVIEW_ROWS: usize = 100;

/// Transformed dataset plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResult {
    pub data: Dataset,
    pub metadata: MetadataMap,
    /// Rows including the header.
    pub row_count: usize,
    pub column_count: usize,
    pub headers: Vec<String>,
}

/// Truncated view of a result for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    pub preview: Value,
    pub metadata: MetadataMap,
    pub total_rows: usize,
    pub preview_rows: usize,
}

impl TransformResult {
    pub fn from_dataset(data: Dataset) -> Self {
        let metadata = summarize_dataset(&data);
        Self {
            row_count: data.row_count(),
            column_count: data.column_count(),
            headers: data.header().to_vec(),
            metadata,
            data,
        }
    }

    /// First `limit` rows of the output, header counted.
    pub fn preview(&self, limit: usize) -> Preview {
        let preview = self.data.head_rows(limit);
        let preview_rows = preview.as_array().map_or(0, Vec::len);
        Preview {
            preview,
            metadata: self.metadata.clone(),
            total_rows: self.row_count,
            preview_rows,
        }
    }
}

fn apply(dataset: Dataset, operation: &Operation) -> Dataset {
    match operation {
        Operation::Filter(spec) => apply_filter(&dataset, spec),
        Operation::Sort(spec) => apply_sort(&dataset, spec),
        Operation::Aggregate(spec) => apply_aggregate(&dataset, spec),
        Operation::Pivot(spec) => apply_pivot(&dataset, spec),
        Operation::Chart(_) => dataset,
    }
}

/// Applies every operation in order, then summarizes the final dataset.
pub fn run_pipeline(dataset: Dataset, pipeline: &Pipeline) -> TransformResult {
    let mut current = dataset;
    for (index, operation) in pipeline.operations().iter().enumerate() {
        let before = current.len();
        current = apply(current, operation);
        log::debug!(
            "step {index} ({}): {before} -> {} data rows, {} columns",
            operation.kind(),
            current.len(),
            current.column_count()
        );
    }
    TransformResult::from_dataset(current)
}

/// Wire-level entry point: normalizes `data`, decodes `pipeline`, runs it.
///
/// Nothing runs unless both inputs are valid.
pub fn transform(data: &Value, pipeline: &Value) -> Result<TransformResult> {
    let dataset = Dataset::from_json(data)?;
    let pipeline = Pipeline::from_json(pipeline)?;
    Ok(run_pipeline(dataset, &pipeline))
}
