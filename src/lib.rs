//! Declarative tabular transformations with column type inference and profiling.
//!
//! A [`Pipeline`] of filter, sort, aggregate and pivot operations runs over a [`Dataset`]
//! (header row plus data rows of loosely typed [`Cell`]s). The result carries the transformed
//! data and per-column metadata: inferred type, null and distinct counts, numeric range and
//! mean or the most common value.
//!
//! ```
//! use serde_json::json;
//!
//! let result = sheetflow::transform(
//!     &json!([["name", "age"], ["A", 30], ["B", 25], ["A", 40]]),
//!     &json!([{
//!         "type": "aggregate",
//!         "parameters": {"groupBy": "name", "metrics": [{"column": "age", "function": "avg"}]}
//!     }]),
//! )
//! .unwrap();
//! assert_eq!(result.data.to_rows(), json!([["name", "age_avg"], ["A", 35], ["B", 25]]));
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod error_display;
pub mod export;
pub mod inference;
pub mod operation;
pub mod ops;
pub mod pipeline;
pub mod source;
pub mod store;
pub mod summary;
pub mod value;

pub use config::{AppConfig, ConfigManager};
pub use dataset::Dataset;
pub use error::{Error, Result};
pub use export::{export_dataset, ExportOptions, JsonLayout, ResultEnvelope};
pub use inference::{infer_column_type, ColumnType};
pub use operation::{
    AggregateFunction, AggregateSpec, AppliedTransformation, FilterOperator, FilterSpec,
    MetricSpec, Operation, Pipeline, PivotSpec, SortDirection, SortSpec,
};
pub use pipeline::{run_pipeline, transform, Preview, TransformResult};
pub use sheetflow_cli::{Args, CompressionFormat, FileFormat};
pub use source::{load_dataset, LoadOptions};
pub use store::{PipelineStore, SavedPipeline};
pub use summary::{summarize_column, summarize_dataset, ColumnMetadata, MetadataMap};
pub use value::Cell;

/// Application name used for the config directory and other app-specific paths
pub const APP_NAME: &str = "sheetflow";
