//! Writing results: transformed data files and JSON result envelopes.

use crate::dataset::Dataset;
use crate::operation::{AppliedTransformation, Pipeline};
use crate::pipeline::TransformResult;
use crate::summary::MetadataMap;
use crate::value::Cell;
use chrono::{DateTime, Utc};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use polars::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheetflow_cli::{CompressionFormat, FileFormat};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Shape of JSON data output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonLayout {
    /// Header row followed by data rows.
    #[default]
    Rows,
    /// One object per data row keyed by column name.
    Records,
}

impl JsonLayout {
    pub fn render(&self, dataset: &Dataset) -> Value {
        match self {
            JsonLayout::Rows => dataset.to_rows(),
            JsonLayout::Records => dataset.to_records(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: Option<FileFormat>,
    pub compression: Option<CompressionFormat>,
    pub delimiter: Option<u8>,
    pub include_header: bool,
    pub json_layout: JsonLayout,
    pub pretty: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: None,
            compression: None,
            delimiter: None,
            include_header: true,
            json_layout: JsonLayout::Rows,
            pretty: false,
        }
    }
}

/// Full result as printed on stdout or written with `--output x.json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope<'a> {
    pub data: Value,
    pub metadata: &'a MetadataMap,
    pub row_count: usize,
    pub column_count: usize,
    pub headers: &'a [String],
    pub transformations: Vec<AppliedTransformation>,
}

impl<'a> ResultEnvelope<'a> {
    pub fn new(
        result: &'a TransformResult,
        pipeline: &Pipeline,
        layout: JsonLayout,
        applied_at: DateTime<Utc>,
    ) -> Self {
        Self {
            data: layout.render(&result.data),
            metadata: &result.metadata,
            row_count: result.row_count,
            column_count: result.column_count,
            headers: &result.headers,
            transformations: pipeline.applied(applied_at),
        }
    }
}

/// Opens `path` for writing, wrapped in an encoder when `compression` is set.
pub fn create_writer(
    path: &Path,
    compression: Option<CompressionFormat>,
) -> Result<Box<dyn Write>> {
    let file =
        File::create(path).wrap_err_with(|| format!("Failed to create {}", path.display()))?;
    let writer: Box<dyn Write> = match compression {
        None => Box::new(BufWriter::new(file)),
        Some(CompressionFormat::Gzip) => Box::new(flate2::write::GzEncoder::new(
            file,
            flate2::Compression::default(),
        )),
        Some(CompressionFormat::Zstd) => Box::new(zstd::Encoder::new(file, 0)?.auto_finish()),
        Some(CompressionFormat::Bzip2) => Box::new(bzip2::write::BzEncoder::new(
            file,
            bzip2::Compression::default(),
        )),
        Some(CompressionFormat::Xz) => Box::new(xz2::write::XzEncoder::new(
            file, 6, // compression level
        )),
    };
    Ok(writer)
}

/// Serializes `value` as JSON into `writer`.
pub fn write_json<W: Write, T: Serialize + ?Sized>(
    mut writer: W,
    value: &T,
    pretty: bool,
) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, value)?;
    } else {
        serde_json::to_writer(&mut writer, value)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Column names made unique for the frame (`a`, `a` -> `a`, `a_1`).
fn unique_names(header: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    header
        .iter()
        .map(|name| {
            let mut candidate = name.clone();
            let mut n = 1;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{name}_{n}");
                n += 1;
            }
            if candidate != *name {
                log::warn!("duplicate column `{name}` written as `{candidate}`");
            }
            candidate
        })
        .collect()
}

/// Text frame of the dataset; every cell is stringified, nulls stay null.
pub fn frame_from_dataset(dataset: &Dataset) -> Result<DataFrame> {
    let columns: Vec<Column> = unique_names(dataset.header())
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let values: Vec<Option<String>> = dataset
                .column(index)
                .map(|cell| match cell {
                    Cell::Null => None,
                    other => Some(other.js_string()),
                })
                .collect();
            Column::new(name.as_str().into(), values)
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Writes `dataset` to `path`. Format and compression come from the options or the extension.
pub fn export_dataset(dataset: &Dataset, path: &Path, options: &ExportOptions) -> Result<()> {
    let compression = options
        .compression
        .or_else(|| CompressionFormat::from_extension(path));
    let plain = match compression {
        Some(_) => path.with_extension(""),
        None => path.to_path_buf(),
    };
    let format = options
        .format
        .or_else(|| FileFormat::from_path(&plain))
        .ok_or_else(|| {
            eyre!(
                "Cannot tell the output format of {}; use .csv, .tsv, .psv or .json",
                path.display()
            )
        })?;

    log::debug!("writing {} as {:?}", path.display(), format);
    match format {
        FileFormat::Csv | FileFormat::Tsv | FileFormat::Psv => {
            let mut df = frame_from_dataset(dataset)?;
            let delimiter = options
                .delimiter
                .or_else(|| format.default_delimiter())
                .unwrap_or(b',');
            let writer = create_writer(path, compression)?;
            CsvWriter::new(writer)
                .with_separator(delimiter)
                .include_header(options.include_header)
                .finish(&mut df)?;
        }
        FileFormat::Json => {
            let writer = create_writer(path, compression)?;
            write_json(writer, &options.json_layout.render(dataset), options.pretty)?;
        }
        FileFormat::Excel => {
            return Err(eyre!(
                "Writing Excel workbooks is not supported; choose a .csv or .json output"
            ));
        }
    }
    Ok(())
}

/// `<stem>_<op>_<op>.<ext>` next to the input, e.g. `sales_filter_sort.csv`.
pub fn default_output_path(input: &Path, pipeline: &Pipeline) -> PathBuf {
    let plain = match CompressionFormat::from_extension(input) {
        Some(_) => input.with_extension(""),
        None => input.to_path_buf(),
    };
    let stem = plain
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let ext = match FileFormat::from_path(&plain) {
        Some(FileFormat::Excel) | None => "csv",
        Some(format) => format.extension(),
    };
    let mut name = stem.to_string();
    for operation in pipeline.operations() {
        name.push('_');
        name.push_str(operation.kind());
    }
    let sanitized = Regex::new(r"[^A-Za-z0-9._-]+")
        .map(|re| re.replace_all(&name, "_").into_owned())
        .unwrap_or(name);
    plain.with_file_name(format!("{sanitized}.{ext}"))
}
