//! Reading data files into a [`Dataset`].
//!
//! Delimited text goes through the polars CSV reader, JSON through the dataset adapter and
//! workbooks through calamine. Compressed inputs are decompressed into memory first.

use crate::dataset::Dataset;
use crate::value::Cell;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use polars::prelude::*;
use sheetflow_cli::{CompressionFormat, FileFormat};
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

/// How to read a data file. `None` fields fall back to detection from the path.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub format: Option<FileFormat>,
    pub compression: Option<CompressionFormat>,
    pub delimiter: Option<u8>,
    /// Defaults to true.
    pub has_header: Option<bool>,
    /// Let the CSV reader type columns instead of reading every cell as text.
    pub infer_types: bool,
    /// Excel sheet: 0-based index or name. First sheet when unset.
    pub excel_sheet: Option<String>,
}

impl LoadOptions {
    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_has_header(mut self, has_header: bool) -> Self {
        self.has_header = Some(has_header);
        self
    }

    pub fn with_infer_types(mut self, infer_types: bool) -> Self {
        self.infer_types = infer_types;
        self
    }

    pub fn with_excel_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.excel_sheet = Some(sheet.into());
        self
    }
}

/// Path with a trailing compression extension removed (`data.csv.gz` -> `data.csv`).
fn strip_compression_extension(path: &Path) -> PathBuf {
    match CompressionFormat::from_extension(path) {
        Some(_) => path.with_extension(""),
        None => path.to_path_buf(),
    }
}

/// Resolves format and compression for `path`, explicit options first.
pub fn detect_format(
    path: &Path,
    options: &LoadOptions,
) -> Result<(FileFormat, Option<CompressionFormat>)> {
    let compression = options
        .compression
        .or_else(|| CompressionFormat::from_extension(path));
    let format = match options.format {
        Some(format) => format,
        None => FileFormat::from_path(&strip_compression_extension(path)).ok_or_else(|| {
            eyre!(
                "Cannot detect the format of {}; pass --format (csv, tsv, psv, json, excel)",
                path.display()
            )
        })?,
    };
    Ok((format, compression))
}

/// Reads the whole file, decompressing if needed.
fn read_bytes(path: &Path, compression: Option<CompressionFormat>) -> Result<Vec<u8>> {
    let file = File::open(path)
        .wrap_err_with(|| format!("Failed to open {}", path.display()))?;
    let mut reader: Box<dyn Read> = match compression {
        None => Box::new(BufReader::new(file)),
        Some(CompressionFormat::Gzip) => {
            Box::new(flate2::read::GzDecoder::new(BufReader::new(file)))
        }
        Some(CompressionFormat::Zstd) => Box::new(zstd::Decoder::new(BufReader::new(file))?),
        Some(CompressionFormat::Bzip2) => {
            Box::new(bzip2::read::BzDecoder::new(BufReader::new(file)))
        }
        Some(CompressionFormat::Xz) => Box::new(xz2::read::XzDecoder::new(BufReader::new(file))),
    };
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    Ok(bytes)
}

/// Loads `path` into a dataset.
pub fn load_dataset(path: &Path, options: &LoadOptions) -> Result<Dataset> {
    let (format, compression) = detect_format(path, options)?;
    log::debug!(
        "loading {} as {:?} (compression: {:?})",
        path.display(),
        format,
        compression
    );
    let bytes = read_bytes(path, compression)?;
    let dataset = match format {
        FileFormat::Csv | FileFormat::Tsv | FileFormat::Psv => {
            let delimiter = options
                .delimiter
                .or_else(|| format.default_delimiter())
                .unwrap_or(b',');
            dataset_from_delimited(bytes, delimiter, options)?
        }
        FileFormat::Json => dataset_from_json_bytes(&bytes)?,
        FileFormat::Excel => dataset_from_workbook(bytes, options.excel_sheet.as_deref())?,
    };
    log::debug!(
        "loaded {} data rows, {} columns",
        dataset.len(),
        dataset.column_count()
    );
    Ok(dataset)
}

fn dataset_from_delimited(bytes: Vec<u8>, delimiter: u8, options: &LoadOptions) -> Result<Dataset> {
    let mut read_options = CsvReadOptions::default();
    read_options.has_header = options.has_header.unwrap_or(true);
    // Zero-length inference reads every column as text
    read_options.infer_schema_length = if options.infer_types { Some(100) } else { Some(0) };
    let try_parse_dates = options.infer_types;
    read_options = read_options.map_parse_options(|opts| {
        opts.with_separator(delimiter)
            .with_try_parse_dates(try_parse_dates)
    });
    let df = CsvReader::new(Cursor::new(bytes))
        .with_options(read_options)
        .finish()?;
    dataset_from_frame(&df)
}

/// Converts an eager frame cell by cell.
pub fn dataset_from_frame(df: &DataFrame) -> Result<Dataset> {
    let header: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let columns = df.get_columns();
    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let row = columns
            .iter()
            .map(|column| column.get(i).map(cell_from_any))
            .collect::<PolarsResult<Vec<_>>>()?;
        rows.push(row);
    }
    Ok(Dataset::new(header, rows)?)
}

fn cell_from_any(value: AnyValue<'_>) -> Cell {
    match value {
        AnyValue::Null => Cell::Null,
        AnyValue::Boolean(b) => Cell::Bool(b),
        AnyValue::String(s) => Cell::String(s.to_string()),
        AnyValue::StringOwned(s) => Cell::String(s.to_string()),
        AnyValue::Int8(v) => Cell::Number(f64::from(v)),
        AnyValue::Int16(v) => Cell::Number(f64::from(v)),
        AnyValue::Int32(v) => Cell::Number(f64::from(v)),
        AnyValue::Int64(v) => Cell::Number(v as f64),
        AnyValue::UInt8(v) => Cell::Number(f64::from(v)),
        AnyValue::UInt16(v) => Cell::Number(f64::from(v)),
        AnyValue::UInt32(v) => Cell::Number(f64::from(v)),
        AnyValue::UInt64(v) => Cell::Number(v as f64),
        AnyValue::Float32(v) => Cell::Number(f64::from(v)),
        AnyValue::Float64(v) => Cell::Number(v),
        // Temporal values keep their display form; inference recognizes them as dates
        other => Cell::String(other.to_string()),
    }
}

fn dataset_from_json_bytes(bytes: &[u8]) -> Result<Dataset> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    Ok(Dataset::from_json(&value)?)
}

fn dataset_from_workbook(bytes: Vec<u8>, sheet: Option<&str>) -> Result<Dataset> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| eyre!("Excel: {}", e))?;
    if workbook.sheet_names().is_empty() {
        return Err(eyre!("Excel file has no worksheets"));
    }
    let range = match sheet {
        Some(sel) => match sel.parse::<usize>() {
            Ok(idx) => workbook
                .worksheet_range_at(idx)
                .ok_or_else(|| eyre!("Excel: no sheet at index {}", idx))?
                .map_err(|e| eyre!("Excel: {}", e))?,
            Err(_) => workbook
                .worksheet_range(sel)
                .map_err(|e| eyre!("Excel: {}", e))?,
        },
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| eyre!("Excel: no first sheet"))?
            .map_err(|e| eyre!("Excel: {}", e))?,
    };

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or_else(|| eyre!("Excel sheet is empty"))?
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let name = calamine::DataType::as_string(c).unwrap_or_else(|| c.to_string());
            if name.is_empty() {
                format!("column_{}", i + 1)
            } else {
                name
            }
        })
        .collect();
    let data = rows
        .map(|row| row.iter().map(cell_from_excel).collect())
        .collect();
    Ok(Dataset::new(header, data)?)
}

fn cell_from_excel(data: &Data) -> Cell {
    use calamine::DataType;
    match data {
        Data::Empty | Data::Error(_) => Cell::Null,
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Float(v) => Cell::Number(*v),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) => Cell::String(s.clone()),
        Data::DateTime(_) | Data::DateTimeIso(_) => data
            .as_datetime()
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::String(data.to_string())),
        #[allow(unreachable_patterns)]
        _ => Cell::String(data.to_string()),
    }
}
