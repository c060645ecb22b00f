//! Canonical header-plus-rows dataset and conversion from/to the two JSON encodings.

use crate::error::{Error, Result};
use crate::value::Cell;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use serde_json::{Map, Value};

/// Header plus data rows. Every data row has exactly `header.len()` cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    header: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Dataset {
    /// Builds a dataset, null-padding short rows.
    ///
    /// Fails when the header is empty or a row has more cells than the header.
    pub fn new(header: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        if header.is_empty() {
            return Err(Error::malformed("header row is empty"));
        }
        let width = header.len();
        let mut rows = rows;
        for (i, row) in rows.iter_mut().enumerate() {
            if row.len() > width {
                return Err(Error::malformed(format!(
                    "row {} has {} cells but the header has {}",
                    i + 1,
                    row.len(),
                    width
                )));
            }
            row.resize(width, Cell::Null);
        }
        Ok(Self { header, rows })
    }

    /// Assembles a dataset whose rows are already aligned with the header.
    pub(crate) fn from_parts(header: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == header.len()));
        Self { header, rows }
    }

    /// Accepts either `[[header...], [row...], ...]` or `[{col: value, ...}, ...]`.
    pub fn from_json(value: &Value) -> Result<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| Error::malformed("expected a JSON array of rows or records"))?;
        match items.first() {
            None => Err(Error::malformed("dataset is empty")),
            Some(Value::Array(_)) => Self::from_row_arrays(items),
            Some(Value::Object(_)) => Self::from_records(items),
            Some(_) => Err(Error::malformed(
                "expected rows (arrays) or records (objects), found a scalar at index 0",
            )),
        }
    }

    fn from_row_arrays(items: &[Value]) -> Result<Self> {
        let mut arrays = items.iter().enumerate().map(|(i, item)| {
            item.as_array().ok_or_else(|| {
                Error::malformed(format!(
                    "item {i} is not a row array; rows and records cannot be mixed"
                ))
            })
        });

        let header = match arrays.next() {
            Some(first) => first?
                .iter()
                .enumerate()
                .map(|(j, v)| {
                    Cell::from_json(v).map(|c| c.js_string()).ok_or_else(|| {
                        Error::malformed(format!("header cell {j} is not a scalar value"))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let rows = arrays
            .enumerate()
            .map(|(i, row)| {
                row?.iter()
                    .enumerate()
                    .map(|(j, v)| {
                        Cell::from_json(v).ok_or_else(|| {
                            Error::malformed(format!(
                                "row {}, column {j}: nested arrays and objects are not valid cells",
                                i + 1
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(header, rows)
    }

    fn from_records(items: &[Value]) -> Result<Self> {
        let mut records = items.iter().enumerate().map(|(i, item)| {
            item.as_object().ok_or_else(|| {
                Error::malformed(format!(
                    "item {i} is not a record object; rows and records cannot be mixed"
                ))
            })
        });

        let first = match records.next() {
            Some(first) => first?,
            None => return Err(Error::malformed("dataset is empty")),
        };
        let header: Vec<String> = first.keys().cloned().collect();

        let to_row = |i: usize, record: &Map<String, Value>| {
            header
                .iter()
                .map(|key| match record.get(key) {
                    None => Ok(Cell::Null),
                    Some(v) => Cell::from_json(v).ok_or_else(|| {
                        Error::malformed(format!(
                            "record {i}, key `{key}`: nested arrays and objects are not valid cells"
                        ))
                    }),
                })
                .collect::<Result<Vec<_>>>()
        };

        let mut rows = vec![to_row(0, first)?];
        for (i, record) in records.enumerate() {
            rows.push(to_row(i + 1, record?)?);
        }

        Self::new(header, rows)
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<Cell>> {
        self.rows
    }

    /// Number of data rows (header excluded).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows including the header.
    pub fn row_count(&self) -> usize {
        self.rows.len() + 1
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    /// Position of the first column named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// Same header, new rows.
    pub fn with_rows(&self, rows: Vec<Vec<Cell>>) -> Self {
        Self::from_parts(self.header.clone(), rows)
    }

    /// Array-of-arrays encoding, header first.
    pub fn to_rows(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Array-of-objects encoding. With duplicate header names the rightmost cell wins.
    pub fn to_records(&self) -> Value {
        Value::Array(
            self.rows
                .iter()
                .map(|row| {
                    let record: Map<String, Value> = self
                        .header
                        .iter()
                        .zip(row)
                        .map(|(h, c)| (h.clone(), c.to_json()))
                        .collect();
                    Value::Object(record)
                })
                .collect(),
        )
    }

    /// First `limit` rows of the canonical encoding, header counted as a row.
    pub fn head_rows(&self, limit: usize) -> Value {
        if limit == 0 {
            return Value::Array(Vec::new());
        }
        let mut out = Vec::with_capacity(limit.min(self.row_count()));
        out.push(Value::Array(
            self.header.iter().cloned().map(Value::String).collect(),
        ));
        out.extend(
            self.rows
                .iter()
                .take(limit - 1)
                .map(|row| Value::Array(row.iter().map(Cell::to_json).collect())),
        );
        Value::Array(out)
    }
}

impl Serialize for Dataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.row_count()))?;
        seq.serialize_element(&self.header)?;
        for row in &self.rows {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}
