//! Column type inference by majority ratio.

use crate::value::{parse_date, Cell};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Share of non-null values that must agree before a column takes a type.
pub const INFERENCE_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    Date,
    Boolean,
    String,
    /// No non-null values to judge by.
    Unknown,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Number => "number",
            ColumnType::Date => "date",
            ColumnType::Boolean => "boolean",
            ColumnType::String => "string",
            ColumnType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_numeric(cell: &Cell) -> bool {
    match cell {
        Cell::Number(_) | Cell::String(_) => cell.to_number().is_finite(),
        Cell::Null | Cell::Bool(_) | Cell::Date(_) => false,
    }
}

fn is_date(cell: &Cell) -> bool {
    match cell {
        Cell::Date(_) => true,
        Cell::String(s) => parse_date(s).is_some(),
        Cell::Null | Cell::Bool(_) | Cell::Number(_) => false,
    }
}

fn is_boolean(cell: &Cell) -> bool {
    match cell {
        Cell::Bool(_) => true,
        Cell::String(s) => s == "true" || s == "false",
        _ => false,
    }
}

/// Classifies one column's data cells (header excluded).
///
/// Boolean wins over number, number over date, anything else is a string.
pub fn infer_column_type<'a, I>(cells: I) -> ColumnType
where
    I: IntoIterator<Item = &'a Cell>,
{
    let (mut total, mut numbers, mut dates, mut booleans) = (0usize, 0usize, 0usize, 0usize);
    for cell in cells.into_iter().filter(|c| !c.is_null_like()) {
        total += 1;
        numbers += usize::from(is_numeric(cell));
        dates += usize::from(is_date(cell));
        booleans += usize::from(is_boolean(cell));
    }
    if total == 0 {
        return ColumnType::Unknown;
    }

    let ratio = |count: usize| count as f64 / total as f64;
    if ratio(booleans) > INFERENCE_THRESHOLD {
        ColumnType::Boolean
    } else if ratio(numbers) > INFERENCE_THRESHOLD {
        ColumnType::Number
    } else if ratio(dates) > INFERENCE_THRESHOLD {
        ColumnType::Date
    } else {
        ColumnType::String
    }
}
