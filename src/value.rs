//! Cell values and the loose coercion rules the executors compare them with.
//!
//! Spreadsheet and JSON payloads arrive untyped: the same column can hold `30`, `"30"` and
//! `"n/a"`. Rather than forcing a schema up front, every cell keeps its raw kind and the
//! operations decide how to coerce:
//!
//! - [`Cell::loose_eq`] is type-coercing equality (`"30" == 30`, `true == 1`).
//! - [`Cell::js_lt`] is the native ordering: two strings compare lexicographically by UTF-16
//!   code units, anything else compares numerically and NaN compares false both ways.
//! - [`Cell::to_number`] is whole-string numeric coercion (empty string is 0, `"12abc"` is NaN).
//! - [`Cell::parse_float`] takes the longest numeric prefix (`"12abc"` is 12) and rejects
//!   null, booleans and dates.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::{self, Deserialize, Deserializer};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Largest integer an f64 holds exactly; integral numbers up to this serialize without a fraction.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Calendar date-time, interpreted as UTC.
    Date(NaiveDateTime),
}

/// Identity used for grouping and distinct counting: `"1"` and `1` differ, NaN equals NaN,
/// `-0` equals `0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum CellKey {
    Null,
    Bool(bool),
    Number(u64),
    String(String),
    Date(NaiveDateTime),
}

impl Cell {
    /// Null and the empty string count as missing for inference and summaries.
    pub fn is_null_like(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Converts a scalar JSON value. Arrays and objects are not cells.
    pub fn from_json(value: &Value) -> Option<Cell> {
        match value {
            Value::Null => Some(Cell::Null),
            Value::Bool(b) => Some(Cell::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Cell::Number),
            Value::String(s) => Some(Cell::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Whole-value numeric coercion. Dates become epoch milliseconds.
    pub fn to_number(&self) -> f64 {
        match self {
            Cell::Null => 0.0,
            Cell::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Cell::Number(n) => *n,
            Cell::String(s) => string_to_number(s),
            Cell::Date(d) => d.and_utc().timestamp_millis() as f64,
        }
    }

    /// Leading-prefix numeric parse. `None` means the cell is not numeric and should be
    /// dropped from a statistic.
    pub fn parse_float(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if !n.is_nan() => Some(*n),
            Cell::String(s) => parse_float_prefix(s),
            _ => None,
        }
    }

    /// String conversion used by `contains` and display.
    pub fn js_string(&self) -> String {
        match self {
            Cell::Null => "null".to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Number(n) => format_number(*n),
            Cell::String(s) => s.clone(),
            Cell::Date(d) => format_iso(d),
        }
    }

    /// String conversion used when cells are joined into a composite key (null joins as "").
    pub fn key_string(&self) -> String {
        match self {
            Cell::Null => String::new(),
            other => other.js_string(),
        }
    }

    /// Type-coercing equality.
    pub fn loose_eq(&self, other: &Cell) -> bool {
        match (self, other) {
            (Cell::Null, Cell::Null) => true,
            (Cell::Null, _) | (_, Cell::Null) => false,
            (Cell::String(a), Cell::String(b)) => a == b,
            (Cell::Number(a), Cell::Number(b)) => a == b,
            (Cell::Bool(a), Cell::Bool(b)) => a == b,
            (Cell::Date(a), Cell::Date(b)) => a == b,
            // Dates reduce to their string form against anything but another date
            (Cell::Date(d), rhs) => Cell::String(format_iso(d)).loose_eq(rhs),
            (lhs, Cell::Date(d)) => lhs.loose_eq(&Cell::String(format_iso(d))),
            // Remaining pairs mix numbers, strings and booleans: all compare numerically
            (lhs, rhs) => lhs.to_number() == rhs.to_number(),
        }
    }

    /// Native less-than on raw values.
    pub fn js_lt(&self, other: &Cell) -> bool {
        if let (Cell::String(a), Cell::String(b)) = (self, other) {
            return a.encode_utf16().lt(b.encode_utf16());
        }
        self.to_number() < other.to_number()
    }

    pub(crate) fn key(&self) -> CellKey {
        match self {
            Cell::Null => CellKey::Null,
            Cell::Bool(b) => CellKey::Bool(*b),
            Cell::Number(n) => {
                let normalized = if n.is_nan() {
                    f64::NAN
                } else if *n == 0.0 {
                    0.0
                } else {
                    *n
                };
                CellKey::Number(normalized.to_bits())
            }
            Cell::String(s) => CellKey::String(s.clone()),
            Cell::Date(d) => CellKey::Date(*d),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.js_string())
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::String(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::String(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<i32> for Cell {
    fn from(n: i32) -> Self {
        Cell::Number(f64::from(n))
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Bool(b)
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(d: NaiveDateTime) -> Self {
        Cell::Date(d)
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Null => serializer.serialize_none(),
            Cell::Bool(b) => serializer.serialize_bool(*b),
            Cell::Number(n) if !n.is_finite() => serializer.serialize_none(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                serializer.serialize_i64(*n as i64)
            }
            Cell::Number(n) => serializer.serialize_f64(*n),
            Cell::String(s) => serializer.serialize_str(s),
            Cell::Date(d) => serializer.serialize_str(&format_iso(d)),
        }
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Cell::from_json(&value).ok_or_else(|| {
            de::Error::custom("expected a scalar value (string, number, boolean, or null)")
        })
    }
}

/// ISO 8601 with millisecond precision and a `Z` suffix.
pub fn format_iso(d: &NaiveDateTime) -> String {
    d.and_utc().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Integral values print without a fraction (`35`, not `35.0`).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

/// Length of the longest prefix of `s` that is a decimal literal: optional sign, digits with an
/// optional fraction (at least one digit overall), optional exponent.
fn scan_decimal(s: &str) -> usize {
    let b = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut i = 0;
    if matches!(b.first(), Some(b'+' | b'-')) {
        i = 1;
    }
    let int_end = digits_from(i);
    let mut digits = int_end - i;
    i = int_end;
    if b.get(i) == Some(&b'.') {
        let frac_end = digits_from(i + 1);
        if digits > 0 || frac_end > i + 1 {
            digits += frac_end - (i + 1);
            i = frac_end;
        }
    }
    if digits == 0 {
        return 0;
    }
    if matches!(b.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(b.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_end = digits_from(j);
        if exp_end > j {
            i = exp_end;
        }
    }
    i
}

fn parse_float_prefix(s: &str) -> Option<f64> {
    let t = s.trim_start();
    let unsigned = t.strip_prefix(['+', '-']).unwrap_or(t);
    if unsigned.starts_with("Infinity") {
        return Some(if t.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }
    let len = scan_decimal(t);
    if len == 0 {
        return None;
    }
    t[..len].parse::<f64>().ok()
}

fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    for (prefixes, radix) in [(["0x", "0X"], 16), (["0o", "0O"], 8), (["0b", "0B"], 2)] {
        if let Some(digits) = prefixes.iter().find_map(|p| t.strip_prefix(p)) {
            return u64::from_str_radix(digits, radix)
                .map(|v| v as f64)
                .unwrap_or(f64::NAN);
        }
    }
    if scan_decimal(t) == t.len() {
        t.parse::<f64>().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%b %d %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%a %b %d %Y",
];

/// Lenient calendar date parse for type inference.
///
/// Accepts ISO 8601 dates and date-times (with or without offset), RFC 2822, slash-separated
/// dates, month-name dates, year-month, and bare four-digit years.
pub fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    let bytes = s.as_bytes();
    if bytes.len() == 7 && bytes[4] == b'-' {
        if let Ok(d) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    if bytes.len() == 4 && bytes.iter().all(u8::is_ascii_digit) {
        let year: i32 = s.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1).map(|d| d.and_time(NaiveTime::MIN));
    }
    None
}
