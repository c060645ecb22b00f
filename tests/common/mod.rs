#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Small people table used across the integration tests.
pub fn people() -> Value {
    json!([
        ["name", "age", "city", "joined"],
        ["Ann", 34, "Oslo", "2021-03-01"],
        ["Bob", 25, "Lima", "2020-11-15"],
        ["Cid", null, "Oslo", "2022-01-09"],
        ["Dee", 41, "Rome", "2019-07-30"],
        ["Eve", 25, "Lima", ""],
    ])
}

pub const PEOPLE_CSV: &str = "name,age,city\nAnn,34,Oslo\nBob,25,Lima\nCid,,Oslo\nDee,41,Rome\n";

pub fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

pub fn gzip(content: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(content).unwrap();
    encoder.finish().unwrap()
}

pub fn op(kind: &str, parameters: Value) -> Value {
    json!({ "type": kind, "parameters": parameters })
}
