//! Visit-log ingestion for conversion experiments.
//!
//! Reads a CSV with one row per page visit (`user_id`, `timestamp`, `group`,
//! `landing_page`, `converted`). Cells are kept as optional values so the
//! cleaning stage can report and drop nulls; nothing here filters rows.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{AbscopeError, Result};

pub const USER_ID: &str = "user_id";
pub const TIMESTAMP: &str = "timestamp";
pub const GROUP: &str = "group";
pub const LANDING_PAGE: &str = "landing_page";
pub const CONVERTED: &str = "converted";

pub const REQUIRED_COLUMNS: [&str; 5] = [USER_ID, TIMESTAMP, GROUP, LANDING_PAGE, CONVERTED];

/// One CSV row. `None` means the cell was empty.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitRecord {
    /// 1-indexed CSV line, header included.
    pub line: u64,
    pub user_id: Option<String>,
    pub timestamp: Option<String>,
    pub group: Option<String>,
    pub landing_page: Option<String>,
    pub converted: Option<bool>,
}

impl VisitRecord {
    pub fn has_null(&self) -> bool {
        self.user_id.is_none()
            || self.timestamp.is_none()
            || self.group.is_none()
            || self.landing_page.is_none()
            || self.converted.is_none()
    }
}

/// Null counts per required column, highest first.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NullReport {
    pub total_rows: u64,
    pub per_column: IndexMap<String, u64>,
    pub rows_with_any_null: u64,
}

#[derive(Debug, Clone)]
pub struct VisitLog {
    pub records: Vec<VisitRecord>,
    pub null_report: NullReport,
}

pub fn read_visits(path: &Path) -> Result<VisitLog> {
    let file = std::fs::File::open(path)?;
    let log = read_visits_from_reader(std::io::BufReader::new(file))?;
    tracing::info!(
        path = %path.display(),
        rows = log.records.len(),
        rows_with_any_null = log.null_report.rows_with_any_null,
        "Visit log loaded"
    );
    Ok(log)
}

pub fn read_visits_from_reader<R: Read>(reader: R) -> Result<VisitLog> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let index = column_index(&headers)?;

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        records.push(parse_record(&record, &index, line)?);
    }

    let null_report = build_null_report(&records);
    Ok(VisitLog {
        records,
        null_report,
    })
}

/// Maps each required column to its position. Extra columns (such as a
/// leading unnamed index column) are ignored.
fn column_index(headers: &StringRecord) -> Result<HashMap<&'static str, usize>> {
    let mut index = HashMap::new();
    for name in REQUIRED_COLUMNS {
        let pos = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| AbscopeError::MissingColumn(name.to_string()))?;
        index.insert(name, pos);
    }
    Ok(index)
}

fn cell(record: &StringRecord, index: &HashMap<&'static str, usize>, name: &str) -> Option<String> {
    index
        .get(name)
        .and_then(|&pos| record.get(pos))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_record(
    record: &StringRecord,
    index: &HashMap<&'static str, usize>,
    line: u64,
) -> Result<VisitRecord> {
    let converted = match cell(record, index, CONVERTED) {
        None => None,
        Some(raw) => Some(parse_converted(&raw).ok_or_else(|| AbscopeError::Parse {
            line,
            column: CONVERTED.to_string(),
            message: format!("expected 0/1 or true/false, got '{}'", raw),
        })?),
    };

    Ok(VisitRecord {
        line,
        user_id: cell(record, index, USER_ID),
        timestamp: cell(record, index, TIMESTAMP),
        group: cell(record, index, GROUP),
        landing_page: cell(record, index, LANDING_PAGE),
        converted,
    })
}

fn parse_converted(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" => Some(true),
        "0" | "0.0" | "false" => Some(false),
        _ => None,
    }
}

fn build_null_report(records: &[VisitRecord]) -> NullReport {
    let mut counts: Vec<(String, u64)> = REQUIRED_COLUMNS
        .iter()
        .map(|c| (c.to_string(), 0u64))
        .collect();
    let mut rows_with_any_null = 0;

    for r in records {
        let nulls = [
            r.user_id.is_none(),
            r.timestamp.is_none(),
            r.group.is_none(),
            r.landing_page.is_none(),
            r.converted.is_none(),
        ];
        for (slot, is_null) in counts.iter_mut().zip(nulls) {
            if is_null {
                slot.1 += 1;
            }
        }
        if r.has_null() {
            rows_with_any_null += 1;
        }
    }

    // Stable sort keeps column order among ties
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    NullReport {
        total_rows: records.len() as u64,
        per_column: counts.into_iter().collect(),
        rows_with_any_null,
    }
}
