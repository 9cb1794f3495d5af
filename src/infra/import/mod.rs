pub mod csv;
pub mod xlsx;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{types::Value, Connection};
use tracing::warn;

use crate::infra::sqlite::queries::insert_rows;
use crate::infra::sqlite::schema::{table_columns, TableColumn};

/// Columns stored as `YYYY-MM-DD HH:MM:SS` text.
const DATETIME_COLUMNS: &[&str] = &["DataEsito"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResult {
    pub table: String,
    pub row_count: i64,
    pub skipped_headers: Vec<String>,
}

/// Writes tabular data into `table`, matching headers to physical columns
/// case-insensitively. Unknown headers are skipped.
pub fn load_into_table(
    conn: &mut Connection,
    table: &str,
    data: &TabularData,
    replace: bool,
) -> Result<ImportResult> {
    let physical = table_columns(conn, table)?;

    let mut targets: Vec<(usize, &TableColumn)> = Vec::new();
    let mut skipped_headers = Vec::new();
    for (idx, header) in data.columns.iter().enumerate() {
        let header = header.trim();
        match physical
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(header))
        {
            Some(column) if !targets.iter().any(|(_, t)| t.name == column.name) => {
                targets.push((idx, column))
            }
            _ => skipped_headers.push(header.to_string()),
        }
    }

    if !skipped_headers.is_empty() {
        warn!(table, skipped = ?skipped_headers, "ignoring unmatched import headers");
    }

    let mut rows = Vec::with_capacity(data.rows.len());
    for (row_idx, row) in data.rows.iter().enumerate() {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let values = targets
            .iter()
            .map(|(idx, column)| {
                let raw = row.get(*idx).map(String::as_str).unwrap_or("");
                coerce_cell(column, raw)
                    .with_context(|| format!("row {} column {}", row_idx + 1, column.name))
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(values);
    }

    let column_names: Vec<String> = targets.iter().map(|(_, c)| c.name.clone()).collect();
    let row_count = insert_rows(conn, table, &column_names, &rows, replace)?;

    Ok(ImportResult {
        table: table.to_string(),
        row_count,
        skipped_headers,
    })
}

fn coerce_cell(column: &TableColumn, raw: &str) -> Result<Value> {
    let trimmed = raw.trim();

    if column.decl_type.eq_ignore_ascii_case("INTEGER") {
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }
        let number = parse_integer(trimmed)
            .with_context(|| format!("invalid integer: {trimmed:?}"))?;
        return Ok(Value::Integer(number));
    }

    if DATETIME_COLUMNS.contains(&column.name.as_str()) {
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }
        let parsed = parse_datetime(trimmed)
            .with_context(|| format!("invalid date-time: {trimmed:?}"))?;
        return Ok(Value::Text(parsed.format("%Y-%m-%d %H:%M:%S").to_string()));
    }

    if trimmed.is_empty() && !column.not_null {
        return Ok(Value::Null);
    }
    Ok(Value::Text(raw.to_string()))
}

fn parse_integer(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().or_else(|| {
        // Spreadsheet cells often carry integers as `7.0`.
        raw.parse::<f64>()
            .ok()
            .filter(|value| value.fract() == 0.0 && value.is_finite())
            .map(|value| value as i64)
    })
}

pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
