//! Output formatting for query results.
//!
//! Supports table, JSON, CSV, and raw output formats.

use std::str::FromStr;

use comfy_table::{Cell, ContentArrangement, Table};
use pdx_sql::QueryResult;
use pdx_storage::{FieldValue, Row};
use serde_json::{json, Value as JsonValue};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Formatted table output.
    Table,
    /// JSON output.
    Json,
    /// CSV output.
    Csv,
    /// Raw output (values separated by tabs).
    Raw,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "raw" => Ok(OutputFormat::Raw),
            _ => Err(format!(
                "unknown format '{s}', available: table, json, csv, raw"
            )),
        }
    }
}

/// Formats a query result according to the specified format.
pub fn format_result(result: &QueryResult, format: OutputFormat) -> String {
    format_rows(&result.column_names(), &result.rows, format)
}

/// Formats rows under the given column names.
pub fn format_rows(columns: &[&str], rows: &[Row], format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_table(columns, rows),
        OutputFormat::Json => format_json(columns, rows),
        OutputFormat::Csv => format_csv(columns, rows),
        OutputFormat::Raw => format_raw(columns, rows),
    }
}

fn format_table(columns: &[&str], rows: &[Row]) -> String {
    let mut table = Table::new();

    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);

    if !columns.is_empty() {
        table.set_header(columns.iter().map(Cell::new));
    }

    for row in rows {
        let cells: Vec<Cell> = row.iter().map(|v| Cell::new(v.to_string())).collect();
        table.add_row(cells);
    }

    table.to_string()
}

fn format_json(columns: &[&str], rows: &[Row]) -> String {
    let rows: Vec<JsonValue> = rows
        .iter()
        .map(|row| {
            let mut obj = serde_json::Map::new();
            for (i, value) in row.iter().enumerate() {
                let name = columns
                    .get(i)
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| format!("column_{}", i));
                obj.insert(name, value_to_json(value));
            }
            JsonValue::Object(obj)
        })
        .collect();

    serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
}

/// Numbers stay numbers; temporal, decimal and binary values use their
/// display form so no precision is lost.
fn value_to_json(value: &FieldValue) -> JsonValue {
    match value {
        FieldValue::Null => JsonValue::Null,
        FieldValue::SmallInt(i) => json!(*i),
        FieldValue::Long(i) => json!(*i),
        FieldValue::Number(f) | FieldValue::Currency(f) => json!(*f),
        FieldValue::Boolean(b) => json!(*b),
        FieldValue::Text(s) => json!(s),
        FieldValue::Unavailable(blob) => json!({
            "offset": blob.offset,
            "length": blob.length,
        }),
        FieldValue::Decimal(_)
        | FieldValue::Date(_)
        | FieldValue::Time(_)
        | FieldValue::Timestamp(_)
        | FieldValue::Binary(_) => json!(value.to_string()),
    }
}

fn format_csv(columns: &[&str], rows: &[Row]) -> String {
    let mut output = String::new();

    if !columns.is_empty() {
        let header: Vec<String> = columns.iter().map(|c| escape_csv(c)).collect();
        output.push_str(&header.join(","));
        output.push('\n');
    }

    for row in rows {
        let values: Vec<String> = row.iter().map(csv_value).collect();
        output.push_str(&values.join(","));
        output.push('\n');
    }

    output
}

// NULL is an empty cell
fn csv_value(value: &FieldValue) -> String {
    if value.is_null() {
        String::new()
    } else {
        escape_csv(&value.to_string())
    }
}

/// Escapes a value for CSV output.
fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn format_raw(columns: &[&str], rows: &[Row]) -> String {
    let mut output = String::new();

    if !columns.is_empty() {
        output.push_str(&columns.join("\t"));
        output.push('\n');
    }

    for row in rows {
        let values: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        output.push_str(&values.join("\t"));
        output.push('\n');
    }

    output
}
