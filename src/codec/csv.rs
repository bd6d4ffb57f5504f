//! CSV codec.
//!
//! CSV is the lossiest format: the header row is the column catalog with no
//! meta, markers dump as `✓`, booleans as `true`/`false`, datetimes lose
//! their zone name, and an absent cell cannot be told apart from an empty
//! string. Strings always dump quoted; a string whose raw text would read
//! back as some other kind (`true`, `123`, `2020-01-01`) is triple-quoted
//! so the inner quotes survive the CSV layer and force a Str on parse.

use tracing::trace;

use crate::codec::zinc;
use crate::error::{HaygridError, Result};
use crate::grid::{Entity, Grid};
use crate::tagmap::TagMap;
use crate::value::{format_date, format_datetime_iso, format_f64, format_time, Ref, Value};
use crate::version::{Version, VER_3_0};

const MARKER_CELL: &str = "\u{2713}";

// ---------------------------------------------------------------------------
// Parsing

/// Parse a CSV document. The header row names the columns; empty input
/// yields an empty 3.0 grid with a single `empty` column.
pub fn parse_grid(text: &str) -> Result<Grid> {
    let mut grid = Grid::unpinned(VER_3_0.clone());
    if text.is_empty() {
        grid.columns.insert("empty".to_string(), TagMap::new());
        return Ok(grid);
    }
    let records = read_records(text)?;
    let mut rows = records.into_iter();
    let Some(header) = rows.next() else {
        grid.columns.insert("empty".to_string(), TagMap::new());
        return Ok(grid);
    };
    for name in &header {
        grid.columns.insert(name.clone(), TagMap::new());
    }
    for (lineno, record) in rows.enumerate() {
        let mut entity = Entity::new();
        for (pos, cell) in record.iter().enumerate() {
            let Some(value) = cell_value(cell)? else {
                continue;
            };
            if pos >= header.len() {
                return Err(HaygridError::parse(
                    format!("row has more cells than the header: {cell:?}"),
                    lineno + 2,
                    1,
                ));
            }
            if !value.is_null() {
                entity.insert(header[pos].clone(), value);
            }
        }
        grid.push_row_unchecked(entity);
    }
    trace!("parsed csv document with {} rows", grid.len());
    Ok(grid)
}

/// Parse one CSV cell; the empty cell is Null.
pub fn parse_scalar(text: &str, version: &Version) -> Result<Value> {
    let _ = version;
    Ok(cell_value(text)?.unwrap_or(Value::Null))
}

/// Decode one cell. `None` is the absent cell.
fn cell_value(cell: &str) -> Result<Option<Value>> {
    if cell.is_empty() {
        return Ok(None);
    }
    Ok(Some(match cell {
        MARKER_CELL => Value::Marker,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Some(rest) = cell.strip_prefix('@') {
                let (name, dis) = match rest.split_once(' ') {
                    Some((name, dis)) => (name, Some(dis.to_string())),
                    None => (rest, None),
                };
                return Ok(Some(Value::Ref(Ref::new(name, dis)?)));
            }
            match zinc::parse_scalar(cell, &VER_3_0) {
                Ok(value) => value,
                // Anything Zinc cannot read is a plain string.
                Err(_) => Value::Str(cell.to_string()),
            }
        }
    }))
}

/// Split CSV text into records of unquoted fields. Quoted fields may hold
/// commas, doubled quotes, and newlines.
fn read_records(text: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut line = 1;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if field.is_empty() => {
                // Quoted field; runs to the closing quote.
                loop {
                    match chars.next() {
                        Some('"') => {
                            if chars.peek() == Some(&'"') {
                                chars.next();
                                field.push('"');
                            } else {
                                break;
                            }
                        }
                        Some('\n') => {
                            line += 1;
                            field.push('\n');
                        }
                        Some(c) => field.push(c),
                        None => {
                            return Err(HaygridError::parse(
                                "unterminated quoted field",
                                line,
                                1,
                            ))
                        }
                    }
                }
            }
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                line += 1;
            }
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                line += 1;
            }
            c => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Dumping

/// Dump a grid as CSV; column meta and grid meta are dropped.
pub fn dump_grid(grid: &Grid) -> Result<String> {
    let version = grid.version();
    let mut out = String::new();
    let names: Vec<&str> = grid.columns().keys().collect();
    out.push_str(&names.join(","));
    out.push('\n');
    for row in grid.iter() {
        let mut cells = Vec::with_capacity(names.len());
        for name in &names {
            match row.get(name) {
                Some(value) => cells.push(dump_scalar(value, version)?),
                None => cells.push(String::new()),
            }
        }
        let joined = cells.join(",");
        // A lone absent cell would make a blank line; keep the row visible.
        if joined.is_empty() && cells.len() == 1 {
            out.push(',');
        } else {
            out.push_str(&joined);
        }
        out.push('\n');
    }
    Ok(out)
}

/// Dump one scalar as a CSV cell, quoting included.
pub fn dump_scalar(value: &Value, version: &Version) -> Result<String> {
    if *value.required_version() > version.nearest() {
        return Err(HaygridError::Version(format!(
            "version {version} does not support {}",
            value.kind()
        )));
    }
    Ok(match value {
        Value::Null => String::new(),
        Value::Marker => MARKER_CELL.to_string(),
        Value::Remove => "R".to_string(),
        Value::Na => "NA".to_string(),
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        Value::Number(n) => format_f64(*n),
        Value::Quantity(q) => {
            if q.symbol.is_empty() {
                format_f64(q.value)
            } else {
                format!("{}{}", format_f64(q.value), q.symbol)
            }
        }
        Value::Str(text) => dump_str(text),
        Value::Uri(uri) => quoted(&format!("`{}`", zinc::escape_str(uri))),
        Value::Bin(mime) => format!("Bin({mime})"),
        Value::XStr(_) => quoted(&zinc::dump_scalar(value, &VER_3_0)?),
        Value::Ref(r) => {
            let text = match &r.dis {
                Some(dis) => format!("@{} {dis}", r.name),
                None => format!("@{}", r.name),
            };
            if text.contains('"') || text.contains(',') {
                quoted(&text)
            } else {
                text
            }
        }
        Value::Coord(_) => quoted(&zinc::dump_scalar(value, version)?),
        Value::Date(date) => format_date(date),
        Value::Time(time) => format_time(time),
        // The zone name does not survive CSV.
        Value::DateTime(dt) => format_datetime_iso(&dt.value),
        Value::List(_) | Value::Dict(_) => quoted(&zinc::dump_scalar(value, version)?),
        Value::Grid(nested) => quoted(&format!("<<{}>>", zinc::dump_grid(nested)?)),
    })
}

/// Strings always quote; text that would read back as another kind is
/// triple-quoted so the inner quotes survive the CSV layer.
fn dump_str(text: &str) -> String {
    let ambiguous = matches!(text, MARKER_CELL | "true" | "false")
        || text.starts_with('@')
        || zinc::parse_scalar(text, &VER_3_0).is_ok();
    let escaped = text.replace('"', "\"\"");
    if ambiguous {
        format!("\"\"\"{escaped}\"\"\"")
    } else {
        format!("\"{escaped}\"")
    }
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}
