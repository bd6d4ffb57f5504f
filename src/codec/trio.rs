//! Trio codec.
//!
//! Trio is a line-oriented format for entity records: one `tag` or
//! `tag: value` per line, records separated by dash lines. Values reuse the
//! Zinc scalar grammar at the 3.0 level, with three Trio-only forms: a bare
//! unquoted string fallback, indented multi-line string blocks, and nested
//! grids embedded as indented `Zinc:` blocks.

use tracing::trace;

use crate::codec::zinc;
use crate::error::{HaygridError, Result};
use crate::grid::{Entity, Grid};
use crate::value::Value;
use crate::version::{Version, VER_3_0};

// ---------------------------------------------------------------------------
// Parsing

/// Parse a Trio document. The result is a 3.0 grid with the column catalog
/// built from the tags the records use, in first-seen order.
pub fn parse_grid(text: &str) -> Result<Grid> {
    let lines: Vec<&str> = text.lines().collect();
    let mut grid = Grid::unpinned(VER_3_0.clone());
    let mut record = Entity::new();
    let mut lineno = 0;
    while lineno < lines.len() {
        let line = lines[lineno];
        lineno += 1;
        if line.trim().is_empty() || line.starts_with("//") {
            continue;
        }
        if is_separator(line) {
            if !record.is_empty() {
                grid.push_row_unchecked(std::mem::take(&mut record));
            }
            continue;
        }
        let (tag, rest) = split_tag(text, line, lineno)?;
        let Some(rest) = rest else {
            record.insert(tag, Value::Marker);
            continue;
        };
        let rest = rest.trim_start();
        let value = if rest.is_empty() {
            // `tag:` with nothing after it introduces an indented block.
            let block = indented_block(&lines, &mut lineno);
            if block.is_empty() {
                return Err(HaygridError::parse_in_source(
                    "expected an indented block after empty value",
                    text,
                    lineno,
                    1,
                ));
            }
            Value::Str(format!("{}\n", unescape(&block.join("\n"))))
        } else if rest == "Zinc:" {
            let block = indented_block(&lines, &mut lineno);
            if block.is_empty() {
                return Err(HaygridError::parse_in_source(
                    "expected an indented grid after Zinc:",
                    text,
                    lineno,
                    1,
                ));
            }
            let mut nested = block.join("\n");
            nested.push('\n');
            Value::Grid(Box::new(zinc::parse_grid(&nested)?))
        } else {
            scalar_or_bare(text, rest, lineno)?
        };
        record.insert(tag, value);
    }
    if !record.is_empty() {
        grid.push_row_unchecked(record);
    }
    grid.extends_columns();
    trace!("parsed trio document with {} records", grid.len());
    Ok(grid)
}

/// Parse one scalar: a Zinc scalar, falling back to a bare string.
pub fn parse_scalar(text: &str, version: &Version) -> Result<Value> {
    match zinc::parse_scalar(text.trim(), version) {
        Ok(value) => Ok(value),
        Err(_) if bare_start(text.trim()) => Ok(Value::Str(unescape(text.trim()))),
        Err(err) => Err(err),
    }
}

fn is_separator(line: &str) -> bool {
    let trimmed = line.trim_end();
    !trimmed.is_empty() && trimmed.chars().all(|c| c == '-')
}

/// Split a tag line. `None` rest means a bare marker tag with no colon;
/// `Some` carries the text after the colon, possibly empty.
fn split_tag<'a>(source: &str, line: &'a str, lineno: usize) -> Result<(String, Option<&'a str>)> {
    let mut end = 0;
    for (pos, c) in line.char_indices() {
        let ok = if pos == 0 {
            c.is_ascii_lowercase() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_'
        };
        if !ok {
            break;
        }
        end = pos + c.len_utf8();
    }
    if end == 0 {
        return Err(HaygridError::parse_in_source(
            "expected a tag name",
            source,
            lineno,
            1,
        ));
    }
    let rest = &line[end..];
    if rest.trim().is_empty() {
        return Ok((line[..end].to_string(), None));
    }
    match rest.strip_prefix(':') {
        Some(rest) => Ok((line[..end].to_string(), Some(rest))),
        None => Err(HaygridError::parse_in_source(
            "expected ':' after tag name",
            source,
            lineno,
            end + 1,
        )),
    }
}

/// Collect the following whitespace-indented lines, dedented by their
/// common leading whitespace.
fn indented_block(lines: &[&str], lineno: &mut usize) -> Vec<String> {
    let mut block: Vec<&str> = Vec::new();
    while *lineno < lines.len() {
        let line = lines[*lineno];
        if line.is_empty() || !line.starts_with([' ', '\t']) {
            break;
        }
        block.push(line);
        *lineno += 1;
    }
    let indent = block
        .iter()
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);
    block.iter().map(|line| line[indent..].to_string()).collect()
}

fn scalar_or_bare(source: &str, text: &str, lineno: usize) -> Result<Value> {
    match zinc::parse_scalar(text, &VER_3_0) {
        Ok(value) => Ok(value),
        Err(err) => {
            if bare_start(text) {
                return Ok(Value::Str(unescape(text)));
            }
            Err(HaygridError::parse_in_source(
                &err.to_string(),
                source,
                lineno,
                1,
            ))
        }
    }
}

/// A bare string starts with a letter, `_`, `-`, or a non-ASCII character.
fn bare_start(text: &str) -> bool {
    match text.chars().next() {
        Some(c) => c.is_ascii_alphabetic() || c == '_' || c == '-' || (c as u32) >= 0x80,
        None => false,
    }
}

/// Resolve backslash escapes in a bare or block string.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\u{b}'),
            Some('u') | Some('U') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => {
                        out.push('u');
                        out.push_str(&hex);
                    }
                }
            }
            Some(c) => out.push(c),
            None => out.push('\\'),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Dumping

/// Dump a grid as a Trio document; records joined by `---` lines.
pub fn dump_grid(grid: &Grid) -> Result<String> {
    let mut records = Vec::with_capacity(grid.len());
    for row in grid.iter() {
        let mut lines = Vec::with_capacity(row.len());
        for name in grid.columns().keys() {
            if let Some(value) = row.get(name) {
                lines.push(tag_line(name, value)?);
            }
        }
        records.push(lines.join("\n"));
    }
    let mut out = records.join("\n---\n");
    if !out.is_empty() {
        out.push('\n');
    }
    Ok(out)
}

fn tag_line(name: &str, value: &Value) -> Result<String> {
    Ok(match value {
        Value::Marker => name.to_string(),
        Value::Str(text) if text.contains('\n') && text.ends_with('\n') => {
            let mut out = format!("{name}:");
            for line in text[..text.len() - 1].split('\n') {
                out.push_str("\n  ");
                out.push_str(&zinc::escape_str(line));
            }
            out
        }
        Value::Grid(nested) => {
            let zinc = zinc::dump_grid(nested)?;
            let mut out = format!("{name}: Zinc:");
            for line in zinc.trim_end_matches('\n').split('\n') {
                out.push_str("\n  ");
                out.push_str(line);
            }
            out
        }
        value => format!("{name}: {}", dump_scalar(value, &VER_3_0)?),
    })
}

/// Dump one scalar in Trio form: strings go bare when they would read back
/// as the same string, everything else is the Zinc form.
pub fn dump_scalar(value: &Value, version: &Version) -> Result<String> {
    if let Value::Str(text) = value {
        let escaped = zinc::escape_str(text);
        if escaped == *text && bare_start(text) && zinc::parse_scalar(text, &VER_3_0).is_err() {
            return Ok(escaped);
        }
        return Ok(format!("\"{escaped}\""));
    }
    zinc::dump_scalar(value, version)
}
