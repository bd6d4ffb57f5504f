//! Zinc codec.
//!
//! Zinc is the canonical text format and the richest grammar; the Trio and
//! CSV codecs lean on the scalar parser and dumper defined here. Parsing
//! is a hand-written recursive descent over a character scanner, with all
//! state local to the call. The grammar level is selected by the grid's
//! `ver` header: lists, dicts, nested grids, NA, and XStr need 3.0.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use tracing::trace;

use crate::error::{HaygridError, Result};
use crate::grid::{Entity, Grid};
use crate::tagmap::TagMap;
use crate::value::{
    format_date, format_datetime_iso, format_f64, format_time, Coord, HsDateTime, Quantity, Ref,
    Value, XStr,
};
use crate::version::{Version, VER_3_0};

// ---------------------------------------------------------------------------
// Scanner

/// Character scanner with line/column tracking. Errors produced through
/// [`Scanner::error`] carry a framed window of the source.
pub(crate) struct Scanner<'a> {
    src: &'a str,
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Scanner {
            src,
            chars: src.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    pub(crate) fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    pub(crate) fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    pub(crate) fn eat(&mut self, expected: char) -> Result<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.advance();
                Ok(())
            }
            Some(c) => Err(self.error(&format!("expected {expected:?}, found {c:?}"))),
            None => Err(self.error(&format!("expected {expected:?}, found end of input"))),
        }
    }

    /// Skip spaces and tabs, never newlines.
    pub(crate) fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.advance();
        }
    }

    pub(crate) fn looking_at(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(ahead, c)| self.peek_at(ahead) == Some(c))
    }

    pub(crate) fn save(&self) -> (usize, usize, usize) {
        (self.pos, self.line, self.col)
    }

    pub(crate) fn restore(&mut self, state: (usize, usize, usize)) {
        self.pos = state.0;
        self.line = state.1;
        self.col = state.2;
    }

    pub(crate) fn error(&self, message: &str) -> HaygridError {
        HaygridError::parse_in_source(message, self.src, self.line, self.col)
    }
}

fn is_id_start(c: char) -> bool {
    c.is_ascii_lowercase() || c == '_'
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_unit_char(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '%' | '_' | '/' | '$') || (c as u32) >= 0x0080
}

/// Parse a tag identifier: `[a-z_][a-zA-Z0-9_]*`.
pub(crate) fn identifier(s: &mut Scanner) -> Result<String> {
    match s.peek() {
        Some(c) if is_id_start(c) => {}
        _ => return Err(s.error("expected identifier")),
    }
    let mut id = String::new();
    while let Some(c) = s.peek() {
        if is_id_char(c) {
            id.push(c);
            s.advance();
        } else {
            break;
        }
    }
    Ok(id)
}

// ---------------------------------------------------------------------------
// Grid parsing

/// Parse a complete Zinc document.
pub fn parse_grid(text: &str) -> Result<Grid> {
    let mut s = Scanner::new(text);
    let grid = grid_body(&mut s, false)?;
    while matches!(s.peek(), Some('\n') | Some('\r') | Some(' ') | Some('\t')) {
        s.advance();
    }
    if !s.at_end() {
        return Err(s.error("trailing data after grid"));
    }
    Ok(grid)
}

/// Parse one scalar; the whole input must be consumed.
pub fn parse_scalar(text: &str, version: &Version) -> Result<Value> {
    if text != text.trim() || text.is_empty() {
        return Err(HaygridError::parse(
            format!("failed to parse scalar: {text:?}"),
            1,
            1,
        ));
    }
    let mut s = Scanner::new(text);
    let value = scalar(&mut s, &version.nearest())?;
    if !s.at_end() {
        return Err(s.error("trailing data after scalar"));
    }
    Ok(value)
}

fn grid_body(s: &mut Scanner, nested: bool) -> Result<Grid> {
    // Header: ver:"..." followed by grid metadata.
    s.skip_spaces();
    if identifier(s)? != "ver" {
        return Err(s.error("grid must start with a ver tag"));
    }
    s.eat(':')?;
    let ver_text = match scalar_at(s, &VER_3_0)? {
        Value::Str(text) => text,
        other => return Err(s.error(&format!("ver must be a Str, got {}", other.kind()))),
    };
    let version: Version = ver_text
        .parse()
        .map_err(|err: HaygridError| s.error(&err.to_string()))?;
    let grammar = version.nearest();
    trace!("parsing zinc grid at version {version}");

    let mut grid = Grid::with_version(version);
    grid.meta = meta_items(s, &grammar)?;
    newline(s)?;

    // Column catalog.
    loop {
        s.skip_spaces();
        let name = identifier(s).map_err(|_| s.error("expected column name"))?;
        s.skip_spaces();
        let meta = if matches!(s.peek(), Some(',') | Some('\n') | Some('\r') | None) {
            TagMap::new()
        } else {
            meta_items(s, &grammar)?
        };
        grid.columns.insert(name, meta);
        s.skip_spaces();
        match s.peek() {
            Some(',') => {
                s.advance();
            }
            _ => break,
        }
    }
    newline(s)?;

    // Rows.
    loop {
        if s.at_end() {
            break;
        }
        if nested && s.looking_at(">>") {
            break;
        }
        let cells = row_cells(s, &grammar)?;
        if cells.len() > grid.columns.len() {
            return Err(s.error(&format!(
                "row has {} cells but the grid has {} columns",
                cells.len(),
                grid.columns.len()
            )));
        }
        let mut row = Entity::new();
        for (pos, cell) in cells.into_iter().enumerate() {
            if cell.is_null() {
                continue;
            }
            // Column count was checked above.
            if let Some(name) = grid.columns.key_at(pos) {
                row.insert(name.to_string(), cell);
            }
        }
        grid.push_row_unchecked(row);
    }
    Ok(grid)
}

fn newline(s: &mut Scanner) -> Result<()> {
    s.skip_spaces();
    if s.peek() == Some('\r') {
        s.advance();
    }
    match s.peek() {
        Some('\n') => {
            s.advance();
            Ok(())
        }
        None => Ok(()),
        Some(c) => Err(s.error(&format!("expected end of line, found {c:?}"))),
    }
}

/// Space-separated `id` / `id:scalar` items, up to end of line.
fn meta_items(s: &mut Scanner, grammar: &Version) -> Result<TagMap<Value>> {
    let mut meta = TagMap::new();
    loop {
        s.skip_spaces();
        match s.peek() {
            Some(c) if is_id_start(c) => {}
            _ => break,
        }
        let id = identifier(s)?;
        if s.peek() == Some(':') {
            s.advance();
            let value = scalar_at(s, grammar)?;
            meta.insert(id, value);
        } else {
            meta.insert(id, Value::Marker);
        }
    }
    Ok(meta)
}

fn row_cells(s: &mut Scanner, grammar: &Version) -> Result<Vec<Value>> {
    let mut cells = Vec::new();
    loop {
        s.skip_spaces();
        let cell = match s.peek() {
            Some(',') | Some('\n') | Some('\r') | None => Value::Null,
            _ => scalar_at(s, grammar)?,
        };
        cells.push(cell);
        s.skip_spaces();
        match s.peek() {
            Some(',') => {
                s.advance();
            }
            Some('\r') | Some('\n') => {
                newline(s)?;
                break;
            }
            None => break,
            Some(c) => return Err(s.error(&format!("unexpected {c:?} in row"))),
        }
    }
    Ok(cells)
}

// ---------------------------------------------------------------------------
// Scalar parsing

/// Parse a scalar at the scanner position, gated by grammar level.
pub(crate) fn scalar(s: &mut Scanner, grammar: &Version) -> Result<Value> {
    scalar_at(s, grammar)
}

fn require_3_0(s: &Scanner, grammar: &Version, what: &str) -> Result<()> {
    if *grammar < *VER_3_0 {
        return Err(s.error(&format!("version {grammar} does not support {what}")));
    }
    Ok(())
}

fn scalar_at(s: &mut Scanner, grammar: &Version) -> Result<Value> {
    match s.peek() {
        Some('"') => Ok(Value::Str(quoted_string(s)?)),
        Some('`') => uri(s),
        Some('@') => reference(s),
        Some('[') => {
            require_3_0(s, grammar, "lists")?;
            list(s, grammar)
        }
        Some('{') => {
            require_3_0(s, grammar, "dicts")?;
            dict(s, grammar)
        }
        Some('<') if s.looking_at("<<") => {
            require_3_0(s, grammar, "nested grids")?;
            inner_grid(s)
        }
        Some('-') if s.looking_at("-INF") => {
            s.advance();
            s.advance();
            s.advance();
            s.advance();
            Ok(Value::Number(f64::NEG_INFINITY))
        }
        Some('-') => number(s),
        Some(c) if c.is_ascii_digit() => date_time_or_number(s),
        Some(c) if c.is_ascii_alphabetic() || c == '_' => word(s, grammar),
        Some(c) => Err(s.error(&format!("unexpected {c:?}"))),
        None => Err(s.error("unexpected end of input")),
    }
}

fn quoted_string(s: &mut Scanner) -> Result<String> {
    s.eat('"')?;
    let mut out = String::new();
    loop {
        match s.peek() {
            None => return Err(s.error("unterminated string")),
            Some('"') => {
                s.advance();
                return Ok(out);
            }
            Some('\\') => {
                s.advance();
                out.push(escape_char(s)?);
            }
            Some(c) if (c as u32) < 0x20 => {
                return Err(s.error("control character in string"));
            }
            Some(c) => {
                out.push(c);
                s.advance();
            }
        }
    }
}

fn escape_char(s: &mut Scanner) -> Result<char> {
    let c = s
        .advance()
        .ok_or_else(|| s.error("unterminated escape sequence"))?;
    Ok(match c {
        'b' => '\u{8}',
        'f' => '\u{c}',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\u{b}',
        'u' | 'U' => {
            let mut code = 0u32;
            for _ in 0..4 {
                let h = s
                    .advance()
                    .and_then(|c| c.to_digit(16))
                    .ok_or_else(|| s.error("invalid unicode escape"))?;
                code = code * 16 + h;
            }
            char::from_u32(code).ok_or_else(|| s.error("invalid unicode escape"))?
        }
        // The remaining escapes pass through: \\ \" \$ and the URI set.
        other => other,
    })
}

fn uri(s: &mut Scanner) -> Result<Value> {
    s.eat('`')?;
    let mut out = String::new();
    loop {
        match s.peek() {
            None => return Err(s.error("unterminated uri")),
            Some('`') => {
                s.advance();
                return Ok(Value::Uri(out));
            }
            Some('\\') => {
                s.advance();
                let c = escape_char(s)?;
                if c == '#' {
                    out.push('\\');
                }
                out.push(c);
            }
            Some(c) if (c as u32) < 0x20 => {
                return Err(s.error("control character in uri"));
            }
            Some(c) => {
                out.push(c);
                s.advance();
            }
        }
    }
}

fn reference(s: &mut Scanner) -> Result<Value> {
    s.eat('@')?;
    let mut name = String::new();
    while let Some(c) = s.peek() {
        if c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-' | '.' | '~') {
            name.push(c);
            s.advance();
        } else {
            break;
        }
    }
    if name.is_empty() {
        return Err(s.error("empty ref name"));
    }
    let state = s.save();
    s.skip_spaces();
    let dis = if s.peek() == Some('"') {
        Some(quoted_string(s)?)
    } else {
        s.restore(state);
        None
    };
    Ref::new(&name, dis)
        .map(Value::Ref)
        .map_err(|err| s.error(&err.to_string()))
}

fn list(s: &mut Scanner, grammar: &Version) -> Result<Value> {
    s.eat('[')?;
    let mut items = Vec::new();
    loop {
        s.skip_spaces();
        match s.peek() {
            Some(']') => {
                s.advance();
                return Ok(Value::List(items));
            }
            None => return Err(s.error("unterminated list")),
            _ => {}
        }
        items.push(scalar_at(s, grammar)?);
        s.skip_spaces();
        match s.peek() {
            Some(',') => {
                s.advance();
            }
            Some(']') => {
                s.advance();
                return Ok(Value::List(items));
            }
            _ => return Err(s.error("expected ',' or ']' in list")),
        }
    }
}

fn dict(s: &mut Scanner, grammar: &Version) -> Result<Value> {
    s.eat('{')?;
    let mut map = TagMap::new();
    loop {
        s.skip_spaces();
        match s.peek() {
            Some('}') => {
                s.advance();
                return Ok(Value::Dict(map));
            }
            Some(c) if is_id_start(c) => {
                let id = identifier(s)?;
                if s.peek() == Some(':') {
                    s.advance();
                    let value = scalar_at(s, grammar)?;
                    map.insert(id, value);
                } else {
                    map.insert(id, Value::Marker);
                }
            }
            _ => return Err(s.error("expected tag or '}' in dict")),
        }
    }
}

fn inner_grid(s: &mut Scanner) -> Result<Value> {
    s.eat('<')?;
    s.eat('<')?;
    while matches!(s.peek(), Some('\n') | Some('\r') | Some(' ') | Some('\t')) {
        s.advance();
    }
    let grid = grid_body(s, true)?;
    s.eat('>')?;
    s.eat('>')?;
    Ok(Value::Grid(Box::new(grid)))
}

fn looking_at_date(s: &Scanner) -> bool {
    (0..10).all(|ahead| match (ahead, s.peek_at(ahead)) {
        (4, Some(c)) | (7, Some(c)) => c == '-',
        (_, Some(c)) => c.is_ascii_digit(),
        (_, None) => false,
    })
}

fn looking_at_time(s: &Scanner) -> bool {
    matches!(s.peek(), Some(c) if c.is_ascii_digit())
        && matches!(s.peek_at(1), Some(c) if c.is_ascii_digit())
        && s.peek_at(2) == Some(':')
}

fn date_time_or_number(s: &mut Scanner) -> Result<Value> {
    if looking_at_date(s) {
        return date_or_datetime(s);
    }
    if looking_at_time(s) {
        return Ok(Value::Time(time_literal(s)?));
    }
    number(s)
}

fn take_digits(s: &mut Scanner, count: usize) -> Result<String> {
    let mut out = String::new();
    for _ in 0..count {
        match s.peek() {
            Some(c) if c.is_ascii_digit() => {
                out.push(c);
                s.advance();
            }
            _ => return Err(s.error("expected digit")),
        }
    }
    Ok(out)
}

fn date_literal(s: &mut Scanner) -> Result<NaiveDate> {
    let text: String = (0..10).filter_map(|a| s.peek_at(a)).collect();
    let date = NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .map_err(|err| s.error(&format!("invalid date {text:?}: {err}")))?;
    for _ in 0..10 {
        s.advance();
    }
    Ok(date)
}

fn time_literal(s: &mut Scanner) -> Result<NaiveTime> {
    let hour: u32 = take_digits(s, 2)?.parse().unwrap_or(0);
    s.eat(':')?;
    let minute: u32 = take_digits(s, 2)?.parse().unwrap_or(0);
    let mut second = 0u32;
    let mut nanos = 0u32;
    if s.peek() == Some(':') && matches!(s.peek_at(1), Some(c) if c.is_ascii_digit()) {
        s.advance();
        second = take_digits(s, 2)?.parse().unwrap_or(0);
        if s.peek() == Some('.') && matches!(s.peek_at(1), Some(c) if c.is_ascii_digit()) {
            s.advance();
            let mut frac = String::new();
            while let Some(c) = s.peek() {
                if c.is_ascii_digit() {
                    frac.push(c);
                    s.advance();
                } else {
                    break;
                }
            }
            let frac = format!("{frac:0<9}");
            nanos = frac[..9].parse().unwrap_or(0);
        }
    }
    NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
        .ok_or_else(|| s.error("invalid time of day"))
}

fn date_or_datetime(s: &mut Scanner) -> Result<Value> {
    let date = date_literal(s)?;
    if !matches!(s.peek(), Some('T') | Some('t')) {
        return Ok(Value::Date(date));
    }
    s.advance();
    let time = time_literal(s)?;

    // Offset: Z, +hh:mm, -hh:mm, or absent (UTC).
    let offset_secs: i32 = match s.peek() {
        Some('Z') | Some('z') => {
            s.advance();
            0
        }
        Some(sign @ ('+' | '-')) => {
            s.advance();
            let hh: i32 = take_digits(s, 2)?.parse().unwrap_or(0);
            s.eat(':')?;
            let mm: i32 = take_digits(s, 2)?.parse().unwrap_or(0);
            let secs = hh * 3600 + mm * 60;
            if sign == '-' {
                -secs
            } else {
                secs
            }
        }
        _ => 0,
    };
    let offset = FixedOffset::east_opt(offset_secs)
        .ok_or_else(|| s.error("invalid utc offset"))?;
    let naive = NaiveDateTime::new(date, time);
    let fixed = offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| s.error("invalid datetime"))?;

    // Optional zone name: an uppercase word after whitespace. Tag ids
    // start lowercase, so the case split keeps the grammar unambiguous.
    let state = s.save();
    s.skip_spaces();
    let zone = match s.peek() {
        Some(c) if c.is_ascii_uppercase() => {
            let mut name = String::new();
            while let Some(c) = s.peek() {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    name.push(c);
                    s.advance();
                } else {
                    break;
                }
            }
            if (name == "UTC" || name == "GMT") && matches!(s.peek(), Some('+')) {
                name.push('+');
                s.advance();
                while let Some(c) = s.peek() {
                    if c.is_ascii_digit() {
                        name.push(c);
                        s.advance();
                    } else {
                        break;
                    }
                }
            }
            Some(name)
        }
        _ => {
            s.restore(state);
            None
        }
    };
    let value = match zone {
        Some(name) => {
            HsDateTime::with_zone(fixed, &name).map_err(|err| s.error(&err.to_string()))?
        }
        None => HsDateTime::new(fixed),
    };
    Ok(Value::DateTime(value))
}

fn number(s: &mut Scanner) -> Result<Value> {
    let mut text = String::new();
    if s.peek() == Some('-') {
        text.push('-');
        s.advance();
    }
    let mut saw_digit = false;
    while let Some(c) = s.peek() {
        if c.is_ascii_digit() {
            text.push(c);
            saw_digit = true;
            s.advance();
        } else if c == '_' {
            s.advance();
        } else {
            break;
        }
    }
    if !saw_digit {
        return Err(s.error("expected number"));
    }
    if s.peek() == Some('.') && matches!(s.peek_at(1), Some(c) if c.is_ascii_digit()) {
        text.push('.');
        s.advance();
        while let Some(c) = s.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                s.advance();
            } else if c == '_' {
                s.advance();
            } else {
                break;
            }
        }
    }
    // An exponent only when digits follow, otherwise `e` starts a unit.
    if matches!(s.peek(), Some('e') | Some('E')) {
        let digits_follow = match s.peek_at(1) {
            Some(c) if c.is_ascii_digit() => true,
            Some('+') | Some('-') => {
                matches!(s.peek_at(2), Some(c) if c.is_ascii_digit())
            }
            _ => false,
        };
        if digits_follow {
            text.push('e');
            s.advance();
            if let Some(sign @ ('+' | '-')) = s.peek() {
                text.push(sign);
                s.advance();
            }
            while let Some(c) = s.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    s.advance();
                } else {
                    break;
                }
            }
        }
    }
    let value: f64 = text
        .parse()
        .map_err(|err| s.error(&format!("invalid number {text:?}: {err}")))?;
    let mut unit = String::new();
    while let Some(c) = s.peek() {
        if is_unit_char(c) {
            unit.push(c);
            s.advance();
        } else {
            break;
        }
    }
    if unit.is_empty() {
        Ok(Value::Number(value))
    } else {
        Ok(Value::Quantity(Quantity::new(value, &unit)))
    }
}

/// Keywords and parenthesised forms: T F N M R NA INF NaN, `Bin(mime)`,
/// `C(lat,lng)`, and `enc("data")` XStrs.
fn word(s: &mut Scanner, grammar: &Version) -> Result<Value> {
    let mut word = String::new();
    while let Some(c) = s.peek() {
        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
            s.advance();
        } else {
            break;
        }
    }
    if s.peek() == Some('(') {
        return match word.as_str() {
            "Bin" => {
                s.advance();
                let mut mime = String::new();
                loop {
                    match s.peek() {
                        Some(')') => {
                            s.advance();
                            break;
                        }
                        Some(c) if (0x20..0x80).contains(&(c as u32)) && c != '(' && c != ')' => {
                            mime.push(c);
                            s.advance();
                        }
                        _ => return Err(s.error("unterminated Bin literal")),
                    }
                }
                Ok(Value::Bin(mime))
            }
            "C" => {
                s.advance();
                let lat = coord_component(s)?;
                s.eat(',')?;
                let lng = coord_component(s)?;
                s.eat(')')?;
                Ok(Value::Coord(Coord { lat, lng }))
            }
            _ => {
                require_3_0(s, grammar, "xstr literals")?;
                s.advance();
                let data = quoted_string(s)?;
                s.eat(')')?;
                XStr::new(&word, &data)
                    .map(Value::XStr)
                    .map_err(|err| s.error(&err.to_string()))
            }
        };
    }
    match word.as_str() {
        "T" => Ok(Value::Bool(true)),
        "F" => Ok(Value::Bool(false)),
        "N" => Ok(Value::Null),
        "M" => Ok(Value::Marker),
        "R" => Ok(Value::Remove),
        "NA" => {
            require_3_0(s, grammar, "NA")?;
            Ok(Value::Na)
        }
        "INF" => Ok(Value::Number(f64::INFINITY)),
        "NaN" => Ok(Value::Number(f64::NAN)),
        _ => Err(s.error(&format!("unexpected token {word:?}"))),
    }
}

fn coord_component(s: &mut Scanner) -> Result<f64> {
    let mut text = String::new();
    while let Some(c) = s.peek() {
        if c.is_ascii_digit() || matches!(c, '-' | '.' | '+' | 'e' | 'E') {
            text.push(c);
            s.advance();
        } else {
            break;
        }
    }
    text.parse()
        .map_err(|err| s.error(&format!("invalid coordinate {text:?}: {err}")))
}

// ---------------------------------------------------------------------------
// Dumping

/// Strings escape controls, backslash, quote, and BMP non-ASCII.
pub(crate) fn escape_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c if (c as u32) < 0x20 || ((c as u32) >= 0x80 && (c as u32) <= 0xffff) => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

fn dump_str(text: &str) -> String {
    format!("\"{}\"", escape_str(text))
}

fn dump_meta(meta: &TagMap<Value>, version: &Version) -> Result<String> {
    let mut items = Vec::with_capacity(meta.len());
    for (id, value) in meta.iter() {
        if matches!(value, Value::Marker) {
            items.push(id.to_string());
        } else {
            items.push(format!("{id}:{}", dump_scalar(value, version)?));
        }
    }
    Ok(items.join(" "))
}

/// Dump a complete grid, trailing newline included.
pub fn dump_grid(grid: &Grid) -> Result<String> {
    let version = grid.version().clone();
    let mut header = format!("ver:{}", dump_str(&version.to_string()));
    if !grid.meta().is_empty() {
        header.push(' ');
        header.push_str(&dump_meta(grid.meta(), &version)?);
    }
    let mut columns = Vec::with_capacity(grid.columns().len());
    for (name, meta) in grid.columns().iter() {
        if meta.is_empty() {
            columns.push(name.to_string());
        } else {
            columns.push(format!("{name} {}", dump_meta(meta, &version)?));
        }
    }
    let mut out = header;
    out.push('\n');
    out.push_str(&columns.join(","));
    out.push('\n');
    let single_column = grid.columns().len() == 1;
    for row in grid.iter() {
        let mut cells = Vec::with_capacity(grid.columns().len());
        for name in grid.columns().keys() {
            match row.get(name) {
                Some(value) => cells.push(dump_scalar(value, &version)?),
                // A single-column grid marks an absent cell explicitly.
                None if single_column => cells.push("N".to_string()),
                None => cells.push(String::new()),
            }
        }
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    Ok(out)
}

pub fn dump_scalar(value: &Value, version: &Version) -> Result<String> {
    if *value.required_version() > version.nearest() {
        return Err(HaygridError::Version(format!(
            "version {version} does not support {}",
            value.kind()
        )));
    }
    Ok(match value {
        Value::Null => "N".to_string(),
        Value::Marker => "M".to_string(),
        Value::Remove => "R".to_string(),
        Value::Na => "NA".to_string(),
        Value::Bool(true) => "T".to_string(),
        Value::Bool(false) => "F".to_string(),
        Value::Number(n) => format_f64(*n),
        Value::Quantity(q) => {
            if q.symbol.is_empty() {
                format_f64(q.value)
            } else {
                format!("{}{}", format_f64(q.value), q.symbol)
            }
        }
        Value::Str(text) => dump_str(text),
        Value::Uri(uri) => format!("`{}`", escape_str(uri).replace('`', "\\`")),
        Value::Bin(mime) => format!("Bin({mime})"),
        Value::XStr(xstr) => format!("{}(\"{}\")", xstr.encoding, xstr.text()),
        Value::Ref(r) => match &r.dis {
            Some(dis) => format!("@{} {}", r.name, dump_str(dis)),
            None => format!("@{}", r.name),
        },
        Value::Coord(c) => format!("C({:.6},{:.6})", c.lat, c.lng),
        Value::Date(date) => format_date(date),
        Value::Time(time) => format_time(time),
        Value::DateTime(dt) => {
            format!("{} {}", format_datetime_iso(&dt.value), dt.zone_name()?)
        }
        Value::List(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                parts.push(dump_scalar(item, version)?);
            }
            format!("[{}]", parts.join(","))
        }
        Value::Dict(map) => {
            let mut parts = Vec::with_capacity(map.len());
            for (id, item) in map.iter() {
                parts.push(format!("{id}:{}", dump_scalar(item, version)?));
            }
            format!("{{{}}}", parts.join(" "))
        }
        Value::Grid(grid) => format!("<<{}>>", dump_grid(grid)?),
    })
}
