//! JSON codec (prefix-tagged encoding).
//!
//! Grids serialize to an envelope `{"meta": {...}, "cols": [...], "rows":
//! [...]}`. Scalars that JSON cannot carry natively travel as strings with
//! a single-letter prefix (`n:` number, `r:` ref, `t:` datetime, ...);
//! booleans and finite numbers stay native. Parsing dispatches on the
//! prefix with the patterns below, and any string that matches none of
//! them is a plain Str.

use chrono::{DateTime, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value as Json};
use tracing::trace;

use crate::error::{HaygridError, Result};
use crate::grid::{Entity, Grid};
use crate::tagmap::TagMap;
use crate::value::{
    format_date, format_datetime_iso, format_f64, format_time, Coord, HsDateTime, Quantity, Ref,
    Value, XStr,
};
use crate::version::{Version, VER_3_0};

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^n:(-?\d+(\.\d+)?([eE][+\-]?\d+)?)( (.*))?$").unwrap());
static REF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^r:([a-zA-Z0-9_:\-.~]+)( (.*))?$").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^d:(\d{4}-\d{2}-\d{2})$").unwrap());
static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^h:(\d{2}:\d{2}(:\d{2}(\.\d+)?)?)$").unwrap());
static DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^t:(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+\-]\d{2}:\d{2}))( ([A-Za-z\-+_0-9]+))?$",
    )
    .unwrap()
});
static URI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^u:(.*)$").unwrap());
static BIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^b:(.+)$").unwrap());
static XSTR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^x:([a-zA-Z0-9_]+):(.*)$").unwrap());
static COORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^c:(-?\d+(\.\d+)?),(-?\d+(\.\d+)?)$").unwrap()
});

// ---------------------------------------------------------------------------
// Parsing

/// Parse a grid from its JSON envelope.
pub fn parse_grid(text: &str) -> Result<Grid> {
    let doc: Json = serde_json::from_str(text)?;
    let Json::Object(envelope) = doc else {
        return Err(HaygridError::parse("JSON grid must be an object", 1, 1));
    };
    grid_from_envelope(&envelope)
}

fn grid_from_envelope(envelope: &Map<String, Json>) -> Result<Grid> {
    let Some(Json::Object(meta)) = envelope.get("meta") else {
        return Err(HaygridError::parse("grid is missing its meta object", 1, 1));
    };
    let Some(Json::String(ver_text)) = meta.get("ver") else {
        return Err(HaygridError::parse("grid meta is missing the ver tag", 1, 1));
    };
    let version: Version = ver_text.parse()?;
    let grammar = version.nearest();
    trace!("parsing json grid at version {version}");

    let mut grid = Grid::with_version(version);
    for (key, item) in meta {
        if key == "ver" {
            continue;
        }
        let value = scalar_from_json(item, &grammar)?;
        if !value.is_null() {
            grid.meta.insert(key.clone(), value);
        }
    }

    let Some(Json::Array(cols)) = envelope.get("cols") else {
        return Err(HaygridError::parse("grid is missing its cols array", 1, 1));
    };
    for col in cols {
        let Json::Object(col) = col else {
            return Err(HaygridError::parse("column entry must be an object", 1, 1));
        };
        let Some(Json::String(name)) = col.get("name") else {
            return Err(HaygridError::parse("column entry is missing its name", 1, 1));
        };
        let mut col_meta = TagMap::new();
        for (key, item) in col {
            if key == "name" {
                continue;
            }
            let value = scalar_from_json(item, &grammar)?;
            if !value.is_null() {
                col_meta.insert(key.clone(), value);
            }
        }
        grid.columns.insert(name.clone(), col_meta);
    }

    let Some(Json::Array(rows)) = envelope.get("rows") else {
        return Err(HaygridError::parse("grid is missing its rows array", 1, 1));
    };
    for row in rows {
        let Json::Object(row) = row else {
            return Err(HaygridError::parse("row entry must be an object", 1, 1));
        };
        let mut entity = Entity::new();
        for (key, item) in row {
            let value = scalar_from_json(item, &grammar)?;
            if !value.is_null() {
                entity.insert(key.clone(), value);
            }
        }
        grid.push_row_unchecked(entity);
    }
    Ok(grid)
}

/// Parse one scalar given as a standalone JSON document.
pub fn parse_scalar(text: &str, version: &Version) -> Result<Value> {
    let doc: Json = serde_json::from_str(text)?;
    scalar_from_json(&doc, &version.nearest())
}

fn scalar_from_json(item: &Json, grammar: &Version) -> Result<Value> {
    match item {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => match n.as_f64() {
            Some(n) => Ok(Value::Number(n)),
            None => Err(HaygridError::Type(format!("unrepresentable number: {n}"))),
        },
        Json::Array(items) => {
            require_3_0(grammar, "Lists")?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(scalar_from_json(item, grammar)?);
            }
            Ok(Value::List(out))
        }
        Json::Object(map) => {
            require_3_0(grammar, "Dicts")?;
            // An embedded object with the envelope keys is a nested grid.
            if ["meta", "cols", "rows"].iter().all(|k| map.contains_key(*k)) {
                return Ok(Value::Grid(Box::new(grid_from_envelope(map)?)));
            }
            let mut dict = TagMap::new();
            for (key, item) in map {
                dict.insert(key.clone(), scalar_from_json(item, grammar)?);
            }
            Ok(Value::Dict(dict))
        }
        Json::String(text) => scalar_from_str(text, grammar),
    }
}

fn scalar_from_str(text: &str, grammar: &Version) -> Result<Value> {
    // Singleton forms are exact matches; `x:` must be tested before the
    // XStr pattern since both share the prefix.
    match text {
        "m:" => return Ok(Value::Marker),
        "x:" => return Ok(Value::Remove),
        "-:" => return Ok(Value::Remove),
        "z:" => {
            require_3_0(grammar, "NA")?;
            return Ok(Value::Na);
        }
        "n:INF" => return Ok(Value::Number(f64::INFINITY)),
        "n:-INF" => return Ok(Value::Number(f64::NEG_INFINITY)),
        "n:NaN" => return Ok(Value::Number(f64::NAN)),
        _ => {}
    }
    if let Some(caps) = NUMBER_RE.captures(text) {
        let number: f64 = caps[1]
            .parse()
            .map_err(|_| HaygridError::Type(format!("invalid number literal: {text:?}")))?;
        return Ok(match caps.get(5) {
            Some(unit) => Value::Quantity(Quantity::new(number, unit.as_str())),
            None => Value::Number(number),
        });
    }
    if let Some(rest) = text.strip_prefix("s:") {
        return Ok(Value::Str(rest.to_string()));
    }
    if let Some(caps) = REF_RE.captures(text) {
        let dis = caps.get(3).map(|m| m.as_str().to_string());
        return Ok(Value::Ref(Ref::new(&caps[1], dis)?));
    }
    if let Some(caps) = DATE_RE.captures(text) {
        return Ok(Value::Date(NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d")?));
    }
    if let Some(caps) = TIME_RE.captures(text) {
        let time = if caps.get(2).is_some() {
            NaiveTime::parse_from_str(&caps[1], "%H:%M:%S%.f")?
        } else {
            NaiveTime::parse_from_str(&caps[1], "%H:%M")?
        };
        return Ok(Value::Time(time));
    }
    if let Some(caps) = DATETIME_RE.captures(text) {
        let iso = DateTime::parse_from_rfc3339(&caps[1])?;
        let dt = match caps.get(6) {
            Some(zone) => HsDateTime::with_zone(iso, zone.as_str())?,
            None => HsDateTime::new(iso),
        };
        return Ok(Value::DateTime(dt));
    }
    if let Some(caps) = XSTR_RE.captures(text) {
        require_3_0(grammar, "XStr")?;
        return Ok(Value::XStr(XStr::new(&caps[1], &caps[2])?));
    }
    if let Some(caps) = URI_RE.captures(text) {
        return Ok(Value::Uri(caps[1].to_string()));
    }
    if let Some(caps) = BIN_RE.captures(text) {
        return Ok(Value::Bin(caps[1].to_string()));
    }
    if let Some(caps) = COORD_RE.captures(text) {
        let lat: f64 = caps[1]
            .parse()
            .map_err(|_| HaygridError::Type(format!("invalid coordinate: {text:?}")))?;
        let lng: f64 = caps[3]
            .parse()
            .map_err(|_| HaygridError::Type(format!("invalid coordinate: {text:?}")))?;
        return Ok(Value::Coord(Coord { lat, lng }));
    }
    Ok(Value::Str(text.to_string()))
}

fn require_3_0(grammar: &Version, what: &str) -> Result<()> {
    if *grammar < *VER_3_0 {
        return Err(HaygridError::Version(format!(
            "{what} are not supported in version {grammar}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Dumping

/// Dump a grid as its JSON envelope.
pub fn dump_grid(grid: &Grid) -> Result<String> {
    Ok(serde_json::to_string(&grid_to_envelope(grid)?)?)
}

fn grid_to_envelope(grid: &Grid) -> Result<Json> {
    let version = grid.version();
    let mut meta = Map::with_capacity(grid.meta().len() + 1);
    meta.insert("ver".to_string(), Json::String(version.to_string()));
    for (key, value) in grid.meta().iter() {
        meta.insert(key.to_string(), scalar_to_json(value, version)?);
    }
    let mut cols = Vec::with_capacity(grid.columns().len());
    for (name, col_meta) in grid.columns().iter() {
        let mut col = Map::with_capacity(col_meta.len() + 1);
        col.insert("name".to_string(), Json::String(name.to_string()));
        for (key, value) in col_meta.iter() {
            col.insert(key.to_string(), scalar_to_json(value, version)?);
        }
        cols.push(Json::Object(col));
    }
    let mut rows = Vec::with_capacity(grid.len());
    for entity in grid.iter() {
        // Only the tags the row actually carries, in catalog order.
        let mut row = Map::new();
        for name in grid.columns().keys() {
            if let Some(value) = entity.get(name) {
                row.insert(name.to_string(), scalar_to_json(value, version)?);
            }
        }
        rows.push(Json::Object(row));
    }
    let mut envelope = Map::with_capacity(3);
    envelope.insert("meta".to_string(), Json::Object(meta));
    envelope.insert("cols".to_string(), Json::Array(cols));
    envelope.insert("rows".to_string(), Json::Array(rows));
    Ok(Json::Object(envelope))
}

/// Dump one scalar as a standalone JSON document.
pub fn dump_scalar(value: &Value, version: &Version) -> Result<String> {
    Ok(serde_json::to_string(&scalar_to_json(value, version)?)?)
}

fn scalar_to_json(value: &Value, version: &Version) -> Result<Json> {
    if *value.required_version() > version.nearest() {
        return Err(HaygridError::Version(format!(
            "version {version} does not support {}",
            value.kind()
        )));
    }
    Ok(match value {
        Value::Null => Json::Null,
        Value::Marker => Json::String("m:".to_string()),
        Value::Remove => {
            if version.nearest() < *VER_3_0 {
                Json::String("x:".to_string())
            } else {
                Json::String("-:".to_string())
            }
        }
        Value::Na => Json::String("z:".to_string()),
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => match serde_json::Number::from_f64(*n) {
            Some(n) => Json::Number(n),
            // Non-finite numbers fall back to the prefixed string form.
            None => Json::String(format!("n:{}", format_f64(*n))),
        },
        Value::Quantity(q) => {
            if q.unit.is_empty() {
                Json::String(format!("n:{}", format_f64(q.value)))
            } else {
                Json::String(format!("n:{} {}", format_f64(q.value), q.unit))
            }
        }
        Value::Str(text) => Json::String(format!("s:{text}")),
        Value::Uri(uri) => Json::String(format!("u:{uri}")),
        Value::Bin(mime) => Json::String(format!("b:{mime}")),
        Value::XStr(xstr) => Json::String(format!("x:{}:{}", xstr.encoding, xstr.text())),
        Value::Ref(r) => match &r.dis {
            Some(dis) => Json::String(format!("r:{} {dis}", r.name)),
            None => Json::String(format!("r:{}", r.name)),
        },
        Value::Coord(c) => {
            Json::String(format!("c:{},{}", format_f64(c.lat), format_f64(c.lng)))
        }
        Value::Date(date) => Json::String(format!("d:{}", format_date(date))),
        Value::Time(time) => Json::String(format!("h:{}", format_time(time))),
        Value::DateTime(dt) => Json::String(format!(
            "t:{} {}",
            format_datetime_iso(&dt.value),
            dt.zone_name()?
        )),
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(scalar_to_json(item, version)?);
            }
            Json::Array(out)
        }
        Value::Dict(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, item) in map.iter() {
                out.insert(key.to_string(), scalar_to_json(item, version)?);
            }
            Json::Object(out)
        }
        Value::Grid(grid) => grid_to_envelope(grid)?,
    })
}
