//! Hayson codec (kind-discriminated JSON encoding).
//!
//! Hayson carries strings, booleans, finite numbers, lists, and dicts as
//! native JSON, and wraps every other kind in an object with a `_kind`
//! discriminator (`{"_kind": "Ref", "val": "a"}`). A plain object with no
//! `_kind` is a Dict, unless it has the `meta`/`cols`/`rows` envelope keys,
//! in which case it is a nested grid.

use chrono::{DateTime, NaiveDate, NaiveTime};
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

// ---------------------------------------------------------------------------
// Parsing

/// Parse a grid from its Hayson envelope.
pub fn parse_grid(text: &str) -> Result<Grid> {
    let doc: Json = serde_json::from_str(text)?;
    let Json::Object(envelope) = doc else {
        return Err(HaygridError::parse("Hayson grid must be an object", 1, 1));
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
    trace!("parsing hayson grid at version {version}");

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

/// Parse one scalar given as a standalone Hayson document.
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
        Json::String(text) => Ok(Value::Str(text.clone())),
        Json::Array(items) => {
            require_3_0(grammar, "Lists")?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(scalar_from_json(item, grammar)?);
            }
            Ok(Value::List(out))
        }
        Json::Object(map) => match map.get("_kind") {
            Some(Json::String(kind)) => kind_from_json(kind, map, grammar),
            Some(other) => Err(HaygridError::Type(format!(
                "_kind must be a string, got {other}"
            ))),
            None => {
                if ["meta", "cols", "rows"].iter().all(|k| map.contains_key(*k)) {
                    return Ok(Value::Grid(Box::new(grid_from_envelope(map)?)));
                }
                require_3_0(grammar, "Dicts")?;
                let mut dict = TagMap::new();
                for (key, item) in map {
                    dict.insert(key.clone(), scalar_from_json(item, grammar)?);
                }
                Ok(Value::Dict(dict))
            }
        },
    }
}

fn kind_from_json(kind: &str, map: &Map<String, Json>, grammar: &Version) -> Result<Value> {
    match kind {
        "Marker" => Ok(Value::Marker),
        "Remove" => Ok(Value::Remove),
        "NA" => {
            require_3_0(grammar, "NA")?;
            Ok(Value::Na)
        }
        "Num" => {
            let number = match map.get("val") {
                Some(Json::Number(n)) => n.as_f64().ok_or_else(|| {
                    HaygridError::Type(format!("unrepresentable number: {n}"))
                })?,
                Some(Json::String(text)) => match text.as_str() {
                    "INF" => f64::INFINITY,
                    "-INF" => f64::NEG_INFINITY,
                    "NaN" => f64::NAN,
                    other => {
                        return Err(HaygridError::Type(format!(
                            "invalid Num val: {other:?}"
                        )))
                    }
                },
                other => return Err(bad_field(kind, "val", other)),
            };
            match map.get("unit") {
                Some(Json::String(unit)) => Ok(Value::Quantity(Quantity::new(number, unit))),
                None | Some(Json::Null) => Ok(Value::Number(number)),
                other => Err(bad_field(kind, "unit", other)),
            }
        }
        "Ref" => {
            let name = string_field(kind, map, "val")?;
            let dis = match map.get("dis") {
                Some(Json::String(dis)) => Some(dis.clone()),
                None | Some(Json::Null) => None,
                other => return Err(bad_field(kind, "dis", other)),
            };
            Ok(Value::Ref(Ref::new(&name, dis)?))
        }
        "Date" => {
            let text = string_field(kind, map, "val")?;
            Ok(Value::Date(NaiveDate::parse_from_str(&text, "%Y-%m-%d")?))
        }
        "Time" => {
            let text = string_field(kind, map, "val")?;
            let time = NaiveTime::parse_from_str(&text, "%H:%M:%S%.f")
                .or_else(|_| NaiveTime::parse_from_str(&text, "%H:%M"))?;
            Ok(Value::Time(time))
        }
        "DateTime" => {
            let text = string_field(kind, map, "val")?;
            let iso = DateTime::parse_from_rfc3339(&text)?;
            let dt = match map.get("tz") {
                Some(Json::String(zone)) => HsDateTime::with_zone(iso, zone)?,
                None | Some(Json::Null) => HsDateTime::new(iso),
                other => return Err(bad_field(kind, "tz", other)),
            };
            Ok(Value::DateTime(dt))
        }
        "Uri" => Ok(Value::Uri(string_field(kind, map, "val")?)),
        "Bin" => Ok(Value::Bin(string_field(kind, map, "val")?)),
        "XStr" => {
            require_3_0(grammar, "XStr")?;
            let encoding = string_field(kind, map, "type")?;
            let data = string_field(kind, map, "val")?;
            Ok(Value::XStr(XStr::new(&encoding, &data)?))
        }
        "Coord" => {
            let lat = number_field(kind, map, "lat")?;
            let lng = number_field(kind, map, "lng")?;
            Ok(Value::Coord(Coord { lat, lng }))
        }
        other => Err(HaygridError::Type(format!("unknown _kind: {other:?}"))),
    }
}

fn string_field(kind: &str, map: &Map<String, Json>, field: &str) -> Result<String> {
    match map.get(field) {
        Some(Json::String(text)) => Ok(text.clone()),
        other => Err(bad_field(kind, field, other)),
    }
}

fn number_field(kind: &str, map: &Map<String, Json>, field: &str) -> Result<f64> {
    match map.get(field) {
        Some(Json::Number(n)) => n
            .as_f64()
            .ok_or_else(|| HaygridError::Type(format!("unrepresentable number: {n}"))),
        other => Err(bad_field(kind, field, other)),
    }
}

fn bad_field(kind: &str, field: &str, value: Option<&Json>) -> HaygridError {
    match value {
        Some(value) => HaygridError::Type(format!("invalid {kind} {field}: {value}")),
        None => HaygridError::Type(format!("{kind} is missing its {field}")),
    }
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

/// Dump a grid as its Hayson envelope. The column catalog must not be
/// empty; call [`Grid::extends_columns`] first for catalog-less grids.
pub fn dump_grid(grid: &Grid) -> Result<String> {
    Ok(serde_json::to_string(&grid_to_envelope(grid)?)?)
}

fn grid_to_envelope(grid: &Grid) -> Result<Json> {
    if grid.columns().is_empty() {
        return Err(HaygridError::Codec(
            "cannot dump a grid with no columns; use extends_columns first".to_string(),
        ));
    }
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

/// Dump one scalar as a standalone Hayson document.
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
        Value::Marker => kind_object("Marker"),
        Value::Remove => kind_object("Remove"),
        Value::Na => kind_object("NA"),
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => number_to_json(*n, None),
        Value::Quantity(q) => {
            if q.symbol.is_empty() {
                number_to_json(q.value, None)
            } else {
                number_to_json(q.value, Some(&q.symbol))
            }
        }
        Value::Str(text) => Json::String(text.clone()),
        Value::Uri(uri) => kind_with_val("Uri", Json::String(uri.clone())),
        Value::Bin(mime) => kind_with_val("Bin", Json::String(mime.clone())),
        Value::XStr(xstr) => {
            let mut map = Map::with_capacity(3);
            map.insert("_kind".to_string(), Json::String("XStr".to_string()));
            map.insert("type".to_string(), Json::String(xstr.encoding.clone()));
            map.insert("val".to_string(), Json::String(xstr.text()));
            Json::Object(map)
        }
        Value::Ref(r) => {
            let mut map = Map::with_capacity(3);
            map.insert("_kind".to_string(), Json::String("Ref".to_string()));
            map.insert("val".to_string(), Json::String(r.name.clone()));
            if let Some(dis) = &r.dis {
                map.insert("dis".to_string(), Json::String(dis.clone()));
            }
            Json::Object(map)
        }
        Value::Coord(c) => {
            let mut map = Map::with_capacity(3);
            map.insert("_kind".to_string(), Json::String("Coord".to_string()));
            map.insert("lat".to_string(), finite_number(c.lat)?);
            map.insert("lng".to_string(), finite_number(c.lng)?);
            Json::Object(map)
        }
        Value::Date(date) => kind_with_val("Date", Json::String(format_date(date))),
        Value::Time(time) => kind_with_val("Time", Json::String(format_time(time))),
        Value::DateTime(dt) => {
            let mut map = Map::with_capacity(3);
            map.insert("_kind".to_string(), Json::String("DateTime".to_string()));
            map.insert(
                "val".to_string(),
                Json::String(format_datetime_iso(&dt.value)),
            );
            map.insert("tz".to_string(), Json::String(dt.zone_name()?));
            Json::Object(map)
        }
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

fn kind_object(kind: &str) -> Json {
    let mut map = Map::with_capacity(1);
    map.insert("_kind".to_string(), Json::String(kind.to_string()));
    Json::Object(map)
}

fn kind_with_val(kind: &str, val: Json) -> Json {
    let mut map = Map::with_capacity(2);
    map.insert("_kind".to_string(), Json::String(kind.to_string()));
    map.insert("val".to_string(), val);
    Json::Object(map)
}

/// Finite numbers are native JSON; INF and NaN wrap in a `Num` object.
fn number_to_json(number: f64, unit: Option<&str>) -> Json {
    if number.is_finite() && unit.is_none() {
        return match serde_json::Number::from_f64(number) {
            Some(n) => Json::Number(n),
            None => Json::Null,
        };
    }
    let mut map = Map::with_capacity(3);
    map.insert("_kind".to_string(), Json::String("Num".to_string()));
    let val = match serde_json::Number::from_f64(number) {
        Some(n) => Json::Number(n),
        None => Json::String(format_f64(number)),
    };
    map.insert("val".to_string(), val);
    if let Some(unit) = unit {
        map.insert("unit".to_string(), Json::String(unit.to_string()));
    }
    Json::Object(map)
}

fn finite_number(number: f64) -> Result<Json> {
    serde_json::Number::from_f64(number)
        .map(Json::Number)
        .ok_or_else(|| HaygridError::Type("coordinate must be finite".to_string()))
}
