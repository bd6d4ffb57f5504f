//! The tag value model.
//!
//! Every tag value is one of the kinds in [`Value`], a closed sum type.
//! Singleton kinds (Null, Marker, Remove, Na) are unit variants, so
//! identity is a non-question. Codecs match exhaustively over this enum;
//! adding a kind is a compile-visible event in every format.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{HaygridError, Result};
use crate::tagmap::TagMap;
use crate::units::resolve_unit;
use crate::version::{Version, VER_2_0, VER_3_0};
use crate::grid::Grid;
use crate::zoneinfo;

static REF_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_:\-.~]+$").unwrap());

/// An entity identifier. Equality, ordering, and hashing use the name
/// only; the display text is presentation.
#[derive(Debug, Clone)]
pub struct Ref {
    pub name: String,
    pub dis: Option<String>,
}

impl Ref {
    pub fn new(name: &str, dis: Option<String>) -> Result<Self> {
        let name = name.strip_prefix('@').unwrap_or(name);
        if !REF_NAME_RE.is_match(name) {
            return Err(HaygridError::Type(format!("invalid ref name: {name:?}")));
        }
        Ok(Ref {
            name: name.to_string(),
            dis,
        })
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Ref {}

impl PartialOrd for Ref {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ref {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl Hash for Ref {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)
    }
}

/// A number with a unit. `symbol` is the unit text as written, `unit` its
/// canonical form; equality compares value and canonical unit.
#[derive(Debug, Clone)]
pub struct Quantity {
    pub value: f64,
    pub unit: String,
    pub symbol: String,
}

impl Quantity {
    pub fn new(value: f64, symbol: &str) -> Self {
        Quantity {
            value,
            unit: resolve_unit(symbol).to_string(),
            symbol: symbol.to_string(),
        }
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.unit == other.unit
    }
}

/// Extended string: an encoding tag plus the decoded payload. `hex` and
/// `b64` decode on construction; any other tag keeps the literal bytes.
/// Equality compares the payload only.
#[derive(Debug, Clone)]
pub struct XStr {
    pub encoding: String,
    pub data: Vec<u8>,
}

impl XStr {
    pub fn new(encoding: &str, text: &str) -> Result<Self> {
        let data = match encoding {
            "hex" => hex::decode(text)
                .map_err(|err| HaygridError::Type(format!("invalid hex payload: {err}")))?,
            "b64" => BASE64
                .decode(text)
                .map_err(|err| HaygridError::Type(format!("invalid base64 payload: {err}")))?,
            _ => text.as_bytes().to_vec(),
        };
        Ok(XStr {
            encoding: encoding.to_string(),
            data,
        })
    }

    /// Re-encode the payload in this XStr's encoding.
    pub fn text(&self) -> String {
        match self.encoding.as_str() {
            "hex" => hex::encode(&self.data),
            "b64" => BASE64.encode(&self.data),
            _ => String::from_utf8_lossy(&self.data).into_owned(),
        }
    }
}

impl PartialEq for XStr {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Coord {
    pub lat: f64,
    pub lng: f64,
}

/// A zoned timestamp. `value` carries the instant and local offset; `tz`
/// is the Haystack zone name when one is known. Equality compares the
/// instant, so a zone-less timestamp equals its zoned equivalent.
#[derive(Debug, Clone)]
pub struct HsDateTime {
    pub value: DateTime<FixedOffset>,
    pub tz: Option<String>,
}

impl HsDateTime {
    pub fn new(value: DateTime<FixedOffset>) -> Self {
        HsDateTime { value, tz: None }
    }

    /// Attach a Haystack zone: the instant is preserved and the offset
    /// becomes the zone's local offset at that instant.
    pub fn with_zone(value: DateTime<FixedOffset>, zone: &str) -> Result<Self> {
        let tz = zoneinfo::timezone(zone)?;
        Ok(HsDateTime {
            value: value.with_timezone(&tz).fixed_offset(),
            tz: Some(zone.to_string()),
        })
    }

    /// The zone name for dumping: the known name, else a name recovered
    /// from the offset.
    pub fn zone_name(&self) -> Result<String> {
        match &self.tz {
            Some(name) => Ok(name.clone()),
            None => zoneinfo::timezone_name_for_offset(*self.value.offset(), self.value.naive_utc()),
        }
    }
}

impl PartialEq for HsDateTime {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Marker,
    Remove,
    Na,
    Bool(bool),
    Number(f64),
    Quantity(Quantity),
    Str(String),
    Uri(String),
    /// MIME type; 2.0 binary blob tag.
    Bin(String),
    XStr(XStr),
    Ref(Ref),
    Coord(Coord),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(HsDateTime),
    List(Vec<Value>),
    Dict(TagMap<Value>),
    Grid(Box<Grid>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Marker => "Marker",
            Value::Remove => "Remove",
            Value::Na => "NA",
            Value::Bool(_) => "Bool",
            Value::Number(_) => "Number",
            Value::Quantity(_) => "Quantity",
            Value::Str(_) => "Str",
            Value::Uri(_) => "Uri",
            Value::Bin(_) => "Bin",
            Value::XStr(_) => "XStr",
            Value::Ref(_) => "Ref",
            Value::Coord(_) => "Coord",
            Value::Date(_) => "Date",
            Value::Time(_) => "Time",
            Value::DateTime(_) => "DateTime",
            Value::List(_) => "List",
            Value::Dict(_) => "Dict",
            Value::Grid(_) => "Grid",
        }
    }

    /// The lowest grammar level that can represent this value.
    pub fn required_version(&self) -> &'static Version {
        match self {
            Value::Na | Value::List(_) | Value::Dict(_) | Value::Grid(_) => &VER_3_0,
            _ => &VER_2_0,
        }
    }

    /// Tolerant equality used by grid comparison: numeric kinds within
    /// 1e-6, time-of-day truncated to whole seconds, dates exact,
    /// composites recurse, everything else exact.
    pub fn approx_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => approx_f64(*a, *b),
            (Value::Quantity(a), Value::Quantity(b)) => {
                a.unit == b.unit && approx_f64(a.value, b.value)
            }
            (Value::Time(a), Value::Time(b)) => {
                a.with_nanosecond(0) == b.with_nanosecond(0)
            }
            (Value::DateTime(a), Value::DateTime(b)) => {
                let (a, b) = (a.value.naive_utc(), b.value.naive_utc());
                a.date() == b.date()
                    && a.time().with_nanosecond(0) == b.time().with_nanosecond(0)
            }
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.approx_eq(y))
            }
            (Value::Dict(a), Value::Dict(b)) => approx_dict(a, b),
            (Value::Grid(a), Value::Grid(b)) => a == b,
            _ => self == other,
        }
    }
}

fn approx_f64(a: f64, b: f64) -> bool {
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    if a.is_nan() || b.is_nan() {
        return a.is_nan() && b.is_nan();
    }
    (a - b).abs() < 1e-6
}

fn approx_dict(a: &TagMap<Value>, b: &TagMap<Value>) -> bool {
    a.len() == b.len()
        && a.iter().all(|(key, left)| match b.get(key) {
            Some(right) => left.approx_eq(right),
            None => false,
        })
}

/// Ordering for filter comparisons. Only same-kind pairs order, and
/// quantities additionally require the same canonical unit.
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Quantity(a), Value::Quantity(b)) if a.unit == b.unit => {
                a.value.partial_cmp(&b.value)
            }
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Uri(a), Value::Uri(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.value.cmp(&b.value)),
            (Value::Ref(a), Value::Ref(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Scalar text for a float: `INF`, `-INF`, `NaN`, or the shortest
/// decimal round-trip form.
pub(crate) fn format_f64(value: f64) -> String {
    if value == f64::INFINITY {
        "INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{value}")
    }
}

pub(crate) fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn format_time(time: &NaiveTime) -> String {
    if time.nanosecond() == 0 {
        time.format("%H:%M:%S").to_string()
    } else {
        time.format("%H:%M:%S%.f").to_string()
    }
}

/// ISO-8601 text with `Z` for a zero offset.
pub(crate) fn format_datetime_iso(value: &DateTime<FixedOffset>) -> String {
    let local = value.naive_local();
    let base = if local.nanosecond() == 0 {
        local.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        local.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
    };
    let secs = value.offset().local_minus_utc();
    if secs == 0 {
        format!("{base}Z")
    } else {
        let sign = if secs < 0 { '-' } else { '+' };
        let abs = secs.unsigned_abs();
        format!("{base}{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60)
    }
}
