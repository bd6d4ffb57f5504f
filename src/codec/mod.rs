//! Format codecs and dispatch.
//!
//! Every format implements the same four entry points: grid parse/dump and
//! standalone scalar parse/dump. [`Format`] selects between them with an
//! exhaustive match, so adding a format touches every dispatch site.

use std::fmt;
use std::str::FromStr;

use crate::error::{HaygridError, Result};
use crate::grid::Grid;
use crate::value::Value;
use crate::version::Version;

pub mod csv;
pub mod hayson;
pub mod json;
pub mod trio;
pub mod zinc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Zinc,
    Trio,
    Json,
    Hayson,
    Csv,
}

impl Format {
    /// Look up a format by file name suffix. `.hayson.json` must win over
    /// the plain `.json` suffix.
    pub fn from_suffix(name: &str) -> Option<Format> {
        let name = name.to_ascii_lowercase();
        if name.ends_with(".hayson.json") {
            return Some(Format::Hayson);
        }
        if name.ends_with(".zinc") {
            Some(Format::Zinc)
        } else if name.ends_with(".trio") {
            Some(Format::Trio)
        } else if name.ends_with(".json") {
            Some(Format::Json)
        } else if name.ends_with(".csv") {
            Some(Format::Csv)
        } else {
            None
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Format::Zinc => ".zinc",
            Format::Trio => ".trio",
            Format::Json => ".json",
            Format::Hayson => ".hayson.json",
            Format::Csv => ".csv",
        }
    }

    /// Look up a format by MIME type; parameters after `;` are ignored.
    pub fn from_mime(mime: &str) -> Option<Format> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence {
            "text/zinc" => Some(Format::Zinc),
            "text/trio" => Some(Format::Trio),
            "application/json" => Some(Format::Json),
            "application/vnd.haystack+json" => Some(Format::Hayson),
            "text/csv" => Some(Format::Csv),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Format::Zinc => "text/zinc",
            Format::Trio => "text/trio",
            Format::Json => "application/json",
            Format::Hayson => "application/vnd.haystack+json",
            Format::Csv => "text/csv",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Zinc => "zinc",
            Format::Trio => "trio",
            Format::Json => "json",
            Format::Hayson => "hayson",
            Format::Csv => "csv",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Format {
    type Err = HaygridError;

    fn from_str(s: &str) -> Result<Format> {
        match s.to_ascii_lowercase().as_str() {
            "zinc" => Ok(Format::Zinc),
            "trio" => Ok(Format::Trio),
            "json" => Ok(Format::Json),
            "hayson" => Ok(Format::Hayson),
            "csv" => Ok(Format::Csv),
            other => Err(HaygridError::Codec(format!("unknown format: {other:?}"))),
        }
    }
}

/// Parse a grid in the given format. A leading UTF-8 BOM is stripped.
pub fn parse(text: &str, format: Format) -> Result<Grid> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    match format {
        Format::Zinc => zinc::parse_grid(text),
        Format::Trio => trio::parse_grid(text),
        Format::Json => json::parse_grid(text),
        Format::Hayson => hayson::parse_grid(text),
        Format::Csv => csv::parse_grid(text),
    }
}

/// Dump a grid in the given format.
pub fn dump(grid: &Grid, format: Format) -> Result<String> {
    match format {
        Format::Zinc => zinc::dump_grid(grid),
        Format::Trio => trio::dump_grid(grid),
        Format::Json => json::dump_grid(grid),
        Format::Hayson => hayson::dump_grid(grid),
        Format::Csv => csv::dump_grid(grid),
    }
}

/// Parse one standalone scalar in the given format at a grammar level.
pub fn parse_scalar(text: &str, format: Format, version: &Version) -> Result<Value> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    match format {
        Format::Zinc => zinc::parse_scalar(text, version),
        Format::Trio => trio::parse_scalar(text, version),
        Format::Json => json::parse_scalar(text, version),
        Format::Hayson => hayson::parse_scalar(text, version),
        Format::Csv => csv::parse_scalar(text, version),
    }
}

/// Dump one standalone scalar in the given format at a grammar level.
pub fn dump_scalar(value: &Value, format: Format, version: &Version) -> Result<String> {
    match format {
        Format::Zinc => zinc::dump_scalar(value, version),
        Format::Trio => trio::dump_scalar(value, version),
        Format::Json => json::dump_scalar(value, version),
        Format::Hayson => hayson::dump_scalar(value, version),
        Format::Csv => csv::dump_scalar(value, version),
    }
}
