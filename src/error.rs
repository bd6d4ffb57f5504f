use http::status::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum HaygridError {
    #[error("Codec software error: {0}")]
    Codec(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("Parse error at line {line}, col {col}: {message}")]
    Parse {
        message: String,
        line: usize,
        col: usize,
    },
    #[error("Invalid column selector: {0}")]
    Selector(String),
    #[error("Unresolvable timezone: {0}")]
    Timezone(String),
    #[error("Type error: {0}")]
    Type(String),
    #[error("Version error: {0}")]
    Version(String),
}

impl HaygridError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HaygridError::Codec(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HaygridError::NotFound(_) => StatusCode::NOT_FOUND,
            HaygridError::Parse { .. } => StatusCode::BAD_REQUEST,
            HaygridError::Selector(_) => StatusCode::BAD_REQUEST,
            HaygridError::Timezone(_) => StatusCode::BAD_REQUEST,
            HaygridError::Type(_) => StatusCode::BAD_REQUEST,
            HaygridError::Version(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Parse failure with position information but no source window.
    pub fn parse<S: Into<String>>(message: S, line: usize, col: usize) -> Self {
        HaygridError::Parse {
            message: message.into(),
            line,
            col,
        }
    }

    /// Parse failure carrying a framed window of the offending source with a
    /// column pointer, matching the layout codec callers log and surface.
    pub fn parse_in_source(message: &str, source: &str, line: usize, col: usize) -> Self {
        const WINDOW: usize = 3;
        let lines: Vec<&str> = source.lines().collect();
        let first = line.saturating_sub(1 + WINDOW);
        let last = (line + WINDOW).min(lines.len());
        let width = lines[first..last]
            .iter()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0)
            .max(col)
            + 2;
        let mut framed = String::new();
        framed.push_str(&format!("+{}+\n", "-".repeat(width)));
        for (offset, text) in lines[first..last].iter().enumerate() {
            framed.push_str(&format!("|{text}\n"));
            if first + offset + 1 == line {
                framed.push_str(&format!("|{}^\n", " ".repeat(col.saturating_sub(1))));
            }
        }
        framed.push_str(&format!("+{}+", "-".repeat(width)));
        HaygridError::Parse {
            message: format!("{message}\n{framed}"),
            line,
            col,
        }
    }
}

impl From<JsonError> for HaygridError {
    fn from(err: JsonError) -> Self {
        HaygridError::parse(err.to_string(), err.line(), err.column())
    }
}

impl From<chrono::ParseError> for HaygridError {
    fn from(err: chrono::ParseError) -> Self {
        HaygridError::Type(format!("invalid date/time literal: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, HaygridError>;
