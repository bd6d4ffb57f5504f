//! Grid format version handling.
//!
//! Versions are dotted numeric groups with optional trailing text, e.g.
//! `2.0`, `3.0`, `3.0rc1`. Ordering zero-pads the shorter group list and
//! breaks ties on the trailing text, text-less versions sorting first.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::error::{HaygridError, Result};

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d[\d.]*)([^\d].*)?$").unwrap());

#[derive(Debug, Clone)]
pub struct Version {
    numbers: Vec<u64>,
    extra: Option<String>,
}

/// Equality agrees with [`Ord`]: `3` and `3.0` are the same version.
impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Trailing zero groups do not take part in equality.
        let len = self
            .numbers
            .iter()
            .rposition(|n| *n != 0)
            .map_or(0, |pos| pos + 1);
        self.numbers[..len].hash(state);
        self.extra.hash(state);
    }
}

impl Version {
    pub fn new(numbers: &[u64]) -> Self {
        Version {
            numbers: numbers.to_vec(),
            extra: None,
        }
    }

    pub fn numbers(&self) -> &[u64] {
        &self.numbers
    }

    pub fn extra(&self) -> Option<&str> {
        self.extra.as_deref()
    }

    /// Map this version to the nearest officially supported one. Exact
    /// matches pass through silently; anything else raises a compatibility
    /// warning and picks the highest official version not above this one,
    /// or the lowest official version when nothing qualifies.
    pub fn nearest(&self) -> Version {
        if OFFICIAL_VERSIONS.contains(self) {
            return self.clone();
        }
        for official in OFFICIAL_VERSIONS.iter().rev() {
            if official <= self {
                warn!(
                    "Version {} is not an official version, interpreting as {}",
                    self, official
                );
                return official.clone();
            }
        }
        let lowest = &OFFICIAL_VERSIONS[0];
        warn!(
            "Version {} is older than the oldest supported version {}, \
             data may not parse correctly",
            self, lowest
        );
        lowest.clone()
    }
}

impl FromStr for Version {
    type Err = HaygridError;

    fn from_str(text: &str) -> Result<Self> {
        let caps = VERSION_RE
            .captures(text)
            .ok_or_else(|| HaygridError::Version(format!("not a valid version: {text:?}")))?;
        let mut numbers = Vec::new();
        for group in caps[1].split('.') {
            if group.is_empty() {
                return Err(HaygridError::Version(format!(
                    "not a valid version: {text:?}"
                )));
            }
            numbers.push(group.parse::<u64>().map_err(|err| {
                HaygridError::Version(format!("not a valid version: {text:?} ({err})"))
            })?);
        }
        Ok(Version {
            numbers,
            extra: caps.get(2).map(|m| m.as_str().to_string()),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .numbers
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(".");
        match &self.extra {
            Some(extra) => write!(f, "{joined}{extra}"),
            None => write!(f, "{joined}"),
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let width = self.numbers.len().max(other.numbers.len());
        for pos in 0..width {
            let left = self.numbers.get(pos).copied().unwrap_or(0);
            let right = other.numbers.get(pos).copied().unwrap_or(0);
            match left.cmp(&right) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        match (&self.extra, &other.extra) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(left), Some(right)) => left.cmp(right),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub static VER_2_0: Lazy<Version> = Lazy::new(|| Version::new(&[2, 0]));
pub static VER_3_0: Lazy<Version> = Lazy::new(|| Version::new(&[3, 0]));

/// Officially supported grammar levels, in ascending order.
pub static OFFICIAL_VERSIONS: Lazy<Vec<Version>> =
    Lazy::new(|| vec![Version::new(&[2, 0]), Version::new(&[3, 0])]);
