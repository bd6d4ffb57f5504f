//! # haygrid
//!
//! A Rust implementation of the Project Haystack tagged-entity data model:
//! grids of entities, five interchangeable text codecs, a grid diff/merge
//! algebra, and the Haystack filter language.
//!
//! ## Overview
//!
//! Haystack data is a set of entities, each a bag of named tags whose
//! values come from a closed set of kinds (markers, numbers with units,
//! refs, zoned timestamps, nested collections, ...). Entities travel in
//! **grids**: ordered rows plus grid-level metadata and a column catalog.
//! haygrid models that as:
//!
//! - **[`Value`]**: the tag value sum type (19 kinds)
//! - **[`Grid`]**: metadata + column catalog + rows, with an id index over
//!   rows that carry a Ref-valued `id` tag
//! - **[`codec`]**: Zinc, Trio, JSON, Hayson, and CSV parse/dump, all
//!   through one [`codec::Format`] dispatch
//! - **[`diff`]**: difference and merge of grids, built for round-tripping
//!   edits (`merge(base, &diff(&base, &target)) ≈ target`)
//! - **[`filter`]**: the Haystack filter language with `->` ref traversal,
//!   compiled through a bounded global cache
//!
//! ## Version policy
//!
//! Grids carry a grammar version (2.0 or 3.0). A grid built from a
//! document with a `ver` header is **pinned** to it, and inserting a value
//! the version cannot represent (NA, lists, dicts, nested grids need 3.0)
//! is an error. A grid built through [`Grid::new`] starts at an inferred
//! 2.0 and silently upgrades when a 3.0 value arrives.
//!
//! ## Quick Start
//!
//! ```rust
//! use haygrid::codec::{self, Format};
//! use haygrid::Result;
//!
//! fn main() -> Result<()> {
//!     let zinc = "ver:\"3.0\"\nid,dis,area\n@a,\"Site A\",1500ft\u{b2}\n@b,\"Site B\",\n";
//!     let grid = codec::parse(zinc, Format::Zinc)?;
//!     assert_eq!(grid.len(), 2);
//!
//!     // Filter rows and re-dump in another format.
//!     let big = grid.filter("area >= 1000ft\u{b2}", 0)?;
//!     assert_eq!(big.len(), 1);
//!     let json = codec::dump(&big, Format::Json)?;
//!     assert!(json.contains("\"n:1500 ft\u{b2}\""));
//!     Ok(())
//! }
//! ```
//!
//! ### Diff and merge
//!
//! ```rust
//! use haygrid::codec::{self, Format};
//! use haygrid::{diff, merge, Result};
//!
//! fn main() -> Result<()> {
//!     let base = codec::parse("ver:\"3.0\"\nid,dis\n@a,\"Old\"\n", Format::Zinc)?;
//!     let target = codec::parse("ver:\"3.0\"\nid,dis\n@a,\"New\"\n", Format::Zinc)?;
//!     let patch = diff(&base, &target);
//!     assert!(patch.meta().contains_key("diff_"));
//!     assert_eq!(merge(base, &patch)?, target);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Guide
//!
//! Start with [`codec`] to get data in and out, [`Grid`] for the container
//! API, [`filter`] for row selection, and [`diff`]/[`merge`] for change
//! tracking. [`version`] and [`zoneinfo`] back the codecs with the grammar
//! version policy and the Haystack timezone name table.

pub mod codec;
pub mod diff;
pub mod error;
pub mod filter;
pub mod grid;
pub mod tagmap;
#[cfg(test)]
mod tests;
pub mod units;
pub mod value;
pub mod version;
pub mod zoneinfo;

pub use diff::{diff, merge};
pub use error::*;
pub use filter::Filter;
pub use grid::{Entity, Grid, RowKey};
pub use tagmap::TagMap;
pub use value::{Coord, HsDateTime, Quantity, Ref, Value, XStr};
pub use version::Version;
