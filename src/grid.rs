//! The grid: version, grid metadata, ordered column catalog, rows, and a
//! Ref index over rows carrying an `id` tag.
//!
//! The index is owned by the mutation API. Rows are handed out by shared
//! reference; replacing or removing a row goes through [`Grid::replace`],
//! [`Grid::pop`], and friends, which keep the index consistent. `Clone` is
//! the deep-copy operation.
//!
//! A grid's version is either pinned (given at construction or parsed
//! from a document) or inferred: inferred grids start at 2.0 and upgrade
//! silently when a value needs a newer grammar level, pinned grids reject
//! such values with a version error.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use tracing::warn;

use crate::error::{HaygridError, Result};
use crate::tagmap::TagMap;
use crate::value::{Ref, Value};
use crate::version::{Version, VER_2_0};

/// One row: an ordered tag map.
pub type Entity = TagMap<Value>;

/// A row key for deletion: positional or by entity id.
#[derive(Debug, Clone, PartialEq)]
pub enum RowKey {
    Index(usize),
    Id(Ref),
}

impl From<usize> for RowKey {
    fn from(pos: usize) -> Self {
        RowKey::Index(pos)
    }
}

impl From<Ref> for RowKey {
    fn from(id: Ref) -> Self {
        RowKey::Id(id)
    }
}

#[derive(Debug, Clone)]
pub struct Grid {
    pub(crate) version: Version,
    pub(crate) version_pinned: bool,
    pub(crate) meta: TagMap<Value>,
    pub(crate) columns: TagMap<TagMap<Value>>,
    pub(crate) rows: Vec<Entity>,
    pub(crate) index: HashMap<Ref, usize>,
}

impl Default for Grid {
    fn default() -> Self {
        Grid::new()
    }
}

impl Grid {
    /// An empty grid with an inferred version, starting at 2.0.
    pub fn new() -> Self {
        Grid {
            version: VER_2_0.clone(),
            version_pinned: false,
            meta: TagMap::new(),
            columns: TagMap::new(),
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// An empty grid pinned to a version. Values needing a newer grammar
    /// level are rejected rather than upgrading.
    pub fn with_version(version: Version) -> Self {
        Grid {
            version,
            version_pinned: true,
            ..Grid::new()
        }
    }

    pub(crate) fn unpinned(version: Version) -> Self {
        Grid {
            version,
            version_pinned: false,
            ..Grid::new()
        }
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn is_version_pinned(&self) -> bool {
        self.version_pinned
    }

    pub fn nearest_version(&self) -> Version {
        self.version.nearest()
    }

    /// Check a value against the version policy, upgrading an inferred
    /// version when needed.
    fn admit(&mut self, value: &Value) -> Result<()> {
        let required = value.required_version();
        if self.version.nearest() < *required {
            if self.version_pinned {
                return Err(HaygridError::Version(format!(
                    "{} value requires version {required}, grid is pinned at {}",
                    value.kind(),
                    self.version
                )));
            }
            self.version = required.clone();
        }
        Ok(())
    }

    fn admit_row(&mut self, row: &Entity) -> Result<()> {
        for (tag, value) in row.iter() {
            self.admit(value)?;
            if tag == "id" && !matches!(value, Value::Ref(_)) {
                return Err(HaygridError::Type(format!(
                    "the id tag must be a Ref, got {}",
                    value.kind()
                )));
            }
        }
        if let Some(Value::Ref(id)) = row.get("id") {
            if self.index.contains_key(id) {
                return Err(HaygridError::Type(format!("duplicate row id {id}")));
            }
        }
        Ok(())
    }

    // ----- metadata and columns -------------------------------------------

    pub fn meta(&self) -> &TagMap<Value> {
        &self.meta
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: Value) -> Result<Option<Value>> {
        self.admit(&value)?;
        Ok(self.meta.insert(key, value))
    }

    pub fn remove_meta(&mut self, key: &str) -> Option<Value> {
        self.meta.remove(key)
    }

    pub fn columns(&self) -> &TagMap<TagMap<Value>> {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&TagMap<Value>> {
        self.columns.get(name)
    }

    /// Add or replace a column and its metadata, appended at the end of
    /// the catalog when new.
    pub fn add_column(&mut self, name: impl Into<String>, meta: TagMap<Value>) -> Result<()> {
        for value in meta.values() {
            self.admit(value)?;
        }
        self.columns.insert(name, meta);
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> Option<TagMap<Value>> {
        self.columns.remove(name)
    }

    // ----- row access ------------------------------------------------------

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.rows.iter()
    }

    pub fn get(&self, pos: usize) -> Option<&Entity> {
        self.rows.get(pos)
    }

    pub fn row(&self, pos: usize) -> Result<&Entity> {
        self.rows
            .get(pos)
            .ok_or_else(|| HaygridError::NotFound(format!("row index {pos} out of range")))
    }

    pub fn get_by_ref(&self, id: &Ref) -> Option<&Entity> {
        self.index.get(id).map(|&pos| &self.rows[pos])
    }

    pub fn row_by_ref(&self, id: &Ref) -> Result<&Entity> {
        self.get_by_ref(id)
            .ok_or_else(|| HaygridError::NotFound(format!("no row with id {id}")))
    }

    pub fn contains_ref(&self, id: &Ref) -> bool {
        self.index.contains_key(id)
    }

    /// Entity ids in row order.
    pub fn keys(&self) -> impl Iterator<Item = &Ref> {
        self.rows.iter().filter_map(|row| match row.get("id") {
            Some(Value::Ref(id)) => Some(id),
            _ => None,
        })
    }

    /// A new grid holding copies of the rows in `range`, with the same
    /// version, metadata, and columns.
    pub fn slice(&self, range: Range<usize>) -> Grid {
        let end = range.end.min(self.rows.len());
        let range = range.start.min(end)..end;
        let mut sliced = Grid {
            version: self.version.clone(),
            version_pinned: self.version_pinned,
            meta: self.meta.clone(),
            columns: self.columns.clone(),
            rows: self.rows[range].to_vec(),
            index: HashMap::new(),
        };
        sliced.reindex();
        sliced
    }

    // ----- mutation ---------------------------------------------------------

    pub fn append(&mut self, row: Entity) -> Result<()> {
        self.admit_row(&row)?;
        self.push_row_unchecked(row);
        Ok(())
    }

    pub fn insert(&mut self, pos: usize, row: Entity) -> Result<()> {
        self.admit_row(&row)?;
        let pos = pos.min(self.rows.len());
        self.rows.insert(pos, row);
        self.reindex_from(pos);
        Ok(())
    }

    pub fn extend<I: IntoIterator<Item = Entity>>(&mut self, rows: I) -> Result<()> {
        for row in rows {
            self.append(row)?;
        }
        Ok(())
    }

    /// Replace the row at `pos`, returning the old row. The new row may
    /// keep the old row's id.
    pub fn replace(&mut self, pos: usize, row: Entity) -> Result<Entity> {
        if pos >= self.rows.len() {
            return Err(HaygridError::NotFound(format!(
                "row index {pos} out of range"
            )));
        }
        if let Some(Value::Ref(old_id)) = self.rows[pos].get("id") {
            let old_id = old_id.clone();
            self.index.remove(&old_id);
        }
        if let Err(err) = self.admit_row(&row) {
            self.reindex();
            return Err(err);
        }
        let old = std::mem::replace(&mut self.rows[pos], row);
        if let Some(Value::Ref(id)) = self.rows[pos].get("id") {
            self.index.insert(id.clone(), pos);
        }
        Ok(old)
    }

    /// Remove rows by position and/or id. Positional deletions apply in
    /// descending order so earlier removals cannot shift later targets.
    /// Returns the removed row for the first key that resolved.
    pub fn pop(&mut self, keys: &[RowKey]) -> Option<Entity> {
        let resolved: Vec<usize> = keys
            .iter()
            .filter_map(|key| match key {
                RowKey::Index(pos) if *pos < self.rows.len() => Some(*pos),
                RowKey::Index(_) => None,
                RowKey::Id(id) => self.index.get(id).copied(),
            })
            .collect();
        let first = *resolved.first()?;
        let mut descending = resolved.clone();
        descending.sort_unstable();
        descending.dedup();
        descending.reverse();
        let mut removed: HashMap<usize, Entity> = HashMap::new();
        for pos in descending {
            removed.insert(pos, self.rows.remove(pos));
        }
        self.reindex();
        removed.remove(&first)
    }

    pub fn pop_at(&mut self, pos: usize) -> Option<Entity> {
        self.pop(&[RowKey::Index(pos)])
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.index.clear();
    }

    /// Rebuild the Ref index from the rows. Non-Ref `id` tags are skipped
    /// with a warning; on duplicate ids the later row wins.
    pub fn reindex(&mut self) {
        self.index.clear();
        self.reindex_from(0);
    }

    fn reindex_from(&mut self, pos: usize) {
        for (offset, row) in self.rows[pos..].iter().enumerate() {
            match row.get("id") {
                Some(Value::Ref(id)) => {
                    if self.index.insert(id.clone(), pos + offset).is_some() {
                        warn!("duplicate row id {id}, keeping the later row");
                    }
                }
                Some(other) => {
                    warn!("ignoring non-Ref id tag of kind {}", other.kind());
                }
                None => {}
            }
        }
    }

    /// Append rows without policy checks. Callers guarantee the values
    /// already passed version gating; duplicate ids index last-wins.
    pub(crate) fn push_row_unchecked(&mut self, row: Entity) {
        if let Some(Value::Ref(id)) = row.get("id") {
            self.index.insert(id.clone(), self.rows.len());
        }
        self.rows.push(row);
    }

    // ----- column maintenance ------------------------------------------------

    /// Drop catalog entries no row uses.
    pub fn pack_columns(&mut self) {
        let mut used: HashSet<&str> = HashSet::new();
        for row in &self.rows {
            for (tag, _) in row.iter() {
                used.insert(tag);
            }
        }
        let keep: Vec<String> = self
            .columns
            .keys()
            .filter(|name| used.contains(name))
            .map(|name| name.to_string())
            .collect();
        let mut packed = TagMap::new();
        for name in keep {
            if let Some(meta) = self.columns.remove(&name) {
                packed.insert(name, meta);
            }
        }
        self.columns = packed;
    }

    /// Append catalog entries for tags present in rows but missing from
    /// the catalog, in first-seen order, with empty metadata.
    pub fn extends_columns(&mut self) {
        for row_pos in 0..self.rows.len() {
            let missing: Vec<String> = self.rows[row_pos]
                .keys()
                .filter(|tag| !self.columns.contains_key(tag))
                .map(|tag| tag.to_string())
                .collect();
            for tag in missing {
                self.columns.insert(tag, TagMap::new());
            }
        }
    }

    /// Keep or drop columns by name. The spec is a comma or space
    /// separated tag list: all-positive keeps only the named columns in
    /// specification order (unknown names get empty metadata), all
    /// names prefixed `!` drops those columns. Mixing polarities fails.
    /// `*` or an empty spec copies the grid.
    pub fn select(&self, spec: &str) -> Result<Grid> {
        let spec = spec.trim();
        if spec.is_empty() || spec == "*" {
            return Ok(self.clone());
        }
        let names: Vec<&str> = spec
            .split([',', ' '])
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect();
        let negative = spec.contains('!');
        let mut selected = self.clone();
        if negative {
            for name in names {
                let name = name.strip_prefix('!').ok_or_else(|| {
                    HaygridError::Selector(
                        "impossible to merge positive and negative selection".to_string(),
                    )
                })?;
                selected.columns.remove(name);
            }
        } else {
            let mut picked = TagMap::new();
            for name in names {
                if name.starts_with('!') {
                    return Err(HaygridError::Selector(
                        "impossible to merge positive and negative selection".to_string(),
                    ));
                }
                match self.columns.get(name) {
                    Some(meta) => picked.insert(name, meta.clone()),
                    None => picked.insert(name, TagMap::new()),
                };
            }
            selected.columns = picked;
        }
        Ok(selected)
    }

    /// A new grid whose rows carry only cataloged tags.
    pub fn purge(&self) -> Grid {
        let mut purged = Grid {
            version: self.version.clone(),
            version_pinned: self.version_pinned,
            meta: self.meta.clone(),
            columns: self.columns.clone(),
            rows: Vec::new(),
            index: HashMap::new(),
        };
        for row in &self.rows {
            let kept: Entity = row
                .iter()
                .filter(|(tag, _)| self.columns.contains_key(tag))
                .map(|(tag, value)| (tag.to_string(), value.clone()))
                .collect();
            purged.push_row_unchecked(kept);
        }
        purged
    }

    /// A copy sorted by a tag's value. Every row must carry the tag and
    /// all values must be pairwise ordered.
    pub fn sort(&self, tag: &str) -> Result<Grid> {
        let mut order: Vec<usize> = (0..self.rows.len()).collect();
        for (pos, row) in self.rows.iter().enumerate() {
            if !row.contains_key(tag) {
                return Err(HaygridError::NotFound(format!(
                    "row {pos} has no tag {tag:?} to sort by"
                )));
            }
        }
        let mut unordered: Option<HaygridError> = None;
        order.sort_by(|&a, &b| {
            let left = self.rows[a].get(tag);
            let right = self.rows[b].get(tag);
            match (left, right) {
                (Some(left), Some(right)) => left.partial_cmp(right).unwrap_or_else(|| {
                    if unordered.is_none() {
                        unordered = Some(HaygridError::Type(format!(
                            "cannot order {} against {} on tag {tag:?}",
                            left.kind(),
                            right.kind()
                        )));
                    }
                    std::cmp::Ordering::Equal
                }),
                _ => std::cmp::Ordering::Equal,
            }
        });
        if let Some(err) = unordered {
            return Err(err);
        }
        let mut sorted = Grid {
            version: self.version.clone(),
            version_pinned: self.version_pinned,
            meta: self.meta.clone(),
            columns: self.columns.clone(),
            rows: Vec::new(),
            index: HashMap::new(),
        };
        for pos in order {
            sorted.push_row_unchecked(self.rows[pos].clone());
        }
        Ok(sorted)
    }
}

fn approx_entity(left: &Entity, right: &Entity) -> bool {
    left.len() == right.len()
        && left.iter().all(|(tag, value)| match right.get(tag) {
            Some(other) => value.approx_eq(other),
            None => false,
        })
}

/// Approximate grid equality: metadata and column catalogs compare with
/// scalar tolerance, rows match by id where possible and greedily
/// first-fit otherwise. Versions are not compared, so codecs that carry
/// no version marker still round-trip equal.
impl PartialEq for Grid {
    fn eq(&self, other: &Self) -> bool {
        if self.meta.len() != other.meta.len() || !approx_entity(&self.meta, &other.meta) {
            return false;
        }
        if self.columns.len() != other.columns.len() {
            return false;
        }
        for (name, meta) in self.columns.iter() {
            match other.columns.get(name) {
                Some(other_meta) => {
                    if meta.len() != other_meta.len() || !approx_entity(meta, other_meta) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        if self.rows.len() != other.rows.len() {
            return false;
        }
        let mut pending: Vec<bool> = other
            .rows
            .iter()
            .map(|row| !row.contains_key("id"))
            .collect();
        for left in &self.rows {
            let matched = match left.get("id") {
                Some(Value::Ref(id)) => match other.get_by_ref(id) {
                    Some(right) => approx_entity(left, right),
                    None => false,
                },
                _ => {
                    let mut found = false;
                    for (pos, right) in other.rows.iter().enumerate() {
                        if pending[pos] && approx_entity(left, right) {
                            pending[pos] = false;
                            found = true;
                            break;
                        }
                    }
                    found
                }
            };
            if !matched {
                return false;
            }
        }
        true
    }
}

impl<'g> IntoIterator for &'g Grid {
    type Item = &'g Entity;
    type IntoIter = std::slice::Iter<'g, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
