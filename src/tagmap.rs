//! Insertion-ordered string-keyed map.
//!
//! Entities, grid metadata, and the column catalog all need dict semantics
//! with a stable, caller-controlled key order. Entries live in a `Vec` in
//! insertion order and a `HashMap` tracks key positions for O(1) lookup.
//! Positional inserts and removals rebuild the affected index range.

use std::collections::HashMap;
use std::fmt;

use crate::error::{HaygridError, Result};

#[derive(Clone)]
pub struct TagMap<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> Default for TagMap<V> {
    fn default() -> Self {
        TagMap::new()
    }
}

impl<V> TagMap<V> {
    pub fn new() -> Self {
        TagMap {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&pos| &self.entries[pos].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        match self.index.get(key) {
            Some(&pos) => Some(&mut self.entries[pos].1),
            None => None,
        }
    }

    /// Replace in place when the key exists, otherwise append.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        match self.index.get(&key) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Insert at a specific position. Fails if the key is already present
    /// unless `replace` is set, in which case the existing entry moves.
    pub fn insert_at(&mut self, pos: usize, key: impl Into<String>, value: V, replace: bool) -> Result<()> {
        let key = key.into();
        if self.index.contains_key(&key) {
            if !replace {
                return Err(HaygridError::Type(format!("duplicate key: {key}")));
            }
            self.remove(&key);
        }
        let pos = pos.min(self.entries.len());
        self.entries.insert(pos, (key, value));
        self.reindex_from(pos);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let pos = self.index.remove(key)?;
        let (_, value) = self.entries.remove(pos);
        self.reindex_from(pos);
        Some(value)
    }

    pub fn pop_at(&mut self, pos: usize) -> Option<(String, V)> {
        if pos >= self.entries.len() {
            return None;
        }
        let (key, value) = self.entries.remove(pos);
        self.index.remove(&key);
        self.reindex_from(pos);
        Some((key, value))
    }

    pub fn at(&self, pos: usize) -> Option<(&str, &V)> {
        self.entries.get(pos).map(|(k, v)| (k.as_str(), v))
    }

    pub fn key_at(&self, pos: usize) -> Option<&str> {
        self.entries.get(pos).map(|(k, _)| k.as_str())
    }

    pub fn value_at(&self, pos: usize) -> Option<&V> {
        self.entries.get(pos).map(|(_, v)| v)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn reverse(&mut self) {
        self.entries.reverse();
        self.rebuild_index();
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (pos, (key, _)) in self.entries.iter().enumerate() {
            self.index.insert(key.clone(), pos);
        }
    }

    fn reindex_from(&mut self, pos: usize) {
        for later in pos..self.entries.len() {
            let key = self.entries[later].0.clone();
            self.index.insert(key, later);
        }
    }
}

impl<V: PartialEq> PartialEq for TagMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<V: fmt::Debug> fmt::Debug for TagMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for TagMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = TagMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<K: Into<String>, V> Extend<(K, V)> for TagMap<V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<V> IntoIterator for TagMap<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
