//! Grid diff and merge.
//!
//! [`diff`] computes a patch grid that transforms its left argument into
//! its right; [`merge`] applies such a patch. The patch grid is marked
//! with a `diff_` marker in its metadata, dropped tags and metadata keys
//! carry the Remove value, and deleted rows and columns are tombstoned
//! with a `remove_` tag. The two operations satisfy
//! `merge(base.clone(), &diff(&base, &target))? == target` up to the
//! approximate equality grids compare with.

use tracing::debug;

use crate::error::Result;
use crate::grid::{Entity, Grid, RowKey};
use crate::tagmap::TagMap;
use crate::value::Value;

/// Compute the patch that rewrites `left` into `right`. The patch carries
/// right's version, unpinned, since applying it may change what the merged
/// grid needs to represent.
pub fn diff(left: &Grid, right: &Grid) -> Grid {
    let mut patch = Grid::unpinned(right.version().clone());
    patch.meta.insert("diff_", Value::Marker);

    // Metadata: right wins, left-only keys are removed.
    for (key, left_value) in left.meta().iter() {
        match right.meta().get(key) {
            Some(right_value) => {
                if left_value != right_value {
                    patch.meta.insert(key, right_value.clone());
                }
            }
            None => {
                patch.meta.insert(key, Value::Remove);
            }
        }
    }
    for (key, right_value) in right.meta().iter() {
        if !left.meta().contains_key(key) {
            patch.meta.insert(key, right_value.clone());
        }
    }

    // Catalog: every right column appears so the merge can rebuild the
    // catalog in right's order; left-only columns are tombstoned.
    for (name, right_meta) in right.columns().iter() {
        let meta = match left.column(name) {
            None => right_meta.clone(),
            Some(left_meta) => {
                let mut meta = TagMap::new();
                for (key, right_value) in right_meta.iter() {
                    if left_meta.get(key) != Some(right_value) {
                        meta.insert(key, right_value.clone());
                    }
                }
                for key in left_meta.keys() {
                    if !right_meta.contains_key(key) {
                        meta.insert(key, Value::Remove);
                    }
                }
                meta
            }
        };
        patch.columns.insert(name, meta);
    }
    for name in left.columns().keys() {
        if !right.columns().contains_key(name) {
            let mut tombstone = TagMap::new();
            tombstone.insert("remove_", Value::Remove);
            patch.columns.insert(name, tombstone);
        }
    }

    // Rows with ids pair up through the indexes; rows without ids pair
    // greedily with the first equal unconsumed right row.
    let mut consumed = vec![false; right.len()];
    for left_row in left.iter() {
        match left_row.get("id") {
            Some(Value::Ref(id)) => match right.get_by_ref(id) {
                Some(right_row) => {
                    let row = diff_row(id, left_row, right_row);
                    if row.len() > 1 {
                        patch.push_row_unchecked(row);
                    }
                }
                None => {
                    let mut tombstone = Entity::new();
                    tombstone.insert("id", Value::Ref(id.clone()));
                    tombstone.insert("remove_", Value::Remove);
                    patch.push_row_unchecked(tombstone);
                }
            },
            _ => {
                let matched = right.iter().enumerate().any(|(pos, right_row)| {
                    if consumed[pos] || right_row.contains_key("id") {
                        return false;
                    }
                    if rows_equal(left_row, right_row) {
                        consumed[pos] = true;
                        return true;
                    }
                    false
                });
                if !matched {
                    let mut tombstone = left_row.clone();
                    tombstone.insert("remove_", Value::Remove);
                    patch.push_row_unchecked(tombstone);
                }
            }
        }
    }
    for (pos, right_row) in right.iter().enumerate() {
        match right_row.get("id") {
            Some(Value::Ref(id)) => {
                if !left.contains_ref(id) {
                    patch.push_row_unchecked(right_row.clone());
                }
            }
            _ => {
                if !consumed[pos] {
                    patch.push_row_unchecked(right_row.clone());
                }
            }
        }
    }

    // Tags the diff rows use beyond right's catalog (id, remove_, dropped
    // left-only columns) need catalog entries of their own.
    let extra: Vec<String> = patch
        .iter()
        .flat_map(|row| row.keys())
        .filter(|tag| !patch.columns.contains_key(tag))
        .map(str::to_string)
        .collect();
    for tag in extra {
        let meta = right
            .column(&tag)
            .or_else(|| left.column(&tag))
            .cloned()
            .unwrap_or_else(TagMap::new);
        patch.columns.insert(tag, meta);
    }
    debug!(
        rows = patch.len(),
        "diff produced a patch at version {}",
        patch.version()
    );
    patch
}

/// Per-tag diff of two rows sharing an id. The result always carries the
/// id; callers drop rows that carry nothing else.
fn diff_row(id: &crate::value::Ref, left_row: &Entity, right_row: &Entity) -> Entity {
    let mut row = Entity::new();
    row.insert("id", Value::Ref(id.clone()));
    for (tag, left_value) in left_row.iter() {
        if tag == "id" {
            continue;
        }
        match right_row.get(tag) {
            Some(right_value) => {
                if left_value != right_value {
                    row.insert(tag, right_value.clone());
                }
            }
            None => {
                row.insert(tag, Value::Remove);
            }
        }
    }
    for (tag, right_value) in right_row.iter() {
        if tag != "id" && !left_row.contains_key(tag) {
            row.insert(tag, right_value.clone());
        }
    }
    row
}

/// Exact equality over tags, ignoring tag order.
fn rows_equal(left: &Entity, right: &Entity) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .all(|(tag, value)| right.get(tag) == Some(value))
}

/// Apply a patch produced by [`diff`]. The result adopts the patch's
/// version; the `remove_` tombstone column never survives the merge.
pub fn merge(mut base: Grid, patch: &Grid) -> Result<Grid> {
    base.version = patch.version().clone();
    base.version_pinned = patch.is_version_pinned();

    for (key, value) in patch.meta().iter() {
        if key == "diff_" && *value == Value::Marker {
            continue;
        }
        if *value == Value::Remove {
            base.meta.remove(key);
        } else {
            base.meta.insert(key, value.clone());
        }
    }

    // The catalog is rebuilt in patch order; a patch column whose meta
    // carries remove_ drops the column.
    let mut columns = TagMap::new();
    for (name, patch_meta) in patch.columns().iter() {
        if patch_meta.contains_key("remove_") {
            continue;
        }
        let mut meta = base.column(name).cloned().unwrap_or_else(TagMap::new);
        for (key, value) in patch_meta.iter() {
            if *value == Value::Remove {
                meta.remove(key);
            } else {
                meta.insert(key, value.clone());
            }
        }
        columns.insert(name, meta);
    }
    base.columns = columns;

    for patch_row in patch.iter() {
        match patch_row.get("id") {
            Some(Value::Ref(id)) if base.contains_ref(id) => {
                if patch_row.contains_key("remove_") {
                    base.pop(&[RowKey::Id(id.clone())]);
                } else if let Some(pos) = base.index.get(id).copied() {
                    let row = &mut base.rows[pos];
                    for (tag, value) in patch_row.iter() {
                        if tag == "id" {
                            continue;
                        }
                        if *value == Value::Remove {
                            row.remove(tag);
                        } else {
                            row.insert(tag, value.clone());
                        }
                    }
                }
            }
            Some(_) => {
                let mut row = patch_row.clone();
                row.remove("remove_");
                base.append(row)?;
            }
            None => {
                if patch_row.contains_key("remove_") {
                    let mut target = patch_row.clone();
                    target.remove("remove_");
                    if let Some(pos) = base.iter().position(|row| rows_equal(row, &target)) {
                        base.pop_at(pos);
                    }
                } else {
                    base.append(patch_row.clone())?;
                }
            }
        }
    }
    base.columns.remove("remove_");
    Ok(base)
}
