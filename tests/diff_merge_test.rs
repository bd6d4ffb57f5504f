//! Diff/merge tests, anchored on the law
//! `merge(base, &diff(&base, &target)) == target`.

use test_log::test;

use haygrid::codec::{self, Format};
use haygrid::{diff, merge, Value};

fn parse(text: &str) -> haygrid::Grid {
    codec::parse(text, Format::Zinc).unwrap()
}

#[test]
fn test_round_trip_law_with_ids() -> Result<(), Box<dyn std::error::Error>> {
    let base = parse(
        "ver:\"3.0\" projName:\"old\"\n\
         id,dis,area,stale\n\
         @a,\"Site A\",1500ft²,M\n\
         @b,\"Site B\",500ft²,\n\
         @gone,\"Removed\",,M\n",
    );
    let target = parse(
        "ver:\"3.0\" projName:\"new\"\n\
         id,dis,area,fresh\n\
         @a,\"Site A\",1600ft²,\n\
         @b,\"Site B\",500ft²,M\n\
         @added,\"New site\",,\n",
    );
    let patch = diff(&base, &target);
    assert_eq!(merge(base, &patch)?, target);
    Ok(())
}

#[test]
fn test_round_trip_law_without_ids() -> Result<(), Box<dyn std::error::Error>> {
    let base = parse("ver:\"3.0\"\nts,val\n2021-06-01,1\n2021-06-02,2\n");
    let target = parse("ver:\"3.0\"\nts,val\n2021-06-02,2\n2021-06-03,3\n");
    let patch = diff(&base, &target);
    assert_eq!(merge(base, &patch)?, target);
    Ok(())
}

#[test]
fn test_identical_grids_diff_to_an_empty_patch() {
    let base = parse("ver:\"3.0\"\nid,dis\n@a,\"A\"\n");
    let patch = diff(&base, &base);
    assert_eq!(patch.meta().get("diff_"), Some(&Value::Marker));
    assert_eq!(patch.len(), 0);
}

#[test]
fn test_patch_structure() {
    let base = parse(
        "ver:\"3.0\" keep:\"x\" gone:\"y\"\n\
         id,dis,old\n\
         @a,\"A\",M\n\
         @dead,\"D\",\n",
    );
    let target = parse(
        "ver:\"3.0\" keep:\"x\" new:\"z\"\n\
         id,dis\n\
         @a,\"A2\",\n",
    );
    let patch = diff(&base, &target);

    // The patch is marked and carries only changed metadata, with Remove
    // tombstones for dropped keys.
    assert_eq!(patch.meta().get("diff_"), Some(&Value::Marker));
    assert_eq!(patch.meta().get("gone"), Some(&Value::Remove));
    assert_eq!(patch.meta().get("new"), Some(&Value::Str("z".to_string())));
    assert!(!patch.meta().contains_key("keep"));

    // The dropped column gets a remove_ catalog entry.
    assert_eq!(
        patch.column("old").unwrap().get("remove_"),
        Some(&Value::Remove)
    );

    // One changed row, one tombstone row.
    assert_eq!(patch.len(), 2);
    let changed = patch
        .get_by_ref(&haygrid::Ref::new("a", None).unwrap())
        .unwrap();
    assert_eq!(changed.get("dis"), Some(&Value::Str("A2".to_string())));
    assert_eq!(changed.get("old"), Some(&Value::Remove));
    let dead = patch
        .get_by_ref(&haygrid::Ref::new("dead", None).unwrap())
        .unwrap();
    assert_eq!(dead.get("remove_"), Some(&Value::Remove));
    assert_eq!(dead.len(), 2);
}

#[test]
fn test_merge_adopts_patch_version() -> Result<(), Box<dyn std::error::Error>> {
    let base = parse("ver:\"2.0\"\nid,dis\n@a,\"A\"\n");
    let target = parse("ver:\"3.0\"\nid,dis,vals\n@a,\"A\",[1]\n");
    let patch = diff(&base, &target);
    let merged = merge(base, &patch)?;
    assert_eq!(merged.version().to_string(), "3.0");
    assert_eq!(merged, target);
    Ok(())
}

#[test]
fn test_merge_reorders_columns_to_patch_catalog() -> Result<(), Box<dyn std::error::Error>> {
    let base = parse("ver:\"3.0\"\nb,a\n1,2\n");
    let target = parse("ver:\"3.0\"\na,b\n2,1\n");
    let merged = merge(base.clone(), &diff(&base, &target))?;
    assert_eq!(
        merged.columns().keys().collect::<Vec<_>>(),
        vec!["a", "b"]
    );
    Ok(())
}

#[test]
fn test_unrelated_grids() -> Result<(), Box<dyn std::error::Error>> {
    // The law holds even when nothing is shared.
    let base = parse("ver:\"3.0\"\nx\n1\n2\n");
    let target = parse("ver:\"3.0\"\nid,dis\n@a,\"A\"\n");
    let patch = diff(&base, &target);
    assert_eq!(merge(base, &patch)?, target);
    Ok(())
}
