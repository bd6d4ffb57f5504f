//! JSON codec tests: the prefix-string scalar encoding and the
//! meta/cols/rows envelope.

use test_log::test;

use haygrid::codec::{self, Format};
use haygrid::version::{VER_2_0, VER_3_0};
use haygrid::{Quantity, Ref, Value, XStr};

fn scalar(text: &str) -> Value {
    codec::parse_scalar(text, Format::Json, &VER_3_0).unwrap()
}

fn dump(value: &Value) -> String {
    codec::dump_scalar(value, Format::Json, &VER_3_0).unwrap()
}

#[test]
fn test_envelope_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let zinc = "ver:\"3.0\" projName:\"test\"\n\
                id,dis,area\n\
                @a,\"Site A\",1500ft²\n\
                @b,\"Site B\",\n";
    let grid = codec::parse(zinc, Format::Zinc)?;
    let json = codec::dump(&grid, Format::Json)?;

    assert!(json.contains("\"ver\":\"3.0\""));
    // Strings carry the s: prefix so prefixed payloads stay unambiguous.
    assert!(json.contains("\"projName\":\"s:test\""));
    assert!(json.contains("\"n:1500 ft²\""));

    let back = codec::parse(&json, Format::Json)?;
    assert_eq!(back, grid);
    // The ref keeps its display text through the round trip. Ref equality
    // ignores dis, so look at the field itself.
    let Some(Value::Ref(id)) = back.get_by_ref(&Ref::new("a", None).unwrap()).unwrap().get("id")
    else {
        panic!("row a lost its id");
    };
    assert_eq!(id.dis.as_deref(), Some("Site A"));
    // The second row carries no area key at all.
    assert!(!back.get(1).unwrap().contains_key("area"));
    Ok(())
}

#[test]
fn test_document_order_is_preserved() -> Result<(), Box<dyn std::error::Error>> {
    // Meta keys and row tags keep document order, not alphabetical order.
    let json = r#"{
        "meta": {"ver": "3.0", "zeta": "s:z", "alpha": "s:a"},
        "cols": [{"name": "x"}, {"name": "b"}],
        "rows": [{"x": 1, "b": 2}]
    }"#;
    let grid = codec::parse(json, Format::Json)?;
    assert_eq!(grid.meta().keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
    assert_eq!(grid.columns().keys().collect::<Vec<_>>(), vec!["x", "b"]);
    assert_eq!(grid.get(0).unwrap().keys().collect::<Vec<_>>(), vec!["x", "b"]);

    // The order survives a dump too.
    let dumped = codec::dump(&grid, Format::Json)?;
    let zeta = dumped.find("zeta").unwrap();
    let alpha = dumped.find("alpha").unwrap();
    assert!(zeta < alpha, "meta keys re-sorted: {dumped}");
    Ok(())
}

#[test]
fn test_null_values_are_dropped() -> Result<(), Box<dyn std::error::Error>> {
    let json = r#"{
        "meta": {"ver": "3.0", "gone": null},
        "cols": [{"name": "val", "stale": null}],
        "rows": [{"val": null}]
    }"#;
    let grid = codec::parse(json, Format::Json)?;
    assert!(!grid.meta().contains_key("gone"));
    assert!(!grid.column("val").unwrap().contains_key("stale"));
    assert!(!grid.get(0).unwrap().contains_key("val"));
    Ok(())
}

#[test]
fn test_prefix_scalars() {
    assert_eq!(scalar("\"m:\""), Value::Marker);
    assert_eq!(scalar("\"-:\""), Value::Remove);
    assert_eq!(scalar("\"x:\""), Value::Remove);
    assert_eq!(scalar("\"z:\""), Value::Na);
    assert_eq!(scalar("\"s:m:\""), Value::Str("m:".to_string()));
    assert_eq!(scalar("\"n:12.5\""), Value::Number(12.5));
    assert_eq!(
        scalar("\"n:72.1 °F\""),
        Value::Quantity(Quantity::new(72.1, "°F"))
    );
    assert_eq!(scalar("\"n:INF\""), Value::Number(f64::INFINITY));
    assert_eq!(
        scalar("\"r:a Site A\""),
        Value::Ref(Ref::new("a", Some("Site A".to_string())).unwrap())
    );
    assert_eq!(scalar("\"u:http://example/\""), Value::Uri("http://example/".to_string()));
    assert_eq!(scalar("\"b:text/csv\""), Value::Bin("text/csv".to_string()));
    assert_eq!(
        scalar("\"x:hex:deadbeef\""),
        Value::XStr(XStr::new("hex", "deadbeef").unwrap())
    );
    assert_eq!(scalar("\"d:2021-06-01\"").kind(), "Date");
    assert_eq!(scalar("\"h:09:30:00\"").kind(), "Time");
    assert_eq!(scalar("\"t:2021-06-01T12:00:00-04:00 New_York\"").kind(), "DateTime");
    // Unprefixed strings stay strings.
    assert_eq!(scalar("\"hello\""), Value::Str("hello".to_string()));
}

#[test]
fn test_native_json_values() {
    assert_eq!(scalar("true"), Value::Bool(true));
    assert_eq!(scalar("42"), Value::Number(42.0));
    assert_eq!(scalar("null"), Value::Null);
    assert_eq!(dump(&Value::Bool(false)), "false");
    assert_eq!(dump(&Value::Number(42.0)), "42.0");
    // Non-finite numbers cannot be native JSON.
    assert_eq!(dump(&Value::Number(f64::NEG_INFINITY)), "\"n:-INF\"");
}

#[test]
fn test_quantity_dumps_canonical_unit() {
    // sqft and ft² share one canonical unit; the JSON encoding dumps it.
    let q = Value::Quantity(Quantity::new(10.0, "sqft"));
    assert_eq!(dump(&q), "\"n:10 ft²\"");
}

#[test]
fn test_remove_prefix_tracks_version() {
    let v2 = codec::dump_scalar(&Value::Remove, Format::Json, &VER_2_0).unwrap();
    assert_eq!(v2, "\"x:\"");
    assert_eq!(dump(&Value::Remove), "\"-:\"");
}

#[test]
fn test_nested_collections() -> Result<(), Box<dyn std::error::Error>> {
    let value = scalar("[\"m:\", {\"site\": \"m:\"}, 1]");
    let Value::List(items) = &value else {
        panic!("expected a List");
    };
    assert_eq!(items[0], Value::Marker);
    assert!(matches!(&items[1], Value::Dict(d) if d.get("site") == Some(&Value::Marker)));

    // An object with meta/cols/rows keys is a nested grid.
    let nested = scalar(
        r#"{"meta": {"ver": "3.0"}, "cols": [{"name": "val"}], "rows": [{"val": 1}]}"#,
    );
    let Value::Grid(inner) = &nested else {
        panic!("expected a Grid, got {nested:?}");
    };
    assert_eq!(inner.len(), 1);

    let dumped = dump(&value);
    assert_eq!(codec::parse_scalar(&dumped, Format::Json, &VER_3_0)?, value);
    Ok(())
}

#[test]
fn test_version_gating() {
    assert!(codec::dump_scalar(&Value::List(vec![]), Format::Json, &VER_2_0).is_err());
    assert!(codec::parse_scalar("\"z:\"", Format::Json, &VER_2_0).is_err());
}
