//! Hayson codec tests: `_kind`-discriminated JSON objects.

use test_log::test;

use haygrid::codec::{self, Format};
use haygrid::version::VER_3_0;
use haygrid::{Quantity, Ref, Value, XStr};

fn scalar(text: &str) -> Value {
    codec::parse_scalar(text, Format::Hayson, &VER_3_0).unwrap()
}

fn dump(value: &Value) -> String {
    codec::dump_scalar(value, Format::Hayson, &VER_3_0).unwrap()
}

#[test]
fn test_kind_objects() {
    assert_eq!(scalar(r#"{"_kind": "Marker"}"#), Value::Marker);
    assert_eq!(scalar(r#"{"_kind": "Remove"}"#), Value::Remove);
    assert_eq!(scalar(r#"{"_kind": "NA"}"#), Value::Na);
    assert_eq!(
        scalar(r#"{"_kind": "Num", "val": 17.5, "unit": "kW"}"#),
        Value::Quantity(Quantity::new(17.5, "kW"))
    );
    assert_eq!(
        scalar(r#"{"_kind": "Num", "val": "-INF"}"#),
        Value::Number(f64::NEG_INFINITY)
    );
    assert_eq!(
        scalar(r#"{"_kind": "Ref", "val": "a", "dis": "Site A"}"#),
        Value::Ref(Ref::new("a", Some("Site A".to_string())).unwrap())
    );
    assert_eq!(
        scalar(r#"{"_kind": "XStr", "type": "b64", "val": "3q2+7w=="}"#),
        Value::XStr(XStr::new("hex", "deadbeef").unwrap())
    );
    assert_eq!(scalar(r#"{"_kind": "Bin", "val": "text/csv"}"#), Value::Bin("text/csv".to_string()));
    assert_eq!(scalar(r#"{"_kind": "Date", "val": "2021-06-01"}"#).kind(), "Date");
    assert_eq!(
        scalar(r#"{"_kind": "DateTime", "val": "2021-06-01T12:00:00-04:00", "tz": "New_York"}"#)
            .kind(),
        "DateTime"
    );
}

#[test]
fn test_plain_strings_and_numbers_are_native() {
    assert_eq!(scalar("\"m:\""), Value::Str("m:".to_string()));
    assert_eq!(scalar("12.5"), Value::Number(12.5));
    assert_eq!(dump(&Value::Number(12.5)), "12.5");
    assert_eq!(dump(&Value::Str("hello".to_string())), "\"hello\"");
}

#[test]
fn test_unknown_kind_is_an_error() {
    assert!(codec::parse_scalar(r#"{"_kind": "Blob"}"#, Format::Hayson, &VER_3_0).is_err());
}

#[test]
fn test_quantity_dumps_symbol_not_canonical() {
    // The written symbol survives, unlike the prefix-string encoding.
    let dumped = dump(&Value::Quantity(Quantity::new(10.0, "sqft")));
    assert!(dumped.contains("\"sqft\""), "got {dumped}");
    assert!(dumped.contains("\"_kind\""));
}

#[test]
fn test_datetime_always_dumps_tz() {
    let value = scalar(r#"{"_kind": "DateTime", "val": "2021-06-01T12:00:00Z"}"#);
    let dumped = dump(&value);
    assert!(dumped.contains("\"tz\""), "got {dumped}");
    assert_eq!(codec::parse_scalar(&dumped, Format::Hayson, &VER_3_0).unwrap(), value);
}

#[test]
fn test_grid_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let zinc = "ver:\"3.0\"\nid,dis,area\n@a,\"Site A\",1500ft²\n@b,\"Site B\",\n";
    let grid = codec::parse(zinc, Format::Zinc)?;
    let hayson = codec::dump(&grid, Format::Hayson)?;
    assert!(hayson.contains("\"_kind\""));
    let back = codec::parse(&hayson, Format::Hayson)?;
    assert_eq!(back, grid);
    Ok(())
}

#[test]
fn test_dict_and_nested_grid_detection() {
    let dict = scalar(r#"{"site": {"_kind": "Marker"}, "dis": "HQ"}"#);
    assert!(matches!(&dict, Value::Dict(d) if d.get("site") == Some(&Value::Marker)));

    let nested = scalar(
        r#"{"meta": {"ver": "3.0"}, "cols": [{"name": "val"}], "rows": [{"val": 1}]}"#,
    );
    assert!(matches!(nested, Value::Grid(_)));
}

#[test]
fn test_dict_keys_keep_document_order() {
    let dict = scalar(r#"{"zeta": 1, "alpha": 2}"#);
    let Value::Dict(map) = &dict else {
        panic!("expected a Dict");
    };
    assert_eq!(map.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
}

#[test]
fn test_catalog_less_grid_refuses_to_dump() {
    let mut grid = haygrid::Grid::new();
    let mut row = haygrid::Entity::new();
    row.insert("val".to_string(), Value::Number(1.0));
    grid.append(row).unwrap();
    let err = codec::dump(&grid, Format::Hayson).unwrap_err();
    assert!(err.to_string().contains("extends_columns"));

    grid.extends_columns();
    assert!(codec::dump(&grid, Format::Hayson).is_ok());
}
