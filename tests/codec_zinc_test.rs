//! Zinc codec tests: the canonical grammar, version gating, and the
//! scanner's error reporting.

use test_log::test;

use haygrid::codec::{self, Format};
use haygrid::{HaygridError, Quantity, Value};
use haygrid::version::{VER_2_0, VER_3_0};

fn parse(text: &str) -> haygrid::Grid {
    codec::parse(text, Format::Zinc).unwrap()
}

fn scalar(text: &str) -> Value {
    codec::parse_scalar(text, Format::Zinc, &VER_3_0).unwrap()
}

#[test]
fn test_grid_round_trip() {
    let text = "ver:\"3.0\" projName:\"test\"\n\
                id,dis dis:\"Display\",val unit:\"kW\"\n\
                @a,\"Site A\",10kW\n\
                @b,\"Site B\",\n";
    let grid = parse(text);
    assert_eq!(grid.version().to_string(), "3.0");
    assert_eq!(grid.meta().get("projName"), Some(&Value::Str("test".to_string())));
    assert_eq!(
        grid.columns().keys().collect::<Vec<_>>(),
        vec!["id", "dis", "val"]
    );
    assert_eq!(grid.len(), 2);
    assert_eq!(
        grid.get(0).unwrap().get("val"),
        Some(&Value::Quantity(Quantity::new(10.0, "kW")))
    );
    // The second row's empty cell is absent, not Null.
    assert!(!grid.get(1).unwrap().contains_key("val"));

    let dumped = codec::dump(&grid, Format::Zinc).unwrap();
    assert_eq!(dumped, text);
    assert_eq!(parse(&dumped), grid);
}

#[test]
fn test_single_column_grid_dumps_absent_as_null() {
    let text = "ver:\"3.0\"\nval\n1\nN\n2\n";
    let grid = parse(text);
    assert_eq!(grid.len(), 3);
    assert!(!grid.get(1).unwrap().contains_key("val"));
    assert_eq!(codec::dump(&grid, Format::Zinc).unwrap(), text);
}

#[test]
fn test_meta_markers_and_bare_ids() {
    let grid = parse("ver:\"3.0\" watchId:\"w-1\" hisStart\nid\n@a\n");
    assert_eq!(grid.meta().get("hisStart"), Some(&Value::Marker));
    let dumped = codec::dump(&grid, Format::Zinc).unwrap();
    assert!(dumped.contains("watchId:\"w-1\" hisStart\n"));
}

#[test]
fn test_number_forms() {
    assert_eq!(scalar("1_000"), Value::Number(1000.0));
    assert_eq!(scalar("-5.4e-2"), Value::Number(-0.054));
    assert_eq!(scalar("INF"), Value::Number(f64::INFINITY));
    assert_eq!(scalar("-INF"), Value::Number(f64::NEG_INFINITY));
    assert!(matches!(scalar("NaN"), Value::Number(n) if n.is_nan()));
    assert_eq!(scalar("75%"), Value::Quantity(Quantity::new(75.0, "%")));
    assert_eq!(scalar("21.5°C"), Value::Quantity(Quantity::new(21.5, "°C")));
    assert_eq!(scalar("5/min"), Value::Quantity(Quantity::new(5.0, "/min")));
}

#[test]
fn test_string_escapes_round_trip() {
    let value = Value::Str("tab\there \"quoted\" – dash\n".to_string());
    let dumped = codec::dump_scalar(&value, Format::Zinc, &VER_3_0).unwrap();
    assert_eq!(dumped, "\"tab\\there \\\"quoted\\\" \\u2013 dash\\n\"");
    assert_eq!(scalar(&dumped), value);
}

#[test]
fn test_refs_uris_and_coords() {
    assert_eq!(
        scalar("@site-a \"Site A\""),
        Value::Ref(haygrid::Ref::new("site-a", Some("Site A".to_string())).unwrap())
    );
    assert_eq!(scalar("`http://example/?q=\\``"), Value::Uri("http://example/?q=`".to_string()));
    let coord = scalar("C(37.545826,-77.449188)");
    assert_eq!(
        codec::dump_scalar(&coord, Format::Zinc, &VER_3_0).unwrap(),
        "C(37.545826,-77.449188)"
    );
}

#[test]
fn test_datetime_with_zone_name() {
    let value = scalar("2021-06-01T12:00:00-04:00 New_York");
    let Value::DateTime(dt) = &value else {
        panic!("expected a DateTime, got {value:?}");
    };
    assert_eq!(dt.tz.as_deref(), Some("New_York"));
    assert_eq!(
        codec::dump_scalar(&value, Format::Zinc, &VER_3_0).unwrap(),
        "2021-06-01T12:00:00-04:00 New_York"
    );

    // Zone-less UTC timestamps dump with the UTC name recovered.
    let utc = scalar("2021-06-01T12:00:00Z UTC");
    assert_eq!(
        codec::dump_scalar(&utc, Format::Zinc, &VER_3_0).unwrap(),
        "2021-06-01T12:00:00Z UTC"
    );
}

#[test]
fn test_collections_and_nested_grids() {
    let value = scalar("[1,\"x\",@a]");
    assert_eq!(
        value,
        Value::List(vec![
            Value::Number(1.0),
            Value::Str("x".to_string()),
            Value::Ref(haygrid::Ref::new("a", None).unwrap()),
        ])
    );

    let dict = scalar("{site dis:\"HQ\"}");
    let Value::Dict(map) = &dict else {
        panic!("expected a Dict");
    };
    assert_eq!(map.get("site"), Some(&Value::Marker));
    assert_eq!(map.get("dis"), Some(&Value::Str("HQ".to_string())));

    let nested = scalar("<<ver:\"3.0\"\nval\n1\n>>");
    let Value::Grid(inner) = &nested else {
        panic!("expected a Grid");
    };
    assert_eq!(inner.len(), 1);
    assert_eq!(
        codec::dump_scalar(&nested, Format::Zinc, &VER_3_0).unwrap(),
        "<<ver:\"3.0\"\nval\n1\n>>"
    );
}

#[test]
fn test_xstr_and_bin() {
    let xstr = scalar("hex(\"deadbeef\")");
    assert_eq!(
        codec::dump_scalar(&xstr, Format::Zinc, &VER_3_0).unwrap(),
        "hex(\"deadbeef\")"
    );
    assert_eq!(scalar("Bin(text/csv)"), Value::Bin("text/csv".to_string()));
}

#[test]
fn test_version_gating() {
    // 3.0 kinds are rejected by a 2.0 grammar, parse and dump alike.
    assert!(codec::parse_scalar("NA", Format::Zinc, &VER_2_0).is_err());
    assert!(codec::parse_scalar("[1,2]", Format::Zinc, &VER_2_0).is_err());
    assert!(codec::parse_scalar("hex(\"00\")", Format::Zinc, &VER_2_0).is_err());
    assert!(codec::dump_scalar(&Value::Na, Format::Zinc, &VER_2_0).is_err());
    assert!(codec::dump_scalar(&Value::List(vec![]), Format::Zinc, &VER_2_0).is_err());

    assert_eq!(codec::parse_scalar("NA", Format::Zinc, &VER_3_0).unwrap(), Value::Na);
}

#[test]
fn test_parse_errors_carry_position() {
    let err = codec::parse("ver:\"3.0\"\na,b\n1,2,3\n", Format::Zinc).unwrap_err();
    let HaygridError::Parse { line, message, .. } = err else {
        panic!("expected a parse error, got {err:?}");
    };
    assert!(line >= 3, "position should point into the body, got {line}");
    assert!(message.contains("cells"));

    assert!(codec::parse("notAGrid\n", Format::Zinc).is_err());
    assert!(codec::parse_scalar("12 trailing", Format::Zinc, &VER_3_0).is_err());
}

#[test]
fn test_bom_is_stripped() {
    let grid = codec::parse("\u{feff}ver:\"3.0\"\nval\n1\n", Format::Zinc).unwrap();
    assert_eq!(grid.len(), 1);
}
