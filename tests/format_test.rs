//! Format dispatch tests: suffix and MIME lookup tables.

use std::str::FromStr;

use test_log::test;

use haygrid::codec::Format;

#[test]
fn test_suffix_lookup() {
    assert_eq!(Format::from_suffix("sites.zinc"), Some(Format::Zinc));
    assert_eq!(Format::from_suffix("sites.trio"), Some(Format::Trio));
    assert_eq!(Format::from_suffix("sites.json"), Some(Format::Json));
    assert_eq!(Format::from_suffix("sites.hayson.json"), Some(Format::Hayson));
    assert_eq!(Format::from_suffix("sites.csv"), Some(Format::Csv));
    assert_eq!(Format::from_suffix("SITES.ZINC"), Some(Format::Zinc));
    assert_eq!(Format::from_suffix("sites.xml"), None);

    for format in [Format::Zinc, Format::Trio, Format::Json, Format::Hayson, Format::Csv] {
        let name = format!("grid{}", format.suffix());
        assert_eq!(Format::from_suffix(&name), Some(format));
    }
}

#[test]
fn test_mime_lookup() {
    assert_eq!(Format::from_mime("text/zinc"), Some(Format::Zinc));
    assert_eq!(Format::from_mime("text/trio"), Some(Format::Trio));
    assert_eq!(Format::from_mime("application/json"), Some(Format::Json));
    assert_eq!(
        Format::from_mime("application/vnd.haystack+json"),
        Some(Format::Hayson)
    );
    assert_eq!(Format::from_mime("text/csv"), Some(Format::Csv));
    // Parameters are ignored; unknown essences are not.
    assert_eq!(Format::from_mime("text/zinc; charset=utf-8"), Some(Format::Zinc));
    assert_eq!(Format::from_mime("text/html"), None);

    for format in [Format::Zinc, Format::Trio, Format::Json, Format::Hayson, Format::Csv] {
        assert_eq!(Format::from_mime(format.mime()), Some(format));
    }
}

#[test]
fn test_name_round_trip() {
    for format in [Format::Zinc, Format::Trio, Format::Json, Format::Hayson, Format::Csv] {
        assert_eq!(Format::from_str(&format.to_string()).unwrap(), format);
    }
    assert!(Format::from_str("yaml").is_err());
}
