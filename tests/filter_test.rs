//! Filter engine tests: grammar, path traversal, and row selection.

use test_log::test;

use haygrid::codec::{self, Format};
use haygrid::{Filter, Grid, Ref, Value};

fn sites() -> Grid {
    codec::parse(
        "ver:\"3.0\"\n\
         id,dis,site,equip,area,siteRef,geo,occupied\n\
         @a,\"Site A\",M,,1500ft²,,{city:\"Richmond\"},T\n\
         @b,\"Site B\",M,,500ft²,,{city:\"Norfolk\"},F\n\
         @a-meter,\"Meter\",,M,,@a,,\n",
        Format::Zinc,
    )
    .unwrap()
}

fn ids(grid: &Grid) -> Vec<String> {
    grid.iter()
        .filter_map(|row| match row.get("id") {
            Some(Value::Ref(id)) => Some(id.name.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_has_and_missing() -> Result<(), Box<dyn std::error::Error>> {
    let grid = sites();
    assert_eq!(ids(&grid.filter("site", 0)?), vec!["a", "b"]);
    assert_eq!(ids(&grid.filter("not site", 0)?), vec!["a-meter"]);
    assert!(grid.filter("elevator", 0)?.is_empty());
    Ok(())
}

#[test]
fn test_comparisons() -> Result<(), Box<dyn std::error::Error>> {
    let grid = sites();
    assert_eq!(ids(&grid.filter("area >= 1000ft²", 0)?), vec!["a"]);
    assert_eq!(ids(&grid.filter("area < 1000ft²", 0)?), vec!["b"]);
    assert_eq!(ids(&grid.filter("dis == \"Meter\"", 0)?), vec!["a-meter"]);
    assert_eq!(ids(&grid.filter("dis != \"Meter\"", 0)?), vec!["a", "b"]);
    // Bare true/false literals.
    assert_eq!(ids(&grid.filter("occupied == true", 0)?), vec!["a"]);
    assert_eq!(ids(&grid.filter("occupied == false", 0)?), vec!["b"]);
    // Rows missing the tag fail every comparison, != included.
    assert!(!ids(&grid.filter("area != 0ft²", 0)?).contains(&"a-meter".to_string()));
    Ok(())
}

#[test]
fn test_and_or_single_precedence() -> Result<(), Box<dyn std::error::Error>> {
    let grid = sites();
    assert_eq!(ids(&grid.filter("site and area > 1000ft²", 0)?), vec!["a"]);
    assert_eq!(ids(&grid.filter("equip or area > 1000ft²", 0)?), vec!["a", "a-meter"]);
    // Left-associative fold: (a or b) and c, not a or (b and c).
    let expr = "equip or site and area < 1000ft²";
    assert_eq!(ids(&grid.filter(expr, 0)?), vec!["b"]);
    // Parentheses override.
    assert_eq!(
        ids(&grid.filter("equip or (site and area < 1000ft²)", 0)?),
        vec!["b", "a-meter"]
    );
    Ok(())
}

#[test]
fn test_ref_traversal() -> Result<(), Box<dyn std::error::Error>> {
    let grid = sites();
    assert_eq!(ids(&grid.filter("siteRef->area >= 1000ft²", 0)?), vec!["a-meter"]);
    assert_eq!(ids(&grid.filter("siteRef->dis == \"Site A\"", 0)?), vec!["a-meter"]);
    // A dangling ref resolves to nothing.
    assert!(grid.filter("siteRef->nothing", 0)?.is_empty());
    Ok(())
}

#[test]
fn test_dict_traversal() -> Result<(), Box<dyn std::error::Error>> {
    let grid = sites();
    assert_eq!(ids(&grid.filter("geo->city == \"Richmond\"", 0)?), vec!["a"]);
    assert_eq!(ids(&grid.filter("geo->city", 0)?), vec!["a", "b"]);
    Ok(())
}

#[test]
fn test_explicit_null_is_present() -> Result<(), Box<dyn std::error::Error>> {
    let mut grid = Grid::new();
    let mut row = haygrid::Entity::new();
    row.insert("id", Value::Ref(Ref::new("n", None)?));
    row.insert("v", Value::Null);
    grid.append(row)?;
    grid.extends_columns();
    // `v` resolves: the tag exists, its value happens to be Null.
    assert_eq!(grid.filter("v", 0)?.len(), 1);
    assert_eq!(grid.filter("not v", 0)?.len(), 0);
    Ok(())
}

#[test]
fn test_limit_and_empty_expression() -> Result<(), Box<dyn std::error::Error>> {
    let grid = sites();
    assert_eq!(grid.filter("", 0)?.len(), 3);
    assert_eq!(grid.filter("", 2)?.len(), 2);
    assert_eq!(ids(&grid.filter("site", 1)?), vec!["a"]);
    // The result keeps the catalog.
    assert_eq!(grid.filter("site", 0)?.columns().len(), grid.columns().len());
    Ok(())
}

#[test]
fn test_keywords_need_word_boundaries() -> Result<(), Box<dyn std::error::Error>> {
    let mut grid = Grid::new();
    let mut row = haygrid::Entity::new();
    row.insert("notable", Value::Marker);
    row.insert("android", Value::Marker);
    grid.append(row)?;
    grid.extends_columns();
    assert_eq!(grid.filter("notable", 0)?.len(), 1);
    assert_eq!(grid.filter("android", 0)?.len(), 1);
    assert_eq!(grid.filter("notable and android", 0)?.len(), 1);
    Ok(())
}

#[test]
fn test_parse_errors() {
    assert!(Filter::parse("site and").is_err());
    assert!(Filter::parse("(site").is_err());
    assert!(Filter::parse("site trailing").is_err());
    assert!(Filter::parse("3site").is_err());
}

#[test]
fn test_parsed_shape() {
    let filter = Filter::parse("siteRef->area >= 10").unwrap();
    let Filter::Cmp { path, op, value } = filter else {
        panic!("expected a comparison");
    };
    assert_eq!(path, vec!["siteRef".to_string(), "area".to_string()]);
    assert_eq!(op, haygrid::filter::CmpOp::Ge);
    assert_eq!(value, Value::Number(10.0));
}
