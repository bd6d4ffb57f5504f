//! Tests for the grammar version policy.

use test_log::test;

use crate::version::{Version, VER_2_0, VER_3_0};

#[test]
fn test_parse_and_display_round_trip() {
    let version: Version = "3.0".parse().unwrap();
    assert_eq!(version.numbers(), &[3, 0]);
    assert_eq!(version.to_string(), "3.0");

    let dotted: Version = "2.5.3".parse().unwrap();
    assert_eq!(dotted.numbers(), &[2, 5, 3]);
    assert!("".parse::<Version>().is_err());
    assert!("abc".parse::<Version>().is_err());
}

#[test]
fn test_extra_text_is_kept_and_sorts_after() {
    let tagged: Version = "1.2b".parse().unwrap();
    assert_eq!(tagged.numbers(), &[1, 2]);
    assert_eq!(tagged.extra(), Some("b"));
    assert_eq!(tagged.to_string(), "1.2b");

    let plain: Version = "1.2".parse().unwrap();
    assert!(plain < tagged);
}

#[test]
fn test_ordering_is_numeric_not_lexical() {
    let v2: Version = "2.0".parse().unwrap();
    let v10: Version = "10.0".parse().unwrap();
    assert!(v2 < v10);
    assert!(*VER_2_0 < *VER_3_0);

    // Missing groups read as zero; equality agrees with the ordering.
    let short: Version = "3".parse().unwrap();
    let long: Version = "3.0".parse().unwrap();
    assert_eq!(short.cmp(&long), std::cmp::Ordering::Equal);
    assert_eq!(short, long);
}

#[test]
fn test_nearest_snaps_to_an_official_grammar() {
    assert_eq!("2.0".parse::<Version>().unwrap().nearest(), *VER_2_0);
    assert_eq!("3.0".parse::<Version>().unwrap().nearest(), *VER_3_0);

    // Off-catalog versions snap to the nearest official one below, or the
    // lowest official one when there is nothing below.
    assert_eq!("2.5".parse::<Version>().unwrap().nearest(), *VER_2_0);
    assert_eq!("4.2".parse::<Version>().unwrap().nearest(), *VER_3_0);
    assert_eq!("1.0".parse::<Version>().unwrap().nearest(), *VER_2_0);
}
