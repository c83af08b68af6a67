use chrono::{NaiveDate, NaiveDateTime};
use word_clock_config::{Error, PosixTz};

fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

// ── Parsing ──────────────────────────────────────────────────────

#[test]
fn parses_new_york_rule() {
    let tz: PosixTz = "EST5EDT,M3.2.0,M11.1.0".parse().unwrap();
    assert_eq!(tz.to_string(), "EST5EDT,M3.2.0,M11.1.0");
}

#[test]
fn rejects_malformed_rules() {
    for text in [
        "",
        "EST",
        "E5",
        "EST5EDT,M3.2.0",
        "EST5EDT,J60,J300",
        "EST5EDT,M13.1.0,M11.1.0",
        "EST5x",
        "XYZ4294967295",
        "XYZ25",
        "XYZ5:60",
        "EST5EDT,M3.2.0/99,M11.1.0",
        "EST5EDT30,M3.2.0,M11.1.0",
    ] {
        assert!(
            matches!(text.parse::<PosixTz>(), Err(Error::InvalidTimezone(_))),
            "{text:?}"
        );
    }
}

// ── Conversion ───────────────────────────────────────────────────

#[test]
fn conversion_at_calendar_edge_does_not_overflow() {
    let tz: PosixTz = "XYZ-24".parse().unwrap();
    assert_eq!(tz.to_local(NaiveDateTime::MAX), NaiveDateTime::MAX);

    let tz: PosixTz = "EST5EDT,M3.2.0/24,M11.1.0/24".parse().unwrap();
    assert!(!tz.is_dst(NaiveDateTime::MAX));
}

#[test]
fn fixed_offset_zone() {
    let tz: PosixTz = "UTC0".parse().unwrap();
    assert_eq!(tz.to_local(utc(2024, 7, 1, 12, 0)), utc(2024, 7, 1, 12, 0));
    assert!(!tz.is_dst(utc(2024, 7, 1, 12, 0)));
}

#[test]
fn new_york_winter_and_summer() {
    let tz: PosixTz = "EST5EDT,M3.2.0,M11.1.0".parse().unwrap();

    assert_eq!(tz.to_local(utc(2024, 1, 15, 17, 0)), utc(2024, 1, 15, 12, 0));
    assert_eq!(tz.abbreviation(utc(2024, 1, 15, 17, 0)), "EST");

    assert_eq!(tz.to_local(utc(2024, 7, 4, 16, 0)), utc(2024, 7, 4, 12, 0));
    assert_eq!(tz.abbreviation(utc(2024, 7, 4, 16, 0)), "EDT");
}

#[test]
fn new_york_transitions() {
    let tz: PosixTz = "EST5EDT,M3.2.0,M11.1.0".parse().unwrap();

    // 2024-03-10 02:00 EST is 07:00 UTC.
    assert!(!tz.is_dst(utc(2024, 3, 10, 6, 59)));
    assert!(tz.is_dst(utc(2024, 3, 10, 7, 0)));

    // 2024-11-03 02:00 EDT is 06:00 UTC.
    assert!(tz.is_dst(utc(2024, 11, 3, 5, 59)));
    assert!(!tz.is_dst(utc(2024, 11, 3, 6, 0)));
}

#[test]
fn amsterdam_with_explicit_times() {
    let tz: PosixTz = "CET-1CEST,M3.5.0,M10.5.0/3".parse().unwrap();

    // Last Sunday of March 2024 is the 31st, switch at 02:00 CET = 01:00 UTC.
    assert!(!tz.is_dst(utc(2024, 3, 31, 0, 59)));
    assert!(tz.is_dst(utc(2024, 3, 31, 1, 0)));
    assert_eq!(tz.to_local(utc(2024, 6, 1, 10, 0)), utc(2024, 6, 1, 12, 0));

    // Last Sunday of October 2024 is the 27th, switch at 03:00 CEST = 01:00 UTC.
    assert!(tz.is_dst(utc(2024, 10, 27, 0, 59)));
    assert!(!tz.is_dst(utc(2024, 10, 27, 1, 0)));
}

#[test]
fn southern_hemisphere_wraps_year() {
    let tz: PosixTz = "AEST-10AEDT,M10.1.0,M4.1.0/3".parse().unwrap();
    assert!(tz.is_dst(utc(2024, 1, 15, 0, 0)));
    assert!(!tz.is_dst(utc(2024, 6, 15, 0, 0)));
    assert_eq!(tz.to_local(utc(2024, 1, 15, 0, 0)), utc(2024, 1, 15, 11, 0));
}

#[test]
fn dst_name_without_rule_uses_default_rule() {
    let tz: PosixTz = "PST8PDT".parse().unwrap();
    assert!(tz.is_dst(utc(2024, 7, 1, 12, 0)));
    assert_eq!(tz.to_local(utc(2024, 7, 1, 12, 0)), utc(2024, 7, 1, 5, 0));
}

#[test]
fn quoted_names() {
    let tz: PosixTz = "<+0330>-3:30".parse().unwrap();
    assert_eq!(tz.to_local(utc(2024, 1, 1, 0, 0)), utc(2024, 1, 1, 3, 30));
    assert_eq!(tz.abbreviation(utc(2024, 1, 1, 0, 0)), "+0330");
}
