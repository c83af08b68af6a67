/*!
 # Value parsers for portal fields

 Every parser here accepts untrusted text from the configuration portal and
 never fails: malformed input is logged and answered with the caller's
 default (or "not parsed"), so a bad value in one field never blocks the
 rest of the configuration.
*/

use chrono::{Datelike, NaiveDateTime, Timelike};
use std::fmt;
use tracing::warn;

/// Broken-down wall-clock time as the word clock reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl ClockTime {
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Converts to a chrono timestamp. Returns `None` for calendar dates
    /// chrono rejects, such as February 30th.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        chrono::NaiveDate::from_ymd_opt(self.year.into(), self.month.into(), self.day.into())?
            .and_hms_opt(self.hour.into(), self.minute.into(), self.second.into())
    }
}

impl From<NaiveDateTime> for ClockTime {
    fn from(time: NaiveDateTime) -> Self {
        Self {
            year: time.year().clamp(0, u16::MAX as i32) as u16,
            month: time.month() as u8,
            day: time.day() as u8,
            hour: time.hour() as u8,
            minute: time.minute() as u8,
            second: time.second() as u8,
        }
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// 24-bit color split into bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RgbColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl RgbColor {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

/// Scans three unsigned integers separated by `separator`.
///
/// Mirrors a fixed-field `%u<sep>%u<sep>%u` scan: each field needs at least
/// one digit and anything after the third number is ignored.
fn scan_triple(text: &str, separator: char) -> Option<[u32; 3]> {
    let mut fields = [0u32; 3];
    let mut rest = text;

    for (index, field) in fields.iter_mut().enumerate() {
        if index > 0 {
            rest = rest.strip_prefix(separator)?;
        }
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        *field = rest[..digits].parse().ok()?;
        rest = &rest[digits..];
    }

    Some(fields)
}

/// Parses a `yyyy-mm-dd` date.
///
/// Day of month is only checked against 1..=31, so `2023-02-30` is accepted.
pub fn parse_date(text: &str) -> Option<(u16, u8, u8)> {
    match scan_triple(text, '-') {
        Some([year, month, day])
            if (2000..=9999).contains(&year)
                && (1..=12).contains(&month)
                && (1..=31).contains(&day) =>
        {
            Some((year as u16, month as u8, day as u8))
        }
        _ => {
            warn!("Could not parse date value {:?}", text);
            None
        }
    }
}

/// Parses an `hh:mm:ss` time of day.
pub fn parse_time(text: &str) -> Option<(u8, u8, u8)> {
    match scan_triple(text, ':') {
        Some([hour, minute, second]) if hour <= 23 && minute <= 59 && second <= 59 => {
            Some((hour as u8, minute as u8, second as u8))
        }
        _ => {
            warn!("Could not parse time value {:?}", text);
            None
        }
    }
}

/// Overlays the user supplied date and time onto `current`.
///
/// An empty string leaves that half untouched. Returns `None` when neither
/// half was supplied and parsed, i.e. the clock should not be adjusted.
pub fn parse_date_time_overlay(
    current: ClockTime,
    date_text: &str,
    time_text: &str,
) -> Option<ClockTime> {
    let mut time = current;
    let mut changed = false;

    if !date_text.is_empty() {
        if let Some((year, month, day)) = parse_date(date_text) {
            time.year = year;
            time.month = month;
            time.day = day;
            changed = true;
        }
    }
    if !time_text.is_empty() {
        if let Some((hour, minute, second)) = parse_time(time_text) {
            time.hour = hour;
            time.minute = minute;
            time.second = second;
            changed = true;
        }
    }

    changed.then_some(time)
}

/// Parses a `#RRGGBB` color, returning `default` on anything else.
pub fn parse_color(text: &str, default: RgbColor) -> RgbColor {
    let hex = match text.strip_prefix('#') {
        Some(hex) if hex.len() == 6 && hex.bytes().all(|b| b.is_ascii_hexdigit()) => hex,
        _ => {
            warn!("Could not parse color value {:?}", text);
            return default;
        }
    };

    match u32::from_str_radix(hex, 16) {
        Ok(value) => RgbColor::new((value >> 16) as u8, (value >> 8) as u8, value as u8),
        Err(_) => default,
    }
}

/// Parses a whole-string decimal integer within `[min, max]`.
///
/// Empty strings, trailing characters, overflow and out-of-range values all
/// yield `default`.
pub fn parse_bounded_int(text: &str, min: i32, max: i32, default: i32) -> i32 {
    match text.parse::<i32>() {
        Ok(value) if (min..=max).contains(&value) => value,
        _ => {
            warn!("Could not parse number value {:?}", text);
            default
        }
    }
}
