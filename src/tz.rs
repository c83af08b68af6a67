/*!
 # POSIX timezone rules

 Parses TZ strings of the form `EST5EDT,M3.2.0,M11.1.0` and converts UTC to
 local time. Only the `Mm.w.d` rule form is supported, which covers the
 rules shipped with common embedded SDKs.
*/

use crate::{Error, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

/// Default DST rule when a zone names a DST abbreviation without rules
const DEFAULT_RULE: &str = "M3.2.0,M11.1.0";

/// Largest hour count POSIX allows in an offset or transition time
const MAX_HOURS: u32 = 24;

/// Transitions happen at 02:00 local time unless stated otherwise
const DEFAULT_TRANSITION_SECS: i64 = 2 * 3600;

/// `Mm.w.d[/time]`: day `d` (0 = Sunday) of week `w` (5 = last) of month `m`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TransitionRule {
    month: u32,
    week: u32,
    weekday: u32,
    /// Local time of day of the switch, in seconds
    time: i64,
}

impl TransitionRule {
    fn date(&self, year: i32) -> Option<NaiveDate> {
        let first = NaiveDate::from_ymd_opt(year, self.month, 1)?;
        let first_weekday = first.weekday().num_days_from_sunday();
        let mut day = 1 + (self.weekday + 7 - first_weekday) % 7 + (self.week - 1) * 7;
        while NaiveDate::from_ymd_opt(year, self.month, day).is_none() {
            day -= 7;
        }
        NaiveDate::from_ymd_opt(year, self.month, day)
    }

    /// Local wall time of the switch in `year`
    fn local_instant(&self, year: i32) -> Option<NaiveDateTime> {
        let midnight = self.date(year)?.and_hms_opt(0, 0, 0)?;
        midnight.checked_add_signed(Duration::seconds(self.time))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DaylightSaving {
    name: String,
    /// Seconds east of UTC while DST is active
    offset: i64,
    start: TransitionRule,
    end: TransitionRule,
}

/// Parsed POSIX TZ rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosixTz {
    source: String,
    std_name: String,
    /// Seconds east of UTC
    std_offset: i64,
    dst: Option<DaylightSaving>,
}

impl PosixTz {
    /// Coordinated universal time
    pub fn utc() -> Self {
        PosixTz {
            source: "UTC0".to_string(),
            std_name: "UTC".to_string(),
            std_offset: 0,
            dst: None,
        }
    }

    /// Whether daylight saving time is in effect at `utc`
    pub fn is_dst(&self, utc: NaiveDateTime) -> bool {
        let Some(dst) = &self.dst else {
            return false;
        };
        let Some(standard) = utc.checked_add_signed(Duration::seconds(self.std_offset)) else {
            return false;
        };
        let year = standard.year();
        let (Some(start), Some(end)) = (dst.start.local_instant(year), dst.end.local_instant(year))
        else {
            return false;
        };
        // Start is given in standard time, end in daylight time.
        let (Some(start), Some(end)) = (
            start.checked_sub_signed(Duration::seconds(self.std_offset)),
            end.checked_sub_signed(Duration::seconds(dst.offset)),
        ) else {
            return false;
        };

        if start < end {
            start <= utc && utc < end
        } else {
            !(end <= utc && utc < start)
        }
    }

    /// Seconds east of UTC at `utc`
    pub fn offset_at(&self, utc: NaiveDateTime) -> i64 {
        match &self.dst {
            Some(dst) if self.is_dst(utc) => dst.offset,
            _ => self.std_offset,
        }
    }

    /// Local wall time at `utc`; stays in UTC at the edges of the calendar
    pub fn to_local(&self, utc: NaiveDateTime) -> NaiveDateTime {
        utc.checked_add_signed(Duration::seconds(self.offset_at(utc)))
            .unwrap_or(utc)
    }

    /// Zone abbreviation in effect at `utc`
    pub fn abbreviation(&self, utc: NaiveDateTime) -> &str {
        match &self.dst {
            Some(dst) if self.is_dst(utc) => &dst.name,
            _ => &self.std_name,
        }
    }
}

impl Default for PosixTz {
    fn default() -> Self {
        Self::utc()
    }
}

impl fmt::Display for PosixTz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Cursor over a TZ string
struct Scanner<'a> {
    rest: &'a str,
}

impl<'a> Scanner<'a> {
    fn eat(&mut self, c: char) -> bool {
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn name(&mut self) -> Option<&'a str> {
        if self.eat('<') {
            let end = self.rest.find('>')?;
            let name = &self.rest[..end];
            self.rest = &self.rest[end + 1..];
            return (name.len() >= 3).then_some(name);
        }
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(self.rest.len());
        let name = &self.rest[..end];
        self.rest = &self.rest[end..];
        (name.len() >= 3).then_some(name)
    }

    fn number(&mut self) -> Option<u32> {
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let value = self.rest[..end].parse().ok()?;
        self.rest = &self.rest[end..];
        Some(value)
    }

    /// `[+-]hh[:mm[:ss]]` in seconds
    fn duration(&mut self) -> Option<i64> {
        let sign = if self.eat('-') {
            -1
        } else {
            self.eat('+');
            1
        };
        let hours = self.number().filter(|hours| *hours <= MAX_HOURS)?;
        let mut seconds = i64::from(hours) * 3600;
        if self.eat(':') {
            seconds += i64::from(self.number().filter(|minutes| *minutes <= 59)?) * 60;
            if self.eat(':') {
                seconds += i64::from(self.number().filter(|secs| *secs <= 59)?);
            }
        }
        Some(sign * seconds)
    }

    fn rule(&mut self) -> Option<TransitionRule> {
        if !self.eat('M') {
            return None;
        }
        let month = self.number()?;
        self.eat('.').then_some(())?;
        let week = self.number()?;
        self.eat('.').then_some(())?;
        let weekday = self.number()?;
        if !(1..=12).contains(&month) || !(1..=5).contains(&week) || weekday > 6 {
            return None;
        }
        let time = if self.eat('/') {
            self.duration()?
        } else {
            DEFAULT_TRANSITION_SECS
        };
        Some(TransitionRule {
            month,
            week,
            weekday,
            time,
        })
    }
}

fn parse_tz(source: &str) -> Option<PosixTz> {
    let mut scanner = Scanner { rest: source };

    let std_name = scanner.name()?.to_string();
    // POSIX offsets count hours west of UTC.
    let std_offset = -scanner.duration()?;

    if scanner.rest.is_empty() {
        return Some(PosixTz {
            source: source.to_string(),
            std_name,
            std_offset,
            dst: None,
        });
    }

    let dst_name = scanner.name()?.to_string();
    let dst_offset = match scanner.peek() {
        Some(',') | None => std_offset + 3600,
        _ => -scanner.duration()?,
    };

    let mut rules = if scanner.eat(',') {
        scanner
    } else if scanner.rest.is_empty() {
        Scanner { rest: DEFAULT_RULE }
    } else {
        return None;
    };
    let start = rules.rule()?;
    rules.eat(',').then_some(())?;
    let end = rules.rule()?;
    if !rules.rest.is_empty() {
        return None;
    }

    Some(PosixTz {
        source: source.to_string(),
        std_name,
        std_offset,
        dst: Some(DaylightSaving {
            name: dst_name,
            offset: dst_offset,
            start,
            end,
        }),
    })
}

impl FromStr for PosixTz {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_tz(s.trim()).ok_or_else(|| Error::InvalidTimezone(s.to_string()))
    }
}
