//! Day-of-week and time-of-day whitelists.
//!
//! Entries look like `MON:0800-1800`. The day is one of `MON`..`SUN` or
//! `ANY`; both times are four digits, compared as `HHMM` integers with an
//! inclusive range.

use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};

use super::entries;

/// One parsed whitelist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// `None` matches any day.
    pub day: Option<Weekday>,
    /// Start of the window as `HHMM`.
    pub start: u16,
    /// End of the window as `HHMM`, inclusive.
    pub end: u16,
}

impl TimeWindow {
    /// Whether `at` falls inside this window.
    ///
    /// A window whose start is after its end matches nothing.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        if self.day.is_some_and(|day| day != at.weekday()) {
            return false;
        }
        let hhmm = (at.hour() * 100 + at.minute()) as u16;
        self.start <= hhmm && hhmm <= self.end
    }
}

impl FromStr for TimeWindow {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (day, range) = s.split_once(':').ok_or(())?;
        let (start, end) = range.split_once('-').ok_or(())?;
        Ok(Self {
            day: parse_day(day)?,
            start: parse_hhmm(start)?,
            end: parse_hhmm(end)?,
        })
    }
}

fn parse_day(day: &str) -> Result<Option<Weekday>, ()> {
    let day = match day.to_ascii_uppercase().as_str() {
        "ANY" => return Ok(None),
        "MON" => Weekday::Mon,
        "TUE" => Weekday::Tue,
        "WED" => Weekday::Wed,
        "THU" => Weekday::Thu,
        "FRI" => Weekday::Fri,
        "SAT" => Weekday::Sat,
        "SUN" => Weekday::Sun,
        _ => return Err(()),
    };
    Ok(Some(day))
}

// Shape only: "9999" is accepted.
fn parse_hhmm(text: &str) -> Result<u16, ()> {
    if text.len() != 4 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(());
    }
    text.parse().map_err(|_| ())
}

/// Whether every comma-separated entry has the `DOW:HHMM-HHMM` shape.
///
/// The empty list is valid.
pub fn validate_time_whitelist(text: &str) -> bool {
    entries(text).all(|entry| entry.parse::<TimeWindow>().is_ok())
}

/// Whether `at` is permitted by the whitelist.
///
/// The empty list always permits.
pub fn check_time_whitelist(text: &str, at: NaiveDateTime) -> bool {
    if entries(text).next().is_none() {
        return true;
    }
    entries(text)
        .filter_map(|entry| entry.parse::<TimeWindow>().ok())
        .any(|w| w.contains(at))
}
