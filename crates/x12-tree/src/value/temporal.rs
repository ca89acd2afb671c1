//! Date and time payloads
//!
//! Dates arrive as CCYYMMDD or YYMMDD; times as HHMM with optional seconds
//! and decimal seconds. Payloads remember the width they were read at so
//! the writer reproduces it.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

/// Two-digit years below this pivot land in the 2000s.
const CENTURY_PIVOT: u32 = 70;

/// A parsed date payload
#[derive(Debug, Clone, Copy)]
pub struct DateValue {
    /// The calendar date
    pub date: NaiveDate,
    /// Whether the input carried an explicit century
    pub century: bool,
}

impl DateValue {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let (year, rest, century) = match raw.len() {
            8 => (raw[0..4].parse::<i32>().ok()?, &raw[4..], true),
            6 => {
                let yy = raw[0..2].parse::<u32>().ok()?;
                let year = if yy < CENTURY_PIVOT { 2000 + yy } else { 1900 + yy };
                (year as i32, &raw[2..], false)
            }
            _ => return None,
        };
        let month = rest[0..2].parse::<u32>().ok()?;
        let day = rest[2..4].parse::<u32>().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        Some(Self { date, century })
    }

    pub(crate) fn rendered_width(&self) -> usize {
        if self.century {
            8
        } else {
            6
        }
    }

    pub(crate) fn render(&self, max_length: usize, truncate: bool) -> String {
        if self.century && (!truncate || max_length >= 8) {
            format!(
                "{:04}{:02}{:02}",
                self.date.year(),
                self.date.month(),
                self.date.day()
            )
        } else {
            format!(
                "{:02}{:02}{:02}",
                self.date.year().rem_euclid(100),
                self.date.month(),
                self.date.day()
            )
        }
    }
}

impl PartialEq for DateValue {
    fn eq(&self, other: &Self) -> bool {
        self.date == other.date
    }
}

/// A parsed time payload
#[derive(Debug, Clone, Copy)]
pub struct TimeValue {
    /// The time of day
    pub time: NaiveTime,
    /// Rendered digit count the input carried (4, 6, 7, or 8)
    pub width: u8,
}

impl TimeValue {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if !matches!(raw.len(), 4 | 6 | 7 | 8) {
            return None;
        }

        let hour = raw[0..2].parse::<u32>().ok()?;
        let minute = raw[2..4].parse::<u32>().ok()?;
        let second = if raw.len() >= 6 {
            raw[4..6].parse::<u32>().ok()?
        } else {
            0
        };
        let milli = match raw.len() {
            7 => raw[6..7].parse::<u32>().ok()? * 100,
            8 => raw[6..8].parse::<u32>().ok()? * 10,
            _ => 0,
        };

        let time = NaiveTime::from_hms_milli_opt(hour, minute, second, milli)?;
        Some(Self {
            time,
            width: raw.len() as u8,
        })
    }

    pub(crate) fn render(&self, max_length: usize, truncate: bool) -> String {
        let mut width = usize::from(self.width);
        if truncate {
            // Shrink to the widest well-formed representation that fits.
            while width > max_length && width > 4 {
                width = match width {
                    8 => 7,
                    7 => 6,
                    _ => 4,
                };
            }
        }

        let mut out = format!("{:02}{:02}", self.time.hour(), self.time.minute());
        if width >= 6 {
            out.push_str(&format!("{:02}", self.time.second()));
        }
        let centis = self.time.nanosecond() / 10_000_000;
        if width == 7 {
            out.push_str(&format!("{}", centis / 10));
        } else if width == 8 {
            out.push_str(&format!("{centis:02}"));
        }
        out
    }
}

impl PartialEq for TimeValue {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time
    }
}
