use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::error::{Result, ValidationError};
use crate::models::TimeUnit;

pub const DEFAULT_START_HOUR: u32 = 9;
pub const DEFAULT_END_HOUR: u32 = 22;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Structured view of a time-key: `YYYY-MM-DD` or `YYYY-MM-DDThh:mm-hh:mm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKey {
    Day(NaiveDate),
    Slot {
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    },
}

impl TimeKey {
    /// Only the canonical zero-padded form is accepted, so equal keys compare equal as strings.
    pub fn parse(key: &str) -> Result<Self> {
        let malformed = || ValidationError::MalformedTimeKey(key.to_string());
        match key.split_once('T') {
            None => parse_date(key).map(TimeKey::Day).ok_or_else(malformed),
            Some((date, slot)) => {
                let date = parse_date(date).ok_or_else(malformed)?;
                let (start, end) = slot.split_once('-').ok_or_else(malformed)?;
                let start = parse_time(start).ok_or_else(malformed)?;
                let end = parse_time(end).ok_or_else(malformed)?;
                if end <= start {
                    return Err(malformed());
                }
                Ok(TimeKey::Slot { date, start, end })
            }
        }
    }

    pub fn date(&self) -> NaiveDate {
        match *self {
            TimeKey::Day(date) | TimeKey::Slot { date, .. } => date,
        }
    }

    pub fn unit(&self) -> TimeUnit {
        match self {
            TimeKey::Day(_) => TimeUnit::Day,
            TimeKey::Slot { .. } => TimeUnit::Hour,
        }
    }

    /// Parse and require the key to match the event granularity.
    pub fn parse_for(key: &str, unit: TimeUnit) -> Result<Self> {
        let parsed = Self::parse(key)?;
        if parsed.unit() != unit {
            return Err(ValidationError::GranularityMismatch {
                key: key.to_string(),
                expected: unit,
            });
        }
        Ok(parsed)
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .filter(|d| d.format(DATE_FORMAT).to_string() == s)
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, TIME_FORMAT)
        .ok()
        .filter(|t| t.format(TIME_FORMAT).to_string() == s)
}

pub fn day_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn hour_key(date: NaiveDate, slot: &str) -> String {
    format!("{}T{}", day_key(date), slot)
}

/// One-hour slots for every start hour in `start_hour..=end_hour`.
/// The default 9..=22 yields `09:00-10:00` through `22:00-23:00`.
pub fn hour_slots(start_hour: u32, end_hour: u32) -> Vec<String> {
    (start_hour..=end_hour.min(22))
        .map(|hour| format!("{:02}:00-{:02}:00", hour, hour + 1))
        .collect()
}

/// Every candidate key between `from` and `to` inclusive.
pub fn keys_for_range(
    from: NaiveDate,
    to: NaiveDate,
    unit: TimeUnit,
    slots: &[String],
) -> Vec<String> {
    from.iter_days()
        .take_while(|d| *d <= to)
        .flat_map(|date| match unit {
            TimeUnit::Day => vec![day_key(date)],
            TimeUnit::Hour => slots.iter().map(|slot| hour_key(date, slot)).collect(),
        })
        .collect()
}

pub fn now(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}
