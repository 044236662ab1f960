//! Injected notion of "now" and "today"
//!
//! The recalculator never reads the system time directly. It asks a [`Clock`]
//! for the current instant and truncates it to a calendar day in the
//! configured [`ReferenceZone`].

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The calendar day containing `now()` in `zone`
    fn today(&self, zone: ReferenceZone) -> NaiveDate {
        zone.day_of(self.now())
    }
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a single instant, for tests and replays
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    /// Noon UTC on `date`, which is the same calendar day in every zone
    /// between -11:59 and +11:59
    pub fn on(date: NaiveDate) -> Self {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();
        Self(Utc.from_utc_datetime(&date.and_time(noon)))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Timezone used to truncate "now" to a calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReferenceZone {
    #[default]
    Utc,
    /// Fixed offset east of UTC, in seconds
    Offset(i32),
}

impl ReferenceZone {
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            ReferenceZone::Utc => instant.date_naive(),
            ReferenceZone::Offset(secs) => match FixedOffset::east_opt(*secs) {
                Some(offset) => instant.with_timezone(&offset).date_naive(),
                None => instant.date_naive(),
            },
        }
    }
}

impl std::fmt::Display for ReferenceZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceZone::Utc => write!(f, "UTC"),
            ReferenceZone::Offset(secs) => {
                let sign = if *secs < 0 { '-' } else { '+' };
                let abs = secs.unsigned_abs();
                write!(f, "{}{:02}:{:02}", sign, abs / 3600, (abs % 3600) / 60)
            }
        }
    }
}

impl std::str::FromStr for ReferenceZone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("utc") || s == "Z" || s == "+00:00" {
            return Ok(ReferenceZone::Utc);
        }
        let (sign, rest) = match s.chars().next() {
            Some('+') => (1, &s[1..]),
            Some('-') => (-1, &s[1..]),
            _ => return Err(format!("Unknown reference zone: {} (use UTC or ±HH:MM)", s)),
        };
        let (hours, minutes) = rest
            .split_once(':')
            .ok_or_else(|| format!("Unknown reference zone: {} (use UTC or ±HH:MM)", s))?;
        let hours: i32 = hours
            .parse()
            .map_err(|_| format!("Invalid hour offset in {}", s))?;
        let minutes: i32 = minutes
            .parse()
            .map_err(|_| format!("Invalid minute offset in {}", s))?;
        if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
            return Err(format!("Offset out of range: {}", s));
        }
        Ok(ReferenceZone::Offset(sign * (hours * 3600 + minutes * 60)))
    }
}

impl TryFrom<String> for ReferenceZone {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReferenceZone> for String {
    fn from(zone: ReferenceZone) -> Self {
        zone.to_string()
    }
}
