use std::{fmt, str::FromStr};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::InvalidTimeError;

// ============================================================================
// Constants
// ============================================================================

pub const MINUTES_PER_DAY: i64 = 24 * 60;
pub const UNKNOWN_TIME: &str = "--:--";
pub const DATE_KEY_FMT: &str = "%Y-%m-%d";

// ============================================================================
// ClockTime
// ============================================================================

/// Wall-clock time of the local day, stored as minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, InvalidTimeError> {
        if hour > 23 || minute > 59 {
            return Err(InvalidTimeError::OutOfRange { hour, minute });
        }
        Ok(Self((hour * 60 + minute) as u16))
    }

    /// Wraps any minute count into the local day.
    pub fn from_minutes(minutes: i64) -> Self {
        Self(minutes.rem_euclid(MINUTES_PER_DAY) as u16)
    }

    pub fn of(dt: NaiveDateTime) -> Self {
        Self((dt.hour() * 60 + dt.minute()) as u16)
    }

    pub fn minutes(self) -> i64 {
        i64::from(self.0)
    }

    pub fn hour(self) -> u32 {
        u32::from(self.0) / 60
    }

    pub fn minute(self) -> u32 {
        u32::from(self.0) % 60
    }

    /// The absolute local instant of this clock time on `date`.
    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::MIN) + Duration::minutes(self.minutes())
    }
}

impl FromStr for ClockTime {
    type Err = InvalidTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Providers may append a zone marker, e.g. "04:40 (WIB)".
        let token = s.split_whitespace().next().ok_or(InvalidTimeError::Missing)?;
        let malformed = || InvalidTimeError::Malformed(s.to_string());

        let (h, m) = token.split_once(':').ok_or_else(malformed)?;
        if h.is_empty() || m.len() != 2 || !h.chars().chain(m.chars()).all(|c| c.is_ascii_digit()) {
            return Err(malformed());
        }
        let hour = h.parse::<u32>().map_err(|_| malformed())?;
        let minute = m.parse::<u32>().map_err(|_| malformed())?;
        Self::from_hm(hour, minute)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

// ============================================================================
// Prayers
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Prayer {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    pub const ALL: [Prayer; 5] = [
        Prayer::Fajr,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Fajr => "Subuh",
            Self::Dhuhr => "Dzuhur",
            Self::Asr => "Ashar",
            Self::Maghrib => "Maghrib",
            Self::Isha => "Isya",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Fajr => "fajr",
            Self::Dhuhr => "dhuhr",
            Self::Asr => "asr",
            Self::Maghrib => "maghrib",
            Self::Isha => "isha",
        }
    }
}

// ============================================================================
// DailyTimings
// ============================================================================

/// The five canonical prayer times of one local day, in wire form.
///
/// Fields stay as the provider sent them ("HH:MM"); a missing field
/// deserializes as empty so bad data reaches [`crate::sunnah::derive`]
/// and the countdown as a sentinel rather than a load failure.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct DailyTimings {
    #[serde(default)]
    pub fajr: String,
    #[serde(default)]
    pub dhuhr: String,
    #[serde(default)]
    pub asr: String,
    #[serde(default)]
    pub maghrib: String,
    #[serde(default)]
    pub isha: String,
}

impl DailyTimings {
    pub fn new(fajr: &str, dhuhr: &str, asr: &str, maghrib: &str, isha: &str) -> Self {
        Self {
            fajr: fajr.into(),
            dhuhr: dhuhr.into(),
            asr: asr.into(),
            maghrib: maghrib.into(),
            isha: isha.into(),
        }
    }

    pub fn raw(&self, prayer: Prayer) -> &str {
        match prayer {
            Prayer::Fajr => &self.fajr,
            Prayer::Dhuhr => &self.dhuhr,
            Prayer::Asr => &self.asr,
            Prayer::Maghrib => &self.maghrib,
            Prayer::Isha => &self.isha,
        }
    }

    pub fn clock(&self, prayer: Prayer) -> Result<ClockTime, InvalidTimeError> {
        self.raw(prayer).parse()
    }

    /// Display string for one prayer, or the sentinel when malformed.
    pub fn display(&self, prayer: Prayer) -> String {
        self.clock(prayer)
            .map(|t| t.to_string())
            .unwrap_or_else(|_| UNKNOWN_TIME.into())
    }
}

// ============================================================================
// Formatting
// ============================================================================

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FMT).to_string()
}

/// `HH:MM:SS` for a non-negative number of seconds.
pub fn format_hms(total_secs: i64) -> String {
    let secs = total_secs.max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
