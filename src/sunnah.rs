//! Sunnah (voluntary) prayer times derived from the five daily prayers.
//!
//! All arithmetic is in minutes since midnight. A field whose inputs are
//! missing or malformed comes out as [`SunnahTime::Unknown`] instead of
//! failing the whole derivation.

use std::fmt;

use crate::clock::{ClockTime, DailyTimings, MINUTES_PER_DAY, Prayer, UNKNOWN_TIME};

const SUNRISE_AFTER_FAJR: i64 = 20;
const DHUHA_AFTER_SUNRISE: i64 = 15;
const DHUHA_BEFORE_DHUHR: i64 = 30;
const QABLIYAH_LEAD: i64 = 30;
const BADIYAH_DELAY: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SunnahTime {
    At(ClockTime),
    Window(ClockTime, ClockTime),
    Unknown,
}

impl fmt::Display for SunnahTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(t) => write!(f, "{t}"),
            Self::Window(start, end) => write!(f, "{start} - {end}"),
            Self::Unknown => f.write_str(UNKNOWN_TIME),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunnahTimings {
    pub tahajud: SunnahTime,
    pub dhuha: SunnahTime,
    pub witr: SunnahTime,
    pub qabliyah_subuh: SunnahTime,
    pub qabliyah_dzuhur: SunnahTime,
    pub badiyah_dzuhur: SunnahTime,
}

impl SunnahTimings {
    pub const UNKNOWN: SunnahTimings = SunnahTimings {
        tahajud: SunnahTime::Unknown,
        dhuha: SunnahTime::Unknown,
        witr: SunnahTime::Unknown,
        qabliyah_subuh: SunnahTime::Unknown,
        qabliyah_dzuhur: SunnahTime::Unknown,
        badiyah_dzuhur: SunnahTime::Unknown,
    };

    /// Display rows in the order the dashboard lists them.
    pub fn rows(&self) -> [(&'static str, SunnahTime); 6] {
        [
            ("Tahajud", self.tahajud),
            ("Dhuha", self.dhuha),
            ("Witir", self.witr),
            ("Qabliyah Subuh", self.qabliyah_subuh),
            ("Qabliyah Dzuhur", self.qabliyah_dzuhur),
            ("Ba'diyah Dzuhur", self.badiyah_dzuhur),
        ]
    }
}

/// Wraps a derived minute value into the day, or `None` when it is too far
/// outside one day to be a meaningful offset.
fn normalize(minutes: i64) -> Option<ClockTime> {
    (-MINUTES_PER_DAY..2 * MINUTES_PER_DAY)
        .contains(&minutes)
        .then(|| ClockTime::from_minutes(minutes))
}

fn point(minutes: Option<i64>) -> SunnahTime {
    minutes.and_then(normalize).map_or(SunnahTime::Unknown, SunnahTime::At)
}

fn window(start: Option<i64>, end: Option<i64>) -> SunnahTime {
    match (start.and_then(normalize), end.and_then(normalize)) {
        (Some(s), Some(e)) => SunnahTime::Window(s, e),
        _ => SunnahTime::Unknown,
    }
}

/// Length of the night from Isha to the next Fajr, in minutes.
pub fn night_duration(isha: i64, fajr: i64) -> i64 {
    if fajr <= isha {
        fajr + MINUTES_PER_DAY - isha
    } else {
        fajr - isha
    }
}

pub fn derive(timings: &DailyTimings) -> SunnahTimings {
    let minutes = |prayer: Prayer| match timings.clock(prayer) {
        Ok(t) => Some(t.minutes()),
        Err(e) => {
            tracing::debug!(prayer = prayer.key(), error = %e, "Unusable prayer time");
            None
        }
    };
    let fajr = minutes(Prayer::Fajr);
    let dhuhr = minutes(Prayer::Dhuhr);
    let isha = minutes(Prayer::Isha);

    // Start of the last third of the night.
    let tahajud = fajr.zip(isha).map(|(f, i)| i + night_duration(i, f) * 2 / 3);

    let sunrise = fajr.map(|f| f + SUNRISE_AFTER_FAJR);

    SunnahTimings {
        tahajud: point(tahajud),
        dhuha: window(
            sunrise.map(|s| s + DHUHA_AFTER_SUNRISE),
            dhuhr.map(|d| d - DHUHA_BEFORE_DHUHR),
        ),
        witr: window(isha, fajr),
        qabliyah_subuh: point(fajr.map(|f| f - QABLIYAH_LEAD)),
        qabliyah_dzuhur: point(dhuhr.map(|d| d - QABLIYAH_LEAD)),
        badiyah_dzuhur: point(dhuhr.map(|d| d + BADIYAH_DELAY)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jakarta() -> DailyTimings {
        DailyTimings::new("04:40", "12:10", "15:30", "18:05", "19:15")
    }

    #[test]
    fn derives_all_six_times() {
        let s = derive(&jakarta());
        // night = 04:40 + 24h - 19:15 = 565 min, two thirds = 376 min.
        assert_eq!(s.tahajud.to_string(), "01:31");
        assert_eq!(s.dhuha.to_string(), "05:15 - 11:40");
        assert_eq!(s.witr.to_string(), "19:15 - 04:40");
        assert_eq!(s.qabliyah_subuh.to_string(), "04:10");
        assert_eq!(s.qabliyah_dzuhur.to_string(), "11:40");
        assert_eq!(s.badiyah_dzuhur.to_string(), "12:25");
    }

    #[test]
    fn derivation_is_deterministic() {
        let t = jakarta();
        assert_eq!(derive(&t), derive(&t));
    }

    #[test]
    fn tahajud_falls_inside_the_night() {
        let s = derive(&DailyTimings::new("04:30", "12:00", "15:15", "18:00", "19:00"));
        let SunnahTime::At(t) = s.tahajud else {
            panic!("tahajud should be known, got {:?}", s.tahajud);
        };
        // Measured from Isha across midnight, strictly between Isha and Fajr.
        let since_isha = (t.minutes() - 19 * 60).rem_euclid(MINUTES_PER_DAY);
        let night = night_duration(19 * 60, 4 * 60 + 30);
        assert!(since_isha > 0 && since_isha < night, "{t} outside the night");
        assert_eq!(t.to_string(), "01:20");
    }

    #[test]
    fn qabliyah_subuh_wraps_before_midnight() {
        let s = derive(&DailyTimings::new("00:10", "12:00", "15:00", "18:00", "19:30"));
        assert_eq!(s.qabliyah_subuh.to_string(), "23:40");
    }

    #[test]
    fn equal_fajr_and_isha_spans_a_full_day() {
        assert_eq!(night_duration(300, 300), MINUTES_PER_DAY);
    }

    #[test]
    fn malformed_inputs_only_blank_dependent_fields() {
        let mut t = jakarta();
        t.isha = "late".into();
        let s = derive(&t);
        assert_eq!(s.tahajud, SunnahTime::Unknown);
        assert_eq!(s.witr, SunnahTime::Unknown);
        assert_eq!(s.qabliyah_subuh.to_string(), "04:10");
        assert_eq!(s.dhuha.to_string(), "05:15 - 11:40");
    }

    #[test]
    fn fully_malformed_inputs_yield_sentinels() {
        for bad in ["", "NaN:NaN", "99:99", "12", "ab:cd"] {
            let s = derive(&DailyTimings::new(bad, bad, bad, bad, bad));
            assert_eq!(s, SunnahTimings::UNKNOWN, "input {bad:?}");
            assert!(s.rows().iter().all(|(_, v)| v.to_string() == UNKNOWN_TIME));
        }
        assert_eq!(derive(&DailyTimings::default()), SunnahTimings::UNKNOWN);
    }
}
