//! Live countdowns: the next prayer (ticked every second) and the next
//! yearly event (ticked every minute).

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::{
    clock::{ClockTime, DailyTimings, Prayer, format_hms},
    events::{IslamicEvent, days_until},
};

pub const PRAYER_TICK: std::time::Duration = std::time::Duration::from_secs(1);
pub const EVENT_TICK: std::time::Duration = std::time::Duration::from_secs(60);

/// Shown in place of a countdown when there is nothing to count to.
pub const UNKNOWN_COUNTDOWN: &str = "--:--:--";

// ============================================================================
// Next prayer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrayerTarget {
    pub prayer: Prayer,
    pub at: NaiveDateTime,
    pub tomorrow: bool,
}

/// The first prayer of `date` whose minute is strictly after the minute of
/// `now`, else Fajr of the following day. `None` when the timings hold no
/// usable candidate.
pub fn next_prayer(timings: &DailyTimings, date: NaiveDate, now: NaiveDateTime) -> Option<PrayerTarget> {
    let now_minute = ClockTime::of(now).minutes();

    let today = Prayer::ALL.into_iter().find_map(|prayer| {
        let t = timings.clock(prayer).ok()?;
        (t.minutes() > now_minute).then(|| PrayerTarget { prayer, at: t.on(date), tomorrow: false })
    });
    if today.is_some() {
        return today;
    }

    let fajr = timings.clock(Prayer::Fajr).ok()?;
    Some(PrayerTarget {
        prayer: Prayer::Fajr,
        at: fajr.on(date + Duration::days(1)),
        tomorrow: true,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrayerCountdownState {
    Idle,
    Live(PrayerTarget),
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrayerTick {
    Idle,
    Running { remaining_secs: i64 },
    Retargeted(PrayerTarget),
    /// The held timings are not for today; fetch new ones and call `load`.
    RefreshNeeded,
}

#[derive(Debug, Clone)]
pub struct PrayerCountdown {
    timings: Option<(NaiveDate, DailyTimings)>,
    state: PrayerCountdownState,
}

impl Default for PrayerCountdown {
    fn default() -> Self {
        Self::new()
    }
}

impl PrayerCountdown {
    pub fn new() -> Self {
        Self {
            timings: None,
            state: PrayerCountdownState::Idle,
        }
    }

    pub fn state(&self) -> PrayerCountdownState {
        self.state
    }

    /// Replaces the held timings (for `date`) and targets from `now`.
    pub fn load(&mut self, date: NaiveDate, timings: DailyTimings, now: NaiveDateTime) -> PrayerCountdownState {
        self.state = match next_prayer(&timings, date, now) {
            Some(target) => PrayerCountdownState::Live(target),
            None => PrayerCountdownState::Idle,
        };
        self.timings = Some((date, timings));
        self.state
    }

    pub fn tick(&mut self, now: NaiveDateTime) -> PrayerTick {
        let target = match self.state {
            PrayerCountdownState::Live(target) if now < target.at => {
                return PrayerTick::Running {
                    remaining_secs: (target.at - now).num_seconds(),
                };
            }
            PrayerCountdownState::Live(target) => target,
            PrayerCountdownState::Expired => return PrayerTick::RefreshNeeded,
            PrayerCountdownState::Idle => return PrayerTick::Idle,
        };

        tracing::debug!(prayer = target.prayer.key(), "Prayer countdown reached its target");
        self.state = PrayerCountdownState::Expired;

        let Some((date, timings)) = &self.timings else {
            return PrayerTick::RefreshNeeded;
        };
        if *date != now.date() {
            return PrayerTick::RefreshNeeded;
        }
        match next_prayer(timings, *date, now) {
            Some(next) => {
                self.state = PrayerCountdownState::Live(next);
                PrayerTick::Retargeted(next)
            }
            None => PrayerTick::RefreshNeeded,
        }
    }

    pub fn remaining_secs(&self, now: NaiveDateTime) -> Option<i64> {
        match self.state {
            PrayerCountdownState::Live(target) => Some((target.at - now).num_seconds().max(0)),
            _ => None,
        }
    }

    /// `HH:MM:SS` to the target, or [`UNKNOWN_COUNTDOWN`].
    pub fn display(&self, now: NaiveDateTime) -> String {
        self.remaining_secs(now)
            .map(format_hms)
            .unwrap_or_else(|| UNKNOWN_COUNTDOWN.into())
    }
}

// ============================================================================
// Yearly event
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    Upcoming { days: i64, hours: i64, minutes: i64 },
    InProgress,
    Expired,
}

/// Countdown to the start of one event. Past its 30-day window it reports
/// [`EventPhase::Expired`] until `retarget` supplies the next occurrence.
#[derive(Debug, Clone, Default)]
pub struct EventCountdown {
    target: Option<IslamicEvent>,
}

impl EventCountdown {
    pub fn new(target: Option<IslamicEvent>) -> Self {
        Self { target }
    }

    pub fn target(&self) -> Option<&IslamicEvent> {
        self.target.as_ref()
    }

    pub fn retarget(&mut self, target: Option<IslamicEvent>) {
        if let Some(event) = &target {
            tracing::info!(event = %event.name, date = %event.gregorian_date, "Event countdown retargeted");
        }
        self.target = target;
    }

    pub fn phase(&self, now: NaiveDateTime) -> Option<EventPhase> {
        let event = self.target.as_ref()?;
        let start = event.starts_at();
        if now < start {
            let secs = (start - now).num_seconds();
            return Some(EventPhase::Upcoming {
                days: secs / 86_400,
                hours: (secs % 86_400) / 3600,
                minutes: (secs % 3600) / 60,
            });
        }
        if event.is_in_progress(now) {
            Some(EventPhase::InProgress)
        } else {
            Some(EventPhase::Expired)
        }
    }

    /// True when the target is gone and the next occurrence should be resolved.
    pub fn needs_resolution(&self, now: NaiveDateTime) -> bool {
        matches!(self.phase(now), None | Some(EventPhase::Expired))
    }

    pub fn message(&self, now: NaiveDateTime) -> &'static str {
        match (&self.target, self.phase(now)) {
            (Some(_), Some(EventPhase::InProgress)) => tier_message(0),
            (Some(event), Some(EventPhase::Upcoming { .. })) => tier_message(days_until(event.starts_at(), now)),
            _ => tier_message(i64::MAX),
        }
    }
}

/// Encouragement shown under the Ramadan countdown, by whole days left.
pub fn tier_message(days: i64) -> &'static str {
    match days {
        i64::MIN..=0 => "Ramadan Mubarak!",
        1..=7 => "Bersiaplah, Ramadan tinggal beberapa hari lagi!",
        8..=30 => "Ramadan semakin dekat, tingkatkan ibadah",
        31..=60 => "Mulai persiapkan diri untuk menyambut Ramadan",
        _ => "Persiapkan diri untuk bulan suci Ramadan",
    }
}
