//! Yearly Islamic events and next-occurrence resolution.
//!
//! Each Ramadan start (from [`RAMADAN_TABLE`] or the proportional estimate)
//! anchors one cycle of events at fixed day offsets. Dates published by an
//! authority for a given Hijri year then override the calculated ones.
//! The offsets are approximations of the lunar calendar and can be a few
//! days off; the override table is where corrections belong.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::hijri::HIJRI_YEAR_DAYS;

/// Days after its start during which an event counts as "in progress".
pub const EVENT_WINDOW_DAYS: i64 = 30;
/// Number of entries in the upcoming-events list.
pub const UPCOMING_LIMIT: usize = 6;

const ANCHOR_HIJRI_YEAR: u32 = 1447;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    IsraMiraj,
    Ramadan,
    LailatulQadr,
    EidAlFitr,
    AwalDzulhijjah,
    Arafah,
    EidAlAdha,
    IslamicNewYear,
    Ashura,
    Maulid,
}

impl EventKind {
    pub fn importance(&self) -> Importance {
        match self {
            Self::Ramadan | Self::EidAlFitr | Self::EidAlAdha | Self::IslamicNewYear | Self::Maulid => {
                Importance::Major
            }
            _ => Importance::Special,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::IsraMiraj => "Perjalanan malam Nabi Muhammad SAW",
            Self::Ramadan => "Bulan suci puasa umat Islam",
            Self::LailatulQadr => "Malam seribu bulan",
            Self::EidAlFitr => "Hari raya Idul Fitri",
            Self::AwalDzulhijjah => "Bulan haji dimulai",
            Self::Arafah => "Hari wukuf di Arafah",
            Self::EidAlAdha => "Hari raya Idul Adha",
            Self::IslamicNewYear => "Tahun baru Hijriah",
            Self::Ashura => "Hari Asyura",
            Self::Maulid => "Hari kelahiran Nabi Muhammad SAW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Major,
    Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Authoritative,
    Calculated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IslamicEvent {
    pub kind: EventKind,
    pub name: String,
    pub description: String,
    pub gregorian_date: NaiveDate,
    pub hijri_label: String,
    pub importance: Importance,
    pub is_upcoming: bool,
    pub source_confidence: Confidence,
}

impl IslamicEvent {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.gregorian_date.and_time(NaiveTime::MIN)
    }

    pub fn window_end(&self) -> NaiveDateTime {
        self.starts_at() + Duration::days(EVENT_WINDOW_DAYS)
    }

    /// True while `now` lies in `[start, start + 30 days]`.
    pub fn is_in_progress(&self, now: NaiveDateTime) -> bool {
        self.starts_at() <= now && now <= self.window_end()
    }
}

// ============================================================================
// Ramadan anchors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamadanStart {
    pub hijri_year: u32,
    pub date: NaiveDate,
    pub confidence: Confidence,
}

/// (Gregorian year, month, day, Hijri year, confidence). 2026 is the
/// Muhammadiyah announcement, the other rows are published estimates.
pub const RAMADAN_TABLE: [(i32, u32, u32, u32, Confidence); 6] = [
    (2025, 2, 28, 1446, Confidence::Calculated),
    (2026, 2, 18, 1447, Confidence::Authoritative),
    (2027, 2, 7, 1448, Confidence::Calculated),
    (2028, 1, 27, 1449, Confidence::Calculated),
    (2029, 1, 16, 1450, Confidence::Calculated),
    (2030, 1, 5, 1451, Confidence::Calculated),
];

/// Officially announced dates, keyed by the Hijri year of their Ramadan cycle.
pub const AUTHORITATIVE_EVENTS: [(u32, EventKind, i32, u32, u32); 4] = [
    (1447, EventKind::EidAlFitr, 2026, 3, 20),
    (1447, EventKind::AwalDzulhijjah, 2026, 5, 18),
    (1447, EventKind::Arafah, 2026, 5, 26),
    (1447, EventKind::EidAlAdha, 2026, 5, 27),
];

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn anchor_date() -> NaiveDate {
    ymd(2026, 2, 18).unwrap_or(NaiveDate::MIN)
}

/// Start of Ramadan for a Hijri year: the table when it has a row,
/// otherwise whole Hijri years of 354.37 days counted from the 2026 anchor.
pub fn ramadan_start(hijri_year: u32) -> RamadanStart {
    let listed = RAMADAN_TABLE
        .iter()
        .find(|row| row.3 == hijri_year)
        .and_then(|&(y, m, d, h, confidence)| Some(RamadanStart { hijri_year: h, date: ymd(y, m, d)?, confidence }));
    if let Some(start) = listed {
        return start;
    }

    let years = i64::from(hijri_year) - i64::from(ANCHOR_HIJRI_YEAR);
    let shift = (years as f64 * HIJRI_YEAR_DAYS + 0.5).floor() as i64;
    RamadanStart {
        hijri_year,
        date: anchor_date() + Duration::days(shift),
        confidence: Confidence::Calculated,
    }
}

/// Every Ramadan that begins within the Gregorian `year` (zero, one or two).
pub fn ramadans_starting_in(year: i32) -> Vec<RamadanStart> {
    let Some(jan_first) = ymd(year, 1, 1) else {
        return Vec::new();
    };
    let elapsed = (jan_first - anchor_date()).num_days() as f64 / HIJRI_YEAR_DAYS;
    let estimate = i64::from(ANCHOR_HIJRI_YEAR) + elapsed.floor() as i64;

    (estimate - 1..=estimate + 2)
        .filter_map(|h| u32::try_from(h).ok())
        .map(ramadan_start)
        .filter(|start| start.date.year() == year)
        .collect()
}

// ============================================================================
// Event generation
// ============================================================================

fn authoritative_date(hijri_year: u32, kind: EventKind) -> Option<NaiveDate> {
    AUTHORITATIVE_EVENTS
        .iter()
        .find(|row| row.0 == hijri_year && row.1 == kind)
        .and_then(|&(_, _, y, m, d)| ymd(y, m, d))
}

/// All events anchored on one Ramadan start.
pub fn events_for_cycle(start: RamadanStart, today: NaiveDate) -> Vec<IslamicEvent> {
    let h = start.hijri_year;
    let ramadan = start.date;
    let eid_fitr = ramadan + Duration::days(30);
    let eid_adha = eid_fitr + Duration::days(70);
    let new_year = ramadan + Duration::days(100);

    let cycle = [
        (EventKind::IsraMiraj, "Isra Miraj".to_string(), ramadan - Duration::days(60), format!("27 Rajab {h}")),
        (EventKind::Ramadan, format!("Ramadan {h} H"), ramadan, format!("1 Ramadan {h}")),
        (EventKind::LailatulQadr, "Lailatul Qadr".into(), ramadan + Duration::days(26), format!("27 Ramadan {h}")),
        (EventKind::EidAlFitr, "Eid al-Fitr".into(), eid_fitr, format!("1 Syawal {h}")),
        (EventKind::AwalDzulhijjah, "Awal Dzulhijjah".into(), eid_adha - Duration::days(9), format!("1 Dzulhijjah {h}")),
        (EventKind::Arafah, "Hari Arafah".into(), eid_adha - Duration::days(1), format!("9 Dzulhijjah {h}")),
        (EventKind::EidAlAdha, "Eid al-Adha".into(), eid_adha, format!("10 Dzulhijjah {h}")),
        (EventKind::IslamicNewYear, format!("Muharram {} H", h + 1), new_year, format!("1 Muharram {}", h + 1)),
        (EventKind::Ashura, "Ashura".into(), new_year + Duration::days(9), format!("10 Muharram {}", h + 1)),
        (EventKind::Maulid, "Maulid Nabi".into(), new_year + Duration::days(70), format!("12 Rabiul Awwal {}", h + 1)),
    ];

    cycle
        .into_iter()
        .map(|(kind, name, calculated, hijri_label)| {
            let (gregorian_date, source_confidence) = match (kind, authoritative_date(h, kind)) {
                (EventKind::Ramadan, _) => (calculated, start.confidence),
                (_, Some(official)) => (official, Confidence::Authoritative),
                (_, None) => (calculated, Confidence::Calculated),
            };
            IslamicEvent {
                kind,
                name,
                description: kind.description().into(),
                gregorian_date,
                hijri_label,
                importance: kind.importance(),
                is_upcoming: gregorian_date >= today,
                source_confidence,
            }
        })
        .collect()
}

// ============================================================================
// EventCalendar
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct UpcomingEvent<'a> {
    pub event: &'a IslamicEvent,
    pub days_until: i64,
}

/// Events dated in the current Gregorian year or the next, sorted by date.
///
/// Cycles are built from the previous year's Ramadan on, since a Ramadan
/// starting late in one year puts most of its cycle into the following one.
#[derive(Debug, Clone)]
pub struct EventCalendar {
    first_year: i32,
    events: Vec<IslamicEvent>,
}

impl EventCalendar {
    pub fn generate(today: NaiveDate) -> Self {
        let first_year = today.year();
        let years = first_year..=first_year + 1;
        let mut events: Vec<IslamicEvent> = (first_year - 1..=first_year + 1)
            .flat_map(ramadans_starting_in)
            .flat_map(|start| events_for_cycle(start, today))
            .filter(|e| years.contains(&e.gregorian_date.year()))
            .collect();
        events.sort_by_key(|e| e.gregorian_date);

        tracing::debug!(first_year, count = events.len(), "Islamic events generated");
        Self { first_year, events }
    }

    pub fn first_year(&self) -> i32 {
        self.first_year
    }

    pub fn events(&self) -> &[IslamicEvent] {
        &self.events
    }

    /// Next occurrence of `kind` relative to `now`.
    ///
    /// An occurrence still ahead wins. While `now` is inside an occurrence's
    /// 30-day window, the next later occurrence of the same kind is the
    /// target instead (or the current one when none was generated). When
    /// every occurrence is behind, the last one is returned.
    pub fn resolve_next(&self, kind: EventKind, now: NaiveDateTime) -> Option<&IslamicEvent> {
        let same: Vec<&IslamicEvent> = self.events.iter().filter(|e| e.kind == kind).collect();

        for (i, &event) in same.iter().enumerate() {
            if now < event.starts_at() {
                return Some(event);
            }
            if event.is_in_progress(now) {
                let end = event.window_end();
                let following = same[i + 1..].iter().find(|e| e.starts_at() > end);
                return Some(following.copied().unwrap_or(event));
            }
        }

        same.last().copied()
    }

    /// Events from today on, nearest first, capped at [`UPCOMING_LIMIT`].
    pub fn upcoming(&self, now: NaiveDateTime) -> Vec<UpcomingEvent<'_>> {
        let today = now.date();
        self.events
            .iter()
            .filter(|e| e.gregorian_date >= today)
            .take(UPCOMING_LIMIT)
            .map(|event| UpcomingEvent { event, days_until: days_until(event.starts_at(), now) })
            .collect()
    }
}

/// Whole days until `start`, rounded up; zero once it has begun.
pub fn days_until(start: NaiveDateTime, now: NaiveDateTime) -> i64 {
    let secs = (start - now).num_seconds();
    if secs <= 0 { 0 } else { (secs + 86_399) / 86_400 }
}

/// The Ramadan the yearly countdown should track at `now`.
pub fn resolve_next_ramadan(now: NaiveDateTime) -> Option<IslamicEvent> {
    EventCalendar::generate(now.date())
        .resolve_next(EventKind::Ramadan, now)
        .cloned()
}
