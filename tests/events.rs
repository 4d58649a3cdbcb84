//! Next-occurrence resolution over generated event calendars.

mod common;

use common::{at, date};
use miqat::events::{Confidence, EventCalendar, EventKind, resolve_next_ramadan};

#[test]
fn ramadan_window_wraps_to_the_following_year() {
    let start = at(2026, 2, 18, 0, 0);
    let mut now = start;
    while now <= start + chrono::Duration::days(30) {
        let next = resolve_next_ramadan(now).unwrap();
        assert_eq!(next.gregorian_date, date(2027, 2, 7), "now = {now}");
        now += chrono::Duration::hours(13);
    }
}

#[test]
fn the_day_before_ramadan_still_counts_down_to_it() {
    let next = resolve_next_ramadan(at(2026, 2, 17, 23, 59)).unwrap();
    assert_eq!(next.gregorian_date, date(2026, 2, 18));
    assert_eq!(next.source_confidence, Confidence::Authoritative);
}

#[test]
fn other_kinds_resolve_independently() {
    let calendar = EventCalendar::generate(date(2026, 6, 1));
    let now = at(2026, 6, 1, 12, 0);

    let adha = calendar.resolve_next(EventKind::EidAlAdha, now).unwrap();
    assert_eq!(adha.gregorian_date, date(2027, 5, 18));

    let new_year = calendar.resolve_next(EventKind::IslamicNewYear, now).unwrap();
    assert_eq!(new_year.name, "Muharram 1449 H");

    let maulid = calendar.resolve_next(EventKind::Maulid, now).unwrap();
    assert_eq!(maulid.gregorian_date, date(2026, 8, 7));
}

#[test]
fn upcoming_flags_and_order() {
    let now = at(2026, 10, 16, 8, 0);
    let calendar = EventCalendar::generate(now.date());
    let upcoming = calendar.upcoming(now);

    assert!(upcoming.len() <= 6);
    assert!(upcoming.windows(2).all(|w| w[0].event.gregorian_date <= w[1].event.gregorian_date));
    assert!(upcoming.iter().all(|u| u.event.is_upcoming && u.days_until >= 0));
    assert_eq!(upcoming[0].event.kind, EventKind::IsraMiraj);
    assert_eq!(upcoming[0].event.gregorian_date, date(2026, 12, 9));
}
