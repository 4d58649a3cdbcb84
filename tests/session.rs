//! A whole session wired to fake providers and sinks.

mod common;

use common::{Harness, at, jakarta, jakarta_located};
use miqat::{
    clock::Prayer,
    config::{AdhanSound, NotificationPreferences},
    countdown::UNKNOWN_COUNTDOWN,
    store::{self, NOTIFICATION_SETTINGS_KEY},
    session::Session,
    sunnah::SunnahTimings,
};

#[tokio::test(start_paused = true)]
async fn start_fills_every_display_surface() {
    let harness = Harness::new();
    let now = at(2026, 10, 16, 3, 0);
    let session = Session::start(harness.collaborators(Some(jakarta())), jakarta_located(), now).await;

    assert_eq!(session.location_label(), "Asia/Jakarta");
    assert_eq!(session.next_prayer(), Some(Prayer::Fajr));
    assert_eq!(session.prayer_countdown().display(now), "01:40:00");
    assert_eq!(session.sunnah().tahajud.to_string(), "01:31");

    // Hijri provider is offline, so the approximation is shown.
    let hijri = session.hijri_date().unwrap();
    assert_eq!((hijri.year, hijri.month), (1448, 5));

    let ramadan = session.event_countdown().target().unwrap();
    assert_eq!(ramadan.name, "Ramadan 1448 H");
    assert!(!session.upcoming_events(now).is_empty());
    assert_eq!(session.scheduler().armed_count(), 10);
    assert_eq!(session.status(), None);
}

#[tokio::test(start_paused = true)]
async fn offline_start_shows_sentinels() {
    let harness = Harness::new();
    let now = at(2026, 10, 16, 3, 0);
    let session = Session::start(harness.collaborators(None), jakarta_located(), now).await;

    assert!(session.timings().is_none());
    assert_eq!(*session.sunnah(), SunnahTimings::UNKNOWN);
    assert_eq!(session.prayer_countdown().display(now), UNKNOWN_COUNTDOWN);
    assert_eq!(session.scheduler().armed_count(), 0);
    assert!(session.status().unwrap().starts_with("Prayer times unavailable"));
    assert!(session.event_countdown().target().is_some());
}

#[tokio::test(start_paused = true)]
async fn preference_changes_are_saved_and_rescheduled() {
    let harness = Harness::new();
    let now = at(2026, 10, 16, 3, 0);
    let mut session = Session::start(harness.collaborators(Some(jakarta())), jakarta_located(), now).await;

    let mut prefs = session.preferences().clone();
    prefs.set_enabled_for(Prayer::Asr, false);
    prefs.reminder_minutes = 0;
    session.update_preferences(prefs.clone(), now);

    assert_eq!(session.scheduler().armed_count(), 4);
    let saved: NotificationPreferences =
        store::load_json(harness.store.as_ref(), NOTIFICATION_SETTINGS_KEY).unwrap();
    assert_eq!(saved, prefs);
}

#[tokio::test(start_paused = true)]
async fn saved_preferences_are_loaded_at_start() {
    let harness = Harness::new();
    let prefs = NotificationPreferences { enabled: false, ..Default::default() };
    store::save_json(harness.store.as_ref(), NOTIFICATION_SETTINGS_KEY, &prefs).unwrap();

    let session = Session::start(harness.collaborators(Some(jakarta())), jakarta_located(), at(2026, 10, 16, 3, 0)).await;
    assert!(!session.preferences().enabled);
    assert_eq!(session.scheduler().armed_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn new_day_triggers_a_refresh() {
    let harness = Harness::new();
    let mut session =
        Session::start(harness.collaborators(Some(jakarta())), jakarta_located(), at(2026, 10, 16, 22, 0)).await;
    assert_eq!(harness.fetches(), 1);

    session.on_minute(at(2026, 10, 16, 23, 59)).await;
    assert_eq!(harness.fetches(), 1);
    assert_eq!(harness.audio.reaps.load(std::sync::atomic::Ordering::SeqCst), 1);

    session.on_minute(at(2026, 10, 17, 0, 0)).await;
    assert_eq!(harness.fetches(), 2);
    assert_eq!(session.timings().unwrap().date, at(2026, 10, 17, 0, 0).date());
}

#[tokio::test(start_paused = true)]
async fn countdown_past_stale_timings_refetches() {
    let harness = Harness::new();
    let mut session =
        Session::start(harness.collaborators(Some(jakarta())), jakarta_located(), at(2026, 10, 16, 22, 0)).await;
    assert!(session.prayer_countdown().remaining_secs(at(2026, 10, 16, 22, 0)).is_some());

    session.on_second(at(2026, 10, 17, 4, 40)).await;
    assert_eq!(harness.fetches(), 2);
    assert_eq!(session.next_prayer(), Some(Prayer::Dhuhr));
}

#[tokio::test(start_paused = true)]
async fn test_actions_report_through_the_status_line() {
    let harness = Harness::new();
    let mut session =
        Session::start(harness.collaborators(Some(jakarta())), jakarta_located(), at(2026, 10, 16, 3, 0)).await;

    session.test_notification();
    assert_eq!(session.status(), Some("Test notification sent"));

    let silent = NotificationPreferences { adhan_sound: AdhanSound::Silent, ..Default::default() };
    session.update_preferences(silent, at(2026, 10, 16, 3, 0));
    session.test_adhan();
    assert!(session.status().unwrap().starts_with("Adhan failed"));
    assert!(harness.audio.played().is_empty());
}

#[tokio::test(start_paused = true)]
async fn teardown_disarms_everything() {
    let harness = Harness::new();
    let mut session =
        Session::start(harness.collaborators(Some(jakarta())), jakarta_located(), at(2026, 10, 16, 3, 0)).await;

    session.teardown();
    assert_eq!(session.scheduler().armed_count(), 0);
    assert_eq!(harness.audio.stops.load(std::sync::atomic::Ordering::SeqCst), 1);
}
