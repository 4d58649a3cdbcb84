//! One run of the app: every engine component, wired together.
//!
//! The front end owns a [`Session`], feeds it the wall clock on its 1 s and
//! 60 s ticks, and reads the display surfaces back out. All time-dependent
//! methods take `now` explicitly.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::{
    alert::{AudioSink, NotificationSink},
    clock::{DailyTimings, Prayer},
    config::NotificationPreferences,
    countdown::{EventCountdown, PrayerCountdown, PrayerCountdownState, PrayerTick},
    events::{EventCalendar, EventKind, UpcomingEvent},
    hijri::{HijriConverter, HijriDate, HijriProvider},
    location::Located,
    scheduler::{NotificationScheduler, ScheduledNotification},
    store::{self, KeyValueStore, NOTIFICATION_SETTINGS_KEY},
    sunnah::{self, SunnahTimings},
    time_source::{DEFAULT_LOCATION_LABEL, FetchedTimings, TimeSource, TimingProvider},
};

/// Everything a session talks to outside its own process state.
pub struct Collaborators {
    pub store: Arc<dyn KeyValueStore>,
    pub timing_providers: Vec<Box<dyn TimingProvider>>,
    pub hijri_providers: Vec<Box<dyn HijriProvider>>,
    pub notifier: Arc<dyn NotificationSink>,
    pub audio: Arc<dyn AudioSink>,
}

pub struct Session {
    store: Arc<dyn KeyValueStore>,
    time_source: TimeSource,
    hijri: HijriConverter,
    scheduler: NotificationScheduler,
    location: Located,
    prefs: NotificationPreferences,
    timings: Option<FetchedTimings>,
    sunnah: SunnahTimings,
    hijri_date: Option<HijriDate>,
    calendar: EventCalendar,
    prayer_countdown: PrayerCountdown,
    event_countdown: EventCountdown,
    failed_refresh: Option<NaiveDate>,
    status: Option<String>,
}

impl Session {
    /// Loads the saved preferences and performs the first refresh.
    pub async fn start(collaborators: Collaborators, location: Located, now: NaiveDateTime) -> Self {
        let Collaborators { store, timing_providers, hijri_providers, notifier, audio } = collaborators;
        let prefs = store::load_or_default(store.as_ref(), NOTIFICATION_SETTINGS_KEY);

        let mut session = Self {
            time_source: TimeSource::new(timing_providers, Arc::clone(&store)),
            hijri: HijriConverter::new(hijri_providers),
            scheduler: NotificationScheduler::new(notifier, audio, Arc::clone(&store)),
            store,
            location,
            prefs,
            timings: None,
            sunnah: SunnahTimings::UNKNOWN,
            hijri_date: None,
            calendar: EventCalendar::generate(now.date()),
            prayer_countdown: PrayerCountdown::new(),
            event_countdown: EventCountdown::default(),
            failed_refresh: None,
            status: None,
        };
        session.refresh(now).await;
        session
    }

    /// Fetches today's timings and rebuilds everything derived from them.
    /// Returns false when no timings for today could be obtained; whatever
    /// was shown before stays on screen.
    pub async fn refresh(&mut self, now: NaiveDateTime) -> bool {
        let today = now.date();
        self.hijri_date = Some(self.hijri.hijri_date_for(today).await);
        self.calendar = EventCalendar::generate(today);
        self.resolve_event(now);

        match self.time_source.timings_for(today, self.location.coordinate).await {
            Ok(fetched) => {
                self.apply_timings(fetched, now);
                self.failed_refresh = None;
                true
            }
            Err(e) => {
                tracing::error!(%today, error = %e, "No prayer timings for today");
                self.failed_refresh = Some(today);
                self.status = Some(format!("Prayer times unavailable: {e}"));
                false
            }
        }
    }

    fn apply_timings(&mut self, fetched: FetchedTimings, now: NaiveDateTime) {
        self.sunnah = sunnah::derive(&fetched.timings);
        self.prayer_countdown.load(fetched.date, fetched.timings.clone(), now);
        self.scheduler.rebuild(&fetched.timings, &self.prefs, now);
        self.timings = Some(fetched);
    }

    fn resolve_event(&mut self, now: NaiveDateTime) {
        let next = self.calendar.resolve_next(EventKind::Ramadan, now).cloned();
        self.event_countdown.retarget(next);
    }

    /// The 1 s tick. Refetches once the countdown runs past timings that are
    /// not for today, but not again on a day whose fetch already failed.
    pub async fn on_second(&mut self, now: NaiveDateTime) {
        if self.prayer_countdown.tick(now) == PrayerTick::RefreshNeeded
            && self.failed_refresh != Some(now.date())
        {
            self.refresh(now).await;
        }
    }

    /// The 60 s tick: finished playback, day rollover and event re-resolution.
    pub async fn on_minute(&mut self, now: NaiveDateTime) {
        self.scheduler.reap_audio();
        let today = now.date();
        if self.scheduler.needs_rebuild(today) {
            tracing::info!(%today, "New day, refreshing");
            self.refresh(now).await;
        } else if self.event_countdown.needs_resolution(now) {
            self.resolve_event(now);
        }
    }

    /// Saves `prefs` and reschedules with them.
    pub fn update_preferences(&mut self, prefs: NotificationPreferences, now: NaiveDateTime) {
        if let Err(e) = store::save_json(self.store.as_ref(), NOTIFICATION_SETTINGS_KEY, &prefs) {
            tracing::warn!(error = %e, "Failed to save notification settings");
        }
        self.prefs = prefs;
        self.reschedule(now);
    }

    fn reschedule(&mut self, now: NaiveDateTime) {
        match &self.timings {
            Some(fetched) if fetched.date == now.date() => {
                self.scheduler.rebuild(&fetched.timings, &self.prefs, now);
            }
            _ => self.scheduler.cancel_all(),
        }
    }

    pub fn test_notification(&mut self) {
        self.status = Some(match self.scheduler.test_notification() {
            Ok(()) => "Test notification sent".into(),
            Err(e) => format!("Notification failed: {e}"),
        });
    }

    pub fn test_adhan(&mut self) {
        self.status = Some(match self.scheduler.test_adhan(&self.prefs) {
            Ok(()) => format!("Playing {} adhan (30 s)", self.prefs.adhan_sound),
            Err(e) => format!("Adhan failed: {e}"),
        });
    }

    pub fn stop_audio(&mut self) {
        self.scheduler.stop_audio();
    }

    /// Shows a fired entry in the status line.
    pub fn notice_fired(&mut self, fired: &ScheduledNotification) {
        self.status = Some(fired.title.clone());
    }

    pub fn teardown(&mut self) {
        self.scheduler.cancel_all();
        self.scheduler.stop_audio();
        tracing::info!("Session closed");
    }

    // ------------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------------

    pub fn location(&self) -> Located {
        self.location
    }

    pub fn location_label(&self) -> &str {
        self.timings.as_ref().map_or(DEFAULT_LOCATION_LABEL, |t| t.location.as_str())
    }

    pub fn timings(&self) -> Option<&FetchedTimings> {
        self.timings.as_ref()
    }

    pub fn daily(&self) -> DailyTimings {
        self.timings.as_ref().map(|t| t.timings.clone()).unwrap_or_default()
    }

    pub fn sunnah(&self) -> &SunnahTimings {
        &self.sunnah
    }

    pub fn hijri_date(&self) -> Option<&HijriDate> {
        self.hijri_date.as_ref()
    }

    pub fn prayer_countdown(&self) -> &PrayerCountdown {
        &self.prayer_countdown
    }

    pub fn next_prayer(&self) -> Option<Prayer> {
        match self.prayer_countdown.state() {
            PrayerCountdownState::Live(target) => Some(target.prayer),
            _ => None,
        }
    }

    pub fn event_countdown(&self) -> &EventCountdown {
        &self.event_countdown
    }

    pub fn upcoming_events(&self, now: NaiveDateTime) -> Vec<UpcomingEvent<'_>> {
        self.calendar.upcoming(now)
    }

    pub fn preferences(&self) -> &NotificationPreferences {
        &self.prefs
    }

    pub fn scheduler(&self) -> &NotificationScheduler {
        &self.scheduler
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ScheduledNotification> {
        self.scheduler.subscribe()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }
}
