//! Prayer reminders and adhan alerts armed as cancellable tokio timers.
//!
//! [`NotificationScheduler`] is the only owner of the armed set. Every
//! [`rebuild`](NotificationScheduler::rebuild) aborts all prior timers before
//! spawning new ones, so repeating a rebuild never stacks duplicates.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tokio::{sync::broadcast, task::AbortHandle};

use crate::{
    alert::{AudioSink, NotificationSink, TEST_AUDIO_CUTOFF},
    clock::{DailyTimings, Prayer, date_key},
    config::NotificationPreferences,
    error::{AudioPlaybackError, PermissionError},
    store::{self, KeyValueStore, LAST_SCHEDULED_KEY},
};

/// Capacity of the firing broadcast channel.
const FIRED_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Reminder,
    OnTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledNotification {
    pub prayer: Prayer,
    pub kind: NotificationKind,
    pub fire_at: NaiveDateTime,
    pub title: String,
    pub body: String,
    pub play_audio: bool,
}

impl ScheduledNotification {
    fn reminder(prayer: Prayer, fire_at: NaiveDateTime, minutes: u32) -> Self {
        Self {
            prayer,
            kind: NotificationKind::Reminder,
            fire_at,
            title: format!("Waktu {} Sebentar Lagi", prayer.name()),
            body: format!("Bersiap untuk sholat dalam {minutes} menit"),
            play_audio: false,
        }
    }

    fn on_time(prayer: Prayer, fire_at: NaiveDateTime, play_audio: bool) -> Self {
        Self {
            prayer,
            kind: NotificationKind::OnTime,
            fire_at,
            title: format!("Waktu {} Telah Tiba", prayer.name()),
            body: "Mari segera menunaikan sholat".into(),
            play_audio,
        }
    }
}

/// Entries for the rest of `now`'s day, in prayer order.
///
/// Reminders fire `reminder_minutes` before their prayer and never carry
/// audio. Anything not strictly after `now` is left out, as are prayers that
/// are switched off or whose time does not parse.
pub fn plan(timings: &DailyTimings, prefs: &NotificationPreferences, now: NaiveDateTime) -> Vec<ScheduledNotification> {
    if !prefs.enabled {
        return Vec::new();
    }

    let date = now.date();
    let mut planned = Vec::new();
    for prayer in Prayer::ALL {
        if !prefs.is_enabled_for(prayer) {
            continue;
        }
        let at = match timings.clock(prayer) {
            Ok(t) => t.on(date),
            Err(e) => {
                tracing::debug!(prayer = prayer.key(), error = %e, "Not scheduling unparseable prayer");
                continue;
            }
        };

        if prefs.reminder_minutes > 0 {
            let remind_at = at - Duration::minutes(i64::from(prefs.reminder_minutes));
            if remind_at > now {
                planned.push(ScheduledNotification::reminder(prayer, remind_at, prefs.reminder_minutes));
            }
        }
        if at > now {
            planned.push(ScheduledNotification::on_time(prayer, at, !prefs.adhan_sound.is_silent()));
        }
    }
    planned
}

pub struct NotificationScheduler {
    notifier: Arc<dyn NotificationSink>,
    audio: Arc<dyn AudioSink>,
    store: Arc<dyn KeyValueStore>,
    armed: Vec<AbortHandle>,
    fired: broadcast::Sender<ScheduledNotification>,
}

impl NotificationScheduler {
    pub fn new(notifier: Arc<dyn NotificationSink>, audio: Arc<dyn AudioSink>, store: Arc<dyn KeyValueStore>) -> Self {
        let (fired, _) = broadcast::channel(FIRED_CAPACITY);
        Self {
            notifier,
            audio,
            store,
            armed: Vec::new(),
            fired,
        }
    }

    /// Receives every entry as it fires.
    pub fn subscribe(&self) -> broadcast::Receiver<ScheduledNotification> {
        self.fired.subscribe()
    }

    /// Timers that are armed and have not fired yet.
    pub fn armed_count(&self) -> usize {
        self.armed.iter().filter(|h| !h.is_finished()).count()
    }

    pub fn cancel_all(&mut self) {
        let cancelled = self.armed.len();
        for handle in self.armed.drain(..) {
            handle.abort();
        }
        if cancelled > 0 {
            tracing::debug!(cancelled, "Scheduled notifications cancelled");
        }
    }

    /// Cancels everything, then arms the entries [`plan`] yields for `now`.
    /// Must be called from within a tokio runtime.
    pub fn rebuild(
        &mut self,
        timings: &DailyTimings,
        prefs: &NotificationPreferences,
        now: NaiveDateTime,
    ) -> Vec<ScheduledNotification> {
        self.cancel_all();

        let entries = plan(timings, prefs, now);
        let prefs = Arc::new(prefs.clone());
        for entry in &entries {
            let delay = (entry.fire_at - now).to_std().unwrap_or_default();
            let task = Firing {
                entry: entry.clone(),
                prefs: Arc::clone(&prefs),
                notifier: Arc::clone(&self.notifier),
                audio: Arc::clone(&self.audio),
                fired: self.fired.clone(),
            };
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                task.fire();
            });
            self.armed.push(handle.abort_handle());
        }

        self.mark_scheduled(now.date());
        tracing::info!(armed = entries.len(), enabled = prefs.enabled, "Notifications scheduled");
        entries
    }

    /// True when nothing has been scheduled yet for `today`.
    pub fn needs_rebuild(&self, today: NaiveDate) -> bool {
        let marker: Option<String> = store::load_json(self.store.as_ref(), LAST_SCHEDULED_KEY);
        marker.as_deref() != Some(date_key(today).as_str())
    }

    fn mark_scheduled(&self, date: NaiveDate) {
        if let Err(e) = store::save_json(self.store.as_ref(), LAST_SCHEDULED_KEY, &date_key(date)) {
            tracing::warn!(error = %e, "Failed to record scheduling date");
        }
    }

    /// Shows a sample on-time notification right away.
    pub fn test_notification(&self) -> Result<(), PermissionError> {
        self.notifier.permission()?;
        let sample = ScheduledNotification::on_time(Prayer::Dhuhr, NaiveDateTime::MIN, false);
        self.notifier.notify(&sample.title, &sample.body, None)
    }

    /// Plays the selected adhan, cut off after [`TEST_AUDIO_CUTOFF`].
    pub fn test_adhan(&self, prefs: &NotificationPreferences) -> Result<(), AudioPlaybackError> {
        if prefs.adhan_sound.is_silent() {
            return Err(AudioPlaybackError::Silent);
        }
        self.audio.play(prefs.adhan_sound, prefs.volume, Some(TEST_AUDIO_CUTOFF))
    }

    pub fn stop_audio(&self) {
        self.audio.stop();
    }

    pub fn reap_audio(&self) {
        self.audio.reap();
    }
}

impl Drop for NotificationScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

struct Firing {
    entry: ScheduledNotification,
    prefs: Arc<NotificationPreferences>,
    notifier: Arc<dyn NotificationSink>,
    audio: Arc<dyn AudioSink>,
    fired: broadcast::Sender<ScheduledNotification>,
}

impl Firing {
    fn fire(self) {
        let entry = self.entry;
        tracing::info!(prayer = entry.prayer.key(), kind = ?entry.kind, "Notification firing");

        match self.notifier.permission() {
            Ok(()) => {
                let pattern = self.prefs.vibration_pattern();
                if let Err(e) = self.notifier.notify(&entry.title, &entry.body, pattern.as_deref()) {
                    tracing::warn!(prayer = entry.prayer.key(), error = %e, "Notification not shown");
                }
            }
            Err(e) => tracing::debug!(error = %e, "Skipping notification"),
        }

        if entry.play_audio && !self.prefs.adhan_sound.is_silent() {
            match self.audio.play(self.prefs.adhan_sound, self.prefs.volume, None) {
                Ok(()) => {}
                // Audio is switched off for the whole session.
                Err(AudioPlaybackError::Silent) => tracing::debug!(prayer = entry.prayer.key(), "Adhan muted"),
                Err(e) => tracing::warn!(sound = %self.prefs.adhan_sound, error = %e, "Adhan playback failed"),
            }
        }

        // No subscribers is fine.
        let _ = self.fired.send(entry);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use super::*;
    use crate::{
        alert::{CommandPlayer, DesktopNotifier, Muted},
        config::AdhanSound,
    };

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Fires one on-time entry through `audio` and returns the warnings logged.
    fn fire_warnings(audio: Arc<dyn AudioSink>) -> String {
        let (fired, _) = broadcast::channel(1);
        let firing = Firing {
            entry: ScheduledNotification::on_time(Prayer::Dhuhr, at(12, 10), true),
            prefs: Arc::new(NotificationPreferences::default()),
            notifier: Arc::new(DesktopNotifier::new(false)),
            audio,
            fired,
        };

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || firing.fire());

        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn muted_audio_is_not_a_warning() {
        assert!(fire_warnings(Arc::new(Muted)).is_empty());

        let broken = CommandPlayer::new(vec!["miqat-missing-player".into()]);
        assert!(fire_warnings(Arc::new(broken)).contains("Adhan playback failed"));
    }

    fn jakarta() -> DailyTimings {
        DailyTimings::new("04:40", "12:10", "15:30", "18:05", "19:15")
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn late_reminder_is_dropped_but_on_time_stays() {
        let prefs = NotificationPreferences { reminder_minutes: 10, ..Default::default() };
        let planned = plan(&jakarta(), &prefs, at(12, 5));
        let dhuhr: Vec<_> = planned.iter().filter(|n| n.prayer == Prayer::Dhuhr).collect();
        assert_eq!(dhuhr.len(), 1);
        assert_eq!(dhuhr[0].kind, NotificationKind::OnTime);
        assert_eq!(dhuhr[0].fire_at, at(12, 10));
        assert!(dhuhr[0].play_audio);
    }

    #[test]
    fn reminders_precede_their_prayer_without_audio() {
        let prefs = NotificationPreferences::default();
        let planned = plan(&jakarta(), &prefs, at(13, 0));
        assert_eq!(planned.len(), 6);
        let first = &planned[0];
        assert_eq!(first.kind, NotificationKind::Reminder);
        assert_eq!(first.fire_at, at(15, 25));
        assert!(!first.play_audio);
        assert_eq!(first.title, "Waktu Ashar Sebentar Lagi");
        assert_eq!(planned[1].title, "Waktu Ashar Telah Tiba");
    }

    #[test]
    fn disabled_prayers_and_silent_sound() {
        let mut prefs = NotificationPreferences { reminder_minutes: 0, adhan_sound: AdhanSound::Silent, ..Default::default() };
        prefs.set_enabled_for(Prayer::Maghrib, false);
        let planned = plan(&jakarta(), &prefs, at(13, 0));
        let prayers: Vec<Prayer> = planned.iter().map(|n| n.prayer).collect();
        assert_eq!(prayers, vec![Prayer::Asr, Prayer::Isha]);
        assert!(planned.iter().all(|n| !n.play_audio));
    }

    #[test]
    fn nothing_when_disabled_or_past() {
        let prefs = NotificationPreferences { enabled: false, ..Default::default() };
        assert!(plan(&jakarta(), &prefs, at(3, 0)).is_empty());
        assert!(plan(&jakarta(), &NotificationPreferences::default(), at(19, 15)).is_empty());
    }

    #[test]
    fn unparseable_times_are_skipped() {
        let mut timings = jakarta();
        timings.asr = "soon".into();
        let planned = plan(&timings, &NotificationPreferences::default(), at(13, 0));
        assert!(planned.iter().all(|n| n.prayer != Prayer::Asr));
        assert_eq!(planned.len(), 4);
    }
}
