#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use miqat::{
    alert::{AudioSink, NotificationSink},
    clock::DailyTimings,
    config::AdhanSound,
    error::{AudioPlaybackError, FetchError, PermissionError},
    hijri::{HijriDate, HijriProvider},
    location::{DEFAULT_LOCATION, GeoCoordinate, Located},
    session::Collaborators,
    store::{KeyValueStore, MemoryStore},
    time_source::{ProviderTimings, TimingProvider},
};

pub fn jakarta() -> DailyTimings {
    DailyTimings::new("04:40", "12:10", "15:30", "18:05", "19:15")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, min, 0).unwrap()
}

pub fn jakarta_located() -> Located {
    Located { coordinate: DEFAULT_LOCATION, source: "default" }
}

// ============================================================================
// Providers
// ============================================================================

/// Answers every request with the same timings and counts the calls.
pub struct FixedTimings {
    pub timings: DailyTimings,
    pub location: Option<String>,
    pub calls: Arc<AtomicUsize>,
}

impl FixedTimings {
    pub fn new(timings: DailyTimings) -> Self {
        Self {
            timings,
            location: Some("Asia/Jakarta".into()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl TimingProvider for FixedTimings {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn fetch_timings(&self, _date: NaiveDate, _at: GeoCoordinate) -> Result<ProviderTimings, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ProviderTimings {
            timings: self.timings.clone(),
            location: self.location.clone(),
        })
    }
}

pub struct Offline;

#[async_trait]
impl TimingProvider for Offline {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn fetch_timings(&self, _date: NaiveDate, _at: GeoCoordinate) -> Result<ProviderTimings, FetchError> {
        Err(FetchError::Status { status: 503 })
    }
}

#[async_trait]
impl HijriProvider for Offline {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn convert(&self, _date: NaiveDate) -> Result<HijriDate, FetchError> {
        Err(FetchError::Unavailable)
    }
}

// ============================================================================
// Sinks
// ============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    pub denied: bool,
    pub shown: Mutex<Vec<(String, String, Option<Vec<u32>>)>>,
}

impl RecordingNotifier {
    pub fn denied() -> Self {
        Self { denied: true, ..Default::default() }
    }

    pub fn titles(&self) -> Vec<String> {
        self.shown.lock().unwrap().iter().map(|(t, _, _)| t.clone()).collect()
    }
}

impl NotificationSink for RecordingNotifier {
    fn permission(&self) -> Result<(), PermissionError> {
        if self.denied { Err(PermissionError::Notification) } else { Ok(()) }
    }

    fn notify(&self, title: &str, body: &str, vibration: Option<&[u32]>) -> Result<(), PermissionError> {
        self.permission()?;
        self.shown
            .lock()
            .unwrap()
            .push((title.into(), body.into(), vibration.map(<[u32]>::to_vec)));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAudio {
    pub broken: bool,
    pub played: Mutex<Vec<(AdhanSound, u8, Option<Duration>)>>,
    pub stops: AtomicUsize,
    pub reaps: AtomicUsize,
}

impl RecordingAudio {
    pub fn broken() -> Self {
        Self { broken: true, ..Default::default() }
    }

    pub fn played(&self) -> Vec<(AdhanSound, u8, Option<Duration>)> {
        self.played.lock().unwrap().clone()
    }
}

impl AudioSink for RecordingAudio {
    fn play(&self, sound: AdhanSound, volume: u8, cutoff: Option<Duration>) -> Result<(), AudioPlaybackError> {
        if self.broken {
            return Err(AudioPlaybackError::NoPlayer("mpv".into()));
        }
        self.played.lock().unwrap().push((sound, volume, cutoff));
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn reap(&self) {
        self.reaps.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Session wiring
// ============================================================================

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub audio: Arc<RecordingAudio>,
    pub calls: Arc<AtomicUsize>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            notifier: Arc::new(RecordingNotifier::default()),
            audio: Arc::new(RecordingAudio::default()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Collaborators backed by `timings` (or an offline provider for `None`).
    pub fn collaborators(&self, timings: Option<DailyTimings>) -> Collaborators {
        let provider: Box<dyn TimingProvider> = match timings {
            Some(t) => {
                let mut fixed = FixedTimings::new(t);
                fixed.calls = Arc::clone(&self.calls);
                Box::new(fixed)
            }
            None => Box::new(Offline),
        };
        let store: Arc<dyn KeyValueStore> = self.store.clone();
        Collaborators {
            store,
            timing_providers: vec![provider],
            hijri_providers: vec![Box::new(Offline)],
            notifier: self.notifier.clone(),
            audio: self.audio.clone(),
        }
    }

    pub fn fetches(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}
