//! Error types shared across the engine.
//!
//! Each component recovers from its own errors (cache, approximation,
//! sentinel, default location). These types travel between a component and
//! its fallback layer, and only reach the user through explicit test actions.

use chrono::NaiveDate;

/// A timing or Hijri provider could not produce a value.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider returned HTTP {status}")]
    Status { status: u16 },

    /// The provider answered, but the payload was not usable.
    #[error("malformed provider response: {0}")]
    Malformed(String),

    /// All providers failed and the cached entry belongs to another day.
    #[error("cached timings are for {cached}, not {requested}")]
    Stale { requested: NaiveDate, cached: String },

    /// All providers failed and nothing was cached.
    #[error("no provider or cache could supply a value")]
    Unavailable,
}

/// A clock time that could not be parsed or is out of range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTimeError {
    #[error("missing time value")]
    Missing,

    #[error("malformed time {0:?}, expected HH:MM")]
    Malformed(String),

    #[error("time {hour:02}:{minute:02} is out of range")]
    OutOfRange { hour: u32, minute: u32 },
}

/// The user or platform refused access to something we asked for.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    #[error("location is unavailable: {0}")]
    Geolocation(String),

    #[error("desktop notifications are not permitted")]
    Notification,

    #[error("notification could not be delivered: {0}")]
    Delivery(String),
}

/// An adhan or test sound could not be played.
#[derive(Debug, thiserror::Error)]
pub enum AudioPlaybackError {
    #[error("silent mode is active, no adhan will play")]
    Silent,

    #[error("no audio player found (tried {0})")]
    NoPlayer(String),

    #[error("failed to start {player}: {source}")]
    Spawn {
        player: String,
        #[source]
        source: std::io::Error,
    },
}

/// Reading or writing the local key-value store failed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store record is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}
