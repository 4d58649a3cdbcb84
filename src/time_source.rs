//! Daily prayer timings with a layered fallback.
//!
//! [`TimeSource`] asks each [`TimingProvider`] in turn. The first success is
//! written to the store together with its calendar-date key; when every
//! provider fails, the stored record is reused only if it was written for
//! the very date being requested.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    clock::{DailyTimings, date_key},
    error::FetchError,
    location::GeoCoordinate,
    store::{self, KeyValueStore, TIMINGS_KEY},
};

pub const DEFAULT_LOCATION_LABEL: &str = "Your location";

/// What a provider hands back for one date.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderTimings {
    pub timings: DailyTimings,
    pub location: Option<String>,
}

#[async_trait]
pub trait TimingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_timings(&self, date: NaiveDate, at: GeoCoordinate) -> Result<ProviderTimings, FetchError>;
}

/// The persisted record under [`TIMINGS_KEY`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TimingsCache {
    pub times: DailyTimings,
    pub location: String,
    pub date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingsOrigin {
    Provider(&'static str),
    Cache,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedTimings {
    pub date: NaiveDate,
    pub timings: DailyTimings,
    pub location: String,
    pub origin: TimingsOrigin,
}

pub struct TimeSource {
    providers: Vec<Box<dyn TimingProvider>>,
    store: Arc<dyn KeyValueStore>,
}

impl TimeSource {
    pub fn new(providers: Vec<Box<dyn TimingProvider>>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { providers, store }
    }

    pub async fn timings_for(&self, date: NaiveDate, at: GeoCoordinate) -> Result<FetchedTimings, FetchError> {
        for provider in &self.providers {
            match provider.fetch_timings(date, at).await {
                Ok(fetched) => {
                    let location = fetched
                        .location
                        .filter(|l| !l.trim().is_empty())
                        .unwrap_or_else(|| DEFAULT_LOCATION_LABEL.into());
                    self.persist(date, &fetched.timings, &location);
                    tracing::info!(provider = provider.name(), %date, location = %location, "Prayer timings fetched");
                    return Ok(FetchedTimings {
                        date,
                        timings: fetched.timings,
                        location,
                        origin: TimingsOrigin::Provider(provider.name()),
                    });
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), %date, error = %e, "Timing provider failed");
                }
            }
        }

        self.cached(date)
    }

    /// The stored timings, only if they were stored for `date`.
    pub fn cached(&self, date: NaiveDate) -> Result<FetchedTimings, FetchError> {
        let cache: TimingsCache =
            store::load_json(self.store.as_ref(), TIMINGS_KEY).ok_or(FetchError::Unavailable)?;

        if cache.date != date_key(date) {
            tracing::warn!(requested = %date, cached = %cache.date, "Cached timings are from another day");
            return Err(FetchError::Stale { requested: date, cached: cache.date });
        }

        tracing::info!(%date, "Using cached prayer timings");
        Ok(FetchedTimings {
            date,
            timings: cache.times,
            location: cache.location,
            origin: TimingsOrigin::Cache,
        })
    }

    fn persist(&self, date: NaiveDate, timings: &DailyTimings, location: &str) {
        let record = TimingsCache {
            times: timings.clone(),
            location: location.to_string(),
            date: date_key(date),
        };
        if let Err(e) = store::save_json(self.store.as_ref(), TIMINGS_KEY, &record) {
            tracing::warn!(error = %e, "Failed to cache prayer timings");
        }
    }
}
