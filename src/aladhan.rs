//! Client for the Aladhan prayer-times API.
//!
//! Serves both as the primary [`TimingProvider`] (`/timings`) and the primary
//! [`HijriProvider`] (`/gToH`).

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    clock::DailyTimings,
    error::FetchError,
    hijri::{HijriDate, HijriProvider},
    location::GeoCoordinate,
    time_source::{ProviderTimings, TimingProvider},
};

const DATE_PATH_FMT: &str = "%d-%m-%Y";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: u16,
    data: T,
}

#[derive(Debug, Deserialize)]
struct TimingsData {
    timings: WireTimings,
    #[serde(default)]
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireTimings {
    #[serde(default)]
    fajr: String,
    #[serde(default)]
    dhuhr: String,
    #[serde(default)]
    asr: String,
    #[serde(default)]
    maghrib: String,
    #[serde(default)]
    isha: String,
}

#[derive(Debug, Deserialize)]
struct Meta {
    #[serde(default)]
    timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConversionData {
    hijri: WireHijri,
}

#[derive(Debug, Deserialize)]
struct WireHijri {
    day: String,
    month: WireMonth,
    year: String,
}

#[derive(Debug, Deserialize)]
struct WireMonth {
    number: u32,
}

pub struct AladhanClient {
    client: reqwest::Client,
    base_url: String,
    method: u8,
}

impl AladhanClient {
    /// * `base_url` - API root, e.g. `https://api.aladhan.com/v1`.
    /// * `method` - Aladhan calculation method id (2 = ISNA).
    pub fn new(client: reqwest::Client, base_url: String, method: u8) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            method,
        }
    }

    /// Shared HTTP client with a per-request timeout.
    pub fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("miqat/", env!("CARGO_PKG_VERSION")))
            .build()
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> Result<T, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status: status.as_u16() });
        }

        let envelope: Envelope<T> = response.json().await?;
        if envelope.code != 200 {
            return Err(FetchError::Status { status: envelope.code });
        }
        Ok(envelope.data)
    }
}

#[async_trait]
impl TimingProvider for AladhanClient {
    fn name(&self) -> &'static str {
        "aladhan"
    }

    async fn fetch_timings(&self, date: NaiveDate, at: GeoCoordinate) -> Result<ProviderTimings, FetchError> {
        let url = format!(
            "{}/timings/{}?latitude={}&longitude={}&method={}",
            self.base_url,
            date.format(DATE_PATH_FMT),
            at.latitude,
            at.longitude,
            self.method
        );
        let data: TimingsData = self.get(url).await?;

        let t = data.timings;
        if [&t.fajr, &t.dhuhr, &t.asr, &t.maghrib, &t.isha].iter().all(|s| s.trim().is_empty()) {
            return Err(FetchError::Malformed("response carried no prayer times".into()));
        }

        Ok(ProviderTimings {
            timings: DailyTimings {
                fajr: t.fajr,
                dhuhr: t.dhuhr,
                asr: t.asr,
                maghrib: t.maghrib,
                isha: t.isha,
            },
            location: data.meta.and_then(|m| m.timezone),
        })
    }
}

#[async_trait]
impl HijriProvider for AladhanClient {
    fn name(&self) -> &'static str {
        "aladhan"
    }

    async fn convert(&self, date: NaiveDate) -> Result<HijriDate, FetchError> {
        let url = format!("{}/gToH/{}", self.base_url, date.format(DATE_PATH_FMT));
        let data: ConversionData = self.get(url).await?;
        parse_hijri(&data.hijri)
    }
}

fn parse_hijri(wire: &WireHijri) -> Result<HijriDate, FetchError> {
    let day = wire
        .day
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|d| (1..=30).contains(d))
        .ok_or_else(|| FetchError::Malformed(format!("hijri day {:?}", wire.day)))?;
    let year: u32 = wire
        .year
        .trim()
        .parse()
        .map_err(|_| FetchError::Malformed(format!("hijri year {:?}", wire.year)))?;

    HijriDate::from_parts(day, wire.month.number, year)
        .ok_or_else(|| FetchError::Malformed(format!("hijri month {}", wire.month.number)))
}
