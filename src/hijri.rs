//! Gregorian to Hijri conversion.
//!
//! [`HijriConverter`] asks its providers in order and falls back to
//! [`approximate_hijri`], a proportional day-count estimate that can drift a
//! few days from the observed calendar but is always well-formed.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Average length of a Hijri year in days.
pub const HIJRI_YEAR_DAYS: f64 = 354.37;
/// Average length of a Hijri month in days.
pub const HIJRI_MONTH_DAYS: f64 = 29.5;

/// (transliterated, Arabic) month names, Muharram first.
pub const HIJRI_MONTHS: [(&str, &str); 12] = [
    ("Muharram", "مُحَرَّم"),
    ("Safar", "صَفَر"),
    ("Rabiul Awwal", "رَبِيع الأَوَّل"),
    ("Rabiul Akhir", "رَبِيع الآخِر"),
    ("Jumadil Awwal", "جُمَادَى الأُولَى"),
    ("Jumadil Akhir", "جُمَادَى الآخِرَة"),
    ("Rajab", "رَجَب"),
    ("Syaban", "شَعْبَان"),
    ("Ramadan", "رَمَضَان"),
    ("Syawal", "شَوَّال"),
    ("Dzulqaidah", "ذُو القَعْدَة"),
    ("Dzulhijjah", "ذُو الحِجَّة"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HijriDate {
    pub day: u32,
    pub month: u32,
    pub month_name: String,
    pub month_name_ar: String,
    pub year: u32,
}

impl HijriDate {
    /// Builds a date from its parts; `None` when the month is not 1-12.
    pub fn from_parts(day: u32, month: u32, year: u32) -> Option<Self> {
        let (name, arabic) = HIJRI_MONTHS.get(month.checked_sub(1)? as usize)?;
        Some(Self {
            day,
            month,
            month_name: (*name).into(),
            month_name_ar: (*arabic).into(),
            year,
        })
    }

    /// "5 Ramadan 1447 H"
    pub fn label(&self) -> String {
        format!("{} {} {} H", self.day, self.month_name, self.year)
    }
}

#[async_trait]
pub trait HijriProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn convert(&self, date: NaiveDate) -> Result<HijriDate, FetchError>;
}

fn hijri_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(622, 7, 16).unwrap_or(NaiveDate::MIN)
}

/// Proportional estimate from the day count since the Hijri epoch.
pub fn approximate_hijri(date: NaiveDate) -> HijriDate {
    let days = (date - hijri_epoch()).num_days().max(0) as f64;

    let elapsed_years = (days / HIJRI_YEAR_DAYS).floor();
    let day_of_year = days - (elapsed_years * HIJRI_YEAR_DAYS).floor();
    let month_idx = (day_of_year / HIJRI_MONTH_DAYS).floor().min(11.0);
    let day = ((day_of_year - month_idx * HIJRI_MONTH_DAYS).floor() as u32 + 1).min(30);

    let month = month_idx as u32 + 1;
    let year = elapsed_years as u32 + 1;
    let (name, arabic) = HIJRI_MONTHS[month_idx as usize];
    HijriDate {
        day,
        month,
        month_name: name.into(),
        month_name_ar: arabic.into(),
        year,
    }
}

pub struct HijriConverter {
    providers: Vec<Box<dyn HijriProvider>>,
}

impl HijriConverter {
    pub fn new(providers: Vec<Box<dyn HijriProvider>>) -> Self {
        Self { providers }
    }

    pub async fn hijri_date_for(&self, date: NaiveDate) -> HijriDate {
        for provider in &self.providers {
            match provider.convert(date).await {
                Ok(hijri) => return hijri,
                Err(e) => {
                    tracing::warn!(provider = provider.name(), %date, error = %e, "Hijri conversion failed");
                }
            }
        }

        let hijri = approximate_hijri(date);
        tracing::info!(%date, hijri = %hijri.label(), "Using approximate Hijri date");
        hijri
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn approximation_lands_near_the_observed_calendar() {
        let h = approximate_hijri(date(2026, 10, 16));
        assert_eq!((h.year, h.month), (1448, 5));
        assert_eq!(h.month_name, "Jumadil Awwal");

        let h = approximate_hijri(date(2026, 3, 1));
        assert_eq!((h.year, h.month, h.day), (1447, 9, 10));
    }

    #[test]
    fn approximation_is_always_well_formed() {
        let mut day = date(1990, 1, 1);
        while day < date(2040, 1, 1) {
            let h = approximate_hijri(day);
            assert!((1..=12).contains(&h.month), "{day}: month {}", h.month);
            assert!((1..=30).contains(&h.day), "{day}: day {}", h.day);
            day += chrono::Duration::days(7);
        }

        let ancient = approximate_hijri(date(500, 1, 1));
        assert_eq!((ancient.year, ancient.month, ancient.day), (1, 1, 1));
    }

    struct Offline;

    #[async_trait]
    impl HijriProvider for Offline {
        fn name(&self) -> &'static str {
            "offline"
        }

        async fn convert(&self, _date: NaiveDate) -> Result<HijriDate, FetchError> {
            Err(FetchError::Unavailable)
        }
    }

    struct Fixed;

    #[async_trait]
    impl HijriProvider for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn convert(&self, _date: NaiveDate) -> Result<HijriDate, FetchError> {
            Ok(HijriDate::from_parts(1, 9, 1447).unwrap())
        }
    }

    #[tokio::test]
    async fn converter_prefers_providers_then_approximates() {
        let day = date(2026, 2, 18);

        let converter = HijriConverter::new(vec![Box::new(Offline), Box::new(Fixed)]);
        assert_eq!(converter.hijri_date_for(day).await.label(), "1 Ramadan 1447 H");

        let converter = HijriConverter::new(vec![Box::new(Offline)]);
        assert_eq!(converter.hijri_date_for(day).await, approximate_hijri(day));
    }

    #[test]
    fn from_parts_rejects_bad_months() {
        assert!(HijriDate::from_parts(1, 0, 1447).is_none());
        assert!(HijriDate::from_parts(1, 13, 1447).is_none());
    }
}
