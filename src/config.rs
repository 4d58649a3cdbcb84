use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{clock::Prayer, location::GeoCoordinate};

/// Reminder lead times offered in the settings view, in minutes.
pub const REMINDER_CHOICES: [u32; 6] = [0, 5, 10, 15, 20, 30];

// ============================================================================
// Config
// ============================================================================

/// Session-wide settings loaded from `config.json` and CLI overrides.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub ip_lookup: bool,
    pub calculation_method: u8,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub sound_enabled: bool,
    pub desktop_notifications: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            ip_lookup: false,
            calculation_method: 2,
            api_base_url: "https://api.aladhan.com/v1".into(),
            request_timeout_secs: 10,
            sound_enabled: true,
            desktop_notifications: true,
        }
    }
}

impl Config {
    /// The configured coordinate, when both halves are set.
    pub fn coordinate(&self) -> Option<GeoCoordinate> {
        Some(GeoCoordinate {
            latitude: self.latitude?,
            longitude: self.longitude?,
        })
    }
}

// ============================================================================
// Adhan sounds
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdhanSound {
    #[default]
    Makkah,
    Madinah,
    Egypt,
    Turkey,
    Silent,
}

impl AdhanSound {
    pub const ALL: [AdhanSound; 5] = [
        AdhanSound::Makkah,
        AdhanSound::Madinah,
        AdhanSound::Egypt,
        AdhanSound::Turkey,
        AdhanSound::Silent,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::Makkah => "makkah",
            Self::Madinah => "madinah",
            Self::Egypt => "egypt",
            Self::Turkey => "turkey",
            Self::Silent => "silent",
        }
    }

    /// Playable asset for the sound; `None` for silent mode.
    pub fn asset_url(&self) -> Option<&'static str> {
        match self {
            Self::Makkah => Some("https://server11.mp3quran.net/a_jbr/Adhan/Makkah.mp3"),
            Self::Madinah => Some("https://server11.mp3quran.net/a_jbr/Adhan/Madinah.mp3"),
            Self::Egypt => Some("https://server11.mp3quran.net/a_jbr/Adhan/Egypt.mp3"),
            Self::Turkey => Some("https://server11.mp3quran.net/a_jbr/Adhan/Turkey.mp3"),
            Self::Silent => None,
        }
    }

    pub fn is_silent(&self) -> bool {
        *self == Self::Silent
    }

    pub fn cycle(self, forward: bool) -> Self {
        let idx = Self::ALL.iter().position(|&s| s == self).unwrap_or(0);
        let len = Self::ALL.len();
        let new_idx = if forward { (idx + 1) % len } else { (idx + len - 1) % len };
        Self::ALL[new_idx]
    }
}

impl fmt::Display for AdhanSound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for AdhanSound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|sound| sound.id() == s)
            .ok_or_else(|| format!("unknown adhan sound {s:?} (makkah, madinah, egypt, turkey, silent)"))
    }
}

// ============================================================================
// NotificationPreferences
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct NotificationPreferences {
    pub enabled: bool,
    pub reminder_minutes: u32,
    pub prayers: BTreeMap<Prayer, bool>,
    pub adhan_sound: AdhanSound,
    pub volume: u8,
    pub vibration: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            enabled: true,
            reminder_minutes: 5,
            prayers: Prayer::ALL.into_iter().map(|p| (p, true)).collect(),
            adhan_sound: AdhanSound::Makkah,
            volume: 80,
            vibration: true,
        }
    }
}

impl NotificationPreferences {
    pub fn is_enabled_for(&self, prayer: Prayer) -> bool {
        self.prayers.get(&prayer).copied().unwrap_or(true)
    }

    pub fn set_enabled_for(&mut self, prayer: Prayer, on: bool) {
        self.prayers.insert(prayer, on);
    }

    pub fn set_volume(&mut self, volume: i32) {
        self.volume = volume.clamp(0, 100) as u8;
    }

    pub fn cycle_reminder(&mut self, forward: bool) {
        let idx = REMINDER_CHOICES
            .iter()
            .position(|&m| m == self.reminder_minutes)
            .unwrap_or(0);
        let len = REMINDER_CHOICES.len();
        let new_idx = if forward { (idx + 1) % len } else { (idx + len - 1) % len };
        self.reminder_minutes = REMINDER_CHOICES[new_idx];
    }

    /// Vibration pattern in milliseconds (on, off, on).
    pub fn vibration_pattern(&self) -> Option<Vec<u32>> {
        self.vibration.then(|| vec![200, 100, 200])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_round_trip_through_flat_json() {
        let mut prefs = NotificationPreferences::default();
        prefs.set_enabled_for(Prayer::Asr, false);
        let json = serde_json::to_value(&prefs).unwrap();
        assert_eq!(json["prayers"]["asr"], false);
        assert_eq!(json["adhan_sound"], "makkah");

        let back: NotificationPreferences = serde_json::from_value(json).unwrap();
        assert!(!back.is_enabled_for(Prayer::Asr));
        assert!(back.is_enabled_for(Prayer::Isha));
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let prefs: NotificationPreferences = serde_json::from_str(r#"{"reminder_minutes":10}"#).unwrap();
        assert_eq!(prefs.reminder_minutes, 10);
        assert_eq!(prefs.volume, 80);
        assert!(prefs.is_enabled_for(Prayer::Fajr));
    }

    #[test]
    fn volume_and_reminder_stay_in_range() {
        let mut prefs = NotificationPreferences::default();
        prefs.set_volume(140);
        assert_eq!(prefs.volume, 100);
        prefs.set_volume(-3);
        assert_eq!(prefs.volume, 0);

        prefs.reminder_minutes = 30;
        prefs.cycle_reminder(true);
        assert_eq!(prefs.reminder_minutes, 0);
        prefs.cycle_reminder(false);
        assert_eq!(prefs.reminder_minutes, 30);
    }

    #[test]
    fn coordinate_needs_both_halves() {
        let mut config = Config { latitude: Some(21.42), ..Default::default() };
        assert_eq!(config.coordinate(), None);
        config.longitude = Some(39.83);
        assert_eq!(config.coordinate(), Some(GeoCoordinate { latitude: 21.42, longitude: 39.83 }));

        let parsed: Config = serde_json::from_str(r#"{"calculation_method": 11}"#).unwrap();
        assert_eq!(parsed.calculation_method, 11);
        assert!(parsed.sound_enabled);
    }

    #[test]
    fn sound_parsing_and_cycling() {
        assert_eq!("Egypt".parse::<AdhanSound>(), Ok(AdhanSound::Egypt));
        assert!("opera".parse::<AdhanSound>().is_err());
        assert_eq!(AdhanSound::Silent.cycle(true), AdhanSound::Makkah);
        assert_eq!(AdhanSound::Makkah.cycle(false), AdhanSound::Silent);
        assert!(AdhanSound::Silent.asset_url().is_none());
    }
}
