//! Where firings end up: a desktop notification and the adhan audio.

use std::{
    io,
    process::{Child, Command, Stdio},
    sync::Mutex,
    time::Duration,
};

use notify_rust::{Notification, Timeout, Urgency};

use crate::{
    config::AdhanSound,
    error::{AudioPlaybackError, PermissionError},
};

/// Test sounds stop on their own after this long.
pub const TEST_AUDIO_CUTOFF: Duration = Duration::from_secs(30);

const APP_NAME: &str = "miqat";
const NOTIFICATION_TIMEOUT_MS: u32 = 10_000;

// ============================================================================
// Notifications
// ============================================================================

pub trait NotificationSink: Send + Sync {
    /// `Ok` when notifications may be shown at all.
    fn permission(&self) -> Result<(), PermissionError>;

    fn notify(&self, title: &str, body: &str, vibration: Option<&[u32]>) -> Result<(), PermissionError>;
}

pub struct DesktopNotifier {
    allowed: bool,
}

impl DesktopNotifier {
    pub fn new(allowed: bool) -> Self {
        Self { allowed }
    }
}

impl NotificationSink for DesktopNotifier {
    fn permission(&self) -> Result<(), PermissionError> {
        if self.allowed { Ok(()) } else { Err(PermissionError::Notification) }
    }

    fn notify(&self, title: &str, body: &str, vibration: Option<&[u32]>) -> Result<(), PermissionError> {
        self.permission()?;
        if let Some(pattern) = vibration {
            // Desktops cannot vibrate; the pattern only matters to handheld sinks.
            tracing::trace!(?pattern, "Vibration requested");
        }

        Notification::new()
            .summary(title)
            .body(body)
            .appname(APP_NAME)
            .icon("appointment-soon")
            .urgency(Urgency::Critical)
            .timeout(Timeout::Milliseconds(NOTIFICATION_TIMEOUT_MS))
            .show()
            .map(|_| ())
            .map_err(|e| PermissionError::Delivery(e.to_string()))
    }
}

// ============================================================================
// Audio
// ============================================================================

pub trait AudioSink: Send + Sync {
    /// Starts `sound` at `volume` (0-100), stopping whatever was playing.
    fn play(&self, sound: AdhanSound, volume: u8, cutoff: Option<Duration>) -> Result<(), AudioPlaybackError>;

    fn stop(&self);

    /// Releases playback that has ended on its own.
    fn reap(&self) {}
}

/// Command-line players tried in order.
pub const PLAYERS: [&str; 3] = ["mpv", "ffplay", "cvlc"];

/// Arguments for streaming `url` through `player`.
pub fn player_args(player: &str, url: &str, volume: u8, cutoff: Option<Duration>) -> Vec<String> {
    let volume = volume.min(100);
    let mut args: Vec<String> = match player {
        "mpv" => vec!["--no-video".into(), "--really-quiet".into(), format!("--volume={volume}")],
        "ffplay" => vec!["-nodisp".into(), "-autoexit".into(), "-loglevel".into(), "quiet".into(), "-volume".into(), volume.to_string()],
        "cvlc" => vec!["--play-and-exit".into(), "--quiet".into(), format!("--gain={:.2}", f32::from(volume) / 100.0)],
        _ => Vec::new(),
    };

    if let Some(limit) = cutoff {
        let secs = limit.as_secs();
        match player {
            "mpv" => args.push(format!("--length={secs}")),
            "ffplay" => args.extend(["-t".into(), secs.to_string()]),
            "cvlc" => args.push(format!("--stop-time={secs}")),
            _ => {}
        }
    }

    args.push(url.into());
    args
}

/// Streams adhan assets through the first installed command-line player.
pub struct CommandPlayer {
    players: Vec<String>,
    current: Mutex<Option<Child>>,
}

impl Default for CommandPlayer {
    fn default() -> Self {
        Self::new(PLAYERS.iter().map(|p| p.to_string()).collect())
    }
}

impl CommandPlayer {
    pub fn new(players: Vec<String>) -> Self {
        Self {
            players,
            current: Mutex::new(None),
        }
    }

    fn spawn(&self, url: &str, volume: u8, cutoff: Option<Duration>) -> Result<Child, AudioPlaybackError> {
        for player in &self.players {
            let spawned = Command::new(player)
                .args(player_args(player, url, volume, cutoff))
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();
            match spawned {
                Ok(child) => {
                    tracing::info!(player = %player, url, volume, "Adhan playback started");
                    return Ok(child);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(source) => {
                    return Err(AudioPlaybackError::Spawn { player: player.clone(), source });
                }
            }
        }
        Err(AudioPlaybackError::NoPlayer(self.players.join(", ")))
    }

    /// True while a started player is still running.
    pub fn is_playing(&self) -> bool {
        self.reap();
        self.current.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

impl AudioSink for CommandPlayer {
    fn play(&self, sound: AdhanSound, volume: u8, cutoff: Option<Duration>) -> Result<(), AudioPlaybackError> {
        let url = sound.asset_url().ok_or(AudioPlaybackError::Silent)?;
        self.stop();
        let child = self.spawn(url, volume, cutoff)?;
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(child);
        Ok(())
    }

    fn stop(&self) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut child) = current.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn reap(&self) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let finished = match current.as_mut().map(Child::try_wait) {
            Some(Ok(Some(status))) => {
                tracing::debug!(%status, "Adhan playback finished");
                true
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Could not poll the audio player");
                true
            }
            _ => false,
        };
        if finished {
            *current = None;
        }
    }
}

impl Drop for CommandPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Audio sink for `--no-sound`: every request is refused as silent.
pub struct Muted;

impl AudioSink for Muted {
    fn play(&self, _sound: AdhanSound, _volume: u8, _cutoff: Option<Duration>) -> Result<(), AudioPlaybackError> {
        Err(AudioPlaybackError::Silent)
    }

    fn stop(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mpv_gets_volume_and_cutoff() {
        let args = player_args("mpv", "https://a/b.mp3", 80, Some(TEST_AUDIO_CUTOFF));
        assert!(args.contains(&"--volume=80".to_string()));
        assert!(args.contains(&"--length=30".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://a/b.mp3"));
    }

    #[test]
    fn vlc_volume_is_a_gain() {
        let args = player_args("cvlc", "u", 150, None);
        assert!(args.contains(&"--gain=1.00".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--stop-time")));
    }

    #[test]
    fn silent_sound_never_spawns() {
        let player = CommandPlayer::new(vec!["definitely-not-a-player".into()]);
        assert!(matches!(player.play(AdhanSound::Silent, 80, None), Err(AudioPlaybackError::Silent)));
    }

    #[test]
    fn missing_players_are_reported() {
        let player = CommandPlayer::new(vec!["miqat-missing-a".into(), "miqat-missing-b".into()]);
        match player.play(AdhanSound::Makkah, 80, None) {
            Err(AudioPlaybackError::NoPlayer(tried)) => assert_eq!(tried, "miqat-missing-a, miqat-missing-b"),
            other => panic!("expected NoPlayer, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn finished_players_are_reaped() {
        // `true` ignores its arguments and exits at once.
        let player = CommandPlayer::new(vec!["true".into()]);
        player.play(AdhanSound::Makkah, 80, None).unwrap();

        let mut playing = true;
        for _ in 0..100 {
            playing = player.is_playing();
            if !playing {
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(!playing);
        assert!(player.current.lock().unwrap().is_none());
    }

    #[test]
    fn denied_notifier_refuses() {
        let notifier = DesktopNotifier::new(false);
        assert_eq!(notifier.permission(), Err(PermissionError::Notification));
        assert_eq!(notifier.notify("t", "b", None), Err(PermissionError::Notification));
    }
}
