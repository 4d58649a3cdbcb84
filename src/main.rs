mod tui;

use chrono::{Local, NaiveDateTime};
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use miqat::{
    aladhan::AladhanClient,
    alert::{AudioSink, CommandPlayer, DesktopNotifier, Muted},
    clock::Prayer,
    config::{AdhanSound, Config, NotificationPreferences},
    countdown::{EVENT_TICK, EventPhase, PRAYER_TICK},
    hijri::HijriProvider,
    location::{ConfiguredLocation, GeoCoordinate, Geolocator, IpLocator, resolve_location},
    session::{Collaborators, Session},
    store::{self, CONFIG_KEY, FileStore, KeyValueStore, NOTIFICATION_SETTINGS_KEY},
    time_source::TimingProvider,
};
use ratatui::prelude::*;
use std::{fs, io, path::{Path, PathBuf}, sync::{Arc, Mutex}, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// ============================================================================
// Type Aliases & Constants
// ============================================================================

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
const LOCATE_TIMEOUT: Duration = Duration::from_secs(5);
const LOG_FILE: &str = "miqat.log";

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Clone)]
#[command(author, version, about = "🕌 miqat - Prayer times, sunnah times and adhan alerts in your terminal")]
struct Args {
    /// Latitude of your location
    #[arg(long, allow_hyphen_values = true, requires = "lon")]
    lat: Option<f64>,
    /// Longitude of your location
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    lon: Option<f64>,
    /// Look up an approximate location from your IP address
    #[arg(long)]
    locate: bool,
    /// Reminder before each prayer, e.g. 10, 10m, 1h (0 turns reminders off)
    #[arg(short, long, value_parser = parse_reminder)]
    reminder: Option<u32>,
    /// Adhan voice: makkah, madinah, egypt, turkey or silent
    #[arg(short, long)]
    sound: Option<AdhanSound>,
    /// Adhan volume, 0-100
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
    volume: Option<u8>,
    /// Never play the adhan
    #[arg(long)]
    no_sound: bool,
    /// Aladhan calculation method id
    #[arg(short, long)]
    method: Option<u8>,
    /// Where settings, cache and logs live (default ./miqat)
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Print today's times and exit
    #[arg(short, long)]
    print: bool,
}

fn parse_reminder(s: &str) -> std::result::Result<u32, String> {
    let s = s.trim().to_lowercase();
    let mut total = 0.0;
    let mut num = String::new();

    for c in s.chars() {
        match c {
            '0'..='9' | '.' => num.push(c),
            'h' => { total += num.parse::<f64>().map_err(|_| "Invalid hours")? * 60.0; num.clear(); }
            'm' => { total += num.parse::<f64>().map_err(|_| "Invalid minutes")?; num.clear(); }
            _ => return Err("Invalid format".into()),
        }
    }
    if !num.is_empty() {
        total += num.parse::<f64>().map_err(|_| "Invalid minutes")?;
    }

    if (0.0..=180.0).contains(&total) { Ok(total.round() as u32) } else { Err("Reminder must be 0-180 minutes".into()) }
}

// ============================================================================
// Setup
// ============================================================================

fn init_tracing(data_dir: &Path) -> Result<()> {
    let log = fs::OpenOptions::new().create(true).append(true).open(data_dir.join(LOG_FILE))?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "miqat=info".into()))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(Mutex::new(log)))
        .init();
    Ok(())
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn apply_overrides(args: &Args, config: &mut Config, prefs: &mut NotificationPreferences) {
    if let (Some(latitude), Some(longitude)) = (args.lat, args.lon) {
        config.latitude = Some(latitude);
        config.longitude = Some(longitude);
    }
    if args.locate { config.ip_lookup = true; }
    if let Some(m) = args.method { config.calculation_method = m; }
    if args.no_sound { config.sound_enabled = false; }

    if let Some(r) = args.reminder { prefs.reminder_minutes = r; }
    if let Some(s) = args.sound { prefs.adhan_sound = s; }
    if let Some(v) = args.volume { prefs.volume = v; }
}

async fn build_session(args: &Args, store: Arc<dyn KeyValueStore>) -> Result<Session> {
    let mut config: Config = store::load_or_default(store.as_ref(), CONFIG_KEY);
    let mut prefs: NotificationPreferences = store::load_or_default(store.as_ref(), NOTIFICATION_SETTINGS_KEY);
    apply_overrides(args, &mut config, &mut prefs);
    store::save_json(store.as_ref(), NOTIFICATION_SETTINGS_KEY, &prefs)?;
    tracing::info!(?config, "Configuration loaded");

    let client = AladhanClient::http_client(Duration::from_secs(config.request_timeout_secs))?;

    let mut locators: Vec<Box<dyn Geolocator>> = vec![Box::new(ConfiguredLocation(config.coordinate()))];
    if config.ip_lookup {
        locators.push(Box::new(IpLocator::new(client.clone())));
    }
    let located = resolve_location(&locators, LOCATE_TIMEOUT).await;

    let timings: Vec<Box<dyn TimingProvider>> = vec![Box::new(AladhanClient::new(
        client.clone(),
        config.api_base_url.clone(),
        config.calculation_method,
    ))];
    let hijri: Vec<Box<dyn HijriProvider>> = vec![Box::new(AladhanClient::new(
        client,
        config.api_base_url.clone(),
        config.calculation_method,
    ))];
    let audio: Arc<dyn AudioSink> = if config.sound_enabled { Arc::new(CommandPlayer::default()) } else { Arc::new(Muted) };

    let collaborators = Collaborators {
        store,
        timing_providers: timings,
        hijri_providers: hijri,
        notifier: Arc::new(DesktopNotifier::new(config.desktop_notifications)),
        audio,
    };
    Ok(Session::start(collaborators, located, local_now()).await)
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let file_store = FileStore::open(args.data_dir.clone().unwrap_or_else(store::default_data_dir))?;
    init_tracing(file_store.dir())?;

    let store: Arc<dyn KeyValueStore> = Arc::new(file_store);
    let mut session = build_session(&args, store).await?;

    if args.print {
        print!("{}", summary(&session, local_now()));
        session.teardown();
        return Ok(());
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = tui::App::new();
    let res = run(&mut terminal, &mut app, &mut session).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    session.teardown();
    res
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut tui::App,
    session: &mut Session,
) -> Result<()> {
    let mut keys = EventStream::new();
    let mut second = tokio::time::interval(PRAYER_TICK);
    let mut minute = tokio::time::interval(EVENT_TICK);
    let mut fired = session.subscribe();

    loop {
        terminal.draw(|f| tui::render_ui(f, app, session, local_now()))?;

        tokio::select! {
            _ = second.tick() => session.on_second(local_now()).await,
            _ = minute.tick() => session.on_minute(local_now()).await,
            Ok(entry) = fired.recv() => session.notice_fired(&entry),
            Some(event) = keys.next() => {
                if let Event::Key(key) = event? {
                    if key.kind == KeyEventKind::Press && tui::handle_input(key, app, session, local_now()) {
                        return Ok(());
                    }
                }
            }
        }
    }
}

// ============================================================================
// Plain output
// ============================================================================

fn summary(session: &Session, now: NaiveDateTime) -> String {
    let mut out = String::new();
    let hijri = session.hijri_date().map(|h| h.label()).unwrap_or_default();
    let GeoCoordinate { latitude, longitude } = session.location().coordinate;

    out += &format!("{}  ({latitude:.4}, {longitude:.4})\n", session.location_label());
    out += &format!("{}  •  {hijri}\n\n", now.format("%A, %d %B %Y"));

    let daily = session.daily();
    for prayer in Prayer::ALL {
        let marker = if session.next_prayer() == Some(prayer) { "›" } else { " " };
        out += &format!("{marker} {:<10}{}\n", prayer.name(), daily.display(prayer));
    }
    if let Some(next) = session.next_prayer() {
        out += &format!("\n  {} in {}\n", next.name(), session.prayer_countdown().display(now));
    }

    out += "\nSunnah\n";
    for (label, value) in session.sunnah().rows() {
        out += &format!("  {label:<17}{value}\n");
    }

    let countdown = session.event_countdown();
    if let Some(event) = countdown.target() {
        let when = match countdown.phase(now) {
            Some(EventPhase::Upcoming { days, hours, minutes }) => format!("{days}d {hours}h {minutes}m"),
            Some(EventPhase::InProgress) => "in progress".into(),
            _ => "--".into(),
        };
        out += &format!("\n{}: {when}  ({})\n  {}\n", event.name, event.gregorian_date, countdown.message(now));
    }

    out += "\nUpcoming\n";
    for upcoming in session.upcoming_events(now) {
        out += &format!(
            "  {:<18}{}  {:>4} d  {}\n",
            upcoming.event.name, upcoming.event.gregorian_date, upcoming.days_until, upcoming.event.hijri_label
        );
    }

    if let Some(status) = session.status() {
        out += &format!("\n{status}\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reminder_accepts_bare_and_suffixed_minutes() {
        assert_eq!(parse_reminder("10"), Ok(10));
        assert_eq!(parse_reminder("15m"), Ok(15));
        assert_eq!(parse_reminder("1h"), Ok(60));
        assert_eq!(parse_reminder("0"), Ok(0));
        assert!(parse_reminder("5x").is_err());
        assert!(parse_reminder("4h").is_err());
    }

    #[test]
    fn args_parse_negative_latitude() {
        let args = Args::try_parse_from(["miqat", "--lat", "-6.2", "--lon", "106.8", "--sound", "egypt"]).unwrap();
        assert_eq!(args.lat, Some(-6.2));
        assert_eq!(args.sound, Some(AdhanSound::Egypt));
        assert!(Args::try_parse_from(["miqat", "--lat", "-6.2"]).is_err());
        assert!(Args::try_parse_from(["miqat", "--volume", "120"]).is_err());
    }
}
