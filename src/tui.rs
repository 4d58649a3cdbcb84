use chrono::NaiveDateTime;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{prelude::*, widgets::*};

use miqat::{
    clock::Prayer,
    config::{AdhanSound, NotificationPreferences},
    countdown::EventPhase,
    events::{Confidence, Importance},
    session::Session,
};

const BORDER: Color = Color::Rgb(0, 200, 150);
const ACCENT: Color = Color::Rgb(255, 200, 0);
const NEXT: Color = Color::Rgb(100, 181, 246);

// ============================================================================
// UI state
// ============================================================================

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum View {
    Dashboard,
    Events,
    Settings,
    Help,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum SettingsField {
    Enabled,
    Reminder,
    Prayer(Prayer),
    Sound,
    Volume,
    Vibration,
    TestNotification,
    TestAdhan,
}

impl SettingsField {
    const ORDER: [SettingsField; 12] = [
        Self::Enabled,
        Self::Reminder,
        Self::Prayer(Prayer::Fajr),
        Self::Prayer(Prayer::Dhuhr),
        Self::Prayer(Prayer::Asr),
        Self::Prayer(Prayer::Maghrib),
        Self::Prayer(Prayer::Isha),
        Self::Sound,
        Self::Volume,
        Self::Vibration,
        Self::TestNotification,
        Self::TestAdhan,
    ];

    fn index(self) -> usize {
        Self::ORDER.iter().position(|&f| f == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ORDER[(self.index() + 1) % Self::ORDER.len()]
    }

    fn prev(self) -> Self {
        Self::ORDER[(self.index() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

pub struct App {
    pub view: View,
    pub settings_field: SettingsField,
}

impl App {
    pub fn new() -> Self {
        Self {
            view: View::Dashboard,
            settings_field: SettingsField::Enabled,
        }
    }
}

// ============================================================================
// Input
// ============================================================================

/// Returns true when the app should quit.
pub fn handle_input(key: KeyEvent, app: &mut App, session: &mut Session, now: NaiveDateTime) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    match app.view {
        View::Settings => {
            handle_settings_view(key, app, session, now);
            false
        }
        _ => handle_main_view(key, app, session),
    }
}

fn handle_main_view(key: KeyEvent, app: &mut App, session: &mut Session) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Esc => {
            if app.view == View::Dashboard {
                return true;
            }
            app.view = View::Dashboard;
        }
        KeyCode::Char('e') => {
            app.view = if app.view == View::Events { View::Dashboard } else { View::Events };
        }
        KeyCode::Char('n') | KeyCode::Char('d') => app.view = View::Settings,
        KeyCode::Char('h') | KeyCode::Char('?') => {
            app.view = if app.view == View::Help { View::Dashboard } else { View::Help };
        }
        KeyCode::Char('s') => session.stop_audio(),
        _ => {}
    }
    false
}

fn handle_settings_view(key: KeyEvent, app: &mut App, session: &mut Session, now: NaiveDateTime) {
    let mut prefs = session.preferences().clone();
    let before = prefs.clone();

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.view = View::Dashboard,
        KeyCode::Down | KeyCode::Char('j') => app.settings_field = app.settings_field.next(),
        KeyCode::Up | KeyCode::Char('k') => app.settings_field = app.settings_field.prev(),
        KeyCode::Char(' ') | KeyCode::Enter => match app.settings_field {
            SettingsField::Enabled => prefs.enabled = !prefs.enabled,
            SettingsField::Prayer(p) => prefs.set_enabled_for(p, !prefs.is_enabled_for(p)),
            SettingsField::Vibration => prefs.vibration = !prefs.vibration,
            SettingsField::TestNotification => session.test_notification(),
            SettingsField::TestAdhan => session.test_adhan(),
            SettingsField::Reminder => prefs.cycle_reminder(true),
            SettingsField::Sound => prefs.adhan_sound = prefs.adhan_sound.cycle(true),
            SettingsField::Volume => {}
        },
        KeyCode::Left | KeyCode::Char('h') => adjust(app.settings_field, &mut prefs, false),
        KeyCode::Right | KeyCode::Char('l') => adjust(app.settings_field, &mut prefs, true),
        _ => {}
    }

    if prefs != before {
        session.update_preferences(prefs, now);
    }
}

fn adjust(field: SettingsField, prefs: &mut NotificationPreferences, forward: bool) {
    match field {
        SettingsField::Reminder => prefs.cycle_reminder(forward),
        SettingsField::Sound => prefs.adhan_sound = prefs.adhan_sound.cycle(forward),
        SettingsField::Volume => {
            let step = if forward { 10 } else { -10 };
            prefs.set_volume(i32::from(prefs.volume) + step);
        }
        _ => {}
    }
}

// ============================================================================
// Rendering
// ============================================================================

pub fn render_ui(f: &mut Frame, app: &App, session: &Session, now: NaiveDateTime) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1), Constraint::Length(1), Constraint::Length(2)])
        .split(f.size());

    render_header(f, session, now, chunks[0]);
    match app.view {
        View::Dashboard => render_dashboard(f, session, now, chunks[1]),
        View::Events => render_events(f, session, now, chunks[1]),
        View::Settings => render_settings(f, app, session, chunks[1]),
        View::Help => render_help(f, chunks[1]),
    }

    let status = session.status().unwrap_or("");
    f.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::Yellow)).alignment(Alignment::Center),
        chunks[2],
    );
    f.render_widget(controls(app.view), chunks[3]);
}

fn render_header(f: &mut Frame, session: &Session, now: NaiveDateTime, area: Rect) {
    let hijri = session.hijri_date().map(|h| h.label()).unwrap_or_default();
    let line = Line::from(vec![
        Span::styled(session.location_label().to_string(), Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        Span::raw("  •  "),
        Span::styled(now.format("%A, %d %B %Y  %H:%M").to_string(), Style::default().fg(Color::Gray)),
        Span::raw("  •  "),
        Span::styled(hijri, Style::default().fg(ACCENT)),
    ]);
    f.render_widget(
        Paragraph::new(line).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(BORDER))
                .title(Span::styled(" 🕌 MIQAT ", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))),
        ),
        area,
    );
}

fn render_dashboard(f: &mut Frame, session: &Session, now: NaiveDateTime, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(7)])
        .split(columns[0]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(7)])
        .split(columns[1]);

    // Next prayer
    let next = session.next_prayer();
    let name = next.map_or("--", |p| p.name());
    let lines = vec![
        Line::from(Span::styled(format!("Menuju {name}"), Style::default().fg(NEXT).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(Span::styled(
            session.prayer_countdown().display(now),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
    ];
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center).block(panel(" Next Prayer ")), left[0]);

    // Five prayers
    let daily = session.daily();
    let rows: Vec<Line> = Prayer::ALL
        .into_iter()
        .map(|p| {
            let style = if Some(p) == next {
                Style::default().fg(NEXT).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            Line::from(vec![
                Span::styled(format!("  {:<10}", p.name()), style),
                Span::styled(daily.display(p), style),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(rows).block(panel(" Prayer Times ")), left[1]);

    // Sunnah
    let sunnah: Vec<Line> = session
        .sunnah()
        .rows()
        .into_iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!("  {label:<17}"), Style::default().fg(Color::Gray)),
                Span::styled(value.to_string(), Style::default().fg(Color::White)),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(sunnah).block(panel(" Sunnah ")), right[0]);

    // Yearly event
    let countdown = session.event_countdown();
    let mut lines = Vec::new();
    if let Some(event) = countdown.target() {
        lines.push(Line::from(Span::styled(event.name.clone(), Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))));
        let remaining = match countdown.phase(now) {
            Some(EventPhase::Upcoming { days, hours, minutes }) => format!("{days} hari  {hours} jam  {minutes} menit"),
            Some(EventPhase::InProgress) => "Sedang berlangsung".into(),
            _ => "--".into(),
        };
        lines.push(Line::from(remaining));
        lines.push(Line::from(Span::styled(
            event.gregorian_date.format("%d %B %Y").to_string(),
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(Span::styled(
            countdown.message(now),
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        )));
    } else {
        lines.push(Line::from("--"));
    }
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center).block(panel(" Ramadan ")), right[1]);
}

fn render_events(f: &mut Frame, session: &Session, now: NaiveDateTime, area: Rect) {
    let area = centered_rect(80, 90, area);
    let mut lines = vec![Line::from("")];

    for upcoming in session.upcoming_events(now) {
        let event = upcoming.event;
        let name_style = match event.importance {
            Importance::Major => Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            Importance::Special => Style::default().fg(Color::White),
        };
        let when = match upcoming.days_until {
            0 => "hari ini".to_string(),
            d => format!("{d} hari lagi"),
        };
        let marker = match event.source_confidence {
            Confidence::Authoritative => " ✓",
            Confidence::Calculated => "",
        };
        lines.push(Line::from(vec![
            Span::styled(format!("  {}{marker}", event.name), name_style),
            Span::styled(format!("  ({when})"), Style::default().fg(NEXT)),
        ]));
        lines.push(Line::from(Span::styled(
            format!("    {}  •  {}", event.gregorian_date.format("%d %b %Y"), event.hijri_label),
            Style::default().fg(Color::Gray),
        )));
        lines.push(Line::from(Span::styled(
            format!("    {}", event.description),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(
        "  ✓ official date  •  others are calculated and may differ by a day or two",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    f.render_widget(Paragraph::new(lines).block(panel(" Upcoming Events ")), area);
}

fn render_settings(f: &mut Frame, app: &App, session: &Session, area: Rect) {
    let area = centered_rect(70, 95, area);
    let prefs = session.preferences();
    let on_off = |on: bool| (if on { "ON" } else { "OFF" }).to_string();

    let mut lines = vec![
        Line::from(Span::styled(
            "  ↑↓/jk: Navigate  •  Space: Toggle  •  ←→/hl: Change",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
        Line::from(""),
    ];

    for field in SettingsField::ORDER {
        let (label, value) = match field {
            SettingsField::Enabled => ("🔔 Notifications".to_string(), on_off(prefs.enabled)),
            SettingsField::Reminder => ("⏰ Reminder".into(), match prefs.reminder_minutes {
                0 => "OFF".into(),
                m => format!("< {m} min before >"),
            }),
            SettingsField::Prayer(p) => (format!("   {}", p.name()), on_off(prefs.is_enabled_for(p))),
            SettingsField::Sound => ("🔊 Adhan".into(), format!("< {} >", sound_label(prefs.adhan_sound))),
            SettingsField::Volume => ("   Volume".into(), format!("< {}% >", prefs.volume)),
            SettingsField::Vibration => ("📳 Vibration".into(), on_off(prefs.vibration)),
            SettingsField::TestNotification => ("▶ Test notification".into(), String::new()),
            SettingsField::TestAdhan => ("▶ Test adhan".into(), String::new()),
        };

        let selected = app.settings_field == field;
        let (prefix, label_style, value_style) = if selected {
            ("  > ", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
             Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
        } else {
            ("    ", Style::default().fg(Color::Gray), Style::default().fg(Color::DarkGray))
        };
        lines.push(Line::from(vec![
            Span::styled(prefix, label_style),
            Span::styled(format!("{label:<24}"), label_style),
            Span::styled(value, value_style),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("  💾 Auto-saved", Style::default().fg(Color::Green).add_modifier(Modifier::ITALIC))));

    f.render_widget(Paragraph::new(lines).block(panel(" Notification Settings ")), area);
}

fn sound_label(sound: AdhanSound) -> &'static str {
    match sound {
        AdhanSound::Makkah => "Makkah",
        AdhanSound::Madinah => "Madinah",
        AdhanSound::Egypt => "Mesir",
        AdhanSound::Turkey => "Turki",
        AdhanSound::Silent => "Silent",
    }
}

fn render_help(f: &mut Frame, area: Rect) {
    let area = centered_rect(70, 90, area);
    let help_text = vec![
        Line::from(""),
        Line::from("  Views:"),
        help_line("E", "Toggle upcoming events"),
        help_line("N / D", "Notification settings"),
        help_line("H / ?", "Toggle help"),
        Line::from(""),
        Line::from("  Settings:"),
        help_line("↑↓ / JK", "Move between fields"),
        help_line("Space", "Toggle or run the selected field"),
        help_line("←→ / HL", "Change reminder, sound or volume"),
        Line::from(""),
        Line::from("  General:"),
        help_line("S", "Stop the adhan"),
        help_line("Q / Esc", "Exit / Go back"),
        help_line("Ctrl+C", "Force quit"),
        Line::from(""),
        Line::from(Span::styled(
            "  Prayer times from aladhan.com • Sunnah times are derived estimates",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];
    f.render_widget(Paragraph::new(help_text).block(panel(" Help ")), area);
}

fn help_line<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::raw("    "),
        Span::styled(key, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(format!("  {}", desc)),
    ])
}

fn controls(view: View) -> Paragraph<'static> {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));
    let line = match view {
        View::Settings => Line::from(vec![key("Space"), Span::raw(" Toggle  •  "), key("←→"), Span::raw(" Change  •  "), key("Esc"), Span::raw(" Back")]),
        _ => Line::from(vec![
            key("E"), Span::raw(" Events  •  "),
            key("N"), Span::raw(" Notifications  •  "),
            key("S"), Span::raw(" Stop adhan  •  "),
            key("H"), Span::raw(" Help  •  "),
            key("Q"), Span::raw(" Quit"),
        ]),
    };
    Paragraph::new(line).alignment(Alignment::Center).style(Style::default().fg(Color::DarkGray))
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER))
}

fn centered_rect(w: u16, h: u16, r: Rect) -> Rect {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h) / 2),
            Constraint::Percentage(h),
            Constraint::Percentage((100 - h) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w) / 2),
            Constraint::Percentage(w),
            Constraint::Percentage((100 - w) / 2),
        ])
        .split(v[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_fields_wrap_both_ways() {
        assert_eq!(SettingsField::TestAdhan.next(), SettingsField::Enabled);
        assert_eq!(SettingsField::Enabled.prev(), SettingsField::TestAdhan);
        assert_eq!(SettingsField::Reminder.next(), SettingsField::Prayer(Prayer::Fajr));
    }
}
