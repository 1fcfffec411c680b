//! Header component: 2-row top bar.
//!
//! Row 1: status icon, station name, genre/country, badges, status or error.
//! Row 2: volume gauge, equalizer summary, visualizer mode and skin.
//!
//! Not focusable.

use deck_proto::protocol::{Band, PlaybackStatus};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::{
    app_state::AppState,
    theme::{
        C_ACCENT, C_BADGE_ERR, C_CONNECTING, C_ERROR, C_FAVORITE, C_GENRE, C_LOCATION, C_MUTED,
        C_PLAYING, C_SECONDARY,
    },
};

pub const BADGE_SIGNAL_LOST: &str = "⚠ SIGNAL LOST";
pub const BADGE_FAVORITE: &str = "♥ FAVORITE";
const VOLUME_CELLS: usize = 10;

pub fn status_icon(status: PlaybackStatus) -> (&'static str, Color) {
    match status {
        PlaybackStatus::Playing => ("▶", C_PLAYING),
        PlaybackStatus::Paused => ("⏸", C_CONNECTING),
        PlaybackStatus::Loading => ("⋯", C_CONNECTING),
        PlaybackStatus::Error => ("✗", C_ACCENT),
        PlaybackStatus::Idle => ("■", C_MUTED),
    }
}

fn status_label(status: PlaybackStatus) -> &'static str {
    match status {
        PlaybackStatus::Idle => "STANDBY",
        PlaybackStatus::Loading => "TUNING",
        PlaybackStatus::Playing => "ON AIR",
        PlaybackStatus::Paused => "PAUSED",
        PlaybackStatus::Error => "ERROR",
    }
}

/// `▮▮▮▮▯▯` with `cells` cells.
pub fn volume_gauge(volume: f32, cells: usize) -> String {
    let lit = (volume.clamp(0.0, 1.0) * cells as f32).round() as usize;
    format!("{}{}", "▮".repeat(lit), "▯".repeat(cells - lit))
}

fn signed_db(gain: f32) -> String {
    let rounded = gain.round();
    if rounded == 0.0 {
        "0".to_string()
    } else if rounded > 0.0 {
        format!("+{rounded:.0}")
    } else {
        format!("{rounded:.0}")
    }
}

pub struct Header;

impl Header {
    pub fn new() -> Self {
        Self
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        let bg = Style::default().bg(state.palette().chassis);
        frame.render_widget(Clear, area);
        if area.height < 2 {
            frame.render_widget(Paragraph::new(build_row1(state, area.width)).style(bg), area);
            return;
        }
        let [row1, row2] =
            Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(area);
        frame.render_widget(Paragraph::new(build_row1(state, area.width)).style(bg), row1);
        frame.render_widget(Paragraph::new(build_row2(state)).style(bg), row2);
    }
}

fn build_row1(state: &AppState, width: u16) -> Line<'static> {
    let snap = &state.snapshot;
    let palette = state.palette();
    let (icon, icon_color) = status_icon(snap.status);

    let mut spans = vec![
        Span::raw(" "),
        Span::styled(icon, Style::default().fg(icon_color)),
        Span::raw(" "),
    ];

    let Some(station) = snap.current_station.as_ref() else {
        spans.push(Span::styled(
            "no station tuned",
            Style::default().fg(C_MUTED),
        ));
        return Line::from(spans);
    };

    let accent: Color = state.accent().into();
    spans.push(Span::styled(
        station.name.clone(),
        Style::default().fg(accent).add_modifier(Modifier::BOLD),
    ));
    if !station.genre.is_empty() {
        spans.push(Span::styled("  ", Style::default()));
        spans.push(Span::styled(station.genre.clone(), Style::default().fg(C_GENRE)));
    }
    if !station.country.is_empty() {
        spans.push(Span::styled(" · ", Style::default().fg(C_MUTED)));
        spans.push(Span::styled(
            station.country.clone(),
            Style::default().fg(C_LOCATION),
        ));
    }
    if station.is_offline() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            BADGE_SIGNAL_LOST,
            Style::default().fg(C_BADGE_ERR).add_modifier(Modifier::BOLD),
        ));
    }
    if snap.is_favorite(&station.id) {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(BADGE_FAVORITE, Style::default().fg(C_FAVORITE)));
    }

    // status (or error) right-aligned when it fits
    let (right, right_style) = match snap.playback.error.as_deref() {
        Some(err) => (
            err.to_string(),
            Style::default().fg(C_ERROR).add_modifier(Modifier::BOLD),
        ),
        None => (
            status_label(snap.status).to_string(),
            Style::default().fg(palette.label),
        ),
    };
    let used: usize = spans.iter().map(|s| s.content.width()).sum();
    let room = (width as usize).saturating_sub(used + right.width() + 1);
    if room > 0 {
        spans.push(Span::raw(" ".repeat(room)));
        spans.push(Span::styled(right, right_style));
    } else {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(right, right_style));
    }
    Line::from(spans)
}

fn build_row2(state: &AppState) -> Line<'static> {
    let snap = &state.snapshot;
    let palette = state.palette();
    let label = Style::default().fg(palette.label);
    let value = Style::default().fg(C_SECONDARY);

    let mut spans = vec![Span::styled(" VOL ", label)];
    if snap.playback.is_muted {
        spans.push(Span::styled(
            "MUTED",
            Style::default().fg(C_CONNECTING).add_modifier(Modifier::BOLD),
        ));
    } else {
        spans.push(Span::styled(
            volume_gauge(snap.playback.volume, VOLUME_CELLS),
            Style::default().fg(state.accent().into()),
        ));
        spans.push(Span::styled(
            format!(" {:>3.0}%", snap.playback.volume * 100.0),
            value,
        ));
    }

    spans.push(Span::styled("   EQ", label));
    for band in Band::ALL {
        spans.push(Span::styled(
            format!(" {} {}", band.label(), signed_db(snap.eq.get(band))),
            value,
        ));
    }
    if let Some(preset) = snap.active_preset.as_deref() {
        spans.push(Span::styled(
            format!(" [{}]", preset.to_uppercase()),
            Style::default().fg(C_GENRE),
        ));
    }

    spans.push(Span::styled("   MODE ", label));
    spans.push(Span::styled(snap.visualizer_mode.to_string(), value));
    spans.push(Span::styled("   SKIN ", label));
    spans.push(Span::styled(snap.skin.label(), value));
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_proto::protocol::{Station, StationStatus};
    use ratatui::{backend::TestBackend, Terminal};

    fn render(state: &AppState) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(100, 2)).unwrap();
        terminal
            .draw(|f| Header::new().draw(f, f.area(), state))
            .unwrap();
        let buf = terminal.backend().buffer();
        (0..2)
            .map(|y| (0..100).map(|x| buf[(x, y)].symbol().to_string()).collect())
            .collect()
    }

    #[test]
    fn test_signed_db() {
        assert_eq!(signed_db(-0.2), "0");
        assert_eq!(signed_db(8.0), "+8");
        assert_eq!(signed_db(-12.0), "-12");
    }

    #[test]
    fn test_volume_gauge() {
        assert_eq!(volume_gauge(0.0, 4), "▯▯▯▯");
        assert_eq!(volume_gauge(0.5, 4), "▮▮▯▯");
        assert_eq!(volume_gauge(3.0, 4), "▮▮▮▮");
    }

    #[test]
    fn test_badges_and_error() {
        let mut state = AppState::new();
        state.snapshot.current_station = Some(Station {
            id: "x".into(),
            name: "Radio X".into(),
            status: StationStatus::Offline,
            ..Station::default()
        });
        state.snapshot.favorites = vec!["x".into()];
        state.snapshot.status = PlaybackStatus::Error;
        state.snapshot.playback.error = Some("STREAM OFFLINE / ERROR".into());
        let rows = render(&state);
        assert!(rows[0].contains("Radio X"));
        assert!(rows[0].contains("SIGNAL LOST"));
        assert!(rows[0].contains("FAVORITE"));
        assert!(rows[0].contains("STREAM OFFLINE / ERROR"));
        assert!(rows[1].contains("LOW 0 MID 0 HIGH 0"));
    }

    #[test]
    fn test_muted_row() {
        let mut state = AppState::new();
        state.snapshot.playback.is_muted = true;
        let rows = render(&state);
        assert!(rows[0].contains("no station tuned"));
        assert!(rows[1].contains("MUTED"));
        assert!(rows[1].contains("wave"));
    }
}
