//! Status bar: bottom lines with the play LED, vibe caption, clock and
//! keybindings.

use deck_proto::protocol::PlaybackStatus;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app_state::AppState;
use crate::theme::{
    C_CONNECTING, C_ERROR, C_MODE_FILTER, C_MODE_INPUT, C_MODE_NORMAL, C_MUTED, C_PLAYING,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Filter,
    /// A settings text field has the keyboard.
    Input,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Filter => "FILTER",
            Self::Input => "INPUT",
        }
    }

    pub fn color(self) -> Color {
        match self {
            Self::Normal => C_MODE_NORMAL,
            Self::Filter => C_MODE_FILTER,
            Self::Input => C_MODE_INPUT,
        }
    }
}

/// Green while audio flows, amber while tuning, red otherwise.
pub fn led_color(status: PlaybackStatus) -> Color {
    match status {
        PlaybackStatus::Playing => C_PLAYING,
        PlaybackStatus::Loading => C_CONNECTING,
        _ => C_ERROR,
    }
}

/// LED + vibe caption on the left, wall clock on the right.
pub fn draw_status_bar(frame: &mut Frame, area: Rect, state: &AppState, clock: &str) {
    let palette = state.palette();
    let [left, right] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(clock.len() as u16 + 2)])
            .areas(area);

    let line = Line::from(vec![
        Span::raw(" "),
        Span::styled(
            "●",
            Style::default()
                .fg(led_color(state.snapshot.status))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(state.snapshot.vibe.clone(), Style::default().fg(palette.label)),
    ]);
    let bg = Style::default().bg(palette.chassis);
    frame.render_widget(Paragraph::new(line).style(bg), left);
    frame.render_widget(
        Paragraph::new(Span::styled(
            format!("{clock} "),
            Style::default().fg(palette.label).add_modifier(Modifier::BOLD),
        ))
        .right_aligned()
        .style(bg),
        right,
    );
}

/// Draw the keybindings footer (one row).
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode) {
    let keys = match mode {
        InputMode::Normal => {
            " ↑↓/jk select  Enter play  Space play/pause  n/p next/prev  ←→ vol  m mute  v mode  \
             f favorite  F favorites  e settings  / filter  L logs  ? help  q quit"
        }
        InputMode::Filter => " type to filter  Up/Down move  Enter keep  Esc clear+close",
        InputMode::Input => " type text  Enter submit  Esc cancel",
    };

    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", mode.label()),
            Style::default().fg(mode.color()).add_modifier(Modifier::BOLD),
        ),
        Span::styled(keys, Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn test_led_follows_status() {
        assert_eq!(led_color(PlaybackStatus::Playing), C_PLAYING);
        assert_eq!(led_color(PlaybackStatus::Loading), C_CONNECTING);
        assert_eq!(led_color(PlaybackStatus::Paused), C_ERROR);
        assert_eq!(led_color(PlaybackStatus::Error), C_ERROR);
    }

    #[test]
    fn test_status_bar_shows_vibe_and_clock() {
        let mut state = AppState::new();
        state.snapshot.vibe = "VIBE: TEST".into();
        let mut terminal = Terminal::new(TestBackend::new(40, 1)).unwrap();
        terminal
            .draw(|f| draw_status_bar(f, f.area(), &state, "12:34"))
            .unwrap();
        let row: String = (0..40)
            .map(|x| terminal.backend().buffer()[(x, 0)].symbol().to_string())
            .collect();
        assert!(row.contains("VIBE: TEST"));
        assert!(row.contains("12:34"));
    }
}
