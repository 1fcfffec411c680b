//! LogPanel component: collapsible log strip.
//!
//! Shows the most recent line when collapsed; expands to a scrollable pane.
//! Lines arrive as `HH:MM:SS [LEVEL] message` from the tracing layer.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{C_CONNECTING, C_ERROR, C_MUTED, C_SECONDARY},
    widgets::pane_chrome::pane_chrome_borders,
};

pub struct LogPanel {
    pub expanded: bool,
    pub scroll: usize,
    pub borders: Borders,
    /// Last seen line count, for auto-scroll.
    last_log_count: usize,
}

impl LogPanel {
    pub fn new() -> Self {
        Self {
            expanded: false,
            scroll: 0,
            borders: Borders::ALL,
            last_log_count: 0,
        }
    }

    pub fn toggle(&mut self) {
        self.expanded = !self.expanded;
        if self.expanded {
            self.scroll = usize::MAX;
        }
    }
}

fn level_color(line: &str) -> Color {
    if line.contains("[ERROR]") {
        C_ERROR
    } else if line.contains("[WARN]") {
        C_CONNECTING
    } else {
        C_SECONDARY
    }
}

impl Component for LogPanel {
    fn id(&self) -> ComponentId {
        ComponentId::LogPanel
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release || !self.expanded {
            return vec![];
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll = self.scroll.saturating_add(1),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(10),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(10),
            KeyCode::Home | KeyCode::Char('g') => self.scroll = 0,
            KeyCode::End | KeyCode::Char('G') => self.scroll = usize::MAX,
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, _state: &AppState) -> Vec<Action> {
        if self.expanded {
            match event.kind {
                MouseEventKind::ScrollUp => self.scroll = self.scroll.saturating_sub(1),
                MouseEventKind::ScrollDown => self.scroll = self.scroll.saturating_add(1),
                _ => {}
            }
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        if let Action::ToggleLogs = action {
            self.toggle();
        }
        vec![]
    }

    fn collapse_summary(&self, state: &AppState) -> Option<String> {
        state.logs.last().cloned()
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        if area.height == 0 {
            return;
        }
        frame.render_widget(Clear, area);

        if !self.expanded || area.height <= 2 {
            let last = self
                .collapse_summary(state)
                .unwrap_or_else(|| "(no log)".to_string());
            frame.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled(" log ", Style::default().fg(C_MUTED)),
                    Span::styled(last.clone(), Style::default().fg(level_color(&last))),
                ])),
                area,
            );
            return;
        }

        let palette = state.palette();
        let block = pane_chrome_borders("log", Some('3'), focused, &[], &palette, self.borders);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let logs = &state.logs;
        let height = inner.height as usize;
        let max_scroll = logs.len().saturating_sub(height);

        // stick to the bottom when new lines arrive
        if logs.len() != self.last_log_count {
            if self.scroll >= self.last_log_count.saturating_sub(height) {
                self.scroll = usize::MAX;
            }
            self.last_log_count = logs.len();
        }
        self.scroll = self.scroll.min(max_scroll);

        if logs.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "  no warnings so far",
                    Style::default().fg(C_MUTED),
                )),
                inner,
            );
            return;
        }

        let lines: Vec<Line> = logs
            .iter()
            .skip(self.scroll)
            .take(height)
            .map(|msg| {
                Line::from(vec![
                    Span::raw("  "),
                    Span::styled(msg.as_str(), Style::default().fg(level_color(msg))),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn test_level_colors() {
        assert_eq!(level_color("12:00:00 [ERROR] boom"), C_ERROR);
        assert_eq!(level_color("12:00:00 [WARN] hmm"), C_CONNECTING);
        assert_eq!(level_color("added Radio X"), C_SECONDARY);
    }

    #[test]
    fn test_expanded_panel_follows_tail() {
        let mut state = AppState::new();
        for i in 0..20 {
            state.push_log(format!("12:00:{i:02} [WARN] line {i}"));
        }
        let mut panel = LogPanel::new();
        panel.toggle();
        let mut terminal = Terminal::new(TestBackend::new(40, 6)).unwrap();
        terminal
            .draw(|f| panel.draw(f, f.area(), false, &state))
            .unwrap();
        // 4 inner rows: lines 16..20
        assert_eq!(panel.scroll, 16);
        let buf = terminal.backend().buffer();
        let last_row: String = (0..40).map(|x| buf[(x, 4)].symbol().to_string()).collect();
        assert!(last_row.contains("line 19"));
    }
}
