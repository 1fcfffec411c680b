//! FilterInput: wraps tui-input for the station filter bar and the text
//! fields of the settings overlay.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::{C_FILTER_BG, C_FILTER_FG, C_MUTED, C_SECONDARY};

#[derive(Debug, PartialEq)]
pub enum FilterAction {
    Changed(String),
    Confirmed,
    Cancelled,
    None,
}

pub struct FilterInput {
    input: Input,
    active: bool,
    prefix: String,
    placeholder: String,
}

impl FilterInput {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            active: false,
            prefix: "/".to_string(),
            placeholder: placeholder.into(),
        }
    }

    /// Label drawn before the text, `/` by default.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn clear(&mut self) {
        self.input = Input::default();
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Esc clears the text first, then closes on an empty input.
    /// Enter confirms and closes.
    pub fn handle_key(&mut self, key: KeyEvent) -> FilterAction {
        match key.code {
            KeyCode::Esc => {
                if !self.input.value().is_empty() {
                    self.input = Input::default();
                    FilterAction::Changed(String::new())
                } else {
                    self.deactivate();
                    FilterAction::Cancelled
                }
            }
            KeyCode::Enter => {
                self.deactivate();
                FilterAction::Confirmed
            }
            _ => match self
                .input
                .handle_event(&ratatui::crossterm::event::Event::Key(key))
            {
                Some(change) if change.value => {
                    FilterAction::Changed(self.input.value().to_string())
                }
                _ => FilterAction::None,
            },
        }
    }

    /// Render as a one-line bar into `area`.
    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let lead = self.prefix.chars().count() + 1;
        let scroll = self
            .input
            .visual_scroll(area.width.saturating_sub(lead as u16 + 2) as usize);
        let value = self.input.value();
        let display = if value.is_empty() {
            Span::styled(
                format!("{} {}", self.prefix, self.placeholder),
                Style::default().fg(C_MUTED),
            )
        } else {
            let shown: String = value.chars().skip(scroll).collect();
            let fg = if self.active { C_FILTER_FG } else { C_SECONDARY };
            Span::styled(format!("{} {}", self.prefix, shown), Style::default().fg(fg))
        };

        let paragraph =
            Paragraph::new(Line::from(vec![display])).style(Style::default().bg(C_FILTER_BG));
        frame.render_widget(paragraph, area);

        if self.active && area.width > 0 {
            let cursor_x = area.x + lead as u16 + (self.input.visual_cursor() - scroll) as u16;
            frame.set_cursor_position((cursor_x.min(area.x + area.width - 1), area.y));
        }
    }
}

impl Default for FilterInput {
    fn default() -> Self {
        Self::new("filter...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_and_escape() {
        let mut input = FilterInput::new("name");
        input.activate();
        assert_eq!(
            input.handle_key(key(KeyCode::Char('j'))),
            FilterAction::Changed("j".into())
        );
        assert_eq!(
            input.handle_key(key(KeyCode::Char('z'))),
            FilterAction::Changed("jz".into())
        );
        // first Esc clears, second closes
        assert_eq!(
            input.handle_key(key(KeyCode::Esc)),
            FilterAction::Changed(String::new())
        );
        assert!(input.is_active());
        assert_eq!(input.handle_key(key(KeyCode::Esc)), FilterAction::Cancelled);
        assert!(!input.is_active());
    }

    #[test]
    fn test_enter_confirms_and_keeps_text() {
        let mut input = FilterInput::new("url").with_prefix("url:");
        input.activate();
        for c in "http://x".chars() {
            input.handle_key(key(KeyCode::Char(c)));
        }
        assert_eq!(input.handle_key(key(KeyCode::Enter)), FilterAction::Confirmed);
        assert_eq!(input.text(), "http://x");
        assert!(!input.is_active());
    }
}
