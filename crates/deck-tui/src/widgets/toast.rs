//! Toasts: short-lived notices stacked in the top-right corner.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Clear, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::theme::{C_OVERLAY_BG, C_TOAST_ERROR, C_TOAST_INFO, C_TOAST_SUCCESS, C_TOAST_WARNING};

const MAX_VISIBLE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    fn glyph(self) -> char {
        match self {
            Severity::Info => '·',
            Severity::Success => '✓',
            Severity::Warning => '!',
            Severity::Error => '✗',
        }
    }

    fn color(self) -> Color {
        match self {
            Severity::Info => C_TOAST_INFO,
            Severity::Success => C_TOAST_SUCCESS,
            Severity::Warning => C_TOAST_WARNING,
            Severity::Error => C_TOAST_ERROR,
        }
    }

    /// Errors linger longest.
    fn ttl(self) -> Duration {
        match self {
            Severity::Info | Severity::Success => Duration::from_secs(3),
            Severity::Warning => Duration::from_secs(4),
            Severity::Error => Duration::from_secs(6),
        }
    }
}

struct Toast {
    text: String,
    severity: Severity,
    until: Instant,
}

#[derive(Default)]
pub struct ToastManager {
    queue: VecDeque<Toast>,
}

impl ToastManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `text` for `ttl`. Repeating a visible message restarts it.
    pub fn notify(&mut self, text: impl Into<String>, severity: Severity, ttl: Duration) {
        let text = text.into();
        self.queue.retain(|t| t.text != text);
        self.queue.push_back(Toast {
            text,
            severity,
            until: Instant::now() + ttl,
        });
        if self.queue.len() > MAX_VISIBLE {
            self.queue.pop_front();
        }
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.notify(text, Severity::Info, Severity::Info.ttl());
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.notify(text, Severity::Success, Severity::Success.ttl());
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.notify(text, Severity::Warning, Severity::Warning.ttl());
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.notify(text, Severity::Error, Severity::Error.ttl());
    }

    /// Drop expired toasts; true when any went away.
    pub fn tick(&mut self) -> bool {
        let now = Instant::now();
        let before = self.queue.len();
        self.queue.retain(|t| t.until > now);
        before != self.queue.len()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Newest on top, one row each, right-aligned under the header.
    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let max_w = (area.width / 2).clamp(24, 56).min(area.width);
        let rows = area.y + 2..area.y + area.height;
        for (toast, y) in self.queue.iter().rev().zip(rows) {
            let label = format!(" {} {} ", toast.severity.glyph(), toast.text);
            let w = (label.width() as u16).min(max_w);
            let rect = Rect::new(area.right().saturating_sub(w + 1), y, w, 1);
            frame.render_widget(Clear, rect);
            frame.render_widget(
                Paragraph::new(Span::styled(
                    label,
                    Style::default()
                        .fg(toast.severity.color())
                        .bg(C_OVERLAY_BG)
                        .add_modifier(Modifier::BOLD),
                )),
                rect,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn test_repeats_collapse_and_expire() {
        let mut toasts = ToastManager::new();
        toasts.info("added");
        toasts.info("added");
        assert_eq!(toasts.len(), 1);
        toasts.notify("gone", Severity::Error, Duration::ZERO);
        assert!(toasts.tick());
        assert_eq!(toasts.len(), 1);
        assert!(!toasts.tick());
    }

    #[test]
    fn test_queue_is_bounded_and_newest_on_top() {
        let mut toasts = ToastManager::new();
        for i in 0..6 {
            toasts.info(format!("n{i}"));
        }
        assert_eq!(toasts.len(), MAX_VISIBLE);
        let mut terminal = Terminal::new(TestBackend::new(60, 10)).unwrap();
        terminal.draw(|f| toasts.draw(f, f.area())).unwrap();
        let row: String = (0..60)
            .map(|x| terminal.backend().buffer()[(x, 2)].symbol().to_string())
            .collect();
        assert!(row.contains("n5"));
    }
}
