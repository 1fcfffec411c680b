//! VisualizerPanel component: the animated display in the right pane.
//!
//! Advanced by frame ticks from the App's `FrameLoop`; redraws the last
//! surface on every draw in between.

use std::time::Duration;

use deck_audio::AnalyserNode;
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{layout::Rect, Frame};
use tokio::sync::watch;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    components::header::{BADGE_FAVORITE, BADGE_SIGNAL_LOST},
    theme::{C_BADGE_ERR, C_FAVORITE},
    visualizer::{JitterSource, Visualizer},
    widgets::pane_chrome::{pane_chrome, Badge},
};

pub struct VisualizerPanel {
    visualizer: Visualizer,
    analyser_rx: watch::Receiver<Option<AnalyserNode>>,
    /// Inner size at the last draw; frames render into this.
    inner: Rect,
}

impl VisualizerPanel {
    pub fn new(
        analyser_rx: watch::Receiver<Option<AnalyserNode>>,
        jitter: Box<dyn JitterSource>,
    ) -> Self {
        Self {
            visualizer: Visualizer::new(Default::default(), jitter),
            analyser_rx,
            inner: Rect::default(),
        }
    }

    /// Advance the animation by `dt`.
    pub fn frame(&mut self, dt: Duration, state: &AppState) {
        if self.analyser_rx.has_changed().unwrap_or(false) {
            let analyser = self.analyser_rx.borrow_and_update().clone();
            self.visualizer.set_analyser(analyser);
        }
        self.visualizer.set_mode(state.snapshot.visualizer_mode);
        self.visualizer.set_background(state.palette().screen);
        let playing = state.snapshot.playback.is_playing;
        self.visualizer.frame(
            dt.as_secs_f32(),
            self.inner.width,
            self.inner.height,
            playing,
            state.accent(),
        );
    }

    pub fn visualizer(&self) -> &Visualizer {
        &self.visualizer
    }
}

impl Component for VisualizerPanel {
    fn id(&self) -> ComponentId {
        ComponentId::Visualizer
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => vec![Action::TogglePlay],
            KeyCode::Up | KeyCode::Char('k') => vec![Action::CycleVisualizer],
            _ => vec![],
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, _state: &AppState) -> Vec<Action> {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => vec![Action::CycleVisualizer],
            _ => vec![],
        }
    }

    fn on_action(&mut self, _action: &Action, _state: &AppState) -> Vec<Action> {
        vec![]
    }

    fn collapse_summary(&self, state: &AppState) -> Option<String> {
        Some(format!("visualizer: {}", state.snapshot.visualizer_mode))
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let mut badges = Vec::new();
        if let Some(station) = state.current_station() {
            if station.is_offline() {
                badges.push(Badge {
                    text: BADGE_SIGNAL_LOST,
                    color: C_BADGE_ERR,
                });
            }
            if state.snapshot.is_favorite(&station.id) {
                badges.push(Badge {
                    text: BADGE_FAVORITE,
                    color: C_FAVORITE,
                });
            }
        }
        let title = format!("visualizer · {}", state.snapshot.visualizer_mode);
        let palette = state.palette();
        let block = pane_chrome(&title, Some('2'), focused, &badges, &palette);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if inner != self.inner {
            // resize: repaint at the new size right away
            self.inner = inner;
            self.frame(Duration::ZERO, state);
        }
        frame.render_widget(self.visualizer.surface().widget(), inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualizer::FixedJitter;
    use deck_proto::protocol::VisualizerMode;
    use ratatui::{backend::TestBackend, Terminal};

    fn panel() -> (VisualizerPanel, watch::Sender<Option<AnalyserNode>>) {
        let (tx, rx) = watch::channel(None);
        (
            VisualizerPanel::new(rx, Box::new(FixedJitter::new(vec![0.5]))),
            tx,
        )
    }

    #[test]
    fn test_follows_snapshot_mode() {
        let (mut panel, _tx) = panel();
        let mut state = AppState::new();
        state.snapshot.visualizer_mode = VisualizerMode::Orb;
        panel.frame(Duration::from_millis(16), &state);
        assert_eq!(panel.visualizer().mode(), VisualizerMode::Orb);
    }

    #[test]
    fn test_draw_fits_surface_to_inner_area() {
        let (mut panel, _tx) = panel();
        let state = AppState::new();
        let mut terminal = Terminal::new(TestBackend::new(30, 10)).unwrap();
        terminal
            .draw(|f| panel.draw(f, f.area(), false, &state))
            .unwrap();
        let surface = panel.visualizer().surface();
        assert_eq!(surface.width(), 28);
        assert_eq!(surface.height(), 16);
        assert_eq!(terminal.backend().buffer()[(1, 1)].symbol(), "▀");
    }

    #[test]
    fn test_click_cycles_mode() {
        let (mut panel, _tx) = panel();
        let state = AppState::new();
        let click = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 3,
            row: 3,
            modifiers: ratatui::crossterm::event::KeyModifiers::NONE,
        };
        let actions = panel.handle_mouse(click, Rect::new(0, 0, 10, 10), &state);
        assert!(matches!(actions.as_slice(), [Action::CycleVisualizer]));
    }
}
