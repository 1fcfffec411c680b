//! AppState: shared read-only data passed to all components during render/event.
//!
//! Components read this for player state, but never mutate it.
//! The App event-loop is the only thing that writes to AppState.

use deck_proto::protocol::{PlaybackStatus, PlayerSnapshot, Station};

use crate::theme::{skin_palette, SkinPalette};
use crate::visualizer::surface::{Rgb, FALLBACK_ACCENT};
use crate::widgets::status_bar::InputMode;

/// Lines kept in the in-memory log strip.
pub const MAX_LOGS: usize = 500;

pub struct AppState {
    // ── Player ──────────────────────────────────────────────────────────────
    pub snapshot: PlayerSnapshot,
    /// False until the first snapshot arrives.
    pub connected: bool,

    // ── UI mode ─────────────────────────────────────────────────────────────
    pub input_mode: InputMode,

    // ── Session ─────────────────────────────────────────────────────────────
    /// WARN/ERROR lines forwarded by the tracing layer, plus UI notices.
    pub logs: Vec<String>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            snapshot: PlayerSnapshot::default(),
            connected: false,
            input_mode: InputMode::Normal,
            logs: Vec::new(),
        }
    }

    pub fn push_log(&mut self, msg: String) {
        self.logs.push(msg);
        if self.logs.len() > MAX_LOGS {
            let excess = self.logs.len() - MAX_LOGS;
            self.logs.drain(..excess);
        }
    }

    pub fn current_station(&self) -> Option<&Station> {
        self.snapshot.current_station.as_ref()
    }

    pub fn is_current(&self, station_id: &str) -> bool {
        self.current_station().is_some_and(|s| s.id == station_id)
    }

    /// Audio is flowing (or about to).
    pub fn is_active(&self) -> bool {
        matches!(
            self.snapshot.status,
            PlaybackStatus::Playing | PlaybackStatus::Loading
        )
    }

    /// Accent of the tuned station, cyan when its colour does not parse.
    pub fn accent(&self) -> Rgb {
        self.current_station()
            .map(|s| Rgb::from_hex_or_fallback(&s.color))
            .unwrap_or(FALLBACK_ACCENT)
    }

    pub fn palette(&self) -> SkinPalette {
        skin_palette(self.snapshot.skin)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
