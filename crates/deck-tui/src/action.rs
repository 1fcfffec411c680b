//! Action enum: all user-initiated intents and internal events.

use deck_proto::protocol::Command;

/// Unique identifier for a focusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    StationList,
    Visualizer,
    LogPanel,
    HelpOverlay,
    Settings,
}

/// Tabs of the settings overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingsTab {
    #[default]
    Eq,
    Skin,
    File,
    Add,
    Link,
}

impl SettingsTab {
    pub const ALL: [SettingsTab; 5] = [
        SettingsTab::Eq,
        SettingsTab::Skin,
        SettingsTab::File,
        SettingsTab::Add,
        SettingsTab::Link,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SettingsTab::Eq => "EQ",
            SettingsTab::Skin => "SKIN",
            SettingsTab::File => "FILE",
            SettingsTab::Add => "ADD",
            SettingsTab::Link => "LINK",
        }
    }

    /// Tabs whose body is a text form.
    pub fn is_text(self) -> bool {
        matches!(self, SettingsTab::File | SettingsTab::Add | SettingsTab::Link)
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Playback ─────────────────────────────────────────────────────────────
    Play(String), // station id
    TogglePlay,
    Next,
    Prev,
    Volume(f32),
    Mute,

    // ── Navigation ───────────────────────────────────────────────────────────
    FocusNext,
    FocusPrev,
    FocusPane(ComponentId),
    JumpToCurrent,

    // ── Filter / text entry ──────────────────────────────────────────────────
    OpenFilter,
    CloseFilter,
    /// A settings text field took the keyboard.
    OpenInput,
    CloseInput,

    // ── Look ─────────────────────────────────────────────────────────────────
    CycleVisualizer,
    CycleSkin,

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleLogs,
    ToggleHelp,
    ToggleKeys,
    ToggleSettings(Option<SettingsTab>),
    Notify(String),
    Warn(String),

    // ── System ───────────────────────────────────────────────────────────────
    SendCommand(Command),
    Quit,
    Resize(u16, u16),
}
