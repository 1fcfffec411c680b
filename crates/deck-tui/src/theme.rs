//! Color palette, skin palettes and style constants for the deckradio TUI.

use deck_proto::protocol::Skin;
use ratatui::style::{Color, Style};

use crate::visualizer::surface::Rgb;

// ── Color palette ─────────────────────────────────────────────────────────────

pub const C_ACCENT: Color = Color::Rgb(255, 95, 95);
pub const C_PLAYING: Color = Color::Rgb(80, 200, 120);
pub const C_CONNECTING: Color = Color::Rgb(255, 184, 80);
pub const C_ERROR: Color = Color::Rgb(255, 80, 80);
pub const C_MUTED: Color = Color::Rgb(72, 72, 88);
pub const C_SECONDARY: Color = Color::Rgb(115, 115, 138);
pub const C_PRIMARY: Color = Color::Rgb(210, 210, 225);
pub const C_SELECTION_BG: Color = Color::Rgb(28, 28, 40);
pub const C_PANEL_BORDER_FOCUSED: Color = Color::Rgb(120, 100, 200);
pub const C_NUMBER_HINT: Color = Color::Rgb(90, 90, 115);
pub const C_FILTER_BG: Color = Color::Rgb(20, 20, 32);
pub const C_FILTER_FG: Color = Color::Rgb(255, 200, 80);
pub const C_GENRE: Color = Color::Rgb(80, 140, 200);
pub const C_LOCATION: Color = Color::Rgb(100, 160, 130);
pub const C_FAVORITE: Color = Color::Rgb(255, 90, 140);
pub const C_TOAST_INFO: Color = Color::Rgb(80, 160, 220);
pub const C_TOAST_SUCCESS: Color = Color::Rgb(80, 200, 120);
pub const C_TOAST_WARNING: Color = Color::Rgb(255, 184, 80);
pub const C_TOAST_ERROR: Color = Color::Rgb(255, 95, 95);
pub const C_BADGE_ERR: Color = Color::Rgb(255, 95, 95);
pub const C_MODE_NORMAL: Color = Color::Rgb(115, 115, 138);
pub const C_MODE_FILTER: Color = Color::Rgb(255, 200, 80);
pub const C_MODE_INPUT: Color = Color::Rgb(120, 100, 200);
pub const C_OVERLAY_BG: Color = Color::Rgb(18, 18, 26);

// ── Skins ─────────────────────────────────────────────────────────────────────

/// Colors of the device chassis around the screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinPalette {
    pub chassis: Color,
    /// Border of the panes drawn on the chassis.
    pub bezel: Color,
    /// Text printed on the chassis (labels, clock).
    pub label: Color,
    /// Background of the visualizer raster.
    pub screen: Rgb,
}

pub fn skin_palette(skin: Skin) -> SkinPalette {
    match skin {
        Skin::Ipod => SkinPalette {
            chassis: Color::Rgb(0x4a, 0x4a, 0x4a),
            bezel: Color::Rgb(150, 150, 150),
            label: Color::Rgb(230, 230, 230),
            screen: Rgb::new(10, 12, 14),
        },
        Skin::Cyberpunk => SkinPalette {
            chassis: Color::Rgb(0, 0, 0),
            bezel: Color::Rgb(255, 0, 200),
            label: Color::Rgb(0, 255, 240),
            screen: Rgb::new(0, 0, 0),
        },
        Skin::Retro => SkinPalette {
            chassis: Color::Rgb(0x3e, 0x27, 0x23),
            bezel: Color::Rgb(212, 175, 55),
            label: Color::Rgb(255, 220, 150),
            screen: Rgb::new(20, 10, 6),
        },
    }
}

// ── Predefined styles ─────────────────────────────────────────────────────────

pub fn style_focused_border() -> Style {
    Style::default().fg(C_PANEL_BORDER_FOCUSED)
}
