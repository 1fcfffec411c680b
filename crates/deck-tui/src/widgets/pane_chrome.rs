//! PaneChrome: bordered pane with focus styling, skin bezel and badges.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders},
};

use crate::theme::{style_focused_border, SkinPalette, C_NUMBER_HINT, C_PRIMARY};

/// A badge shown in the top-right of the pane header (e.g. "♥ FAVORITE").
#[derive(Debug, Clone, PartialEq)]
pub struct Badge<'a> {
    pub text: &'a str,
    pub color: Color,
}

/// Bordered pane. Unfocused panes take the skin's bezel colour.
pub fn pane_chrome<'a>(
    title: &'a str,
    number_key: Option<char>,
    focused: bool,
    badges: &[Badge<'a>],
    palette: &SkinPalette,
) -> Block<'a> {
    pane_chrome_borders(title, number_key, focused, badges, palette, Borders::ALL)
}

pub fn pane_chrome_borders<'a>(
    title: &'a str,
    number_key: Option<char>,
    focused: bool,
    badges: &[Badge<'a>],
    palette: &SkinPalette,
    borders: Borders,
) -> Block<'a> {
    let border_style = if focused {
        style_focused_border()
    } else {
        Style::default().fg(palette.bezel)
    };

    let title_style = if focused {
        Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.label)
    };

    // "[N] title"
    let mut title_spans = Vec::new();
    if let Some(key) = number_key {
        title_spans.push(Span::styled(
            format!("[{}] ", key),
            Style::default().fg(C_NUMBER_HINT),
        ));
    }
    title_spans.push(Span::styled(title, title_style));

    let mut block = Block::default()
        .borders(borders)
        .border_style(border_style)
        .style(Style::default().bg(palette.chassis))
        .title(Line::from(title_spans));

    if !badges.is_empty() {
        let spans: Vec<Span> = badges
            .iter()
            .map(|b| {
                Span::styled(
                    format!(" {} ", b.text),
                    Style::default().fg(b.color).add_modifier(Modifier::BOLD),
                )
            })
            .collect();
        block = block.title_top(Line::from(spans).right_aligned());
    }
    block
}
