//! Settings overlay: equalizer, skin picker and the station add forms.
//!
//! Captures every key while visible. The text tabs (FILE/ADD/LINK) hand the
//! keyboard to a text field and switch the App into input mode.

use deck_audio::equalizer::{MAX_GAIN_DB, MIN_GAIN_DB, PRESETS};
use deck_proto::protocol::{Band, Command, Skin};
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Frame,
};

use crate::{
    action::{Action, ComponentId, SettingsTab},
    app_state::AppState,
    component::Component,
    components::help_overlay::centered_rect,
    theme::{skin_palette, C_GENRE, C_MUTED, C_OVERLAY_BG, C_PRIMARY, C_SECONDARY, C_SELECTION_BG},
    widgets::filter_input::{FilterAction, FilterInput},
};

const SKINS: [Skin; 3] = [Skin::Ipod, Skin::Cyberpunk, Skin::Retro];
const EQ_STEP_DB: f32 = 1.0;
const GAIN_CELLS: usize = 24;

/// Which field of the ADD form has the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddField {
    Name,
    Url,
}

pub struct Settings {
    pub visible: bool,
    tab: SettingsTab,
    band: usize,
    skin: usize,
    file_input: FilterInput,
    name_input: FilterInput,
    url_input: FilterInput,
    link_input: FilterInput,
    add_field: AddField,
}

impl Settings {
    pub fn new() -> Self {
        Self {
            visible: false,
            tab: SettingsTab::default(),
            band: 0,
            skin: 1,
            file_input: FilterInput::new("/path/to/file.mp3").with_prefix("path"),
            name_input: FilterInput::new("station name").with_prefix("name"),
            url_input: FilterInput::new("https://…").with_prefix(" url"),
            link_input: FilterInput::new("https://…").with_prefix(" url"),
            add_field: AddField::Name,
        }
    }

    pub fn tab(&self) -> SettingsTab {
        self.tab
    }

    fn active_input(&mut self) -> Option<&mut FilterInput> {
        match self.tab {
            SettingsTab::File => Some(&mut self.file_input),
            SettingsTab::Add if self.add_field == AddField::Name => Some(&mut self.name_input),
            SettingsTab::Add => Some(&mut self.url_input),
            SettingsTab::Link => Some(&mut self.link_input),
            _ => None,
        }
    }

    /// Point the keyboard at the current tab's field (if any).
    fn focus_field(&mut self) {
        for input in [
            &mut self.file_input,
            &mut self.name_input,
            &mut self.url_input,
            &mut self.link_input,
        ] {
            input.deactivate();
        }
        if let Some(input) = self.active_input() {
            input.activate();
        }
    }

    /// Switch tabs; reports the input-mode change.
    fn switch_tab(&mut self, tab: SettingsTab) -> Vec<Action> {
        let was_text = self.visible && self.tab.is_text();
        self.tab = tab;
        self.focus_field();
        match (was_text, tab.is_text()) {
            (false, true) => vec![Action::OpenInput],
            (true, false) => vec![Action::CloseInput],
            _ => vec![],
        }
    }

    fn open(&mut self, tab: SettingsTab, state: &AppState) -> Vec<Action> {
        self.skin = SKINS
            .iter()
            .position(|s| *s == state.snapshot.skin)
            .unwrap_or(1);
        let mut actions = self.switch_tab(tab);
        self.visible = true;
        if tab.is_text() && actions.is_empty() {
            actions.push(Action::OpenInput);
        }
        actions
    }

    fn close(&mut self) -> Vec<Action> {
        let was_text = self.tab.is_text();
        self.visible = false;
        self.focus_field();
        if was_text {
            vec![Action::CloseInput]
        } else {
            vec![]
        }
    }

    fn handle_eq_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        let band = Band::ALL[self.band];
        let gain = state.snapshot.eq.get(band);
        let nudge = |delta: f32| {
            vec![Action::SendCommand(Command::SetBand {
                band,
                gain_db: (gain + delta).clamp(MIN_GAIN_DB, MAX_GAIN_DB),
            })]
        };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.band = self.band.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.band = (self.band + 1).min(Band::ALL.len() - 1),
            KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('-') => return nudge(-EQ_STEP_DB),
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('+') | KeyCode::Char('=') => {
                return nudge(EQ_STEP_DB)
            }
            KeyCode::Char(c @ '1'..='4') => {
                let idx = c as usize - '1' as usize;
                return vec![Action::SendCommand(Command::ApplyPreset {
                    name: PRESETS[idx].name.to_string(),
                })];
            }
            KeyCode::Char('r') => {
                return vec![Action::SendCommand(Command::ApplyPreset {
                    name: "flat".to_string(),
                })]
            }
            _ => return station_maintenance(key),
        }
        vec![]
    }

    fn handle_skin_key(&mut self, key: KeyEvent) -> Vec<Action> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.skin = self.skin.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.skin = (self.skin + 1).min(SKINS.len() - 1),
            KeyCode::Enter | KeyCode::Char(' ') => {
                return vec![Action::SendCommand(Command::SetSkin {
                    skin: SKINS[self.skin],
                })]
            }
            _ => return station_maintenance(key),
        }
        vec![]
    }

    fn handle_text_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if self.tab == SettingsTab::Add && matches!(key.code, KeyCode::Up | KeyCode::Down) {
            self.add_field = match self.add_field {
                AddField::Name => AddField::Url,
                AddField::Url => AddField::Name,
            };
            self.focus_field();
            return vec![];
        }
        let Some(input) = self.active_input() else {
            return vec![];
        };
        match input.handle_key(key) {
            FilterAction::Confirmed => {
                let actions = self.submit();
                self.focus_field();
                actions
            }
            FilterAction::Cancelled => self.close(),
            FilterAction::Changed(_) | FilterAction::None => vec![],
        }
    }

    /// Enter on a text field.
    fn submit(&mut self) -> Vec<Action> {
        match self.tab {
            SettingsTab::File => {
                let path = self.file_input.text().trim().to_string();
                if path.is_empty() {
                    return vec![Action::Warn("enter a file path first".into())];
                }
                self.file_input.clear();
                vec![
                    Action::SendCommand(Command::AddLocalFile { path }),
                    Action::Notify("local file added".into()),
                ]
            }
            SettingsTab::Add if self.add_field == AddField::Name => {
                self.add_field = AddField::Url;
                vec![]
            }
            SettingsTab::Add => {
                let name = self.name_input.text().trim().to_string();
                let url = self.url_input.text().trim().to_string();
                if name.is_empty() || url.is_empty() {
                    return vec![Action::Warn("name and url are both required".into())];
                }
                self.name_input.clear();
                self.url_input.clear();
                self.add_field = AddField::Name;
                vec![
                    Action::SendCommand(Command::AddStation {
                        name: name.clone(),
                        url,
                        genre: "Custom".into(),
                        country: "User".into(),
                        autoplay: false,
                    }),
                    Action::Notify(format!("added {name}")),
                ]
            }
            SettingsTab::Link => {
                let url = self.link_input.text().trim().to_string();
                if url.is_empty() {
                    return vec![Action::Warn("paste a stream url first".into())];
                }
                self.link_input.clear();
                vec![
                    Action::SendCommand(Command::AddStation {
                        name: "Web Stream".into(),
                        url,
                        genre: "Stream".into(),
                        country: "Web".into(),
                        autoplay: false,
                    }),
                    Action::Notify("web stream added".into()),
                ]
            }
            _ => vec![],
        }
    }

    fn draw_eq(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        let snap = &state.snapshot;
        let mut lines = Vec::new();
        for (i, band) in Band::ALL.iter().enumerate() {
            let gain = snap.eq.get(*band);
            let span = MAX_GAIN_DB - MIN_GAIN_DB;
            let lit = (((gain - MIN_GAIN_DB) / span) * GAIN_CELLS as f32).round() as usize;
            let lit = lit.min(GAIN_CELLS);
            let selected = i == self.band;
            let label_style = if selected {
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(C_SECONDARY)
            };
            let line = Line::from(vec![
                Span::styled(if selected { " ▸ " } else { "   " }, label_style),
                Span::styled(format!("{:<5}", band.label()), label_style),
                Span::styled("█".repeat(lit), Style::default().fg(state.accent().into())),
                Span::styled("░".repeat(GAIN_CELLS - lit), Style::default().fg(C_MUTED)),
                Span::styled(format!(" {gain:+5.1} dB"), label_style),
            ]);
            lines.push(if selected {
                line.style(Style::default().bg(C_SELECTION_BG))
            } else {
                line
            });
        }
        lines.push(Line::from(""));

        let mut presets = vec![Span::styled(" presets ", Style::default().fg(C_MUTED))];
        for (i, preset) in PRESETS.iter().enumerate() {
            let active = snap.active_preset.as_deref() == Some(preset.name);
            let style = if active {
                Style::default()
                    .fg(C_OVERLAY_BG)
                    .bg(C_GENRE)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(C_SECONDARY)
            };
            presets.push(Span::styled(
                format!(" {} {} ", i + 1, preset.name.to_uppercase()),
                style,
            ));
            presets.push(Span::raw(" "));
        }
        lines.push(Line::from(presets));
        lines.push(Line::from(""));
        lines.push(hint(" ↑↓ band  ←→ ±1 dB  1-4 preset  r reset flat"));
        lines.push(hint(" R reset stations  C clear offline"));
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_skins(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        let mut lines = Vec::new();
        for (i, skin) in SKINS.iter().enumerate() {
            let palette = skin_palette(*skin);
            let current = *skin == state.snapshot.skin;
            let selected = i == self.skin;
            let style = if selected {
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(C_SECONDARY)
            };
            let line = Line::from(vec![
                Span::styled(if selected { " ▸ " } else { "   " }, style),
                Span::styled("  ", Style::default().bg(palette.chassis)),
                Span::styled("  ", Style::default().bg(palette.bezel)),
                Span::raw(" "),
                Span::styled(format!("{:<16}", skin.label()), style),
                Span::styled(if current { "●" } else { " " }, Style::default().fg(palette.label)),
            ]);
            lines.push(if selected {
                line.style(Style::default().bg(C_SELECTION_BG))
            } else {
                line
            });
        }
        lines.push(Line::from(""));
        lines.push(hint(" ↑↓ choose  enter apply"));
        lines.push(hint(" R reset stations  C clear offline"));
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_form(&self, frame: &mut Frame, area: Rect) {
        let (fields, help): (Vec<&FilterInput>, &str) = match self.tab {
            SettingsTab::File => (vec![&self.file_input], " enter add local file  esc close"),
            SettingsTab::Add => (
                vec![&self.name_input, &self.url_input],
                " ↑↓ field  enter next/add  esc close",
            ),
            _ => (vec![&self.link_input], " enter add web stream  esc close"),
        };
        let mut rows = Vec::new();
        for _ in &fields {
            rows.push(Constraint::Length(1));
            rows.push(Constraint::Length(1));
        }
        rows.push(Constraint::Length(1));
        let areas = Layout::vertical(rows).split(area);
        for (i, field) in fields.iter().enumerate() {
            field.draw(frame, areas[i * 2]);
        }
        frame.render_widget(Paragraph::new(hint(help)), areas[fields.len() * 2]);
    }
}

/// Catalog maintenance keys shared by the non-text tabs.
fn station_maintenance(key: KeyEvent) -> Vec<Action> {
    match key.code {
        KeyCode::Char('R') => vec![
            Action::SendCommand(Command::ResetStations),
            Action::Notify("stations reset".into()),
        ],
        KeyCode::Char('C') => vec![
            Action::SendCommand(Command::ClearOffline),
            Action::Notify("offline stations cleared".into()),
        ],
        _ => vec![],
    }
}

fn hint(text: &str) -> Line<'_> {
    Line::from(Span::styled(text, Style::default().fg(C_MUTED)))
}

impl Component for Settings {
    fn id(&self) -> ComponentId {
        ComponentId::Settings
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release || !self.visible {
            return vec![];
        }
        match key.code {
            KeyCode::Tab => return self.switch_tab(self.tab.next()),
            KeyCode::BackTab => return self.switch_tab(self.tab.prev()),
            _ => {}
        }
        if self.tab.is_text() {
            return self.handle_text_key(key);
        }
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('e') => self.close(),
            KeyCode::Char('[') => self.switch_tab(self.tab.prev()),
            KeyCode::Char(']') => self.switch_tab(self.tab.next()),
            _ if self.tab == SettingsTab::Eq => self.handle_eq_key(key, state),
            _ => self.handle_skin_key(key),
        }
    }

    fn on_action(&mut self, action: &Action, state: &AppState) -> Vec<Action> {
        match action {
            Action::ToggleSettings(None) if self.visible => self.close(),
            Action::ToggleSettings(None) => self.open(self.tab, state),
            Action::ToggleSettings(Some(tab)) => self.open(*tab, state),
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, state: &AppState) {
        if !self.visible {
            return;
        }
        let palette = state.palette();
        let popup = centered_rect(60, 12, area);
        frame.render_widget(Clear, popup);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.bezel))
            .style(Style::default().bg(C_OVERLAY_BG))
            .title(Span::styled(
                " settings ",
                Style::default().fg(palette.label).add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let [tabs_area, _, body] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .areas(inner);
        let selected = SettingsTab::ALL
            .iter()
            .position(|t| *t == self.tab)
            .unwrap_or(0);
        frame.render_widget(
            Tabs::new(SettingsTab::ALL.iter().map(|t| t.label()))
                .select(selected)
                .style(Style::default().fg(C_SECONDARY))
                .highlight_style(Style::default().fg(palette.label).add_modifier(Modifier::BOLD)),
            tabs_area,
        );

        match self.tab {
            SettingsTab::Eq => self.draw_eq(frame, body, state),
            SettingsTab::Skin => self.draw_skins(frame, body, state),
            _ => self.draw_form(frame, body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;
    use ratatui::{backend::TestBackend, Terminal};

    fn press(settings: &mut Settings, code: KeyCode, state: &AppState) -> Vec<Action> {
        settings.handle_key(KeyEvent::new(code, KeyModifiers::NONE), state)
    }

    fn type_text(settings: &mut Settings, text: &str, state: &AppState) {
        for c in text.chars() {
            press(settings, KeyCode::Char(c), state);
        }
    }

    #[test]
    fn test_eq_nudge_and_presets() {
        let mut state = AppState::new();
        state.snapshot.eq.mid = 11.5;
        let mut settings = Settings::new();
        settings.on_action(&Action::ToggleSettings(None), &state);
        assert!(settings.visible);

        press(&mut settings, KeyCode::Down, &state);
        let actions = press(&mut settings, KeyCode::Right, &state);
        match actions.as_slice() {
            [Action::SendCommand(Command::SetBand { band, gain_db })] => {
                assert_eq!(*band, Band::Mid);
                assert_eq!(*gain_db, MAX_GAIN_DB);
            }
            other => panic!("unexpected {other:?}"),
        }

        let actions = press(&mut settings, KeyCode::Char('2'), &state);
        assert!(matches!(
            actions.as_slice(),
            [Action::SendCommand(Command::ApplyPreset { name })] if name == "bass"
        ));
    }

    #[test]
    fn test_add_form_requires_both_fields() {
        let state = AppState::new();
        let mut settings = Settings::new();
        let opened = settings.on_action(&Action::ToggleSettings(Some(SettingsTab::Add)), &state);
        assert!(matches!(opened.as_slice(), [Action::OpenInput]));

        type_text(&mut settings, "My Radio", &state);
        assert!(press(&mut settings, KeyCode::Enter, &state).is_empty());
        let actions = press(&mut settings, KeyCode::Enter, &state);
        assert!(matches!(actions.as_slice(), [Action::Warn(_)]));

        type_text(&mut settings, "http://my.radio/stream", &state);
        let actions = press(&mut settings, KeyCode::Enter, &state);
        match actions.first() {
            Some(Action::SendCommand(Command::AddStation {
                name, url, genre, country, autoplay,
            })) => {
                assert_eq!(name, "My Radio");
                assert_eq!(url, "http://my.radio/stream");
                assert_eq!((genre.as_str(), country.as_str()), ("Custom", "User"));
                assert!(!autoplay);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_link_and_file_tabs() {
        let state = AppState::new();
        let mut settings = Settings::new();
        settings.on_action(&Action::ToggleSettings(Some(SettingsTab::Link)), &state);
        type_text(&mut settings, "https://x.y/live", &state);
        let actions = press(&mut settings, KeyCode::Enter, &state);
        assert!(matches!(
            actions.first(),
            Some(Action::SendCommand(Command::AddStation { name, .. })) if name == "Web Stream"
        ));

        // back to FILE; empty submit warns
        let actions = settings.handle_key(KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT), &state);
        assert!(actions.is_empty());
        assert_eq!(settings.tab(), SettingsTab::Add);
        settings.handle_key(KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT), &state);
        assert_eq!(settings.tab(), SettingsTab::File);
        let actions = press(&mut settings, KeyCode::Enter, &state);
        assert!(matches!(actions.as_slice(), [Action::Warn(_)]));

        // Esc on an empty field closes and releases the keyboard
        let actions = press(&mut settings, KeyCode::Esc, &state);
        assert!(matches!(actions.as_slice(), [Action::CloseInput]));
        assert!(!settings.visible);
    }

    #[test]
    fn test_skin_tab_and_maintenance_keys() {
        let state = AppState::new();
        let mut settings = Settings::new();
        let opened = settings.on_action(&Action::ToggleSettings(Some(SettingsTab::Skin)), &state);
        assert!(opened.is_empty());
        press(&mut settings, KeyCode::Up, &state);
        let actions = press(&mut settings, KeyCode::Enter, &state);
        assert!(matches!(
            actions.as_slice(),
            [Action::SendCommand(Command::SetSkin { skin: Skin::Ipod })]
        ));
        let actions = press(&mut settings, KeyCode::Char('C'), &state);
        assert!(matches!(
            actions.first(),
            Some(Action::SendCommand(Command::ClearOffline))
        ));
    }

    #[test]
    fn test_active_preset_is_drawn() {
        let mut state = AppState::new();
        state.snapshot.active_preset = Some("vocal".into());
        let mut settings = Settings::new();
        settings.on_action(&Action::ToggleSettings(None), &state);
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal
            .draw(|f| settings.draw(f, f.area(), true, &state))
            .unwrap();
        let buf = terminal.backend().buffer();
        let text: String = (0..24)
            .flat_map(|y| (0..80).map(move |x| (x, y)))
            .map(|(x, y)| buf[(x, y)].symbol().to_string())
            .collect();
        assert!(text.contains("3 VOCAL"));
        assert!(text.contains("LOW"));
    }
}
