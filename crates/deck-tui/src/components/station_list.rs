//! StationList component: left pane with the catalog or the favorites.

use std::time::Instant;

use deck_proto::protocol::{Command, Station};
use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    components::header::status_icon,
    theme::{
        C_BADGE_ERR, C_FAVORITE, C_GENRE, C_LOCATION, C_MUTED, C_PRIMARY, C_SECONDARY,
        C_SELECTION_BG,
    },
    widgets::{
        filter_input::{FilterAction, FilterInput},
        pane_chrome::{pane_chrome, Badge},
        scrollable_list::ScrollableList,
    },
};

const DOUBLE_CLICK_MS: u128 = 400;

/// Which stations the list shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListView {
    #[default]
    All,
    /// Favorites only, in favorites order.
    Favorites,
}

pub struct StationList {
    pub list: ScrollableList<Station>,
    pub filter_input: FilterInput,
    view: ListView,
    list_state: ListState,
    /// Row and time of the last click, for double-click detection.
    last_click: Option<(usize, Instant)>,
    /// Follow the tuned station when it changes.
    follow_id: Option<String>,
}

impl StationList {
    pub fn new() -> Self {
        Self {
            list: ScrollableList::new(|station: &Station, q: &str| station_matches(station, q)),
            filter_input: FilterInput::new("name, genre, country…"),
            view: ListView::All,
            list_state: ListState::default(),
            last_click: None,
            follow_id: None,
        }
    }

    pub fn view(&self) -> ListView {
        self.view
    }

    /// Rebuild the rows from a fresh snapshot, keeping the selection on the
    /// same station id.
    pub fn sync_stations(&mut self, state: &AppState) {
        let keep = self.selected_id();
        let snap = &state.snapshot;
        let items: Vec<Station> = match self.view {
            ListView::All => snap.stations.clone(),
            ListView::Favorites => snap
                .favorites
                .iter()
                .filter_map(|id| snap.stations.iter().find(|s| &s.id == id).cloned())
                .collect(),
        };
        self.list.set_items(items);

        let current = state.current_station().map(|s| s.id.clone());
        if current.is_some() && current != self.follow_id {
            self.follow_id = current.clone();
            if let Some(id) = current {
                self.list.select_where(|s| s.id == id);
                return;
            }
        }
        if let Some(id) = keep {
            self.list.select_where(|s| s.id == id);
        }
    }

    pub fn selected_id(&self) -> Option<String> {
        self.list.selected_item().map(|s| s.id.clone())
    }

    pub fn is_filter_active(&self) -> bool {
        self.filter_input.is_active()
    }

    fn toggle_view(&mut self, state: &AppState) -> Vec<Action> {
        self.view = match self.view {
            ListView::All => ListView::Favorites,
            ListView::Favorites => ListView::All,
        };
        self.sync_stations(state);
        let msg = match self.view {
            ListView::All => "showing all stations",
            ListView::Favorites => "showing favorites",
        };
        vec![Action::Notify(msg.to_string())]
    }

    fn render_item(&self, station: &Station, is_selected: bool, state: &AppState) -> ListItem<'static> {
        let snap = &state.snapshot;
        let is_current = state.is_current(&station.id);

        let (icon, icon_color): (&'static str, Color) = if is_current {
            status_icon(snap.status)
        } else {
            (" ", C_MUTED)
        };

        let name_color = if is_current {
            icon_color
        } else if station.is_offline() {
            C_MUTED
        } else if is_selected {
            C_PRIMARY
        } else {
            C_SECONDARY
        };
        let mut name_style = Style::default().fg(name_color);
        if is_current || is_selected {
            name_style = name_style.add_modifier(Modifier::BOLD);
        }
        if station.is_offline() {
            name_style = name_style.add_modifier(Modifier::CROSSED_OUT);
        }

        let heart = if snap.is_favorite(&station.id) { "♥ " } else { "  " };
        let mut spans: Vec<Span> = vec![
            Span::styled(heart, Style::default().fg(C_FAVORITE)),
            Span::styled(icon, Style::default().fg(icon_color)),
            Span::raw("  "),
            Span::styled(station.name.clone(), name_style),
        ];

        if station.is_offline() {
            spans.push(Span::styled("  ⚠", Style::default().fg(C_BADGE_ERR)));
        }
        if !station.genre.is_empty() {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(station.genre.clone(), Style::default().fg(C_GENRE)));
        }
        if !station.country.is_empty() {
            spans.push(Span::styled(" · ", Style::default().fg(C_MUTED)));
            spans.push(Span::styled(
                station.country.clone(),
                Style::default().fg(C_LOCATION),
            ));
        }

        let item_bg = if is_selected {
            Style::default().bg(C_SELECTION_BG)
        } else {
            Style::default()
        };
        ListItem::new(Line::from(spans)).style(item_bg)
    }
}

fn station_matches(station: &Station, q: &str) -> bool {
    if q.trim().is_empty() {
        return true;
    }
    let text = format!("{} {} {}", station.name, station.genre, station.country).to_lowercase();
    q.to_lowercase()
        .split_whitespace()
        .all(|term| text.contains(term))
}

impl Component for StationList {
    fn id(&self) -> ComponentId {
        ComponentId::StationList
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }

        if self.filter_input.is_active() {
            match key.code {
                KeyCode::Up => {
                    self.list.select_up(1);
                    return vec![];
                }
                KeyCode::Down => {
                    self.list.select_down(1);
                    return vec![];
                }
                _ => {}
            }
            return match self.filter_input.handle_key(key) {
                FilterAction::Changed(q) => {
                    self.list.set_filter(&q);
                    vec![]
                }
                FilterAction::Confirmed => vec![Action::CloseFilter],
                FilterAction::Cancelled => {
                    self.list.set_filter("");
                    vec![Action::CloseFilter]
                }
                FilterAction::None => vec![],
            };
        }

        let step = if key.modifiers.contains(KeyModifiers::SHIFT) {
            5
        } else {
            1
        };
        let selected = self.selected_id();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.list.select_up(step),
            KeyCode::Down | KeyCode::Char('j') => self.list.select_down(step),
            KeyCode::PageUp => self.list.select_up(10),
            KeyCode::PageDown => self.list.select_down(10),
            KeyCode::Home | KeyCode::Char('g') => self.list.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.list.select_last(),

            KeyCode::Enter => {
                if let Some(id) = selected {
                    return vec![Action::Play(id)];
                }
            }

            KeyCode::Char('/') => {
                self.filter_input.activate();
                return vec![Action::OpenFilter];
            }

            KeyCode::Char('f') => {
                if let Some(station_id) = selected {
                    return vec![Action::SendCommand(Command::ToggleFavorite { station_id })];
                }
            }
            KeyCode::Char('F') => return self.toggle_view(state),
            KeyCode::Char('[') | KeyCode::Char(']') if self.view == ListView::Favorites => {
                if let Some(station_id) = selected {
                    let offset = if key.code == KeyCode::Char('[') { -1 } else { 1 };
                    return vec![Action::SendCommand(Command::MoveFavorite {
                        station_id,
                        offset,
                    })];
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(station_id) = selected {
                    return vec![Action::SendCommand(Command::DeleteStation { station_id })];
                }
            }

            _ => {}
        }

        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, _state: &AppState) -> Vec<Action> {
        let rel_row = event.row.saturating_sub(area.y + 1) as usize; // +1 for the border
        match event.kind {
            MouseEventKind::ScrollUp => self.list.select_up(1),
            MouseEventKind::ScrollDown => self.list.select_down(1),
            MouseEventKind::Down(MouseButton::Left) => {
                let now = Instant::now();
                let is_double = self.last_click.is_some_and(|(row, t)| {
                    row == rel_row && t.elapsed().as_millis() < DOUBLE_CLICK_MS
                });
                if self.list.handle_click(rel_row) && is_double {
                    self.last_click = None;
                    if let Some(id) = self.selected_id() {
                        return vec![Action::Play(id)];
                    }
                } else {
                    self.last_click = Some((rel_row, now));
                }
            }
            _ => {}
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, state: &AppState) -> Vec<Action> {
        match action {
            Action::CloseFilter => self.filter_input.deactivate(),
            Action::JumpToCurrent => {
                if let Some(current) = state.current_station() {
                    if !self.list.select_where(|s| s.id == current.id) && !self.list.query().is_empty() {
                        // hidden by the filter: drop it and retry
                        self.filter_input.clear();
                        self.list.set_filter("");
                        self.list.select_where(|s| s.id == current.id);
                    }
                }
            }
            _ => {}
        }
        vec![]
    }

    fn collapse_summary(&self, state: &AppState) -> Option<String> {
        self.list
            .selected_item()
            .or(state.current_station())
            .map(|s| s.name.clone())
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let title = match self.view {
            ListView::All => "stations",
            ListView::Favorites => "favorites",
        };
        let count = format!("{}", self.list.len());
        let badges = [Badge {
            text: &count,
            color: C_MUTED,
        }];
        let palette = state.palette();
        let block = pane_chrome(title, Some('1'), focused, &badges, &palette);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let empty_msg = if !state.connected {
            Some("  powering on…")
        } else if self.list.is_empty() && !self.list.query().is_empty() {
            Some("  no stations match filter")
        } else if self.list.is_empty() && self.view == ListView::Favorites {
            Some("  no favorites yet (f on a station)")
        } else if self.list.is_empty() {
            Some("  no stations")
        } else {
            None
        };

        let list_h = if self.filter_input.is_active() {
            inner.height.saturating_sub(1)
        } else {
            inner.height
        } as usize;

        if let Some(msg) = empty_msg {
            frame.render_widget(
                Paragraph::new(Span::styled(msg, Style::default().fg(C_MUTED))),
                inner,
            );
        } else {
            self.list.ensure_visible(list_h);
            let sel_in_view = self.list.selected_in_view(list_h);
            let items: Vec<ListItem> = self
                .list
                .visible_items(list_h)
                .enumerate()
                .map(|(row, station)| self.render_item(station, row == sel_in_view, state))
                .collect();
            self.list_state.select(Some(sel_in_view));
            frame.render_stateful_widget(List::new(items), inner, &mut self.list_state);
        }

        if self.filter_input.is_active() && inner.height > 0 {
            let filter_area = Rect {
                y: inner.y + inner.height - 1,
                height: 1,
                ..inner
            };
            self.filter_input.draw(frame, filter_area);
        }
    }
}
