//! App: component-based event loop.
//!
//! Architecture:
//! - `App` owns all components and `AppState` (shared read-only data for components).
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background tasks.
//! - The event loop draws each frame, then awaits the next message.
//! - Components return `Vec<Action>`; App dispatches each Action.
//! - Commands to the player core flow out through `event_tx`.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use deck_audio::AnalyserNode;
use deck_proto::protocol::{Command, PlaybackStatus, PlayerSnapshot};
use deck_proto::state::StateManager;
use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::Style,
    widgets::{Block, Borders},
    Frame, Terminal,
};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use crate::core::PlayerEvent;
use crate::BroadcastMessage;
use crate::{
    action::{Action, ComponentId, SettingsTab},
    app_state::{AppState, MAX_LOGS},
    component::Component,
    components::{
        header::Header, help_overlay::HelpOverlay, log_panel::LogPanel, settings::Settings,
        station_list::StationList, visualizer_panel::VisualizerPanel,
    },
    focus::FocusRing,
    visualizer::{FrameLoop, SeededJitter},
    widgets::{
        status_bar::{self, InputMode},
        toast::ToastManager,
    },
};

const VOLUME_STEP: f32 = 0.05;
const LOG_PANEL_HEIGHT: u16 = 10;
/// Below this width the station list and visualizer stack vertically.
const STACK_BELOW_WIDTH: u16 = 80;

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    StateUpdated(PlayerSnapshot),
    Log(String),
    /// Visualizer frame tick with the time since the previous one.
    Frame(Duration),
}

// ── Pane area tracking ────────────────────────────────────────────────────────

/// Last-drawn rects of the focusable panes, for mouse hit-testing.
#[derive(Default, Clone)]
struct PaneAreas {
    station_list: Rect,
    visualizer: Rect,
    log_panel: Rect,
}

pub struct AppConfig {
    /// The tracing log file; its WARN/ERROR tail seeds the log panel.
    pub log_path: PathBuf,
    /// Visualizer frame rate.
    pub fps: u32,
}

// ── App ───────────────────────────────────────────────────────────────────────

pub struct App {
    config: AppConfig,

    // ── Shared state (passed read-only to components) ─────────────────────────
    state: AppState,
    state_manager: Arc<StateManager>,

    // ── Components ────────────────────────────────────────────────────────────
    header: Header,
    station_list: StationList,
    visualizer: VisualizerPanel,
    log_panel: LogPanel,
    help_overlay: HelpOverlay,
    settings: Settings,
    toast: ToastManager,

    // ── Layout ────────────────────────────────────────────────────────────────
    focus: FocusRing,
    pane_areas: PaneAreas,
    show_log_panel: bool,
    show_keys_bar: bool,

    // ── Outbound ──────────────────────────────────────────────────────────────
    event_tx: mpsc::Sender<PlayerEvent>,
    should_quit: bool,
}

impl App {
    pub fn new(
        config: AppConfig,
        event_tx: mpsc::Sender<PlayerEvent>,
        state_manager: Arc<StateManager>,
        analyser_rx: watch::Receiver<Option<AnalyserNode>>,
    ) -> Self {
        Self {
            config,
            state: AppState::new(),
            state_manager,
            header: Header::new(),
            station_list: StationList::new(),
            visualizer: VisualizerPanel::new(analyser_rx, Box::new(SeededJitter::from_entropy())),
            log_panel: LogPanel::new(),
            help_overlay: HelpOverlay::new(),
            settings: Settings::new(),
            toast: ToastManager::new(),
            focus: FocusRing::new(vec![ComponentId::StationList, ComponentId::Visualizer]),
            pane_areas: PaneAreas::default(),
            show_log_panel: false,
            show_keys_bar: true,
            event_tx,
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self, mut broadcast_rx: broadcast::Receiver<BroadcastMessage>) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("terminal ready, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);

        // The core publishes before the UI subscribes; start from what is there.
        let initial = self.state_manager.get_state().await;
        self.on_state_updated(initial);

        // ── Background task: keyboard/mouse events ────────────────────────────
        let input_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if input_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: broadcast receiver (PlayerCore → AppMessage) ─────
        let bc_tx = tx.clone();
        let bc_state_manager = Arc::clone(&self.state_manager);
        tokio::spawn(async move {
            loop {
                match broadcast_rx.recv().await {
                    Ok(msg) => {
                        let app_msg = match msg {
                            BroadcastMessage::StateUpdated => {
                                AppMessage::StateUpdated(bc_state_manager.get_state().await)
                            }
                            BroadcastMessage::Log(line) => AppMessage::Log(line),
                        };
                        if bc_tx.send(app_msg).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // the next StateUpdated carries the latest snapshot anyway
                        warn!("broadcast receiver lagged by {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        // ── Periodic timers ───────────────────────────────────────────────────
        let _frames = FrameLoop::start(self.config.fps, tx.clone(), AppMessage::Frame);

        // Toast expiry + clock + component maintenance.
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    const MAX_DRAIN: usize = 256;
                    let mut redraw = self.handle_message(msg).await;
                    let mut drained = 0usize;
                    while drained < MAX_DRAIN {
                        let Ok(next) = rx.try_recv() else { break };
                        drained += 1;
                        redraw |= self.handle_message(next).await;
                    }
                    needs_redraw = redraw;
                }

                _ = ui_tick.tick() => {
                    let tick_actions: Vec<Action> = {
                        let s = &self.state;
                        let mut all = Vec::new();
                        all.extend(self.station_list.tick(s));
                        all.extend(self.visualizer.tick(s));
                        all.extend(self.log_panel.tick(s));
                        all
                    };
                    for action in tick_actions {
                        self.dispatch(action).await;
                    }
                    self.toast.tick();
                    needs_redraw = true;
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
        Ok(())
    }

    // ── Message handler ───────────────────────────────────────────────────────

    /// Returns true when the screen needs a redraw.
    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(ev) => match ev {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        return false;
                    }
                    let actions = self.handle_key(key);
                    for a in actions {
                        self.dispatch(a).await;
                    }
                    self.sync_input_mode();
                }
                Event::Mouse(mouse) => {
                    let actions = self.handle_mouse(mouse);
                    for a in actions {
                        self.dispatch(a).await;
                    }
                }
                Event::Resize(w, h) => self.dispatch(Action::Resize(w, h)).await,
                _ => return false,
            },
            AppMessage::StateUpdated(snapshot) => self.on_state_updated(snapshot),
            AppMessage::Log(line) => self.state.push_log(line),
            AppMessage::Frame(dt) => self.visualizer.frame(dt, &self.state),
        }
        true
    }

    // ── Player state update ───────────────────────────────────────────────────

    fn on_state_updated(&mut self, snapshot: PlayerSnapshot) {
        if self.state.connected && snapshot.rev < self.state.snapshot.rev {
            debug!("dropping stale snapshot rev {}", snapshot.rev);
            return;
        }
        let prev = std::mem::replace(&mut self.state.snapshot, snapshot);
        let first = !self.state.connected;
        self.state.connected = true;

        let snap = &self.state.snapshot;
        if !first {
            // ── Transition toasts ─────────────────────────────────────────────
            if snap.status == PlaybackStatus::Error && prev.status != PlaybackStatus::Error {
                let msg = snap.playback.error.as_deref().unwrap_or("playback error");
                self.toast.error(msg);
            }
            if prev.graph_available && !snap.graph_available {
                self.toast.warning("audio graph unavailable, visualizer is simulated");
            }
            let prev_id = prev.current_station.as_ref().map(|s| s.id.as_str());
            if let Some(station) = snap.current_station.as_ref() {
                if prev_id != Some(station.id.as_str()) {
                    info!("tuned to {}", station.name);
                    self.toast.info(format!("tuning {}", station.name));
                }
            }
        }

        self.station_list.sync_stations(&self.state);
    }

    // ── Key handling ──────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        let mode = self.state.input_mode;

        // Global keys: always active regardless of focus/mode
        match key.code {
            KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => {
                return vec![Action::Quit];
            }
            KeyCode::Char('q') if key.modifiers == KeyModifiers::NONE && mode == InputMode::Normal => {
                if !self.settings.visible && !self.help_overlay.visible {
                    return vec![Action::Quit];
                }
            }
            KeyCode::Char('?') if mode == InputMode::Normal && !self.settings.visible => {
                return vec![Action::ToggleHelp];
            }
            KeyCode::Char('L') if mode == InputMode::Normal && !self.settings.visible => {
                return vec![Action::ToggleLogs];
            }
            _ => {}
        }

        // Overlays capture all keys when visible
        if self.help_overlay.visible {
            return self.help_overlay.handle_key(key, &self.state);
        }
        if self.settings.visible {
            return self.settings.handle_key(key, &self.state);
        }

        // Tab / Shift-Tab always cycle focus (closing the filter first)
        match key.code {
            KeyCode::Tab => {
                if mode == InputMode::Filter {
                    return vec![Action::CloseFilter, Action::FocusNext];
                }
                return vec![Action::FocusNext];
            }
            KeyCode::BackTab => {
                if mode == InputMode::Filter {
                    return vec![Action::CloseFilter, Action::FocusPrev];
                }
                return vec![Action::FocusPrev];
            }
            _ => {}
        }

        // Global playback keys (Normal mode only)
        if mode == InputMode::Normal {
            let volume = self.state.snapshot.playback.volume;
            match key.code {
                KeyCode::Char(' ') => {
                    // nothing tuned yet: space tunes the selected row
                    if self.state.current_station().is_none() {
                        if let Some(id) = self.station_list.selected_id() {
                            return vec![Action::Play(id)];
                        }
                    }
                    return vec![Action::TogglePlay];
                }
                KeyCode::Char('n') => return vec![Action::Next],
                KeyCode::Char('p') => return vec![Action::Prev],
                KeyCode::Char('m') => return vec![Action::Mute],
                KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') => {
                    return vec![Action::Volume((volume + VOLUME_STEP).min(1.0))];
                }
                KeyCode::Left | KeyCode::Char('-') => {
                    return vec![Action::Volume((volume - VOLUME_STEP).max(0.0))];
                }
                KeyCode::Char('v') => return vec![Action::CycleVisualizer],
                KeyCode::Char('s') => return vec![Action::CycleSkin],
                KeyCode::Char('e') => return vec![Action::ToggleSettings(None)],
                KeyCode::Char('a') => return vec![Action::ToggleSettings(Some(SettingsTab::Add))],
                KeyCode::Char('K') => return vec![Action::ToggleKeys],
                KeyCode::Char('J') => return vec![Action::JumpToCurrent],
                KeyCode::Char(c @ '1'..='3') => {
                    self.focus.set_by_position(c as usize - '1' as usize);
                    return vec![];
                }
                _ => {}
            }
        }

        // Dispatch to the focused component
        let s = &self.state;
        match self.focus.current() {
            Some(ComponentId::StationList) => self.station_list.handle_key(key, s),
            Some(ComponentId::Visualizer) => self.visualizer.handle_key(key, s),
            Some(ComponentId::LogPanel) => self.log_panel.handle_key(key, s),
            _ => vec![],
        }
    }

    // ── Mouse handling ────────────────────────────────────────────────────────

    fn handle_mouse(&mut self, event: MouseEvent) -> Vec<Action> {
        let is_click = matches!(
            event.kind,
            MouseEventKind::Down(_) | MouseEventKind::ScrollUp | MouseEventKind::ScrollDown
        );
        if !is_click || self.help_overlay.visible || self.settings.visible {
            return vec![];
        }

        let (col, row) = (event.column, event.row);
        fn hit(r: Rect, col: u16, row: u16) -> bool {
            r.width > 0
                && r.height > 0
                && col >= r.x
                && col < r.x + r.width
                && row >= r.y
                && row < r.y + r.height
        }

        let areas = self.pane_areas.clone();
        let s = &self.state;

        // Dispatch to the clicked pane; focus follows the click.
        macro_rules! click_pane {
            ($id:expr, $component:expr, $area:expr) => {{
                let mut actions = $component.handle_mouse(event, $area, s);
                if self.focus.current() != Some($id) {
                    actions.insert(0, Action::FocusPane($id));
                }
                return actions;
            }};
        }

        if hit(areas.station_list, col, row) {
            click_pane!(ComponentId::StationList, self.station_list, areas.station_list);
        }
        if hit(areas.visualizer, col, row) {
            click_pane!(ComponentId::Visualizer, self.visualizer, areas.visualizer);
        }
        if hit(areas.log_panel, col, row) {
            click_pane!(ComponentId::LogPanel, self.log_panel, areas.log_panel);
        }
        vec![]
    }

    // ── Action dispatcher ─────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        // Broadcast to all components first
        let secondary: Vec<Action> = {
            let s = &self.state;
            let mut out = Vec::new();
            out.extend(self.station_list.on_action(&action, s));
            out.extend(self.visualizer.on_action(&action, s));
            out.extend(self.log_panel.on_action(&action, s));
            out.extend(self.help_overlay.on_action(&action, s));
            out.extend(self.settings.on_action(&action, s));
            out
        };

        self.apply_action(action).await;

        // Secondary actions are applied at the app level only (one level deep)
        for a in secondary {
            self.apply_action(a).await;
        }
    }

    async fn apply_action(&mut self, action: Action) {
        if !matches!(action, Action::Resize(..)) {
            debug!("apply_action: {:?}", action);
        }
        match action {
            // ── Playback ──────────────────────────────────────────────────────
            Action::Play(station_id) => self.send_cmd(Command::Select { station_id }).await,
            Action::TogglePlay => self.send_cmd(Command::TogglePlay).await,
            Action::Next => self.send_cmd(Command::Next).await,
            Action::Prev => self.send_cmd(Command::Prev).await,
            Action::Volume(value) => self.send_cmd(Command::Volume { value }).await,
            Action::Mute => self.send_cmd(Command::ToggleMute).await,

            // ── Navigation ────────────────────────────────────────────────────
            Action::FocusNext => {
                self.focus.next();
            }
            Action::FocusPrev => {
                self.focus.prev();
            }
            Action::FocusPane(id) => self.focus.set(id),
            Action::JumpToCurrent => self.focus.set(ComponentId::StationList),

            // ── Filter / text entry ───────────────────────────────────────────
            Action::OpenFilter | Action::CloseFilter | Action::OpenInput | Action::CloseInput => {
                self.sync_input_mode()
            }

            // ── Look ──────────────────────────────────────────────────────────
            Action::CycleVisualizer => {
                let mode = self.state.snapshot.visualizer_mode.next();
                self.send_cmd(Command::SetVisualizerMode { mode }).await;
            }
            Action::CycleSkin => {
                let skin = self.state.snapshot.skin.next();
                self.toast.info(format!("skin: {}", skin.label()));
                self.send_cmd(Command::SetSkin { skin }).await;
            }

            // ── UI toggles ────────────────────────────────────────────────────
            Action::ToggleLogs => {
                self.show_log_panel = !self.show_log_panel;
                self.focus.set_present(ComponentId::LogPanel, self.show_log_panel);
                if self.show_log_panel {
                    self.reload_log_tail();
                    self.focus.set(ComponentId::LogPanel);
                } else {
                    self.focus.set(ComponentId::StationList);
                }
            }
            Action::ToggleKeys => self.show_keys_bar = !self.show_keys_bar,
            Action::ToggleHelp | Action::ToggleSettings(_) => self.sync_input_mode(),
            Action::Notify(msg) => self.toast.success(msg),
            Action::Warn(msg) => self.toast.warning(msg),

            // ── System ────────────────────────────────────────────────────────
            Action::SendCommand(cmd) => self.send_cmd(cmd).await,
            Action::Quit => self.should_quit = true,
            Action::Resize(_, _) => {}
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let palette = self.state.palette();

        // unstyled gaps take the chassis colour
        frame.render_widget(Block::default().style(Style::default().bg(palette.chassis)), area);

        // ── Outer layout: header | body | (log) | status | (keys) ─────────────
        let log_h = if self.show_log_panel { LOG_PANEL_HEIGHT } else { 0 };
        let keys_h = if self.show_keys_bar { 1 } else { 0 };
        let [header_area, body_area, log_area, status_area, keys_area] = Layout::vertical([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(log_h),
            Constraint::Length(1),
            Constraint::Length(keys_h),
        ])
        .areas(area);

        self.header.draw(frame, header_area, &self.state);

        // ── Body: station list | visualizer ───────────────────────────────────
        let [list_area, viz_area] = if body_area.width < STACK_BELOW_WIDTH {
            Layout::vertical([Constraint::Percentage(55), Constraint::Percentage(45)])
                .areas(body_area)
        } else {
            Layout::horizontal([Constraint::Percentage(42), Constraint::Percentage(58)])
                .areas(body_area)
        };
        let list_focused = self.focus.is_focused(ComponentId::StationList);
        self.station_list.draw(frame, list_area, list_focused, &self.state);
        let viz_focused = self.focus.is_focused(ComponentId::Visualizer);
        self.visualizer.draw(frame, viz_area, viz_focused, &self.state);
        self.pane_areas.station_list = list_area;
        self.pane_areas.visualizer = viz_area;

        // ── Log panel ─────────────────────────────────────────────────────────
        if self.show_log_panel {
            let log_focused = self.focus.is_focused(ComponentId::LogPanel);
            self.log_panel.borders = Borders::LEFT | Borders::BOTTOM | Borders::RIGHT;
            self.log_panel.draw(frame, log_area, log_focused, &self.state);
            self.pane_areas.log_panel = log_area;
        } else {
            self.pane_areas.log_panel = Rect::default();
        }

        // ── Status + keys bars ────────────────────────────────────────────────
        let clock = chrono::Local::now().format("%H:%M:%S").to_string();
        status_bar::draw_status_bar(frame, status_area, &self.state, &clock);
        if self.show_keys_bar {
            status_bar::draw_keys_bar(frame, keys_area, self.state.input_mode);
        }

        // ── Overlays (on top of everything) ──────────────────────────────────
        self.settings.draw(frame, area, true, &self.state);
        self.help_overlay.draw(frame, area, false, &self.state);

        // ── Toast notifications (topmost layer) ──────────────────────────────
        self.toast.draw(frame, area);
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    async fn send_cmd(&self, cmd: Command) {
        if self.event_tx.send(PlayerEvent::Command(cmd)).await.is_err() {
            warn!("player core is gone, command dropped");
        }
    }

    fn sync_input_mode(&mut self) {
        self.state.input_mode = if self.settings.visible && self.settings.tab().is_text() {
            InputMode::Input
        } else if self.station_list.is_filter_active()
            && self.focus.is_focused(ComponentId::StationList)
        {
            InputMode::Filter
        } else {
            InputMode::Normal
        };
        if self.state.input_mode != InputMode::Filter && self.station_list.is_filter_active() {
            // focus moved away mid-filter
            self.station_list.filter_input.deactivate();
        }
    }

    fn reload_log_tail(&mut self) {
        match load_log_tail(&self.config.log_path, MAX_LOGS) {
            Ok(lines) => {
                self.state.logs.clear();
                for line in lines {
                    self.state.push_log(line);
                }
            }
            Err(e) => debug!("log tail unavailable: {}", e),
        }
    }
}

// ── Log file tail ─────────────────────────────────────────────────────────────

/// The last `max` WARN/ERROR lines of the tracing log, in the same
/// `HH:MM:SS [LEVEL] message` shape the broadcast layer produces.
fn load_log_tail(path: &Path, max: usize) -> io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    let mut lines: Vec<String> = content.lines().filter_map(compact_log_line).collect();
    if lines.len() > max {
        lines.drain(..lines.len() - max);
    }
    Ok(lines)
}

/// `2026-01-02T03:04:05.123456Z  WARN deckradio::core: msg` becomes
/// `03:04:05 [WARN] msg` (local time). Other levels are dropped.
fn compact_log_line(raw: &str) -> Option<String> {
    let mut parts = raw.split_whitespace();
    let ts = parts.next()?;
    let level = parts.next()?;
    if !matches!(level, "WARN" | "ERROR") {
        return None;
    }
    let rest = raw.split_once(level)?.1.trim_start();
    // drop the target prefix
    let message = match rest.split_once(": ") {
        Some((target, msg)) if !target.contains(' ') => msg,
        _ => rest,
    };
    let time = chrono::DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|_| ts.to_string());
    Some(format!("{time} [{level}] {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_proto::protocol::{Skin, Station};

    fn app() -> (App, mpsc::Receiver<PlayerEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let (_analyser_tx, analyser_rx) = watch::channel(None);
        let app = App::new(
            AppConfig {
                log_path: PathBuf::from("/nonexistent/deckradio.log"),
                fps: 30,
            },
            tx,
            Arc::new(StateManager::default()),
            analyser_rx,
        );
        (app, rx)
    }

    fn snapshot(rev: u64) -> PlayerSnapshot {
        PlayerSnapshot {
            rev,
            stations: vec![
                Station {
                    id: "a".into(),
                    name: "Alpha".into(),
                    ..Station::default()
                },
                Station {
                    id: "b".into(),
                    name: "Beta".into(),
                    ..Station::default()
                },
            ],
            ..PlayerSnapshot::default()
        }
    }

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    async fn press(app: &mut App, key: KeyEvent) {
        app.handle_message(AppMessage::Event(Event::Key(key))).await;
    }

    fn next_command(rx: &mut mpsc::Receiver<PlayerEvent>) -> Option<Command> {
        match rx.try_recv() {
            Ok(PlayerEvent::Command(cmd)) => Some(cmd),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_space_tunes_selection_when_idle() {
        let (mut app, mut rx) = app();
        app.on_state_updated(snapshot(1));
        press(&mut app, key('j')).await;
        press(&mut app, key(' ')).await;
        assert!(matches!(
            next_command(&mut rx),
            Some(Command::Select { station_id }) if station_id == "b"
        ));
    }

    #[tokio::test]
    async fn test_volume_and_look_keys() {
        let (mut app, mut rx) = app();
        let mut snap = snapshot(1);
        snap.playback.volume = 0.98;
        snap.skin = Skin::Retro;
        app.on_state_updated(snap);

        press(&mut app, KeyEvent::new(KeyCode::Right, KeyModifiers::NONE)).await;
        assert!(matches!(next_command(&mut rx), Some(Command::Volume { value }) if value == 1.0));

        press(&mut app, key('s')).await;
        assert!(matches!(
            next_command(&mut rx),
            Some(Command::SetSkin { skin: Skin::Ipod })
        ));

        press(&mut app, key('v')).await;
        assert!(matches!(
            next_command(&mut rx),
            Some(Command::SetVisualizerMode { .. })
        ));
    }

    #[tokio::test]
    async fn test_filter_mode_swallows_global_keys() {
        let (mut app, mut rx) = app();
        app.on_state_updated(snapshot(1));
        press(&mut app, key('/')).await;
        assert_eq!(app.state.input_mode, InputMode::Filter);
        press(&mut app, key('n')).await;
        assert!(next_command(&mut rx).is_none());
        assert!(!app.should_quit);
        press(&mut app, key('q')).await;
        assert!(!app.should_quit);
        press(&mut app, KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE)).await;
        assert_eq!(app.state.input_mode, InputMode::Normal);
        assert!(app.focus.is_focused(ComponentId::Visualizer));
    }

    #[tokio::test]
    async fn test_settings_text_tab_enters_input_mode() {
        let (mut app, mut rx) = app();
        app.on_state_updated(snapshot(1));
        press(&mut app, key('a')).await;
        assert!(app.settings.visible);
        assert_eq!(app.state.input_mode, InputMode::Input);
        // 'q' is text now, not quit
        press(&mut app, key('q')).await;
        assert!(!app.should_quit);
        press(&mut app, KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)).await;
        press(&mut app, KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)).await;
        assert!(!app.settings.visible);
        assert_eq!(app.state.input_mode, InputMode::Normal);
        assert!(next_command(&mut rx).is_none());
    }

    #[tokio::test]
    async fn test_stale_snapshot_is_ignored() {
        let (mut app, _rx) = app();
        app.on_state_updated(snapshot(5));
        let mut old = snapshot(3);
        old.stations.clear();
        app.on_state_updated(old);
        assert_eq!(app.state.snapshot.rev, 5);
        assert_eq!(app.station_list.list.len(), 2);
    }

    #[tokio::test]
    async fn test_error_transition_raises_toast() {
        let (mut app, _rx) = app();
        app.on_state_updated(snapshot(1));
        let mut failed = snapshot(2);
        failed.status = PlaybackStatus::Error;
        failed.playback.error = Some("STREAM OFFLINE / ERROR".into());
        app.on_state_updated(failed);
        assert_eq!(app.toast.len(), 1);
    }

    #[test]
    fn test_compact_log_line() {
        let line = "2026-01-02T03:04:05.123456Z  WARN deckradio::core: stream stalled";
        let out = compact_log_line(line).unwrap();
        assert!(out.ends_with("[WARN] stream stalled"));
        assert!(compact_log_line("2026-01-02T03:04:05Z  INFO deckradio: hi").is_none());
        assert!(compact_log_line("garbage").is_none());
    }

    #[test]
    fn test_log_tail_keeps_last_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deckradio.log");
        let body: String = (0..10)
            .map(|i| format!("2026-01-02T03:04:05Z ERROR deckradio::core: e{i}\n"))
            .collect();
        std::fs::write(&path, body).unwrap();
        let lines = load_log_tail(&path, 3).unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("e7"));
    }
}
