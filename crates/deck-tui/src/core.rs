/// PlayerCore: single-owner event loop for all mutable player state.
///
/// Runs embedded in the TUI process.  Everything that needs to change
/// playback, the catalog or the preferences sends a `PlayerEvent` to this
/// loop.  PlayerCore owns the `PlaybackMachine`, the equalizer and the
/// signal graph exclusively; no other task touches them.
///
/// The machine decides, the core executes: every transition returns a list
/// of effects which are carried out here.  Play requests and caption fetches
/// run as spawned tasks that post their result back as an event tagged with
/// the generation they were issued under.
///
/// After each event the core publishes a fresh `PlayerSnapshot` and
/// broadcasts `BroadcastMessage::StateUpdated`.
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use deck_audio::graph::GraphConfig;
use deck_audio::media::{BlobRegistry, MediaElement, MediaEvent};
use deck_audio::{AnalyserNode, EqualizerBands, PlayRejection, SignalGraphManager};
use deck_proto::catalog::StationCatalog;
use deck_proto::favorites::Favorites;
use deck_proto::prefs::Preferences;
use deck_proto::protocol::{Command, PlayerSnapshot, Station};
use deck_proto::state::StateManager;
use deck_proto::store::KvStore;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::caption::CaptionService;
use crate::machine::{Effect, PlaybackMachine};
use crate::BroadcastMessage;

// ── PlayerEvent ───────────────────────────────────────────────────────────────

/// All inputs into the PlayerCore loop.
#[derive(Debug)]
pub enum PlayerEvent {
    /// A command from the TUI.
    Command(Command),
    /// Event from the media element (forwarded by the pump task).
    Media(MediaEvent),
    /// A spawned `play()` resolved.
    PlaySettled {
        generation: u64,
        result: Result<(), PlayRejection>,
    },
    /// A spawned caption fetch finished.
    Caption { generation: u64, text: String },
    /// Shutdown requested.
    Shutdown,
}

/// Collaborators handed to the core.
pub struct CoreDeps {
    pub media: Arc<dyn MediaElement>,
    pub store: Arc<dyn KvStore>,
    pub captions: Arc<dyn CaptionService>,
    pub blobs: Arc<BlobRegistry>,
    pub state_manager: Arc<StateManager>,
    pub broadcast_tx: broadcast::Sender<BroadcastMessage>,
    /// Loop-back sender for results of spawned tasks.
    pub event_tx: mpsc::Sender<PlayerEvent>,
    /// Where the analyser is published once the graph exists.
    pub analyser_tx: watch::Sender<Option<AnalyserNode>>,
}

/// Startup values not owned by a collaborator.
#[derive(Debug, Clone)]
pub struct CoreSettings {
    pub default_stations: Vec<Station>,
    /// Used when nothing is stored yet.
    pub preferences: Preferences,
    pub graph: GraphConfig,
}

// ── PlayerCore ────────────────────────────────────────────────────────────────

pub struct PlayerCore {
    machine: PlaybackMachine,
    favorites: Favorites,
    prefs: Preferences,
    eq: EqualizerBands,
    graph: SignalGraphManager,
    deps: CoreDeps,
}

impl PlayerCore {
    pub fn new(settings: CoreSettings, deps: CoreDeps) -> Self {
        let store = deps.store.as_ref();
        let catalog = StationCatalog::load(store, settings.default_stations);
        let favorites = Favorites::load(store);
        let prefs = Preferences::load_or(store, settings.preferences);
        info!(
            "PlayerCore: {} stations, {} favorites, skin {:?}",
            catalog.len(),
            favorites.ids().len(),
            prefs.skin
        );

        Self {
            machine: PlaybackMachine::new(catalog, prefs.volume),
            favorites,
            eq: EqualizerBands::new(prefs.eq),
            graph: SignalGraphManager::new(settings.graph),
            prefs,
            deps,
        }
    }

    #[cfg(test)]
    pub fn state_manager(&self) -> Arc<StateManager> {
        Arc::clone(&self.deps.state_manager)
    }

    /// Run the core event loop.  Returns when a `Shutdown` event is received
    /// or the event channel is closed (TUI exited).
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<PlayerEvent>) -> anyhow::Result<()> {
        info!("PlayerCore: starting event loop");
        self.deps
            .media
            .set_volume(self.machine.playback().effective_volume());
        self.publish().await;

        while let Some(evt) = event_rx.recv().await {
            if !self.handle_event(evt).await {
                break;
            }
        }

        info!("PlayerCore: shutting down");
        self.deps.media.pause();
        self.graph.close();
        self.persist_prefs();
        Ok(())
    }

    /// Process one event and publish.  Returns false on shutdown.
    pub async fn handle_event(&mut self, evt: PlayerEvent) -> bool {
        match evt {
            PlayerEvent::Shutdown => {
                info!("PlayerCore: shutdown requested");
                return false;
            }
            PlayerEvent::Command(cmd) => {
                info!("PlayerCore: command {:?}", cmd);
                if let Err(e) = self.handle_command(cmd) {
                    error!("PlayerCore: command error: {:#}", e);
                }
            }
            PlayerEvent::Media(MediaEvent { generation, kind }) => {
                debug!("media event gen {}: {:?}", generation, kind);
                let effects = self.machine.on_media_event(generation, kind);
                self.execute(effects);
            }
            PlayerEvent::PlaySettled { generation, result } => {
                let effects = self.machine.on_play_settled(generation, result);
                self.execute(effects);
            }
            PlayerEvent::Caption { generation, text } => {
                self.machine.on_caption(generation, text);
            }
        }
        self.publish().await;
        true
    }

    fn handle_command(&mut self, cmd: Command) -> anyhow::Result<()> {
        let effects = match cmd {
            Command::Select { station_id } => self.machine.select_station(&station_id),
            Command::TogglePlay => self.machine.toggle_play(),
            Command::Next => self.machine.next(),
            Command::Prev => self.machine.prev(),
            Command::Volume { value } => {
                let effects = self.machine.set_volume(value);
                self.prefs.volume = self.machine.playback().volume;
                self.persist_prefs();
                effects
            }
            Command::ToggleMute => self.machine.toggle_mute(),
            Command::SetBand { band, gain_db } => {
                let applied = self.eq.set_band(band, gain_db);
                debug!("eq {:?} = {:.1} dB", band, applied);
                self.save_eq();
                Vec::new()
            }
            Command::ApplyPreset { name } => {
                if !self.eq.apply_preset(&name) {
                    bail!("unknown equalizer preset '{}'", name);
                }
                self.save_eq();
                Vec::new()
            }
            Command::AddStation {
                name,
                url,
                genre,
                country,
                autoplay,
            } => self
                .machine
                .add_station(&name, &url, &genre, &country, autoplay, now_millis())
                .context("Failed to add station")?,
            Command::AddLocalFile { path } => self.add_local_file(Path::new(&path))?,
            Command::DeleteStation { station_id } => {
                let effects = self.machine.delete_station(&station_id);
                if self.favorites.remove(&station_id) {
                    self.persist_favorites();
                }
                effects
            }
            Command::ResetStations => self.machine.reset_stations(),
            Command::ClearOffline => self.machine.clear_offline(),
            Command::ToggleFavorite { station_id } => {
                let now = self.favorites.toggle(&station_id);
                debug!("favorite {} -> {}", station_id, now);
                self.persist_favorites();
                Vec::new()
            }
            Command::MoveFavorite { station_id, offset } => {
                if self.favorites.move_by(&station_id, offset) {
                    self.persist_favorites();
                }
                Vec::new()
            }
            Command::SetSkin { skin } => {
                self.prefs.skin = skin;
                self.persist_prefs();
                Vec::new()
            }
            Command::SetVisualizerMode { mode } => {
                self.prefs.visualizer_mode = mode;
                self.persist_prefs();
                Vec::new()
            }
        };
        self.execute(effects);
        Ok(())
    }

    fn add_local_file(&mut self, path: &Path) -> anyhow::Result<Vec<Effect>> {
        if !path.is_file() {
            bail!("not a file: {}", path.display());
        }
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Local File".to_string());
        let blob = self.deps.blobs.register(path);
        info!("registered {} as {}", path.display(), blob);
        self.machine
            .add_local_file(&name, &blob, now_millis())
            .context("Failed to add local file")
    }

    // ── Effects ──────────────────────────────────────────────────────────────

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::EnsureGraph => self.ensure_graph(),
                Effect::Load { url, generation } => {
                    debug!("load gen {}: {}", generation, url);
                    self.deps.media.set_source(&url, generation);
                    self.deps.media.load();
                }
                Effect::Play { generation } => self.spawn_play(generation),
                Effect::Pause => {
                    self.deps.media.pause();
                    if let Err(e) = self.graph.suspend() {
                        warn!("could not suspend processing context: {}", e);
                    }
                }
                Effect::ApplyVolume(v) => self.deps.media.set_volume(v),
                Effect::FetchCaption {
                    station,
                    generation,
                } => self.spawn_caption(station, generation),
                Effect::PersistCatalog => {
                    if let Err(e) = self.machine.catalog().persist(self.deps.store.as_ref()) {
                        warn!("could not save stations: {}", e);
                    }
                }
            }
        }
    }

    fn ensure_graph(&mut self) {
        let handles = self.graph.ensure_graph(self.deps.media.as_ref());
        if let Some(nodes) = handles.eq {
            if !self.eq.has_nodes() {
                self.eq.attach_nodes(nodes);
            }
        }
        if handles.analyser.is_some() && self.deps.analyser_tx.borrow().is_none() {
            self.deps.analyser_tx.send_replace(handles.analyser);
        }
    }

    fn spawn_play(&self, generation: u64) {
        let media = Arc::clone(&self.deps.media);
        let tx = self.deps.event_tx.clone();
        tokio::spawn(async move {
            let result = media.play(generation).await;
            let _ = tx.send(PlayerEvent::PlaySettled { generation, result }).await;
        });
    }

    fn spawn_caption(&self, station: Station, generation: u64) {
        let captions = Arc::clone(&self.deps.captions);
        let tx = self.deps.event_tx.clone();
        tokio::spawn(async move {
            let text = captions.caption(&station).await;
            let _ = tx.send(PlayerEvent::Caption { generation, text }).await;
        });
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    fn save_eq(&mut self) {
        self.prefs.eq = self.eq.gains();
        self.persist_prefs();
    }

    fn persist_prefs(&self) {
        if let Err(e) = self.prefs.persist(self.deps.store.as_ref()) {
            warn!("could not save preferences: {}", e);
        }
    }

    fn persist_favorites(&self) {
        if let Err(e) = self.favorites.persist(self.deps.store.as_ref()) {
            warn!("could not save favorites: {}", e);
        }
    }

    // ── Publishing ───────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            rev: 0,
            stations: self.machine.catalog().stations().to_vec(),
            current_station: self.machine.current_station().cloned(),
            status: self.machine.status(),
            playback: self.machine.playback().clone(),
            vibe: self.machine.vibe().to_string(),
            favorites: self.favorites.ids().to_vec(),
            eq: self.eq.gains(),
            active_preset: self.eq.active_preset().map(str::to_string),
            skin: self.prefs.skin,
            visualizer_mode: self.prefs.visualizer_mode,
            graph_available: !self.graph.is_unavailable(),
        }
    }

    async fn publish(&self) {
        self.deps.state_manager.publish(self.snapshot()).await;
        let _ = self.deps.broadcast_tx.send(BroadcastMessage::StateUpdated);
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
