//! PlaybackMachine: pure playback transitions.
//!
//! Every operation mutates the machine and returns the side effects the
//! caller must run, in order.  Nothing here touches the media element, the
//! graph or the store; `PlayerCore` executes the effects and feeds results
//! back in, tagged with the generation they were issued under.  A result
//! whose generation is not the current one is dropped.

use deck_audio::media::MediaEventKind;
use deck_audio::PlayRejection;
use deck_proto::catalog::{CatalogError, StationCatalog};
use deck_proto::protocol::{PlaybackState, PlaybackStatus, Station};
use tracing::{debug, info, warn};

// ── User-facing strings ───────────────────────────────────────────────────────

pub const MSG_STREAM_OFFLINE: &str = "STREAM OFFLINE / ERROR";
pub const MSG_AUTOPLAY_BLOCKED: &str = "AUDIO BLOCKED: PRESS PLAY TO START";
pub const MSG_UNSUPPORTED: &str = "FORMAT NOT SUPPORTED";

pub const VIBE_READY: &str = "SYSTEM: READY";
pub const VIBE_TUNING: &str = "TUNING...";
pub const VIBE_STREAM_LOST: &str = "ERROR: STREAM LOST";

const CUSTOM_GENRE: &str = "Custom";
const CUSTOM_COUNTRY: &str = "User";
const CUSTOM_COLOR: &str = "#ffffff";
const LOCAL_GENRE: &str = "Local File";
const LOCAL_COUNTRY: &str = "My Device";

// ── Effect ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Build the processing graph if needed, or resume its context.
    EnsureGraph,
    /// Point the media element at `url`.
    Load { url: String, generation: u64 },
    /// Request playback; the result comes back as a play settlement.
    Play { generation: u64 },
    Pause,
    ApplyVolume(f32),
    FetchCaption { station: Station, generation: u64 },
    PersistCatalog,
}

/// Why playback stopped with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    StreamUnavailable,
    AutoplayBlocked,
    UnsupportedFormat,
}

impl Failure {
    /// `None` for benign cancellations.
    pub fn from_rejection(rejection: &PlayRejection) -> Option<Self> {
        match rejection {
            PlayRejection::Aborted => None,
            PlayRejection::NotAllowed(_) => Some(Failure::AutoplayBlocked),
            PlayRejection::NotSupported(_) => Some(Failure::UnsupportedFormat),
            PlayRejection::Failed(_) => Some(Failure::StreamUnavailable),
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Failure::StreamUnavailable => MSG_STREAM_OFFLINE,
            Failure::AutoplayBlocked => MSG_AUTOPLAY_BLOCKED,
            Failure::UnsupportedFormat => MSG_UNSUPPORTED,
        }
    }

    /// Policy problems are not the station's fault.
    pub fn marks_offline(self) -> bool {
        !matches!(self, Failure::AutoplayBlocked)
    }
}

// ── PlaybackMachine ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PlaybackMachine {
    catalog: StationCatalog,
    current: Option<String>,
    status: PlaybackStatus,
    playback: PlaybackState,
    generation: u64,
    /// Generation a caption was already requested for.
    captioned: Option<u64>,
    vibe: String,
}

impl PlaybackMachine {
    pub fn new(catalog: StationCatalog, volume: f32) -> Self {
        let current = catalog.first().map(|s| s.id.clone());
        Self {
            catalog,
            current,
            status: PlaybackStatus::Idle,
            playback: PlaybackState {
                volume: clamp_volume(volume),
                ..PlaybackState::default()
            },
            generation: 0,
            captioned: None,
            vibe: VIBE_READY.to_string(),
        }
    }

    pub fn catalog(&self) -> &StationCatalog {
        &self.catalog
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn vibe(&self) -> &str {
        &self.vibe
    }

    pub fn current_station(&self) -> Option<&Station> {
        self.current.as_deref().and_then(|id| self.catalog.get(id))
    }

    fn current_index(&self) -> Option<usize> {
        self.current.as_deref().and_then(|id| self.catalog.index_of(id))
    }

    fn is_active(&self) -> bool {
        matches!(self.status, PlaybackStatus::Playing | PlaybackStatus::Loading)
    }

    fn enter(&mut self, status: PlaybackStatus) {
        self.status = status;
        let pb = &mut self.playback;
        pb.is_loading = status == PlaybackStatus::Loading;
        pb.is_playing = status == PlaybackStatus::Playing;
        if status != PlaybackStatus::Error {
            pb.error = None;
        }
    }

    fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Load the current station's source under a fresh generation and play.
    fn start_current(&mut self) -> Vec<Effect> {
        let Some(url) = self.current_station().map(|s| s.url.clone()) else {
            return Vec::new();
        };
        let generation = self.bump_generation();
        self.enter(PlaybackStatus::Loading);
        self.vibe = VIBE_TUNING.to_string();
        vec![
            Effect::EnsureGraph,
            Effect::Load { url, generation },
            Effect::Play { generation },
        ]
    }

    /// Make `id` current without touching the media element.
    fn park_on(&mut self, id: Option<String>) -> Vec<Effect> {
        self.current = id;
        self.bump_generation();
        let was_paused = self.status == PlaybackStatus::Paused;
        self.enter(PlaybackStatus::Idle);
        self.vibe = VIBE_READY.to_string();
        if was_paused {
            Vec::new()
        } else {
            vec![Effect::Pause]
        }
    }

    // ── Station selection ────────────────────────────────────────────────────

    pub fn select_station(&mut self, id: &str) -> Vec<Effect> {
        if self.catalog.get(id).is_none() {
            warn!("select: unknown station {}", id);
            return Vec::new();
        }
        info!("select station {}", id);
        self.current = Some(id.to_string());
        self.start_current()
    }

    pub fn next(&mut self) -> Vec<Effect> {
        self.step(true)
    }

    pub fn prev(&mut self) -> Vec<Effect> {
        self.step(false)
    }

    fn step(&mut self, forward: bool) -> Vec<Effect> {
        let Some(idx) = self.catalog.scan(self.current_index(), forward) else {
            return Vec::new();
        };
        let id = self.catalog.stations()[idx].id.clone();
        self.select_station(&id)
    }

    pub fn toggle_play(&mut self) -> Vec<Effect> {
        match self.status {
            PlaybackStatus::Playing | PlaybackStatus::Loading => {
                // retires a play request still in flight and queued events
                self.bump_generation();
                self.enter(PlaybackStatus::Paused);
                vec![Effect::Pause]
            }
            // live streams resume at the live edge: reload and caption anew
            PlaybackStatus::Paused => self.start_current(),
            PlaybackStatus::Idle | PlaybackStatus::Error => {
                if self.current_station().is_none() {
                    match self.catalog.first().map(|s| s.id.clone()) {
                        Some(id) => return self.select_station(&id),
                        None => return Vec::new(),
                    }
                }
                self.start_current()
            }
        }
    }

    // ── Media element inputs ─────────────────────────────────────────────────

    pub fn on_media_event(&mut self, generation: u64, kind: MediaEventKind) -> Vec<Effect> {
        if generation != self.generation {
            debug!("stale media event gen {} ({:?})", generation, kind);
            return Vec::new();
        }
        match kind {
            MediaEventKind::Waiting => {
                if self.is_active() {
                    self.enter(PlaybackStatus::Loading);
                }
                Vec::new()
            }
            MediaEventKind::Playing => self.on_audio_flowing(),
            MediaEventKind::Error(msg) => {
                warn!("stream error: {}", msg);
                self.fail(Failure::StreamUnavailable)
            }
            MediaEventKind::Ended => {
                if self.status != PlaybackStatus::Paused {
                    self.enter(PlaybackStatus::Idle);
                }
                Vec::new()
            }
        }
    }

    pub fn on_play_settled(
        &mut self,
        generation: u64,
        result: Result<(), PlayRejection>,
    ) -> Vec<Effect> {
        if generation != self.generation {
            debug!("stale play result gen {}", generation);
            return Vec::new();
        }
        match result {
            Ok(()) => self.on_audio_flowing(),
            Err(rejection) => match Failure::from_rejection(&rejection) {
                None => {
                    debug!("play gen {} cancelled", generation);
                    Vec::new()
                }
                Some(failure) => {
                    warn!("play rejected: {}", rejection);
                    self.fail(failure)
                }
            },
        }
    }

    fn on_audio_flowing(&mut self) -> Vec<Effect> {
        if !self.is_active() {
            return Vec::new();
        }
        self.enter(PlaybackStatus::Playing);
        let mut effects = vec![Effect::EnsureGraph];
        if self.captioned != Some(self.generation) {
            if let Some(station) = self.current_station().cloned() {
                self.captioned = Some(self.generation);
                effects.push(Effect::FetchCaption {
                    station,
                    generation: self.generation,
                });
            }
        }
        effects
    }

    fn fail(&mut self, failure: Failure) -> Vec<Effect> {
        self.enter(PlaybackStatus::Error);
        self.playback.error = Some(failure.message().to_string());
        self.vibe = VIBE_STREAM_LOST.to_string();
        let mut effects = Vec::new();
        if failure.marks_offline() {
            if let Some(id) = self.current.clone() {
                if self.catalog.mark_offline(&id) {
                    info!("station {} marked offline", id);
                    effects.push(Effect::PersistCatalog);
                }
            }
        }
        effects
    }

    pub fn on_caption(&mut self, generation: u64, text: String) {
        if generation == self.generation {
            self.vibe = text;
        } else {
            debug!("stale caption gen {}", generation);
        }
    }

    // ── Volume ───────────────────────────────────────────────────────────────

    pub fn set_volume(&mut self, volume: f32) -> Vec<Effect> {
        self.playback.volume = clamp_volume(volume);
        vec![Effect::ApplyVolume(self.playback.effective_volume())]
    }

    pub fn toggle_mute(&mut self) -> Vec<Effect> {
        self.playback.is_muted = !self.playback.is_muted;
        vec![Effect::ApplyVolume(self.playback.effective_volume())]
    }

    // ── Catalog edits ────────────────────────────────────────────────────────

    /// Append a custom station; with `autoplay` it is selected right away.
    /// Blank genre/country fall back to the custom defaults.
    pub fn add_station(
        &mut self,
        name: &str,
        url: &str,
        genre: &str,
        country: &str,
        autoplay: bool,
        now_millis: i64,
    ) -> Result<Vec<Effect>, CatalogError> {
        let station = Station {
            id: self.catalog.custom_id(now_millis),
            name: name.trim().to_string(),
            url: url.trim().to_string(),
            genre: non_empty_or(genre, CUSTOM_GENRE),
            country: non_empty_or(country, CUSTOM_COUNTRY),
            color: CUSTOM_COLOR.to_string(),
            ..Station::default()
        };
        let id = station.id.clone();
        self.catalog.add(station)?;
        info!("added station {}", id);
        let mut effects = vec![Effect::PersistCatalog];
        if autoplay {
            effects.extend(self.select_station(&id));
        }
        Ok(effects)
    }

    /// Add a station for a local file already registered as `blob_url`
    /// and play it.
    pub fn add_local_file(
        &mut self,
        name: &str,
        blob_url: &str,
        now_millis: i64,
    ) -> Result<Vec<Effect>, CatalogError> {
        let station = Station {
            id: self.catalog.custom_id(now_millis),
            name: name.to_string(),
            url: blob_url.to_string(),
            genre: LOCAL_GENRE.to_string(),
            country: LOCAL_COUNTRY.to_string(),
            color: CUSTOM_COLOR.to_string(),
            ..Station::default()
        };
        let id = station.id.clone();
        self.catalog.add(station)?;
        Ok(self.select_station(&id))
    }

    /// Remove a station.  Deleting the current one moves to its successor
    /// (wrapping), or to the first default station when the catalog empties.
    /// Playback follows only if the deleted station was playing or loading.
    pub fn delete_station(&mut self, id: &str) -> Vec<Effect> {
        let Some((idx, removed)) = self.catalog.remove(id) else {
            return Vec::new();
        };
        info!("deleted station {}", removed.id);
        let mut effects = vec![Effect::PersistCatalog];
        if self.current.as_deref() != Some(id) {
            return effects;
        }

        if self.catalog.is_empty() {
            info!("catalog empty, restoring defaults");
            self.catalog.reset();
        }
        let len = self.catalog.len();
        let successor = if idx < len { idx } else { 0 };
        let next_id = self.catalog.stations().get(successor).map(|s| s.id.clone());

        if self.is_active() {
            self.current = next_id;
            effects.extend(self.start_current());
        } else {
            effects.extend(self.park_on(next_id));
        }
        effects
    }

    /// Back to the default catalog, first station selected, playback stopped.
    pub fn reset_stations(&mut self) -> Vec<Effect> {
        self.catalog.reset();
        let first = self.catalog.first().map(|s| s.id.clone());
        let mut effects = self.park_on(first);
        if !effects.contains(&Effect::Pause) {
            effects.push(Effect::Pause);
        }
        effects.push(Effect::PersistCatalog);
        effects
    }

    /// Drop offline stations.  A removed current station is handled like a
    /// delete: its first surviving successor takes over.
    pub fn clear_offline(&mut self) -> Vec<Effect> {
        let before: Vec<Station> = self.catalog.stations().to_vec();
        let current_idx = self.current_index();
        let removed = self.catalog.clear_offline();
        if removed == 0 {
            return Vec::new();
        }
        info!("cleared {} offline stations", removed);
        let mut effects = vec![Effect::PersistCatalog];

        let current_survived = self
            .current
            .as_deref()
            .is_some_and(|id| self.catalog.get(id).is_some());
        if current_survived {
            return effects;
        }

        let next_id = current_idx
            .and_then(|i| {
                (1..=before.len())
                    .map(|k| &before[(i + k) % before.len()])
                    .find(|s| self.catalog.get(&s.id).is_some())
                    .map(|s| s.id.clone())
            })
            .or_else(|| self.catalog.first().map(|s| s.id.clone()));

        if self.is_active() {
            self.current = next_id;
            effects.extend(self.start_current());
        } else {
            effects.extend(self.park_on(next_id));
        }
        effects
    }
}

fn clamp_volume(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let v = value.trim();
    if v.is_empty() {
        fallback.to_string()
    } else {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_proto::protocol::StationStatus;

    fn station(id: &str) -> Station {
        Station {
            id: id.to_string(),
            name: id.to_uppercase(),
            url: format!("http://radio.test/{id}"),
            ..Station::default()
        }
    }

    fn machine(ids: &[&str]) -> PlaybackMachine {
        let defaults = ids.iter().map(|id| station(id)).collect();
        PlaybackMachine::new(StationCatalog::new(defaults), 0.8)
    }

    fn offline(m: &mut PlaybackMachine, id: &str) {
        m.catalog.mark_offline(id);
    }

    fn current_id(m: &PlaybackMachine) -> &str {
        m.current_station().map(|s| s.id.as_str()).unwrap_or("")
    }

    fn play_gen(effects: &[Effect]) -> u64 {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::Play { generation } => Some(*generation),
                _ => None,
            })
            .expect("no play effect")
    }

    #[test]
    fn test_initial_state() {
        let m = machine(&["a", "b"]);
        assert_eq!(m.status(), PlaybackStatus::Idle);
        assert_eq!(current_id(&m), "a");
        assert_eq!(m.vibe(), VIBE_READY);
        assert_eq!(m.playback().volume, 0.8);
    }

    #[test]
    fn test_select_emits_graph_load_play() {
        let mut m = machine(&["a", "b"]);
        let fx = m.select_station("b");
        assert_eq!(
            fx,
            vec![
                Effect::EnsureGraph,
                Effect::Load {
                    url: "http://radio.test/b".into(),
                    generation: 1
                },
                Effect::Play { generation: 1 },
            ]
        );
        assert_eq!(m.status(), PlaybackStatus::Loading);
        assert!(m.playback().is_loading);
        assert_eq!(m.vibe(), VIBE_TUNING);
        assert!(m.select_station("nope").is_empty());
    }

    #[test]
    fn test_rapid_selection_last_writer_wins() {
        let mut m = machine(&["a", "b", "c"]);
        let g1 = play_gen(&m.select_station("a"));
        let g2 = play_gen(&m.select_station("b"));

        // the first request settles late, in both directions
        assert!(m
            .on_play_settled(g1, Err(PlayRejection::Failed("boom".into())))
            .is_empty());
        assert!(m.on_play_settled(g1, Ok(())).is_empty());
        assert!(m.on_media_event(g1, MediaEventKind::Playing).is_empty());
        assert_eq!(m.status(), PlaybackStatus::Loading);
        assert!(!m.catalog().get("a").unwrap().is_offline());

        m.on_play_settled(g2, Ok(()));
        assert_eq!(m.status(), PlaybackStatus::Playing);
        assert_eq!(current_id(&m), "b");
    }

    #[test]
    fn test_aborted_play_is_benign() {
        let mut m = machine(&["a"]);
        let g = play_gen(&m.select_station("a"));
        assert!(m.on_play_settled(g, Err(PlayRejection::Aborted)).is_empty());
        assert_eq!(m.status(), PlaybackStatus::Loading);
        assert!(m.playback().error.is_none());
    }

    #[test]
    fn test_playing_fetches_caption_once_per_generation() {
        let mut m = machine(&["a"]);
        let g = play_gen(&m.select_station("a"));
        let fx = m.on_play_settled(g, Ok(()));
        assert!(fx.contains(&Effect::EnsureGraph));
        assert!(fx
            .iter()
            .any(|e| matches!(e, Effect::FetchCaption { generation, .. } if *generation == g)));

        m.on_media_event(g, MediaEventKind::Waiting);
        assert_eq!(m.status(), PlaybackStatus::Loading);
        let fx = m.on_media_event(g, MediaEventKind::Playing);
        assert_eq!(fx, vec![Effect::EnsureGraph]);
        assert_eq!(m.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn test_caption_only_for_current_generation() {
        let mut m = machine(&["a", "b"]);
        let g1 = play_gen(&m.select_station("a"));
        m.select_station("b");
        m.on_caption(g1, "OLD".into());
        assert_eq!(m.vibe(), VIBE_TUNING);
        m.on_caption(m.generation(), "NEW VIBE".into());
        assert_eq!(m.vibe(), "NEW VIBE");
    }

    #[test]
    fn test_toggle_play_cycle() {
        let mut m = machine(&["a"]);
        let g = play_gen(&m.toggle_play());
        m.on_media_event(g, MediaEventKind::Playing);

        assert_eq!(m.toggle_play(), vec![Effect::Pause]);
        assert_eq!(m.status(), PlaybackStatus::Paused);
        assert!(!m.playback().is_playing);

        // audio from before the pause must not resume the state
        m.on_media_event(g, MediaEventKind::Playing);
        m.on_media_event(g, MediaEventKind::Error("late".into()));
        assert_eq!(m.status(), PlaybackStatus::Paused);
        assert!(m.playback().error.is_none());

        let fx = m.toggle_play();
        let g2 = play_gen(&fx);
        assert!(g2 > g);
        assert!(fx
            .iter()
            .any(|e| matches!(e, Effect::Load { generation, .. } if *generation == g2)));
        assert_eq!(m.status(), PlaybackStatus::Loading);

        // the resumed stream gets a fresh caption
        let fx = m.on_play_settled(g2, Ok(()));
        assert!(fx
            .iter()
            .any(|e| matches!(e, Effect::FetchCaption { generation, .. } if *generation == g2)));
    }

    #[test]
    fn test_pause_while_loading_retires_pending_play() {
        let mut m = machine(&["a"]);
        let g = play_gen(&m.select_station("a"));
        assert_eq!(m.toggle_play(), vec![Effect::Pause]);
        assert_ne!(m.generation(), g);

        assert!(m.on_play_settled(g, Ok(())).is_empty());
        assert_eq!(m.status(), PlaybackStatus::Paused);
        assert!(m
            .on_play_settled(g, Err(PlayRejection::Failed("404".into())))
            .is_empty());
        assert_eq!(m.status(), PlaybackStatus::Paused);
        assert!(!m.catalog().stations()[0].is_offline());
    }

    #[test]
    fn test_retry_after_error_reloads_under_new_generation() {
        let mut m = machine(&["a"]);
        let g = play_gen(&m.select_station("a"));
        m.on_media_event(g, MediaEventKind::Error("eof".into()));
        assert_eq!(m.status(), PlaybackStatus::Error);

        let fx = m.toggle_play();
        let g2 = play_gen(&fx);
        assert!(g2 > g);
        assert!(fx.iter().any(|e| matches!(e, Effect::Load { .. })));
        assert!(m.playback().error.is_none());
    }

    #[test]
    fn test_next_skips_offline() {
        let mut m = machine(&["a", "b", "c"]);
        offline(&mut m, "b");
        m.select_station("a");
        m.next();
        assert_eq!(current_id(&m), "c");
        m.prev();
        assert_eq!(current_id(&m), "a");
    }

    #[test]
    fn test_next_full_lap_returns_home() {
        let mut m = machine(&["a", "b", "c", "d"]);
        offline(&mut m, "c");
        m.select_station("b");
        // one lap over the three playable stations
        for _ in 0..3 {
            m.next();
        }
        assert_eq!(current_id(&m), "b");
    }

    #[test]
    fn test_all_offline_terminates() {
        let mut m = machine(&["a", "b", "c"]);
        for id in ["a", "b", "c"] {
            offline(&mut m, id);
        }
        m.select_station("a");
        assert!(!m.next().is_empty());
        assert_eq!(current_id(&m), "a");
        assert!(!m.prev().is_empty());
        assert_eq!(current_id(&m), "a");
    }

    #[test]
    fn test_autoplay_block_does_not_mark_offline() {
        let mut m = machine(&["d"]);
        let g = play_gen(&m.select_station("d"));
        let fx = m.on_play_settled(g, Err(PlayRejection::NotAllowed("no device".into())));
        assert!(fx.is_empty());
        assert_eq!(m.status(), PlaybackStatus::Error);
        assert_eq!(m.playback().error.as_deref(), Some(MSG_AUTOPLAY_BLOCKED));
        assert!(!m.playback().is_playing);
        assert_eq!(m.catalog().get("d").unwrap().status, StationStatus::Ok);
    }

    #[test]
    fn test_stream_error_marks_offline_and_next_skips_it() {
        let mut m = machine(&["a", "e", "f"]);
        let g = play_gen(&m.select_station("e"));
        let fx = m.on_play_settled(g, Err(PlayRejection::Failed("404".into())));
        assert_eq!(fx, vec![Effect::PersistCatalog]);
        assert_eq!(m.playback().error.as_deref(), Some(MSG_STREAM_OFFLINE));
        assert_eq!(m.vibe(), VIBE_STREAM_LOST);
        assert!(m.catalog().get("e").unwrap().is_offline());

        m.select_station("a");
        m.next();
        assert_eq!(current_id(&m), "f");
    }

    #[test]
    fn test_unsupported_format_marks_offline() {
        let mut m = machine(&["a"]);
        let g = play_gen(&m.select_station("a"));
        m.on_play_settled(g, Err(PlayRejection::NotSupported("codec".into())));
        assert_eq!(m.playback().error.as_deref(), Some(MSG_UNSUPPORTED));
        assert!(m.catalog().get("a").unwrap().is_offline());
    }

    #[test]
    fn test_error_implies_not_playing() {
        let mut m = machine(&["a"]);
        let g = play_gen(&m.select_station("a"));
        m.on_play_settled(g, Ok(()));
        assert!(m.playback().is_playing);
        m.on_media_event(g, MediaEventKind::Error("reset".into()));
        assert!(m.playback().error.is_some());
        assert!(!m.playback().is_playing);
        assert!(!m.playback().is_loading);
    }

    #[test]
    fn test_ended_goes_idle_without_error() {
        let mut m = machine(&["a"]);
        let g = play_gen(&m.select_station("a"));
        m.on_play_settled(g, Ok(()));
        m.on_media_event(g, MediaEventKind::Ended);
        assert_eq!(m.status(), PlaybackStatus::Idle);
        assert!(m.playback().error.is_none());
    }

    #[test]
    fn test_add_station_with_autoplay() {
        let mut m = machine(&["a"]);
        let fx = m
            .add_station("My FM", " http://my.fm/stream ", "", "", true, 1_700_000_000_000)
            .unwrap();
        assert_eq!(fx[0], Effect::PersistCatalog);
        assert_eq!(play_gen(&fx), 1);
        let added = m.current_station().unwrap();
        assert_eq!(added.id, "custom-1700000000000");
        assert_eq!(added.url, "http://my.fm/stream");
        assert_eq!(added.genre, "Custom");
        assert_eq!(added.country, "User");

        // same millisecond twice still yields a fresh id
        m.add_station("Two", "http://two", "Jazz", "IT", false, 1_700_000_000_000)
            .unwrap();
        assert_eq!(m.catalog().len(), 3);
        assert_eq!(current_id(&m), "custom-1700000000000");
        assert!(m
            .add_station("Empty", "  ", "", "", false, 1)
            .is_err());
    }

    #[test]
    fn test_add_local_file_plays() {
        let mut m = machine(&["a"]);
        let fx = m.add_local_file("song", "blob:deckradio/1", 5).unwrap();
        assert!(fx.contains(&Effect::Load {
            url: "blob:deckradio/1".into(),
            generation: 1
        }));
        let s = m.current_station().unwrap();
        assert_eq!(s.genre, "Local File");
        assert_eq!(s.country, "My Device");
    }

    #[test]
    fn test_delete_playing_station_follows_successor() {
        let mut m = machine(&["a", "b", "c"]);
        let g = play_gen(&m.select_station("b"));
        m.on_play_settled(g, Ok(()));
        let fx = m.delete_station("b");
        assert_eq!(fx[0], Effect::PersistCatalog);
        assert_eq!(current_id(&m), "c");
        assert!(play_gen(&fx) > g);
        assert_eq!(m.status(), PlaybackStatus::Loading);

        // deleting the last one wraps to the first
        m.delete_station("c");
        assert_eq!(current_id(&m), "a");
    }

    #[test]
    fn test_delete_last_station_restores_defaults() {
        let mut m = machine(&["a", "b"]);
        m.select_station("a");
        m.delete_station("b");
        let fx = m.delete_station("a");
        assert_eq!(m.catalog().len(), 2);
        assert_eq!(current_id(&m), "a");
        assert!(fx.iter().any(|e| matches!(e, Effect::Play { .. })));
    }

    #[test]
    fn test_delete_idle_station_does_not_play() {
        let mut m = machine(&["a", "b"]);
        let fx = m.delete_station("a");
        assert_eq!(current_id(&m), "b");
        assert!(!fx.iter().any(|e| matches!(e, Effect::Play { .. })));
        assert_eq!(m.status(), PlaybackStatus::Idle);

        // not current: only the catalog changes
        let mut m = machine(&["a", "b"]);
        assert_eq!(m.delete_station("b"), vec![Effect::PersistCatalog]);
        assert!(m.delete_station("zzz").is_empty());
    }

    #[test]
    fn test_reset_stations_stops_and_selects_first() {
        let mut m = machine(&["a", "b"]);
        m.add_station("X", "http://x", "", "", true, 1).unwrap();
        let fx = m.reset_stations();
        assert!(fx.contains(&Effect::Pause));
        assert!(fx.contains(&Effect::PersistCatalog));
        assert_eq!(m.catalog().len(), 2);
        assert_eq!(current_id(&m), "a");
        assert_eq!(m.status(), PlaybackStatus::Idle);
    }

    #[test]
    fn test_clear_offline_moves_off_removed_current() {
        let mut m = machine(&["a", "b", "c"]);
        let g = play_gen(&m.select_station("b"));
        m.on_play_settled(g, Err(PlayRejection::Failed("x".into())));
        let fx = m.clear_offline();
        assert_eq!(fx[0], Effect::PersistCatalog);
        assert_eq!(m.catalog().len(), 2);
        assert_eq!(current_id(&m), "c");
        assert_eq!(m.status(), PlaybackStatus::Idle);
        assert!(m.clear_offline().is_empty());
    }

    #[test]
    fn test_clear_offline_all_restores_defaults() {
        let mut m = machine(&["a", "b"]);
        offline(&mut m, "a");
        offline(&mut m, "b");
        m.clear_offline();
        assert_eq!(m.catalog().len(), 2);
        assert!(m.catalog().stations().iter().all(|s| !s.is_offline()));
    }

    #[test]
    fn test_volume_and_mute() {
        let mut m = machine(&["a"]);
        assert_eq!(m.set_volume(1.7), vec![Effect::ApplyVolume(1.0)]);
        assert_eq!(m.set_volume(f32::NAN), vec![Effect::ApplyVolume(0.0)]);
        m.set_volume(0.5);
        assert_eq!(m.toggle_mute(), vec![Effect::ApplyVolume(0.0)]);
        assert!(m.playback().is_muted);
        assert_eq!(m.toggle_mute(), vec![Effect::ApplyVolume(0.5)]);
    }
}
