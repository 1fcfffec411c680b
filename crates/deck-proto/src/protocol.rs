use serde::{Deserialize, Serialize};
use std::fmt;

/// Commands sent from the UI to the player core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum Command {
    Select { station_id: String },
    TogglePlay,
    Next,
    Prev,
    Volume { value: f32 },
    ToggleMute,
    SetBand { band: Band, gain_db: f32 },
    ApplyPreset { name: String },
    AddStation {
        name: String,
        url: String,
        genre: String,
        country: String,
        autoplay: bool,
    },
    AddLocalFile { path: String },
    DeleteStation { station_id: String },
    ResetStations,
    ClearOffline,
    ToggleFavorite { station_id: String },
    MoveFavorite { station_id: String, offset: isize },
    SetSkin { skin: Skin },
    SetVisualizerMode { mode: VisualizerMode },
}

/// Playback status as derived by the state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Idle, // nothing requested yet, or stopped by a reset
    Loading, // source set / buffering, waiting for audio
    Playing, // audio flowing
    Paused,  // explicitly paused by the user
    Error,   // play request rejected or stream failed
}

/// The single mutable playback record of a session.
///
/// After any settled transition `error.is_some()` implies `!is_playing`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub is_loading: bool,
    pub is_muted: bool,
    /// 0.0 ..= 1.0
    pub volume: f32,
    pub error: Option<String>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            is_loading: false,
            is_muted: false,
            volume: 0.8,
            error: None,
        }
    }
}

impl PlaybackState {
    /// Volume actually sent to the output, honouring mute.
    pub fn effective_volume(&self) -> f32 {
        if self.is_muted {
            0.0
        } else {
            self.volume.clamp(0.0, 1.0)
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StationStatus {
    #[default]
    Ok,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Station {
    /// Unique, stable identifier.
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub country: String,
    /// Accent colour, `#rrggbb` or `#rgb`.
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub logo: String,
    /// Only mutated by stream-error detection.
    #[serde(default)]
    pub status: StationStatus,
}

impl Station {
    pub fn is_offline(&self) -> bool {
        self.status == StationStatus::Offline
    }
}

/// Equalizer band.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Bass,
    Mid,
    Treble,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::Bass, Band::Mid, Band::Treble];

    pub fn index(self) -> usize {
        match self {
            Band::Bass => 0,
            Band::Mid => 1,
            Band::Treble => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Band::Bass => "LOW",
            Band::Mid => "MID",
            Band::Treble => "HIGH",
        }
    }
}

/// Gains in dB, one per band.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct EqGains {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

impl EqGains {
    pub fn get(&self, band: Band) -> f32 {
        match band {
            Band::Bass => self.bass,
            Band::Mid => self.mid,
            Band::Treble => self.treble,
        }
    }

    pub fn set(&mut self, band: Band, gain_db: f32) {
        match band {
            Band::Bass => self.bass = gain_db,
            Band::Mid => self.mid = gain_db,
            Band::Treble => self.treble = gain_db,
        }
    }

    pub fn as_array(&self) -> [f32; 3] {
        [self.bass, self.mid, self.treble]
    }
}

/// Device chassis skin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Skin {
    Ipod,
    #[default]
    Cyberpunk,
    Retro,
}

impl Skin {
    pub fn next(self) -> Self {
        match self {
            Skin::Ipod => Skin::Cyberpunk,
            Skin::Cyberpunk => Skin::Retro,
            Skin::Retro => Skin::Ipod,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Skin::Ipod => "iPod Classic",
            Skin::Cyberpunk => "Cyberpunk Neon",
            Skin::Retro => "Retro Gold",
        }
    }
}

/// Visualizer display mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VisualizerMode {
    Bars,
    /// Layered "liquid" silhouette.
    #[default]
    Wave,
    /// Time-domain line trace.
    Scope,
    Orb,
    Particles,
}

impl VisualizerMode {
    pub const ALL: [VisualizerMode; 5] = [
        VisualizerMode::Bars,
        VisualizerMode::Wave,
        VisualizerMode::Scope,
        VisualizerMode::Orb,
        VisualizerMode::Particles,
    ];

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for VisualizerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VisualizerMode::Bars => "bars",
            VisualizerMode::Wave => "wave",
            VisualizerMode::Scope => "scope",
            VisualizerMode::Orb => "orb",
            VisualizerMode::Particles => "particles",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for VisualizerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown visualizer mode '{s}'"))
    }
}

/// Everything the UI needs to render, published by the core after each
/// mutating event.  `rev` increases on every publish.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlayerSnapshot {
    #[serde(default)]
    pub rev: u64,
    pub stations: Vec<Station>,
    pub current_station: Option<Station>,
    pub status: PlaybackStatus,
    pub playback: PlaybackState,
    /// Decorative caption in the status bar.
    pub vibe: String,
    pub favorites: Vec<String>,
    pub eq: EqGains,
    pub active_preset: Option<String>,
    pub skin: Skin,
    pub visualizer_mode: VisualizerMode,
    /// False when the processing graph could not be built.
    #[serde(default)]
    pub graph_available: bool,
}

impl PlayerSnapshot {
    pub fn is_favorite(&self, station_id: &str) -> bool {
        self.favorites.iter().any(|id| id == station_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_round_trip() {
        let cmd = Command::SetBand {
            band: Band::Mid,
            gain_db: 2.5,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"cmd\":\"SetBand\""));
        assert!(json.contains("\"band\":\"mid\""));
        match serde_json::from_str::<Command>(&json).unwrap() {
            Command::SetBand { band, gain_db } => {
                assert_eq!(band, Band::Mid);
                assert_eq!(gain_db, 2.5);
            }
            other => panic!("wrong command {other:?}"),
        }
    }

    #[test]
    fn test_station_status_defaults_to_ok() {
        let s: Station =
            serde_json::from_str(r#"{"id":"x","name":"X","url":"http://x"}"#).unwrap();
        assert_eq!(s.status, StationStatus::Ok);
        assert!(!s.is_offline());
    }

    #[test]
    fn test_effective_volume_honours_mute() {
        let mut p = PlaybackState {
            volume: 0.6,
            ..Default::default()
        };
        assert_eq!(p.effective_volume(), 0.6);
        p.is_muted = true;
        assert_eq!(p.effective_volume(), 0.0);
    }

    #[test]
    fn test_visualizer_mode_cycle_and_parse() {
        assert_eq!(VisualizerMode::Particles.next(), VisualizerMode::Bars);
        assert_eq!("ORB".parse::<VisualizerMode>().unwrap(), VisualizerMode::Orb);
        assert!("plasma".parse::<VisualizerMode>().is_err());
    }
}
