use crate::protocol::{EqGains, Skin, VisualizerMode};
use crate::store::{self, KvStore};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// User preferences that survive restarts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    #[serde(default)]
    pub eq: EqGains,
    #[serde(default)]
    pub skin: Skin,
    #[serde(default)]
    pub visualizer_mode: VisualizerMode,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_volume() -> f32 {
    0.8
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            eq: EqGains::default(),
            skin: Skin::default(),
            visualizer_mode: VisualizerMode::default(),
            volume: default_volume(),
        }
    }
}

impl Preferences {
    /// Stored preferences, or `fallback` when absent or unreadable.
    pub fn load_or(store: &dyn KvStore, fallback: Preferences) -> Self {
        match store::load_json::<Preferences>(store, store::KEY_PREFERENCES) {
            Ok(Some(prefs)) => prefs,
            Ok(None) => fallback,
            Err(e) => {
                warn!("ignoring stored preferences: {}", e);
                fallback
            }
        }
    }

    pub fn persist(&self, store: &dyn KvStore) -> store::Result<()> {
        store::save_json(store, store::KEY_PREFERENCES, self)
    }
}
