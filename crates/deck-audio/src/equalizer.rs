use deck_proto::protocol::{Band, EqGains};
use tracing::debug;

use crate::graph::EqNodes;

pub const MIN_GAIN_DB: f32 = -12.0;
pub const MAX_GAIN_DB: f32 = 12.0;
/// Presets match when every band is within this distance.
pub const PRESET_TOLERANCE_DB: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub name: &'static str,
    pub gains: [f32; 3],
}

pub const PRESETS: [Preset; 4] = [
    Preset {
        name: "flat",
        gains: [0.0, 0.0, 0.0],
    },
    Preset {
        name: "bass",
        gains: [8.0, 2.0, -2.0],
    },
    Preset {
        name: "vocal",
        gains: [-2.0, 4.0, 1.0],
    },
    Preset {
        name: "treble",
        gains: [-2.0, 2.0, 8.0],
    },
];

pub fn find_preset(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

pub fn clamp_gain(gain_db: f32) -> f32 {
    if gain_db.is_nan() {
        0.0
    } else {
        gain_db.clamp(MIN_GAIN_DB, MAX_GAIN_DB)
    }
}

/// The three user-facing gains and, once the graph exists, the filter
/// nodes they drive. Writes go straight to the nodes.
#[derive(Debug, Clone, Default)]
pub struct EqualizerBands {
    gains: EqGains,
    nodes: Option<EqNodes>,
}

impl EqualizerBands {
    pub fn new(initial: EqGains) -> Self {
        let mut eq = Self::default();
        for band in Band::ALL {
            eq.gains.set(band, clamp_gain(initial.get(band)));
        }
        eq
    }

    pub fn gains(&self) -> EqGains {
        self.gains
    }

    pub fn gain(&self, band: Band) -> f32 {
        self.gains.get(band)
    }

    pub fn has_nodes(&self) -> bool {
        self.nodes.is_some()
    }

    /// Bind freshly built nodes and push the stored gains into them.
    pub fn attach_nodes(&mut self, nodes: EqNodes) {
        for band in Band::ALL {
            nodes.node(band).gain().set_value(self.gains.get(band));
        }
        self.nodes = Some(nodes);
    }

    /// Returns the value actually applied.
    pub fn set_band(&mut self, band: Band, gain_db: f32) -> f32 {
        let gain = clamp_gain(gain_db);
        self.gains.set(band, gain);
        if let Some(nodes) = &self.nodes {
            nodes.node(band).gain().set_value(gain);
        }
        gain
    }

    pub fn apply_preset(&mut self, name: &str) -> bool {
        let Some(preset) = find_preset(name) else {
            return false;
        };
        for (band, gain) in Band::ALL.into_iter().zip(preset.gains) {
            self.set_band(band, gain);
        }
        debug!("equalizer preset {}", preset.name);
        true
    }

    pub fn active_preset(&self) -> Option<&'static str> {
        let current = self.gains.as_array();
        PRESETS
            .iter()
            .find(|p| {
                p.gains
                    .iter()
                    .zip(current.iter())
                    .all(|(want, have)| (want - have).abs() < PRESET_TOLERANCE_DB)
            })
            .map(|p| p.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_band_clamps() {
        let mut eq = EqualizerBands::default();
        assert_eq!(eq.set_band(Band::Bass, 20.0), 12.0);
        assert_eq!(eq.set_band(Band::Mid, -40.0), -12.0);
        assert_eq!(eq.set_band(Band::Treble, f32::NAN), 0.0);
        assert_eq!(eq.gains().as_array(), [12.0, -12.0, 0.0]);
    }

    #[test]
    fn test_writes_reach_nodes() {
        let nodes = EqNodes::new();
        let mut eq = EqualizerBands::new(EqGains {
            bass: 3.0,
            mid: 0.0,
            treble: -1.0,
        });
        eq.attach_nodes(nodes.clone());
        assert_eq!(nodes.bass.gain().value(), 3.0);
        assert_eq!(nodes.treble.gain().value(), -1.0);

        eq.set_band(Band::Mid, 5.5);
        assert_eq!(nodes.mid.gain().value(), 5.5);
    }

    #[test]
    fn test_without_nodes_only_stores() {
        let mut eq = EqualizerBands::default();
        eq.set_band(Band::Bass, 4.0);
        assert!(!eq.has_nodes());
        assert_eq!(eq.gain(Band::Bass), 4.0);
    }

    #[test]
    fn test_presets_round_trip_to_active() {
        let mut eq = EqualizerBands::default();
        assert_eq!(eq.active_preset(), Some("flat"));
        for preset in PRESETS {
            assert!(eq.apply_preset(preset.name));
            assert_eq!(eq.active_preset(), Some(preset.name));
        }
        assert!(!eq.apply_preset("loudness"));
    }

    #[test]
    fn test_active_preset_tolerance() {
        let mut eq = EqualizerBands::default();
        eq.apply_preset("bass");
        eq.set_band(Band::Bass, 8.05);
        assert_eq!(eq.active_preset(), Some("bass"));
        eq.set_band(Band::Bass, 8.2);
        assert_eq!(eq.active_preset(), None);
    }
}
