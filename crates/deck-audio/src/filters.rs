//! Biquad filter nodes.
//!
//! A `BiquadNode` is the control handle (type, corner frequency, Q and a live
//! gain parameter). A `FilterStage` is its audio-thread counterpart holding
//! per-channel filter state; it recomputes coefficients when the gain moves.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type, Q_BUTTERWORTH_F32};

use crate::error::GraphError;
use crate::param::AudioParam;

pub const BASS_FREQUENCY: f32 = 200.0;
pub const MID_FREQUENCY: f32 = 1000.0;
pub const TREBLE_FREQUENCY: f32 = 3000.0;
pub const MID_Q: f32 = 1.0;

/// Gains a stage must be able to realise; checked when the stage is built.
const GAIN_PROBES: [f32; 3] = [-12.0, 0.0, 12.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowShelf,
    Peaking,
    HighShelf,
}

impl FilterKind {
    fn name(self) -> &'static str {
        match self {
            FilterKind::LowShelf => "lowshelf",
            FilterKind::Peaking => "peaking",
            FilterKind::HighShelf => "highshelf",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BiquadNode {
    kind: FilterKind,
    frequency: f32,
    q: f32,
    gain: AudioParam,
}

impl BiquadNode {
    pub fn new(kind: FilterKind, frequency: f32, q: f32) -> Self {
        Self {
            kind,
            frequency,
            q,
            gain: AudioParam::new(0.0),
        }
    }

    pub fn low_shelf(frequency: f32) -> Self {
        Self::new(FilterKind::LowShelf, frequency, Q_BUTTERWORTH_F32)
    }

    pub fn peaking(frequency: f32, q: f32) -> Self {
        Self::new(FilterKind::Peaking, frequency, q)
    }

    pub fn high_shelf(frequency: f32) -> Self {
        Self::new(FilterKind::HighShelf, frequency, Q_BUTTERWORTH_F32)
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Live gain in dB.
    pub fn gain(&self) -> &AudioParam {
        &self.gain
    }

    fn coefficients(&self, sample_rate: u32, gain_db: f32) -> Result<Coefficients<f32>, GraphError> {
        let filter = match self.kind {
            FilterKind::LowShelf => Type::LowShelf(gain_db),
            FilterKind::Peaking => Type::PeakingEQ(gain_db),
            FilterKind::HighShelf => Type::HighShelf(gain_db),
        };
        Coefficients::<f32>::from_params(
            filter,
            (sample_rate as f32).hz(),
            self.frequency.hz(),
            self.q,
        )
        .map_err(|_| GraphError::InvalidCoefficients {
            kind: self.kind.name(),
            frequency: self.frequency,
            sample_rate,
        })
    }
}

/// Audio-thread half of a `BiquadNode`.
pub struct FilterStage {
    node: BiquadNode,
    sample_rate: u32,
    applied_gain: f32,
    channels: Vec<DirectForm2Transposed<f32>>,
}

impl FilterStage {
    pub fn new(node: BiquadNode, sample_rate: u32, channels: usize) -> Result<Self, GraphError> {
        for probe in GAIN_PROBES {
            node.coefficients(sample_rate, probe)?;
        }
        let applied_gain = node.gain.value();
        let coeffs = node.coefficients(sample_rate, applied_gain)?;
        Ok(Self {
            node,
            sample_rate,
            applied_gain,
            channels: (0..channels.max(1))
                .map(|_| DirectForm2Transposed::<f32>::new(coeffs))
                .collect(),
        })
    }

    fn sync_gain(&mut self) {
        let gain = self.node.gain.value();
        if gain == self.applied_gain {
            return;
        }
        // frequency and rate were validated at construction
        if let Ok(coeffs) = self.node.coefficients(self.sample_rate, gain) {
            for filter in &mut self.channels {
                filter.update_coefficients(coeffs);
            }
        }
        self.applied_gain = gain;
    }

    /// Filter an interleaved block in place.
    pub fn process(&mut self, block: &mut [f32]) {
        self.sync_gain();
        let channels = self.channels.len();
        for frame in block.chunks_mut(channels) {
            for (sample, filter) in frame.iter_mut().zip(self.channels.iter_mut()) {
                *sample = filter.run(*sample);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 44_100;

    fn sine_rms(stage: &mut FilterStage, freq: f32) -> f32 {
        let frames = RATE as usize / 2;
        let mut block: Vec<f32> = (0..frames)
            .flat_map(|i| {
                let s = (2.0 * std::f32::consts::PI * freq * i as f32 / RATE as f32).sin() * 0.25;
                [s, s]
            })
            .collect();
        stage.process(&mut block);
        // skip the transient
        let tail = &block[block.len() / 2..];
        (tail.iter().map(|s| s * s).sum::<f32>() / tail.len() as f32).sqrt()
    }

    #[test]
    fn test_flat_gain_is_transparent() {
        let node = BiquadNode::peaking(MID_FREQUENCY, MID_Q);
        let mut stage = FilterStage::new(node, RATE, 2).unwrap();
        let rms = sine_rms(&mut stage, 1000.0);
        let reference = 0.25 / 2f32.sqrt();
        assert!((rms - reference).abs() < 0.01, "rms {rms}");
    }

    #[test]
    fn test_low_shelf_boost_follows_param() {
        let node = BiquadNode::low_shelf(BASS_FREQUENCY);
        let mut stage = FilterStage::new(node.clone(), RATE, 2).unwrap();
        let flat = sine_rms(&mut stage, 60.0);
        node.gain().set_value(12.0);
        let boosted = sine_rms(&mut stage, 60.0);
        assert!(boosted > flat * 2.5, "flat {flat} boosted {boosted}");
    }

    #[test]
    fn test_high_shelf_cut_leaves_bass() {
        let node = BiquadNode::high_shelf(TREBLE_FREQUENCY);
        node.gain().set_value(-12.0);
        let mut stage = FilterStage::new(node, RATE, 2).unwrap();
        let bass = sine_rms(&mut stage, 100.0);
        let treble = sine_rms(&mut stage, 10_000.0);
        assert!(treble < bass * 0.5, "bass {bass} treble {treble}");
    }

    #[test]
    fn test_corner_above_nyquist_is_rejected() {
        let node = BiquadNode::high_shelf(TREBLE_FREQUENCY);
        let err = FilterStage::new(node, 4_000, 2).err().unwrap();
        assert!(matches!(err, GraphError::InvalidCoefficients { .. }));
    }
}
