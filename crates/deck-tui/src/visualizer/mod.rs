//! Audio visualizer: acquires one frame of data from the analyser (or
//! synthesizes it) and paints it into a `Surface` in the selected mode.

mod bars;
mod frame_loop;
mod orb;
mod particles;
mod scope;
pub mod surface;
mod wave;

pub use frame_loop::FrameLoop;

use deck_audio::AnalyserNode;
use deck_proto::protocol::VisualizerMode;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use surface::{Rgb, Surface};

/// Share of the lowest frequency bins averaged into the "volume".
const LOW_BAND_SHARE: f32 = 0.3;
/// Bin count used when no analyser is available.
const IDLE_BINS: usize = 256;
/// Nominal low-band level while playing without a spectrum.
pub const SIMULATED_AVERAGE: f32 = 96.0;

/// Random values in `0.0..1.0` for simulated bar motion.
pub trait JitterSource: Send {
    fn next(&mut self) -> f32;
}

pub struct SeededJitter(StdRng);

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }
}

impl JitterSource for SeededJitter {
    fn next(&mut self) -> f32 {
        self.0.gen::<f32>()
    }
}

/// Cycles through a fixed sequence.
pub struct FixedJitter {
    values: Vec<f32>,
    pos: usize,
}

impl FixedJitter {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values, pos: 0 }
    }
}

impl JitterSource for FixedJitter {
    fn next(&mut self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        let v = self.values[self.pos % self.values.len()];
        self.pos += 1;
        v
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Analyser,
    /// Playing but the graph is unavailable.
    Simulated,
    Idle,
}

/// One frame of input for the renderers.
#[derive(Debug, Clone, Default)]
pub struct FrameData {
    /// Byte magnitudes, one per bin.
    pub freq: Vec<u8>,
    /// Byte waveform, 128 = silence.
    pub time: Vec<u8>,
    /// Mean of the low bins, 0..=255.
    pub average: f32,
    pub playing: bool,
    /// Seconds since the visualizer started.
    pub t: f32,
}

impl FrameData {
    pub fn vol_norm(&self) -> f32 {
        (self.average / 255.0).min(1.0)
    }
}

/// Mean of the first 30% of bins.
pub fn low_band_average(freq: &[u8]) -> f32 {
    let limit = (freq.len() as f32 * LOW_BAND_SHARE).floor() as usize;
    if limit == 0 {
        return 0.0;
    }
    freq[..limit].iter().map(|&b| b as f32).sum::<f32>() / limit as f32
}

pub fn idle_average(t: f32) -> f32 {
    10.0 + 5.0 * t.sin()
}

fn synthesize_idle(data: &mut FrameData, bins: usize) {
    let t = data.t;
    data.freq.clear();
    data.freq
        .extend((0..bins).map(|i| (10.0 + 5.0 * (t + 0.35 * i as f32).sin()).round() as u8));
    let n = bins * 2;
    data.time.clear();
    data.time.extend((0..n).map(|i| {
        let phase = i as f32 / n as f32 * std::f32::consts::TAU + t * 0.5;
        (128.0 + 3.0 * phase.sin()).round() as u8
    }));
    data.average = idle_average(t);
}

/// Per-mode animation state that survives between frames.
#[derive(Debug, Default)]
pub struct ModeState {
    pub wave_phase: f32,
    pub particles: Vec<particles::Particle>,
}

pub struct Visualizer {
    mode: VisualizerMode,
    analyser: Option<AnalyserNode>,
    jitter: Box<dyn JitterSource>,
    surface: Surface,
    data: FrameData,
    state: ModeState,
    background: Rgb,
}

impl Visualizer {
    pub fn new(mode: VisualizerMode, jitter: Box<dyn JitterSource>) -> Self {
        Self {
            mode,
            analyser: None,
            jitter,
            surface: Surface::default(),
            data: FrameData::default(),
            state: ModeState::default(),
            background: Rgb::default(),
        }
    }

    pub fn mode(&self) -> VisualizerMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: VisualizerMode) {
        if mode != self.mode {
            self.mode = mode;
            self.state.particles.clear();
        }
    }

    pub fn set_analyser(&mut self, analyser: Option<AnalyserNode>) {
        self.analyser = analyser;
    }

    pub fn set_background(&mut self, background: Rgb) {
        self.background = background;
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn data(&self) -> &FrameData {
        &self.data
    }

    pub fn source(&self, playing: bool) -> Source {
        match (&self.analyser, playing) {
            (Some(_), true) => Source::Analyser,
            (None, true) => Source::Simulated,
            (_, false) => Source::Idle,
        }
    }

    /// Fill `self.data` for this frame.
    fn acquire(&mut self, playing: bool) {
        self.data.playing = playing;
        match (self.source(playing), &self.analyser) {
            (Source::Analyser, Some(analyser)) => {
                let bins = analyser.frequency_bin_count();
                self.data.freq.resize(bins, 0);
                self.data.time.resize(analyser.fft_size(), 128);
                analyser.byte_frequency_data(&mut self.data.freq);
                analyser.byte_time_domain_data(&mut self.data.time);
                self.data.average = low_band_average(&self.data.freq);
            }
            (Source::Simulated, _) => {
                // no spectrum: idle shape at a nominal level, bars jitter on top
                synthesize_idle(&mut self.data, IDLE_BINS);
                self.data.average = SIMULATED_AVERAGE;
            }
            _ => synthesize_idle(&mut self.data, IDLE_BINS),
        }
    }

    /// Advance by `dt` seconds and redraw into a `cols` x `rows` cell area.
    pub fn frame(&mut self, dt: f32, cols: u16, rows: u16, playing: bool, accent: Rgb) {
        self.data.t += dt.max(0.0);
        self.surface.fit(cols, rows);
        self.surface.clear(self.background);
        self.acquire(playing);
        if self.surface.width() == 0 || self.surface.height() == 0 {
            return;
        }
        let simulated = self.source(playing) == Source::Simulated;
        match self.mode {
            VisualizerMode::Bars => {
                let heights = bars::bar_levels(&self.data, simulated, self.jitter.as_mut());
                bars::render(&mut self.surface, &heights, accent);
            }
            VisualizerMode::Wave => {
                wave::render(&mut self.surface, &self.data, &mut self.state.wave_phase, accent)
            }
            VisualizerMode::Scope => scope::render(&mut self.surface, &self.data, accent),
            VisualizerMode::Orb => orb::render(&mut self.surface, &self.data, accent),
            VisualizerMode::Particles => particles::render(
                &mut self.surface,
                &self.data,
                &mut self.state.particles,
                self.jitter.as_mut(),
                dt,
                accent,
            ),
        }
    }
}
