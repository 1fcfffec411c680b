//! Real-time analyser: keeps the most recent `fft_size` samples and turns
//! them into byte spectra or byte waveforms on request.
//!
//! Frequency data follows the usual analyser contract: Blackman window,
//! magnitude normalised by the transform size, exponential smoothing over
//! time, decibels mapped linearly from [`MIN_DECIBELS`, `MAX_DECIBELS`] onto
//! 0..=255. Time-domain bytes are `128 * (1 + x)`.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::GraphError;

pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;
pub const MIN_FFT_SIZE: usize = 32;
pub const MAX_FFT_SIZE: usize = 32_768;

struct AnalyserState {
    history: Vec<f32>,
    write_pos: usize,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    fft: Arc<dyn Fft<f32>>,
}

#[derive(Clone)]
pub struct AnalyserNode {
    fft_size: usize,
    smoothing: f32,
    state: Arc<Mutex<AnalyserState>>,
}

impl std::fmt::Debug for AnalyserNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyserNode")
            .field("fft_size", &self.fft_size)
            .field("smoothing", &self.smoothing)
            .finish()
    }
}

fn blackman(n: usize) -> Vec<f32> {
    let (a0, a1, a2) = (0.42_f32, 0.5_f32, 0.08_f32);
    let two_pi = 2.0 * std::f32::consts::PI;
    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            a0 - a1 * (two_pi * x).cos() + a2 * (2.0 * two_pi * x).cos()
        })
        .collect()
}

impl AnalyserNode {
    pub fn new(fft_size: usize, smoothing: f32) -> Result<Self, GraphError> {
        if !fft_size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&fft_size) {
            return Err(GraphError::InvalidConfig(format!(
                "fft size {fft_size} must be a power of two in {MIN_FFT_SIZE}..={MAX_FFT_SIZE}"
            )));
        }
        if !(0.0..=1.0).contains(&smoothing) {
            return Err(GraphError::InvalidConfig(format!(
                "smoothing {smoothing} outside 0..=1"
            )));
        }

        let fft = FftPlanner::<f32>::new().plan_fft_forward(fft_size);
        let state = AnalyserState {
            history: vec![0.0; fft_size],
            write_pos: 0,
            window: blackman(fft_size),
            smoothed: vec![0.0; fft_size / 2],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            fft,
        };
        Ok(Self {
            fft_size,
            smoothing,
            state: Arc::new(Mutex::new(state)),
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    fn lock(&self) -> MutexGuard<'_, AnalyserState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Append mono samples; only the newest `fft_size` are retained.
    pub fn push_samples(&self, samples: &[f32]) {
        let mut st = self.lock();
        let n = st.history.len();
        for &s in samples.iter().skip(samples.len().saturating_sub(n)) {
            let pos = st.write_pos;
            st.history[pos] = s;
            st.write_pos = (pos + 1) % n;
        }
    }

    /// Oldest-first copy of the history.
    fn ordered(st: &AnalyserState, out: &mut [f32]) {
        let n = st.history.len();
        for (i, slot) in out.iter_mut().enumerate().take(n) {
            *slot = st.history[(st.write_pos + i) % n];
        }
    }

    pub fn float_time_domain_data(&self, out: &mut [f32]) {
        let st = self.lock();
        let n = out.len().min(st.history.len());
        Self::ordered(&st, &mut out[..n]);
    }

    pub fn byte_time_domain_data(&self, out: &mut [u8]) {
        let st = self.lock();
        let n = st.history.len();
        for (i, slot) in out.iter_mut().enumerate().take(n) {
            let x = st.history[(st.write_pos + i) % n];
            *slot = (128.0 * (1.0 + x)).floor().clamp(0.0, 255.0) as u8;
        }
    }

    /// Smoothed magnitudes in dB, one per bin. Advances the smoothing state.
    pub fn float_frequency_data(&self, out: &mut [f32]) {
        let mut st = self.lock();
        self.update_spectrum(&mut st);
        for (slot, mag) in out.iter_mut().zip(st.smoothed.iter()) {
            *slot = to_db(*mag);
        }
    }

    pub fn byte_frequency_data(&self, out: &mut [u8]) {
        let mut st = self.lock();
        self.update_spectrum(&mut st);
        let range = MAX_DECIBELS - MIN_DECIBELS;
        for (slot, mag) in out.iter_mut().zip(st.smoothed.iter()) {
            let scaled = 255.0 / range * (to_db(*mag) - MIN_DECIBELS);
            *slot = scaled.floor().clamp(0.0, 255.0) as u8;
        }
    }

    fn update_spectrum(&self, st: &mut AnalyserState) {
        let n = self.fft_size;
        let AnalyserState {
            history,
            write_pos,
            window,
            smoothed,
            scratch,
            fft,
        } = st;
        for i in 0..n {
            let x = history[(*write_pos + i) % n];
            scratch[i] = Complex::new(x * window[i], 0.0);
        }
        fft.process(scratch);

        let tau = self.smoothing;
        let norm = 1.0 / n as f32;
        for (k, prev) in smoothed.iter_mut().enumerate() {
            let mag = scratch[k].norm() * norm;
            let next = tau * *prev + (1.0 - tau) * mag;
            *prev = if next.is_finite() { next } else { 0.0 };
        }
    }
}

fn to_db(mag: f32) -> f32 {
    if mag > 0.0 {
        20.0 * mag.log10()
    } else {
        f32::NEG_INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_config() {
        assert!(AnalyserNode::new(500, 0.8).is_err());
        assert!(AnalyserNode::new(16, 0.8).is_err());
        assert!(AnalyserNode::new(65_536, 0.8).is_err());
        assert!(AnalyserNode::new(512, 1.5).is_err());
        assert!(AnalyserNode::new(512, -0.1).is_err());
        let a = AnalyserNode::new(512, 0.85).unwrap();
        assert_eq!(a.frequency_bin_count(), 256);
    }

    #[test]
    fn test_silence() {
        let a = AnalyserNode::new(256, 0.0).unwrap();
        let mut freq = vec![7u8; 128];
        a.byte_frequency_data(&mut freq);
        assert!(freq.iter().all(|&b| b == 0));

        let mut time = vec![0u8; 256];
        a.byte_time_domain_data(&mut time);
        assert!(time.iter().all(|&b| b == 128));
    }

    #[test]
    fn test_sine_peaks_in_its_bin() {
        let n = 512;
        let a = AnalyserNode::new(n, 0.0).unwrap();
        let bin = 20;
        let samples: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * bin as f32 * i as f32 / n as f32).sin())
            .collect();
        a.push_samples(&samples);

        let mut db = vec![0.0f32; n / 2];
        a.float_frequency_data(&mut db);
        let peak = db
            .iter()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, v)| {
                if *v > best.1 {
                    (i, *v)
                } else {
                    best
                }
            })
            .0;
        assert_eq!(peak, bin);
        assert!(db[n / 2 - 1] < db[bin] - 40.0);

        let mut bytes = vec![0u8; n / 2];
        a.byte_frequency_data(&mut bytes);
        assert_eq!(bytes[bin], 255);
    }

    #[test]
    fn test_smoothing_decays_gradually() {
        let n = 256;
        let a = AnalyserNode::new(n, 0.85).unwrap();
        let tone: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 8.0 * i as f32 / n as f32).sin())
            .collect();
        a.push_samples(&tone);
        let mut db = vec![0.0f32; n / 2];
        a.float_frequency_data(&mut db);
        let loud = db[8];

        a.push_samples(&vec![0.0; n]);
        a.float_frequency_data(&mut db);
        let after = db[8];
        // 0.85 of the previous magnitude is about -1.4 dB
        assert!(after < loud && after > loud - 3.0, "loud {loud} after {after}");
    }

    #[test]
    fn test_history_keeps_newest_samples() {
        let a = AnalyserNode::new(32, 0.0).unwrap();
        let ramp: Vec<f32> = (0..40).map(|i| i as f32 / 100.0).collect();
        a.push_samples(&ramp);
        let mut out = vec![0.0f32; 32];
        a.float_time_domain_data(&mut out);
        assert_eq!(out[0], 0.08);
        assert_eq!(out[31], 0.39);
    }
}
