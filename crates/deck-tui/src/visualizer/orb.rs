//! Radius-modulated closed outline around the centre.

use std::f32::consts::TAU;

use super::surface::{Rgb, Surface, WHITE};
use super::FrameData;

const SPOKES: usize = 64;

/// Outline radius for spoke `i`, in pixels.
pub fn spoke_radius(data: &FrameData, i: usize, base: f32) -> f32 {
    let bins = data.freq.len();
    let mag = if bins == 0 {
        0.0
    } else {
        // mirror the lower half of the spectrum so the outline closes smoothly
        let half = SPOKES / 2;
        let k = if i < half { i } else { SPOKES - 1 - i };
        let bin = k * (bins / 2).max(1) / half;
        data.freq[bin.min(bins - 1)] as f32 / 255.0
    };
    base * (1.0 + 0.25 * data.vol_norm()) + base * 0.6 * mag
}

pub fn render(surface: &mut Surface, data: &FrameData, accent: Rgb) {
    let (w, h) = (surface.width() as f32, surface.height() as f32);
    let (cx, cy) = (w / 2.0, h / 2.0);
    let base = w.min(h) * 0.28;

    surface.disc(cx, cy, base * (0.5 + 0.5 * data.vol_norm()), accent, 0.25);

    let point = |i: usize| {
        let angle = i as f32 / SPOKES as f32 * TAU + data.t * 0.2;
        let r = spoke_radius(data, i, base);
        (
            (cx + angle.cos() * r).round() as i32,
            (cy + angle.sin() * r).round() as i32,
        )
    };
    for i in 0..SPOKES {
        let (x0, y0) = point(i);
        let (x1, y1) = point((i + 1) % SPOKES);
        surface.line(x0, y0, x1, y1, accent, 1.0);
    }
    surface.disc(cx, cy, 1.0, WHITE, 0.3 + 0.7 * data.vol_norm());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_grows_with_magnitude() {
        let quiet = FrameData {
            freq: vec![0; 64],
            ..FrameData::default()
        };
        let loud = FrameData {
            freq: vec![255; 64],
            average: 255.0,
            ..FrameData::default()
        };
        assert_eq!(spoke_radius(&quiet, 3, 10.0), 10.0);
        assert!((spoke_radius(&loud, 3, 10.0) - 18.5).abs() < 1e-4);
    }

    #[test]
    fn test_outline_is_symmetric_in_spokes() {
        let data = FrameData {
            freq: (0..128).map(|i| i as u8).collect(),
            ..FrameData::default()
        };
        assert_eq!(spoke_radius(&data, 5, 10.0), spoke_radius(&data, SPOKES - 6, 10.0));
    }
}
