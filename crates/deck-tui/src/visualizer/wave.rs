//! Layered "liquid" silhouettes. Amplitude and phase speed follow the low
//! band energy.

use std::f32::consts::PI;

use super::surface::{Rgb, Surface, WHITE};
use super::FrameData;

struct Layer {
    /// Amplitude at the reference height.
    amp: f32,
    speed: f32,
    opacity: f32,
    offset: f32,
}

const LAYERS: [Layer; 3] = [
    Layer {
        amp: 20.0,
        speed: 1.0,
        opacity: 0.3,
        offset: 0.0,
    },
    Layer {
        amp: 35.0,
        speed: 0.6,
        opacity: 0.5,
        offset: PI,
    },
    Layer {
        amp: 50.0,
        speed: 0.8,
        opacity: 0.8,
        offset: PI / 2.0,
    },
];

/// Pixel height the layer amplitudes are tuned for.
const REFERENCE_HEIGHT: f32 = 200.0;
const WATER_LEVEL: f32 = 0.8;
const BOTTOM_OPACITY: f32 = 0.1;

/// Phase advance per frame.
pub fn phase_step(vol_norm: f32) -> f32 {
    0.05 + vol_norm * 0.1
}

pub fn surface_y(x: f32, width: f32, height: f32, phase: f32, layer: usize, vol_norm: f32) -> f32 {
    let l = &LAYERS[layer];
    let base = height * WATER_LEVEL;
    let amplitude = l.amp * height / REFERENCE_HEIGHT + vol_norm * height * 0.3;
    let current = phase * l.speed + l.offset;
    base - (x / width * PI * 4.0 + current).sin() * amplitude
}

pub fn render(surface: &mut Surface, data: &FrameData, phase: &mut f32, accent: Rgb) {
    let vol = data.vol_norm();
    *phase += phase_step(vol);
    let (w, h) = (surface.width() as f32, surface.height() as f32);
    let last = LAYERS.len() - 1;

    for (idx, layer) in LAYERS.iter().enumerate() {
        let mut prev: Option<(i32, i32)> = None;
        for x in 0..surface.width() as i32 {
            let y = surface_y(x as f32, w, h, *phase, idx, vol);
            surface.column_gradient(x, y, accent, layer.opacity, BOTTOM_OPACITY);

            if idx == last {
                let edge = (x, y.round() as i32);
                let alpha = 0.4 + vol * 0.6;
                match prev {
                    Some((px, py)) => surface.line(px, py, edge.0, edge.1, WHITE, alpha),
                    None => surface.blend(edge.0, edge.1, WHITE, alpha),
                }
                prev = Some(edge);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_speeds_up_with_volume() {
        assert!((phase_step(0.0) - 0.05).abs() < 1e-6);
        assert!((phase_step(1.0) - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_louder_means_taller_waves() {
        let h = 40.0;
        let quiet = surface_y(10.0, 80.0, h, 0.0, 2, 0.0);
        let loud = surface_y(10.0, 80.0, h, 0.0, 2, 1.0);
        let base = h * WATER_LEVEL;
        assert!((loud - base).abs() > (quiet - base).abs());
    }

    #[test]
    fn test_top_layer_has_white_edge() {
        let mut s = Surface::default();
        s.fit(30, 10);
        s.clear(Rgb::default());
        let data = FrameData {
            average: 128.0,
            ..FrameData::default()
        };
        let mut phase = 0.0;
        render(&mut s, &data, &mut phase, Rgb::new(0, 0, 255));
        let whitish = (0..s.height())
            .flat_map(|y| (0..s.width()).map(move |x| (x, y)))
            .filter_map(|(x, y)| s.get(x, y))
            .any(|p| p.r > 100 && p.g > 100);
        assert!(whitish);
        assert!(phase > 0.05);
    }
}
