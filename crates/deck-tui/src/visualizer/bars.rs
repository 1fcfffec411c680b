use super::surface::{Rgb, Surface};
use super::{FrameData, JitterSource};

pub const BAR_COUNT: usize = 40;
/// Share of the spectrum spread across the bars; the top is mostly empty.
const SPECTRUM_SHARE: f32 = 0.7;
/// Floor of the bars above the reflection, as a share of the height.
const BASELINE: f32 = 0.78;

/// Bar heights in 0..=1.
pub fn bar_levels(data: &FrameData, simulated: bool, jitter: &mut dyn JitterSource) -> Vec<f32> {
    if simulated {
        return (0..BAR_COUNT)
            .map(|_| (jitter.next() * data.average * 1.5 / 255.0).clamp(0.0, 1.0))
            .collect();
    }
    let usable = ((data.freq.len() as f32 * SPECTRUM_SHARE) as usize).max(1);
    (0..BAR_COUNT)
        .map(|i| {
            let lo = i * usable / BAR_COUNT;
            let hi = ((i + 1) * usable / BAR_COUNT).max(lo + 1);
            data.freq
                .get(lo..hi.min(data.freq.len()))
                .and_then(|bins| bins.iter().max())
                .map_or(0.0, |&b| b as f32 / 255.0)
        })
        .collect()
}

pub fn render(surface: &mut Surface, levels: &[f32], accent: Rgb) {
    let (w, h) = (surface.width() as i32, surface.height() as i32);
    let baseline = ((h as f32) * BASELINE).round().max(1.0) as i32;
    let gap = if w >= BAR_COUNT as i32 * 3 { 1 } else { 0 };
    let n = levels.len().max(1) as i32;

    for (i, &level) in levels.iter().enumerate() {
        let i = i as i32;
        let x0 = i * w / n;
        let x1 = ((i + 1) * w / n - gap).max(x0 + 1);
        let bar_h = ((level * baseline as f32).ceil() as i32).clamp(1, baseline);
        let top = baseline - bar_h;

        // halo
        surface.fill_rect(x0 - 1, top - 1, x1 - x0 + 2, bar_h + 1, accent, 0.15);
        surface.fill_rect(x0, top, x1 - x0, bar_h, accent, 1.0);

        let reflection = ((bar_h as f32 * 0.35) as i32).min(h - baseline);
        for r in 0..reflection {
            let alpha = 0.35 * (1.0 - r as f32 / reflection as f32);
            surface.fill_rect(x0, baseline + r, x1 - x0, 1, accent, alpha);
        }
    }
}
