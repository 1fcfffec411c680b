//! Time-domain trace.

use super::surface::{Rgb, Surface};
use super::FrameData;

/// Vertical pixel for a waveform byte (128 = centre line).
pub fn sample_y(byte: u8, height: usize) -> i32 {
    let v = (byte as f32 - 128.0) / 128.0;
    let mid = (height as f32 - 1.0) / 2.0;
    (mid - v * mid).round() as i32
}

pub fn render(surface: &mut Surface, data: &FrameData, accent: Rgb) {
    let (w, h) = (surface.width(), surface.height());
    if data.time.is_empty() {
        return;
    }
    let mid = (h as i32 - 1) / 2;
    for x in (0..w as i32).step_by(2) {
        surface.blend(x, mid, accent, 0.2);
    }

    let n = data.time.len();
    let mut prev: Option<(i32, i32)> = None;
    for x in 0..w {
        let idx = x * n / w.max(1);
        let y = sample_y(data.time[idx.min(n - 1)], h);
        let p = (x as i32, y);
        if let Some((px, py)) = prev {
            surface.line(px, py, p.0, p.1, accent, 1.0);
        } else {
            surface.blend(p.0, p.1, accent, 1.0);
        }
        prev = Some(p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_mapping() {
        assert_eq!(sample_y(128, 21), 10);
        assert_eq!(sample_y(0, 21), 20);
        assert_eq!(sample_y(255, 21), 0);
    }

    #[test]
    fn test_silence_draws_centre_line() {
        let mut s = Surface::default();
        s.fit(16, 4);
        s.clear(Rgb::default());
        let data = FrameData {
            time: vec![128; 64],
            ..FrameData::default()
        };
        render(&mut s, &data, Rgb::new(0, 255, 0));
        let mid = sample_y(128, 8) as usize;
        assert!((0..16).all(|x| s.get(x, mid) == Some(Rgb::new(0, 255, 0))));
    }
}
