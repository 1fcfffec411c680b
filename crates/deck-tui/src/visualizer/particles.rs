//! Dots drifting upward; spawn rate and size follow the magnitude.

use super::surface::{Rgb, Surface};
use super::{FrameData, JitterSource};

const MAX_PARTICLES: usize = 160;
/// Upward speed in pixels per second at zero volume.
const BASE_RISE: f32 = 6.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub size: f32,
    pub life: f32,
}

/// Particles born this frame.
pub fn spawn_count(vol_norm: f32, playing: bool) -> usize {
    if playing {
        1 + (vol_norm * 6.0) as usize
    } else {
        1
    }
}

pub fn step(
    particles: &mut Vec<Particle>,
    data: &FrameData,
    jitter: &mut dyn JitterSource,
    dt: f32,
    width: f32,
    height: f32,
) {
    let vol = data.vol_norm();
    for p in particles.iter_mut() {
        p.y -= p.speed * dt;
        p.life -= dt * 0.5;
    }
    particles.retain(|p| p.y + p.size >= 0.0 && p.life > 0.0);

    if dt <= 0.0 {
        return;
    }
    for _ in 0..spawn_count(vol, data.playing) {
        if particles.len() >= MAX_PARTICLES {
            break;
        }
        particles.push(Particle {
            x: jitter.next() * width,
            y: height - 1.0,
            speed: BASE_RISE * (1.0 + jitter.next()) * (1.0 + 2.0 * vol),
            size: 0.5 + vol * 2.0,
            life: 1.0,
        });
    }
}

pub fn render(
    surface: &mut Surface,
    data: &FrameData,
    particles: &mut Vec<Particle>,
    jitter: &mut dyn JitterSource,
    dt: f32,
    accent: Rgb,
) {
    let (w, h) = (surface.width() as f32, surface.height() as f32);
    step(particles, data, jitter, dt, w, h);
    for p in particles.iter() {
        surface.disc(p.x, p.y, p.size, accent, p.life.clamp(0.2, 1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualizer::FixedJitter;

    #[test]
    fn test_particles_rise_and_expire() {
        let mut ps = vec![Particle {
            x: 1.0,
            y: 2.0,
            speed: 10.0,
            size: 0.5,
            life: 1.0,
        }];
        let data = FrameData::default();
        let mut jitter = FixedJitter::new(vec![0.5]);
        step(&mut ps, &data, &mut jitter, 0.1, 10.0, 10.0);
        assert_eq!(ps[0].y, 1.0);
        step(&mut ps, &data, &mut jitter, 0.5, 10.0, 10.0);
        assert!(ps.iter().all(|p| p.y > 0.0 || p.y + p.size >= 0.0));
        assert!(ps.iter().all(|p| p.x == 5.0 || p.x == 1.0));
    }

    #[test]
    fn test_spawn_rate_follows_volume() {
        assert_eq!(spawn_count(0.0, false), 1);
        assert_eq!(spawn_count(0.0, true), 1);
        assert_eq!(spawn_count(1.0, true), 7);
    }

    #[test]
    fn test_population_is_capped() {
        let mut ps = Vec::new();
        let data = FrameData {
            average: 255.0,
            playing: true,
            ..FrameData::default()
        };
        let mut jitter = FixedJitter::new(vec![0.0]);
        for _ in 0..200 {
            step(&mut ps, &data, &mut jitter, 0.001, 10.0, 1000.0);
        }
        assert!(ps.len() <= MAX_PARTICLES);
    }
}
