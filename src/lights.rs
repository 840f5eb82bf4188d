//! Point lights derived from the hottest particles.
//!
//! Lights are transient: the coordinator re-derives the whole list every few
//! frames and the renderer replaces its previous set with it.

use crate::{color::Rgb, particle::Particle};
use ultraviolet::Vec3;

/// A glowing particle seen as a point light.
///
/// Layout (8 floats / 32 bytes): `[x, y, z, r, g, b, intensity, range]`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightSource {
    pub position: Vec3,
    pub color: Rgb,
    pub intensity: f32,
    /// Falloff distance in world units.
    pub range: f32,
}

impl LightSource {
    /// Light for a particle at `temperature`, `heat_threshold` being the coolest glowing one.
    pub fn from_temperature(position: Vec3, temperature: f32, heat_threshold: f32) -> Self {
        let color = if temperature > 3000.0 {
            Rgb::new(1.0, 1.0, 0.9)
        } else if temperature > 2000.0 {
            Rgb::new(1.0, 0.9, 0.7)
        } else if temperature > 1200.0 {
            Rgb::new(1.0, 0.6, 0.3)
        } else {
            Rgb::new(1.0, 0.3, 0.1)
        };
        let excess = temperature - heat_threshold;

        Self {
            position,
            color,
            intensity: (excess / 1000.0).min(2.0),
            range: (5.0 + excess / 200.0).min(15.0),
        }
    }
}

/// Lights for at most `max_count` particles hotter than `heat_threshold`, hottest first.
pub fn derive_lights<'a>(
    particles: impl Iterator<Item = &'a Particle>,
    max_count: usize,
    heat_threshold: f32,
) -> Vec<LightSource> {
    let mut hot: Vec<(f32, Vec3)> = particles
        .filter(|p| p.temperature() > heat_threshold)
        .map(|p| (p.temperature(), p.position))
        .collect();
    hot.sort_unstable_by(|a, b| b.0.total_cmp(&a.0));
    hot.truncate(max_count);

    hot.into_iter()
        .map(|(temperature, position)| LightSource::from_temperature(position, temperature, heat_threshold))
        .collect()
}
