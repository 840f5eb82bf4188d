//! Flat render buffers copied out of the particle field once per frame.
//!
//! Positions and colors are packed as `[x, y, z, x, y, z, ..]` and
//! `[r, g, b, ..]`. The renderer must reallocate its own buffers whenever
//! [`RenderBuffers::sync`] reports [`BufferSync::Resized`].

use crate::{field::ParticleField, particle::Particle};

/// Outcome of a [`RenderBuffers::sync`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferSync {
    /// Same lengths as before; contents refreshed in place.
    Updated,
    /// A population changed size; `version` was bumped.
    Resized,
}

#[derive(Clone, Debug, Default)]
pub struct RenderBuffers {
    pub surface_positions: Vec<f32>,
    pub surface_colors: Vec<f32>,
    pub surface_emissive: Vec<f32>,
    pub atmosphere_positions: Vec<f32>,
    pub atmosphere_colors: Vec<f32>,
    pub atmosphere_opacities: Vec<f32>,
    /// Bumped every time a population changes size.
    pub version: u64,
}

impl RenderBuffers {
    pub fn surface_len(&self) -> usize {
        self.surface_emissive.len()
    }

    pub fn atmosphere_len(&self) -> usize {
        self.atmosphere_opacities.len()
    }

    /// Copies the current particle state into the buffers.
    pub fn sync(&mut self, field: &ParticleField) -> BufferSync {
        let resized = self.surface_len() != field.surface().len()
            || self.atmosphere_len() != field.atmosphere().len();

        fill(
            field.surface(),
            &mut self.surface_positions,
            &mut self.surface_colors,
            &mut self.surface_emissive,
            Particle::emissive,
        );
        fill(
            field.atmosphere(),
            &mut self.atmosphere_positions,
            &mut self.atmosphere_colors,
            &mut self.atmosphere_opacities,
            |p| p.opacity,
        );

        if resized {
            self.version += 1;
            log::debug!(
                "render buffers resized to {} surface / {} atmosphere (version {})",
                self.surface_len(),
                self.atmosphere_len(),
                self.version
            );
            BufferSync::Resized
        } else {
            BufferSync::Updated
        }
    }
}

fn fill(
    particles: &[Particle],
    positions: &mut Vec<f32>,
    colors: &mut Vec<f32>,
    scalars: &mut Vec<f32>,
    scalar: impl Fn(&Particle) -> f32,
) {
    positions.clear();
    colors.clear();
    scalars.clear();
    positions.reserve(particles.len() * 3);
    colors.reserve(particles.len() * 3);
    scalars.reserve(particles.len());

    for p in particles {
        positions.extend_from_slice(&[p.position.x, p.position.y, p.position.z]);
        colors.extend_from_slice(&p.color.to_array());
        scalars.push(scalar(p));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldConfig;
    use ultraviolet::Vec3;

    fn field() -> ParticleField {
        ParticleField::new(&FieldConfig {
            surface_count: 40,
            atmosphere_count: 20,
            ..FieldConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn first_sync_resizes_then_updates() {
        let field = field();
        let mut buffers = RenderBuffers::default();
        assert_eq!(buffers.sync(&field), BufferSync::Resized);
        assert_eq!(buffers.version, 1);
        assert_eq!(buffers.surface_positions.len(), 120);
        assert_eq!(buffers.atmosphere_opacities.len(), 20);
        assert_eq!(buffers.sync(&field), BufferSync::Updated);
        assert_eq!(buffers.version, 1);
    }

    #[test]
    fn debris_spawn_requires_resize() {
        let mut field = field();
        let mut buffers = RenderBuffers::default();
        buffers.sync(&field);
        field.spawn_debris(Vec3::new(0.0, 5.0, 0.0), 1000.0, 7);
        assert_eq!(buffers.sync(&field), BufferSync::Resized);
        assert_eq!(buffers.atmosphere_len(), 27);
        assert_eq!(buffers.atmosphere_colors.len(), 81);
        assert_eq!(buffers.version, 2);
    }

    #[test]
    fn positions_match_particles() {
        let field = field();
        let mut buffers = RenderBuffers::default();
        buffers.sync(&field);
        let p = &field.surface()[5];
        assert_eq!(&buffers.surface_positions[15..18], &[p.position.x, p.position.y, p.position.z]);
    }
}
