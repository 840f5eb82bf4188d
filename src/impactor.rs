use crate::{field::ParticleField, utils};
use serde::Deserialize;
use ultraviolet::Vec3;

/// Scene units travelled per frame per unit of speed.
pub const VELOCITY_SCALE: f32 = 0.02;
/// Standard gravity, m/s^2.
pub const GRAVITY: f64 = 9.81;
/// Target density used by the crater scaling law, kg/m^3.
pub const TARGET_DENSITY: f64 = 2700.0;

/// Impactor composition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    #[default]
    Stone,
    Metal,
    Ice,
}

impl Material {
    /// Bulk density in kg/m^3.
    pub fn density(self) -> f64 {
        match self {
            Material::Stone => 2700.0,
            Material::Metal => 7800.0,
            Material::Ice => 920.0,
        }
    }

    /// Decodes the C ABI discriminant; unknown values fall back to stone.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Material::Metal,
            2 => Material::Ice,
            _ => Material::Stone,
        }
    }
}

/// Result of an impactor touching the field or the body.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImpactDescriptor {
    pub point: Vec3,
    pub energy: f32,
    pub radius: f32,
    /// Grazing contact with a particle rather than the body itself.
    pub is_secondary: bool,
}

/// A projectile flying toward the body.
#[derive(Clone, Debug)]
pub struct Impactor {
    /// Radius in scene units.
    pub size: f32,
    /// Signed speed; negative is inbound.
    pub speed: f32,
    pub material: Material,
    pub position: Vec3,
    pub velocity: Vec3,
    pub target_point: Vec3,
    /// Visual spin only.
    pub rotation: Vec3,
    active: bool,
    impacted: bool,
    visible: bool,
}

impl Impactor {
    /// Creates an impactor at `position` moving along `target_direction * speed`.
    /// The primary impact lands where `target_direction` meets the body surface.
    pub fn new(
        size: f32,
        speed: f32,
        material: Material,
        position: Vec3,
        target_direction: Vec3,
        body_radius: f32,
    ) -> Self {
        Self {
            size,
            speed,
            material,
            position,
            velocity: target_direction * (speed * VELOCITY_SCALE),
            target_point: target_direction * body_radius,
            rotation: Vec3::zero(),
            active: true,
            impacted: false,
            visible: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn has_impacted(&self) -> bool {
        self.impacted
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Moving away from the body center.
    pub fn is_receding(&self) -> bool {
        self.position.dot(self.velocity) > 0.0
    }

    /// Moves the impactor one frame and tests it against the field.
    ///
    /// Touching an intact particle yields a secondary descriptor and the
    /// impactor keeps flying; reaching the body yields the primary one via
    /// [`Self::impact`].
    pub fn advance(&mut self, time_scale: f32, field: &ParticleField) -> Option<ImpactDescriptor> {
        if !self.active {
            return None;
        }

        let start = self.position;
        self.position += self.velocity * time_scale;
        self.rotation += Vec3::new(0.02, 0.03, 0.01) * time_scale;

        if field.any_collision(self.position, self.size) {
            return Some(ImpactDescriptor {
                point: self.position,
                energy: self.size * self.speed.abs() * 10.0,
                radius: self.size * 0.3,
                is_secondary: true,
            });
        }

        // Swept test: a large time scale can carry the impactor across the body in one frame.
        let closest = utils::closest_to_origin(start, self.position);
        if closest.mag() <= field.body_radius() + self.size * 0.8 {
            return self.impact();
        }

        None
    }

    /// Ends the flight with a primary impact at the target point.
    /// Returns `None` if the impactor already impacted.
    pub fn impact(&mut self) -> Option<ImpactDescriptor> {
        if self.impacted {
            return None;
        }

        self.impacted = true;
        self.active = false;
        self.visible = false;

        Some(ImpactDescriptor {
            point: self.target_point,
            energy: self.size * self.speed.abs() * 100.0,
            radius: self.size,
            is_secondary: false,
        })
    }

    /// Mass in kg of a sphere of `diameter` meters.
    pub fn mass(diameter: f64, material: Material) -> f64 {
        let radius = diameter / 2.0;
        let volume = 4.0 / 3.0 * std::f64::consts::PI * radius.powi(3);
        volume * material.density()
    }

    /// Kinetic energy in joules; `velocity` is in km/s.
    pub fn impact_energy(mass: f64, velocity: f64) -> f64 {
        0.5 * mass * (velocity * 1000.0).powi(2)
    }

    /// Empirical crater diameter for an impact of `energy` joules.
    pub fn crater_diameter(energy: f64) -> f64 {
        1.8 * (energy / (TARGET_DENSITY * GRAVITY)).powf(0.22)
    }

    /// Empirical seismic magnitude for an impact of `energy` joules.
    pub fn magnitude(energy: f64) -> f64 {
        0.67 * energy.log10() - 5.87
    }

    /// Blast radius in scene units for an impactor of `size` at `speed` km/s.
    pub fn scaled_blast_radius(size: f32, speed: f32) -> f32 {
        let mass = (size as f64).powi(3) * TARGET_DENSITY;
        let energy = Self::impact_energy(mass, speed.abs() as f64);
        (Self::crater_diameter(energy) * 0.1).max(0.5) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldConfig;
    use approx::assert_relative_eq;

    fn inbound(size: f32, speed: f32) -> Impactor {
        let direction = Vec3::unit_z();
        Impactor::new(size, -speed, Material::Stone, direction * 30.0, direction, 5.0)
    }

    #[test]
    fn impact_is_idempotent() {
        let mut impactor = inbound(2.0, 25.0);
        let first = impactor.impact().unwrap();
        assert!(!first.is_secondary);
        assert_eq!(first.point, Vec3::new(0.0, 0.0, 5.0));
        assert_relative_eq!(first.energy, 2.0 * 25.0 * 100.0);
        assert_eq!(first.radius, 2.0);
        assert!(impactor.impact().is_none());
        assert!(!impactor.is_active());
        assert!(!impactor.is_visible());
    }

    #[test]
    fn impact_energy_matches_closed_form() {
        assert_eq!(Impactor::impact_energy(1000.0, 20.0), 0.5 * 1000.0 * 20000.0f64.powi(2));
        assert_eq!(Impactor::impact_energy(1000.0, 20.0), 2.0e11);
    }

    #[test]
    fn mass_uses_material_density() {
        let stone = Impactor::mass(2.0, Material::Stone);
        assert_relative_eq!(stone, 4.0 / 3.0 * std::f64::consts::PI * 2700.0, epsilon = 1e-9);
        let ice = Impactor::mass(2.0, Material::Ice);
        assert_relative_eq!(ice / stone, 920.0 / 2700.0, epsilon = 1e-12);
        assert!(Impactor::mass(2.0, Material::Metal) > stone);
    }

    #[test]
    fn crater_and_magnitude_scaling() {
        let energy = 1.0e15_f64;
        let expected = 1.8 * (energy / (2700.0 * 9.81)).powf(0.22);
        assert_relative_eq!(Impactor::crater_diameter(energy), expected, epsilon = 1e-9);
        assert_relative_eq!(Impactor::magnitude(1.0e10), 0.67 * 10.0 - 5.87, epsilon = 1e-12);
    }

    #[test]
    fn blast_radius_has_floor() {
        assert_eq!(Impactor::scaled_blast_radius(0.0, 0.0), 0.5);
        assert!(Impactor::scaled_blast_radius(2.5, 25.0) > 0.5);
    }

    #[test]
    fn reaches_body_without_particles() {
        let field = ParticleField::new(&FieldConfig {
            surface_count: 0,
            atmosphere_count: 0,
            ..FieldConfig::default()
        })
        .unwrap();
        let mut impactor = inbound(1.0, 25.0);
        let mut hit = None;
        for _ in 0..200 {
            if let Some(descriptor) = impactor.advance(1.0, &field) {
                hit = Some(descriptor);
                break;
            }
        }
        let hit = hit.expect("impactor never reached the body");
        assert!(!hit.is_secondary);
        assert!(impactor.has_impacted());
        assert!(impactor.advance(1.0, &field).is_none());
    }

    #[test]
    fn grazing_a_particle_is_secondary() {
        let field = ParticleField::new(&FieldConfig {
            surface_count: 0,
            atmosphere_count: 3000,
            ..FieldConfig::default()
        })
        .unwrap();
        let mut impactor = inbound(1.0, 25.0);
        let mut hit = None;
        for _ in 0..200 {
            if let Some(descriptor) = impactor.advance(1.0, &field) {
                hit = Some(descriptor);
                break;
            }
        }
        let hit = hit.unwrap();
        assert!(hit.is_secondary);
        assert_relative_eq!(hit.energy, 250.0);
        assert_relative_eq!(hit.radius, 0.3);
        assert!(impactor.is_active());
        assert!(!impactor.has_impacted());
    }

    #[test]
    fn fast_impactor_cannot_step_over_the_body() {
        let field = ParticleField::new(&FieldConfig {
            surface_count: 0,
            atmosphere_count: 0,
            ..FieldConfig::default()
        })
        .unwrap();
        let mut impactor = inbound(1.0, 20.0);
        let hit = impactor.advance(100.0, &field).unwrap();
        assert!(impactor.position.z < -5.0);
        assert!(!hit.is_secondary);
        assert_eq!(hit.point, Vec3::new(0.0, 0.0, 5.0));
        assert!(impactor.has_impacted());
    }

    #[test]
    fn receding_follows_velocity() {
        let direction = Vec3::unit_z();
        let outbound = Impactor::new(1.0, 25.0, Material::Ice, direction * 31.0, direction, 5.0);
        assert!(outbound.is_receding());
        assert!(!inbound(1.0, 25.0).is_receding());
    }

    #[test]
    fn paused_impactor_stays_put() {
        let field = ParticleField::new(&FieldConfig {
            surface_count: 0,
            atmosphere_count: 0,
            ..FieldConfig::default()
        })
        .unwrap();
        let mut impactor = inbound(1.0, 25.0);
        let start = impactor.position;
        assert!(impactor.advance(0.0, &field).is_none());
        assert_eq!(impactor.position, start);
    }
}
