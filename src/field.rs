use crate::{
    color::{ColorSource, ProceduralColors, Rgb},
    config::FieldConfig,
    error::Result,
    lights::{self, LightSource},
    particle::{Category, CategoryConstants, Particle, Shell},
    utils,
};

use rayon::prelude::*;
use std::f32::consts::{PI, TAU};
use ultraviolet::Vec3;

/// Weight of the previous smoothed center when blending in the new centroid.
pub const GRAVITY_CENTER_LAG: f32 = 0.05;
/// Hard cap on particles created by a single debris spawn.
pub const MAX_DEBRIS: usize = 100;
/// Debris is spawned this far out, relative to the body radius.
const DEBRIS_ALTITUDE: f32 = 1.1;
const DEBRIS_SPAWN_RADIUS: f32 = 2.0;

/// Aggregate counters over both populations.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Statistics {
    pub destroyed_count: usize,
    pub flying_count: usize,
    pub orbiting_count: usize,
    pub max_temperature: f32,
    pub surface_count: usize,
    pub atmosphere_count: usize,
    pub total_count: usize,
}

/// The surface and atmosphere particle populations of one body.
///
/// The atmosphere is stored as two segments: the generated particles followed
/// by spawned debris. [`ParticleField::reset`] drops the debris segment.
pub struct ParticleField {
    surface: Vec<Particle>,
    atmosphere: Vec<Particle>,
    /// Length of the generated atmosphere segment.
    generated_atmosphere: usize,
    /// Smoothed mass-weighted centroid, carried across frames.
    gravity_center: Vec3,
    shell: Shell,
    atmosphere_radius: f32,
    gravity_strength: f32,
    atmosphere_gravity_ratio: f32,
    surface_constants: CategoryConstants,
    atmosphere_constants: CategoryConstants,
    seed: u64,
    rng: fastrand::Rng,
    /// Whether to use Rayon for the per-particle passes.
    parallel: bool,
}

impl std::fmt::Debug for ParticleField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticleField")
            .field("surface", &self.surface.len())
            .field("atmosphere", &self.atmosphere.len())
            .field("generated_atmosphere", &self.generated_atmosphere)
            .field("gravity_center", &self.gravity_center)
            .field("shell", &self.shell)
            .field("parallel", &self.parallel)
            .finish()
    }
}

impl ParticleField {
    /// Validates `config` and generates both populations procedurally.
    pub fn new(config: &FieldConfig) -> Result<Self> {
        Self::with_colors(config, &ProceduralColors)
    }

    /// Like [`Self::new`], coloring particles through `colors`.
    pub fn with_colors(config: &FieldConfig, colors: &dyn ColorSource) -> Result<Self> {
        let mut field = Self::with_particles(config, Vec::new(), Vec::new())?;
        field.generate_with(config.surface_count, config.atmosphere_count, colors);
        Ok(field)
    }

    /// Builds a field from existing particles. All atmosphere particles form
    /// the generated segment.
    pub fn with_particles(
        config: &FieldConfig,
        surface: Vec<Particle>,
        atmosphere: Vec<Particle>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            generated_atmosphere: atmosphere.len(),
            surface,
            atmosphere,
            gravity_center: Vec3::zero(),
            shell: config.shell(),
            atmosphere_radius: config.atmosphere_radius,
            gravity_strength: config.gravity_strength,
            atmosphere_gravity_ratio: config.atmosphere_gravity_ratio,
            surface_constants: config.surface_constants(),
            atmosphere_constants: config.atmosphere_constants(),
            seed: config.seed,
            rng: fastrand::Rng::with_seed(config.seed),
            parallel: config.parallel,
        })
    }

    /// Replaces both populations with freshly generated, procedurally colored ones.
    pub fn generate(&mut self, surface_count: usize, atmosphere_count: usize) {
        self.generate_with(surface_count, atmosphere_count, &ProceduralColors);
    }

    /// Replaces both populations. The same seed and counts give the same field.
    pub fn generate_with(
        &mut self,
        surface_count: usize,
        atmosphere_count: usize,
        colors: &dyn ColorSource,
    ) {
        self.rng = fastrand::Rng::with_seed(self.seed);
        self.surface = utils::surface_ball(
            surface_count,
            self.shell.body_radius,
            &self.surface_constants,
            colors,
            &mut self.rng,
        );
        self.atmosphere = utils::atmosphere_shell(
            atmosphere_count,
            self.shell.body_radius,
            self.atmosphere_radius,
            &self.atmosphere_constants,
            colors,
            &mut self.rng,
        );
        self.generated_atmosphere = self.atmosphere.len();
        self.gravity_center = Vec3::zero();

        log::info!(
            "generated {} surface and {} atmosphere particles (radius {}, atmosphere {})",
            surface_count,
            atmosphere_count,
            self.shell.body_radius,
            self.atmosphere_radius
        );
    }

    /// Sets whether to use Rayon for the per-particle passes.
    pub fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    pub fn surface(&self) -> &[Particle] {
        &self.surface
    }

    pub fn atmosphere(&self) -> &[Particle] {
        &self.atmosphere
    }

    pub fn surface_mut(&mut self) -> &mut [Particle] {
        &mut self.surface
    }

    pub fn atmosphere_mut(&mut self) -> &mut [Particle] {
        &mut self.atmosphere
    }

    /// Debris particles appended since the last generation or reset.
    pub fn spawned(&self) -> &[Particle] {
        &self.atmosphere[self.generated_atmosphere..]
    }

    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.surface.iter().chain(self.atmosphere.iter())
    }

    pub fn len(&self) -> usize {
        self.surface.len() + self.atmosphere.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn gravity_center(&self) -> Vec3 {
        self.gravity_center
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    pub fn body_radius(&self) -> f32 {
        self.shell.body_radius
    }

    pub fn atmosphere_radius(&self) -> f32 {
        self.atmosphere_radius
    }

    /// Advances the field by one frame.
    /// 1. Blends the current centroid into the smoothed gravity center.
    /// 2. Updates every particle against that center.
    pub fn advance(&mut self, dt: f32, gravity_enabled: bool, time_scale: f32) {
        let centroid = self.center_of_mass();
        self.gravity_center = centroid + (self.gravity_center - centroid) * GRAVITY_CENTER_LAG;

        let strength = if gravity_enabled {
            self.gravity_strength
        } else {
            0.0
        };
        let center = self.gravity_center;
        let shell = self.shell;

        for_each_particle(&mut self.surface, self.parallel, |p| {
            p.update(dt, center, strength, time_scale, &shell);
        });
        let strength = strength * self.atmosphere_gravity_ratio;
        for_each_particle(&mut self.atmosphere, self.parallel, |p| {
            p.update(dt, center, strength, time_scale, &shell);
        });
    }

    /// Mass-weighted centroid of all particles; the origin for an empty field.
    pub fn center_of_mass(&self) -> Vec3 {
        let weigh = |p: &Particle| (p.position * p.mass(), p.mass());
        let sum = |a: (Vec3, f32), b: (Vec3, f32)| (a.0 + b.0, a.1 + b.1);

        let (weighted, mass) = if self.parallel {
            self.surface
                .par_iter()
                .chain(self.atmosphere.par_iter())
                .map(weigh)
                .reduce(|| (Vec3::zero(), 0.0), sum)
        } else {
            self.particles().map(weigh).fold((Vec3::zero(), 0.0), sum)
        };

        if mass > 0.0 {
            weighted / mass
        } else {
            Vec3::zero()
        }
    }

    /// Whether any intact particle touches a sphere of `radius` around `point`.
    /// Destroyed particles are debris and do not stop impactors.
    pub fn any_collision(&self, point: Vec3, radius: f32) -> bool {
        let hit = |p: &Particle| !p.is_destroyed() && p.check_collision(point, radius);
        if self.parallel {
            self.surface.par_iter().any(hit) || self.atmosphere.par_iter().any(hit)
        } else {
            self.particles().any(hit)
        }
    }

    /// Destroys and heats every particle inside the blast and returns how many were hit.
    ///
    /// The radius and energy are scaled per category; secondary blasts use half
    /// the radius and 30% of the energy.
    pub fn apply_blast(&mut self, point: Vec3, radius: f32, energy: f32, is_secondary: bool) -> usize {
        let (radius_scale, energy_scale) = if is_secondary { (0.5, 0.3) } else { (1.0, 1.0) };
        let body_radius = self.shell.body_radius;
        let parallel = self.parallel;

        let mut affected = 0;
        for (particles, constants) in [
            (&mut self.surface, &self.surface_constants),
            (&mut self.atmosphere, &self.atmosphere_constants),
        ] {
            let blast = Blast {
                point,
                radius: radius * constants.blast_radius_scale * radius_scale,
                energy: energy * constants.blast_energy_scale * energy_scale,
                body_radius,
            };
            if blast.radius.is_nan() || blast.radius <= 0.0 {
                continue;
            }
            affected += if parallel {
                particles.par_iter_mut().map(|p| blast.hit(p) as usize).sum::<usize>()
            } else {
                particles.iter_mut().map(|p| blast.hit(p) as usize).sum::<usize>()
            };
        }

        log::debug!(
            "blast at {:?}: radius {}, energy {}, secondary {}, {} particles hit",
            point,
            radius,
            energy,
            is_secondary,
            affected
        );
        affected
    }

    /// Appends up to `count` (at most [`MAX_DEBRIS`]) hot atmosphere particles
    /// around the impact and returns them.
    pub fn spawn_debris(&mut self, point: Vec3, energy: f32, count: usize) -> &[Particle] {
        let count = count.min(MAX_DEBRIS);
        let direction = utils::try_normalized(point).unwrap_or_else(Vec3::unit_y);
        let center = direction * self.shell.body_radius * DEBRIS_ALTITUDE;

        let color = if energy > 5000.0 {
            Rgb::new(1.0, 0.6, 0.2)
        } else if energy > 2000.0 {
            Rgb::new(1.0, 0.8, 0.3)
        } else {
            Rgb::new(0.1, 0.1, 0.1)
        };

        let start = self.atmosphere.len();
        self.atmosphere.reserve(count);
        for _ in 0..count {
            let rng = &mut self.rng;
            let theta = rng.f32() * TAU;
            let phi = rng.f32() * PI;
            let r = DEBRIS_SPAWN_RADIUS * rng.f32().powf(0.3);
            let offset = utils::spherical(r, phi, theta);
            let outward = utils::try_normalized(offset).unwrap_or_else(|| utils::random_unit(rng));
            let speed = 12.0 + rng.f32() * 0.1;

            let particle = Particle::with_constants(
                center + offset,
                color,
                Category::Atmosphere,
                self.atmosphere_constants,
                rng.u64(..),
            )
            .with_velocity(outward * speed)
            .with_vortex(100.0 + rng.f32() * 0.04)
            .with_temperature(500.0 + energy * 0.8)
            .with_opacity(0.7 + rng.f32() * 0.3);
            self.atmosphere.push(particle);
        }

        if count > 0 {
            log::debug!(
                "spawned {} debris particles, atmosphere now {}",
                count,
                self.atmosphere.len()
            );
        }
        &self.atmosphere[start..]
    }

    /// Point lights for the hottest particles.
    pub fn derive_lights(&self, max_count: usize, heat_threshold: f32) -> Vec<LightSource> {
        lights::derive_lights(self.particles(), max_count, heat_threshold)
    }

    /// Restores every generated particle to rest and drops spawned debris.
    pub fn reset(&mut self) {
        let spawned = self.atmosphere.len() - self.generated_atmosphere;
        self.atmosphere.truncate(self.generated_atmosphere);
        for_each_particle(&mut self.surface, self.parallel, Particle::reset);
        for_each_particle(&mut self.atmosphere, self.parallel, Particle::reset);
        self.gravity_center = Vec3::zero();

        log::info!("field reset, {} debris particles dropped", spawned);
    }

    pub fn statistics(&self) -> Statistics {
        let mut stats = Statistics {
            max_temperature: crate::particle::AMBIENT_TEMPERATURE,
            surface_count: self.surface.len(),
            atmosphere_count: self.atmosphere.len(),
            total_count: self.len(),
            ..Statistics::default()
        };
        for p in self.particles() {
            stats.destroyed_count += p.is_destroyed() as usize;
            stats.flying_count += p.is_flying() as usize;
            stats.orbiting_count += p.is_orbiting() as usize;
            stats.max_temperature = stats.max_temperature.max(p.temperature());
        }
        stats
    }
}

fn for_each_particle<F>(particles: &mut [Particle], parallel: bool, f: F)
where
    F: Fn(&mut Particle) + Send + Sync,
{
    if parallel {
        particles.par_iter_mut().for_each(f);
    } else {
        particles.iter_mut().for_each(f);
    }
}

/// One category's view of a blast.
struct Blast {
    point: Vec3,
    radius: f32,
    energy: f32,
    body_radius: f32,
}

impl Blast {
    /// Applies the blast to `p`; returns whether it was inside the radius.
    fn hit(&self, p: &mut Particle) -> bool {
        let offset = p.position - self.point;
        let distance = offset.mag();
        if distance > self.radius {
            return false;
        }

        let intensity = ((self.radius - distance) / self.radius).max(0.0);
        let temperature = (4000.0 + self.energy * 3.0) * intensity;

        let direction = blast_direction(p.position, offset, p.rng());
        let magnitude = intensity.powf(0.7)
            * self.energy
            * p.constants().blast_force
            * (0.5 + p.rng().f32());
        p.destroy(direction * magnitude, temperature);

        if p.category() == Category::Atmosphere && distance < self.radius * 0.7 {
            p.vortex_strength = intensity * 0.03;
            p.vortex_age = 0.0;
        }

        // Seed debris rings away from the blast core.
        if p.position.mag() > self.body_radius
            && distance > self.radius * 0.3
            && p.rng().f32() < 0.4
        {
            let speed = intensity * 0.02 * (0.7 + p.rng().f32() * 0.6);
            p.orbital_kick(Vec3::one(), speed);
        }

        true
    }
}

/// Ejection direction for a particle at `position`, `offset` away from the impact.
///
/// Mostly along the local surface (80%) with a lift-off component (20%).
fn blast_direction(position: Vec3, offset: Vec3, rng: &mut fastrand::Rng) -> Vec3 {
    if offset.mag() <= utils::EPSILON {
        return utils::random_unit(rng);
    }
    let Some(normal) = utils::try_normalized(position) else {
        return utils::try_normalized(offset).unwrap_or_else(|| utils::random_unit(rng));
    };

    let tangential = offset - normal * offset.dot(normal);
    let direction = match utils::try_normalized(tangential) {
        Some(t) => t * 0.8 + normal * 0.2,
        None => normal,
    };
    utils::try_normalized(direction).unwrap_or_else(|| utils::random_unit(rng))
}
