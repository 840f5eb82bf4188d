use crate::color::{self, Rgb};
use crate::utils;
use ultraviolet::Vec3;

/// Ambient temperature; particles never cool below it.
pub const AMBIENT_TEMPERATURE: f32 = 20.0;
/// Speed above which a particle counts as flying.
pub const FLYING_SPEED: f32 = 0.01;
/// Speed above which the category's fast drag kicks in.
pub const FAST_SPEED: f32 = 0.3;
/// Destroyed particles closer than this to the center get no orbital kick.
pub const ORBIT_KICK_MIN_RADIUS: f32 = 3.0;
/// Gravity is skipped inside this distance.
pub const MIN_GRAVITY_DISTANCE: f32 = 0.1;
/// Vortex strength and age of a fresh particle. Destroyed atmosphere swirls
/// with it unless a blast seeds a new strength.
pub const RESTING_VORTEX: f32 = 1.0;

/// Which population a particle belongs to. Fixed at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Surface,
    Atmosphere,
}

impl Category {
    /// Default physical constants for the category.
    pub const fn constants(self) -> CategoryConstants {
        match self {
            Category::Surface => CategoryConstants::SURFACE,
            Category::Atmosphere => CategoryConstants::ATMOSPHERE,
        }
    }
}

/// Per-category physical constants. Copied into each particle at creation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CategoryConstants {
    pub mass: f32,
    /// Lower bound of the per-particle damping used while intact.
    pub damping_base: f32,
    /// Width of the random damping range above `damping_base`.
    pub damping_spread: f32,
    /// Velocity factor applied every update once destroyed.
    pub destroyed_damping: f32,
    /// Temperature factor per simulated second.
    pub cooling_rate: f32,
    pub opacity: f32,
    /// Collision radius.
    pub radius: f32,
    /// Fraction of velocity kept per update above [`FAST_SPEED`].
    pub fast_drag: f32,
    /// Scale on the central pull felt by destroyed particles.
    pub destroyed_gravity_scale: f32,
    /// Base impulse per unit of blast energy.
    pub blast_force: f32,
    pub blast_radius_scale: f32,
    pub blast_energy_scale: f32,
}

impl CategoryConstants {
    pub const SURFACE: Self = Self {
        mass: 2.0,
        damping_base: 0.3,
        damping_spread: 0.15,
        destroyed_damping: 0.2,
        cooling_rate: 0.998,
        opacity: 1.0,
        radius: 0.15,
        fast_drag: 1.0,
        destroyed_gravity_scale: 1.0,
        blast_force: 0.0008,
        blast_radius_scale: 1.0,
        blast_energy_scale: 1.0,
    };

    pub const ATMOSPHERE: Self = Self {
        mass: 0.1,
        damping_base: 0.1,
        damping_spread: 0.15,
        destroyed_damping: 0.999,
        cooling_rate: 0.997,
        opacity: 0.8,
        radius: 0.1,
        fast_drag: 0.95,
        destroyed_gravity_scale: 0.001,
        blast_force: 0.0015,
        blast_radius_scale: 1.5,
        blast_energy_scale: 0.3,
    };
}

/// Geometry of the body the particles belong to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shell {
    pub body_radius: f32,
    /// Height above `body_radius` where the atmosphere pull-back starts.
    pub atmosphere_thickness: f32,
    /// Reference radius for the height-dependent atmospheric spin.
    pub rotation_radius: f32,
    /// Spin rate (radians per simulated second) at `rotation_radius`.
    pub rotation_speed: f32,
}

impl Default for Shell {
    fn default() -> Self {
        Self {
            body_radius: 5.0,
            atmosphere_thickness: 100.0,
            rotation_radius: 6.0,
            rotation_speed: 0.015,
        }
    }
}

/// A single simulated unit of mass of the surface or the atmosphere.
#[derive(Clone, Debug)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub color: Rgb,
    /// Only meaningful for atmosphere particles.
    pub opacity: f32,
    /// Post-blast rotational perturbation; decays toward zero.
    pub vortex_strength: f32,
    pub vortex_age: f32,
    rest_position: Vec3,
    rest_color: Rgb,
    rest_opacity: f32,
    category: Category,
    constants: CategoryConstants,
    /// Per-particle damping used while intact.
    damping: f32,
    temperature: f32,
    emissive: f32,
    destroyed: bool,
    flying: bool,
    orbiting: bool,
    rng: fastrand::Rng,
}

impl Particle {
    /// Creates a resting particle with the category's default constants.
    pub fn new(position: Vec3, color: Rgb, category: Category, seed: u64) -> Self {
        Self::with_constants(position, color, category, category.constants(), seed)
    }

    pub fn with_constants(
        position: Vec3,
        color: Rgb,
        category: Category,
        constants: CategoryConstants,
        seed: u64,
    ) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let damping = constants.damping_base + constants.damping_spread * rng.f32();
        Self {
            position,
            velocity: Vec3::zero(),
            color,
            opacity: constants.opacity,
            vortex_strength: RESTING_VORTEX,
            vortex_age: RESTING_VORTEX,
            rest_position: position,
            rest_color: color,
            rest_opacity: constants.opacity,
            category,
            constants,
            damping,
            temperature: AMBIENT_TEMPERATURE,
            emissive: 0.0,
            destroyed: false,
            flying: false,
            orbiting: false,
            rng,
        }
    }

    /// Sets both the current and the rest opacity.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self.rest_opacity = opacity;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.max(AMBIENT_TEMPERATURE);
        self
    }

    pub fn with_vortex(mut self, strength: f32) -> Self {
        self.vortex_strength = strength;
        self.vortex_age = 0.0;
        self
    }

    pub fn orbiting(mut self, orbiting: bool) -> Self {
        self.orbiting = orbiting;
        self
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn constants(&self) -> &CategoryConstants {
        &self.constants
    }

    pub fn mass(&self) -> f32 {
        self.constants.mass
    }

    pub fn radius(&self) -> f32 {
        self.constants.radius
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn emissive(&self) -> f32 {
        self.emissive
    }

    pub fn rest_position(&self) -> Vec3 {
        self.rest_position
    }

    pub fn rest_color(&self) -> Rgb {
        self.rest_color
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn is_flying(&self) -> bool {
        self.flying
    }

    pub fn is_orbiting(&self) -> bool {
        self.orbiting
    }

    pub(crate) fn rng(&mut self) -> &mut fastrand::Rng {
        &mut self.rng
    }

    /// Advances the particle by `dt * time_scale` simulated seconds.
    ///
    /// `gravity_center` is the smoothed center from the previous frame and
    /// `gravity_strength` is zero when gravity is disabled.
    pub fn update(
        &mut self,
        dt: f32,
        gravity_center: Vec3,
        gravity_strength: f32,
        time_scale: f32,
        shell: &Shell,
    ) {
        let dt = dt * time_scale;

        if self.category == Category::Atmosphere {
            self.apply_rotation(dt, shell);
            self.apply_atmospheric_gravity(gravity_center, gravity_strength, dt, shell);
            if self.destroyed {
                self.apply_vortex(dt);
            }
        }

        self.position += self.velocity * dt;

        if self.destroyed && gravity_strength > 0.0 {
            let to_center = gravity_center - self.position;
            let distance = to_center.mag();
            if distance > MIN_GRAVITY_DISTANCE {
                let force = gravity_strength / (distance * distance).max(1.0)
                    * self.constants.mass
                    * self.constants.destroyed_gravity_scale;
                self.velocity += to_center / distance * (force * dt);
            }
        }

        if self.destroyed {
            self.velocity *= self.constants.destroyed_damping;
            let kick = self.jitter(0.02);
            self.velocity += kick;
        } else {
            self.velocity *= self.damping;
        }

        self.temperature = (self.temperature * self.constants.cooling_rate.powf(dt))
            .max(AMBIENT_TEMPERATURE);

        let speed = self.velocity.mag();
        if speed > FAST_SPEED {
            self.velocity *= self.constants.fast_drag;
        }
        self.flying = speed > FLYING_SPEED;

        self.update_color();
    }

    /// Spins position and velocity about the Y axis; slower higher up.
    fn apply_rotation(&mut self, dt: f32, shell: &Shell) {
        let height = (self.position.mag() - shell.rotation_radius).max(0.0);
        let angle = shell.rotation_speed * (-height * 0.1).exp() * dt;
        self.position = utils::rotate_y(self.position, angle);
        self.velocity = utils::rotate_y(self.velocity, angle);

        if self.rng.f32() < 0.01 {
            let kick = self.jitter(0.001);
            self.velocity += kick;
        }
    }

    fn apply_atmospheric_gravity(
        &mut self,
        gravity_center: Vec3,
        gravity_strength: f32,
        dt: f32,
        shell: &Shell,
    ) {
        let to_center = gravity_center - self.position;
        let distance = to_center.mag();
        let outer = shell.body_radius + shell.atmosphere_thickness;

        let force = if distance > outer {
            gravity_strength * 2.0 * (1.0 + distance - outer)
        } else if distance > shell.body_radius {
            let height = (distance - shell.body_radius) / shell.atmosphere_thickness;
            gravity_strength * (1.0 - height * 0.5)
        } else {
            return;
        };

        self.velocity += to_center / distance * (force * self.constants.mass * dt);
    }

    fn apply_vortex(&mut self, dt: f32) {
        if self.vortex_strength <= 0.0 {
            return;
        }

        if let Some(normal) = utils::try_normalized(self.position) {
            if let Some(tangential) = utils::try_normalized(Vec3::one().cross(normal)) {
                self.velocity += tangential * (self.vortex_strength * dt);
            }
        }
        let turbulence = self.jitter(self.vortex_strength * 0.1);
        self.velocity -= turbulence * dt;

        self.vortex_age += dt;
        self.vortex_strength *= 0.999;
        if self.vortex_strength < 0.001 {
            self.vortex_strength = 0.0;
        }
    }

    fn update_color(&mut self) {
        let base = if self.destroyed && self.category == Category::Surface {
            color::EMBER
        } else {
            self.rest_color
        };
        let (color, emissive) = color::heat_color(self.temperature, base);
        self.color = color;
        self.emissive = emissive;
    }

    /// Uniform vector in `[-amplitude/2, amplitude/2)^3`.
    fn jitter(&mut self, amplitude: f32) -> Vec3 {
        Vec3::new(
            (self.rng.f32() - 0.5) * amplitude,
            (self.rng.f32() - 0.5) * amplitude,
            (self.rng.f32() - 0.5) * amplitude,
        )
    }

    /// Marks the particle destroyed, heats it and applies `impact_force`.
    pub fn destroy(&mut self, impact_force: Vec3, temperature: f32) {
        self.destroyed = true;
        self.flying = true;
        self.temperature = self.temperature.max(temperature);
        self.velocity += impact_force;

        if self.position.mag() > ORBIT_KICK_MIN_RADIUS && self.rng.f32() < 0.4 {
            let axis = match utils::try_normalized(self.position) {
                Some(n) if n.y.abs() < 0.9 => Vec3::unit_y(),
                _ => Vec3::unit_x(),
            };
            let speed = 0.02 * (0.7 + self.rng.f32() * 0.6);
            self.orbital_kick(axis, speed);
        }
    }

    /// Adds a tangential velocity of `speed` around `axis`, in a random direction.
    pub fn orbital_kick(&mut self, axis: Vec3, speed: f32) {
        let Some(normal) = utils::try_normalized(self.position) else {
            return;
        };
        let Some(mut tangential) = utils::try_normalized(axis.cross(normal)) else {
            return;
        };
        if self.rng.bool() {
            tangential = -tangential;
        }
        self.velocity += tangential * speed;
        self.orbiting = true;
    }

    pub fn check_collision(&self, point: Vec3, radius: f32) -> bool {
        (self.position - point).mag() <= self.constants.radius + radius
    }

    /// Restores the rest state recorded at creation.
    pub fn reset(&mut self) {
        self.position = self.rest_position;
        self.velocity = Vec3::zero();
        self.temperature = AMBIENT_TEMPERATURE;
        self.destroyed = false;
        self.flying = false;
        self.orbiting = false;
        self.color = self.rest_color;
        self.opacity = self.rest_opacity;
        self.emissive = 0.0;
        self.vortex_strength = RESTING_VORTEX;
        self.vortex_age = RESTING_VORTEX;
    }
}
