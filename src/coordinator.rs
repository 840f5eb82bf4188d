use crate::{
    buffers::{BufferSync, RenderBuffers},
    clock::{Clock, SystemClock},
    config::{CoordinatorConfig, SimConfig},
    error::{Result, SimError},
    field::{ParticleField, Statistics},
    impactor::{ImpactDescriptor, Impactor, Material},
    lights::LightSource,
    utils,
};

use std::time::{Duration, Instant};
use ultraviolet::Vec3;

pub type ImpactorId = u64;

/// A request to fire an impactor at the body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaunchRequest {
    /// Direction from the body center to the impact site; need not be unit length.
    pub target_direction: Vec3,
    pub size: f32,
    /// Speed magnitude; the impactor always flies inbound.
    pub speed: f32,
    pub material: Material,
}

/// Lifecycle of a tracked impactor. Removed impactors are dropped entirely.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImpactorState {
    Inflight,
    /// First impact seen; removal is due at `remove_at` (wall clock).
    /// `None` when the delay is too large to represent, in which case only
    /// `cancel` or `reset` removes it.
    Impacted { remove_at: Option<Instant> },
}

#[derive(Debug)]
struct Tracked {
    id: ImpactorId,
    impactor: Impactor,
    state: ImpactorState,
}

/// Statistics for telemetry display.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimulationStats {
    pub field: Statistics,
    pub active_impactors: usize,
    pub total_launched: u64,
}

/// Drives a [`ParticleField`] and its impactors one frame at a time.
pub struct ImpactCoordinator<C: Clock = SystemClock> {
    field: ParticleField,
    impactors: Vec<Tracked>,
    config: CoordinatorConfig,
    pub gravity_enabled: bool,
    /// Forwarded to the renderer; the atmosphere is simulated either way.
    pub atmosphere_enabled: bool,
    pub blast_radius_scale: f32,
    lights: Vec<LightSource>,
    buffers: RenderBuffers,
    last_impacts: Vec<ImpactDescriptor>,
    clock: C,
    frame: u64,
    next_id: ImpactorId,
    total_launched: u64,
}

impl<C: Clock> std::fmt::Debug for ImpactCoordinator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImpactCoordinator")
            .field("field", &self.field)
            .field("impactors", &self.impactors)
            .field("gravity_enabled", &self.gravity_enabled)
            .field("atmosphere_enabled", &self.atmosphere_enabled)
            .field("blast_radius_scale", &self.blast_radius_scale)
            .field("frame", &self.frame)
            .finish()
    }
}

impl ImpactCoordinator<SystemClock> {
    pub fn new(config: &SimConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> ImpactCoordinator<C> {
    pub fn with_clock(config: &SimConfig, clock: C) -> Result<Self> {
        let field = ParticleField::new(&config.field)?;
        Ok(Self::with_field(field, config.coordinator.clone(), clock))
    }

    pub fn with_field(field: ParticleField, config: CoordinatorConfig, clock: C) -> Self {
        let mut buffers = RenderBuffers::default();
        buffers.sync(&field);

        Self {
            field,
            impactors: Vec::new(),
            gravity_enabled: config.gravity_enabled,
            atmosphere_enabled: config.atmosphere_enabled,
            blast_radius_scale: config.blast_radius_scale,
            config,
            lights: Vec::new(),
            buffers,
            last_impacts: Vec::new(),
            clock,
            frame: 0,
            next_id: 0,
            total_launched: 0,
        }
    }

    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut ParticleField {
        &mut self.field
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn buffers(&self) -> &RenderBuffers {
        &self.buffers
    }

    pub fn lights(&self) -> &[LightSource] {
        &self.lights
    }

    /// Impacts resolved during the last [`Self::tick`].
    pub fn last_impacts(&self) -> &[ImpactDescriptor] {
        &self.last_impacts
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn impactors(&self) -> impl Iterator<Item = (ImpactorId, &Impactor, ImpactorState)> {
        self.impactors.iter().map(|t| (t.id, &t.impactor, t.state))
    }

    pub fn impactor(&self, id: ImpactorId) -> Option<&Impactor> {
        self.impactors.iter().find(|t| t.id == id).map(|t| &t.impactor)
    }

    /// Spawns an impactor `launch_distance` out along the target direction.
    pub fn launch(&mut self, request: LaunchRequest) -> Result<ImpactorId> {
        let direction = match validate(&request) {
            Ok(direction) => direction,
            Err(err) => {
                log::warn!("rejected launch: {}", err);
                return Err(err);
            }
        };

        let impactor = Impactor::new(
            request.size,
            -request.speed.abs(),
            request.material,
            direction * self.config.launch_distance,
            direction,
            self.field.body_radius(),
        );

        let id = self.next_id;
        self.next_id += 1;
        self.total_launched += 1;
        self.impactors.push(Tracked {
            id,
            impactor,
            state: ImpactorState::Inflight,
        });

        log::info!(
            "launched impactor {} toward {:?} (size {}, speed {}, {:?})",
            id,
            direction,
            request.size,
            request.speed,
            request.material
        );
        Ok(id)
    }

    /// Removes an impactor immediately.
    pub fn cancel(&mut self, id: ImpactorId) -> Result<()> {
        let index = self
            .impactors
            .iter()
            .position(|t| t.id == id)
            .ok_or(SimError::UnknownImpactor(id))?;
        self.impactors.remove(index);
        log::debug!("cancelled impactor {}", id);
        Ok(())
    }

    /// Runs one frame.
    /// 1. Drops impactors whose post-impact delay has elapsed.
    /// 2. Advances every active impactor, collects impacts and drops escaped ones.
    /// 3. Applies the blasts and debris, then advances the field.
    /// 4. Refreshes lights and render buffers.
    pub fn tick(&mut self, dt: f32, time_scale: f32) -> BufferSync {
        let now = self.clock.now();
        self.remove_expired(now);

        let delay = Duration::from_millis(self.config.removal_delay_ms);
        let mut impacts = Vec::new();
        for tracked in &mut self.impactors {
            if !tracked.impactor.is_active() {
                continue;
            }
            if let Some(descriptor) = tracked.impactor.advance(time_scale, &self.field) {
                if tracked.state == ImpactorState::Inflight {
                    tracked.state = ImpactorState::Impacted {
                        remove_at: now.checked_add(delay),
                    };
                }
                impacts.push((tracked.id, descriptor, tracked.impactor.speed));
            }
        }

        self.remove_escaped();

        self.last_impacts.clear();
        for (id, descriptor, speed) in impacts {
            self.resolve_impact(id, &descriptor, speed);
            self.last_impacts.push(descriptor);
        }

        self.field.advance(dt, self.gravity_enabled, time_scale);

        if self.frame % self.config.light_interval.max(1) == 0 {
            self.lights = self
                .field
                .derive_lights(self.config.max_lights, self.config.heat_threshold);
        }
        self.frame += 1;

        self.buffers.sync(&self.field)
    }

    fn resolve_impact(&mut self, id: ImpactorId, impact: &ImpactDescriptor, speed: f32) {
        let radius = self.blast_radius_scale * Impactor::scaled_blast_radius(impact.radius, speed);
        let hit = self
            .field
            .apply_blast(impact.point, radius, impact.energy, impact.is_secondary);

        if impact.is_secondary {
            log::debug!(
                "impactor {} grazed the field: energy {}, blast radius {}, {} particles hit",
                id,
                impact.energy,
                radius,
                hit
            );
            return;
        }

        let requested = ((impact.energy * self.config.debris_per_energy).max(0.0) as usize)
            .min(self.config.max_debris_request);
        let spawned = self
            .field
            .spawn_debris(impact.point, impact.energy, requested)
            .len();

        log::info!(
            "impactor {} hit at {:?}: energy {}, blast radius {}, {} particles hit, {} debris",
            id,
            impact.point,
            impact.energy,
            radius,
            hit,
            spawned
        );
    }

    fn remove_expired(&mut self, now: Instant) {
        self.impactors.retain(|t| match t.state {
            ImpactorState::Impacted {
                remove_at: Some(remove_at),
            } if now >= remove_at => {
                log::debug!("removed impactor {}", t.id);
                false
            }
            _ => true,
        });
    }

    /// Drops in-flight impactors that are flying away beyond the launch distance.
    fn remove_escaped(&mut self) {
        let limit = self.config.launch_distance;
        self.impactors.retain(|t| {
            let escaped = t.impactor.is_active()
                && t.impactor.is_receding()
                && t.impactor.position.mag() > limit;
            if escaped {
                log::debug!("impactor {} left the scene at {:?}", t.id, t.impactor.position);
            }
            !escaped
        });
    }

    /// Drops every impactor and restores the field to its generated state.
    pub fn reset(&mut self) {
        self.impactors.clear();
        self.field.reset();
        self.lights.clear();
        self.last_impacts.clear();
        self.frame = 0;
        self.total_launched = 0;
        self.buffers.sync(&self.field);
    }

    /// Regenerates the field with new population sizes.
    pub fn regenerate(&mut self, surface_count: usize, atmosphere_count: usize) {
        self.impactors.clear();
        self.field.generate(surface_count, atmosphere_count);
        self.lights.clear();
        self.last_impacts.clear();
        self.buffers.sync(&self.field);
    }

    pub fn stats(&self) -> SimulationStats {
        SimulationStats {
            field: self.field.statistics(),
            active_impactors: self
                .impactors
                .iter()
                .filter(|t| t.impactor.is_active())
                .count(),
            total_launched: self.total_launched,
        }
    }
}

fn validate(request: &LaunchRequest) -> Result<Vec3> {
    if !(request.size.is_finite() && request.size > 0.0) {
        return Err(SimError::InvalidLaunch(format!(
            "size must be positive, got {}",
            request.size
        )));
    }
    if !request.speed.is_finite() {
        return Err(SimError::InvalidLaunch(format!(
            "speed must be finite, got {}",
            request.speed
        )));
    }
    utils::try_normalized(request.target_direction).ok_or_else(|| {
        SimError::InvalidLaunch(format!(
            "target direction {:?} has no direction",
            request.target_direction
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::FieldConfig;

    fn coordinator(surface: usize, atmosphere: usize) -> ImpactCoordinator<ManualClock> {
        let config = SimConfig {
            field: FieldConfig {
                surface_count: surface,
                atmosphere_count: atmosphere,
                seed: 11,
                ..FieldConfig::default()
            },
            ..SimConfig::default()
        };
        ImpactCoordinator::with_clock(&config, ManualClock::new()).unwrap()
    }

    fn request() -> LaunchRequest {
        LaunchRequest {
            target_direction: Vec3::new(0.0, 0.0, 2.0),
            size: 1.0,
            speed: 25.0,
            material: Material::Stone,
        }
    }

    #[test]
    fn launch_places_impactor_out_along_direction() {
        let mut sim = coordinator(0, 0);
        let id = sim.launch(request()).unwrap();
        let impactor = sim.impactor(id).unwrap();
        assert_eq!(impactor.position, Vec3::new(0.0, 0.0, 30.0));
        assert!(impactor.velocity.z < 0.0);
        assert_eq!(sim.stats().total_launched, 1);
        assert_eq!(sim.stats().active_impactors, 1);
    }

    #[test]
    fn rejects_degenerate_launches() {
        let mut sim = coordinator(0, 0);
        let zero = LaunchRequest {
            target_direction: Vec3::zero(),
            ..request()
        };
        assert!(matches!(sim.launch(zero), Err(SimError::InvalidLaunch(_))));
        let tiny = LaunchRequest {
            size: 0.0,
            ..request()
        };
        assert!(sim.launch(tiny).is_err());
        let wild = LaunchRequest {
            speed: f32::NAN,
            ..request()
        };
        assert!(sim.launch(wild).is_err());
        assert_eq!(sim.stats().total_launched, 0);
    }

    #[test]
    fn cancel_removes_immediately() {
        let mut sim = coordinator(0, 0);
        let id = sim.launch(request()).unwrap();
        sim.cancel(id).unwrap();
        assert!(sim.impactor(id).is_none());
        assert!(matches!(sim.cancel(id), Err(SimError::UnknownImpactor(_))));
    }

    #[test]
    fn impacted_impactor_is_removed_after_wall_clock_delay() {
        let mut sim = coordinator(0, 0);
        let id = sim.launch(request()).unwrap();

        let mut frames = 0;
        while sim.last_impacts().is_empty() {
            sim.tick(0.016, 1.0);
            frames += 1;
            assert!(frames < 200, "impactor never hit");
        }
        assert!(!sim.last_impacts()[0].is_secondary);
        assert!(matches!(
            sim.impactors().next().map(|(_, _, state)| state),
            Some(ImpactorState::Impacted { .. })
        ));

        // Simulation time alone does not remove it.
        for _ in 0..100 {
            sim.tick(0.016, 10.0);
        }
        assert!(sim.impactor(id).is_some());
        assert_eq!(sim.stats().active_impactors, 0);

        sim.clock().advance(Duration::from_millis(999));
        sim.tick(0.016, 1.0);
        assert!(sim.impactor(id).is_some());

        sim.clock().advance(Duration::from_millis(1));
        sim.tick(0.016, 1.0);
        assert!(sim.impactor(id).is_none());
    }

    #[test]
    fn high_time_scale_still_impacts_and_expires() {
        let mut sim = coordinator(2000, 1000);
        let id = sim.launch(LaunchRequest {
            speed: 20.0,
            ..request()
        })
        .unwrap();

        let mut primaries = 0;
        for _ in 0..20 {
            sim.tick(0.016, 100.0);
            primaries += sim.last_impacts().iter().filter(|i| !i.is_secondary).count();
            sim.clock().advance(Duration::from_millis(100));
        }

        assert_eq!(primaries, 1);
        assert!(sim.impactor(id).is_none());
        assert!(sim.stats().field.destroyed_count > 0);
        assert_eq!(sim.field().spawned().len(), 100);
    }

    #[test]
    fn receding_impactor_beyond_launch_distance_is_dropped() {
        let mut sim = coordinator(0, 0);
        let direction = Vec3::unit_z();
        sim.impactors.push(Tracked {
            id: 7,
            impactor: Impactor::new(1.0, 25.0, Material::Stone, direction * 31.0, direction, 5.0),
            state: ImpactorState::Inflight,
        });
        sim.tick(0.016, 1.0);
        assert!(sim.impactor(7).is_none());
    }

    #[test]
    fn oversized_removal_delay_does_not_panic() {
        let config = SimConfig {
            field: FieldConfig {
                surface_count: 0,
                atmosphere_count: 0,
                ..FieldConfig::default()
            },
            coordinator: CoordinatorConfig {
                removal_delay_ms: u64::MAX,
                ..CoordinatorConfig::default()
            },
        };
        let field = ParticleField::new(&config.field).unwrap();
        let mut sim = ImpactCoordinator::with_field(field, config.coordinator, ManualClock::new());
        let id = sim.launch(request()).unwrap();
        for _ in 0..100 {
            sim.tick(0.016, 1.0);
        }
        assert!(sim.impactor(id).is_some_and(|i| i.has_impacted()));
        sim.cancel(id).unwrap();
    }

    #[test]
    fn primary_impact_destroys_and_spawns_debris() {
        let mut sim = coordinator(1000, 500);
        sim.launch(request()).unwrap();
        let mut primary = None;
        for _ in 0..200 {
            sim.tick(0.016, 1.0);
            if let Some(hit) = sim.last_impacts().iter().find(|i| !i.is_secondary) {
                primary = Some(*hit);
                break;
            }
        }
        let primary = primary.expect("no primary impact");
        assert_eq!(primary.energy, 2500.0);
        let stats = sim.stats();
        assert!(stats.field.destroyed_count > 0);
        assert_eq!(sim.field().spawned().len(), 100);
        assert_eq!(sim.buffers().atmosphere_len(), sim.field().atmosphere().len());
    }

    #[test]
    fn reset_clears_impactors_and_debris() {
        let mut sim = coordinator(300, 100);
        sim.launch(request()).unwrap();
        for _ in 0..80 {
            sim.tick(0.016, 1.0);
        }
        sim.reset();
        let stats = sim.stats();
        assert_eq!(stats.active_impactors, 0);
        assert_eq!(stats.total_launched, 0);
        assert_eq!(stats.field.destroyed_count, 0);
        assert_eq!(stats.field.atmosphere_count, 100);
        assert_eq!(sim.buffers().atmosphere_len(), 100);
        assert!(sim.lights().is_empty());
    }

    #[test]
    fn regenerate_changes_population() {
        let mut sim = coordinator(100, 50);
        let version = sim.buffers().version;
        sim.regenerate(200, 10);
        assert_eq!(sim.field().surface().len(), 200);
        assert_eq!(sim.buffers().surface_len(), 200);
        assert!(sim.buffers().version > version);
    }

    #[test]
    fn settings_are_exposed() {
        let mut sim = coordinator(10, 10);
        assert!(sim.gravity_enabled);
        sim.gravity_enabled = false;
        sim.atmosphere_enabled = false;
        sim.blast_radius_scale = 2.0;
        sim.tick(0.016, 1.0);
        assert_eq!(sim.frame(), 1);
    }
}
