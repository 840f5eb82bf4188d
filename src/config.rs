//! Runtime configuration loaded from TOML.
//!
//! Every section is `#[serde(default)]`, so a file only needs the values it
//! overrides. Defaults mirror the constants in [`crate::particle`] and
//! [`crate::field`].
//!
//! ```toml
//! [field]
//! surface_count = 20000
//! atmosphere_count = 8000
//! seed = 7
//!
//! [field.atmosphere]
//! cooling_rate = 0.995
//!
//! [coordinator]
//! blast_radius_scale = 1.5
//! ```

use crate::error::{Result, SimError};
use crate::particle::{CategoryConstants, Shell};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub field: FieldConfig,
    pub coordinator: CoordinatorConfig,
}

impl SimConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SimConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::info!("loaded simulation config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.field.validate()
    }
}

/// Particle field layout and physics.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub surface_count: usize,
    pub atmosphere_count: usize,
    pub body_radius: f32,
    pub atmosphere_radius: f32,
    /// Height above the body where atmosphere particles are pulled back.
    pub atmosphere_thickness: f32,
    pub rotation_radius: f32,
    pub rotation_speed: f32,
    /// Pull on surface particles when gravity is enabled.
    pub gravity_strength: f32,
    /// Atmosphere pull relative to `gravity_strength`.
    pub atmosphere_gravity_ratio: f32,
    pub seed: u64,
    /// Use Rayon for the per-particle passes.
    pub parallel: bool,
    pub surface: ConstantsOverride,
    pub atmosphere: ConstantsOverride,
}

impl Default for FieldConfig {
    fn default() -> Self {
        let shell = Shell::default();
        Self {
            surface_count: 60_000,
            atmosphere_count: 30_000,
            body_radius: shell.body_radius,
            atmosphere_radius: 7.0,
            atmosphere_thickness: shell.atmosphere_thickness,
            rotation_radius: shell.rotation_radius,
            rotation_speed: shell.rotation_speed,
            gravity_strength: 0.3,
            atmosphere_gravity_ratio: 0.3,
            seed: 0,
            parallel: true,
            surface: ConstantsOverride::default(),
            atmosphere: ConstantsOverride::default(),
        }
    }
}

impl FieldConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.body_radius.is_finite() && self.body_radius > 0.0) {
            return Err(SimError::InvalidRadius(self.body_radius));
        }
        if !(self.atmosphere_radius.is_finite() && self.atmosphere_radius > self.body_radius)
            || !(self.atmosphere_thickness > 0.0)
        {
            return Err(SimError::InvalidShell {
                body: self.body_radius,
                atmosphere: self.atmosphere_radius,
            });
        }
        Ok(())
    }

    pub fn shell(&self) -> Shell {
        Shell {
            body_radius: self.body_radius,
            atmosphere_thickness: self.atmosphere_thickness,
            rotation_radius: self.rotation_radius,
            rotation_speed: self.rotation_speed,
        }
    }

    pub fn surface_constants(&self) -> CategoryConstants {
        self.surface.apply(CategoryConstants::SURFACE)
    }

    pub fn atmosphere_constants(&self) -> CategoryConstants {
        self.atmosphere.apply(CategoryConstants::ATMOSPHERE)
    }
}

/// Partial override of a category's constants; unset values keep the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConstantsOverride {
    pub mass: Option<f32>,
    pub damping_base: Option<f32>,
    pub damping_spread: Option<f32>,
    pub destroyed_damping: Option<f32>,
    pub cooling_rate: Option<f32>,
    pub opacity: Option<f32>,
    pub radius: Option<f32>,
    pub fast_drag: Option<f32>,
    pub destroyed_gravity_scale: Option<f32>,
    pub blast_force: Option<f32>,
    pub blast_radius_scale: Option<f32>,
    pub blast_energy_scale: Option<f32>,
}

impl ConstantsOverride {
    pub fn apply(&self, base: CategoryConstants) -> CategoryConstants {
        CategoryConstants {
            mass: self.mass.unwrap_or(base.mass),
            damping_base: self.damping_base.unwrap_or(base.damping_base),
            damping_spread: self.damping_spread.unwrap_or(base.damping_spread),
            destroyed_damping: self.destroyed_damping.unwrap_or(base.destroyed_damping),
            cooling_rate: self.cooling_rate.unwrap_or(base.cooling_rate),
            opacity: self.opacity.unwrap_or(base.opacity),
            radius: self.radius.unwrap_or(base.radius),
            fast_drag: self.fast_drag.unwrap_or(base.fast_drag),
            destroyed_gravity_scale: self
                .destroyed_gravity_scale
                .unwrap_or(base.destroyed_gravity_scale),
            blast_force: self.blast_force.unwrap_or(base.blast_force),
            blast_radius_scale: self.blast_radius_scale.unwrap_or(base.blast_radius_scale),
            blast_energy_scale: self.blast_energy_scale.unwrap_or(base.blast_energy_scale),
        }
    }
}

/// Frame orchestration and impact handling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub gravity_enabled: bool,
    /// Renderer-side visibility only; atmosphere physics always runs.
    pub atmosphere_enabled: bool,
    pub blast_radius_scale: f32,
    /// Wall-clock time an impactor lingers after its first impact.
    pub removal_delay_ms: u64,
    /// Distance from the body center at which impactors are launched.
    pub launch_distance: f32,
    pub max_lights: usize,
    pub heat_threshold: f32,
    /// Lights are re-derived every this many frames.
    pub light_interval: u64,
    /// Debris requested per unit of primary impact energy.
    pub debris_per_energy: f32,
    pub max_debris_request: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            gravity_enabled: true,
            atmosphere_enabled: true,
            blast_radius_scale: 1.0,
            removal_delay_ms: 1000,
            launch_distance: 30.0,
            max_lights: 10,
            heat_threshold: 800.0,
            light_interval: 3,
            debris_per_energy: 0.05,
            max_debris_request: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = SimConfig::from_toml_str("").unwrap();
        assert_eq!(config.field.surface_count, 60_000);
        assert_eq!(config.field.atmosphere_count, 30_000);
        assert_eq!(config.coordinator.removal_delay_ms, 1000);
        assert_eq!(config.field.atmosphere_constants(), CategoryConstants::ATMOSPHERE);
    }

    #[test]
    fn partial_category_override_keeps_other_constants() {
        let config = SimConfig::from_toml_str(
            r#"
            [field]
            surface_count = 10
            seed = 9

            [field.atmosphere]
            cooling_rate = 0.99

            [coordinator]
            blast_radius_scale = 2.0
            "#,
        )
        .unwrap();
        assert_eq!(config.field.surface_count, 10);
        assert_eq!(config.field.atmosphere_count, 30_000);
        let atmosphere = config.field.atmosphere_constants();
        assert_eq!(atmosphere.cooling_rate, 0.99);
        assert_eq!(atmosphere.mass, 0.1);
        assert_eq!(config.field.surface_constants(), CategoryConstants::SURFACE);
        assert_eq!(config.coordinator.blast_radius_scale, 2.0);
    }

    #[test]
    fn rejects_inverted_shell() {
        let err = SimConfig::from_toml_str("[field]\nbody_radius = 8.0\n").unwrap_err();
        assert!(matches!(err, SimError::InvalidShell { .. }));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = SimConfig::from_toml_str("[field\n").unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = SimConfig::load("/nonexistent/impact-sim.toml").unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
    }
}
