pub mod buffers;
pub mod c_api;
pub mod clock;
pub mod color;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod field;
pub mod impactor;
pub mod lights;
pub mod particle;
pub mod utils;

pub use buffers::{BufferSync, RenderBuffers};
pub use clock::{Clock, ManualClock, SystemClock};
pub use color::{ColorSource, EquirectangularMap, ProceduralColors, Rgb};
pub use config::{ConstantsOverride, CoordinatorConfig, FieldConfig, SimConfig};
pub use coordinator::{ImpactCoordinator, ImpactorId, ImpactorState, LaunchRequest, SimulationStats};
pub use error::{Result, SimError};
pub use field::{ParticleField, Statistics};
pub use impactor::{ImpactDescriptor, Impactor, Material};
pub use lights::LightSource;
pub use particle::{Category, CategoryConstants, Particle, Shell};
pub use ultraviolet;
