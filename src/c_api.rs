use crate::{
    buffers::BufferSync,
    config::SimConfig,
    coordinator::{ImpactCoordinator, LaunchRequest},
    field::Statistics,
    impactor::Material,
    lights::LightSource,
};
use ultraviolet::Vec3;

pub type Coordinator = ImpactCoordinator;

/// Creates a coordinator with default settings and the given populations.
/// Returns null if the field cannot be generated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_Create(
    surface_count: usize,
    atmosphere_count: usize,
    seed: u64,
) -> *mut Coordinator {
    let mut config = SimConfig::default();
    config.field.surface_count = surface_count;
    config.field.atmosphere_count = atmosphere_count;
    config.field.seed = seed;

    match ImpactCoordinator::new(&config) {
        Ok(coordinator) => Box::into_raw(Box::new(coordinator)),
        Err(err) => {
            log::error!("failed to create coordinator: {}", err);
            std::ptr::null_mut()
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_Destroy(handle: *mut Coordinator) {
    if !handle.is_null() {
        unsafe { drop(Box::from_raw(handle)) };
    }
}

/// Runs one frame. Returns 1 if a particle population changed size and the
/// caller must refetch buffer pointers, 0 otherwise.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_Tick(handle: *mut Coordinator, dt: f32, time_scale: f32) -> u32 {
    match unsafe { handle.as_mut() } {
        Some(sim) => (sim.tick(dt, time_scale) == BufferSync::Resized) as u32,
        None => 0,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_Reset(handle: *mut Coordinator) {
    if let Some(sim) = unsafe { handle.as_mut() } {
        sim.reset();
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_Regenerate(
    handle: *mut Coordinator,
    surface_count: usize,
    atmosphere_count: usize,
) {
    if let Some(sim) = unsafe { handle.as_mut() } {
        sim.regenerate(surface_count, atmosphere_count);
    }
}

/// Launches an impactor toward `(dx, dy, dz)`. `material` is 0 stone,
/// 1 metal, 2 ice. Returns the impactor id, or -1 if the launch was rejected.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_Launch(
    handle: *mut Coordinator,
    dx: f32,
    dy: f32,
    dz: f32,
    size: f32,
    speed: f32,
    material: u32,
) -> i64 {
    let Some(sim) = (unsafe { handle.as_mut() }) else {
        return -1;
    };
    let request = LaunchRequest {
        target_direction: Vec3::new(dx, dy, dz),
        size,
        speed,
        material: Material::from_code(material),
    };
    sim.launch(request).map_or(-1, |id| id as i64)
}

/// Returns 1 if the impactor existed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_Cancel(handle: *mut Coordinator, id: u64) -> u32 {
    unsafe { handle.as_mut() }.map_or(0, |sim| sim.cancel(id).is_ok() as u32)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_SetGravityEnabled(handle: *mut Coordinator, enabled: bool) {
    if let Some(sim) = unsafe { handle.as_mut() } {
        sim.gravity_enabled = enabled;
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_SetAtmosphereEnabled(handle: *mut Coordinator, enabled: bool) {
    if let Some(sim) = unsafe { handle.as_mut() } {
        sim.atmosphere_enabled = enabled;
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_GetAtmosphereEnabled(handle: *const Coordinator) -> bool {
    unsafe { handle.as_ref() }.is_some_and(|sim| sim.atmosphere_enabled)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_SetBlastRadiusScale(handle: *mut Coordinator, scale: f32) {
    if let Some(sim) = unsafe { handle.as_mut() } {
        sim.blast_radius_scale = scale;
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_GetBufferVersion(handle: *const Coordinator) -> u64 {
    unsafe { handle.as_ref() }.map_or(0, |sim| sim.buffers().version)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_GetSurfaceCount(handle: *const Coordinator) -> usize {
    unsafe { handle.as_ref() }.map_or(0, |sim| sim.buffers().surface_len())
}

/// `3 * count` floats, `[x, y, z, ..]`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_GetSurfacePositions(handle: *const Coordinator) -> *const f32 {
    unsafe { handle.as_ref() }.map_or(std::ptr::null(), |sim| sim.buffers().surface_positions.as_ptr())
}

/// `3 * count` floats, `[r, g, b, ..]`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_GetSurfaceColors(handle: *const Coordinator) -> *const f32 {
    unsafe { handle.as_ref() }.map_or(std::ptr::null(), |sim| sim.buffers().surface_colors.as_ptr())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_GetSurfaceEmissive(handle: *const Coordinator) -> *const f32 {
    unsafe { handle.as_ref() }.map_or(std::ptr::null(), |sim| sim.buffers().surface_emissive.as_ptr())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_GetAtmosphereCount(handle: *const Coordinator) -> usize {
    unsafe { handle.as_ref() }.map_or(0, |sim| sim.buffers().atmosphere_len())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_GetAtmospherePositions(handle: *const Coordinator) -> *const f32 {
    unsafe { handle.as_ref() }
        .map_or(std::ptr::null(), |sim| sim.buffers().atmosphere_positions.as_ptr())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_GetAtmosphereColors(handle: *const Coordinator) -> *const f32 {
    unsafe { handle.as_ref() }.map_or(std::ptr::null(), |sim| sim.buffers().atmosphere_colors.as_ptr())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_GetAtmosphereOpacities(handle: *const Coordinator) -> *const f32 {
    unsafe { handle.as_ref() }
        .map_or(std::ptr::null(), |sim| sim.buffers().atmosphere_opacities.as_ptr())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_GetLightCount(handle: *const Coordinator) -> usize {
    unsafe { handle.as_ref() }.map_or(0, |sim| sim.lights().len())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_GetLights(handle: *const Coordinator) -> *const LightSource {
    unsafe { handle.as_ref() }.map_or(std::ptr::null(), |sim| sim.lights().as_ptr())
}

/// Writes the field statistics into `out`. Returns 0 if either pointer is null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Coordinator_GetStatistics(handle: *const Coordinator, out: *mut Statistics) -> u32 {
    let (Some(sim), Some(out)) = (unsafe { handle.as_ref() }, unsafe { out.as_mut() }) else {
        return 0;
    };
    *out = sim.stats().field;
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_the_abi() {
        unsafe {
            let handle = Coordinator_Create(200, 100, 3);
            assert!(!handle.is_null());
            assert_eq!(Coordinator_GetSurfaceCount(handle), 200);
            assert_eq!(Coordinator_GetAtmosphereCount(handle), 100);
            assert!(!Coordinator_GetSurfacePositions(handle).is_null());

            let id = Coordinator_Launch(handle, 0.0, 1.0, 0.0, 1.0, 25.0, 1);
            assert_eq!(id, 0);
            assert_eq!(Coordinator_Launch(handle, 0.0, 0.0, 0.0, 1.0, 25.0, 0), -1);

            Coordinator_SetBlastRadiusScale(handle, 2.0);
            Coordinator_Tick(handle, 0.016, 1.0);

            let mut stats = Statistics::default();
            assert_eq!(Coordinator_GetStatistics(handle, &mut stats), 1);
            assert_eq!(stats.surface_count, 200);

            assert_eq!(Coordinator_Cancel(handle, id as u64), 1);
            assert_eq!(Coordinator_Cancel(handle, id as u64), 0);
            Coordinator_Destroy(handle);
        }
    }

    #[test]
    fn null_handles_are_ignored() {
        unsafe {
            let null = std::ptr::null_mut();
            Coordinator_Tick(null, 0.016, 1.0);
            Coordinator_Reset(null);
            assert_eq!(Coordinator_GetSurfaceCount(null), 0);
            assert!(Coordinator_GetLights(null).is_null());
            assert_eq!(Coordinator_Launch(null, 0.0, 1.0, 0.0, 1.0, 1.0, 0), -1);
            Coordinator_Destroy(null);
        }
    }
}
