use crate::color::{ColorSource, ProceduralColors, Rgb};
use crate::particle::{Category, CategoryConstants, Particle};
use std::f32::consts::{FRAC_PI_2, TAU};
use ultraviolet::Vec3;

/// Lengths below this are treated as zero when normalizing.
pub const EPSILON: f32 = 1e-5;

/// Atmospheric spin at the reference radius, also used for the initial orbit speed.
const ATMOSPHERE_ORBIT_SPEED: f32 = 0.015;

/// Right-handed rotation of `v` about the Y axis.
pub fn rotate_y(v: Vec3, angle: f32) -> Vec3 {
    let (sin, cos) = angle.sin_cos();
    Vec3::new(v.x * cos + v.z * sin, v.y, -v.x * sin + v.z * cos)
}

/// Right-handed rotation of `v` about the X axis.
pub fn rotate_x(v: Vec3, angle: f32) -> Vec3 {
    let (sin, cos) = angle.sin_cos();
    Vec3::new(v.x, v.y * cos - v.z * sin, v.y * sin + v.z * cos)
}

/// Unit vector along `v`, or `None` for (near) zero vectors.
pub fn try_normalized(v: Vec3) -> Option<Vec3> {
    let mag = v.mag();
    (mag > EPSILON && mag.is_finite()).then(|| v / mag)
}

/// Point of the segment `start..end` closest to the origin.
pub fn closest_to_origin(start: Vec3, end: Vec3) -> Vec3 {
    let step = end - start;
    let len_sq = step.mag_sq();
    if len_sq <= EPSILON * EPSILON {
        return end;
    }
    let t = (-start.dot(step) / len_sq).clamp(0.0, 1.0);
    start + step * t
}

/// Uniformly distributed unit vector.
pub fn random_unit(rng: &mut fastrand::Rng) -> Vec3 {
    let z = 2.0 * rng.f32() - 1.0;
    let theta = rng.f32() * TAU;
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * theta.cos(), r * theta.sin(), z)
}

/// Point on a sphere of radius `r` from polar angle `phi` and azimuth `theta`.
pub(crate) fn spherical(r: f32, phi: f32, theta: f32) -> Vec3 {
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();
    Vec3::new(r * sin_phi * cos_theta, r * sin_phi * sin_theta, r * cos_phi)
}

/// Uniform direction as (polar angle, azimuth).
fn random_angles(rng: &mut fastrand::Rng) -> (f32, f32) {
    let theta = TAU * rng.f32();
    let phi = (2.0 * rng.f32() - 1.0).clamp(-1.0, 1.0).acos();
    (phi, theta)
}

fn lookup_color(colors: &dyn ColorSource, lat: f32, lon: f32, category: Category) -> Rgb {
    colors
        .color_at(lat, lon, category)
        .unwrap_or_else(|| ProceduralColors.color(lat, lon, category))
}

/// Generates `n` surface particles filling a ball of radius `radius`.
/// - Directions are uniform on the sphere.
/// - Radii are biased toward the surface: `0.3R + 0.7R * w^0.3`.
/// - Outer shell colors come from `colors`, inner bands are mantle and core.
pub fn surface_ball(
    n: usize,
    radius: f32,
    constants: &CategoryConstants,
    colors: &dyn ColorSource,
    rng: &mut fastrand::Rng,
) -> Vec<Particle> {
    let mut particles = Vec::with_capacity(n);

    for _ in 0..n {
        let (phi, theta) = random_angles(rng);
        let r = radius * 0.3 + radius * 0.7 * rng.f32().powf(0.3);
        let position = spherical(r, phi, theta);

        let color = if r > radius * 0.9 {
            let lon = position.y.atan2(position.x);
            lookup_color(colors, phi, lon, Category::Surface)
        } else if r > radius * 0.6 {
            Rgb::new(0.8, 0.4, 0.2)
        } else {
            Rgb::new(0.9, 0.5, 0.1)
        };

        // Put the lookup poles on the spin axis.
        let position = rotate_x(position, FRAC_PI_2);
        particles.push(Particle::with_constants(
            position,
            color,
            Category::Surface,
            *constants,
            rng.u64(..),
        ));
    }

    particles
}

/// Generates `n` atmosphere particles in the shell between `body_radius` and
/// `atmosphere_radius`, each already moving along a slow orbit.
pub fn atmosphere_shell(
    n: usize,
    body_radius: f32,
    atmosphere_radius: f32,
    constants: &CategoryConstants,
    colors: &dyn ColorSource,
    rng: &mut fastrand::Rng,
) -> Vec<Particle> {
    let thickness = atmosphere_radius - body_radius;
    let mut particles = Vec::with_capacity(n);

    for _ in 0..n {
        let (phi, theta) = random_angles(rng);
        let r = body_radius + thickness * rng.f32().sqrt();
        let position = spherical(r, phi, theta);

        let lon = position.y.atan2(position.x);
        let color = lookup_color(colors, phi, lon, Category::Atmosphere);
        let base_opacity = colors
            .opacity_at(phi, lon)
            .unwrap_or(ProceduralColors::DEFAULT_OPACITY);
        let height = ((r - body_radius) / thickness).clamp(0.0, 1.0);

        let position = rotate_x(position, -FRAC_PI_2);

        let normal = position / r;
        let axis = if normal.y.abs() > 0.9 {
            Vec3::unit_x()
        } else {
            Vec3::unit_y()
        };
        let tangential = try_normalized(axis.cross(normal)).unwrap_or_else(Vec3::zero);
        let orbital_speed = ATMOSPHERE_ORBIT_SPEED
            * (r / body_radius).sqrt()
            * (1.0 - height * 0.3)
            * (0.8 + rng.f32() * 0.4);
        let turbulence = Vec3::new(
            (rng.f32() - 0.5) * 0.1,
            (rng.f32() - 0.5) * 0.1,
            (rng.f32() - 0.5) * 0.1,
        );

        let particle = Particle::with_constants(
            position,
            color,
            Category::Atmosphere,
            *constants,
            rng.u64(..),
        )
        .with_opacity(base_opacity * (0.7 - 0.3 * height))
        .with_velocity(tangential * orbital_speed + turbulence)
        .orbiting(true);
        particles.push(particle);
    }

    particles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_closest_point() {
        let start = Vec3::new(1.0, 0.0, 10.0);
        let end = Vec3::new(1.0, 0.0, -10.0);
        assert_eq!(closest_to_origin(start, end), Vec3::new(1.0, 0.0, 0.0));
        let end = Vec3::new(1.0, 0.0, 4.0);
        assert_eq!(closest_to_origin(start, end), end);
        assert_eq!(closest_to_origin(start, start), start);
    }
    use approx::assert_relative_eq;

    #[test]
    fn rotate_y_quarter_turn() {
        let v = rotate_y(Vec3::unit_x(), FRAC_PI_2);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(v.z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn rotate_x_quarter_turn() {
        let v = rotate_x(Vec3::unit_y(), FRAC_PI_2);
        assert_relative_eq!(v.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(v.z, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn try_normalized_rejects_zero() {
        assert!(try_normalized(Vec3::zero()).is_none());
        let n = try_normalized(Vec3::new(3.0, 0.0, 4.0)).unwrap();
        assert_relative_eq!(n.mag(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn random_unit_has_unit_length() {
        let mut rng = fastrand::Rng::with_seed(9);
        for _ in 0..100 {
            assert_relative_eq!(random_unit(&mut rng).mag(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn surface_ball_stays_inside_radius() {
        let mut rng = fastrand::Rng::with_seed(1);
        let particles = surface_ball(500, 5.0, &CategoryConstants::SURFACE, &ProceduralColors, &mut rng);
        assert_eq!(particles.len(), 500);
        for p in &particles {
            let r = p.position.mag();
            assert!(r >= 1.5 - 1e-4 && r <= 5.0 + 1e-4, "radius {r}");
            assert_eq!(p.velocity, Vec3::zero());
        }
    }

    #[test]
    fn atmosphere_shell_stays_between_radii() {
        let mut rng = fastrand::Rng::with_seed(2);
        let particles =
            atmosphere_shell(500, 5.0, 7.0, &CategoryConstants::ATMOSPHERE, &ProceduralColors, &mut rng);
        for p in &particles {
            let r = p.position.mag();
            assert!(r >= 5.0 - 1e-4 && r <= 7.0 + 1e-4, "radius {r}");
            assert!(p.opacity > 0.0 && p.opacity <= 0.6 * 0.7 + 1e-6);
            assert!(p.is_orbiting());
        }
    }

    #[test]
    fn same_seed_same_particles() {
        let a = surface_ball(50, 5.0, &CategoryConstants::SURFACE, &ProceduralColors, &mut fastrand::Rng::with_seed(4));
        let b = surface_ball(50, 5.0, &CategoryConstants::SURFACE, &ProceduralColors, &mut fastrand::Rng::with_seed(4));
        for (pa, pb) in a.iter().zip(&b) {
            assert_eq!(pa.position, pb.position);
            assert_eq!(pa.color, pb.color);
        }
    }
}
