use crate::particle::Category;

/// Linear RGB color with components nominally in `[0, 1]`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Linear interpolation from `self` (t = 0) to `other` (t = 1).
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        Rgb::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

/// Cooled-down surface debris.
pub const EMBER: Rgb = Rgb::new(0.14, 0.07, 0.0);
/// Target of the residual-heat tint below 500 degrees.
pub const DULL_RED: Rgb = Rgb::new(0.8, 0.2, 0.1);

/// Maps a temperature onto the blackbody-like ramp used for particles.
///
/// Returns the display color and an emissive intensity. Below 500 degrees the
/// color is `base` tinted toward dull red by the residual heat.
pub fn heat_color(temperature: f32, base: Rgb) -> (Rgb, f32) {
    if temperature > 2000.0 {
        let intensity = ((temperature - 2000.0) / 3000.0).min(1.0);
        (Rgb::new(1.0, 1.0, 0.9 + intensity * 0.1), intensity * 0.5)
    } else if temperature > 1000.0 {
        let intensity = (temperature - 1000.0) / 1000.0;
        (Rgb::new(1.0, 0.8 + intensity * 0.2, 0.2), intensity * 0.3)
    } else if temperature > 500.0 {
        let intensity = (temperature - 500.0) / 500.0;
        (Rgb::new(1.0, 0.3 + intensity * 0.5, 0.1), intensity * 0.2)
    } else {
        let cool = ((temperature - 20.0) / 80.0).max(0.0);
        (base.lerp(DULL_RED, (cool * 0.2).min(1.0)), 0.0)
    }
}

/// External lookup for the initial coloring of generated particles.
///
/// `lat` is the polar angle in `[0, PI]` and `lon` the azimuth in `[-PI, PI]`.
/// Returning `None` makes the field fall back to [`ProceduralColors`].
pub trait ColorSource {
    fn color_at(&self, lat: f32, lon: f32, category: Category) -> Option<Rgb>;

    /// Base opacity for atmosphere particles.
    fn opacity_at(&self, _lat: f32, _lon: f32) -> Option<f32> {
        None
    }
}

/// Deterministic stand-in for texture lookups.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProceduralColors;

impl ProceduralColors {
    pub const CONTINENT: Rgb = Rgb::new(0.1, 0.6, 0.1);
    pub const COAST: Rgb = Rgb::new(0.4, 0.3, 0.1);
    pub const OCEAN: Rgb = Rgb::new(0.1, 0.3, 0.8);
    pub const DEFAULT_OPACITY: f32 = 0.6;

    pub fn color(&self, lat: f32, lon: f32, category: Category) -> Rgb {
        match category {
            Category::Atmosphere => {
                let intensity = 0.3 + (lat * 2.0).sin() * (lon * 3.0).cos() * 0.2;
                Rgb::new(0.4 + intensity * 0.3, 0.6 + intensity * 0.2, 1.0)
            }
            Category::Surface => {
                let noise = (lat * 4.0).sin() * (lon * 3.0).cos() + (lon * 5.0).sin();
                if noise > 0.3 {
                    Self::CONTINENT
                } else if noise > -0.2 {
                    Self::COAST
                } else {
                    Self::OCEAN
                }
            }
        }
    }
}

impl ColorSource for ProceduralColors {
    fn color_at(&self, lat: f32, lon: f32, category: Category) -> Option<Rgb> {
        Some(self.color(lat, lon, category))
    }

    fn opacity_at(&self, _lat: f32, _lon: f32) -> Option<f32> {
        Some(Self::DEFAULT_OPACITY)
    }
}

/// An equirectangular RGB8 image, already decoded by the host.
#[derive(Clone, Debug)]
pub struct EquirectangularMap {
    width: usize,
    height: usize,
    pixels: Vec<[u8; 3]>,
}

impl EquirectangularMap {
    /// Returns `None` when the pixel count does not match the dimensions.
    pub fn new(width: usize, height: usize, pixels: Vec<[u8; 3]>) -> Option<Self> {
        if width == 0 || height == 0 || pixels.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    fn sample(&self, lat: f32, lon: f32) -> [u8; 3] {
        let u = (lon + std::f32::consts::PI) / std::f32::consts::TAU;
        let v = (std::f32::consts::PI - lat) / std::f32::consts::PI;
        let x = (u.clamp(0.0, 1.0) * (self.width - 1) as f32) as usize;
        let y = (v.clamp(0.0, 1.0) * (self.height - 1) as f32) as usize;
        self.pixels[y * self.width + x]
    }
}

impl ColorSource for EquirectangularMap {
    fn color_at(&self, lat: f32, lon: f32, _category: Category) -> Option<Rgb> {
        let [r, g, b] = self.sample(lat, lon);
        Some(Rgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0))
    }

    /// Brightness of the pixel.
    fn opacity_at(&self, lat: f32, lon: f32) -> Option<f32> {
        let [r, g, b] = self.sample(lat, lon);
        Some((r as f32 + g as f32 + b as f32) / 3.0 / 255.0)
    }
}
