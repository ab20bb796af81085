//! Surface materials.

use lumen_math::Vec3;

/// Color type alias (RGB values typically 0-1, emission may exceed 1)
pub type Color = Vec3;

/// How light interacts with a surface.
///
/// Materials are small `Copy` values so that a [`crate::Hit`] can carry its
/// own copy without borrowing from the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    /// Ideal diffuse reflector.
    Lambertian { albedo: Color },
    /// Mirror; `roughness` in [0, 1] blends the reflection towards a diffuse lobe.
    Specular { albedo: Color, roughness: f32 },
    /// Glass-like interface.
    ///
    /// `albedo` doubles as the tint absorbed inside the medium and `density`
    /// scales that absorption with distance (Beer-Lambert).
    Dielectric { albedo: Color, ior: f32, density: f32 },
    /// Area light.
    Emissive { emission: Color },
}

impl Material {
    pub fn lambertian(albedo: Color) -> Self {
        Material::Lambertian { albedo }
    }

    /// Perfect mirror.
    pub fn mirror(albedo: Color) -> Self {
        Self::glossy(albedo, 0.0)
    }

    /// Mirror with a rough component, 0.0 = perfect mirror, 1.0 = diffuse.
    pub fn glossy(albedo: Color, roughness: f32) -> Self {
        Material::Specular {
            albedo,
            roughness: roughness.clamp(0.0, 1.0),
        }
    }

    /// Clear dielectric (1.0 = air, 1.5 = glass, 2.4 = diamond).
    pub fn glass(ior: f32) -> Self {
        Self::dielectric(Color::ONE, ior, 0.0)
    }

    /// Tinted dielectric with Beer-Lambert absorption.
    pub fn dielectric(albedo: Color, ior: f32, density: f32) -> Self {
        Material::Dielectric {
            albedo,
            ior: ior.max(1.0),
            density: density.max(0.0),
        }
    }

    pub fn emissive(emission: Color) -> Self {
        Material::Emissive { emission }
    }

    /// Diffuse reflectance color; emitters have none.
    pub fn albedo(&self) -> Color {
        match *self {
            Material::Lambertian { albedo }
            | Material::Specular { albedo, .. }
            | Material::Dielectric { albedo, .. } => albedo,
            Material::Emissive { .. } => Color::ZERO,
        }
    }

    /// Emitted radiance, black for everything but lights.
    pub fn emission(&self) -> Color {
        match *self {
            Material::Emissive { emission } => emission,
            _ => Color::ZERO,
        }
    }

    pub fn is_emissive(&self) -> bool {
        matches!(self, Material::Emissive { .. })
    }

    /// Refractive index of the material's interior.
    pub fn ior(&self) -> f32 {
        match *self {
            Material::Dielectric { ior, .. } => ior,
            _ => 1.0,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::Lambertian { albedo: Color::ZERO }
    }
}
