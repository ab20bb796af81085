//! Monte Carlo sampling helpers.
//!
//! Every function takes its random source explicitly; there is no shared
//! generator, so a caller seeding one RNG per pixel sample gets reproducible
//! images.

use lumen_math::Vec3;
use rand::{Rng, RngCore};
use std::f32::consts::PI;

/// Uniform float in [0, 1).
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen::<f32>()
}

/// Direction on the z-up unit hemisphere with uniform density 1/(2π).
pub fn uniform_sample_hemisphere(u1: f32, u2: f32) -> Vec3 {
    let z = u1;
    let sin_theta = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u2;
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), z)
}

/// Direction on the z-up unit hemisphere with density cosθ/π.
pub fn cosine_sample_hemisphere(u1: f32, u2: f32) -> Vec3 {
    let r = u1.sqrt();
    let theta = 2.0 * PI * u2;
    Vec3::new(
        r * theta.cos(),
        r * theta.sin(),
        (1.0 - u1).max(0.0).sqrt(),
    )
}

/// Direction within `acos(cos_max)` of the z axis, uniform over solid angle.
pub fn uniform_sample_cone(u1: f32, u2: f32, cos_max: f32) -> Vec3 {
    let cos_theta = 1.0 - u1 * (1.0 - cos_max);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * u2;
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Rotate a z-up local direction into the frame whose z axis is `normal`.
///
/// `normal` must be unit length.
pub fn to_world(local: Vec3, normal: Vec3) -> Vec3 {
    let (tangent, bitangent) = normal.any_orthonormal_pair();
    tangent * local.x + bitangent * local.y + normal * local.z
}

/// Cosine-weighted direction around `normal`.
pub fn cosine_direction(normal: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let local = cosine_sample_hemisphere(gen_f32(rng), gen_f32(rng));
    to_world(local, normal)
}

/// Sample a random point in the unit disk (z = 0).
pub fn random_in_unit_disk(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let p = Vec3::new(gen_f32(rng) * 2.0 - 1.0, gen_f32(rng) * 2.0 - 1.0, 0.0);
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

/// Density of [`cosine_sample_hemisphere`] for a direction with the given cosine.
#[inline]
pub fn cosine_hemisphere_pdf(cos_theta: f32) -> f32 {
    cos_theta.max(0.0) / PI
}

/// Density of [`uniform_sample_hemisphere`].
#[inline]
pub fn uniform_hemisphere_pdf() -> f32 {
    1.0 / (2.0 * PI)
}
