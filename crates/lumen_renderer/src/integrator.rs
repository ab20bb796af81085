//! Radiance estimation along a single path.
//!
//! Lambertian surfaces combine next event estimation towards one randomly
//! chosen light with a hemisphere bounce. Emitters reached by a diffuse
//! bounce are ignored because that light was already gathered by the shadow
//! ray at the previous vertex. Mirrors and dielectrics continue as specular
//! paths and do see emitters.

use crate::Bvh;
use lumen_core::sampling::{
    cosine_direction, cosine_hemisphere_pdf, cosine_sample_hemisphere, gen_f32, to_world,
    uniform_hemisphere_pdf, uniform_sample_hemisphere,
};
use lumen_core::{
    Color, HemisphereSampling, Hit, HitKind, LightSelection, Material, RenderSettings, Scene,
};
use lumen_math::{Ray, RayKind, Vec3, EPSILON};
use rand::RngCore;
use std::f32::consts::FRAC_1_PI;

/// Mirror `direction` about `normal`.
#[inline]
pub fn reflect(direction: Vec3, normal: Vec3) -> Vec3 {
    direction - 2.0 * direction.dot(normal) * normal
}

/// Bend `direction` through an interface by Snell's law.
///
/// `normal` faces the incoming side and `eta` is the ratio of the incident
/// to the transmitted index. Returns `None` on total internal reflection.
pub fn refract(direction: Vec3, normal: Vec3, eta: f32) -> Option<Vec3> {
    let cos_i = (-direction.dot(normal)).min(1.0);
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k < 0.0 {
        return None;
    }
    Some((eta * direction + (eta * cos_i - k.sqrt()) * normal).normalize())
}

/// Fraction of light reflected at a dielectric interface (unpolarized).
///
/// `cos_i` is the cosine between the incident direction and the normal on
/// the incident side.
pub fn fresnel(cos_i: f32, eta_i: f32, eta_t: f32) -> f32 {
    let cos_i = cos_i.clamp(0.0, 1.0);
    let sin_i = (1.0 - cos_i * cos_i).max(0.0).sqrt();
    let sin_t = eta_i / eta_t * sin_i;
    if sin_t >= 1.0 {
        return 1.0;
    }
    let cos_t = (1.0 - sin_t * sin_t).max(0.0).sqrt();

    let r_parallel = (eta_t * cos_i - eta_i * cos_t) / (eta_t * cos_i + eta_i * cos_t);
    let r_perpendicular = (eta_i * cos_i - eta_t * cos_t) / (eta_i * cos_i + eta_t * cos_t);
    (r_parallel * r_parallel + r_perpendicular * r_perpendicular) / 2.0
}

/// Probability that a path continues past a surface with `albedo`.
#[inline]
pub fn survival_probability(albedo: Color, min: f32, max: f32) -> f32 {
    ((albedo.x + albedo.y + albedo.z) / 3.0).clamp(min, max)
}

/// Beer-Lambert transmittance after travelling `distance` inside a medium.
#[inline]
fn absorption(albedo: Color, density: f32, distance: f32) -> Color {
    let absorbance = (Color::ONE - albedo) * density * -distance;
    Color::new(absorbance.x.exp(), absorbance.y.exp(), absorbance.z.exp())
}

/// Path tracing integrator over a scene and its BVH.
#[derive(Clone, Copy)]
pub struct Integrator<'a> {
    scene: &'a Scene,
    bvh: &'a Bvh,
    settings: &'a RenderSettings,
}

impl<'a> Integrator<'a> {
    pub fn new(scene: &'a Scene, bvh: &'a Bvh, settings: &'a RenderSettings) -> Self {
        Self { scene, bvh, settings }
    }

    /// Nearest hit along `ray`.
    #[inline]
    pub fn trace(&self, ray: &Ray) -> Hit {
        self.bvh.intersect(self.scene.primitives(), ray)
    }

    /// Radiance arriving at the ray origin from along its direction.
    ///
    /// `depth` counts bounces so far; the primary ray has depth 0.
    pub fn radiance(&self, ray: &Ray, depth: u32, rng: &mut dyn RngCore) -> Color {
        if depth > self.settings.max_depth {
            return Color::ZERO;
        }

        let hit = self.trace(ray);
        if !hit.is_hit() {
            return Color::ZERO;
        }

        let material = hit.material;
        if let Material::Emissive { emission } = material {
            // Triangle lights emit from their front face only
            return match (ray.kind(), hit.kind) {
                (RayKind::Indirect, _) | (_, HitKind::Inside) => Color::ZERO,
                _ => emission,
            };
        }
        if ray.kind() == RayKind::Light {
            // Occluded
            return Color::ZERO;
        }

        let survival = if ray.kind() == RayKind::Indirect && self.settings.russian_roulette {
            let p = survival_probability(
                material.albedo(),
                self.settings.roulette_min,
                self.settings.roulette_max,
            );
            if gen_f32(rng) >= p {
                return Color::ZERO;
            }
            p
        } else {
            1.0
        };

        let color = match material {
            Material::Lambertian { albedo } => self.diffuse(&hit, albedo, depth, rng),
            Material::Specular { albedo, roughness } => {
                self.specular(ray, &hit, albedo, roughness, depth, rng)
            }
            Material::Dielectric { albedo, ior, density } => {
                self.dielectric(ray, &hit, albedo, ior, density, depth, rng)
            }
            Material::Emissive { .. } => Color::ZERO,
        };

        color / survival
    }

    fn diffuse(&self, hit: &Hit, albedo: Color, depth: u32, rng: &mut dyn RngCore) -> Color {
        let normal = hit.facing_normal();
        let brdf = albedo * FRAC_1_PI;

        let direct = self.direct_light(hit.point, normal, depth, rng);

        let (direction, pdf) = match self.settings.hemisphere_sampling {
            HemisphereSampling::Cosine => {
                let local = cosine_sample_hemisphere(gen_f32(rng), gen_f32(rng));
                (to_world(local, normal), cosine_hemisphere_pdf(local.z))
            }
            HemisphereSampling::Uniform => {
                let local = uniform_sample_hemisphere(gen_f32(rng), gen_f32(rng));
                (to_world(local, normal), uniform_hemisphere_pdf())
            }
        };
        let cos_theta = direction.dot(normal);
        if pdf < EPSILON || cos_theta <= 0.0 {
            return brdf * direct;
        }

        let bounce = Ray::new(
            hit.point + direction * self.settings.reflection_bias,
            direction,
            RayKind::Indirect,
        );
        let indirect = self.radiance(&bounce, depth + 1, rng) * cos_theta / pdf;

        brdf * (direct + indirect)
    }

    /// Irradiance at `point` from one sampled point on one sampled light,
    /// already weighted by the surface cosine.
    fn direct_light(&self, point: Vec3, normal: Vec3, depth: u32, rng: &mut dyn RngCore) -> Color {
        let u = gen_f32(rng);
        let pick = match self.settings.light_selection {
            LightSelection::Uniform => self.scene.pick_light_uniform(u),
            LightSelection::AreaWeighted => self.scene.pick_light_by_area(u),
        };
        let Some((index, probability)) = pick else {
            return Color::ZERO;
        };
        let light = self.scene.primitive(index);

        let light_point = light.random_surface_point(point, rng);
        let to_light = light_point - point;
        let distance_sq = to_light.length_squared();
        if distance_sq < EPSILON * EPSILON {
            return Color::ZERO;
        }
        let direction = to_light / distance_sq.sqrt();

        let cos_surface = normal.dot(direction);
        let cos_light = -light.normal_at(light_point).dot(direction);
        if cos_surface <= 0.0 || cos_light <= 0.0 {
            return Color::ZERO;
        }

        let shadow = Ray::new(
            point + direction * self.settings.shadow_bias,
            direction,
            RayKind::Light,
        );
        let emitted = self.radiance(&shadow, depth, rng);
        if emitted == Color::ZERO {
            return emitted;
        }

        let visible_area = light.visible_area(point.distance(light.origin()));
        let solid_angle = cos_light * visible_area / distance_sq;
        emitted * (solid_angle * cos_surface / probability)
    }

    fn specular(
        &self,
        ray: &Ray,
        hit: &Hit,
        albedo: Color,
        roughness: f32,
        depth: u32,
        rng: &mut dyn RngCore,
    ) -> Color {
        let normal = hit.facing_normal();
        let mirrored = reflect(ray.direction(), normal);
        let direction = if roughness > 0.0 {
            (mirrored * (1.0 - roughness) + cosine_direction(normal, rng) * roughness).normalize()
        } else {
            mirrored
        };
        if !direction.is_finite() {
            return Color::ZERO;
        }

        let next = Ray::new(
            hit.point + direction * self.settings.reflection_bias,
            direction,
            RayKind::Specular,
        )
        .with_medium(ray.medium_ior());
        albedo * self.radiance(&next, depth + 1, rng)
    }

    #[allow(clippy::too_many_arguments)]
    fn dielectric(
        &self,
        ray: &Ray,
        hit: &Hit,
        albedo: Color,
        ior: f32,
        density: f32,
        depth: u32,
        rng: &mut dyn RngCore,
    ) -> Color {
        let inside = hit.kind == HitKind::Inside;
        let normal = hit.facing_normal();
        let (eta_i, eta_t) = if inside {
            (ior, 1.0)
        } else {
            (ray.medium_ior(), ior)
        };

        // The segment that just ended ran through the medium
        let transmittance = if inside {
            absorption(albedo, density, hit.t)
        } else {
            Color::ONE
        };

        let direction = ray.direction();
        let kr = fresnel(-direction.dot(normal), eta_i, eta_t);
        let refracted = if gen_f32(rng) < kr {
            None
        } else {
            refract(direction, normal, eta_i / eta_t)
        };

        let next = match refracted {
            Some(dir) => Ray::new(
                hit.point + dir * self.settings.refraction_bias,
                dir,
                RayKind::Specular,
            )
            .with_medium(eta_t),
            None => {
                let dir = reflect(direction, normal);
                Ray::new(
                    hit.point + dir * self.settings.reflection_bias,
                    dir,
                    RayKind::Specular,
                )
                .with_medium(eta_i)
            }
        };

        transmittance * self.radiance(&next, depth + 1, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{scenes, Primitive, Sphere, Triangle};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup(primitives: Vec<Primitive>) -> (Scene, Bvh, RenderSettings) {
        let scene = Scene::new(primitives).unwrap();
        let settings = RenderSettings::default();
        let bvh = Bvh::build(scene.primitives(), &settings.bvh).unwrap();
        (scene, bvh, settings)
    }

    fn mean_radiance(integrator: &Integrator, ray: &Ray, samples: u32, seed: u64) -> Color {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sum = Color::ZERO;
        for _ in 0..samples {
            sum += integrator.radiance(ray, 0, &mut rng);
        }
        sum / samples as f32
    }

    fn light() -> Primitive {
        Sphere::new(Vec3::new(0.0, 0.0, 10.0), 2.0, Material::emissive(Color::splat(5.0))).into()
    }

    #[test]
    fn test_background_is_black() {
        let (scene, bvh, settings) = setup(vec![light()]);
        let integrator = Integrator::new(&scene, &bvh, &settings);
        let mut rng = StdRng::seed_from_u64(1);

        let ray = Ray::primary(Vec3::ZERO, Vec3::NEG_Z);
        assert_eq!(integrator.radiance(&ray, 0, &mut rng), Color::ZERO);
    }

    #[test]
    fn test_emitter_visibility_by_ray_kind() {
        let (scene, bvh, settings) = setup(vec![light()]);
        let integrator = Integrator::new(&scene, &bvh, &settings);
        let mut rng = StdRng::seed_from_u64(2);

        for (kind, expected) in [
            (RayKind::Primary, Color::splat(5.0)),
            (RayKind::Specular, Color::splat(5.0)),
            (RayKind::Light, Color::splat(5.0)),
            (RayKind::Indirect, Color::ZERO),
        ] {
            let ray = Ray::new(Vec3::ZERO, Vec3::Z, kind);
            assert_eq!(integrator.radiance(&ray, 0, &mut rng), expected, "{kind:?}");
        }

        // Past the depth limit nothing is gathered
        let ray = Ray::primary(Vec3::ZERO, Vec3::Z);
        assert_eq!(
            integrator.radiance(&ray, settings.max_depth + 1, &mut rng),
            Color::ZERO
        );
    }

    #[test]
    fn test_light_ray_blocked_by_surface() {
        let blocker: Primitive =
            Sphere::new(Vec3::new(0.0, 0.0, 4.0), 1.0, Material::lambertian(Color::ONE)).into();
        let (scene, bvh, settings) = setup(vec![light(), blocker]);
        let integrator = Integrator::new(&scene, &bvh, &settings);
        let mut rng = StdRng::seed_from_u64(3);

        let ray = Ray::new(Vec3::ZERO, Vec3::Z, RayKind::Light);
        assert_eq!(integrator.radiance(&ray, 0, &mut rng), Color::ZERO);
    }

    #[test]
    fn test_triangle_light_is_one_sided() {
        // Front face points towards -z
        let panel: Primitive = Triangle::new(
            Vec3::new(-5.0, -5.0, 3.0),
            Vec3::new(0.0, 5.0, 3.0),
            Vec3::new(5.0, -5.0, 3.0),
            Material::emissive(Color::ONE),
        )
        .into();
        let (scene, bvh, settings) = setup(vec![panel]);
        let integrator = Integrator::new(&scene, &bvh, &settings);
        let mut rng = StdRng::seed_from_u64(4);

        let normal = scene.primitive(0).normal_at(Vec3::ZERO);
        let facing = Ray::primary(normal * 6.0 + Vec3::new(0.0, 0.0, 3.0), -normal);
        let behind = Ray::primary(-normal * 6.0 + Vec3::new(0.0, 0.0, 3.0), normal);
        assert_eq!(integrator.radiance(&facing, 0, &mut rng), Color::ONE);
        assert_eq!(integrator.radiance(&behind, 0, &mut rng), Color::ZERO);
    }

    #[test]
    fn test_unit_ior_dielectric_does_not_deviate() {
        let d = Vec3::new(0.3, -0.2, 0.9).normalize();
        let n = Vec3::new(0.0, 0.0, -1.0);
        let out = refract(d, n, 1.0).unwrap();
        assert!((out - d).length() < 1e-5);
        assert!(fresnel(-d.dot(n), 1.0, 1.0).abs() < 1e-6);

        // Looking through an index-matched ball straight at the light
        let ball: Primitive =
            Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0, Material::dielectric(Color::ONE, 1.0, 0.0))
                .into();
        let (scene, bvh, settings) = setup(vec![light(), ball]);
        let integrator = Integrator::new(&scene, &bvh, &settings);

        let ray = Ray::primary(Vec3::new(0.1, 0.05, 0.0), Vec3::Z);
        let color = mean_radiance(&integrator, &ray, 16, 5);
        assert!((color - Color::splat(5.0)).length() < 1e-4, "got {color:?}");
    }

    #[test]
    fn test_fresnel_limits() {
        // Normal incidence on glass reflects about 4%
        let r0 = fresnel(1.0, 1.0, 1.5);
        assert!((r0 - 0.04).abs() < 1e-3);

        // Grazing angles reflect everything
        assert!(fresnel(0.0, 1.0, 1.5) > 0.99);

        // Total internal reflection from inside glass
        assert_eq!(fresnel(0.2, 1.5, 1.0), 1.0);
        assert!(refract(Vec3::new(0.98, 0.0, 0.2).normalize(), Vec3::NEG_Z, 1.5).is_none());
    }

    #[test]
    fn test_absorption_grows_with_distance() {
        let tint = Color::new(1.0, 0.5, 0.0);
        let near = absorption(tint, 1.0, 0.5);
        let far = absorption(tint, 1.0, 2.0);

        // A fully transmitted channel never darkens
        assert_eq!(near.x, 1.0);
        assert!(far.y < near.y && far.z < near.z);
        assert!((far.z - (-2.0f32).exp()).abs() < 1e-6);
    }

    #[test]
    fn test_red_sphere_direct_light() {
        let preset = scenes::red_sphere().unwrap();
        let settings = RenderSettings::default();
        let bvh = Bvh::build(preset.scene.primitives(), &settings.bvh).unwrap();
        let integrator = Integrator::new(&preset.scene, &bvh, &settings);

        // Analytic direct light at (0, 0, -1): L/π · cosθ · solid angle
        let point = Vec3::new(0.0, 0.0, -1.0);
        let to_center = Vec3::new(0.0, -10.0, -15.0) - point;
        let d = to_center.length();
        let solid_angle = 2.0 * std::f32::consts::PI * (1.0 - (1.0 - (3.0 / d).powi(2)).sqrt());
        let cos_theta = to_center.normalize().dot(Vec3::NEG_Z);
        let expected = 10.0 * FRAC_1_PI * cos_theta * solid_angle;

        let ray = Ray::primary(Vec3::new(0.0, 0.0, -2.0), Vec3::Z);
        let color = mean_radiance(&integrator, &ray, 2000, 6);
        assert!((color.x - expected).abs() < 0.01, "red {} vs {expected}", color.x);
        assert_eq!(color.y, 0.0);
        assert_eq!(color.z, 0.0);
    }

    #[test]
    fn test_russian_roulette_is_unbiased() {
        let wall: Primitive =
            Sphere::new(Vec3::new(0.0, 0.0, 3.0), 1.0, Material::lambertian(Color::splat(0.4))).into();
        let lamp: Primitive =
            Sphere::new(Vec3::new(0.0, 4.0, 0.0), 1.0, Material::emissive(Color::splat(8.0))).into();
        let (scene, bvh, mut settings) = setup(vec![wall, lamp]);
        let ray = Ray::new(Vec3::ZERO, Vec3::Z, RayKind::Indirect);

        settings.russian_roulette = false;
        let without = mean_radiance(&Integrator::new(&scene, &bvh, &settings), &ray, 20_000, 7);
        settings.russian_roulette = true;
        let with = mean_radiance(&Integrator::new(&scene, &bvh, &settings), &ray, 20_000, 8);

        assert!(without.x > 0.0);
        let relative = (with.x - without.x).abs() / without.x;
        assert!(relative < 0.05, "roulette shifted the mean by {relative}");
    }

    #[test]
    fn test_survival_probability_is_clamped() {
        assert_eq!(survival_probability(Color::ZERO, 0.1, 0.95), 0.1);
        assert_eq!(survival_probability(Color::ONE, 0.1, 0.95), 0.95);
        assert!((survival_probability(Color::new(0.2, 0.4, 0.6), 0.1, 0.95) - 0.4).abs() < 1e-6);
    }

    /// Closed Lambertian box lit by a sphere at its center.
    ///
    /// Every wall stays at least 0.7 away from the light, which keeps the
    /// 1/d² light sampling weights bounded.
    fn lambertian_box() -> Vec<Primitive> {
        let grey = Material::lambertian(Color::splat(0.5));
        let c = Vec3::new;
        let faces = [
            [c(-1., -1., -1.), c(1., -1., -1.), c(1., -1., 1.), c(-1., -1., 1.)],
            [c(-1., 1., -1.), c(-1., 1., 1.), c(1., 1., 1.), c(1., 1., -1.)],
            [c(-1., -1., 1.), c(1., -1., 1.), c(1., 1., 1.), c(-1., 1., 1.)],
            [c(-1., -1., -1.), c(-1., 1., -1.), c(1., 1., -1.), c(1., -1., -1.)],
            [c(-1., -1., -1.), c(-1., -1., 1.), c(-1., 1., 1.), c(-1., 1., -1.)],
            [c(1., -1., -1.), c(1., 1., -1.), c(1., 1., 1.), c(1., -1., 1.)],
        ];
        let mut primitives: Vec<Primitive> = Vec::new();
        for [a, b, cc, d] in faces {
            primitives.push(Triangle::new(a, b, cc, grey).into());
            primitives.push(Triangle::new(a, cc, d, grey).into());
        }
        primitives.push(Sphere::new(Vec3::ZERO, 0.3, Material::emissive(Color::splat(4.0))).into());
        primitives
    }

    #[test]
    fn test_enclosed_box_converges() {
        let (scene, bvh, settings) = setup(lambertian_box());
        let integrator = Integrator::new(&scene, &bvh, &settings);
        let ray = Ray::primary(Vec3::new(0.0, -0.6, 0.0), Vec3::new(0.3, -1.0, 0.5).normalize());
        let mut rng = StdRng::seed_from_u64(9);

        let batches = 400;
        let mut batch_stats = |size: u32| {
            let means: Vec<f32> = (0..batches)
                .map(|_| {
                    let mut sum = 0.0;
                    for _ in 0..size {
                        let sample = integrator.radiance(&ray, 0, &mut rng);
                        assert!(sample.is_finite());
                        assert!(sample.min_element() >= 0.0);
                        sum += sample.x;
                    }
                    sum / size as f32
                })
                .collect();
            let mean = means.iter().sum::<f32>() / batches as f32;
            let variance =
                means.iter().map(|m| (m - mean).powi(2)).sum::<f32>() / (batches - 1) as f32;
            (mean, variance)
        };

        let (mean_small, var_small) = batch_stats(64);
        let (mean_large, var_large) = batch_stats(256);

        // A wall with albedo 0.5 can never be brighter than half the light
        assert!(mean_large > 0.0 && mean_large < 2.0, "mean {mean_large}");

        // Both runs estimate the same radiance
        let standard_error = ((var_small + var_large) / batches as f32).sqrt();
        assert!(
            (mean_small - mean_large).abs() < 5.0 * standard_error,
            "{mean_small} vs {mean_large}, standard error {standard_error}"
        );

        // Four times the samples, a quarter of the variance. ln(s²) has a
        // spread of about sqrt(2 / (n - 1)) per estimate.
        let ratio = var_small / var_large;
        let tolerance = 5.0 * (4.0 / (batches - 1) as f32).sqrt();
        assert!(
            (ratio.ln() - 4.0f32.ln()).abs() < tolerance,
            "variance ratio {ratio}, allowed ln spread {tolerance}"
        );
    }
}
