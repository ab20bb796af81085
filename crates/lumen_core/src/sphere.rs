//! Sphere primitive for ray tracing.

use crate::sampling::{gen_f32, to_world, uniform_sample_cone};
use crate::{Hit, HitKind, Material};
use lumen_math::{Aabb, Ray, Vec3, EPSILON};
use rand::RngCore;
use std::f32::consts::PI;

/// A sphere primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
    material: Material,
    bbox: Aabb,
}

impl Sphere {
    /// Create a new sphere.
    pub fn new(center: Vec3, radius: f32, material: Material) -> Self {
        let radius = radius.max(0.0);
        let rvec = Vec3::splat(radius + EPSILON);
        let bbox = Aabb::from_points(center - rvec, center + rvec);

        Self {
            center,
            radius,
            material,
            bbox,
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn volume(&self) -> Aabb {
        self.bbox
    }

    pub fn surface_area(&self) -> f32 {
        4.0 * PI * self.radius * self.radius
    }

    /// Get the UV coordinates for a point on the unit sphere.
    fn get_sphere_uv(p: Vec3) -> (f32, f32) {
        // theta: angle down from +Y
        // phi: angle around Y axis from +X
        let theta = (-p.y).clamp(-1.0, 1.0).acos();
        let phi = (-p.z).atan2(p.x) + PI;

        (phi / (2.0 * PI), theta / PI)
    }

    /// Nearest intersection with t > 0.
    ///
    /// A ray starting inside the sphere reports the exit point as
    /// [`HitKind::Inside`].
    pub fn hit(&self, ray: &Ray) -> Hit {
        let direction = ray.direction();
        let a = direction.length_squared();
        if a < EPSILON * EPSILON {
            return Hit::NONE;
        }

        let oc = self.center - ray.origin();
        let h = direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return Hit::NONE;
        }

        let sqrtd = discriminant.sqrt();
        let near = (h - sqrtd) / a;
        let far = (h + sqrtd) / a;

        let (t, kind) = if near > 0.0 {
            (near, HitKind::Outside)
        } else if far > 0.0 {
            (far, HitKind::Inside)
        } else {
            return Hit::NONE;
        };

        let point = ray.at(t);
        let normal = self.normal_at(point);
        let (u, v) = Self::get_sphere_uv(normal);

        Hit {
            kind,
            t,
            point,
            normal,
            u,
            v,
            material: self.material,
        }
    }

    pub fn normal_at(&self, point: Vec3) -> Vec3 {
        (point - self.center).normalize_or_zero()
    }

    /// Area of the cap visible from a point `distance` away from the center.
    ///
    /// Zero when the point is on or inside the sphere.
    pub fn visible_area(&self, distance: f32) -> f32 {
        if distance <= self.radius {
            return 0.0;
        }
        2.0 * PI * self.radius * self.radius * (1.0 - self.radius / distance)
    }

    /// Uniform point on the cap visible from `reference`.
    pub fn random_surface_point(&self, reference: Vec3, rng: &mut dyn RngCore) -> Vec3 {
        let to_reference = reference - self.center;
        let distance = to_reference.length();
        let axis = if distance > 0.0 {
            to_reference / distance
        } else {
            Vec3::Z
        };
        // From inside, the whole sphere is the sampling domain
        let cos_max = if distance > self.radius {
            self.radius / distance
        } else {
            -1.0
        };

        let local = uniform_sample_cone(gen_f32(rng), gen_f32(rng), cos_max);
        self.center + to_world(local, axis) * self.radius
    }
}
