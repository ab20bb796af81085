//! Triangle primitive for ray tracing.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use crate::sampling::gen_f32;
use crate::{Hit, HitKind, Material};
use lumen_math::{Aabb, Ray, Vec2, Vec3, EPSILON};
use rand::RngCore;

/// A triangle primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    /// Vertices
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    /// Per-vertex texture coordinates
    uv: [Vec2; 3],
    /// Pre-computed face normal (unit length, counter-clockwise front face)
    normal: Vec3,
    material: Material,
    bbox: Aabb,
}

impl Triangle {
    /// Create a new triangle from three vertices.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, material: Material) -> Self {
        Self::with_uvs(v0, v1, v2, [Vec2::ZERO, Vec2::X, Vec2::Y], material)
    }

    /// Create a triangle with explicit texture coordinates.
    pub fn with_uvs(v0: Vec3, v1: Vec3, v2: Vec3, uv: [Vec2; 3], material: Material) -> Self {
        let normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();

        // Pad thin dimensions to avoid degenerate AABBs
        let mut bbox = Aabb::EMPTY;
        bbox.grow(v0);
        bbox.grow(v1);
        bbox.grow(v2);
        let bbox = bbox.expand(EPSILON);

        Self {
            v0,
            v1,
            v2,
            uv,
            normal,
            material,
            bbox,
        }
    }

    pub fn vertices(&self) -> [Vec3; 3] {
        [self.v0, self.v1, self.v2]
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn volume(&self) -> Aabb {
        self.bbox
    }

    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    pub fn area(&self) -> f32 {
        0.5 * (self.v1 - self.v0).cross(self.v2 - self.v0).length()
    }

    /// Möller-Trumbore ray-triangle intersection algorithm.
    pub fn hit(&self, ray: &Ray) -> Hit {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction().cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-8 {
            return Hit::NONE;
        }

        let f = 1.0 / a;
        let s = ray.origin() - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return Hit::NONE;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction().dot(q);
        if v < 0.0 || u + v > 1.0 {
            return Hit::NONE;
        }

        let t = f * edge2.dot(q);
        if t <= 0.0 {
            return Hit::NONE;
        }

        let kind = if self.normal.dot(ray.direction()) < 0.0 {
            HitKind::Outside
        } else {
            HitKind::Inside
        };
        let w = 1.0 - u - v;
        let uv = self.uv[0] * w + self.uv[1] * u + self.uv[2] * v;

        Hit {
            kind,
            t,
            point: ray.at(t),
            normal: self.normal,
            u: uv.x,
            v: uv.y,
            material: self.material,
        }
    }

    /// Uniform point on the triangle.
    pub fn random_surface_point(&self, rng: &mut dyn RngCore) -> Vec3 {
        let su0 = gen_f32(rng).sqrt();
        let b0 = 1.0 - su0;
        let b1 = gen_f32(rng) * su0;
        self.v0 * b0 + self.v1 * b1 + self.v2 * (1.0 - b0 - b1)
    }
}
