//! The intersection contract shared by every shape, and the closed set of
//! shapes the renderer understands.

use crate::{Material, Sphere, Triangle};
use lumen_math::{Aabb, Ray, Vec3};
use rand::RngCore;

/// Which side of a surface a ray arrived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKind {
    None,
    /// Ray started outside the shape (or hit a triangle's front face).
    Outside,
    /// Ray started inside the shape (or hit a triangle's back face).
    Inside,
}

/// Result of a ray-primitive intersection.
///
/// A miss is `kind == HitKind::None` with `t == f32::INFINITY`, so the
/// nearest of several results can always be chosen by comparing `t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub kind: HitKind,
    /// Parameter t where the intersection occurs
    pub t: f32,
    /// Point of intersection
    pub point: Vec3,
    /// Geometric normal, pointing out of the shape (triangle: front face)
    pub normal: Vec3,
    /// UV texture coordinates
    pub u: f32,
    pub v: f32,
    pub material: Material,
}

impl Hit {
    /// The "no hit" sentinel.
    pub const NONE: Hit = Hit {
        kind: HitKind::None,
        t: f32::INFINITY,
        point: Vec3::ZERO,
        normal: Vec3::ZERO,
        u: 0.0,
        v: 0.0,
        material: Material::Lambertian { albedo: Vec3::ZERO },
    };

    #[inline]
    pub fn is_hit(&self) -> bool {
        self.kind != HitKind::None
    }

    /// Normal flipped so it points back towards where the ray came from.
    #[inline]
    pub fn facing_normal(&self) -> Vec3 {
        match self.kind {
            HitKind::Inside => -self.normal,
            _ => self.normal,
        }
    }
}

impl Default for Hit {
    fn default() -> Self {
        Hit::NONE
    }
}

/// A hit-testable shape with a material.
///
/// Dispatch is a `match`, which keeps the BVH leaf loop free of virtual calls
/// and makes adding a shape a compile error everywhere it matters.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Sphere(Sphere),
    Triangle(Triangle),
}

impl Primitive {
    /// Nearest intersection in front of the ray origin.
    #[inline]
    pub fn hit(&self, ray: &Ray) -> Hit {
        match self {
            Primitive::Sphere(s) => s.hit(ray),
            Primitive::Triangle(t) => t.hit(ray),
        }
    }

    /// Bounding box of the shape.
    #[inline]
    pub fn volume(&self) -> Aabb {
        match self {
            Primitive::Sphere(s) => s.volume(),
            Primitive::Triangle(t) => t.volume(),
        }
    }

    /// Sphere center or triangle centroid.
    pub fn origin(&self) -> Vec3 {
        match self {
            Primitive::Sphere(s) => s.center(),
            Primitive::Triangle(t) => t.centroid(),
        }
    }

    pub fn material(&self) -> &Material {
        match self {
            Primitive::Sphere(s) => s.material(),
            Primitive::Triangle(t) => t.material(),
        }
    }

    pub fn is_emissive(&self) -> bool {
        self.material().is_emissive()
    }

    /// Total surface area, used to weight light selection.
    pub fn surface_area(&self) -> f32 {
        match self {
            Primitive::Sphere(s) => s.surface_area(),
            Primitive::Triangle(t) => t.area(),
        }
    }

    /// Uniform sample on the part of the surface visible from `reference`.
    pub fn random_surface_point(&self, reference: Vec3, rng: &mut dyn RngCore) -> Vec3 {
        match self {
            Primitive::Sphere(s) => s.random_surface_point(reference, rng),
            Primitive::Triangle(t) => t.random_surface_point(rng),
        }
    }

    /// Area of the surface visible from a point `distance` away from
    /// [`Primitive::origin`]; the sampling domain of
    /// [`Primitive::random_surface_point`].
    pub fn visible_area(&self, distance: f32) -> f32 {
        match self {
            Primitive::Sphere(s) => s.visible_area(distance),
            Primitive::Triangle(t) => t.area(),
        }
    }

    /// Outward normal at a point on the surface.
    pub fn normal_at(&self, point: Vec3) -> Vec3 {
        match self {
            Primitive::Sphere(s) => s.normal_at(point),
            Primitive::Triangle(t) => t.normal(),
        }
    }
}

impl From<Sphere> for Primitive {
    fn from(sphere: Sphere) -> Self {
        Primitive::Sphere(sphere)
    }
}

impl From<Triangle> for Primitive {
    fn from(triangle: Triangle) -> Self {
        Primitive::Triangle(triangle)
    }
}
