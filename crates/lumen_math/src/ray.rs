use crate::Vec3;

/// What a ray is being traced for.
///
/// The integrator uses the tag to decide whether an emissive surface should
/// contribute when it is hit, so that light gathered through next event
/// estimation is not counted a second time by a bounce.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RayKind {
    /// Camera ray.
    Primary,
    /// Shadow ray towards a sampled point on a light.
    Light,
    /// Continuation of a mirror or dielectric interaction.
    Specular,
    /// Diffuse bounce.
    Indirect,
}

/// A ray in 3D space with origin, direction, kind and the refractive index of
/// the medium it currently travels through.
///
/// The direction is expected to be normalized by the caller. The reciprocal
/// direction is cached for the slab test; components of a zero direction map
/// to infinity and are treated as axis-parallel by [`crate::Aabb::hit`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
    inv_direction: Vec3,
    kind: RayKind,
    medium_ior: f32,
}

impl Ray {
    /// Create a new ray travelling through air.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3, kind: RayKind) -> Self {
        Self {
            origin,
            direction,
            inv_direction: direction.recip(),
            kind,
            medium_ior: 1.0,
        }
    }

    /// Create a camera ray.
    #[inline]
    pub fn primary(origin: Vec3, direction: Vec3) -> Self {
        Self::new(origin, direction, RayKind::Primary)
    }

    /// The same ray, now travelling through a medium with the given index.
    #[inline]
    pub fn with_medium(mut self, medium_ior: f32) -> Self {
        self.medium_ior = medium_ior;
        self
    }

    /// Get the origin point of the ray.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Get the direction vector of the ray.
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Component-wise reciprocal of the direction.
    #[inline]
    pub fn inv_direction(&self) -> Vec3 {
        self.inv_direction
    }

    #[inline]
    pub fn kind(&self) -> RayKind {
        self.kind
    }

    /// Refractive index of the medium around the origin (1.0 for air).
    #[inline]
    pub fn medium_ior(&self) -> f32 {
        self.medium_ior
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::primary(Vec3::ZERO, Vec3::Z)
    }
}
