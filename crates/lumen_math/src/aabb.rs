use crate::{Interval, Ray, Vec3};

/// Axis-Aligned Bounding Box for spatial acceleration structures (BVH).
///
/// Stored as its minimum and maximum corners. [`Aabb::EMPTY`] has inverted
/// infinite corners, so the first `grow` sets real bounds and every later one
/// can only widen them.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box that contains nothing.
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    /// Create an AABB from two corner points in any order.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            min: box0.min.min(box1.min),
            max: box0.max.max(box1.max),
        }
    }

    /// True while nothing has been grown into the box.
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// Extend the box so it contains `p`.
    pub fn grow(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Extend the box so it contains `other`.
    pub fn grow_box(&mut self, other: &Aabb) {
        *self = Aabb::surrounding(self, other);
    }

    /// Pad every side by `delta`.
    pub fn expand(&self, delta: f32) -> Aabb {
        Aabb {
            min: self.min - Vec3::splat(delta),
            max: self.max + Vec3::splat(delta),
        }
    }

    /// Size along all three axes, zero for an empty box.
    pub fn extents(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Size along one axis (0=X, 1=Y, 2=Z).
    pub fn extent(&self, axis: usize) -> f32 {
        self.extents()[axis]
    }

    /// Surface area, the SAH estimate of how likely a ray is to enter the box.
    ///
    /// Empty and flat boxes report their true area, which may be zero.
    pub fn area(&self) -> f32 {
        let e = self.extents();
        2.0 * (e.x * e.y + e.y * e.z + e.z * e.x)
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    ///
    /// Ties resolve to the lower axis index.
    pub fn longest_axis(&self) -> usize {
        let e = self.extents();
        if e.x >= e.y && e.x >= e.z {
            0
        } else if e.y >= e.z {
            1
        } else {
            2
        }
    }

    /// Midpoint of the box along one axis.
    pub fn center(&self, axis: usize) -> f32 {
        (self.min[axis] + self.max[axis]) * 0.5
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// True if `other` lies entirely inside this box.
    pub fn contains(&self, other: &Aabb) -> bool {
        other.min.cmpge(self.min).all() && other.max.cmple(self.max).all()
    }

    /// Slab test against the ray, restricted to `ray_t`.
    ///
    /// Returns the parametric entry distance when the box is hit. Axes where
    /// the ray direction is zero are handled as parallel slabs: the ray misses
    /// unless its origin already lies between the two planes.
    pub fn hit(&self, ray: &Ray, mut ray_t: Interval) -> Option<f32> {
        let origin = ray.origin();
        let direction = ray.direction();
        let inv_direction = ray.inv_direction();

        for axis in 0..3 {
            let o = origin[axis];
            if direction[axis] == 0.0 {
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }

            let inv = inv_direction[axis];
            let mut t0 = (self.min[axis] - o) * inv;
            let mut t1 = (self.max[axis] - o) * inv;
            if inv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            ray_t = ray_t.clip(&Interval::new(t0, t1));
            if ray_t.is_empty() {
                return None;
            }
        }

        Some(ray_t.min)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}
