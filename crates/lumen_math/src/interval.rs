/// A closed range of ray parameters `[min, max]`.
///
/// Traversal narrows the interval as closer hits are found, so the slab test
/// and the BVH share one representation of "still worth looking at".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    /// Create a new interval given min and max values.
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Everything in front of the ray origin.
    pub fn forward() -> Self {
        Self::new(0.0, f32::INFINITY)
    }

    /// True once the interval has collapsed.
    pub fn is_empty(&self) -> bool {
        self.max < self.min
    }

    /// Intersection of two intervals.
    pub fn clip(&self, other: &Interval) -> Interval {
        Interval::new(self.min.max(other.min), self.max.min(other.max))
    }
}
