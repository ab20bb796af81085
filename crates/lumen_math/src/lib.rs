// Re-export glam for convenience
pub use glam::*;

// Lumen math types
mod aabb;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::{Ray, RayKind};

/// Small distance used to guard degenerate geometry.
pub const EPSILON: f32 = 0.0001;
