//! Lumen Renderer - progressive CPU path tracing
//!
//! A Monte Carlo path tracer with next event estimation over a binned SAH
//! bounding volume hierarchy. Frames are rendered bucket by bucket in
//! parallel and accumulated until the image converges.

mod bucket;
mod bvh;
mod camera;
mod integrator;
mod renderer;

pub use bucket::{generate_buckets, Bucket, BucketResult};
pub use bvh::{Bvh, BvhNode, NodeContent, TraversalStats};
pub use camera::Camera;
pub use integrator::{fresnel, reflect, refract, survival_probability, Integrator};
pub use renderer::{
    clamp_01, clamp_sample, color_to_rgba, heat_color, linear_to_gamma, ImageBuffer, RenderError,
    RenderMode, RenderResult, Renderer,
};

/// Re-export Vec3 and common math types from lumen_math
pub use lumen_math::{Aabb, Interval, Ray, RayKind, Vec3};
