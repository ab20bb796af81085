//! The primitive collection handed to the renderer.
//!
//! A `Scene` owns every primitive for the lifetime of a render session.
//! Acceleration structures refer to primitives by their index in
//! [`Scene::primitives`], and the emissive subset is pre-filtered here for
//! next event estimation.

use crate::Primitive;
use thiserror::Error;

/// Errors that can occur while assembling a scene.
#[derive(Error, Debug, PartialEq)]
pub enum SceneError {
    #[error("Scene contains no primitives")]
    Empty,

    #[error("Too many primitives for 32-bit indices: {0}")]
    TooManyPrimitives(usize),
}

pub type SceneResult<T> = Result<T, SceneError>;

/// A validated, non-empty set of primitives.
#[derive(Debug, Clone)]
pub struct Scene {
    primitives: Vec<Primitive>,
    /// Indices of emissive primitives
    lights: Vec<usize>,
    /// Running sum of light surface areas, parallel to `lights`
    light_area_cdf: Vec<f32>,
}

impl Scene {
    /// Create a scene from a list of primitives.
    pub fn new(primitives: Vec<Primitive>) -> SceneResult<Self> {
        if primitives.is_empty() {
            return Err(SceneError::Empty);
        }
        if primitives.len() > u32::MAX as usize {
            return Err(SceneError::TooManyPrimitives(primitives.len()));
        }

        let lights: Vec<usize> = primitives
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_emissive())
            .map(|(i, _)| i)
            .collect();

        let mut total = 0.0;
        let light_area_cdf = lights
            .iter()
            .map(|&i| {
                total += primitives[i].surface_area();
                total
            })
            .collect();

        if lights.is_empty() {
            log::warn!(
                "Scene with {} primitives has no emissive primitives",
                primitives.len()
            );
        } else {
            log::info!(
                "Scene created: {} primitives, {} lights",
                primitives.len(),
                lights.len()
            );
        }

        Ok(Self {
            primitives,
            lights,
            light_area_cdf,
        })
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn primitive(&self, index: usize) -> &Primitive {
        &self.primitives[index]
    }

    /// Indices of the emissive primitives.
    pub fn lights(&self) -> &[usize] {
        &self.lights
    }

    /// Get the number of primitives.
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    /// Always false for a constructed scene.
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Pick a light uniformly from `u` in [0, 1).
    ///
    /// Returns the primitive index and the selection probability.
    pub fn pick_light_uniform(&self, u: f32) -> Option<(usize, f32)> {
        if self.lights.is_empty() {
            return None;
        }
        let n = self.lights.len();
        let slot = ((u * n as f32) as usize).min(n - 1);
        Some((self.lights[slot], 1.0 / n as f32))
    }

    /// Pick a light with probability proportional to its surface area.
    pub fn pick_light_by_area(&self, u: f32) -> Option<(usize, f32)> {
        let total = *self.light_area_cdf.last()?;
        if total <= 0.0 {
            return self.pick_light_uniform(u);
        }

        let target = u * total;
        let slot = self
            .light_area_cdf
            .partition_point(|&acc| acc <= target)
            .min(self.lights.len() - 1);
        let index = self.lights[slot];
        Some((index, self.primitives[index].surface_area() / total))
    }
}
