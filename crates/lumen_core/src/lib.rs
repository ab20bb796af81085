//! Lumen Core - scene data for the path tracer.
//!
//! This crate provides:
//!
//! - **Materials**: `Material` (lambertian, mirror, dielectric, emissive)
//! - **Primitives**: `Sphere`, `Triangle` and the `Primitive` sum type with
//!   its `Hit` result
//! - **Scenes**: `Scene` with pre-filtered lights, plus built-in presets
//! - **Settings**: `RenderSettings`, validated and loadable from JSON
//!
//! # Example
//!
//! ```ignore
//! use lumen_core::{scenes, RenderSettings};
//!
//! let preset = scenes::cornell_box()?;
//! let settings = RenderSettings::from_file("settings.json")?;
//! println!("{} primitives, {} lights",
//!     preset.scene.len(),
//!     preset.scene.lights().len());
//! ```

pub mod material;
pub mod primitive;
pub mod sampling;
pub mod scene;
pub mod scenes;
pub mod settings;
pub mod sphere;
pub mod triangle;

// Re-export commonly used types
pub use material::{Color, Material};
pub use primitive::{Hit, HitKind, Primitive};
pub use scene::{Scene, SceneError, SceneResult};
pub use settings::{
    BvhSettings, HemisphereSampling, LightSelection, RenderSettings, SettingsError,
    SettingsResult, MAX_BVH_DEPTH,
};
pub use sphere::Sphere;
pub use triangle::Triangle;
