//! Progressive renderer.
//!
//! Every call to [`Renderer::render_frame`] adds one sample per pixel to a
//! running sum; the displayed image is the mean. Anything that changes what
//! the image should look like resets the sum.

use crate::{generate_buckets, Bucket, BucketResult, Bvh, Camera, Integrator, TraversalStats};
use lumen_core::{Color, RenderSettings, Scene, SettingsError};
use lumen_math::Vec3;
use rand_pcg::Pcg32;
use rayon::prelude::*;
use std::time::Instant;
use thiserror::Error;

/// Errors that can occur while setting up a renderer.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Invalid image resolution {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },
}

pub type RenderResult<T> = Result<T, RenderError>;

/// What each frame computes per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Path traced radiance
    #[default]
    Shaded,
    /// Heat map of BVH nodes visited by the pixel's center ray
    BvhDepth,
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Clamp a value to [0, 1] range.
#[inline]
pub fn clamp_01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// Convert a color to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    // Apply gamma correction and convert to 0-255
    let r = (255.0 * clamp_01(linear_to_gamma(color.x))) as u8;
    let g = (255.0 * clamp_01(linear_to_gamma(color.y))) as u8;
    let b = (255.0 * clamp_01(linear_to_gamma(color.z))) as u8;
    [r, g, b, 255]
}

/// Scale a sample down to `max_length`, and discard non-finite ones.
#[inline]
pub fn clamp_sample(color: Color, max_length: f32) -> Color {
    if !color.is_finite() {
        return Color::ZERO;
    }
    let length = color.length();
    if length > max_length {
        color * (max_length / length)
    } else {
        color
    }
}

/// Traversal depth reached by a ray, relative to the depth of the tree.
///
/// Blue (root only) through green to red (deepest leaf); black when the ray
/// misses the root box.
pub fn heat_color(stats: &TraversalStats, tree_depth: u32) -> Color {
    if stats.nodes_visited == 0 {
        return Color::ZERO;
    }
    let t = clamp_01(stats.max_depth as f32 / tree_depth.max(1) as f32);
    let (blue, green, red) = (Vec3::Z, Vec3::Y, Vec3::X);
    if t < 0.5 {
        blue.lerp(green, t * 2.0)
    } else {
        green.lerp(red, (t - 0.5) * 2.0)
    }
}

/// Random stream for one pixel sample.
///
/// Streams differ per pixel, the state per frame, so every sample is
/// reproducible from (seed, x, y, iteration) alone.
fn pixel_rng(seed: u64, x: u32, y: u32, iteration: u32) -> Pcg32 {
    let stream = ((y as u64) << 32) | x as u64;
    let state = seed ^ (iteration as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    Pcg32::new(state, stream)
}

/// Simple image buffer for storing render output.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; (width * height) as usize],
        }
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    /// Convert to RGBA bytes (for display or saving).
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity((self.width * self.height * 4) as usize);
        for color in &self.pixels {
            bytes.extend_from_slice(&color_to_rgba(*color));
        }
        bytes
    }
}

/// Progressive path tracer over one scene.
pub struct Renderer {
    scene: Scene,
    bvh: Bvh,
    camera: Camera,
    settings: RenderSettings,
    mode: RenderMode,
    buckets: Vec<Bucket>,
    /// Sum of all samples per pixel since the last invalidation
    accumulator: ImageBuffer,
    iteration: u32,
}

impl Renderer {
    /// Validate the settings, build the BVH and prepare an empty accumulator.
    pub fn new(scene: Scene, mut camera: Camera, settings: RenderSettings) -> RenderResult<Self> {
        settings.validate()?;
        let (width, height) = (camera.image_width, camera.image_height);
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidResolution { width, height });
        }

        camera.initialize();
        let bvh = Bvh::build(scene.primitives(), &settings.bvh)?;
        let buckets = generate_buckets(width, height, settings.tile_size);

        log::info!(
            "Renderer ready: {}x{}, {} buckets, {} threads",
            width,
            height,
            buckets.len(),
            rayon::current_num_threads()
        );

        Ok(Self {
            scene,
            bvh,
            camera,
            settings,
            mode: RenderMode::default(),
            buckets,
            accumulator: ImageBuffer::new(width, height),
            iteration: 0,
        })
    }

    /// Add one sample to every pixel.
    pub fn render_frame(&mut self) {
        let start = Instant::now();
        let iteration = self.iteration;
        let seed = self.settings.seed;
        let firefly_clamp = self.settings.firefly_clamp;
        let mode = self.mode;

        let integrator = Integrator::new(&self.scene, &self.bvh, &self.settings);
        let camera = &self.camera;
        let bvh = &self.bvh;
        let primitives = self.scene.primitives();

        let results: Vec<BucketResult> = self
            .buckets
            .par_iter()
            .map(|bucket| {
                bucket.render(|x, y| match mode {
                    RenderMode::Shaded => {
                        let mut rng = pixel_rng(seed, x, y, iteration);
                        let ray = camera.get_ray(x, y, &mut rng);
                        clamp_sample(integrator.radiance(&ray, 0, &mut rng), firefly_clamp)
                    }
                    RenderMode::BvhDepth => {
                        let (_, stats) = bvh.intersect_with_stats(primitives, &camera.center_ray(x, y));
                        heat_color(&stats, bvh.depth())
                    }
                })
            })
            .collect();

        // Single writer: buckets never overlap
        for result in results {
            let bucket = result.bucket;
            for (i, color) in result.pixels.into_iter().enumerate() {
                let x = bucket.x + i as u32 % bucket.width;
                let y = bucket.y + i as u32 / bucket.width;
                let sum = self.accumulator.get(x, y) + color;
                self.accumulator.set(x, y, sum);
            }
        }
        self.iteration += 1;

        log::debug!("Frame {} rendered in {:.2?}", self.iteration, start.elapsed());
        if self.iteration == self.settings.target_iterations {
            log::info!("Converged after {} iterations", self.iteration);
        }
    }

    /// Mean color per pixel.
    pub fn output_linear(&self) -> ImageBuffer {
        let mut image = self.accumulator.clone();
        if self.iteration > 0 {
            let count = self.iteration as f32;
            for pixel in &mut image.pixels {
                *pixel /= count;
            }
        }
        image
    }

    /// Gamma corrected RGBA8 image of the running mean.
    pub fn output(&self) -> Vec<u8> {
        self.output_linear().to_rgba()
    }

    /// Running mean of a single pixel.
    pub fn pixel_mean(&self, x: u32, y: u32) -> Color {
        if self.iteration == 0 {
            return Color::ZERO;
        }
        self.accumulator.get(x, y) / self.iteration as f32
    }

    /// Discard all accumulated samples.
    pub fn invalidate(&mut self) {
        self.accumulator.pixels.fill(Color::ZERO);
        self.iteration = 0;
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn is_converged(&self) -> bool {
        self.iteration >= self.settings.target_iterations
    }

    pub fn width(&self) -> u32 {
        self.accumulator.width
    }

    pub fn height(&self) -> u32 {
        self.accumulator.height
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        if self.mode != mode {
            self.mode = mode;
            self.invalidate();
        }
    }

    /// Move the camera in its own frame: x = right, y = up, z = forward.
    pub fn move_camera(&mut self, delta: Vec3) {
        self.camera.move_by(delta);
        self.invalidate();
    }

    /// Yaw, pitch and roll in radians.
    pub fn rotate_camera(&mut self, yaw: f32, pitch: f32, roll: f32) {
        self.camera.rotate(yaw, pitch, roll);
        self.invalidate();
    }

    pub fn zoom(&mut self, delta: f32) {
        self.camera.zoom(delta);
        self.invalidate();
    }

    pub fn change_aperture(&mut self, delta: f32) {
        self.camera.change_aperture(delta);
        self.invalidate();
    }

    pub fn focus(&mut self, delta: f32) {
        self.camera.focus(delta);
        self.invalidate();
    }
}
