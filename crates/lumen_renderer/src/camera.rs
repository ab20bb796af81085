//! Thin-lens camera for ray generation.

use lumen_core::sampling::{gen_f32, random_in_unit_disk};
use lumen_math::{Quat, Ray, Vec3};
use rand::RngCore;

/// Smallest focal length and focus distance the mutators allow.
const MIN_FOCUS: f32 = 0.01;

/// Camera for generating primary rays into the scene.
///
/// Configure with the builder methods, then call [`Camera::initialize`]
/// before generating rays. The mutators re-initialize on their own.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    // Image settings
    pub image_width: u32,
    pub image_height: u32,

    // Orthonormal frame
    position: Vec3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,

    // Lens settings
    vfov: f32,           // Vertical field of view in degrees
    focal_length: f32,   // Divides the screen extents; larger zooms in
    aperture: f32,       // Lens disk radius, 0 = pinhole
    focus_distance: f32, // Distance from camera to plane of perfect focus

    // Cached computed values (set by initialize())
    pixel00_loc: Vec3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self {
            image_width: 512,
            image_height: 512,
            position: Vec3::ZERO,
            forward: Vec3::Z,
            right: Vec3::NEG_X,
            up: Vec3::Y,
            vfov: 90.0,
            focal_length: 1.0,
            aperture: 0.0,
            focus_distance: 1.0,
            pixel00_loc: Vec3::ZERO,
            pixel_delta_u: Vec3::ZERO,
            pixel_delta_v: Vec3::ZERO,
        }
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width;
        self.image_height = height;
        self
    }

    /// Place the camera at `origin` looking at `target`.
    ///
    /// `up` only guides the frame; it need not be perpendicular to the view
    /// direction, but must not be parallel to it.
    pub fn with_position(mut self, origin: Vec3, target: Vec3, up: Vec3) -> Self {
        self.position = origin;
        self.forward = (target - origin).normalize();
        self.right = self.forward.cross(up).normalize();
        self.up = self.right.cross(self.forward);
        self
    }

    /// Set lens settings.
    pub fn with_lens(mut self, vfov: f32, aperture: f32, focus_distance: f32) -> Self {
        self.vfov = vfov;
        self.aperture = aperture.max(0.0);
        self.focus_distance = focus_distance.max(MIN_FOCUS);
        self
    }

    pub fn with_focal_length(mut self, focal_length: f32) -> Self {
        self.focal_length = focal_length.max(MIN_FOCUS);
        self
    }

    /// Initialize the camera (must be called before generating rays).
    pub fn initialize(&mut self) {
        let half_height = (self.vfov.to_radians() / 2.0).tan() / self.focal_length;
        let aspect = self.image_width as f32 / self.image_height.max(1) as f32;

        // Viewport lies on the focal plane so lens rays converge there
        let viewport_height = 2.0 * half_height * self.focus_distance;
        let viewport_width = viewport_height * aspect;

        let viewport_u = viewport_width * self.right;
        let viewport_v = -viewport_height * self.up;

        self.pixel_delta_u = viewport_u / self.image_width.max(1) as f32;
        self.pixel_delta_v = viewport_v / self.image_height.max(1) as f32;

        let viewport_upper_left =
            self.position + self.focus_distance * self.forward - viewport_u / 2.0 - viewport_v / 2.0;
        self.pixel00_loc = viewport_upper_left + 0.5 * (self.pixel_delta_u + self.pixel_delta_v);
    }

    /// Generate a jittered ray through pixel (x, y), sampling the lens.
    pub fn get_ray(&self, x: u32, y: u32, rng: &mut dyn RngCore) -> Ray {
        let offset = sample_square(rng);

        let pixel_sample = self.pixel00_loc
            + ((x as f32) + offset.x) * self.pixel_delta_u
            + ((y as f32) + offset.y) * self.pixel_delta_v;

        let origin = if self.aperture <= 0.0 {
            self.position
        } else {
            let p = random_in_unit_disk(rng) * self.aperture;
            self.position + p.x * self.right + p.y * self.up
        };

        Ray::primary(origin, (pixel_sample - origin).normalize())
    }

    /// Pinhole ray through the center of pixel (x, y).
    pub fn center_ray(&self, x: u32, y: u32) -> Ray {
        let pixel_center =
            self.pixel00_loc + (x as f32) * self.pixel_delta_u + (y as f32) * self.pixel_delta_v;
        Ray::primary(self.position, (pixel_center - self.position).normalize())
    }

    /// Move in camera space: x = right, y = up, z = forward.
    pub fn move_by(&mut self, delta: Vec3) {
        self.position += self.right * delta.x + self.up * delta.y + self.forward * delta.z;
        self.initialize();
    }

    /// Rotate the frame by yaw (around up), pitch (around right) and roll
    /// (around forward), all in radians.
    pub fn rotate(&mut self, yaw: f32, pitch: f32, roll: f32) {
        let rotation = Quat::from_axis_angle(self.up, yaw)
            * Quat::from_axis_angle(self.right, pitch)
            * Quat::from_axis_angle(self.forward, roll);

        self.forward = (rotation * self.forward).normalize();
        // Re-orthonormalize so rounding does not skew the frame
        let up = (rotation * self.right).cross(self.forward).normalize();
        self.right = self.forward.cross(up).normalize();
        self.up = self.right.cross(self.forward);
        self.initialize();
    }

    /// Change the focal length; positive zooms in.
    pub fn zoom(&mut self, delta: f32) {
        self.focal_length = (self.focal_length + delta).max(MIN_FOCUS);
        self.initialize();
    }

    pub fn change_aperture(&mut self, delta: f32) {
        self.aperture = (self.aperture + delta).max(0.0);
        self.initialize();
    }

    /// Move the focal plane.
    pub fn focus(&mut self, delta: f32) {
        self.focus_distance = (self.focus_distance + delta).max(MIN_FOCUS);
        self.initialize();
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn vfov(&self) -> f32 {
        self.vfov
    }

    pub fn focal_length(&self) -> f32 {
        self.focal_length
    }

    pub fn aperture(&self) -> f32 {
        self.aperture
    }

    pub fn focus_distance(&self) -> f32 {
        self.focus_distance
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

/// Sample a random point in the unit square [-0.5, 0.5] x [-0.5, 0.5].
fn sample_square(rng: &mut dyn RngCore) -> Vec3 {
    Vec3::new(gen_f32(rng) - 0.5, gen_f32(rng) - 0.5, 0.0)
}
