use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lumen_core::scenes::{self, Preset};
use lumen_core::RenderSettings;
use lumen_renderer::{Camera, RenderMode, Renderer};
use std::path::PathBuf;
use std::time::Instant;

/// Built-in scene to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SceneChoice {
    /// Red sphere under a single large light
    RedSphere,
    /// Closed box with a glass ball and a glossy ball
    CornellBox,
    /// Grid of spheres over a ground plane
    SphereField,
}

/// Progressive CPU path tracer.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Options {
    /// Scene to render.
    #[arg(long, short = 's', value_enum, default_value_t = SceneChoice::CornellBox)]
    scene: SceneChoice,

    /// Image width in pixels.
    #[arg(long, default_value_t = 512)]
    width: u32,

    /// Image height in pixels.
    #[arg(long, default_value_t = 512)]
    height: u32,

    /// Samples per pixel; defaults to the settings' target iterations.
    #[arg(long, short = 'n', value_name = "NUM")]
    iterations: Option<u32>,

    /// JSON file with render settings.
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Spheres per side for the sphere field scene.
    #[arg(long, default_value_t = 12)]
    field_size: u32,

    /// Lens radius; 0 renders a pinhole camera.
    #[arg(long, default_value_t = 0.0)]
    aperture: f32,

    /// Render the BVH traversal heat map instead of the shaded image.
    #[arg(long)]
    bvh_debug: bool,

    /// Write the final image to the given file.
    #[arg(long, short = 'o', value_name = "FILE", default_value = "lumen.png")]
    output: PathBuf,
}

fn load_preset(options: &Options) -> Result<Preset> {
    let preset = match options.scene {
        SceneChoice::RedSphere => scenes::red_sphere(),
        SceneChoice::CornellBox => scenes::cornell_box(),
        SceneChoice::SphereField => scenes::sphere_field(options.field_size),
    };
    Ok(preset?)
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let options = Options::parse();
    log::info!("Starting Lumen");

    let settings = match &options.config {
        Some(path) => RenderSettings::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => RenderSettings::default(),
    };
    let iterations = options.iterations.unwrap_or(settings.target_iterations);

    let preset = load_preset(&options)?;
    let view = preset.view;
    let focus_distance = view.eye.distance(view.target);
    let camera = Camera::new()
        .with_resolution(options.width, options.height)
        .with_position(view.eye, view.target, view.up)
        .with_lens(view.vfov, options.aperture, focus_distance);

    let mut renderer = Renderer::new(preset.scene, camera, settings)?;
    if options.bvh_debug {
        renderer.set_mode(RenderMode::BvhDepth);
    }

    let start = Instant::now();
    let report_every = (iterations / 10).max(1);
    while renderer.iteration() < iterations {
        renderer.render_frame();
        let done = renderer.iteration();
        if done % report_every == 0 || done == iterations {
            log::info!(
                "{}/{} iterations ({:.1?} elapsed)",
                done,
                iterations,
                start.elapsed()
            );
        }
    }

    let image = image::RgbaImage::from_raw(renderer.width(), renderer.height(), renderer.output())
        .context("Output buffer does not match the image size")?;
    image
        .save(&options.output)
        .with_context(|| format!("Failed to write {}", options.output.display()))?;

    log::info!(
        "Saved {} after {} iterations in {:.2?}",
        options.output.display(),
        renderer.iteration(),
        start.elapsed()
    );

    Ok(())
}
