//! Simple progressive render example.
//!
//! Builds a field of random spheres, accumulates a few frames and saves the
//! result in PPM format.

use lumen_core::{Color, Material, Primitive, RenderSettings, Scene, Sphere};
use lumen_renderer::{color_to_rgba, Camera, ImageBuffer, Renderer, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::{BufWriter, Write};

const FRAMES: u32 = 64;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let start = std::time::Instant::now();
    let scene = build_scene()?;
    log::info!("Scene built in {:?}", start.elapsed());

    let camera = Camera::new()
        .with_resolution(400, 225)
        .with_position(Vec3::new(13.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y)
        .with_lens(20.0, 0.1, 10.0);

    let mut renderer = Renderer::new(scene, camera, RenderSettings::default())?;

    let start = std::time::Instant::now();
    for _ in 0..FRAMES {
        renderer.render_frame();
    }
    log::info!("Rendered {} frames in {:?}", FRAMES, start.elapsed());

    let filename = "output.ppm";
    save_ppm(&renderer.output_linear(), filename)?;
    log::info!("Saved to {}", filename);
    Ok(())
}

fn build_scene() -> Result<Scene, lumen_core::SceneError> {
    let mut objects: Vec<Primitive> = Vec::new();

    // Ground
    objects.push(
        Sphere::new(
            Vec3::new(0.0, -1000.0, 0.0),
            1000.0,
            Material::lambertian(Color::new(0.5, 0.5, 0.5)),
        )
        .into(),
    );

    // Three main spheres
    objects.push(Sphere::new(Vec3::new(0.0, 1.0, 0.0), 1.0, Material::glass(1.5)).into());
    objects.push(
        Sphere::new(
            Vec3::new(-4.0, 1.0, 0.0),
            1.0,
            Material::lambertian(Color::new(0.4, 0.2, 0.1)),
        )
        .into(),
    );
    objects.push(
        Sphere::new(
            Vec3::new(4.0, 1.0, 0.0),
            1.0,
            Material::mirror(Color::new(0.7, 0.6, 0.5)),
        )
        .into(),
    );

    // Sun
    objects.push(
        Sphere::new(
            Vec3::new(0.0, 40.0, 10.0),
            8.0,
            Material::emissive(Color::splat(6.0)),
        )
        .into(),
    );

    // Small random spheres
    let mut rng = StdRng::seed_from_u64(2024);
    for a in -5..5 {
        for b in -5..5 {
            let center = Vec3::new(
                a as f32 + 0.9 * rng.gen::<f32>(),
                0.2,
                b as f32 + 0.9 * rng.gen::<f32>(),
            );
            if (center - Vec3::new(4.0, 0.2, 0.0)).length() <= 0.9 {
                continue;
            }

            let choose_mat: f32 = rng.gen();
            let material = if choose_mat < 0.8 {
                Material::lambertian(Color::new(
                    rng.gen::<f32>() * rng.gen::<f32>(),
                    rng.gen::<f32>() * rng.gen::<f32>(),
                    rng.gen::<f32>() * rng.gen::<f32>(),
                ))
            } else if choose_mat < 0.95 {
                let albedo = Color::new(
                    0.5 + 0.5 * rng.gen::<f32>(),
                    0.5 + 0.5 * rng.gen::<f32>(),
                    0.5 + 0.5 * rng.gen::<f32>(),
                );
                Material::glossy(albedo, 0.5 * rng.gen::<f32>())
            } else {
                Material::dielectric(Color::new(0.9, 0.95, 1.0), 1.5, 2.0)
            };
            objects.push(Sphere::new(center, 0.2, material).into());
        }
    }

    Scene::new(objects)
}

fn save_ppm(image: &ImageBuffer, filename: &str) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "P3")?;
    writeln!(writer, "{} {}", image.width, image.height)?;
    writeln!(writer, "255")?;

    for y in 0..image.height {
        for x in 0..image.width {
            let rgba = color_to_rgba(image.get(x, y));
            writeln!(writer, "{} {} {}", rgba[0], rgba[1], rgba[2])?;
        }
    }

    Ok(())
}
