//! Built-in scenes.
//!
//! Asset loading lives outside the renderer, so these hand-built scenes are
//! what the command line tool and the integration tests render.

use crate::{Color, Material, Primitive, Scene, SceneResult, Sphere, Triangle};
use lumen_math::Vec3;

/// Where a preset expects the camera to be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub vfov: f32,
}

/// A scene together with its suggested view.
#[derive(Debug, Clone)]
pub struct Preset {
    pub scene: Scene,
    pub view: View,
}

/// Unit red sphere at the origin lit by one large spherical light.
///
/// The light sits below the sphere on the camera side so the surface facing
/// the camera receives direct light.
pub fn red_sphere() -> SceneResult<Preset> {
    let scene = Scene::new(vec![
        Sphere::new(Vec3::ZERO, 1.0, Material::lambertian(Color::new(1.0, 0.0, 0.0))).into(),
        Sphere::new(
            Vec3::new(0.0, -10.0, -15.0),
            3.0,
            Material::emissive(Color::splat(10.0)),
        )
        .into(),
    ])?;

    Ok(Preset {
        scene,
        view: View {
            eye: Vec3::new(0.0, 0.0, -2.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            vfov: 90.0,
        },
    })
}

/// Closed box with coloured walls, a spherical ceiling light, a glass ball and
/// a mirror ball. The camera sits inside, so no path can escape.
pub fn cornell_box() -> SceneResult<Preset> {
    let white = Material::lambertian(Color::splat(0.73));
    let red = Material::lambertian(Color::new(0.65, 0.05, 0.05));
    let green = Material::lambertian(Color::new(0.12, 0.45, 0.15));

    let c = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);
    let mut primitives = Vec::new();
    // floor, ceiling, back, front
    quad(&mut primitives, [c(-1., -1., -1.), c(1., -1., -1.), c(1., -1., 1.), c(-1., -1., 1.)], white);
    quad(&mut primitives, [c(-1., 1., -1.), c(-1., 1., 1.), c(1., 1., 1.), c(1., 1., -1.)], white);
    quad(&mut primitives, [c(-1., -1., 1.), c(1., -1., 1.), c(1., 1., 1.), c(-1., 1., 1.)], white);
    quad(&mut primitives, [c(-1., -1., -1.), c(-1., 1., -1.), c(1., 1., -1.), c(1., -1., -1.)], white);
    // left, right
    quad(&mut primitives, [c(-1., -1., -1.), c(-1., -1., 1.), c(-1., 1., 1.), c(-1., 1., -1.)], red);
    quad(&mut primitives, [c(1., -1., -1.), c(1., 1., -1.), c(1., 1., 1.), c(1., -1., 1.)], green);

    primitives.push(Sphere::new(c(0.0, 0.75, 0.2), 0.15, Material::emissive(Color::splat(12.0))).into());
    primitives.push(Sphere::new(c(-0.45, -0.65, 0.35), 0.35, Material::glass(1.5)).into());
    primitives.push(
        Sphere::new(c(0.45, -0.65, -0.1), 0.35, Material::glossy(Color::splat(0.9), 0.05)).into(),
    );

    Ok(Preset {
        scene: Scene::new(primitives)?,
        view: View {
            eye: c(0.0, 0.0, -0.95),
            target: c(0.0, 0.0, 1.0),
            up: Vec3::Y,
            vfov: 70.0,
        },
    })
}

/// Grid of small spheres over a floor, enough primitives to make the BVH work.
pub fn sphere_field(count_per_side: u32) -> SceneResult<Preset> {
    let mut primitives: Vec<Primitive> = Vec::new();
    let n = count_per_side.max(1);
    let spacing = 0.6;
    let offset = (n - 1) as f32 * spacing * 0.5;

    let ground = Material::lambertian(Color::splat(0.5));
    primitives.push(Sphere::new(Vec3::new(0.0, -1000.0, 0.0), 1000.0, ground).into());

    for i in 0..n {
        for j in 0..n {
            let center = Vec3::new(i as f32 * spacing - offset, 0.2, j as f32 * spacing - offset);
            let material = match (i + j) % 4 {
                0 => Material::glass(1.5),
                1 => Material::mirror(Color::splat(0.8)),
                _ => Material::lambertian(Color::new(
                    0.2 + 0.6 * (i as f32 / n as f32),
                    0.3,
                    0.2 + 0.6 * (j as f32 / n as f32),
                )),
            };
            primitives.push(Sphere::new(center, 0.2, material).into());
        }
    }

    primitives.push(
        Sphere::new(Vec3::new(0.0, 8.0, 0.0), 2.0, Material::emissive(Color::splat(15.0))).into(),
    );

    Ok(Preset {
        scene: Scene::new(primitives)?,
        view: View {
            eye: Vec3::new(0.0, 3.0, -offset - 4.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            vfov: 50.0,
        },
    })
}

fn quad(out: &mut Vec<Primitive>, [a, b, c, d]: [Vec3; 4], material: Material) {
    out.push(Triangle::new(a, b, c, material).into());
    out.push(Triangle::new(a, c, d, material).into());
}
