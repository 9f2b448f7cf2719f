use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use indicatif::ProgressBar;

use lumipath::{
    Camera, Film, Instance, MeshAsset, MeshInstance, PathTracer, RenderSettings, Renderer, Scene,
    geometry::WorldPoint,
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 6 {
        eprintln!(
            "usage: {} <scene.gltf> <width> <height> <frames> <out.png> [threads]",
            args[0]
        );
        std::process::exit(2);
    }
    let scene_path = &args[1];
    let width: u32 = args[2].parse().context("width must be an integer")?;
    let height: u32 = args[3].parse().context("height must be an integer")?;
    let frames: u32 = args[4].parse().context("frames must be an integer")?;
    let output = &args[5];
    let threads = match args.get(6) {
        Some(arg) => arg.parse().context("threads must be a positive integer")?,
        None => std::thread::available_parallelism()
            .map(|n| NonZeroU32::new(n.get().min(128) as u32).unwrap())
            .unwrap_or(NonZeroU32::new(4).unwrap()),
    };

    let asset = Arc::new(
        MeshAsset::from_gltf(scene_path)
            .with_context(|| format!("failed to load scene {scene_path}"))?,
    );
    let mut scene = Scene::new();
    scene.add_instance(Instance::Mesh(MeshInstance::builder().asset(asset).build()));

    let camera = Camera::builder()
        .window_size((width, height))
        .position(WorldPoint::new(0.0, 1.0, 5.0))
        .build();

    let integrator = PathTracer::new();
    let settings = RenderSettings::default();
    let mut film = Film::new(width, height);
    let mut renderer = Renderer::new(threads);

    let start = Instant::now();
    let bar = ProgressBar::new(frames as u64);
    for _ in 0..frames {
        renderer.render_frame(&scene, &camera, &integrator, &mut film, &settings);
        bar.inc(1);
    }
    bar.finish();
    println!(
        "accumulated {frames} frame(s) at {width}x{height} in {:.2?}",
        start.elapsed()
    );

    save_png(&mut film, output)?;
    println!("image written to {output}");
    Ok(())
}

/// The film resolves bottom row first, PNG wants the top row first.
fn save_png(film: &mut Film, path: &str) -> anyhow::Result<()> {
    let (width, height) = (film.width(), film.height());
    let resolved = film.resolve();

    let row_bytes = (width * 4) as usize;
    let mut flipped = Vec::with_capacity(resolved.len());
    for y in (0..height as usize).rev() {
        flipped.extend_from_slice(&resolved[y * row_bytes..(y + 1) * row_bytes]);
    }

    let image = image::RgbaImage::from_raw(width, height, flipped)
        .expect("resolved buffer is always W*H*4");
    image
        .save(path)
        .with_context(|| format!("failed to write {path}"))?;
    Ok(())
}
