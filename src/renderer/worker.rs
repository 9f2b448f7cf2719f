use rand::rngs::SmallRng;

use crate::camera::Camera;
use crate::film::FilmStrip;
use crate::integrator::PathTracer;
use crate::renderer::RenderSettings;
use crate::scene::Scene;

/// Renders every pixel of one row strip: ask the camera for the pixel ray,
/// estimate its radiance, accumulate into the strip.
#[allow(clippy::too_many_arguments)]
pub(super) fn render_strip(
    scene: &Scene,
    camera: &Camera,
    integrator: &PathTracer,
    settings: &RenderSettings,
    strip: &mut FilmStrip<'_>,
    width: u32,
    height: u32,
    rng: &mut SmallRng,
) {
    for y in strip.rows() {
        for x in 0..width {
            let ray = camera.get_ray(x, y, width, height);
            let colour =
                integrator.trace_ray(scene, &ray, settings.ray_depth, settings.albedo_only, rng);
            strip.add_sample(x, y, colour);
        }
    }
}
