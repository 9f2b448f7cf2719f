pub mod assets;
mod camera;
mod film;
pub mod geometry;
mod integrator;
mod material;
mod renderer;
pub mod scene;

pub use camera::Camera;
pub use film::{ColourSpace, Film, FilmStrip, ToneMap};
pub use integrator::PathTracer;
pub use material::{LinearRgb, Material};
pub use renderer::{RenderSettings, Renderer};
pub use scene::{Instance, MeshAsset, MeshInstance, OrientedBox, Scene, Sphere};
