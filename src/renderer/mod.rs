mod machinery;
mod worker;

pub use machinery::Renderer;

use std::num::NonZeroU32;

/// Per-frame render configuration.
#[derive(Copy, Clone, Debug)]
pub struct RenderSettings {
    /// Number of contiguous row strips a frame is split into
    pub task_count: NonZeroU32,
    /// Path recursion depth per pixel sample, useful values are 1..=10
    pub ray_depth: u32,
    /// Return distance-darkened base colour instead of path tracing
    pub albedo_only: bool,
}

impl Default for RenderSettings {
    fn default() -> RenderSettings {
        RenderSettings {
            task_count: NonZeroU32::new(128).unwrap(),
            ray_depth: 5,
            albedo_only: false,
        }
    }
}
