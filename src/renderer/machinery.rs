use std::num::NonZeroU32;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use scoped_threadpool::Pool;

use crate::camera::Camera;
use crate::film::Film;
use crate::integrator::PathTracer;
use crate::renderer::{RenderSettings, worker};
use crate::scene::Scene;

/// Owns the worker pool and drives one progressive frame at a time.
///
/// A frame request partitions the film rows into [`RenderSettings::task_count`]
/// contiguous strips and hands each to a pooled worker; the call blocks until
/// every strip has been accumulated, so the caller observes complete frames
/// only. Scene, camera and settings changes between frames are therefore
/// always applied at a frame boundary.
pub struct Renderer {
    pool: Pool,
    thread_count: NonZeroU32,
    /// Advances every frame so the per-strip RNG streams never repeat
    frame_nonce: u64,
}

impl Renderer {
    pub fn new(thread_count: NonZeroU32) -> Renderer {
        Renderer {
            pool: Pool::new(thread_count.get()),
            thread_count,
            frame_nonce: 0,
        }
    }

    pub fn thread_count(&self) -> NonZeroU32 {
        self.thread_count
    }

    /// Replaces the worker pool. The old pool joins its threads when
    /// dropped, so the swap is a clean shutdown and restart; never call this
    /// while a frame is in flight (the borrow checker enforces it).
    pub fn set_thread_count(&mut self, thread_count: NonZeroU32) {
        if thread_count != self.thread_count {
            self.thread_count = thread_count;
            self.pool = Pool::new(thread_count.get());
        }
    }

    /// Accumulates one sample per pixel into the film.
    ///
    /// Each strip gets its own `SmallRng` seeded from the frame nonce and
    /// the strip index; the streams are independent of the thread count, so
    /// rendering the same frame sequence with any pool size produces the
    /// same film.
    pub fn render_frame(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        integrator: &PathTracer,
        film: &mut Film,
        settings: &RenderSettings,
    ) {
        let (width, height) = (film.width(), film.height());
        if width == 0 || height == 0 {
            return;
        }

        let frame_nonce = self.frame_nonce;
        self.frame_nonce += 1;

        let start = Instant::now();
        let strips = film.strips(settings.task_count);
        self.pool.scoped(|scope| {
            for (strip_index, mut strip) in strips.into_iter().enumerate() {
                scope.execute(move || {
                    let mut rng = SmallRng::seed_from_u64(strip_seed(frame_nonce, strip_index));
                    worker::render_strip(
                        scene, camera, integrator, settings, &mut strip, width, height, &mut rng,
                    );
                });
            }
        });

        log::debug!(
            "frame {frame_nonce}: {width}x{height} in {:.1?} on {} threads",
            start.elapsed(),
            self.thread_count
        );
    }
}

fn strip_seed(frame_nonce: u64, strip_index: usize) -> u64 {
    (frame_nonce ^ 0x9E37_79B9_7F4A_7C15)
        .wrapping_mul(0x2545_F491_4F6C_DD1D)
        .wrapping_add(strip_index as u64)
}
