use std::num::NonZeroU32;
use std::ops::Range;

use crate::geometry::FloatType;
use crate::material::LinearRgb;

/// Colour space of the resolved 8-bit output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ColourSpace {
    Linear,
    #[default]
    Srgb,
}

/// Tone map applied per channel before encoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ToneMap {
    None,
    #[default]
    Reinhard,
}

/// Progressive per-pixel radiance accumulator.
///
/// Samples are summed in linear RGB together with a per-pixel sample count;
/// [`Film::resolve`] averages, tone maps and encodes the result into a cached
/// RGBA8 buffer (row-major, top-down).
pub struct Film {
    width: u32,
    height: u32,

    accum: Vec<LinearRgb>,
    samples: Vec<u32>,
    display: Vec<u8>,

    colour_space: ColourSpace,
    tone_map: ToneMap,

    /// Accumulation changed since the last resolve
    dirty: bool,
}

impl Film {
    pub fn new(width: u32, height: u32) -> Film {
        let mut film = Film {
            width: 0,
            height: 0,
            accum: Vec::new(),
            samples: Vec::new(),
            display: Vec::new(),
            colour_space: ColourSpace::default(),
            tone_map: ToneMap::default(),
            dirty: true,
        };
        film.resize(width, height);
        film
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    pub fn colour_space(&self) -> ColourSpace {
        self.colour_space
    }

    pub fn set_colour_space(&mut self, colour_space: ColourSpace) {
        self.colour_space = colour_space;
        self.dirty = true;
    }

    pub fn tone_map(&self) -> ToneMap {
        self.tone_map
    }

    pub fn set_tone_map(&mut self, tone_map: ToneMap) {
        self.tone_map = tone_map;
        self.dirty = true;
    }

    /// Reallocates the buffers and drops all accumulated samples.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        let n = self.pixel_count();
        self.accum = vec![LinearRgb::zeros(); n];
        self.samples = vec![0; n];
        self.display = vec![0; n * 4];
        self.dirty = true;
    }

    /// Zeroes the accumulators, keeping the resolution.
    pub fn reset(&mut self) {
        self.accum.fill(LinearRgb::zeros());
        self.samples.fill(0);
        self.dirty = true;
    }

    /// Adds one sample in linear RGB. Panics if the pixel is out of bounds.
    pub fn add_sample(&mut self, x: u32, y: u32, linear_rgb: LinearRgb) {
        let index = self.pixel_index(x, y);
        self.accum[index] += linear_rgb;
        self.samples[index] += 1;
        self.dirty = true;
    }

    /// Current average in linear space, zero if the pixel has no samples yet.
    pub fn average_at(&self, x: u32, y: u32) -> LinearRgb {
        let index = self.pixel_index(x, y);
        let count = self.samples[index];
        if count > 0 {
            self.accum[index] / count as FloatType
        } else {
            LinearRgb::zeros()
        }
    }

    pub fn sample_count_at(&self, x: u32, y: u32) -> u32 {
        self.samples[self.pixel_index(x, y)]
    }

    /// Averages, tone maps and encodes the accumulation into a `W*H*4` RGBA8
    /// buffer. The buffer is cached and returned unchanged until the next
    /// sample or setter call.
    pub fn resolve(&mut self) -> &[u8] {
        if !self.dirty {
            return &self.display;
        }

        for (index, pixel) in self.display.chunks_exact_mut(4).enumerate() {
            let count = self.samples[index];
            let mut c = if count > 0 {
                self.accum[index] / count as FloatType
            } else {
                LinearRgb::zeros()
            };

            if self.tone_map == ToneMap::Reinhard {
                c = c.map(|u| u / (1.0 + u));
            }
            c = c.map(|u| u.clamp(0.0, 1.0));
            if self.colour_space == ColourSpace::Srgb {
                c = c.map(srgb_encode);
            }

            pixel[0] = (c.x * 255.0).round() as u8;
            pixel[1] = (c.y * 255.0).round() as u8;
            pixel[2] = (c.z * 255.0).round() as u8;
            pixel[3] = 255;
        }

        self.dirty = false;
        &self.display
    }

    /// Splits the accumulation buffers into up to `count` contiguous row
    /// strips of `ceil(height / count)` rows each (the last strip truncated).
    /// The strips are disjoint, so workers can write to them concurrently
    /// without locking.
    pub fn strips(&mut self, count: NonZeroU32) -> Vec<FilmStrip<'_>> {
        if self.pixel_count() == 0 {
            return Vec::new();
        }
        self.dirty = true;

        let strip_rows = self.height.div_ceil(count.get());
        let chunk = (strip_rows * self.width) as usize;
        let width = self.width;
        let height = self.height;

        self.accum
            .chunks_mut(chunk)
            .zip(self.samples.chunks_mut(chunk))
            .enumerate()
            .map(|(i, (accum, samples))| {
                let y_start = i as u32 * strip_rows;
                FilmStrip {
                    width,
                    rows: y_start..height.min(y_start + strip_rows),
                    accum,
                    samples,
                }
            })
            .collect()
    }

    fn pixel_index(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "film pixel out of bounds");
        (y * self.width + x) as usize
    }
}

/// Exclusive view of a contiguous band of film rows.
pub struct FilmStrip<'a> {
    width: u32,
    rows: Range<u32>,
    accum: &'a mut [LinearRgb],
    samples: &'a mut [u32],
}

impl FilmStrip<'_> {
    /// The image rows covered by this strip, in global coordinates.
    pub fn rows(&self) -> Range<u32> {
        self.rows.clone()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Adds one sample; `y` is the global row index.
    pub fn add_sample(&mut self, x: u32, y: u32, linear_rgb: LinearRgb) {
        debug_assert!(self.rows.contains(&y));
        let index = ((y - self.rows.start) * self.width + x) as usize;
        self.accum[index] += linear_rgb;
        self.samples[index] += 1;
    }
}

/// The IEC 61966-2-1 piecewise transfer function, linear input in [0,1].
fn srgb_encode(u: FloatType) -> FloatType {
    if u <= 0.003_130_8 {
        12.92 * u
    } else {
        1.055 * u.powf(1.0 / 2.4) - 0.055
    }
}
