//! Fixed sampling regions, expressed relative to frame size.

use neurolock_types::vision::Frame;

/// Rectangle in pixel coordinates derived from fractions of the frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRegion {
    pub x_start: u32,
    pub x_end: u32,
    pub y_start: u32,
    pub y_end: u32,
    pub step_x: usize,
    pub step_y: usize,
}

impl SampleRegion {
    /// Forehead patch: y in [0.12h, 0.12h + 0.13h), x in [0.35w, 0.65w), every 3rd pixel.
    pub fn forehead(width: u32, height: u32) -> Self {
        let y_start = fraction(height, 0.12);
        Self {
            x_start: fraction(width, 0.35),
            x_end: fraction(width, 0.65),
            y_start,
            y_end: y_start + fraction(height, 0.13),
            step_x: 3,
            step_y: 3,
        }
    }

    /// Eye band: 6 rows from 0.28h, x in [0.25w, 0.75w), every 4th column.
    pub fn eye_band(width: u32, height: u32) -> Self {
        let y_start = fraction(height, 0.28);
        Self {
            x_start: fraction(width, 0.25),
            x_end: fraction(width, 0.75),
            y_start,
            y_end: y_start + 6,
            step_x: 4,
            step_y: 1,
        }
    }

    /// Pixels visited by this region, clipped to the frame.
    pub fn pixels<'a>(&self, frame: &'a Frame) -> impl Iterator<Item = [u8; 4]> + 'a {
        let region = *self;
        (region.y_start..region.y_end)
            .step_by(region.step_y)
            .flat_map(move |y| {
                (region.x_start..region.x_end)
                    .step_by(region.step_x)
                    .map(move |x| (x, y))
            })
            .filter_map(move |(x, y)| frame.pixel(x, y))
    }
}

fn fraction(extent: u32, ratio: f64) -> u32 {
    (extent as f64 * ratio).floor() as u32
}

/// Mean green value over the forehead patch, scaled to `[0, 1]`.
pub fn forehead_green(frame: &Frame) -> f64 {
    let region = SampleRegion::forehead(frame.width(), frame.height());
    let (sum, count) = region
        .pixels(frame)
        .fold((0.0_f64, 0usize), |(sum, count), px| (sum + px[1] as f64, count + 1));
    sum / count.max(1) as f64 / 255.0
}

/// Mean `(R+G+B)/3` over the eye band, 0 when the band falls outside the frame.
pub fn eye_band_brightness(frame: &Frame) -> f64 {
    let region = SampleRegion::eye_band(frame.width(), frame.height());
    let (sum, count) = region.pixels(frame).fold((0.0_f64, 0usize), |(sum, count), px| {
        let brightness = (px[0] as f64 + px[1] as f64 + px[2] as f64) / 3.0;
        (sum + brightness, count + 1)
    });
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
