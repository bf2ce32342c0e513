use neurolock_types::vision::{FrameSeries, CHANNELS};

/// Byte stride between sampled pixels: every 10th RGBA pixel.
pub const SAMPLE_STRIDE_BYTES: usize = 40;

/// Frame-differencing head-motion metric.
pub struct MotionEstimator;

impl MotionEstimator {
    /// Mean per-pair RGB absolute difference over strided samples.
    ///
    /// Each pair is normalised by the full pixel count rather than the number
    /// of sampled pixels, so the value shrinks as resolution grows.
    pub fn estimate(frames: &FrameSeries) -> f64 {
        if frames.len() < 2 {
            return 0.0;
        }
        let total: f64 = frames
            .as_slice()
            .windows(2)
            .map(|pair| pair_difference(pair[0].data(), pair[1].data()))
            .sum();
        total / (frames.len() - 1) as f64
    }
}

fn pair_difference(a: &[u8], b: &[u8]) -> f64 {
    let pixels = a.len() / CHANNELS;
    if pixels == 0 {
        return 0.0;
    }
    let diff: u64 = (0..a.len().min(b.len()))
        .step_by(SAMPLE_STRIDE_BYTES)
        .map(|p| {
            (0..3)
                .map(|c| a[p + c].abs_diff(b[p + c]) as u64)
                .sum::<u64>()
        })
        .sum();
    diff as f64 / pixels as f64
}
