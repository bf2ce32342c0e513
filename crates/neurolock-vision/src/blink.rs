use neurolock_types::vision::FrameSeries;

use crate::region::eye_band_brightness;

/// A sample counts as a dip below this fraction of the session mean.
pub const DIP_RATIO: f64 = 0.88;

/// Counts brief brightness dips in the eye band.
pub struct BlinkDetector;

impl BlinkDetector {
    pub fn estimate(frames: &FrameSeries) -> u32 {
        if frames.is_empty() {
            return 0;
        }
        let trace = Self::brightness_trace(frames);
        Self::count_dips(&trace)
    }

    /// One eye-band brightness value per frame.
    pub fn brightness_trace(frames: &FrameSeries) -> Vec<f64> {
        frames.iter().map(eye_band_brightness).collect()
    }

    /// Isolated single-sample dips below `DIP_RATIO * mean`, endpoints excluded.
    pub fn count_dips(trace: &[f64]) -> u32 {
        if trace.len() < 3 {
            return 0;
        }
        let mean = trace.iter().sum::<f64>() / trace.len() as f64;
        let threshold = mean * DIP_RATIO;
        trace
            .windows(3)
            .filter(|w| w[1] < threshold && w[0] >= threshold && w[2] >= threshold)
            .count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurolock_types::vision::Frame;

    #[test]
    fn empty_series_has_no_blinks() {
        assert_eq!(BlinkDetector::estimate(&FrameSeries::new()), 0);
        assert_eq!(BlinkDetector::count_dips(&[]), 0);
    }

    #[test]
    fn single_dip_in_short_trace() {
        // mean = 96, threshold = 84.48
        assert_eq!(BlinkDetector::count_dips(&[100.0, 100.0, 80.0, 100.0, 100.0]), 1);
    }

    #[test]
    fn isolated_half_brightness_sample_is_one_blink() {
        let mut trace = vec![120.0; 30];
        trace[12] = 60.0;
        assert_eq!(BlinkDetector::count_dips(&trace), 1);
    }

    #[test]
    fn trace_without_dips_has_no_blinks() {
        let trace = [100.0, 98.0, 101.0, 95.0, 99.0, 100.0];
        assert_eq!(BlinkDetector::count_dips(&trace), 0);
    }

    #[test]
    fn dips_at_the_ends_are_ignored() {
        assert_eq!(BlinkDetector::count_dips(&[50.0, 100.0, 100.0, 100.0, 50.0]), 0);
    }

    #[test]
    fn known_limitation_multi_frame_dip_is_not_counted() {
        // Two consecutive low samples never match the single-sample pattern.
        let trace = [100.0, 100.0, 50.0, 50.0, 100.0, 100.0];
        assert_eq!(BlinkDetector::count_dips(&trace), 0);
    }

    #[test]
    fn detects_darkened_eye_band_frames() {
        let open = Frame::filled(40, 40, [150, 150, 150, 255]);
        let mut data = open.data().to_vec();
        let eye_top = (40.0_f64 * 0.28).floor() as usize;
        for y in eye_top..eye_top + 6 {
            for x in 0..40 {
                let idx = (y * 40 + x) * 4;
                data[idx..idx + 3].copy_from_slice(&[40, 40, 40]);
            }
        }
        let closed = Frame::from_rgba(40, 40, data).expect("closed frame");

        let frames = [
            open.clone(),
            open.clone(),
            closed.clone(),
            open.clone(),
            open.clone(),
            closed,
            open.clone(),
            open,
        ];
        let series = FrameSeries::from_frames(frames).expect("series");
        assert_eq!(BlinkDetector::estimate(&series), 2);
    }
}
