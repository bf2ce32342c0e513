use async_trait::async_trait;
use neurolock_types::{
    vision::{Frame, CHANNELS},
    Result,
};
use tracing::debug;

use crate::{CaptureMetrics, FrameSource, SharedMetrics};

/// Deterministic textured frames for demos and tests.
///
/// Frames listed in `blink_frames` get a darkened band across the eye row,
/// and `drift_px` shifts the texture horizontally every frame.
pub struct SyntheticFrameSource {
    width: u32,
    height: u32,
    blink_frames: Vec<usize>,
    drift_px: u32,
    index: usize,
    metrics: SharedMetrics,
}

impl SyntheticFrameSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            blink_frames: Vec::new(),
            drift_px: 0,
            index: 0,
            metrics: SharedMetrics::default(),
        }
    }

    pub fn with_blinks(mut self, frames: impl IntoIterator<Item = usize>) -> Self {
        self.blink_frames = frames.into_iter().collect();
        self
    }

    pub fn with_drift(mut self, drift_px: u32) -> Self {
        self.drift_px = drift_px;
        self
    }

    fn render(&self, index: usize) -> Result<Frame> {
        let (w, h) = (self.width as usize, self.height as usize);
        let eye_top = (h as f64 * 0.28).floor() as usize;
        let eye_rows = eye_top.saturating_sub(2)..eye_top + 8;
        let blinking = self.blink_frames.contains(&index);
        let shift = index * self.drift_px as usize;

        let mut data = Vec::with_capacity(w * h * CHANNELS);
        for y in 0..h {
            let dim = blinking && eye_rows.contains(&y);
            for x in 0..w {
                let texture = 96 + ((x + shift) * 7 + y * 13) % 64;
                let base = (if dim { texture / 2 } else { texture }) as u8;
                data.extend_from_slice(&[
                    base.saturating_add(10),
                    base,
                    base.saturating_sub(10),
                    255,
                ]);
            }
        }
        Frame::from_rgba(self.width, self.height, data)
    }
}

#[async_trait]
impl FrameSource for SyntheticFrameSource {
    async fn next_frame(&mut self) -> Result<Frame> {
        let frame = self.render(self.index)?;
        debug!("Synthetic frame {} rendered", self.index);
        self.index += 1;
        self.metrics.record_success();
        Ok(frame)
    }

    fn metrics(&self) -> CaptureMetrics {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blink_frames_darken_eye_band_only() {
        let mut source = SyntheticFrameSource::new(40, 50).with_blinks([1]);
        let open = source.next_frame().await.expect("frame 0");
        let closed = source.next_frame().await.expect("frame 1");

        let eye_y = (50.0_f64 * 0.28).floor() as u32;
        let open_px = open.pixel(20, eye_y).expect("eye pixel");
        let closed_px = closed.pixel(20, eye_y).expect("eye pixel");
        assert!(closed_px[1] < open_px[1]);
        assert_eq!(open.pixel(20, 45), closed.pixel(20, 45));
    }

    #[tokio::test]
    async fn without_drift_frames_repeat() {
        let mut source = SyntheticFrameSource::new(16, 16);
        let a = source.next_frame().await.expect("a");
        let b = source.next_frame().await.expect("b");
        assert_eq!(a.data(), b.data());
        assert_eq!(source.metrics().frames_captured, 2);
    }
}
