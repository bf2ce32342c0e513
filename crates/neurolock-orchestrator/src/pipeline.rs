use neurolock_capture::FrameSource;
use neurolock_types::{
    config::VisionConfig, features::FeatureSet, vision::FrameSeries, NeuroLockError, Result,
};
use neurolock_vision::{
    forehead_green, BlinkDetector, FocusScorer, FrameArchive, FrameEncoder, MotionEstimator,
};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::orchestrator_error;

/// Lower bound on frames per capture window.
pub const MIN_FRAMES: usize = 4;

/// Upper bound on buffers reserved ahead of capture; longer windows grow on demand.
const PREALLOCATED_FRAMES: usize = 1024;

/// Capture-then-compute feature extraction for one attempt.
#[derive(Debug, Clone, Default)]
pub struct FeaturePipeline {
    encoder: FrameEncoder,
    archive: FrameArchive,
}

impl FeaturePipeline {
    pub fn new(encoder: FrameEncoder, archive: FrameArchive) -> Self {
        Self { encoder, archive }
    }

    pub fn from_config(config: &VisionConfig) -> Self {
        Self::new(FrameEncoder::new(config.jpeg_quality), FrameArchive::new(config))
    }

    /// `max(4, floor(duration_seconds * target_fps))`
    pub fn total_frames(duration_seconds: f64, target_fps: u32) -> usize {
        let planned = (duration_seconds * target_fps as f64).floor();
        if planned.is_finite() && planned > MIN_FRAMES as f64 {
            planned as usize
        } else {
            MIN_FRAMES
        }
    }

    pub async fn run<S>(
        &self,
        source: &mut S,
        duration_seconds: f64,
        target_fps: u32,
    ) -> Result<FeatureSet>
    where
        S: FrameSource + ?Sized,
    {
        validate_cadence(duration_seconds, target_fps)?;
        let total = Self::total_frames(duration_seconds, target_fps);
        let pace = Duration::from_secs_f64(1.0 / target_fps as f64);
        info!(
            "Capturing {} frames at {} fps ({:.2}s window)",
            total, target_fps, duration_seconds
        );

        let reserved = total.min(PREALLOCATED_FRAMES);
        let mut frames = FrameSeries::with_capacity(reserved);
        let mut green_series = Vec::with_capacity(reserved);
        for index in 0..total {
            let frame = source.next_frame().await?;
            green_series.push(forehead_green(&frame));
            frames.push(frame)?;
            debug!("Captured frame {}/{}", index + 1, total);
            sleep(pace).await;
        }

        let blink_count = BlinkDetector::estimate(&frames);
        let head_motion = MotionEstimator::estimate(&frames);
        let focus_score = FocusScorer::score(&green_series, blink_count, duration_seconds);

        let representative = frames
            .get(total / 2)
            .ok_or_else(|| orchestrator_error("representative frame missing from capture"))?;
        let representative_frame = self.encoder.encode(representative)?;
        if let Err(err) = self.archive.persist(&representative_frame).await {
            warn!("Representative frame not archived: {}", err);
        }

        Ok(FeatureSet {
            blink_count,
            head_motion,
            focus_score,
            representative_frame,
        })
    }
}

fn validate_cadence(duration_seconds: f64, target_fps: u32) -> Result<()> {
    if !(duration_seconds.is_finite() && duration_seconds > 0.0) {
        return Err(NeuroLockError::Configuration(format!(
            "capture duration must be positive, got {duration_seconds}"
        )));
    }
    if target_fps == 0 {
        return Err(NeuroLockError::Configuration(
            "target fps must be greater than zero".into(),
        ));
    }
    Ok(())
}
