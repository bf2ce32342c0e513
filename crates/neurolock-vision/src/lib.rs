//! Pixel-level liveness signals: head motion, blinks and focus.

pub mod blink;
pub mod encode;
pub mod focus;
pub mod motion;
pub mod region;

use neurolock_types::NeuroLockError;

pub use blink::BlinkDetector;
pub use encode::{FrameArchive, FrameEncoder};
pub use focus::FocusScorer;
pub use motion::MotionEstimator;
pub use region::{eye_band_brightness, forehead_green, SampleRegion};

pub fn vision_error(message: impl Into<String>) -> NeuroLockError {
    NeuroLockError::Vision(message.into())
}
