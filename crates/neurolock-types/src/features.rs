use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// JPEG-encoded still image submitted alongside the computed features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub jpeg: Vec<u8>,
}

impl EncodedFrame {
    pub const MIME: &'static str = "image/jpeg";

    /// `data:image/jpeg;base64,...` form expected by the verifier.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", Self::MIME, STANDARD.encode(&self.jpeg))
    }

    pub fn len(&self) -> usize {
        self.jpeg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jpeg.is_empty()
    }
}

/// Liveness signals derived from one capture window.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub blink_count: u32,
    pub head_motion: f64,
    /// Always within `[0.0, 1.0]`.
    pub focus_score: f64,
    pub representative_frame: EncodedFrame,
}

impl FeatureSet {
    pub fn summary(&self, frames_captured: usize) -> FeatureSummary {
        FeatureSummary {
            blink_count: self.blink_count,
            head_motion: self.head_motion,
            focus_score: self.focus_score,
            frames_captured,
            face_bytes: self.representative_frame.len(),
        }
    }
}

/// Serializable view of a [`FeatureSet`] without the image payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub blink_count: u32,
    pub head_motion: f64,
    pub focus_score: f64,
    pub frames_captured: usize,
    pub face_bytes: usize,
}
