use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::FeatureSummary;

/// Stages of an authentication attempt that get published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    ChallengeIssued,
    CaptureStarted,
    FeaturesExtracted,
    Verified,
    Failed,
}

/// Immutable event envelope for logging and the attempt journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptEvent {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Challenge { challenge_id: String, label: String },
    Capture { total_frames: usize, target_fps: u32 },
    Features(FeatureSummary),
    Verified { message: Option<String> },
    Failed { category: String, detail: String },
}

impl AttemptEvent {
    pub fn new(attempt_id: Uuid, payload: EventPayload) -> Self {
        let kind = match &payload {
            EventPayload::Challenge { .. } => EventKind::ChallengeIssued,
            EventPayload::Capture { .. } => EventKind::CaptureStarted,
            EventPayload::Features(_) => EventKind::FeaturesExtracted,
            EventPayload::Verified { .. } => EventKind::Verified,
            EventPayload::Failed { .. } => EventKind::Failed,
        };
        Self {
            id: Uuid::new_v4(),
            attempt_id,
            kind,
            timestamp: Utc::now(),
            payload,
        }
    }
}
