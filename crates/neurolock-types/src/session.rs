use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{features::FeatureSet, NeuroLockError, Result};

/// Actions a verifier can ask the user to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    BlinkTwice,
    LookLeftRight,
    FollowDot,
    Smile,
}

impl ChallengeKind {
    pub const ALL: [ChallengeKind; 4] = [
        ChallengeKind::BlinkTwice,
        ChallengeKind::LookLeftRight,
        ChallengeKind::FollowDot,
        ChallengeKind::Smile,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ChallengeKind::BlinkTwice => "blink_twice",
            ChallengeKind::LookLeftRight => "look_left_right",
            ChallengeKind::FollowDot => "follow_dot",
            ChallengeKind::Smile => "smile",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChallengeKind::BlinkTwice => "Blink twice",
            ChallengeKind::LookLeftRight => "Turn your head left then right",
            ChallengeKind::FollowDot => "Follow the moving dot on screen",
            ChallengeKind::Smile => "Smile once",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }
}

/// Server-issued prompt and single-use nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionChallenge {
    #[serde(rename = "challenge")]
    pub challenge_id: String,
    pub nonce: String,
    pub label: String,
    #[serde(default, rename = "ttl", skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
}

impl SessionChallenge {
    pub fn validate(&self) -> Result<()> {
        if self.nonce.trim().is_empty() {
            return Err(NeuroLockError::ChallengeUnavailable(
                "challenge response carried an empty nonce".into(),
            ));
        }
        if self.challenge_id.trim().is_empty() {
            return Err(NeuroLockError::ChallengeUnavailable(
                "challenge response carried an empty challenge id".into(),
            ));
        }
        Ok(())
    }
}

/// Per-attempt state threaded from challenge issuance to submission.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub attempt_id: Uuid,
    pub challenge: SessionChallenge,
    pub created_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(challenge: SessionChallenge) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            challenge,
            created_at: Utc::now(),
        }
    }
}

/// JSON body posted to the verifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationPayload {
    pub nonce: String,
    /// Epoch seconds at capture start.
    pub ts: f64,
    /// Representative frame as a data URL.
    pub face: String,
    pub blink_count: u32,
    pub head_motion: f64,
    pub focus_score: f64,
    pub challenge_observed: String,
}

impl VerificationPayload {
    pub fn assemble(ctx: &SessionContext, features: &FeatureSet, capture_started: f64) -> Self {
        Self {
            nonce: ctx.challenge.nonce.clone(),
            ts: capture_started,
            face: features.representative_frame.to_data_url(),
            blink_count: features.blink_count,
            head_motion: features.head_motion,
            focus_score: features.focus_score,
            challenge_observed: ctx.challenge.challenge_id.clone(),
        }
    }
}

/// Verifier reply. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VerificationResponse {
    pub const SUCCESS: &'static str = "success";

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: Self::SUCCESS.into(),
            reason: None,
            message: Some(message.into()),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            status: "fail".into(),
            reason: Some(reason.into()),
            message: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Self::SUCCESS
    }

    /// Anything but `status == "success"` becomes [`NeuroLockError::VerificationRejected`].
    pub fn into_outcome(self) -> Result<VerificationOutcome> {
        if self.is_success() {
            return Ok(VerificationOutcome {
                message: self.message,
            });
        }
        let reason = self
            .reason
            .or(self.message)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| "unknown".into());
        let status = if self.status.is_empty() {
            "missing".to_string()
        } else {
            self.status
        };
        Err(NeuroLockError::VerificationRejected { status, reason })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub message: Option<String>,
}
