//! Attempt orchestration: challenge, capture, feature extraction, submission.

pub mod pipeline;

use async_trait::async_trait;
use chrono::Utc;
use neurolock_capture::FrameSource;
use neurolock_network::{EventBus, VerifierClient};
use neurolock_ops::{AttemptJournal, AttemptRecord, AttemptStatus};
use neurolock_types::{
    config::CaptureConfig,
    events::{AttemptEvent, EventPayload},
    features::FeatureSummary,
    session::{SessionContext, VerificationOutcome, VerificationPayload},
    NeuroLockError, Result,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

pub use pipeline::FeaturePipeline;

/// Capture cadence for one attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureSettings {
    pub duration_secs: f64,
    pub target_fps: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            duration_secs: 4.0,
            target_fps: 15,
        }
    }
}

impl From<&CaptureConfig> for CaptureSettings {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            duration_secs: config.duration_secs,
            target_fps: config.target_fps,
        }
    }
}

/// Result of an accepted attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub attempt_id: Uuid,
    pub challenge_id: String,
    pub features: FeatureSummary,
    pub verdict: VerificationOutcome,
}

/// Drives one attempt at a time against a verifier.
pub struct Authenticator<S, V, B>
where
    S: FrameSource,
    V: VerifierClient,
    B: EventBus,
{
    source: S,
    verifier: V,
    bus: B,
    journal: AttemptJournal,
    pipeline: FeaturePipeline,
    settings: CaptureSettings,
}

impl<S, V, B> Authenticator<S, V, B>
where
    S: FrameSource,
    V: VerifierClient,
    B: EventBus,
{
    pub fn new(
        settings: CaptureSettings,
        pipeline: FeaturePipeline,
        source: S,
        verifier: V,
        bus: B,
        journal: AttemptJournal,
    ) -> Self {
        Self {
            source,
            verifier,
            bus,
            journal,
            pipeline,
            settings,
        }
    }

    /// Opens the frame source.
    pub async fn prepare(&mut self) -> Result<()> {
        self.source.open().await
    }

    /// Requests a fresh challenge and wraps it in a new session context.
    pub async fn begin(&self) -> Result<SessionContext> {
        let challenge = self.verifier.issue_challenge().await.map_err(|err| {
            warn!("Challenge request failed: {}", err);
            err
        })?;
        let ctx = SessionContext::new(challenge);
        info!(
            "Challenge received: {} (attempt {})",
            ctx.challenge.label, ctx.attempt_id
        );
        self.publish(AttemptEvent::new(
            ctx.attempt_id,
            EventPayload::Challenge {
                challenge_id: ctx.challenge.challenge_id.clone(),
                label: ctx.challenge.label.clone(),
            },
        ))
        .await?;
        Ok(ctx)
    }

    /// Captures, extracts and submits features for `ctx`.
    pub async fn authenticate(&mut self, ctx: &SessionContext) -> Result<AttemptOutcome> {
        let result = self.attempt(ctx).await;
        let (status, features, detail, payload) = match &result {
            Ok(outcome) => (
                AttemptStatus::Accepted,
                Some(outcome.features.clone()),
                outcome.verdict.message.clone(),
                EventPayload::Verified {
                    message: outcome.verdict.message.clone(),
                },
            ),
            Err(err) => {
                warn!("Attempt {} failed: {}", ctx.attempt_id, err);
                (
                    AttemptStatus::Failed {
                        category: err.category().to_string(),
                    },
                    None,
                    Some(err.to_string()),
                    EventPayload::Failed {
                        category: err.category().to_string(),
                        detail: err.to_string(),
                    },
                )
            }
        };
        self.publish(AttemptEvent::new(ctx.attempt_id, payload))
            .await?;
        self.journal
            .record_attempt(AttemptRecord {
                attempt_id: ctx.attempt_id,
                challenge_id: ctx.challenge.challenge_id.clone(),
                status,
                features,
                detail,
                finished_at: Utc::now(),
            })
            .await?;
        result
    }

    async fn attempt(&mut self, ctx: &SessionContext) -> Result<AttemptOutcome> {
        info!("Perform the action now: {}", ctx.challenge.label);
        let CaptureSettings {
            duration_secs,
            target_fps,
        } = self.settings;
        self.publish(AttemptEvent::new(
            ctx.attempt_id,
            EventPayload::Capture {
                total_frames: FeaturePipeline::total_frames(duration_secs, target_fps),
                target_fps,
            },
        ))
        .await?;

        let capture_started = Utc::now().timestamp_millis() as f64 / 1000.0;
        let features = self
            .pipeline
            .run(&mut self.source, duration_secs, target_fps)
            .await?;
        let summary = features.summary(FeaturePipeline::total_frames(duration_secs, target_fps));
        self.publish(AttemptEvent::new(
            ctx.attempt_id,
            EventPayload::Features(summary.clone()),
        ))
        .await?;

        let payload = VerificationPayload::assemble(ctx, &features, capture_started);
        info!(
            "Sending features: blink={} head_motion={:.2} focus={:.2}",
            features.blink_count, features.head_motion, features.focus_score
        );
        let verdict = self.verifier.submit(&payload).await?;
        info!("Authentication accepted for attempt {}", ctx.attempt_id);

        Ok(AttemptOutcome {
            attempt_id: ctx.attempt_id,
            challenge_id: ctx.challenge.challenge_id.clone(),
            features: summary,
            verdict,
        })
    }

    async fn publish(&self, event: AttemptEvent) -> Result<()> {
        let cloned = event.clone();
        self.bus.publish(event).await?;
        self.journal.record_event(cloned).await?;
        Ok(())
    }

    pub fn journal(&self) -> &AttemptJournal {
        &self.journal
    }
}

#[async_trait]
pub trait AttemptRunner {
    /// Challenge, capture and submission in one go.
    async fn run_attempt(&mut self) -> Result<AttemptOutcome>;
}

#[async_trait]
impl<S, V, B> AttemptRunner for Authenticator<S, V, B>
where
    S: FrameSource,
    V: VerifierClient,
    B: EventBus,
{
    async fn run_attempt(&mut self) -> Result<AttemptOutcome> {
        let ctx = self.begin().await?;
        self.authenticate(&ctx).await
    }
}

pub fn orchestrator_error(message: impl Into<String>) -> NeuroLockError {
    NeuroLockError::Orchestrator(message.into())
}
