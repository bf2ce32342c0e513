use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use neurolock_types::{
    session::{
        ChallengeKind, SessionChallenge, VerificationOutcome, VerificationPayload,
        VerificationResponse,
    },
    Result,
};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::VerifierClient;

const NONCE_LEN: usize = 20;

/// Thresholds applied by [`LocalVerifier`].
#[derive(Debug, Clone)]
pub struct LocalVerifierRules {
    pub ttl_secs: u64,
    /// Extra seconds accepted past the ttl.
    pub ttl_grace_secs: u64,
    /// Maximum distance between the submitted `ts` and the verifier clock.
    pub max_clock_skew_secs: f64,
    /// Decoded images smaller than this are not treated as a webcam capture.
    pub min_face_bytes: usize,
    pub min_blinks_for_blink_challenge: u32,
    pub min_motion_for_look_challenge: f64,
    pub min_motion_for_follow_challenge: f64,
    pub min_focus_score: f64,
}

impl Default for LocalVerifierRules {
    fn default() -> Self {
        Self {
            ttl_secs: 8,
            ttl_grace_secs: 2,
            max_clock_skew_secs: 6.0,
            min_face_bytes: 5000,
            min_blinks_for_blink_challenge: 2,
            min_motion_for_look_challenge: 0.6,
            min_motion_for_follow_challenge: 0.4,
            min_focus_score: 0.45,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveChallenge {
    kind: ChallengeKind,
    issued_at: f64,
    ttl_secs: u64,
}

type Clock = Arc<dyn Fn() -> f64 + Send + Sync>;

/// In-process verifier for offline runs and tests.
///
/// Nonces are single use: a successful verification consumes its nonce.
/// Expired nonces are dropped when submitted and swept on every issue.
pub struct LocalVerifier {
    rules: LocalVerifierRules,
    active: Mutex<HashMap<String, ActiveChallenge>>,
    next: AtomicUsize,
    fixed: Option<ChallengeKind>,
    clock: Clock,
}

impl Default for LocalVerifier {
    fn default() -> Self {
        Self::new(LocalVerifierRules::default())
    }
}

impl LocalVerifier {
    pub fn new(rules: LocalVerifierRules) -> Self {
        Self {
            rules,
            active: Mutex::new(HashMap::new()),
            next: AtomicUsize::new(0),
            fixed: None,
            clock: Arc::new(epoch_seconds),
        }
    }

    /// Always issue `kind` instead of rotating through the catalog.
    pub fn with_fixed_challenge(mut self, kind: ChallengeKind) -> Self {
        self.fixed = Some(kind);
        self
    }

    pub fn with_clock(mut self, clock: impl Fn() -> f64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub async fn active_challenges(&self) -> usize {
        self.active.lock().await.len()
    }

    fn expired(&self, record: &ActiveChallenge, now: f64) -> bool {
        now - record.issued_at > (record.ttl_secs + self.rules.ttl_grace_secs) as f64
    }

    fn pick_challenge(&self) -> ChallengeKind {
        self.fixed.unwrap_or_else(|| {
            let idx = self.next.fetch_add(1, Ordering::Relaxed);
            ChallengeKind::ALL[idx % ChallengeKind::ALL.len()]
        })
    }

    fn challenge_satisfied(&self, kind: ChallengeKind, payload: &VerificationPayload) -> bool {
        if payload.challenge_observed != kind.id() {
            return false;
        }
        let rules = &self.rules;
        match kind {
            ChallengeKind::BlinkTwice => payload.blink_count >= rules.min_blinks_for_blink_challenge,
            ChallengeKind::LookLeftRight => payload.head_motion > rules.min_motion_for_look_challenge,
            ChallengeKind::FollowDot => {
                payload.head_motion > rules.min_motion_for_follow_challenge
                    || payload.blink_count >= 1
            }
            ChallengeKind::Smile => true,
        }
    }

    fn face_plausible(&self, face: &str) -> bool {
        let encoded = face.split_once(',').map_or(face, |(_, data)| data);
        match STANDARD.decode(encoded) {
            Ok(bytes) => bytes.len() >= self.rules.min_face_bytes,
            Err(err) => {
                warn!("Face payload is not valid base64: {}", err);
                false
            }
        }
    }

    async fn judge(&self, payload: &VerificationPayload) -> VerificationResponse {
        let now = (self.clock)();
        let mut active = self.active.lock().await;

        let Some(record) = active.get(&payload.nonce).copied() else {
            return VerificationResponse::fail("unknown_nonce");
        };
        if self.expired(&record, now) {
            active.remove(&payload.nonce);
            return VerificationResponse::fail("challenge_expired");
        }
        if (now - payload.ts).abs() > self.rules.max_clock_skew_secs {
            return VerificationResponse::fail("stale_timestamp");
        }
        if !self.face_plausible(&payload.face) {
            return VerificationResponse::fail("face_invalid");
        }
        if !self.challenge_satisfied(record.kind, payload) {
            return VerificationResponse::fail("challenge_not_verified");
        }
        if payload.focus_score < self.rules.min_focus_score {
            return VerificationResponse::fail("low_focus");
        }

        active.remove(&payload.nonce);
        VerificationResponse::success("Access granted")
    }
}

fn epoch_seconds() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

#[async_trait]
impl VerifierClient for LocalVerifier {
    async fn issue_challenge(&self) -> Result<SessionChallenge> {
        let kind = self.pick_challenge();
        let nonce: String = Uuid::new_v4().simple().to_string()[..NONCE_LEN].to_string();
        let now = (self.clock)();
        let mut active = self.active.lock().await;
        active.retain(|_, record| !self.expired(record, now));
        active.insert(
            nonce.clone(),
            ActiveChallenge {
                kind,
                issued_at: now,
                ttl_secs: self.rules.ttl_secs,
            },
        );
        drop(active);
        info!("Local verifier issued challenge {}", kind.id());
        Ok(SessionChallenge {
            challenge_id: kind.id().to_string(),
            nonce,
            label: kind.label().to_string(),
            ttl_secs: Some(self.rules.ttl_secs),
        })
    }

    async fn submit(&self, payload: &VerificationPayload) -> Result<VerificationOutcome> {
        let verdict = self.judge(payload).await;
        info!(
            "Local verifier verdict: {} {}",
            verdict.status,
            verdict.reason.as_deref().unwrap_or_default()
        );
        verdict.into_outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurolock_types::NeuroLockError;
    use std::sync::atomic::AtomicU64;

    const NOW: f64 = 1_700_000_000.0;

    fn face(bytes: usize) -> String {
        format!("data:image/jpeg;base64,{}", STANDARD.encode(vec![7u8; bytes]))
    }

    fn payload_for(challenge: &SessionChallenge) -> VerificationPayload {
        VerificationPayload {
            nonce: challenge.nonce.clone(),
            ts: NOW,
            face: face(6000),
            blink_count: 2,
            head_motion: 0.0,
            focus_score: 0.9,
            challenge_observed: challenge.challenge_id.clone(),
        }
    }

    fn reason_of(result: Result<VerificationOutcome>) -> String {
        match result {
            Err(NeuroLockError::VerificationRejected { reason, .. }) => reason,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    fn verifier(kind: ChallengeKind) -> LocalVerifier {
        LocalVerifier::default()
            .with_fixed_challenge(kind)
            .with_clock(|| NOW)
    }

    #[tokio::test]
    async fn rotates_through_catalog_with_fresh_nonces() {
        let verifier = LocalVerifier::default();
        let first = verifier.issue_challenge().await.expect("first");
        let second = verifier.issue_challenge().await.expect("second");
        assert_eq!(first.challenge_id, "blink_twice");
        assert_eq!(second.challenge_id, "look_left_right");
        assert_eq!(first.nonce.len(), NONCE_LEN);
        assert_ne!(first.nonce, second.nonce);
        assert_eq!(verifier.active_challenges().await, 2);
    }

    #[tokio::test]
    async fn accepts_once_then_forgets_nonce() {
        let verifier = verifier(ChallengeKind::BlinkTwice);
        let challenge = verifier.issue_challenge().await.expect("challenge");
        let payload = payload_for(&challenge);

        verifier.submit(&payload).await.expect("accepted");
        assert_eq!(reason_of(verifier.submit(&payload).await), "unknown_nonce");
    }

    #[tokio::test]
    async fn rejects_expired_challenge() {
        let clock = Arc::new(AtomicU64::new(NOW as u64));
        let reader = clock.clone();
        let verifier = LocalVerifier::default()
            .with_fixed_challenge(ChallengeKind::Smile)
            .with_clock(move || reader.load(Ordering::SeqCst) as f64);
        let challenge = verifier.issue_challenge().await.expect("challenge");

        clock.fetch_add(11, Ordering::SeqCst);
        let mut payload = payload_for(&challenge);
        payload.ts = NOW + 11.0;
        assert_eq!(reason_of(verifier.submit(&payload).await), "challenge_expired");
        assert_eq!(verifier.active_challenges().await, 0);
    }

    #[tokio::test]
    async fn abandoned_challenges_are_swept_on_issue() {
        let clock = Arc::new(AtomicU64::new(NOW as u64));
        let reader = clock.clone();
        let verifier = LocalVerifier::default()
            .with_fixed_challenge(ChallengeKind::Smile)
            .with_clock(move || reader.load(Ordering::SeqCst) as f64);
        let abandoned = verifier.issue_challenge().await.expect("first");
        verifier.issue_challenge().await.expect("second");
        assert_eq!(verifier.active_challenges().await, 2);

        clock.fetch_add(11, Ordering::SeqCst);
        let fresh = verifier.issue_challenge().await.expect("third");
        assert_eq!(verifier.active_challenges().await, 1);

        let mut payload = payload_for(&abandoned);
        payload.ts = NOW + 11.0;
        assert_eq!(reason_of(verifier.submit(&payload).await), "unknown_nonce");

        let mut payload = payload_for(&fresh);
        payload.ts = NOW + 11.0;
        verifier.submit(&payload).await.expect("fresh challenge accepted");
    }

    #[tokio::test]
    async fn applies_checks_in_order() {
        let verifier = verifier(ChallengeKind::BlinkTwice);
        let challenge = verifier.issue_challenge().await.expect("challenge");

        let mut payload = payload_for(&challenge);
        payload.ts = NOW - 30.0;
        assert_eq!(reason_of(verifier.submit(&payload).await), "stale_timestamp");

        let mut payload = payload_for(&challenge);
        payload.face = face(100);
        assert_eq!(reason_of(verifier.submit(&payload).await), "face_invalid");

        let mut payload = payload_for(&challenge);
        payload.face = "data:image/jpeg;base64,@@@".into();
        assert_eq!(reason_of(verifier.submit(&payload).await), "face_invalid");

        let mut payload = payload_for(&challenge);
        payload.blink_count = 1;
        assert_eq!(
            reason_of(verifier.submit(&payload).await),
            "challenge_not_verified"
        );

        let mut payload = payload_for(&challenge);
        payload.focus_score = 0.3;
        assert_eq!(reason_of(verifier.submit(&payload).await), "low_focus");

        // Failures above did not consume the nonce.
        verifier
            .submit(&payload_for(&challenge))
            .await
            .expect("accepted");
    }

    #[tokio::test]
    async fn challenge_rules_follow_catalog() {
        let look = verifier(ChallengeKind::LookLeftRight);
        let challenge = look.issue_challenge().await.expect("challenge");
        let mut payload = payload_for(&challenge);
        payload.head_motion = 0.5;
        assert_eq!(
            reason_of(look.submit(&payload).await),
            "challenge_not_verified"
        );
        payload.head_motion = 0.61;
        look.submit(&payload).await.expect("enough motion");

        let follow = verifier(ChallengeKind::FollowDot);
        let challenge = follow.issue_challenge().await.expect("challenge");
        let mut payload = payload_for(&challenge);
        payload.blink_count = 0;
        payload.head_motion = 0.41;
        follow.submit(&payload).await.expect("motion satisfies follow_dot");

        let smile = verifier(ChallengeKind::Smile);
        let challenge = smile.issue_challenge().await.expect("challenge");
        let mut payload = payload_for(&challenge);
        payload.challenge_observed = "blink_twice".into();
        assert_eq!(
            reason_of(smile.submit(&payload).await),
            "challenge_not_verified"
        );
    }
}
