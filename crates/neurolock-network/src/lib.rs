//! Verifier access and attempt event publication.

mod bus;
mod http;
mod local;

use async_trait::async_trait;
use neurolock_types::{
    session::{SessionChallenge, VerificationOutcome, VerificationPayload},
    NeuroLockError, Result,
};

pub use bus::{BroadcastBus, EventBus};
pub use http::{HttpVerifier, HttpVerifierConfig};
pub use local::{LocalVerifier, LocalVerifierRules};

/// Remote party that issues challenges and judges submissions.
#[async_trait]
pub trait VerifierClient: Send + Sync {
    /// Fails with [`NeuroLockError::ChallengeUnavailable`].
    async fn issue_challenge(&self) -> Result<SessionChallenge>;

    /// Fails with [`NeuroLockError::VerificationTransport`] or
    /// [`NeuroLockError::VerificationRejected`].
    async fn submit(&self, payload: &VerificationPayload) -> Result<VerificationOutcome>;
}

#[async_trait]
impl<T: VerifierClient + ?Sized> VerifierClient for Box<T> {
    async fn issue_challenge(&self) -> Result<SessionChallenge> {
        (**self).issue_challenge().await
    }

    async fn submit(&self, payload: &VerificationPayload) -> Result<VerificationOutcome> {
        (**self).submit(payload).await
    }
}

pub fn network_error(message: impl Into<String>) -> NeuroLockError {
    NeuroLockError::Network(message.into())
}
