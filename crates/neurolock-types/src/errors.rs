use thiserror::Error;

pub type Result<T, E = NeuroLockError> = std::result::Result<T, E>;

/// Unified error type covering every way an authentication attempt can end early.
#[derive(Debug, Error)]
pub enum NeuroLockError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("capture unavailable: {0}")]
    CaptureUnavailable(String),
    #[error("challenge unavailable: {0}")]
    ChallengeUnavailable(String),
    #[error("verification transport error: {0}")]
    VerificationTransport(String),
    #[error("verification rejected ({status}): {reason}")]
    VerificationRejected { status: String, reason: String },
    #[error("vision error: {0}")]
    Vision(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("orchestrator error: {0}")]
    Orchestrator(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NeuroLockError {
    /// The verifier answered, but said no.
    pub fn is_rejection(&self) -> bool {
        matches!(self, NeuroLockError::VerificationRejected { .. })
    }

    pub fn is_capture_failure(&self) -> bool {
        matches!(self, NeuroLockError::CaptureUnavailable(_))
    }

    /// Short, stable label used in the attempt journal and CLI output.
    pub fn category(&self) -> &'static str {
        match self {
            NeuroLockError::Configuration(_) => "configuration",
            NeuroLockError::CaptureUnavailable(_) => "capture",
            NeuroLockError::ChallengeUnavailable(_) => "challenge",
            NeuroLockError::VerificationTransport(_) => "transport",
            NeuroLockError::VerificationRejected { .. } => "rejected",
            NeuroLockError::Vision(_) => "vision",
            NeuroLockError::Network(_) => "network",
            NeuroLockError::Orchestrator(_) => "orchestrator",
            NeuroLockError::Ops(_) => "ops",
            NeuroLockError::Other(_) => "other",
        }
    }
}
