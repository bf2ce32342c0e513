//! Operational helpers: logging and the in-memory attempt journal.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use neurolock_types::{
    config::OpsConfig, events::AttemptEvent, features::FeatureSummary, NeuroLockError, Result,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| NeuroLockError::Ops(format!("failed to create log filter: {err}")))?;

    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| NeuroLockError::Ops(format!("tracing init error: {err}")))?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptStatus {
    Accepted,
    Failed { category: String },
}

/// Final state of one authentication attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt_id: Uuid,
    pub challenge_id: String,
    pub status: AttemptStatus,
    pub features: Option<FeatureSummary>,
    pub detail: Option<String>,
    pub finished_at: DateTime<Utc>,
}

/// In-memory journal of attempt events and outcomes. Nothing is persisted.
#[derive(Clone, Default)]
pub struct AttemptJournal {
    events: Arc<Mutex<Vec<AttemptEvent>>>,
    attempts: Arc<Mutex<Vec<AttemptRecord>>>,
}

impl AttemptJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_event(&self, event: AttemptEvent) -> Result<()> {
        debug!("Journal event {:?} for attempt {}", event.kind, event.attempt_id);
        self.events.lock().await.push(event);
        Ok(())
    }

    pub async fn record_attempt(&self, record: AttemptRecord) -> Result<()> {
        match &record.status {
            AttemptStatus::Accepted => info!("Attempt {} accepted", record.attempt_id),
            AttemptStatus::Failed { category } => {
                info!("Attempt {} failed [{}]", record.attempt_id, category)
            }
        }
        self.attempts.lock().await.push(record);
        Ok(())
    }

    pub async fn snapshot_events(&self) -> Vec<AttemptEvent> {
        self.events.lock().await.clone()
    }

    pub async fn events_for(&self, attempt_id: Uuid) -> Vec<AttemptEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|event| event.attempt_id == attempt_id)
            .cloned()
            .collect()
    }

    pub async fn snapshot_attempts(&self) -> Vec<AttemptRecord> {
        self.attempts.lock().await.clone()
    }
}
