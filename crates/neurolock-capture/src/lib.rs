//! Frame acquisition layer.

mod directory;
mod synthetic;

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use neurolock_types::{vision::Frame, NeuroLockError, Result};
use tracing::{debug, info};

pub use directory::DirectoryFrameSource;
pub use synthetic::SyntheticFrameSource;

/// Aggregated capture counters.
#[derive(Debug, Default, Clone)]
pub struct CaptureMetrics {
    pub frames_captured: u64,
    pub failed_reads: u64,
}

/// Supplies frames of fixed dimensions to a single capture loop.
///
/// `next_frame` takes `&mut self`: a source is held by exactly one loop at a time.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn open(&mut self) -> Result<()> {
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Frame>;

    fn metrics(&self) -> CaptureMetrics;
}

#[async_trait]
impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    async fn open(&mut self) -> Result<()> {
        (**self).open().await
    }

    async fn next_frame(&mut self) -> Result<Frame> {
        (**self).next_frame().await
    }

    fn metrics(&self) -> CaptureMetrics {
        (**self).metrics()
    }
}

#[derive(Clone, Default)]
struct SharedMetrics(Arc<Mutex<CaptureMetrics>>);

impl SharedMetrics {
    fn record_success(&self) {
        if let Ok(mut guard) = self.0.lock() {
            guard.frames_captured += 1;
        }
    }

    fn record_failure(&self) {
        if let Ok(mut guard) = self.0.lock() {
            guard.failed_reads += 1;
        }
    }

    fn snapshot(&self) -> CaptureMetrics {
        self.0.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

/// Repeats one frame, optionally only `limit` times.
pub struct StaticFrameSource {
    frame: Frame,
    limit: Option<usize>,
    served: usize,
    metrics: SharedMetrics,
}

impl StaticFrameSource {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            limit: None,
            served: 0,
            metrics: SharedMetrics::default(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
impl FrameSource for StaticFrameSource {
    async fn next_frame(&mut self) -> Result<Frame> {
        if self.limit.is_some_and(|limit| self.served >= limit) {
            self.metrics.record_failure();
            return Err(capture_error(format!(
                "static source exhausted after {} frames",
                self.served
            )));
        }
        self.served += 1;
        self.metrics.record_success();
        Ok(self.frame.clone())
    }

    fn metrics(&self) -> CaptureMetrics {
        self.metrics.snapshot()
    }
}

/// Yields a queued sequence of frames, then reports the device as gone.
pub struct ScriptedFrameSource {
    frames: VecDeque<Frame>,
    metrics: SharedMetrics,
}

impl ScriptedFrameSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            metrics: SharedMetrics::default(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

#[async_trait]
impl FrameSource for ScriptedFrameSource {
    async fn open(&mut self) -> Result<()> {
        info!("Scripted frame source ready with {} frames", self.frames.len());
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Frame> {
        match self.frames.pop_front() {
            Some(frame) => {
                debug!("Scripted source served frame, {} left", self.frames.len());
                self.metrics.record_success();
                Ok(frame)
            }
            None => {
                self.metrics.record_failure();
                Err(capture_error("scripted source has no frames left"))
            }
        }
    }

    fn metrics(&self) -> CaptureMetrics {
        self.metrics.snapshot()
    }
}

/// Generate an error aligned with capture semantics.
pub fn capture_error(message: impl Into<String>) -> NeuroLockError {
    NeuroLockError::CaptureUnavailable(message.into())
}
