use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{NeuroLockError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrameSourceKind {
    #[default]
    Synthetic,
    Directory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub duration_secs: f64,
    pub target_fps: u32,
    #[serde(default)]
    pub source: FrameSourceKind,
    pub frame_dir: Option<String>,
    #[serde(default)]
    pub loop_frames: bool,
    pub width: u32,
    pub height: u32,
    /// Frame indices on which the synthetic source darkens the eye band.
    #[serde(default)]
    pub synthetic_blinks: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    pub jpeg_quality: u8,
    pub archive_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Use the in-process loopback verifier instead of HTTP.
    #[serde(default)]
    pub local: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsConfig {
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuroLockConfig {
    pub capture: CaptureConfig,
    pub vision: VisionConfig,
    pub verifier: VerifierConfig,
    pub ops: OpsConfig,
}

impl NeuroLockConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            NeuroLockError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            NeuroLockError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.capture.duration_secs.is_finite() && self.capture.duration_secs > 0.0) {
            return Err(NeuroLockError::Configuration(
                "capture.duration_secs must be a positive number".into(),
            ));
        }
        if self.capture.target_fps == 0 {
            return Err(NeuroLockError::Configuration(
                "capture.target_fps must be greater than zero".into(),
            ));
        }
        if self.capture.source == FrameSourceKind::Directory && self.capture.frame_dir.is_none() {
            return Err(NeuroLockError::Configuration(
                "capture.frame_dir is required for the directory source".into(),
            ));
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(NeuroLockError::Configuration(
                "capture.width and capture.height must be greater than zero".into(),
            ));
        }
        if !(1..=100).contains(&self.vision.jpeg_quality) {
            return Err(NeuroLockError::Configuration(
                "vision.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if !self.verifier.local && self.verifier.base_url.trim().is_empty() {
            return Err(NeuroLockError::Configuration(
                "verifier.base_url must not be empty".into(),
            ));
        }
        if self.verifier.timeout_secs == 0 {
            return Err(NeuroLockError::Configuration(
                "verifier.timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
