use std::path::PathBuf;

use chrono::Utc;
use image::{codecs::jpeg::JpegEncoder, ColorType, DynamicImage, ImageBuffer, Rgba};
use neurolock_types::{config::VisionConfig, features::EncodedFrame, vision::Frame, Result};
use tokio::fs;
use tracing::{debug, info};

use crate::vision_error;

pub const DEFAULT_JPEG_QUALITY: u8 = 70;

/// Lossy still-image encoder for the representative frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    quality: u8,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl FrameEncoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn encode(&self, frame: &Frame) -> Result<EncodedFrame> {
        let Some(buffer) = ImageBuffer::<Rgba<u8>, _>::from_raw(
            frame.width(),
            frame.height(),
            frame.data().to_vec(),
        ) else {
            return Err(vision_error("failed to build image buffer from frame"));
        };
        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgba8(buffer).into_rgb8();

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality)
            .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
            .map_err(|err| vision_error(format!("JPEG encoding failed: {err}")))?;
        debug!(
            "Encoded {}x{} frame to {} JPEG bytes (quality {})",
            frame.width(),
            frame.height(),
            jpeg.len(),
            self.quality
        );

        Ok(EncodedFrame {
            width: frame.width(),
            height: frame.height(),
            quality: self.quality,
            jpeg,
        })
    }
}

/// Optional audit copy of submitted frames.
#[derive(Debug, Clone, Default)]
pub struct FrameArchive {
    dir: Option<PathBuf>,
}

impl FrameArchive {
    pub fn new(config: &VisionConfig) -> Self {
        Self {
            dir: config.archive_dir.as_ref().map(PathBuf::from),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub async fn persist(&self, frame: &EncodedFrame) -> Result<Option<PathBuf>> {
        let Some(dir) = &self.dir else {
            return Ok(None);
        };

        fs::create_dir_all(dir)
            .await
            .map_err(|err| vision_error(format!("failed to create archive dir {:?}: {err}", dir)))?;
        let path = dir.join(format!("capture_{}.jpg", Utc::now().timestamp_millis()));
        fs::write(&path, &frame.jpeg)
            .await
            .map_err(|err| vision_error(format!("failed to archive frame: {err}")))?;
        info!("Archived representative frame: {:?}", path);
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_decodable_jpeg() {
        let frame = Frame::filled(32, 16, [200, 100, 50, 255]);
        let encoded = FrameEncoder::default().encode(&frame).expect("encode");
        assert_eq!(encoded.quality, 70);
        assert_eq!(&encoded.jpeg[..2], &[0xff, 0xd8]);

        let decoded = image::load_from_memory(&encoded.jpeg).expect("decode jpeg");
        assert_eq!(decoded.to_rgb8().dimensions(), (32, 16));
    }

    #[test]
    fn quality_is_clamped() {
        assert_eq!(FrameEncoder::new(0).quality(), 1);
        assert_eq!(FrameEncoder::new(255).quality(), 100);
    }

    #[tokio::test]
    async fn archive_writes_only_when_configured() {
        let encoded = FrameEncoder::default()
            .encode(&Frame::filled(8, 8, [1, 2, 3, 255]))
            .expect("encode");
        assert!(FrameArchive::disabled()
            .persist(&encoded)
            .await
            .expect("noop")
            .is_none());

        let dir = std::env::temp_dir().join("neurolock-archive-test");
        let archive = FrameArchive::new(&VisionConfig {
            jpeg_quality: 70,
            archive_dir: Some(dir.to_string_lossy().into_owned()),
        });
        let path = archive
            .persist(&encoded)
            .await
            .expect("persist")
            .expect("path returned");
        assert_eq!(fs::read(&path).await.expect("read back"), encoded.jpeg);
        fs::remove_file(path).await.expect("cleanup");
    }
}
