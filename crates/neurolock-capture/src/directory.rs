use std::path::{Path, PathBuf};

use async_trait::async_trait;
use neurolock_types::{vision::Frame, Result};
use tokio::fs;

use crate::{capture_error, CaptureMetrics, FrameSource, SharedMetrics};

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Replays PNG/JPEG files from a directory in file-name order.
pub struct DirectoryFrameSource {
    dir: PathBuf,
    loop_frames: bool,
    files: Vec<PathBuf>,
    cursor: usize,
    dimensions: Option<(u32, u32)>,
    metrics: SharedMetrics,
}

impl DirectoryFrameSource {
    pub fn new(dir: impl Into<PathBuf>, loop_frames: bool) -> Self {
        Self {
            dir: dir.into(),
            loop_frames,
            files: Vec::new(),
            cursor: 0,
            dimensions: None,
            metrics: SharedMetrics::default(),
        }
    }

    async fn list_frames(&self) -> Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(&self.dir).await.map_err(|err| {
            capture_error(format!("cannot open frame directory {:?}: {err}", self.dir))
        })?;
        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| capture_error(format!("cannot list {:?}: {err}", self.dir)))?
        {
            let path = entry.path();
            if is_image(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    async fn decode(&self, path: &Path) -> Result<Frame> {
        let raw = fs::read(path)
            .await
            .map_err(|err| capture_error(format!("cannot read frame {:?}: {err}", path)))?;
        let img = image::load_from_memory(&raw)
            .map_err(|err| capture_error(format!("frame decoding failed {:?}: {err}", path)))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Frame::from_rgba(width, height, rgba.into_raw())
    }

    async fn read_next(&mut self) -> Result<Frame> {
        if self.files.is_empty() {
            self.open().await?;
        }
        if self.cursor >= self.files.len() {
            if !self.loop_frames {
                return Err(capture_error(format!(
                    "frame directory {:?} exhausted after {} frames",
                    self.dir,
                    self.files.len()
                )));
            }
            self.cursor = 0;
        }
        let path = self.files[self.cursor].clone();
        self.cursor += 1;

        let frame = self.decode(&path).await?;
        match self.dimensions {
            Some(expected) if expected != frame.dimensions() => Err(capture_error(format!(
                "frame {:?} is {}x{}, source is fixed at {}x{}",
                path,
                frame.width(),
                frame.height(),
                expected.0,
                expected.1
            ))),
            Some(_) => Ok(frame),
            None => {
                self.dimensions = Some(frame.dimensions());
                Ok(frame)
            }
        }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[async_trait]
impl FrameSource for DirectoryFrameSource {
    async fn open(&mut self) -> Result<()> {
        let files = self.list_frames().await?;
        if files.is_empty() {
            return Err(capture_error(format!(
                "no PNG/JPEG frames found in {:?}",
                self.dir
            )));
        }
        tracing::info!("Frame directory {:?} opened: {} frames", self.dir, files.len());
        self.files = files;
        self.cursor = 0;
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Frame> {
        match self.read_next().await {
            Ok(frame) => {
                self.metrics.record_success();
                Ok(frame)
            }
            Err(err) => {
                self.metrics.record_failure();
                Err(err)
            }
        }
    }

    fn metrics(&self) -> CaptureMetrics {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn write_frames(dir: &Path, count: u8, size: (u32, u32)) {
        std::fs::create_dir_all(dir).expect("create frame dir");
        for i in 0..count {
            let img = ImageBuffer::<Rgba<u8>, _>::from_pixel(size.0, size.1, Rgba([i * 40, 0, 0, 255]));
            img.save(dir.join(format!("frame_{i:03}.png")))
                .expect("save frame");
        }
    }

    #[tokio::test]
    async fn replays_frames_in_name_order() {
        let dir = std::env::temp_dir().join("neurolock-dir-source-order");
        let _ = std::fs::remove_dir_all(&dir);
        write_frames(&dir, 3, (4, 3));
        std::fs::write(dir.join("notes.txt"), "ignored").expect("write note");

        let mut source = DirectoryFrameSource::new(&dir, false);
        source.open().await.expect("open dir");
        for i in 0..3u8 {
            let frame = source.next_frame().await.expect("frame");
            assert_eq!(frame.dimensions(), (4, 3));
            assert_eq!(frame.pixel(0, 0).map(|px| px[0]), Some(i * 40));
        }
        assert!(source.next_frame().await.unwrap_err().is_capture_failure());
        assert_eq!(source.metrics().frames_captured, 3);
        std::fs::remove_dir_all(&dir).expect("cleanup");
    }

    #[tokio::test]
    async fn looping_wraps_around() {
        let dir = std::env::temp_dir().join("neurolock-dir-source-loop");
        let _ = std::fs::remove_dir_all(&dir);
        write_frames(&dir, 2, (2, 2));

        let mut source = DirectoryFrameSource::new(&dir, true);
        for _ in 0..5 {
            source.next_frame().await.expect("looped frame");
        }
        std::fs::remove_dir_all(&dir).expect("cleanup");
    }

    #[tokio::test]
    async fn missing_directory_is_capture_unavailable() {
        let mut source = DirectoryFrameSource::new("/no/such/neurolock/frames", false);
        assert!(source.open().await.unwrap_err().is_capture_failure());
    }
}
