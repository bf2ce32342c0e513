use chrono::{DateTime, Utc};

use crate::{NeuroLockError, Result};

/// Bytes per pixel of the interleaved RGBA layout.
pub const CHANNELS: usize = 4;

/// A single captured camera frame.
///
/// Only built through the constructors below, so `data` always holds
/// `width * height * CHANNELS` bytes.
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    /// Raw RGBA pixel buffer, row-major.
    data: Vec<u8>,
    captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        Self::from_rgba_at(width, height, data, Utc::now())
    }

    pub fn from_rgba_at(
        width: u32,
        height: u32,
        data: Vec<u8>,
        captured_at: DateTime<Utc>,
    ) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(NeuroLockError::Vision(format!(
                "frame buffer holds {} bytes, {width}x{height} RGBA needs {expected}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            captured_at,
        })
    }

    /// Frame where every pixel has the same colour.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let data = rgba.iter().copied().cycle().take(pixels * CHANNELS).collect();
        Self {
            width,
            height,
            data,
            captured_at: Utc::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// RGBA value at `(x, y)`, `None` when outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let px = self.data.get(idx..idx + CHANNELS)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Temporally ordered frames that all share one set of dimensions.
#[derive(Debug, Clone, Default)]
pub struct FrameSeries {
    frames: Vec<Frame>,
}

impl FrameSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
        }
    }

    pub fn from_frames(frames: impl IntoIterator<Item = Frame>) -> Result<Self> {
        let mut series = Self::new();
        for frame in frames {
            series.push(frame)?;
        }
        Ok(series)
    }

    pub fn push(&mut self, frame: Frame) -> Result<()> {
        if let Some(first) = self.frames.first() {
            if first.dimensions() != frame.dimensions() {
                return Err(NeuroLockError::Vision(format!(
                    "frame {}x{} does not match series dimensions {}x{}",
                    frame.width, frame.height, first.width, first.height
                )));
            }
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    pub fn as_slice(&self) -> &[Frame] {
        &self.frames
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.frames.first().map(Frame::dimensions)
    }
}

impl<'a> IntoIterator for &'a FrameSeries {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
