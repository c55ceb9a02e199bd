//! Frame publication
//!
//! Converted frames are handed to every registered [`FrameSink`] as a borrowed
//! [`PublishedFrame`]; the frame buffer itself stays owned by the driver and is reused.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use image::{GrayImage, Luma};
use parking_lot::Mutex;

use crate::error::{SimError, SimResult};
use crate::pipeline::FrameBuffer;

/// One converted frame, borrowed for the duration of a publish call
#[derive(Debug, Clone, Copy)]
pub struct PublishedFrame<'a> {
    /// Tick number the frame was rendered on
    pub index: u64,
    /// Simulated time of the frame
    pub timestamp: Duration,
    pub width: u32,
    pub height: u32,
    /// Packed YUYV bytes
    pub data: &'a [u8],
}

impl<'a> PublishedFrame<'a> {
    pub fn new(index: u64, timestamp: Duration, frame: &'a FrameBuffer) -> Self {
        Self {
            index,
            timestamp,
            width: frame.width(),
            height: frame.height(),
            data: frame.as_bytes(),
        }
    }
}

/// Consumer of published frames
pub trait FrameSink {
    fn publish(&mut self, frame: &PublishedFrame<'_>) -> SimResult<()>;
}

/// Latest frame as seen by a reader on another thread
#[derive(Debug, Clone)]
pub struct SharedFrame {
    /// Incremented on every publish, 0 until the first frame arrives
    pub sequence: u64,
    pub index: u64,
    pub timestamp: Duration,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Single-slot frame mailbox.
///
/// Cloning yields another handle to the same slot. Publishing overwrites the slot in
/// place; readers never observe a partially written frame.
#[derive(Debug, Clone)]
pub struct LatestFrame {
    slot: Arc<Mutex<SharedFrame>>,
}

impl LatestFrame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            slot: Arc::new(Mutex::new(SharedFrame {
                sequence: 0,
                index: 0,
                timestamp: Duration::ZERO,
                width,
                height,
                data: vec![0; width as usize * height as usize * 2],
            })),
        }
    }

    /// Number of frames published so far
    pub fn sequence(&self) -> u64 {
        self.slot.lock().sequence
    }

    /// Run `f` on the current frame while holding the slot
    pub fn read<R>(&self, f: impl FnOnce(&SharedFrame) -> R) -> R {
        f(&self.slot.lock())
    }

    /// Copy of the current frame, if one was published
    pub fn snapshot(&self) -> Option<SharedFrame> {
        let slot = self.slot.lock();
        (slot.sequence > 0).then(|| slot.clone())
    }
}

impl FrameSink for LatestFrame {
    fn publish(&mut self, frame: &PublishedFrame<'_>) -> SimResult<()> {
        let mut slot = self.slot.lock();
        if slot.data.len() != frame.data.len() {
            return Err(SimError::FrameSize {
                expected: slot.data.len(),
                found: frame.data.len(),
            });
        }
        slot.data.copy_from_slice(frame.data);
        slot.sequence += 1;
        slot.index = frame.index;
        slot.timestamp = frame.timestamp;
        slot.width = frame.width;
        slot.height = frame.height;
        Ok(())
    }
}

/// Appends raw YUYV frames back to back to a file
pub struct RawFileSink {
    writer: BufWriter<File>,
    frames: u64,
}

impl RawFileSink {
    pub fn create(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        log::info!("dumping raw YUYV frames to {}", path.display());
        Ok(Self {
            writer: BufWriter::new(file),
            frames: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    /// Flush buffered frames to disk
    pub fn finish(mut self) -> SimResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl FrameSink for RawFileSink {
    fn publish(&mut self, frame: &PublishedFrame<'_>) -> SimResult<()> {
        self.writer.write_all(frame.data)?;
        self.frames += 1;
        Ok(())
    }
}

/// Write the luma plane of a frame as a grayscale PNG
pub fn save_luma_png(frame: &FrameBuffer, path: impl AsRef<Path>) -> SimResult<()> {
    let image = GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        Luma([frame.luma(x, y)])
    });
    image.save(path.as_ref())?;
    log::info!("saved luma snapshot to {}", path.as_ref().display());
    Ok(())
}
