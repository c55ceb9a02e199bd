//! BGRX to packed YUYV 4:2:2 conversion.
//!
//! Every pair of horizontally adjacent source pixels becomes four output bytes:
//! `Y0 U Y1 V`, where U and V are the averages of the pair's chroma. Channels are
//! normalized to `[0, 1]` before the color transform, and results are quantized by
//! saturating to `[0, 1]`, scaling by 255 and truncating toward zero. The truncation
//! matches what downstream vision consumers were calibrated against.

use crate::backend::{PixelFormat, PixelReadLock, RenderBackend, TargetHandle};
use crate::error::{SimError, SimResult};

/// Output bytes per pixel of packed 4:2:2
pub const YUYV_BYTES_PER_PIXEL: usize = 2;
/// Source bytes per pixel of BGRX
pub const BGRX_BYTES_PER_PIXEL: usize = 4;

/// A packed YUYV frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Allocate a zeroed frame
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * YUYV_BYTES_PER_PIXEL],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Luma sample of a pixel
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        self.data[(y as usize * self.width as usize + x as usize) * YUYV_BYTES_PER_PIXEL]
    }
}

/// Converts BGRX color buffers into [`FrameBuffer`]s of a fixed size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YuyvConverter {
    width: u32,
    height: u32,
}

impl YuyvConverter {
    pub fn new(width: u32, height: u32) -> SimResult<Self> {
        if width == 0 || height == 0 {
            return Err(SimError::Config(format!(
                "converter size {width}x{height} is empty"
            )));
        }
        if width % 2 != 0 {
            return Err(SimError::Config(format!(
                "converter width {width} must be even"
            )));
        }
        Ok(Self { width, height })
    }

    /// The source layout this converter reads
    pub fn source_format(&self) -> PixelFormat {
        PixelFormat::Bgrx8
    }

    /// Whether a source buffer in `format` can be converted. The fourth byte is
    /// ignored, so BGRA is read the same way as BGRX.
    pub fn accepts(&self, format: PixelFormat) -> bool {
        matches!(format, PixelFormat::Bgrx8 | PixelFormat::Bgra8)
    }

    pub fn check_format(&self, format: PixelFormat) -> SimResult<()> {
        if self.accepts(format) {
            Ok(())
        } else {
            Err(SimError::UnsupportedPixelFormat {
                expected: self.source_format(),
                found: format,
            })
        }
    }

    pub fn source_len(&self) -> usize {
        self.width as usize * self.height as usize * BGRX_BYTES_PER_PIXEL
    }

    /// Allocate a frame sized for this converter
    pub fn frame(&self) -> FrameBuffer {
        FrameBuffer::new(self.width, self.height)
    }

    /// Convert into a newly allocated frame
    pub fn convert(&self, src: &[u8]) -> SimResult<FrameBuffer> {
        let mut frame = self.frame();
        self.convert_into(src, &mut frame)?;
        Ok(frame)
    }

    /// Convert into an existing frame, overwriting all of it
    pub fn convert_into(&self, src: &[u8], dst: &mut FrameBuffer) -> SimResult<()> {
        if src.len() != self.source_len() {
            return Err(SimError::FrameSize {
                expected: self.source_len(),
                found: src.len(),
            });
        }
        if dst.width != self.width || dst.height != self.height {
            return Err(SimError::FrameSize {
                expected: self.width as usize * self.height as usize * YUYV_BYTES_PER_PIXEL,
                found: dst.len(),
            });
        }

        for (pair, out) in src.chunks_exact(8).zip(dst.data.chunks_exact_mut(4)) {
            out.copy_from_slice(&convert_pair(&pair[..4], &pair[4..]));
        }
        Ok(())
    }

    /// Convert the color buffer of a render target.
    ///
    /// The target's format and size are checked before its pixel buffer is locked; the
    /// lock is released before returning on every path.
    pub fn convert_target<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        target: TargetHandle,
        dst: &mut FrameBuffer,
    ) -> SimResult<()> {
        self.check_format(backend.target_format(target)?)?;
        let (width, height) = backend.target_size(target)?;
        if (width, height) != (self.width, self.height) {
            return Err(SimError::FrameSize {
                expected: self.source_len(),
                found: width as usize * height as usize * BGRX_BYTES_PER_PIXEL,
            });
        }

        let lock = PixelReadLock::acquire(backend, target)?;
        self.convert_into(lock.pixels()?, dst)
    }
}

/// Luma and the two chroma differences of one BGRX pixel
fn yuv(px: &[u8]) -> (f64, f64, f64) {
    let b = f64::from(px[0]) / 255.0;
    let g = f64::from(px[1]) / 255.0;
    let r = f64::from(px[2]) / 255.0;
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let u = (0.492 * (b - y) + 0.436) / 2.0;
    let v = (0.877 * (r - y) + 0.615) / 2.0;
    (y, u, v)
}

fn convert_pair(p1: &[u8], p2: &[u8]) -> [u8; 4] {
    let (y1, u1, v1) = yuv(p1);
    let (y2, u2, v2) = yuv(p2);
    [
        quantize(y1),
        quantize((u1 + u2) / 2.0),
        quantize(y2),
        quantize((v1 + v2) / 2.0),
    ]
}

/// Saturate to `[0, 1]`, scale to `[0, 255]` and truncate
fn quantize(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0) as u8
}
