//! Display surfaces the software backend presents to

use crate::backend::traits::{BackendError, BackendResult};

/// Output surface receiving presented frames as `0x00RRGGBB` words
pub trait DisplaySurface {
    fn present(&mut self, pixels: &[u32], width: usize, height: usize) -> BackendResult<()>;

    /// Process pending window system messages
    fn pump_messages(&mut self);

    fn is_closed(&self) -> bool;
}

/// Surface without a window. Counts presents and can be closed on demand.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    presented: u64,
    closed: bool,
    close_after: Option<u64>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the surface closed once `frames` presents have happened.
    pub fn with_close_after(mut self, frames: u64) -> Self {
        self.close_after = Some(frames);
        self
    }

    /// Simulate the user closing the window
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl DisplaySurface for HeadlessSurface {
    fn present(&mut self, pixels: &[u32], width: usize, height: usize) -> BackendResult<()> {
        if pixels.len() != width * height {
            return Err(BackendError::PresentFailed(format!(
                "expected {} pixels, got {}",
                width * height,
                pixels.len()
            )));
        }
        self.presented += 1;
        Ok(())
    }

    fn pump_messages(&mut self) {
        if self.close_after.is_some_and(|n| self.presented >= n) {
            self.closed = true;
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// On-screen preview window
#[cfg(feature = "window")]
pub struct WindowSurface {
    window: minifb::Window,
}

#[cfg(feature = "window")]
impl WindowSurface {
    pub fn new(title: &str, width: usize, height: usize) -> BackendResult<Self> {
        let window = minifb::Window::new(title, width, height, minifb::WindowOptions::default())
            .map_err(|e| BackendError::TargetCreationFailed(format!("window: {e}")))?;
        Ok(Self { window })
    }
}

#[cfg(feature = "window")]
impl DisplaySurface for WindowSurface {
    fn present(&mut self, pixels: &[u32], width: usize, height: usize) -> BackendResult<()> {
        self.window
            .update_with_buffer(pixels, width, height)
            .map_err(|e| BackendError::PresentFailed(e.to_string()))
    }

    fn pump_messages(&mut self) {
        // update_with_buffer already polls events; this keeps the window responsive
        // on ticks that skip presenting.
        self.window.update();
    }

    fn is_closed(&self) -> bool {
        !self.window.is_open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_after_presents() {
        let mut surface = HeadlessSurface::new().with_close_after(2);
        let pixels = vec![0u32; 4];
        surface.present(&pixels, 2, 2).unwrap();
        surface.pump_messages();
        assert!(!surface.is_closed());
        surface.present(&pixels, 2, 2).unwrap();
        surface.pump_messages();
        assert!(surface.is_closed());
    }

    #[test]
    fn test_present_size_mismatch() {
        let mut surface = HeadlessSurface::new();
        assert!(surface.present(&[0u32; 3], 2, 2).is_err());
        assert_eq!(surface.presented(), 0);
    }
}
