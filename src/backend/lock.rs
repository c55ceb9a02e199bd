//! Scoped pixel-buffer read lock

use crate::backend::traits::*;

/// Read lock on a render target's pixel buffer.
///
/// The lock is released when the guard is dropped, on every exit path. The guard
/// borrows the backend mutably, so the target cannot be rendered while it is held.
pub struct PixelReadLock<'a, B: RenderBackend + ?Sized> {
    backend: &'a mut B,
    target: TargetHandle,
}

impl<'a, B: RenderBackend + ?Sized> PixelReadLock<'a, B> {
    pub fn acquire(backend: &'a mut B, target: TargetHandle) -> BackendResult<Self> {
        backend.lock_pixels(target)?;
        log::trace!("locked pixels of {:?}", target);
        Ok(Self { backend, target })
    }

    pub fn target(&self) -> TargetHandle {
        self.target
    }

    pub fn pixels(&self) -> BackendResult<&[u8]> {
        self.backend.locked_pixels(self.target)
    }
}

impl<B: RenderBackend + ?Sized> Drop for PixelReadLock<'_, B> {
    fn drop(&mut self) {
        if let Err(e) = self.backend.unlock_pixels(self.target) {
            log::warn!("failed to unlock pixels of {:?}: {}", self.target, e);
        } else {
            log::trace!("unlocked pixels of {:?}", self.target);
        }
    }
}
