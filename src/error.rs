//! Simulator error types.

use thiserror::Error;

use crate::backend::{BackendError, PixelFormat};

/// Errors that can occur in the camera pipeline.
#[derive(Error, Debug)]
pub enum SimError {
    /// The render target's pixel layout is not the one the converter was built for.
    #[error("unsupported pixel format: expected {expected:?}, found {found:?}")]
    UnsupportedPixelFormat {
        expected: PixelFormat,
        found: PixelFormat,
    },
    /// The display surface was closed externally.
    #[error("display surface closed")]
    DisplaySurfaceClosed,
    /// An earlier tick failed to create the pipeline's resources.
    #[error("camera pipeline initialization failed: {0}")]
    InitializationFailed(String),
    /// A buffer handed to the converter has the wrong length.
    #[error("frame size mismatch: expected {expected} bytes, found {found}")]
    FrameSize { expected: usize, found: usize },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("render backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    /// Fatal errors stop the simulation; there is no recovery from them.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedPixelFormat { .. }
                | Self::DisplaySurfaceClosed
                | Self::InitializationFailed(_)
        )
    }

    /// Process exit code for the `camera-sim` binary
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::DisplaySurfaceClosed => 2,
            Self::UnsupportedPixelFormat { .. } => 3,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SimError::UnsupportedPixelFormat {
            expected: PixelFormat::Bgrx8,
            found: PixelFormat::Rgba8,
        };
        assert_eq!(
            err.to_string(),
            "unsupported pixel format: expected Bgrx8, found Rgba8"
        );
        assert_eq!(SimError::DisplaySurfaceClosed.to_string(), "display surface closed");
    }

    #[test]
    fn test_fatal_kinds() {
        assert!(SimError::DisplaySurfaceClosed.is_fatal());
        assert!(!SimError::Config("x".into()).is_fatal());
        assert!(!SimError::from(BackendError::RenderFailed("x".into())).is_fatal());
        assert_eq!(SimError::DisplaySurfaceClosed.exit_code(), 2);
        assert_eq!(SimError::Config("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_initialization_failure_exits_with_generic_code() {
        let err = SimError::InitializationFailed("no targets".into());
        assert!(err.is_fatal());
        assert_eq!(err.exit_code(), 1);
        assert_eq!(
            err.to_string(),
            "camera pipeline initialization failed: no targets"
        );
    }
}
