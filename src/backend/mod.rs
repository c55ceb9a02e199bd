//! Backend abstraction layer
//!
//! Provides the render engine interface the camera pipeline drives and a software
//! implementation of it.

pub mod lock;
pub mod software;
pub mod surface;
pub mod traits;
pub mod types;

pub use lock::PixelReadLock;
pub use software::SoftwareBackend;
#[cfg(feature = "window")]
pub use surface::WindowSurface;
pub use surface::{DisplaySurface, HeadlessSurface};
pub use traits::*;
pub use types::*;
