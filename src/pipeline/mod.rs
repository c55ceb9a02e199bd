//! Camera frame pipeline
//!
//! Passes that run around the primary render target: the sensor noise passes and the
//! YUYV conversion of the finished frame.

pub mod noise;
pub mod yuyv;

pub use noise::{NoiseCompositor, ScreenNoiseOverlay, SensorNoise};
pub use yuyv::{FrameBuffer, YuyvConverter};

use crate::backend::{BackendResult, RenderBackend, TargetHandle};

/// Hooks called around the update of one render target
pub trait RenderTargetListener<B: RenderBackend + ?Sized> {
    fn pre_update(&mut self, backend: &mut B, target: TargetHandle) -> BackendResult<()>;

    fn post_update(&mut self, backend: &mut B, target: TargetHandle) -> BackendResult<()>;
}

/// Update `target` bracketed by the listener's hooks.
///
/// `post_update` runs even when `pre_update` or the render itself fails. The first
/// error encountered is returned.
pub fn update_with_listener<B, L>(
    backend: &mut B,
    target: TargetHandle,
    listener: &mut L,
) -> BackendResult<()>
where
    B: RenderBackend + ?Sized,
    L: RenderTargetListener<B> + ?Sized,
{
    let result = listener
        .pre_update(backend, target)
        .and_then(|()| backend.update_target(target));
    let post = listener.post_update(backend, target);
    result.and(post)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        BackendError, PixelFormat, SoftwareBackend, TargetDescriptor, ViewportDescriptor,
    };

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        fail_pre: bool,
    }

    impl<B: RenderBackend + ?Sized> RenderTargetListener<B> for Recorder {
        fn pre_update(&mut self, _: &mut B, _: TargetHandle) -> BackendResult<()> {
            self.calls.push("pre");
            if self.fail_pre {
                return Err(BackendError::RenderFailed("pre".into()));
            }
            Ok(())
        }

        fn post_update(&mut self, _: &mut B, _: TargetHandle) -> BackendResult<()> {
            self.calls.push("post");
            Ok(())
        }
    }

    fn setup() -> (SoftwareBackend, TargetHandle) {
        let mut backend = SoftwareBackend::headless();
        let target = backend
            .create_target(&TargetDescriptor::new("t", 2, 2, PixelFormat::Bgrx8))
            .unwrap();
        backend
            .add_viewport(target, &ViewportDescriptor::default())
            .unwrap();
        (backend, target)
    }

    #[test]
    fn test_hooks_bracket_the_update() {
        let (mut backend, target) = setup();
        let mut listener = Recorder::default();
        update_with_listener(&mut backend, target, &mut listener).unwrap();
        assert_eq!(listener.calls, ["pre", "post"]);
        assert_eq!(backend.update_count(), 1);
    }

    #[test]
    fn test_post_runs_when_render_fails() {
        let (mut backend, target) = setup();
        backend.fail_next_update("boom");
        let mut listener = Recorder::default();
        let result = update_with_listener(&mut backend, target, &mut listener);
        assert_eq!(result, Err(BackendError::RenderFailed("boom".into())));
        assert_eq!(listener.calls, ["pre", "post"]);
    }

    #[test]
    fn test_failed_pre_skips_render() {
        let (mut backend, target) = setup();
        let mut listener = Recorder {
            fail_pre: true,
            ..Default::default()
        };
        assert!(update_with_listener(&mut backend, target, &mut listener).is_err());
        assert_eq!(listener.calls, ["pre", "post"]);
        assert_eq!(backend.update_count(), 0);
    }
}
