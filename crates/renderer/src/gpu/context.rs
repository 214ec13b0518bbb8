use tracing::warn;

use crate::error::CanvasError;
use crate::gpu::backend::GlBackend;

/// Proof that a backend's context is current for the lifetime of the guard.
///
/// Canvas operations that touch GPU objects take this guard instead of
/// trusting an ambient "current context". A guard built with
/// [`CurrentContext::make_current`] that actually had to activate the context
/// releases it again when dropped.
pub struct CurrentContext<'a, B: GlBackend> {
    backend: &'a B,
    release_on_drop: bool,
}

impl<'a, B: GlBackend> CurrentContext<'a, B> {
    /// Succeeds only when the context is already current.
    pub fn check(backend: &'a B) -> Result<Self, CanvasError> {
        if !backend.is_current() {
            return Err(CanvasError::ContextState);
        }
        Ok(Self {
            backend,
            release_on_drop: false,
        })
    }

    /// Uses the current context, or makes it current for the guard's lifetime.
    pub fn make_current(backend: &'a B) -> Result<Self, CanvasError> {
        if backend.is_current() {
            return Ok(Self {
                backend,
                release_on_drop: false,
            });
        }
        backend.make_current().map_err(|message| {
            warn!(%message, "failed to make graphics context current");
            CanvasError::ContextState
        })?;
        Ok(Self {
            backend,
            release_on_drop: true,
        })
    }

    pub fn backend(&self) -> &'a B {
        self.backend
    }
}

impl<B: GlBackend> Drop for CurrentContext<'_, B> {
    fn drop(&mut self) {
        if self.release_on_drop {
            self.backend.release_current();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::recording::{GlCall, RecordingBackend};

    #[test]
    fn check_rejects_inactive_context() {
        let backend = RecordingBackend::new();
        backend.set_current(false);
        assert!(matches!(
            CurrentContext::check(&backend),
            Err(CanvasError::ContextState)
        ));
    }

    #[test]
    fn make_current_releases_only_what_it_acquired() {
        let backend = RecordingBackend::new();
        drop(CurrentContext::make_current(&backend).expect("already current"));
        assert!(backend.calls().is_empty());

        backend.set_current(false);
        {
            let _guard = CurrentContext::make_current(&backend).expect("activation");
            assert!(backend.is_current());
        }
        assert!(!backend.is_current());
        assert_eq!(backend.calls(), vec![GlCall::MakeCurrent, GlCall::ReleaseCurrent]);
    }

    #[test]
    fn make_current_failure_reports_context_state() {
        let backend = RecordingBackend::new();
        backend.set_current(false);
        backend.refuse_make_current();
        assert!(matches!(
            CurrentContext::make_current(&backend),
            Err(CanvasError::ContextState)
        ));
    }
}
