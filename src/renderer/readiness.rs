//! Renderer readiness with a single deferred refresh.
//!
//! A refresh requested before the model finishes loading is parked (latest
//! request wins) and handed back exactly once on the `Ready` transition.
//! Resetting drops it, so nothing stale fires against a torn-down model.

/// Load state of the current model.
#[derive(Debug, Clone, PartialEq)]
pub enum Readiness<T> {
    /// Still uploading; holds the refresh to run once ready.
    NotReady {
        /// Deferred refresh argument, if one was requested.
        pending: Option<T>,
    },
    /// Every entry is uploaded; refreshes run immediately.
    Ready,
}

impl<T> Default for Readiness<T> {
    fn default() -> Self {
        Self::NotReady { pending: None }
    }
}

impl<T> Readiness<T> {
    /// `true` once the model has loaded.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Park `request` if not ready, replacing any earlier one. Returns the
    /// request back when it should run now.
    pub fn defer(&mut self, request: T) -> Option<T> {
        match self {
            Self::Ready => Some(request),
            Self::NotReady { pending } => {
                *pending = Some(request);
                None
            }
        }
    }

    /// Transition to `Ready`, handing back the parked request if any.
    pub fn mark_ready(&mut self) -> Option<T> {
        match std::mem::replace(self, Self::Ready) {
            Self::NotReady { pending } => pending,
            Self::Ready => None,
        }
    }

    /// Back to `NotReady`, cancelling any parked request.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// `true` while a request is parked.
    pub fn has_pending(&self) -> bool {
        matches!(self, Self::NotReady { pending: Some(_) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_runs_immediately() {
        let mut state = Readiness::Ready;
        assert_eq!(state.defer(1), Some(1));
        assert!(!state.has_pending());
    }

    #[test]
    fn latest_deferred_request_wins() {
        let mut state = Readiness::default();
        assert_eq!(state.defer(1), None);
        assert_eq!(state.defer(2), None);
        assert!(state.has_pending());
        assert_eq!(state.mark_ready(), Some(2));
        assert!(state.is_ready());
        assert_eq!(state.mark_ready(), None);
    }

    #[test]
    fn reset_cancels_pending() {
        let mut state = Readiness::default();
        let _ = state.defer("camera");
        state.reset();
        assert!(!state.has_pending());
        assert_eq!(state.mark_ready(), None);
    }
}
