//! Progress-callback trait for intake events.
//!
//! Inject an [`Arc<dyn IntakeProgressCallback>`] via
//! [`crate::config::IntakeConfigBuilder::progress_callback`] to be told about
//! every state transition, every message appended to the transcript, and the
//! moment the final artifact becomes available. The CLI uses it to print the
//! conversation live and to show a spinner while a file is being analysed.
//!
//! # Example
//!
//! ```rust
//! use edgequake_intake::{FlowState, IntakeConfig, IntakeProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct TransitionCounter(AtomicUsize);
//!
//! impl IntakeProgressCallback for TransitionCounter {
//!     fn on_state_change(&self, _from: FlowState, _to: FlowState) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = IntakeConfig::builder()
//!     .progress_callback(Arc::new(TransitionCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::conversation::Message;
use crate::model::{Artifact, FlowState};
use std::sync::Arc;

/// Called by the intake machine as the session advances.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Callbacks run inline on the machine's task, in the
/// same order as the transcript.
pub trait IntakeProgressCallback: Send + Sync {
    /// Called on every `FlowState` change, including restarts.
    fn on_state_change(&self, from: FlowState, to: FlowState) {
        let _ = (from, to);
    }

    /// Called after a message has been appended to the conversation log.
    fn on_message(&self, message: &Message) {
        let _ = message;
    }

    /// Called once the final artifact is stored in the session.
    fn on_artifact_ready(&self, artifact: &Artifact) {
        let _ = artifact;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl IntakeProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::IntakeConfig`].
pub type ProgressCallback = Arc<dyn IntakeProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Message;
    use crate::model::ArtifactSource;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        transitions: AtomicUsize,
        messages: AtomicUsize,
        artifacts: AtomicUsize,
    }

    impl IntakeProgressCallback for TrackingCallback {
        fn on_state_change(&self, _from: FlowState, _to: FlowState) {
            self.transitions.fetch_add(1, Ordering::SeqCst);
        }

        fn on_message(&self, _message: &Message) {
            self.messages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_artifact_ready(&self, _artifact: &Artifact) {
            self.artifacts.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_state_change(FlowState::AwaitingFirst, FlowState::AnalyzingFirst);
        cb.on_message(&Message::assistant("hello"));
        cb.on_artifact_ready(&Artifact::pdf("a.pdf", b"%PDF-".to_vec(), ArtifactSource::Original));
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_state_change(FlowState::AwaitingFirst, FlowState::AnalyzingFirst);
        tracker.on_state_change(FlowState::AnalyzingFirst, FlowState::AwaitingSecond);
        tracker.on_message(&Message::assistant("Now send the back side."));

        assert_eq!(tracker.transitions.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.messages.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.artifacts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_state_change(FlowState::Completed, FlowState::AwaitingFirst);
    }
}
