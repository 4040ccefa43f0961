//! Presentation events emitted for a UI layer.

use lenscap_media_model::{Artifact, FacingMode};
use tokio::sync::mpsc;

/// State changes a UI renders.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    RecordingStarted,
    /// Fraction of the duration limit used, in `[0.0, 1.0]`.
    Progress(f64),
    ArtifactReady(Artifact),
    RecordingFailed { reason: String },
    SwitchStarted,
    SwitchCompleted(FacingMode),
    SwitchFailed { reason: String },
}

/// Fan-out point for [`SessionEvent`]s.
///
/// Emitting never blocks and never fails; events are dropped once the
/// receiver is gone.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl EventSink {
    /// A sink paired with the receiver a UI drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                tracing::trace!("Event receiver dropped");
            }
        }
    }
}
