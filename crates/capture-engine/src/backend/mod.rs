//! Collaborator interfaces the capture engine drives.
//!
//! The AR session, the media-device service and the platform recorder
//! are opaque. The engine only sees the narrow capability sets below.

use lenscap_common::error::LenscapResult;
use lenscap_media_model::{
    Artifact, Chunk, ConstraintSet, MediaSource, RenderSize, RenderTarget, SourceHandle,
};
use tokio::sync::mpsc;

pub mod synthetic;

pub use synthetic::{
    SessionCall, SyntheticArSession, SyntheticDevices, SyntheticRecorder, SyntheticShareTarget,
};

/// The external AR rendering session.
///
/// The session outlives every camera: a switch only replaces its source.
#[async_trait::async_trait]
pub trait ArSession: Send + Sync {
    /// Feed the session from `source`.
    async fn set_source(&self, source: MediaSource) -> LenscapResult<()>;

    /// Resize the session's render output.
    async fn set_render_size(&self, size: RenderSize) -> LenscapResult<()>;

    async fn play(&self) -> LenscapResult<()>;

    async fn pause(&self) -> LenscapResult<()>;
}

/// Camera acquisition (the media-device half of the capture service).
#[async_trait::async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire an input matching `constraints`.
    ///
    /// Fails with `LenscapError::MediaAccess` when permission is denied
    /// or no device matches.
    async fn acquire(&self, constraints: &ConstraintSet) -> LenscapResult<SourceHandle>;

    /// Stop every track of `handle`. Releasing twice is harmless.
    fn release(&self, handle: &SourceHandle);
}

/// The platform recorder fed from the render target.
///
/// After `start` succeeds the recorder reports progress through the
/// [`SignalSender`] it was given: chunks in capture order, then exactly
/// one `Stopped` after its last chunk, or an `Error`.
pub trait NativeRecorder: Send {
    fn start(
        &mut self,
        target: RenderTarget,
        constraints: &ConstraintSet,
        signals: SignalSender,
    ) -> LenscapResult<()>;

    /// Ask the recorder to flush pending data and stop.
    fn request_stop(&mut self) -> LenscapResult<()>;
}

/// How a share request ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    /// The user dismissed the share sheet.
    Cancelled,
    /// The platform cannot share this artifact; nothing was attempted.
    Unsupported,
}

/// The platform share sheet.
#[async_trait::async_trait]
pub trait ShareTarget: Send + Sync {
    /// Whether `artifact` can be shared here at all.
    fn can_share(&self, artifact: &Artifact) -> bool;

    /// Offer `artifact` to the user. Cancellation is `Ok(Cancelled)`;
    /// anything else that goes wrong is `LenscapError::ShareFailed`.
    async fn share(&self, artifact: &Artifact) -> LenscapResult<ShareOutcome>;
}

/// What a recorder reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalKind {
    Started,
    ChunkAvailable(Chunk),
    Stopped,
    Error(String),
}

/// A recorder signal tagged with the recording it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderSignal {
    pub recording_id: u64,
    pub kind: SignalKind,
}

/// Handle a recorder uses to report signals for one recording.
#[derive(Debug, Clone)]
pub struct SignalSender {
    recording_id: u64,
    tx: mpsc::UnboundedSender<RecorderSignal>,
}

impl SignalSender {
    pub(crate) fn new(recording_id: u64, tx: mpsc::UnboundedSender<RecorderSignal>) -> Self {
        Self { recording_id, tx }
    }

    pub fn recording_id(&self) -> u64 {
        self.recording_id
    }

    pub fn started(&self) -> bool {
        self.send(SignalKind::Started)
    }

    pub fn chunk(&self, chunk: Chunk) -> bool {
        self.send(SignalKind::ChunkAvailable(chunk))
    }

    pub fn stopped(&self) -> bool {
        self.send(SignalKind::Stopped)
    }

    pub fn error(&self, reason: impl Into<String>) -> bool {
        self.send(SignalKind::Error(reason.into()))
    }

    /// Returns false once the receiving controller is gone.
    fn send(&self, kind: SignalKind) -> bool {
        self.tx
            .send(RecorderSignal {
                recording_id: self.recording_id,
                kind,
            })
            .is_ok()
    }
}

/// Receiving half of the recorder signal channel.
pub type SignalReceiver = mpsc::UnboundedReceiver<RecorderSignal>;
