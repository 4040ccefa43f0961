//! Recording lifecycle: the recorder state machine and its chunk buffer.
//!
//! ```text
//! Idle ──start──▶ Recording ──stop / limit──▶ Finalizing ──ack──▶ Previewing
//!  ▲                  │                           │                  │
//!  └──── error ───────┴──────── error / reset ────┴────── reset ─────┘
//! ```
//!
//! Chunks are buffered while recording. Stopping moves the buffer into the
//! finalizing payload, where the recorder's flush chunks (delivered before
//! its stop acknowledgment) are appended. The acknowledgment turns the
//! payload into the artifact. A recorder error never yields a partial
//! artifact.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lenscap_common::clock::{Clock, RecordingClock};
use lenscap_media_model::{Artifact, Chunk, ChunkBuffer, ConstraintSet, OutputFormat, RenderTarget};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::backend::{NativeRecorder, RecorderSignal, SignalKind, SignalReceiver, SignalSender};
use crate::events::{EventSink, SessionEvent};

/// State of the recording lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordingState {
    /// Nothing recorded, or the last result was discarded.
    #[default]
    Idle,
    /// Recorder running, chunks accumulating.
    Recording,
    /// Stop requested, waiting for the recorder's acknowledgment.
    Finalizing,
    /// Artifact assembled and available.
    Previewing,
}

/// Output settings for recordings.
#[derive(Debug, Clone)]
pub struct RecordingSettings {
    pub output: OutputFormat,
    /// Recordings are stopped automatically at this length.
    pub max_duration: Duration,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            output: OutputFormat::default(),
            max_duration: Duration::from_secs(60),
        }
    }
}

pub struct RecordingLifecycle {
    recorder: Box<dyn NativeRecorder>,
    settings: RecordingSettings,
    clock: Arc<dyn Clock>,
    events: EventSink,
    signal_tx: mpsc::UnboundedSender<RecorderSignal>,
    state: RecordingState,
    chunks: ChunkBuffer,
    finalizing: Vec<u8>,
    artifact: Option<Artifact>,
    recording_clock: Option<RecordingClock>,
    stopped_at: Option<Instant>,
    recording_id: u64,
    auto_stopped: bool,
}

impl RecordingLifecycle {
    /// Create an idle lifecycle. The returned receiver carries the
    /// recorder's signals; feed them back through [`Self::handle_signal`].
    pub fn new(
        recorder: Box<dyn NativeRecorder>,
        settings: RecordingSettings,
        clock: Arc<dyn Clock>,
        events: EventSink,
    ) -> (Self, SignalReceiver) {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let lifecycle = Self {
            recorder,
            settings,
            clock,
            events,
            signal_tx,
            state: RecordingState::Idle,
            chunks: ChunkBuffer::new(),
            finalizing: Vec::new(),
            artifact: None,
            recording_clock: None,
            stopped_at: None,
            recording_id: 0,
            auto_stopped: false,
        };
        (lifecycle, signal_rx)
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// The finished recording, while previewing.
    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn buffered_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn buffered_bytes(&self) -> usize {
        self.chunks.total_bytes()
    }

    pub fn max_duration(&self) -> Duration {
        self.settings.max_duration
    }

    /// Wall-clock start of the current or last recording (RFC 3339).
    pub fn started_at(&self) -> Option<&str> {
        self.recording_clock.as_ref().map(RecordingClock::epoch_wall)
    }

    /// Start a new recording of `target`.
    ///
    /// Returns false without touching anything while a recording is
    /// running or finalizing, or when the recorder refuses to start.
    pub fn start_recording(&mut self, target: RenderTarget, constraints: &ConstraintSet) -> bool {
        if matches!(
            self.state,
            RecordingState::Recording | RecordingState::Finalizing
        ) {
            tracing::debug!(state = ?self.state, "Ignoring start while a recording is active");
            return false;
        }

        let recording_id = self.recording_id + 1;
        let signals = SignalSender::new(recording_id, self.signal_tx.clone());
        if let Err(e) = self.recorder.start(target, constraints, signals) {
            tracing::warn!(error = %e, "Recorder failed to start");
            self.events.emit(SessionEvent::RecordingFailed {
                reason: e.to_string(),
            });
            return false;
        }

        self.recording_id = recording_id;
        self.artifact = None;
        self.chunks.clear();
        self.finalizing.clear();
        let recording_clock = RecordingClock::start_at(self.clock.now());
        let started_at = recording_clock.epoch_wall().to_string();
        self.recording_clock = Some(recording_clock);
        self.stopped_at = None;
        self.auto_stopped = false;
        self.state = RecordingState::Recording;

        tracing::info!(
            recording_id,
            %started_at,
            width = target.size.width,
            height = target.size.height,
            fps = target.fps,
            audio = constraints.audio,
            "Recording started"
        );
        self.events.emit(SessionEvent::RecordingStarted);
        true
    }

    /// Append a chunk. Ignored unless recording; empty chunks are dropped.
    pub fn on_chunk_available(&mut self, chunk: Chunk) {
        if self.state != RecordingState::Recording {
            tracing::trace!(state = ?self.state, bytes = chunk.len(), "Dropping chunk outside recording");
            return;
        }
        if chunk.is_empty() {
            return;
        }
        self.chunks.push(chunk);
    }

    /// Ask the recorder to stop. No-op unless recording.
    pub fn stop_recording(&mut self) {
        if self.state != RecordingState::Recording {
            return;
        }

        tracing::info!(
            chunks = self.chunks.len(),
            bytes = self.chunks.total_bytes(),
            "Stopping recording"
        );
        self.finalizing = self.chunks.take_concatenated();
        self.state = RecordingState::Finalizing;
        self.stopped_at = Some(self.clock.now());

        if let Err(e) = self.recorder.request_stop() {
            self.on_recorder_error(&format!("Recorder failed to stop: {e}"));
        }
    }

    /// Data the recorder flushed after the stop request.
    fn on_flush_chunk(&mut self, chunk: Chunk) {
        if self.state != RecordingState::Finalizing {
            return;
        }
        self.finalizing.extend_from_slice(chunk.as_bytes());
    }

    /// Recorder acknowledged the stop: assemble the artifact.
    pub fn on_stop_acknowledged(&mut self) {
        if self.state != RecordingState::Finalizing {
            tracing::debug!(state = ?self.state, "Ignoring stop acknowledgment");
            return;
        }

        let bytes = std::mem::take(&mut self.finalizing);
        let artifact = Artifact::new(bytes, self.settings.output.clone());
        tracing::info!(
            bytes = artifact.len(),
            file = artifact.file_name(),
            mime = artifact.mime_type(),
            "Recording finalized"
        );

        self.artifact = Some(artifact.clone());
        self.state = RecordingState::Previewing;
        self.events.emit(SessionEvent::ArtifactReady(artifact));
    }

    /// Recorder failed: discard everything and go back to idle.
    pub fn on_recorder_error(&mut self, reason: &str) {
        if !matches!(
            self.state,
            RecordingState::Recording | RecordingState::Finalizing
        ) {
            tracing::debug!(state = ?self.state, reason, "Ignoring recorder error");
            return;
        }

        tracing::error!(
            reason,
            discarded_chunks = self.chunks.len(),
            discarded_bytes = self.finalizing.len(),
            "Recording failed"
        );
        self.chunks.clear();
        self.finalizing.clear();
        self.artifact = None;
        self.recording_clock = None;
        self.stopped_at = None;
        self.state = RecordingState::Idle;
        self.events.emit(SessionEvent::RecordingFailed {
            reason: reason.to_string(),
        });
    }

    /// Dispatch a recorder signal. Signals from earlier recordings are dropped.
    pub fn handle_signal(&mut self, signal: RecorderSignal) {
        if signal.recording_id != self.recording_id {
            tracing::trace!(
                stale = signal.recording_id,
                current = self.recording_id,
                "Dropping stale recorder signal"
            );
            return;
        }

        match signal.kind {
            SignalKind::Started => tracing::debug!("Recorder confirmed start"),
            SignalKind::ChunkAvailable(chunk) if self.state == RecordingState::Finalizing => {
                self.on_flush_chunk(chunk)
            }
            SignalKind::ChunkAvailable(chunk) => self.on_chunk_available(chunk),
            SignalKind::Stopped => self.on_stop_acknowledged(),
            SignalKind::Error(reason) => self.on_recorder_error(&reason),
        }
    }

    /// Fraction of the duration limit used at `now`, in `[0.0, 1.0]`.
    ///
    /// Polled once per frame while recording: emits a progress event and
    /// stops the recording the first time the limit is reached. Progress
    /// freezes once the recording stops and returns to zero after a reset.
    pub fn elapsed_fraction(&mut self, now: Instant) -> f64 {
        let Some(clock) = self.recording_clock.as_ref() else {
            return 0.0;
        };

        let effective_now = match self.stopped_at {
            Some(stopped) if stopped < now => stopped,
            _ => now,
        };
        let fraction = clock.fraction_at(effective_now, self.settings.max_duration);

        if self.state == RecordingState::Recording {
            self.events.emit(SessionEvent::Progress(fraction));
            if fraction >= 1.0 && !self.auto_stopped {
                self.auto_stopped = true;
                tracing::info!("Recording reached its duration limit");
                self.stop_recording();
            }
        }

        fraction
    }

    /// Discard the artifact and return to idle.
    ///
    /// Only applies while finalizing or previewing; returns whether it did.
    pub fn reset(&mut self) -> bool {
        if !matches!(
            self.state,
            RecordingState::Finalizing | RecordingState::Previewing
        ) {
            return false;
        }

        tracing::debug!(from = ?self.state, "Resetting recording");
        self.artifact = None;
        self.chunks.clear();
        self.finalizing.clear();
        self.recording_clock = None;
        self.stopped_at = None;
        self.state = RecordingState::Idle;
        true
    }
}

impl std::fmt::Debug for RecordingLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingLifecycle")
            .field("state", &self.state)
            .field("recording_id", &self.recording_id)
            .field("buffered_chunks", &self.chunks.len())
            .field("has_artifact", &self.artifact.is_some())
            .finish()
    }
}
