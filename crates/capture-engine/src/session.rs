//! Capture session controller.
//!
//! Ties one camera source and one recording lifecycle to a viewport and
//! exposes the handful of UI actions a capture screen needs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lenscap_common::clock::{Clock, SystemClock};
use lenscap_common::config::{AppConfig, CameraPolicy};
use lenscap_common::error::{LenscapError, LenscapResult};
use lenscap_media_model::{
    Artifact, CameraPresets, DeviceClass, FacingMode, RenderSize, RenderTarget, SourceHandle,
};
use serde::Serialize;

use crate::backend::{
    ArSession, MediaDevices, NativeRecorder, ShareOutcome, ShareTarget, SignalReceiver,
};
use crate::camera::CameraSource;
use crate::events::EventSink;
use crate::recording::{RecordingLifecycle, RecordingSettings, RecordingState};

/// Configuration for a capture session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub presets: CameraPresets,
    pub policy: CameraPolicy,

    /// Device class, usually derived from the user agent.
    pub device_class: DeviceClass,

    /// Viewport size in CSS pixels.
    pub viewport: (u32, u32),

    pub device_pixel_ratio: f64,

    /// Cover the viewport at this aspect ratio instead of matching it.
    pub aspect_ratio: Option<f64>,

    /// Frame rate of the stream handed to the recorder.
    pub capture_fps: u32,

    pub recording: RecordingSettings,
}

impl SessionConfig {
    /// Build a session config from validated application config.
    ///
    /// Fails with `ConfigurationMissing` before anything is acquired.
    pub fn from_app_config(
        config: &AppConfig,
        device_class: DeviceClass,
        viewport: (u32, u32),
        device_pixel_ratio: f64,
    ) -> LenscapResult<Self> {
        config.validate()?;
        Ok(Self {
            presets: config.camera.presets.clone(),
            policy: config.camera.policy,
            device_class,
            viewport,
            device_pixel_ratio,
            aspect_ratio: config.camera.aspect_ratio,
            capture_fps: config.camera.capture_fps,
            recording: RecordingSettings {
                output: config.recording.output.clone(),
                max_duration: config.recording.max_duration(),
            },
        })
    }

    /// Render size for the current viewport.
    pub fn render_size(&self) -> RenderSize {
        let (width, height) = self.viewport;
        match self.aspect_ratio {
            Some(aspect) => RenderSize::fit_aspect(width, height, aspect, self.device_pixel_ratio),
            None => RenderSize::from_viewport(width, height),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let size = RenderSize::default();
        Self {
            presets: CameraPresets::default(),
            policy: CameraPolicy::default(),
            device_class: DeviceClass::default(),
            viewport: (size.width, size.height),
            device_pixel_ratio: 1.0,
            aspect_ratio: None,
            capture_fps: 30,
            recording: RecordingSettings::default(),
        }
    }
}

/// The external services a session drives.
pub struct Collaborators {
    pub devices: Arc<dyn MediaDevices>,
    pub session: Arc<dyn ArSession>,
    pub recorder: Box<dyn NativeRecorder>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Collaborators on the process clock.
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        session: Arc<dyn ArSession>,
        recorder: Box<dyn NativeRecorder>,
    ) -> Self {
        Self {
            devices,
            session,
            recorder,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Point-in-time view of a session, for status output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub recording: RecordingState,
    pub facing: FacingMode,
    pub switching: bool,
    pub camera_active: bool,
    pub render_size: RenderSize,
    pub buffered_chunks: usize,
    pub buffered_bytes: usize,
    pub artifact_bytes: Option<usize>,
    /// Wall-clock start of the current or last recording.
    pub recording_started_at: Option<String>,
}

/// A capture screen: one camera, one recorder, one render target.
pub struct CaptureController {
    config: SessionConfig,
    camera: CameraSource,
    recording: RecordingLifecycle,
    signals: SignalReceiver,
    clock: Arc<dyn Clock>,
    render_size: RenderSize,
}

impl CaptureController {
    pub fn new(config: SessionConfig, collaborators: Collaborators, events: EventSink) -> Self {
        let Collaborators {
            devices,
            session,
            recorder,
            clock,
        } = collaborators;

        let camera = CameraSource::new(
            devices,
            session,
            config.presets.clone(),
            config.policy,
            config.device_class,
            events.clone(),
        );
        let (recording, signals) =
            RecordingLifecycle::new(recorder, config.recording.clone(), clock.clone(), events);
        let render_size = config.render_size();

        Self {
            config,
            camera,
            recording,
            signals,
            clock,
            render_size,
        }
    }

    /// Acquire the default camera, size the render target and play.
    pub async fn start(&mut self) -> LenscapResult<SourceHandle> {
        let facing = self.camera.default_facing();
        tracing::info!(
            %facing,
            device = ?self.config.device_class,
            width = self.render_size.width,
            height = self.render_size.height,
            "Starting capture session"
        );

        let handle = self.camera.initialize(facing).await?;
        self.camera.set_render_size(self.render_size).await?;
        Ok(handle)
    }

    /// The record button: stop while recording, start otherwise.
    ///
    /// Returns whether the press changed anything. Presses while a
    /// recording is finalizing are ignored.
    pub fn toggle_recording(&mut self) -> bool {
        match self.recording.state() {
            RecordingState::Recording => {
                self.recording.stop_recording();
                true
            }
            RecordingState::Finalizing => false,
            RecordingState::Idle | RecordingState::Previewing => {
                let target = RenderTarget::new(self.render_size, self.config.capture_fps);
                let constraints = self.camera.current_constraints();
                self.recording.start_recording(target, &constraints)
            }
        }
    }

    /// Per-frame progress poll. Stops the recording at the duration limit.
    pub fn tick(&mut self) -> f64 {
        let now = self.clock.now();
        self.recording.elapsed_fraction(now)
    }

    /// Dispatch every recorder signal already queued. Returns how many.
    pub fn process_signals(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(signal) = self.signals.try_recv() {
            self.recording.handle_signal(signal);
            handled += 1;
        }
        handled
    }

    /// Wait for the next recorder signal and dispatch it.
    ///
    /// Returns false once no recorder can send anymore.
    pub async fn next_signal(&mut self) -> bool {
        match self.signals.recv().await {
            Some(signal) => {
                self.recording.handle_signal(signal);
                true
            }
            None => false,
        }
    }

    /// Dispatch signals until a finalizing recording settles.
    pub async fn await_finalized(&mut self) -> Option<&Artifact> {
        while self.recording.state() == RecordingState::Finalizing {
            if !self.next_signal().await {
                break;
            }
        }
        self.recording.artifact()
    }

    /// Leave the preview: discard the recording and re-apply the render size.
    pub async fn back(&mut self) -> LenscapResult<bool> {
        let reset = self.recording.reset();
        self.camera.set_render_size(self.render_size).await?;
        Ok(reset)
    }

    /// Viewport changed.
    pub async fn resize(&mut self, width: u32, height: u32) -> LenscapResult<RenderSize> {
        self.config.viewport = (width, height);
        let size = self.config.render_size();
        if size != self.render_size {
            tracing::debug!(width = size.width, height = size.height, "Viewport resized");
        }
        self.render_size = size;
        self.camera.set_render_size(size).await?;
        Ok(size)
    }

    pub async fn switch_camera(&self) -> LenscapResult<SourceHandle> {
        self.camera.switch_facing().await
    }

    /// Write the previewed recording into `dir`.
    pub fn save_artifact(&self, dir: &Path) -> LenscapResult<PathBuf> {
        let artifact = self.recording.artifact().ok_or(LenscapError::NoArtifact)?;
        let path = artifact.save_to(dir)?;
        tracing::info!(path = %path.display(), bytes = artifact.len(), "Recording saved");
        Ok(path)
    }

    /// Offer the previewed recording to the platform share sheet.
    ///
    /// An unsupported platform or a dismissed sheet is reported through
    /// the outcome, not as an error.
    pub async fn share_artifact(&self, target: &dyn ShareTarget) -> LenscapResult<ShareOutcome> {
        let artifact = self.recording.artifact().ok_or(LenscapError::NoArtifact)?;
        if !target.can_share(artifact) {
            tracing::warn!(mime = artifact.mime_type(), "Sharing is not supported here");
            return Ok(ShareOutcome::Unsupported);
        }

        let outcome = target.share(artifact).await?;
        match outcome {
            ShareOutcome::Shared => tracing::info!(file = artifact.file_name(), "Recording shared"),
            ShareOutcome::Cancelled => tracing::info!("Share cancelled by user"),
            ShareOutcome::Unsupported => {}
        }
        Ok(outcome)
    }

    /// Stop any running recording and release the camera.
    pub async fn shutdown(&mut self) {
        if self.recording.state() == RecordingState::Recording {
            self.recording.stop_recording();
        }
        self.camera.shutdown().await;
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recording.state()
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.recording.artifact()
    }

    pub fn facing(&self) -> FacingMode {
        self.camera.facing()
    }

    pub fn render_size(&self) -> RenderSize {
        self.render_size
    }

    pub fn camera(&self) -> &CameraSource {
        &self.camera
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            recording: self.recording.state(),
            facing: self.camera.facing(),
            switching: self.camera.is_switching(),
            camera_active: self.camera.active_handle().is_some(),
            render_size: self.render_size,
            buffered_chunks: self.recording.buffered_chunks(),
            buffered_bytes: self.recording.buffered_bytes(),
            artifact_bytes: self.recording.artifact().map(Artifact::len),
            recording_started_at: self.recording.started_at().map(str::to_string),
        }
    }
}

impl std::fmt::Debug for CaptureController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureController")
            .field("render_size", &self.render_size)
            .field("recording", &self.recording)
            .finish_non_exhaustive()
    }
}
