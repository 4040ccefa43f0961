//! Record a clip against the synthetic backend.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lenscap_capture_engine::backend::{
    ShareOutcome, SyntheticArSession, SyntheticDevices, SyntheticRecorder, SyntheticShareTarget,
};
use lenscap_capture_engine::{
    CaptureController, Collaborators, EventSink, RecordingState, SessionConfig, SessionEvent,
};
use lenscap_common::config::AppConfig;
use lenscap_media_model::{DeviceClass, FacingMode, RenderSize};
use tokio::sync::mpsc::UnboundedReceiver;

const CHUNK_INTERVAL: Duration = Duration::from_millis(250);
const CHUNK_BYTES: usize = 16 * 1024;

pub struct RecordOptions {
    pub stop_after_secs: Option<f64>,
    pub flip_at_secs: Option<f64>,
    pub output: PathBuf,
    pub front: bool,
    pub user_agent: Option<String>,
    pub share: bool,
}

pub async fn run(mut config: AppConfig, options: RecordOptions) -> anyhow::Result<()> {
    let device_class = options
        .user_agent
        .as_deref()
        .map(DeviceClass::from_user_agent)
        .unwrap_or_default();
    if options.front {
        config.camera.policy.default_facing = Some(FacingMode::Front);
    }

    let viewport = RenderSize::default();
    let session_config = SessionConfig::from_app_config(
        &config,
        device_class,
        (viewport.width, viewport.height),
        1.0,
    )?;
    let frame_interval = Duration::from_secs_f64(1.0 / f64::from(session_config.capture_fps.max(1)));

    println!("Starting capture session");
    println!("  Device: {device_class:?}");
    println!("  Output: {}", options.output.display());
    println!(
        "  Limit: {}s",
        session_config.recording.max_duration.as_secs()
    );
    println!();

    let (events, mut event_rx) = EventSink::channel();
    let collaborators = Collaborators::new(
        Arc::new(SyntheticDevices::new()),
        Arc::new(SyntheticArSession::new()),
        Box::new(SyntheticRecorder::new(CHUNK_INTERVAL, CHUNK_BYTES)),
    );
    let mut controller = CaptureController::new(session_config, collaborators, events);

    let handle = controller.start().await?;
    println!("Camera: {} ({})", handle.label, handle.facing);

    if !controller.toggle_recording() {
        report_events(&mut event_rx);
        anyhow::bail!("Recorder refused to start");
    }

    let started = Instant::now();
    let mut flipped = false;
    let mut ticker = tokio::time::interval(frame_interval);

    while controller.recording_state() == RecordingState::Recording {
        ticker.tick().await;
        controller.process_signals();
        controller.tick();

        let elapsed = started.elapsed().as_secs_f64();
        if !flipped && options.flip_at_secs.is_some_and(|at| elapsed >= at) {
            flipped = true;
            if let Err(e) = controller.switch_camera().await {
                tracing::warn!(error = %e, "Camera switch failed during recording");
            }
        }
        if options.stop_after_secs.is_some_and(|secs| elapsed >= secs)
            && controller.recording_state() == RecordingState::Recording
        {
            controller.toggle_recording();
        }

        report_events(&mut event_rx);
    }

    let finalized = controller.await_finalized().await.is_some();
    report_events(&mut event_rx);
    if !finalized {
        controller.shutdown().await;
        anyhow::bail!("Recording failed; nothing was saved");
    }

    std::fs::create_dir_all(&options.output)?;
    let path = controller.save_artifact(&options.output)?;
    println!();
    println!("Recording saved to: {}", path.display());

    if options.share {
        let target = SyntheticShareTarget::new();
        match controller.share_artifact(&target).await? {
            ShareOutcome::Shared => println!("Shared {}", path.display()),
            ShareOutcome::Cancelled => println!("Sharing cancelled"),
            ShareOutcome::Unsupported => println!("Sharing is not supported on this device"),
        }
    }

    controller.shutdown().await;
    Ok(())
}

fn report_events(rx: &mut UnboundedReceiver<SessionEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            SessionEvent::Progress(fraction) => {
                tracing::trace!(fraction, "Progress");
            }
            SessionEvent::RecordingStarted => println!("Recording..."),
            SessionEvent::ArtifactReady(artifact) => {
                println!("Finalized {} bytes ({})", artifact.len(), artifact.mime_type());
            }
            SessionEvent::RecordingFailed { reason } => println!("Recording failed: {reason}"),
            SessionEvent::SwitchStarted => println!("Switching camera..."),
            SessionEvent::SwitchCompleted(facing) => println!("Switched to {facing} camera"),
            SessionEvent::SwitchFailed { reason } => println!("Camera switch failed: {reason}"),
        }
    }
}
