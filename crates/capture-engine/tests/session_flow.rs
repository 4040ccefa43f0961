//! End-to-end capture flows through `CaptureController` on the synthetic backend.

use std::sync::Arc;
use std::time::Duration;

use lenscap_capture_engine::backend::{
    ShareOutcome, SyntheticArSession, SyntheticDevices, SyntheticRecorder, SyntheticShareTarget,
};
use lenscap_capture_engine::{
    CaptureController, Collaborators, EventSink, RecordingSettings, RecordingState, SessionConfig,
    SessionEvent,
};
use lenscap_common::clock::ManualClock;
use lenscap_common::error::LenscapError;
use lenscap_media_model::{DeviceClass, FacingMode, OutputFormat, RenderSize};
use tokio::sync::mpsc::UnboundedReceiver;

const CHUNK: usize = 64;

struct Fixture {
    controller: CaptureController,
    devices: Arc<SyntheticDevices>,
    session: Arc<SyntheticArSession>,
    clock: Arc<ManualClock>,
    events: UnboundedReceiver<SessionEvent>,
}

impl Fixture {
    fn new(recorder: SyntheticRecorder) -> Self {
        let devices = Arc::new(SyntheticDevices::new());
        let session = Arc::new(SyntheticArSession::new());
        let clock = Arc::new(ManualClock::new());
        let (sink, events) = EventSink::channel();

        let config = SessionConfig {
            device_class: DeviceClass::Mobile,
            viewport: (390, 844),
            recording: RecordingSettings {
                output: OutputFormat::default(),
                max_duration: Duration::from_secs(10),
            },
            ..SessionConfig::default()
        };
        let collaborators =
            Collaborators::new(devices.clone(), session.clone(), Box::new(recorder))
                .with_clock(clock.clone());

        Self {
            controller: CaptureController::new(config, collaborators, sink),
            devices,
            session,
            clock,
            events,
        }
    }

    fn synthetic() -> Self {
        Self::new(SyntheticRecorder::new(Duration::from_millis(5), CHUNK))
    }

    fn drain_events(&mut self) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    async fn record_for(&mut self, wall: Duration) {
        assert!(self.controller.toggle_recording());
        tokio::time::sleep(wall).await;
        self.controller.process_signals();
    }
}

#[tokio::test]
async fn start_uses_device_default_and_sizes_render_target() {
    let mut f = Fixture::synthetic();
    let handle = f.controller.start().await.unwrap();

    assert_eq!(handle.facing, FacingMode::Back);
    assert_eq!(f.controller.facing(), FacingMode::Back);
    assert_eq!(f.session.render_size(), Some(RenderSize::new(390, 844)));
    assert!(f.session.is_playing());
    assert_eq!(f.devices.live_handles(), vec![handle]);
}

#[tokio::test]
async fn record_stop_and_save() {
    let mut f = Fixture::synthetic();
    f.controller.start().await.unwrap();

    f.record_for(Duration::from_millis(40)).await;
    assert_eq!(f.controller.recording_state(), RecordingState::Recording);

    assert!(f.controller.toggle_recording());
    assert_eq!(f.controller.recording_state(), RecordingState::Finalizing);

    let artifact = f.controller.await_finalized().await.unwrap().clone();
    assert_eq!(f.controller.recording_state(), RecordingState::Previewing);
    assert!(!artifact.is_empty());
    assert_eq!(artifact.len() % CHUNK, 0);
    assert_eq!(
        &artifact.bytes()[..CHUNK],
        SyntheticRecorder::chunk_payload(0, CHUNK).as_slice()
    );

    let dir = std::env::temp_dir().join(format!("lenscap-session-flow-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = f.controller.save_artifact(&dir).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), artifact.bytes());
    std::fs::remove_dir_all(&dir).unwrap();

    let events = f.drain_events();
    assert_eq!(events.first(), Some(&SessionEvent::RecordingStarted));
    assert!(matches!(events.last(), Some(SessionEvent::ArtifactReady(_))));
}

#[tokio::test]
async fn duration_limit_finalizes_recording() {
    let mut f = Fixture::synthetic();
    f.controller.start().await.unwrap();
    f.record_for(Duration::from_millis(10)).await;

    f.clock.advance(Duration::from_secs(5));
    assert!((f.controller.tick() - 0.5).abs() < 1e-9);

    f.clock.advance(Duration::from_secs(5));
    assert_eq!(f.controller.tick(), 1.0);
    assert_eq!(f.controller.recording_state(), RecordingState::Finalizing);

    assert!(f.controller.await_finalized().await.is_some());
    assert_eq!(f.controller.recording_state(), RecordingState::Previewing);
    assert_eq!(f.controller.tick(), 1.0);
}

#[tokio::test]
async fn toggle_while_finalizing_is_ignored() {
    let mut f = Fixture::synthetic();
    f.controller.start().await.unwrap();
    f.record_for(Duration::from_millis(10)).await;

    assert!(f.controller.toggle_recording());
    assert!(!f.controller.toggle_recording());
    assert_eq!(f.controller.recording_state(), RecordingState::Finalizing);
    assert!(f.controller.await_finalized().await.is_some());
}

#[tokio::test]
async fn switching_camera_mid_recording_keeps_recording() {
    let mut f = Fixture::synthetic();
    f.controller.start().await.unwrap();
    f.record_for(Duration::from_millis(10)).await;

    let front = f.controller.switch_camera().await.unwrap();
    assert_eq!(front.facing, FacingMode::Front);
    assert_eq!(f.controller.recording_state(), RecordingState::Recording);
    assert_eq!(f.devices.live_handles(), vec![front]);
    assert_eq!(f.session.render_size(), Some(RenderSize::new(390, 844)));

    assert!(f.controller.toggle_recording());
    assert!(f.controller.await_finalized().await.is_some());

    let events = f.drain_events();
    assert!(events.contains(&SessionEvent::SwitchStarted));
    assert!(events.contains(&SessionEvent::SwitchCompleted(FacingMode::Front)));
}

#[tokio::test]
async fn failed_switch_keeps_previous_camera() {
    let mut f = Fixture::synthetic();
    let back = f.controller.start().await.unwrap();
    f.devices.fail_facing(FacingMode::Front);

    let err = f.controller.switch_camera().await.unwrap_err();
    assert!(matches!(err, LenscapError::MediaAccess { .. }));
    assert_eq!(f.controller.facing(), FacingMode::Back);
    assert_eq!(f.controller.camera().active_handle(), Some(back));
    assert!(f.session.is_playing());
    assert!(!f.controller.camera().is_switching());
}

#[tokio::test]
async fn recorder_error_returns_to_idle_without_artifact() {
    let mut f = Fixture::new(SyntheticRecorder::new(Duration::from_millis(5), CHUNK).failing_after(1));
    f.controller.start().await.unwrap();
    assert!(f.controller.toggle_recording());

    while f.controller.recording_state() == RecordingState::Recording {
        assert!(f.controller.next_signal().await);
    }

    assert_eq!(f.controller.recording_state(), RecordingState::Idle);
    assert!(f.controller.artifact().is_none());
    let failures = f
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, SessionEvent::RecordingFailed { .. }))
        .count();
    assert_eq!(failures, 1);

    assert!(matches!(
        f.controller.save_artifact(&std::env::temp_dir()),
        Err(LenscapError::NoArtifact)
    ));
}

#[tokio::test]
async fn back_discards_preview_and_reapplies_render_size() {
    let mut f = Fixture::synthetic();
    f.controller.start().await.unwrap();
    f.record_for(Duration::from_millis(10)).await;
    f.controller.toggle_recording();
    f.controller.await_finalized().await.unwrap();

    assert!(f.controller.back().await.unwrap());
    assert_eq!(f.controller.recording_state(), RecordingState::Idle);
    assert!(f.controller.artifact().is_none());
    assert_eq!(f.controller.tick(), 0.0);
    assert_eq!(f.session.render_size(), Some(f.controller.render_size()));

    assert!(!f.controller.back().await.unwrap());
}

#[tokio::test]
async fn resize_forwards_new_render_size() {
    let mut f = Fixture::synthetic();
    f.controller.start().await.unwrap();

    let size = f.controller.resize(844, 390).await.unwrap();
    assert_eq!(size, RenderSize::new(844, 390));
    assert_eq!(f.session.render_size(), Some(size));
    assert_eq!(f.controller.status().render_size, size);
}

#[tokio::test]
async fn shutdown_releases_camera() {
    let mut f = Fixture::synthetic();
    f.controller.start().await.unwrap();
    f.record_for(Duration::from_millis(10)).await;

    f.controller.shutdown().await;
    assert!(f.devices.live_handles().is_empty());
    assert!(!f.session.is_playing());
    assert_eq!(f.controller.recording_state(), RecordingState::Finalizing);
    assert!(!f.controller.status().camera_active);
}

#[tokio::test]
async fn share_reports_shared_cancelled_and_unsupported() {
    let mut f = Fixture::synthetic();
    f.controller.start().await.unwrap();

    let target = SyntheticShareTarget::new();
    assert!(matches!(
        f.controller.share_artifact(&target).await,
        Err(LenscapError::NoArtifact)
    ));

    f.record_for(Duration::from_millis(10)).await;
    f.controller.toggle_recording();
    f.controller.await_finalized().await.unwrap();

    assert_eq!(
        f.controller.share_artifact(&target).await.unwrap(),
        ShareOutcome::Shared
    );
    assert_eq!(target.shared(), vec!["lenscap-recording.webm".to_string()]);

    let cancelling = SyntheticShareTarget::new().cancelling();
    assert_eq!(
        f.controller.share_artifact(&cancelling).await.unwrap(),
        ShareOutcome::Cancelled
    );

    let mp4_only = SyntheticShareTarget::new().supporting("video/mp4");
    assert_eq!(
        f.controller.share_artifact(&mp4_only).await.unwrap(),
        ShareOutcome::Unsupported
    );
    assert!(mp4_only.shared().is_empty());
    assert_eq!(f.controller.recording_state(), RecordingState::Previewing);
}

#[tokio::test]
async fn share_failure_is_an_error_and_keeps_preview() {
    let mut f = Fixture::synthetic();
    f.controller.start().await.unwrap();
    f.record_for(Duration::from_millis(10)).await;
    f.controller.toggle_recording();
    f.controller.await_finalized().await.unwrap();

    let target = SyntheticShareTarget::new().failing("NotAllowedError");
    let err = f.controller.share_artifact(&target).await.unwrap_err();
    assert!(matches!(err, LenscapError::ShareFailed { .. }));
    assert!(f.controller.artifact().is_some());
}

#[tokio::test]
async fn status_reports_recording_start_time() {
    let mut f = Fixture::synthetic();
    f.controller.start().await.unwrap();
    assert_eq!(f.controller.status().recording_started_at, None);

    f.record_for(Duration::from_millis(5)).await;
    let started = f.controller.status().recording_started_at.unwrap();
    assert!(started.contains('T'));
    f.controller.shutdown().await;
}
