//! Camera source control: acquisition, facing switches, render sizing.
//!
//! The controller exclusively owns the active media input. Its methods
//! take `&self` so UI events can interleave while an acquisition is
//! pending; the switch guard rejects overlapping switches instead of
//! queueing them. State locks are never held across an await.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use lenscap_common::config::{CameraPolicy, SwitchStrategy};
use lenscap_common::error::{LenscapError, LenscapResult};
use lenscap_media_model::{
    CameraPresets, ConstraintSet, DeviceClass, FacingMode, MediaSource, RenderSize, SourceHandle,
    SourceTransform,
};

use crate::backend::{ArSession, MediaDevices};
use crate::events::{EventSink, SessionEvent};

#[derive(Debug)]
struct SourceState {
    facing: FacingMode,
    active: Option<SourceHandle>,
    render_size: Option<RenderSize>,
}

/// Clears the switching flag however the switch ends.
struct SwitchGuard<'a>(&'a AtomicBool);

impl Drop for SwitchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct CameraSource {
    devices: Arc<dyn MediaDevices>,
    session: Arc<dyn ArSession>,
    presets: CameraPresets,
    policy: CameraPolicy,
    device_class: DeviceClass,
    events: EventSink,
    state: Mutex<SourceState>,
    switching: AtomicBool,
}

impl CameraSource {
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        session: Arc<dyn ArSession>,
        presets: CameraPresets,
        policy: CameraPolicy,
        device_class: DeviceClass,
        events: EventSink,
    ) -> Self {
        let facing = policy
            .default_facing
            .unwrap_or_else(|| device_class.default_facing());
        Self {
            devices,
            session,
            presets,
            policy,
            device_class,
            events,
            state: Mutex::new(SourceState {
                facing,
                active: None,
                render_size: None,
            }),
            switching: AtomicBool::new(false),
        }
    }

    /// Facing mode configured for startup.
    pub fn default_facing(&self) -> FacingMode {
        self.policy
            .default_facing
            .unwrap_or_else(|| self.device_class.default_facing())
    }

    pub fn facing(&self) -> FacingMode {
        self.lock().facing
    }

    pub fn is_switching(&self) -> bool {
        self.switching.load(Ordering::SeqCst)
    }

    pub fn active_handle(&self) -> Option<SourceHandle> {
        self.lock().active.clone()
    }

    pub fn render_size(&self) -> Option<RenderSize> {
        self.lock().render_size
    }

    pub fn policy(&self) -> &CameraPolicy {
        &self.policy
    }

    /// Constraints of the camera currently feeding the session.
    pub fn current_constraints(&self) -> ConstraintSet {
        self.constraints_for(self.facing())
    }

    /// Acquire the first camera and start the AR session on it.
    pub async fn initialize(&self, facing: FacingMode) -> LenscapResult<SourceHandle> {
        let constraints = self.constraints_for(facing);
        tracing::info!(
            %facing,
            width = constraints.ideal_width,
            height = constraints.ideal_height,
            audio = constraints.audio,
            "Acquiring camera"
        );

        let handle = self.devices.acquire(&constraints).await?;
        if let Err(e) = self.attach(&handle).await {
            self.devices.release(&handle);
            return Err(e);
        }

        let previous = {
            let mut state = self.lock();
            state.facing = facing;
            state.active.replace(handle.clone())
        };
        if let Some(previous) = previous {
            self.devices.release(&previous);
        }

        tracing::info!(id = handle.id, label = %handle.label, "Camera ready");
        Ok(handle)
    }

    /// Swap to the opposite camera without tearing down the AR session.
    ///
    /// Rejected with `AlreadySwitching` while another switch is running.
    /// The switching flag is cleared on every exit path.
    pub async fn switch_facing(&self) -> LenscapResult<SourceHandle> {
        if !self.policy.switch_enabled {
            return Err(LenscapError::SwitchDisabled);
        }
        if self.switching.swap(true, Ordering::SeqCst) {
            tracing::debug!("Rejecting overlapping camera switch");
            return Err(LenscapError::AlreadySwitching);
        }
        let _guard = SwitchGuard(&self.switching);

        self.events.emit(SessionEvent::SwitchStarted);
        let result = self.run_switch().await;
        match &result {
            Ok(handle) => {
                tracing::info!(facing = %handle.facing, id = handle.id, "Camera switched");
                self.events
                    .emit(SessionEvent::SwitchCompleted(handle.facing));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Camera switch failed");
                self.events.emit(SessionEvent::SwitchFailed {
                    reason: e.to_string(),
                });
            }
        }
        result
    }

    /// Resize the session's render output.
    pub async fn set_render_size(&self, size: RenderSize) -> LenscapResult<()> {
        self.session.set_render_size(size).await?;
        self.lock().render_size = Some(size);
        tracing::debug!(width = size.width, height = size.height, "Render size applied");
        Ok(())
    }

    /// Release the active camera and pause the session.
    pub async fn shutdown(&self) {
        let active = self.lock().active.take();
        if let Some(handle) = active {
            if let Err(e) = self.session.pause().await {
                tracing::warn!(error = %e, "Failed to pause session on shutdown");
            }
            self.devices.release(&handle);
            tracing::info!(id = handle.id, "Camera released");
        }
    }

    async fn run_switch(&self) -> LenscapResult<SourceHandle> {
        let (old_handle, old_facing) = {
            let state = self.lock();
            match state.active.clone() {
                Some(handle) => (handle, state.facing),
                None => return Err(LenscapError::media_access("Camera is not initialized")),
            }
        };
        let target = old_facing.opposite();
        let constraints = self.constraints_for(target);

        self.session.pause().await?;

        match self.policy.switch_strategy {
            SwitchStrategy::AcquireBeforeRelease => {
                let new_handle = match self.devices.acquire(&constraints).await {
                    Ok(handle) => handle,
                    Err(e) => {
                        self.resume_quietly().await;
                        return Err(e);
                    }
                };
                if let Err(e) = self.attach(&new_handle).await {
                    self.devices.release(&new_handle);
                    if let Err(restore) = self.attach(&old_handle).await {
                        tracing::warn!(error = %restore, "Failed to restore previous camera");
                        self.devices.release(&old_handle);
                        self.lock().active = None;
                        return Err(LenscapError::switch_failed_no_fallback(format!(
                            "{e}; previous camera rejected: {restore}"
                        )));
                    }
                    return Err(e);
                }
                self.devices.release(&old_handle);
                self.commit(target, new_handle.clone());
                Ok(new_handle)
            }
            SwitchStrategy::ReleaseBeforeAcquire => {
                self.devices.release(&old_handle);
                self.lock().active = None;

                let acquired = match self.devices.acquire(&constraints).await {
                    Ok(handle) => match self.attach(&handle).await {
                        Ok(()) => Ok(handle),
                        Err(e) => {
                            self.devices.release(&handle);
                            Err(e)
                        }
                    },
                    Err(e) => Err(e),
                };

                match acquired {
                    Ok(new_handle) => {
                        self.commit(target, new_handle.clone());
                        Ok(new_handle)
                    }
                    Err(e) => self.restore_after_failed_switch(old_facing, e).await,
                }
            }
        }
    }

    /// Reacquire the previous facing once after its tracks were stopped.
    ///
    /// On success the switch error is still returned, with the old
    /// camera back in place. If that fails too the session stays paused
    /// with no source.
    async fn restore_after_failed_switch(
        &self,
        old_facing: FacingMode,
        switch_error: LenscapError,
    ) -> LenscapResult<SourceHandle> {
        tracing::warn!(error = %switch_error, facing = %old_facing, "Reacquiring previous camera");

        let constraints = self.constraints_for(old_facing);
        let restored = match self.devices.acquire(&constraints).await {
            Ok(handle) => handle,
            Err(e) => {
                return Err(LenscapError::switch_failed_no_fallback(format!(
                    "{switch_error}; reacquire failed: {e}"
                )))
            }
        };

        if let Err(e) = self.attach(&restored).await {
            self.devices.release(&restored);
            return Err(LenscapError::switch_failed_no_fallback(format!(
                "{switch_error}; restored camera rejected: {e}"
            )));
        }

        self.commit(old_facing, restored);
        Err(switch_error)
    }

    /// Hand `handle` to the session with the facing's transform and play.
    async fn attach(&self, handle: &SourceHandle) -> LenscapResult<()> {
        let transform = SourceTransform::for_facing(handle.facing, self.policy.mirror_front);
        self.session
            .set_source(MediaSource {
                handle: handle.clone(),
                transform,
            })
            .await?;

        let render_size = self.lock().render_size;
        if let Some(size) = render_size {
            self.session.set_render_size(size).await?;
        }

        self.session.play().await
    }

    async fn resume_quietly(&self) {
        if let Err(e) = self.session.play().await {
            tracing::warn!(error = %e, "Failed to resume session on previous camera");
        }
    }

    fn commit(&self, facing: FacingMode, handle: SourceHandle) {
        let mut state = self.lock();
        state.facing = facing;
        state.active = Some(handle);
    }

    fn constraints_for(&self, facing: FacingMode) -> ConstraintSet {
        self.presets.resolve(facing, self.device_class)
    }

    fn lock(&self) -> MutexGuard<'_, SourceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        let active = self
            .state
            .get_mut()
            .map(|state| state.active.take())
            .unwrap_or_else(|e| e.into_inner().active.take());
        if let Some(handle) = active {
            self.devices.release(&handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SessionCall, SyntheticArSession, SyntheticDevices};
    use std::time::Duration;

    fn camera_with(
        devices: Arc<SyntheticDevices>,
        session: Arc<SyntheticArSession>,
        policy: CameraPolicy,
    ) -> (CameraSource, tokio::sync::mpsc::UnboundedReceiver<SessionEvent>) {
        let (sink, rx) = EventSink::channel();
        let camera = CameraSource::new(
            devices,
            session,
            CameraPresets::default(),
            policy,
            DeviceClass::Mobile,
            sink,
        );
        (camera, rx)
    }

    #[tokio::test]
    async fn initialize_attaches_source_and_plays() {
        let devices = Arc::new(SyntheticDevices::new());
        let session = Arc::new(SyntheticArSession::new());
        let (camera, _rx) = camera_with(devices.clone(), session.clone(), CameraPolicy::default());

        assert_eq!(camera.default_facing(), FacingMode::Back);
        let handle = camera.initialize(FacingMode::Back).await.unwrap();

        assert_eq!(camera.active_handle(), Some(handle.clone()));
        assert_eq!(devices.live_handles(), vec![handle]);
        assert!(session.is_playing());
        assert_eq!(
            session.current_source().unwrap().transform,
            SourceTransform::Identity
        );
    }

    #[tokio::test]
    async fn switch_to_front_mirrors_and_releases_old_camera() {
        let devices = Arc::new(SyntheticDevices::new());
        let session = Arc::new(SyntheticArSession::new());
        let (camera, mut rx) =
            camera_with(devices.clone(), session.clone(), CameraPolicy::default());
        let back = camera.initialize(FacingMode::Back).await.unwrap();

        let front = camera.switch_facing().await.unwrap();

        assert_eq!(camera.facing(), FacingMode::Front);
        assert_eq!(front.facing, FacingMode::Front);
        assert!(!devices.is_live(&back));
        assert_eq!(devices.live_handles(), vec![front.clone()]);
        assert_eq!(
            session.current_source().unwrap().transform,
            SourceTransform::MirrorX
        );
        assert!(session.is_playing());
        assert!(!camera.is_switching());
        assert_eq!(
            &session.calls()[..],
            &[
                SessionCall::SetSource(MediaSource {
                    handle: back.clone(),
                    transform: SourceTransform::Identity,
                }),
                SessionCall::Play,
                SessionCall::Pause,
                SessionCall::SetSource(MediaSource {
                    handle: front.clone(),
                    transform: SourceTransform::MirrorX,
                }),
                SessionCall::Play,
            ]
        );

        assert_eq!(rx.try_recv().unwrap(), SessionEvent::SwitchStarted);
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::SwitchCompleted(FacingMode::Front)
        );
    }

    #[tokio::test]
    async fn overlapping_switch_is_rejected() {
        let devices = Arc::new(SyntheticDevices::with_delay(Duration::from_millis(20)));
        let session = Arc::new(SyntheticArSession::new());
        let (camera, _rx) = camera_with(devices.clone(), session, CameraPolicy::default());
        let back = camera.initialize(FacingMode::Back).await.unwrap();

        let (first, second) = tokio::join!(camera.switch_facing(), async {
            tokio::task::yield_now().await;
            let during = camera.active_handle();
            (camera.switch_facing().await, during)
        });

        let (second, handle_during) = second;
        assert!(first.is_ok());
        assert!(matches!(second, Err(LenscapError::AlreadySwitching)));
        assert_eq!(handle_during, Some(back));
        assert_eq!(camera.facing(), FacingMode::Front);
        assert!(!camera.is_switching());
    }

    #[tokio::test]
    async fn failed_acquire_keeps_previous_camera_running() {
        let devices = Arc::new(SyntheticDevices::new());
        let session = Arc::new(SyntheticArSession::new());
        let (camera, mut rx) =
            camera_with(devices.clone(), session.clone(), CameraPolicy::default());
        let back = camera.initialize(FacingMode::Back).await.unwrap();
        devices.fail_facing(FacingMode::Front);

        let err = camera.switch_facing().await.unwrap_err();

        assert!(matches!(err, LenscapError::MediaAccess { .. }));
        assert_eq!(camera.facing(), FacingMode::Back);
        assert_eq!(camera.active_handle(), Some(back.clone()));
        assert!(devices.is_live(&back));
        assert!(session.is_playing());
        assert!(!camera.is_switching());

        assert_eq!(rx.try_recv().unwrap(), SessionEvent::SwitchStarted);
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::SwitchFailed { .. }
        ));
    }

    #[tokio::test]
    async fn release_first_restores_old_facing_on_failure() {
        let devices = Arc::new(SyntheticDevices::new());
        let session = Arc::new(SyntheticArSession::new());
        let policy = CameraPolicy {
            switch_strategy: SwitchStrategy::ReleaseBeforeAcquire,
            ..CameraPolicy::default()
        };
        let (camera, _rx) = camera_with(devices.clone(), session.clone(), policy);
        let back = camera.initialize(FacingMode::Back).await.unwrap();
        devices.fail_facing(FacingMode::Front);

        let err = camera.switch_facing().await.unwrap_err();

        assert!(matches!(err, LenscapError::MediaAccess { .. }));
        assert!(!devices.is_live(&back));
        let restored = camera.active_handle().unwrap();
        assert_ne!(restored, back);
        assert_eq!(restored.facing, FacingMode::Back);
        assert_eq!(camera.facing(), FacingMode::Back);
        assert!(session.is_playing());
    }

    #[tokio::test]
    async fn release_first_without_fallback_is_fatal() {
        let devices = Arc::new(SyntheticDevices::new());
        let session = Arc::new(SyntheticArSession::new());
        let policy = CameraPolicy {
            switch_strategy: SwitchStrategy::ReleaseBeforeAcquire,
            ..CameraPolicy::default()
        };
        let (camera, _rx) = camera_with(devices.clone(), session.clone(), policy);
        camera.initialize(FacingMode::Back).await.unwrap();
        devices.fail_facing(FacingMode::Front);
        devices.fail_facing(FacingMode::Back);

        let err = camera.switch_facing().await.unwrap_err();

        assert!(matches!(err, LenscapError::SwitchFailedNoFallback { .. }));
        assert!(err.is_fatal());
        assert_eq!(camera.active_handle(), None);
        assert!(devices.live_handles().is_empty());
        assert!(!session.is_playing());
        assert!(!camera.is_switching());
    }

    #[tokio::test]
    async fn disabled_switch_has_no_side_effects() {
        let devices = Arc::new(SyntheticDevices::new());
        let session = Arc::new(SyntheticArSession::new());
        let policy = CameraPolicy {
            switch_enabled: false,
            ..CameraPolicy::default()
        };
        let (camera, mut rx) = camera_with(devices, session.clone(), policy);
        let back = camera.initialize(FacingMode::Back).await.unwrap();
        let calls_before = session.calls().len();

        assert!(matches!(
            camera.switch_facing().await,
            Err(LenscapError::SwitchDisabled)
        ));
        assert_eq!(camera.active_handle(), Some(back));
        assert_eq!(session.calls().len(), calls_before);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn render_size_is_reapplied_after_switch() {
        let devices = Arc::new(SyntheticDevices::new());
        let session = Arc::new(SyntheticArSession::new());
        let (camera, _rx) = camera_with(devices, session.clone(), CameraPolicy::default());
        camera.initialize(FacingMode::Back).await.unwrap();
        camera
            .set_render_size(RenderSize::new(720, 1280))
            .await
            .unwrap();

        camera.switch_facing().await.unwrap();

        let sizes: Vec<_> = session
            .calls()
            .into_iter()
            .filter(|c| matches!(c, SessionCall::SetRenderSize(_)))
            .collect();
        assert_eq!(sizes.len(), 2);
        assert_eq!(session.render_size(), Some(RenderSize::new(720, 1280)));
    }

    #[tokio::test]
    async fn rejected_new_source_restores_previous_camera() {
        let devices = Arc::new(SyntheticDevices::new());
        let session = Arc::new(SyntheticArSession::new());
        let (camera, _rx) = camera_with(devices.clone(), session.clone(), CameraPolicy::default());
        let back = camera.initialize(FacingMode::Back).await.unwrap();
        session.reject_source(FacingMode::Front);

        let err = camera.switch_facing().await.unwrap_err();

        assert!(matches!(err, LenscapError::Session { .. }));
        assert!(!err.is_fatal());
        assert_eq!(camera.active_handle(), Some(back.clone()));
        assert_eq!(devices.live_handles(), vec![back.clone()]);
        assert_eq!(session.current_source().unwrap().handle, back);
        assert!(session.is_playing());
        assert_eq!(camera.facing(), FacingMode::Back);
    }

    #[tokio::test]
    async fn rejected_new_and_previous_source_is_fatal() {
        let devices = Arc::new(SyntheticDevices::new());
        let session = Arc::new(SyntheticArSession::new());
        let (camera, mut rx) =
            camera_with(devices.clone(), session.clone(), CameraPolicy::default());
        camera.initialize(FacingMode::Back).await.unwrap();
        session.reject_source(FacingMode::Front);
        session.reject_source(FacingMode::Back);

        let err = camera.switch_facing().await.unwrap_err();

        assert!(matches!(err, LenscapError::SwitchFailedNoFallback { .. }));
        assert!(err.is_fatal());
        assert_eq!(camera.active_handle(), None);
        assert!(devices.live_handles().is_empty());
        assert!(!session.is_playing());
        assert!(!camera.is_switching());

        assert_eq!(rx.try_recv().unwrap(), SessionEvent::SwitchStarted);
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::SwitchFailed { .. }
        ));
    }

    #[tokio::test]
    async fn release_first_with_rejected_reacquire_is_fatal() {
        let devices = Arc::new(SyntheticDevices::new());
        let session = Arc::new(SyntheticArSession::new());
        let policy = CameraPolicy {
            switch_strategy: SwitchStrategy::ReleaseBeforeAcquire,
            ..CameraPolicy::default()
        };
        let (camera, _rx) = camera_with(devices.clone(), session.clone(), policy);
        camera.initialize(FacingMode::Back).await.unwrap();
        session.reject_source(FacingMode::Front);
        session.reject_source(FacingMode::Back);

        let err = camera.switch_facing().await.unwrap_err();

        assert!(matches!(err, LenscapError::SwitchFailedNoFallback { .. }));
        assert_eq!(camera.active_handle(), None);
        assert!(devices.live_handles().is_empty());
        assert!(!session.is_playing());
    }

    #[tokio::test]
    async fn shutdown_releases_camera() {
        let devices = Arc::new(SyntheticDevices::new());
        let session = Arc::new(SyntheticArSession::new());
        let (camera, _rx) = camera_with(devices.clone(), session.clone(), CameraPolicy::default());
        camera.initialize(FacingMode::Back).await.unwrap();

        camera.shutdown().await;

        assert!(devices.live_handles().is_empty());
        assert!(camera.active_handle().is_none());
        assert!(!session.is_playing());
    }
}
