//! In-process backend: fake cameras, a call-recording AR session, and a
//! recorder that produces generated chunks on a timer.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use lenscap_common::error::{LenscapError, LenscapResult};
use lenscap_media_model::{
    Artifact, Chunk, ConstraintSet, FacingMode, MediaSource, RenderSize, RenderTarget,
    SourceHandle,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::{ArSession, MediaDevices, NativeRecorder, ShareOutcome, ShareTarget, SignalSender};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Simulated camera hardware.
#[derive(Debug)]
pub struct SyntheticDevices {
    acquire_delay: Duration,
    max_open: Option<usize>,
    next_id: AtomicU64,
    failing: Mutex<HashSet<FacingMode>>,
    live: Mutex<Vec<SourceHandle>>,
}

impl SyntheticDevices {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Devices whose acquisition takes `delay`.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            acquire_delay: delay,
            max_open: None,
            next_id: AtomicU64::new(1),
            failing: Mutex::new(HashSet::new()),
            live: Mutex::new(Vec::new()),
        }
    }

    /// Refuse to open more than `max` cameras at once, like phones that
    /// cannot run both cameras together.
    pub fn with_max_open(mut self, max: usize) -> Self {
        self.max_open = Some(max);
        self
    }

    /// Make every acquisition for `facing` fail with a permission error.
    pub fn fail_facing(&self, facing: FacingMode) {
        lock(&self.failing).insert(facing);
    }

    pub fn restore_facing(&self, facing: FacingMode) {
        lock(&self.failing).remove(&facing);
    }

    /// Handles acquired and not yet released, in acquisition order.
    pub fn live_handles(&self) -> Vec<SourceHandle> {
        lock(&self.live).clone()
    }

    pub fn is_live(&self, handle: &SourceHandle) -> bool {
        lock(&self.live).contains(handle)
    }
}

impl Default for SyntheticDevices {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MediaDevices for SyntheticDevices {
    async fn acquire(&self, constraints: &ConstraintSet) -> LenscapResult<SourceHandle> {
        if self.acquire_delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.acquire_delay).await;
        }

        if lock(&self.failing).contains(&constraints.facing) {
            return Err(LenscapError::media_access(format!(
                "NotAllowedError: {} camera unavailable",
                constraints.facing
            )));
        }

        let mut live = lock(&self.live);
        if self.max_open.is_some_and(|max| live.len() >= max) {
            return Err(LenscapError::media_access(
                "NotReadableError: camera already in use",
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let handle = SourceHandle {
            id,
            facing: constraints.facing,
            label: format!(
                "synthetic-{}-{}x{}",
                constraints.facing, constraints.ideal_width, constraints.ideal_height
            ),
        };
        live.push(handle.clone());
        tracing::debug!(id, facing = %constraints.facing, "Synthetic camera opened");
        Ok(handle)
    }

    fn release(&self, handle: &SourceHandle) {
        lock(&self.live).retain(|h| h != handle);
    }
}

/// A call made on [`SyntheticArSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    SetSource(MediaSource),
    SetRenderSize(RenderSize),
    Play,
    Pause,
}

/// AR session stand-in that records every call.
#[derive(Debug, Default)]
pub struct SyntheticArSession {
    calls: Mutex<Vec<SessionCall>>,
    rejected: Mutex<HashSet<FacingMode>>,
}

impl SyntheticArSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `set_source` fail for sources of `facing`.
    pub fn reject_source(&self, facing: FacingMode) {
        lock(&self.rejected).insert(facing);
    }

    pub fn calls(&self) -> Vec<SessionCall> {
        lock(&self.calls).clone()
    }

    pub fn current_source(&self) -> Option<MediaSource> {
        lock(&self.calls).iter().rev().find_map(|call| match call {
            SessionCall::SetSource(source) => Some(source.clone()),
            _ => None,
        })
    }

    pub fn render_size(&self) -> Option<RenderSize> {
        lock(&self.calls).iter().rev().find_map(|call| match call {
            SessionCall::SetRenderSize(size) => Some(*size),
            _ => None,
        })
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.calls)
            .iter()
            .rev()
            .find_map(|call| match call {
                SessionCall::Play => Some(true),
                SessionCall::Pause => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }
}

#[async_trait::async_trait]
impl ArSession for SyntheticArSession {
    async fn set_source(&self, source: MediaSource) -> LenscapResult<()> {
        if lock(&self.rejected).contains(&source.handle.facing) {
            return Err(LenscapError::session(format!(
                "{} source rejected",
                source.handle.facing
            )));
        }
        lock(&self.calls).push(SessionCall::SetSource(source));
        Ok(())
    }

    async fn set_render_size(&self, size: RenderSize) -> LenscapResult<()> {
        lock(&self.calls).push(SessionCall::SetRenderSize(size));
        Ok(())
    }

    async fn play(&self) -> LenscapResult<()> {
        lock(&self.calls).push(SessionCall::Play);
        Ok(())
    }

    async fn pause(&self) -> LenscapResult<()> {
        lock(&self.calls).push(SessionCall::Pause);
        Ok(())
    }
}

/// Recorder producing one chunk per interval until asked to stop.
///
/// On stop it flushes a final chunk, then acknowledges. With
/// `fail_after` set it reports an error after that many chunks instead.
#[derive(Debug)]
pub struct SyntheticRecorder {
    chunk_interval: Duration,
    chunk_size: usize,
    fail_after: Option<usize>,
    running: Option<RunningRecorder>,
}

#[derive(Debug)]
struct RunningRecorder {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SyntheticRecorder {
    pub fn new(chunk_interval: Duration, chunk_size: usize) -> Self {
        Self {
            chunk_interval,
            chunk_size: chunk_size.max(1),
            fail_after: None,
            running: None,
        }
    }

    pub fn failing_after(mut self, chunks: usize) -> Self {
        self.fail_after = Some(chunks);
        self
    }

    /// Deterministic payload for chunk number `seq`.
    pub fn chunk_payload(seq: u64, size: usize) -> Vec<u8> {
        (0..size)
            .map(|i| (seq as usize).wrapping_add(i) as u8)
            .collect()
    }
}

impl Default for SyntheticRecorder {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), 1024)
    }
}

impl NativeRecorder for SyntheticRecorder {
    fn start(
        &mut self,
        target: RenderTarget,
        constraints: &ConstraintSet,
        signals: SignalSender,
    ) -> LenscapResult<()> {
        if let Some(previous) = self.running.take() {
            previous.task.abort();
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| LenscapError::recording_failed(format!("No async runtime: {e}")))?;

        let (stop_tx, mut stop_rx) = oneshot::channel();
        let interval = self.chunk_interval;
        let size = self.chunk_size;
        let fail_after = self.fail_after;
        tracing::debug!(
            width = target.size.width,
            height = target.size.height,
            fps = target.fps,
            audio = constraints.audio,
            "Synthetic recorder starting"
        );

        let task = runtime.spawn(async move {
            signals.started();
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            let mut seq: u64 = 0;

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        if fail_after.is_some_and(|n| seq as usize >= n) {
                            signals.error("synthetic encoder failure");
                            return;
                        }
                        if !signals.chunk(Chunk::new(SyntheticRecorder::chunk_payload(seq, size))) {
                            return;
                        }
                        seq += 1;
                    }
                }
            }

            signals.chunk(Chunk::new(SyntheticRecorder::chunk_payload(seq, size)));
            signals.stopped();
        });

        self.running = Some(RunningRecorder { stop_tx, task });
        Ok(())
    }

    fn request_stop(&mut self) -> LenscapResult<()> {
        match self.running.take() {
            Some(running) => {
                running
                    .stop_tx
                    .send(())
                    .map_err(|_| LenscapError::recording_failed("Recorder task already exited"))?;
                Ok(())
            }
            None => Err(LenscapError::recording_failed("Recorder is not running")),
        }
    }
}

impl Drop for SyntheticRecorder {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.task.abort();
        }
    }
}

#[derive(Debug, Clone)]
enum ShareResponse {
    Accept,
    Cancel,
    Fail(String),
}

/// Share sheet stand-in that remembers what it was offered.
#[derive(Debug)]
pub struct SyntheticShareTarget {
    supported_mime: Option<String>,
    response: ShareResponse,
    shared: Mutex<Vec<String>>,
}

impl SyntheticShareTarget {
    /// A share sheet that accepts every artifact.
    pub fn new() -> Self {
        Self {
            supported_mime: None,
            response: ShareResponse::Accept,
            shared: Mutex::new(Vec::new()),
        }
    }

    /// Only artifacts of `mime_type` can be shared.
    pub fn supporting(mut self, mime_type: impl Into<String>) -> Self {
        self.supported_mime = Some(mime_type.into());
        self
    }

    /// The user dismisses the sheet.
    pub fn cancelling(mut self) -> Self {
        self.response = ShareResponse::Cancel;
        self
    }

    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.response = ShareResponse::Fail(reason.into());
        self
    }

    /// File names of artifacts that were shared.
    pub fn shared(&self) -> Vec<String> {
        lock(&self.shared).clone()
    }
}

impl Default for SyntheticShareTarget {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ShareTarget for SyntheticShareTarget {
    fn can_share(&self, artifact: &Artifact) -> bool {
        self.supported_mime
            .as_deref()
            .map_or(true, |mime| mime == artifact.mime_type())
    }

    async fn share(&self, artifact: &Artifact) -> LenscapResult<ShareOutcome> {
        tokio::task::yield_now().await;
        match &self.response {
            ShareResponse::Accept => {
                lock(&self.shared).push(artifact.file_name().to_string());
                Ok(ShareOutcome::Shared)
            }
            ShareResponse::Cancel => Ok(ShareOutcome::Cancelled),
            ShareResponse::Fail(reason) => Err(LenscapError::share_failed(reason.clone())),
        }
    }
}
