//! Lenscap Capture Engine
//!
//! Drives an AR capture screen: picks and swaps the physical camera feeding
//! the AR session, and records the composited render target into a single
//! media artifact.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                CaptureController                  │
//! │  ┌────────────────┐      ┌─────────────────────┐  │
//! │  │  CameraSource  │      │ RecordingLifecycle  │  │
//! │  │ acquire/switch │      │ chunks → artifact   │  │
//! │  └───────┬────────┘      └──────────┬──────────┘  │
//! │          │                          ▲ signals     │
//! │          ▼                          │             │
//! │  ┌──────────────┐ ┌───────────┐ ┌───┴──────────┐  │
//! │  │ MediaDevices │ │ ArSession │ │NativeRecorder│  │
//! │  └──────────────┘ └───────────┘ └──────────────┘  │
//! │                 EventSink ──▶ UI                   │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod camera;
pub mod events;
pub mod recording;
pub mod session;

pub use camera::CameraSource;
pub use events::{EventSink, SessionEvent};
pub use recording::{RecordingLifecycle, RecordingSettings, RecordingState};
pub use session::*;
