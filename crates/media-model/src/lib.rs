//! Lenscap Media Model
//!
//! Plain data shared by the capture engine, configuration and CLI:
//! - Camera facing modes, constraint presets and source transforms
//! - Render sizing for the live render target
//! - Recorded chunks and the finalized artifact
//!
//! Nothing in this crate talks to a device or a session.

pub mod artifact;
pub mod camera;
pub mod render;

pub use artifact::{Artifact, Chunk, ChunkBuffer, OutputFormat};
pub use camera::{
    CameraPresets, ConstraintSet, DeviceClass, FacingMode, MediaSource, SourceHandle,
    SourceTransform,
};
pub use render::{RenderSize, RenderTarget};
