//! Render target sizing.

use serde::{Deserialize, Serialize};

/// Drawing-buffer dimensions of the live render target, in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

impl RenderSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Render size that fills the whole viewport.
    pub fn from_viewport(viewport_width: u32, viewport_height: u32) -> Self {
        Self::new(viewport_width.max(1), viewport_height.max(1))
    }

    /// Render size covering the viewport at a fixed aspect ratio
    /// (`width / height`), scaled by the device pixel ratio.
    ///
    /// A viewport wider than `aspect` keeps its width and overflows
    /// vertically; a taller one keeps its height.
    pub fn fit_aspect(
        viewport_width: u32,
        viewport_height: u32,
        aspect: f64,
        device_pixel_ratio: f64,
    ) -> Self {
        let vw = viewport_width.max(1) as f64;
        let vh = viewport_height.max(1) as f64;
        let aspect = if aspect > 0.0 { aspect } else { 9.0 / 16.0 };
        let dpr = if device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };

        let (css_w, css_h) = if vw / vh > aspect {
            (vw, vw / aspect)
        } else {
            (vh * aspect, vh)
        };

        Self::new(
            (css_w * dpr).round().max(1.0) as u32,
            (css_h * dpr).round().max(1.0) as u32,
        )
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }
}

impl Default for RenderSize {
    fn default() -> Self {
        Self::new(1080, 1920)
    }
}

/// Stream derived from the live render target for the native recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderTarget {
    pub size: RenderSize,
    /// Capture frame rate of the derived stream.
    pub fps: u32,
}

impl RenderTarget {
    pub fn new(size: RenderSize, fps: u32) -> Self {
        Self {
            size,
            fps: fps.max(1),
        }
    }
}
