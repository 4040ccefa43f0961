//! Camera facing modes, constraint presets, and source handles.

use serde::{Deserialize, Serialize};

/// Which physical camera feeds the AR session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    /// Front / user-facing camera.
    Front,
    /// Back / environment-facing camera.
    Back,
}

impl FacingMode {
    /// The other camera.
    pub fn opposite(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }

    /// The media-device facing string (`user` / `environment`).
    pub fn as_media_facing(self) -> &'static str {
        match self {
            Self::Front => "user",
            Self::Back => "environment",
        }
    }
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_media_facing())
    }
}

/// Constraints handed to the media-device service when acquiring a camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSet {
    /// Requested facing mode.
    pub facing: FacingMode,

    /// Ideal capture width (a hint, not a requirement).
    pub ideal_width: u32,

    /// Ideal capture height (a hint, not a requirement).
    pub ideal_height: u32,

    /// Whether the input should carry an audio track.
    pub audio: bool,
}

impl ConstraintSet {
    pub fn new(facing: FacingMode, ideal_width: u32, ideal_height: u32, audio: bool) -> Self {
        Self {
            facing,
            ideal_width,
            ideal_height,
            audio,
        }
    }
}

/// Constraint presets per facing mode, plus one for desktop webcams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraPresets {
    pub front: ConstraintSet,
    pub back: ConstraintSet,
    pub desktop: ConstraintSet,
}

impl CameraPresets {
    /// Preset for `facing` on the given class of device.
    ///
    /// Desktops only have a user-facing webcam, so a front request there
    /// resolves to the desktop preset.
    pub fn resolve(&self, facing: FacingMode, device: DeviceClass) -> ConstraintSet {
        match (device, facing) {
            (DeviceClass::Desktop, FacingMode::Front) => ConstraintSet {
                facing: FacingMode::Front,
                ..self.desktop.clone()
            },
            (_, FacingMode::Front) => self.front.clone(),
            (_, FacingMode::Back) => self.back.clone(),
        }
    }
}

impl Default for CameraPresets {
    fn default() -> Self {
        Self {
            front: ConstraintSet::new(FacingMode::Front, 1920, 1080, true),
            back: ConstraintSet::new(FacingMode::Back, 1920, 1080, true),
            desktop: ConstraintSet::new(FacingMode::Front, 1280, 720, true),
        }
    }
}

/// Coarse device class, used to pick the default camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Mobile,
    #[default]
    Desktop,
}

impl DeviceClass {
    const MOBILE_MARKERS: [&'static str; 4] = ["iPhone", "iPad", "iPod", "Android"];

    /// Classify a user-agent string.
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if Self::MOBILE_MARKERS
            .iter()
            .any(|marker| ua.contains(&marker.to_ascii_lowercase()))
        {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }

    /// Camera used when nothing else is configured.
    pub fn default_facing(self) -> FacingMode {
        match self {
            Self::Mobile => FacingMode::Back,
            Self::Desktop => FacingMode::Front,
        }
    }
}

/// Presentation-level transform applied by the render-source service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceTransform {
    #[default]
    Identity,
    /// Horizontal mirror, used for selfie-style front camera previews.
    MirrorX,
}

impl SourceTransform {
    pub fn for_facing(facing: FacingMode, mirror_front: bool) -> Self {
        match facing {
            FacingMode::Front if mirror_front => Self::MirrorX,
            _ => Self::Identity,
        }
    }
}

/// Opaque reference to an acquired media input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceHandle {
    /// Backend-assigned identifier, unique per acquisition.
    pub id: u64,
    /// The facing mode the input was acquired for.
    pub facing: FacingMode,
    /// Human-readable device label.
    pub label: String,
}

/// A source as handed to the AR session: the handle plus how to present it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    pub handle: SourceHandle,
    pub transform: SourceTransform,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_flips_facing() {
        assert_eq!(FacingMode::Front.opposite(), FacingMode::Back);
        assert_eq!(FacingMode::Back.opposite().opposite(), FacingMode::Back);
    }

    #[test]
    fn mobile_user_agents_are_detected() {
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)";
        let android = "Mozilla/5.0 (Linux; Android 14; Pixel 8)";
        let desktop = "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0";

        assert_eq!(DeviceClass::from_user_agent(iphone), DeviceClass::Mobile);
        assert_eq!(DeviceClass::from_user_agent(android), DeviceClass::Mobile);
        assert_eq!(DeviceClass::from_user_agent(desktop), DeviceClass::Desktop);
        assert_eq!(DeviceClass::Mobile.default_facing(), FacingMode::Back);
        assert_eq!(DeviceClass::Desktop.default_facing(), FacingMode::Front);
    }

    #[test]
    fn desktop_front_resolves_to_desktop_preset() {
        let presets = CameraPresets::default();
        let resolved = presets.resolve(FacingMode::Front, DeviceClass::Desktop);
        assert_eq!(resolved.ideal_width, presets.desktop.ideal_width);
        assert_eq!(resolved.facing, FacingMode::Front);

        let mobile = presets.resolve(FacingMode::Front, DeviceClass::Mobile);
        assert_eq!(mobile, presets.front);
    }

    #[test]
    fn only_front_camera_is_mirrored() {
        assert_eq!(
            SourceTransform::for_facing(FacingMode::Front, true),
            SourceTransform::MirrorX
        );
        assert_eq!(
            SourceTransform::for_facing(FacingMode::Front, false),
            SourceTransform::Identity
        );
        assert_eq!(
            SourceTransform::for_facing(FacingMode::Back, true),
            SourceTransform::Identity
        );
    }

    #[test]
    fn facing_serializes_snake_case() {
        let json = serde_json::to_string(&FacingMode::Back).unwrap();
        assert_eq!(json, "\"back\"");
    }
}
