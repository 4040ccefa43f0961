//! Error types shared across Lenscap crates.

/// Top-level error type for Lenscap operations.
#[derive(Debug, thiserror::Error)]
pub enum LenscapError {
    /// Camera permission denied or no device matches the constraints.
    #[error("Media access error: {message}")]
    MediaAccess { message: String },

    /// A camera switch is already in flight.
    #[error("Camera switch already in progress")]
    AlreadySwitching,

    /// The switch failed and the previous camera could not be reacquired.
    /// The page (or process) has to be restarted to get a feed back.
    #[error("Camera switch failed and previous camera could not be restored: {message}")]
    SwitchFailedNoFallback { message: String },

    #[error("Camera switching is disabled for this configuration")]
    SwitchDisabled,

    #[error("Missing required configuration value: {key}")]
    ConfigurationMissing { key: String },

    #[error("Recording failed: {message}")]
    RecordingFailed { message: String },

    #[error("No finished recording is available")]
    NoArtifact,

    /// The AR session rejected a call.
    #[error("AR session error: {message}")]
    Session { message: String },

    /// The platform share sheet failed. A user cancelling it is not an error.
    #[error("Sharing failed: {message}")]
    ShareFailed { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using LenscapError.
pub type LenscapResult<T> = Result<T, LenscapError>;

impl LenscapError {
    pub fn media_access(msg: impl Into<String>) -> Self {
        Self::MediaAccess {
            message: msg.into(),
        }
    }

    pub fn switch_failed_no_fallback(msg: impl Into<String>) -> Self {
        Self::SwitchFailedNoFallback {
            message: msg.into(),
        }
    }

    pub fn configuration_missing(key: impl Into<String>) -> Self {
        Self::ConfigurationMissing { key: key.into() }
    }

    pub fn recording_failed(msg: impl Into<String>) -> Self {
        Self::RecordingFailed {
            message: msg.into(),
        }
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session {
            message: msg.into(),
        }
    }

    pub fn share_failed(msg: impl Into<String>) -> Self {
        Self::ShareFailed {
            message: msg.into(),
        }
    }

    /// Whether the error leaves the camera without any usable feed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SwitchFailedNoFallback { .. } | Self::ConfigurationMissing { .. }
        )
    }
}
