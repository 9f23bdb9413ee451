use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the rotation controller. All of these are non-fatal:
/// the server boundary converts them into status messages and the daemon
/// keeps running.
#[derive(Debug, Error)]
pub enum RotateError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Permission denied reading directory: {0}")]
    PermissionDenied(PathBuf),

    #[error("Wallpaper file no longer exists: {0}")]
    FileMissing(PathBuf),

    #[error("Failed to write wallpaper setting '{key}': {message}")]
    SettingsWriteFailed { key: String, message: String },

    #[error("Failed to read settings: {0}")]
    SettingsReadFailed(String),

    #[error("Interval of {0} minute(s) is shorter than the minimum change delay")]
    IntervalTooShort(u64),

    #[error("No wallpapers loaded")]
    NoWallpapers,
}
