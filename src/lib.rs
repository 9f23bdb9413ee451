//! Rotates the desktop wallpaper from a user-chosen folder at a fixed
//! interval, with manual next/previous navigation. A daemon owns all
//! rotation state on one event loop; a CLI client drives it over a Unix
//! socket.

pub mod client;
pub mod config;
pub mod error;
pub mod notify;
pub mod protocol;
pub mod rotation;
pub mod server;
pub mod store;
pub mod timer;

pub use config::Config;
pub use error::RotateError;
pub use rotation::{
    ApplyOutcome, ControllerEvent, Direction, MIN_CHANGE_DELAY, RotationController,
};
pub use store::{GsettingsStore, WallpaperStore};
