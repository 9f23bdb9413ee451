use crate::error::RotateError;
use tokio::process::Command;
use tokio::time::{Duration, timeout};

pub const SCHEMA: &str = "org.gnome.desktop.background";
pub const KEY_PICTURE_URI: &str = "picture-uri";
pub const KEY_PICTURE_URI_DARK: &str = "picture-uri-dark";

const COMMAND_TIMEOUT: Duration = Duration::from_secs(6);

/// The system wallpaper store. Reading tells us what the desktop currently
/// shows (used to resync the cursor after a reload); writing applies a new
/// wallpaper.
#[allow(async_fn_in_trait)]
pub trait WallpaperStore {
    async fn get_string(&self, key: &str) -> Result<String, RotateError>;
    async fn set_string(&mut self, key: &str, value: &str) -> Result<(), RotateError>;
}

/// GNOME settings backend, shelling out to `gsettings`.
#[derive(Debug, Clone, Default)]
pub struct GsettingsStore;

impl GsettingsStore {
    pub fn new() -> Self {
        Self
    }
}

impl WallpaperStore for GsettingsStore {
    async fn get_string(&self, key: &str) -> Result<String, RotateError> {
        let cmd = Command::new("gsettings").args(["get", SCHEMA, key]).output();

        let output = match timeout(COMMAND_TIMEOUT, cmd).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(RotateError::SettingsReadFailed(e.to_string())),
            Err(_) => {
                return Err(RotateError::SettingsReadFailed(
                    "gsettings timed out".to_string(),
                ));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RotateError::SettingsReadFailed(stderr.trim().to_string()));
        }

        // gsettings prints the GVariant form: 'file:///path/to/img.png'
        let raw = String::from_utf8_lossy(&output.stdout);
        Ok(raw.trim().trim_matches('\'').to_string())
    }

    async fn set_string(&mut self, key: &str, value: &str) -> Result<(), RotateError> {
        let cmd = Command::new("gsettings")
            .args(["set", SCHEMA, key, value])
            .output();

        let output = match timeout(COMMAND_TIMEOUT, cmd).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(RotateError::SettingsWriteFailed {
                    key: key.to_string(),
                    message: e.to_string(),
                });
            }
            Err(_) => {
                return Err(RotateError::SettingsWriteFailed {
                    key: key.to_string(),
                    message: "gsettings timed out".to_string(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RotateError::SettingsWriteFailed {
                key: key.to_string(),
                message: stderr.trim().to_string(),
            });
        }

        Ok(())
    }
}

/// In-memory store double for controller tests. Clones share state so a
/// test can keep a handle after handing the store to the controller.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MemoryStore {
    values: std::sync::Arc<std::sync::Mutex<std::collections::HashMap<String, String>>>,
    writes: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    fail_writes: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl WallpaperStore for MemoryStore {
    async fn get_string(&self, key: &str) -> Result<String, RotateError> {
        self.get(key)
            .ok_or_else(|| RotateError::SettingsReadFailed(format!("no value for {}", key)))
    }

    async fn set_string(&mut self, key: &str, value: &str) -> Result<(), RotateError> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(RotateError::SettingsWriteFailed {
                key: key.to_string(),
                message: "store unavailable".to_string(),
            });
        }
        self.insert(key, value);
        self.writes
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}
