use crate::config::Config;
use crate::error::RotateError;
use crate::store::{KEY_PICTURE_URI, KEY_PICTURE_URI_DARK, WallpaperStore};
use crate::timer;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Minimum spacing between two successful wallpaper applies.
pub const MIN_CHANGE_DELAY: Duration = Duration::from_secs(5);

pub const MIN_INTERVAL_MINUTES: u64 = 1;
pub const MAX_INTERVAL_MINUTES: u64 = 1440;

const EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "gif", "webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Notifications for whatever presentation layer is attached: status line
/// text, preview refreshes, and list-loaded counts.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    Status(String),
    Preview(Option<PathBuf>),
    ListLoaded(usize),
}

/// Result of a single apply attempt.
#[derive(Debug)]
pub enum ApplyOutcome {
    /// Wallpaper was written to the store.
    Applied(PathBuf),
    /// Rejected by the rate limiter; expected, retried by the next trigger.
    RateLimited,
    /// Nothing to do (empty set, rotation not running, or single wallpaper).
    Skipped,
    Failed(RotateError),
}

impl ApplyOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Owns the wallpaper list, selection cursor, and rotation state. All
/// mutation happens on the core event loop task that owns this value; the
/// timer task only ever posts ticks back to that loop, which is why
/// `last_change` needs no lock. Any future caller of `apply` off that loop
/// would have to add real synchronization first.
pub struct RotationController<S: WallpaperStore> {
    config: Config,
    config_path: Option<PathBuf>,
    store: S,
    wallpapers: Vec<PathBuf>,
    cursor: usize,
    running: Arc<AtomicBool>,
    interval_minutes: Arc<AtomicU64>,
    last_change: Option<Instant>,
    timer: Option<JoinHandle<()>>,
    events: UnboundedSender<ControllerEvent>,
    tick_tx: UnboundedSender<()>,
}

impl<S: WallpaperStore> RotationController<S> {
    pub fn new(
        mut config: Config,
        config_path: Option<PathBuf>,
        store: S,
        events: UnboundedSender<ControllerEvent>,
        tick_tx: UnboundedSender<()>,
    ) -> Self {
        // A hand-edited config file can hold any u64; clamp it here so the
        // interval arithmetic downstream stays in range.
        config.interval_minutes = config
            .interval_minutes
            .clamp(MIN_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES);
        let interval = config.interval_minutes;
        Self {
            config,
            config_path,
            store,
            wallpapers: Vec::new(),
            cursor: 0,
            running: Arc::new(AtomicBool::new(false)),
            interval_minutes: Arc::new(AtomicU64::new(interval)),
            last_change: None,
            timer: None,
            events,
            tick_tx,
        }
    }

    /// Rebuilds the wallpaper list from `directory` (or the configured
    /// folder), filters to supported image files, and resyncs the cursor to
    /// whatever the desktop currently shows if that file is in the new list.
    /// Failures leave the list empty and are reported, never fatal.
    pub async fn reload(&mut self, directory: Option<PathBuf>) -> Result<usize, RotateError> {
        if let Some(dir) = directory {
            if dir != self.config.wallpaper_dir {
                self.config.wallpaper_dir = dir;
                self.persist_config();
            }
        }

        self.wallpapers.clear();
        self.cursor = 0;

        let dir = self.config.wallpaper_dir.clone();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                let err = match e.kind() {
                    std::io::ErrorKind::NotFound => RotateError::DirectoryNotFound(dir),
                    _ => RotateError::PermissionDenied(dir),
                };
                self.status(err.to_string());
                self.emit(ControllerEvent::Preview(None));
                return Err(err);
            }
        };

        // Keep directory-listing order, no sort. Fresh listings may come
        // back in a different order, which the cursor resync below absorbs.
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && has_supported_extension(&path) {
                self.wallpapers.push(path);
            }
        }

        let count = self.wallpapers.len();
        if count == 0 {
            self.status(format!("No wallpapers found in {}", dir.display()));
            self.emit(ControllerEvent::ListLoaded(0));
            self.emit(ControllerEvent::Preview(None));
            return Ok(0);
        }

        self.resync_cursor().await;

        info!("Loaded {} wallpapers from {}", count, dir.display());
        self.status(format!("Loaded {} wallpapers", count));
        self.emit(ControllerEvent::ListLoaded(count));
        self.emit(ControllerEvent::Preview(self.current().cloned()));

        Ok(count)
    }

    /// Points the cursor at the wallpaper the desktop is already showing,
    /// when it appears in the freshly loaded list. A store read failure just
    /// leaves the cursor at 0.
    async fn resync_cursor(&mut self) {
        let uri = match self.store.get_string(KEY_PICTURE_URI).await {
            Ok(uri) => uri,
            Err(e) => {
                debug!("Could not read current wallpaper: {}", e);
                return;
            }
        };

        let Some(current) = uri.strip_prefix("file://") else {
            return;
        };
        let current = Path::new(current);

        if let Some(pos) = self.wallpapers.iter().position(|w| {
            w == current
                || fs::canonicalize(w)
                    .map(|c| c == current)
                    .unwrap_or(false)
        }) {
            self.cursor = pos;
        }
    }

    /// Manual next/previous navigation: moves the cursor circularly and
    /// applies. No-op on an empty list.
    pub async fn advance(&mut self, direction: Direction) -> ApplyOutcome {
        if self.wallpapers.is_empty() {
            return ApplyOutcome::Skipped;
        }

        let len = self.wallpapers.len();
        self.cursor = match direction {
            Direction::Next => (self.cursor + 1) % len,
            Direction::Previous => (self.cursor + len - 1) % len,
        };

        self.apply_current().await
    }

    /// Timer-triggered rotation: picks a random wallpaper guaranteed to
    /// differ from the current one and applies it.
    pub async fn apply_random(&mut self) -> ApplyOutcome {
        if self.wallpapers.is_empty() || !self.running.load(Ordering::SeqCst) {
            return ApplyOutcome::Skipped;
        }

        // A single wallpaper has nothing to rotate to, and the resample
        // loop below would never terminate. This check must stay ahead of
        // the draw.
        let len = self.wallpapers.len();
        if len == 1 {
            return ApplyOutcome::Skipped;
        }

        let mut index = self.cursor;
        while index == self.cursor {
            index = (rand::random::<u32>() as usize) % len;
        }
        self.cursor = index;

        self.apply_current().await
    }

    async fn apply_current(&mut self) -> ApplyOutcome {
        let path = self.wallpapers[self.cursor].clone();
        match self.try_apply(&path).await {
            Ok(true) => ApplyOutcome::Applied(path),
            Ok(false) => {
                debug!("Apply of {} rate limited", path.display());
                self.status("Waiting before next wallpaper change");
                ApplyOutcome::RateLimited
            }
            Err(e) => {
                warn!("Failed to apply {}: {}", path.display(), e);
                self.status(e.to_string());
                ApplyOutcome::Failed(e)
            }
        }
    }

    /// The only writer of the store keys and the only mutator of
    /// `last_change`. Returns `Ok(false)` when the rate limiter rejects the
    /// attempt; `last_change` moves only after both store writes succeed.
    async fn try_apply(&mut self, path: &Path) -> Result<bool, RotateError> {
        if let Some(last) = self.last_change {
            if last.elapsed() < MIN_CHANGE_DELAY {
                return Ok(false);
            }
        }

        // The list may be stale relative to the filesystem.
        let canonical =
            fs::canonicalize(path).map_err(|_| RotateError::FileMissing(path.to_path_buf()))?;
        if !canonical.is_file() {
            return Err(RotateError::FileMissing(path.to_path_buf()));
        }

        let uri = format!("file://{}", canonical.display());
        self.store.set_string(KEY_PICTURE_URI, &uri).await?;
        self.store.set_string(KEY_PICTURE_URI_DARK, &uri).await?;

        self.last_change = Some(Instant::now());
        info!("Applied wallpaper: {}", canonical.display());

        self.emit(ControllerEvent::Preview(Some(canonical.clone())));
        let name = canonical
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| canonical.display().to_string());
        self.status(format!("Current: {}", name));

        Ok(true)
    }

    /// Clamps to 1..=1440 minutes and persists only when the value changed.
    pub fn set_interval(&mut self, minutes: u64) -> u64 {
        let minutes = minutes.clamp(MIN_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES);

        if minutes != self.config.interval_minutes {
            self.config.interval_minutes = minutes;
            self.interval_minutes.store(minutes, Ordering::SeqCst);
            self.persist_config();
            self.status(format!("Interval set to {} minutes", minutes));
        }

        minutes
    }

    /// Starts automatic rotation and spawns the timer task. Rejected when
    /// nothing is loaded or the configured interval is shorter than the
    /// rate limit (possible with a hand-edited config file).
    pub fn start(&mut self) -> Result<(), RotateError> {
        if self.running.load(Ordering::SeqCst) {
            debug!("Rotation already running, start is a no-op");
            return Ok(());
        }

        if self.wallpapers.is_empty() {
            self.status("No wallpapers loaded, rotation not started");
            return Err(RotateError::NoWallpapers);
        }

        let minutes = self.config.interval_minutes;
        if minutes.saturating_mul(60) < MIN_CHANGE_DELAY.as_secs() {
            let err = RotateError::IntervalTooShort(minutes);
            self.status(err.to_string());
            return Err(err);
        }

        // A timer from a stopped session may still be mid-sleep; if it woke
        // after the flag is re-set it would tick alongside the new one.
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }

        self.running.store(true, Ordering::SeqCst);
        self.timer = Some(timer::spawn(
            self.running.clone(),
            self.interval_minutes.clone(),
            self.tick_tx.clone(),
        ));

        self.status(format!("Rotating every {} minutes", minutes));
        Ok(())
    }

    /// Flips the running flag. The timer notices at its next wake, which may
    /// be up to one full interval away; no hard interrupt.
    pub fn stop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.status("Automatic rotation stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn interval_minutes(&self) -> u64 {
        self.config.interval_minutes
    }

    pub fn wallpaper_dir(&self) -> &Path {
        &self.config.wallpaper_dir
    }

    pub fn wallpaper_count(&self) -> usize {
        self.wallpapers.len()
    }

    pub fn current(&self) -> Option<&PathBuf> {
        self.wallpapers.get(self.cursor)
    }

    fn persist_config(&self) {
        if let Err(e) = self.config.save(self.config_path.as_deref()) {
            warn!("Failed to persist settings: {}", e);
            self.status(format!("Failed to persist settings: {}", e));
        }
    }

    fn status(&self, message: impl Into<String>) {
        self.emit(ControllerEvent::Status(message.into()));
    }

    fn emit(&self, event: ControllerEvent) {
        let _ = self.events.send(event);
    }

    #[cfg(test)]
    fn cursor(&self) -> usize {
        self.cursor
    }
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}
