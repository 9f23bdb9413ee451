use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Persisted application settings. Anything missing or unreadable falls back
/// to defaults rather than failing startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub wallpaper_dir: PathBuf,
    pub interval_minutes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wallpaper_dir: dirs::picture_dir()
                .or_else(|| dirs::home_dir().map(|h| h.join("Pictures")))
                .unwrap_or_else(|| PathBuf::from(".")),
            interval_minutes: 60,
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("wallpaper-rotator/config.toml"))
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(PathBuf::from)
            .or_else(Self::default_path)
            .context("Could not determine config path")?;

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))
    }

    /// Like `load`, but never fails: a broken settings store is reported
    /// and replaced by defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to read settings ({}), falling back to defaults", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let path = path
            .map(PathBuf::from)
            .or_else(Self::default_path)
            .context("Could not determine config path")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        info!("Config saved to {:?}", path);
        Ok(())
    }

    pub fn generate_example() -> Result<()> {
        let config = Self::default();
        let path = Self::default_path().context("Could not determine config path")?;

        config.save(Some(&path))?;

        println!("\nExample configuration:");
        println!("{}", toml::to_string_pretty(&config)?);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config {
            wallpaper_dir: PathBuf::from("/tmp/walls"),
            interval_minutes: 15,
        };
        config.save(Some(&path)).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.wallpaper_dir, PathBuf::from("/tmp/walls"));
        assert_eq!(loaded.interval_minutes, 15);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.toml");

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.interval_minutes, 60);
    }

    #[test]
    fn test_broken_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not toml {{{").unwrap();

        let config = Config::load_or_default(Some(&path));
        assert_eq!(config.interval_minutes, 60);
    }
}
