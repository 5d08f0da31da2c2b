//! Persistent configuration for scrollhound.
//!
//! Stores gesture timings and reporting preferences in
//! `~/.scrollhound/config.json`. Missing or unreadable files fall back to the
//! defaults, so a fresh machine needs no setup.
//!
//! # Example
//!
//! ```no_run
//! use scrollhound_core::config::TouchConfig;
//!
//! let config = TouchConfig::load();
//! println!("tap pause: {:?}", config.tap_pause());
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const CONFIG_DIRNAME: &str = ".scrollhound";
const CONFIG_FILENAME: &str = "config.json";

/// Returns the scrollhound directory (`~/.scrollhound`).
pub fn scrollhound_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CONFIG_DIRNAME)
}

/// Gesture timings and reporting preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchConfig {
    /// How long a tap holds the pointer down, in milliseconds.
    pub tap_pause_ms: u64,
    /// Gap between the two taps of a double tap, in milliseconds.
    pub double_tap_gap_ms: u64,
    /// How long pinch fingers rest after touching down, in milliseconds.
    pub pinch_hold_ms: u64,
    /// Duration of the pinch finger travel, in milliseconds.
    pub pinch_move_ms: u64,
    /// Include the tapped element's text in tap reports.
    pub capture_element_text: bool,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            tap_pause_ms: 200,
            double_tap_gap_ms: 100,
            pinch_hold_ms: 110,
            pinch_move_ms: 600,
            capture_element_text: false,
        }
    }
}

impl TouchConfig {
    /// Load config from `~/.scrollhound/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(scrollhound_dir().join(CONFIG_FILENAME))
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        std::fs::read_to_string(path.into())
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save config to `~/.scrollhound/config.json`.
    pub fn save(&self) -> std::io::Result<()> {
        let dir = scrollhound_dir();
        std::fs::create_dir_all(&dir)?;
        self.save_to(dir.join(CONFIG_FILENAME))
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, path: impl Into<PathBuf>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path.into(), json)
    }

    pub fn tap_pause(&self) -> Duration {
        Duration::from_millis(self.tap_pause_ms)
    }

    pub fn double_tap_gap(&self) -> Duration {
        Duration::from_millis(self.double_tap_gap_ms)
    }

    pub fn pinch_hold(&self) -> Duration {
        Duration::from_millis(self.pinch_hold_ms)
    }

    pub fn pinch_move(&self) -> Duration {
        Duration::from_millis(self.pinch_move_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timings() {
        let config = TouchConfig::default();
        assert_eq!(config.tap_pause(), Duration::from_millis(200));
        assert_eq!(config.pinch_move(), Duration::from_millis(600));
        assert!(!config.capture_element_text);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let loaded: TouchConfig = serde_json::from_str(r#"{"capture_element_text": true}"#).unwrap();
        assert!(loaded.capture_element_text);
        assert_eq!(loaded.tap_pause_ms, 200);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let path = std::env::temp_dir().join(format!("scrollhound_cfg_{}.json", uuid::Uuid::new_v4()));
        let config = TouchConfig {
            tap_pause_ms: 150,
            ..TouchConfig::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(TouchConfig::load_from(&path), config);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_from_missing_file_returns_default() {
        let config = TouchConfig::load_from("/nonexistent/scrollhound/config.json");
        assert_eq!(config, TouchConfig::default());
    }
}
