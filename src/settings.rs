//! Persisted application settings.
//!
//! Settings live in a JSON file (`config.json` by default). They only provide defaults
//! for new jobs; a running job reads its values from [`crate::ScanbindConfig`].

use std::path::{Path, PathBuf};

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default settings file name.
pub const CONFIG_FILE_NAME: &str = "config.json";
/// Title used when the caller gives none.
pub const DEFAULT_TITLE: &str = "Untitled";
/// Author used when the caller gives none.
pub const DEFAULT_AUTHOR: &str = "Unknown Author";
/// Language code used when the caller gives none.
pub const DEFAULT_LANGUAGE: &str = "ja";
/// Concurrent OCR workers used when the caller gives none.
pub const DEFAULT_OCR_WORKERS: usize = 4;

/// User-editable defaults for conversion jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_epub_title: String,
    pub default_epub_author: String,
    pub default_epub_language: String,
    pub max_ocr_workers: usize,
    /// Base directory for per-job working directories; the system temp dir when unset.
    pub temp_dir_base: Option<PathBuf>,
    /// One of TRACE, DEBUG, INFO, WARNING (or WARN), ERROR, CRITICAL, OFF.
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default_epub_title: DEFAULT_TITLE.to_string(),
            default_epub_author: DEFAULT_AUTHOR.to_string(),
            default_epub_language: DEFAULT_LANGUAGE.to_string(),
            max_ocr_workers: DEFAULT_OCR_WORKERS,
            temp_dir_base: None,
            log_level: "INFO".to_string(),
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Loads settings from `path`, never failing.
    ///
    /// A missing file is created with the defaults. A malformed file is left untouched
    /// and the defaults are used for this session.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!(
                "Settings file '{}' not found, creating it with defaults",
                path.display()
            );
            let settings = Settings::default();
            if let Err(e) = settings.save(path) {
                error!("Failed to write settings file '{}': {}", path.display(), e);
            }
            return settings;
        }

        match Self::from_file(path) {
            Ok(settings) => {
                info!("Settings loaded from '{}'", path.display());
                settings
            }
            Err(e) => {
                error!(
                    "Failed to parse settings file '{}': {}. Using defaults.",
                    path.display(),
                    e
                );
                Settings::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// The configured verbosity; unknown names fall back to `Info`.
    pub fn log_level(&self) -> log::LevelFilter {
        match self.log_level.trim().to_ascii_uppercase().as_str() {
            "OFF" => log::LevelFilter::Off,
            "TRACE" => log::LevelFilter::Trace,
            "DEBUG" => log::LevelFilter::Debug,
            "WARN" | "WARNING" => log::LevelFilter::Warn,
            "ERROR" | "CRITICAL" => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        }
    }

    /// Worker count with `0` meaning "one per CPU".
    pub fn effective_ocr_workers(&self) -> usize {
        if self.max_ocr_workers == 0 {
            num_cpus::get()
        } else {
            self.max_ocr_workers
        }
    }
}
