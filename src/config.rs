//! Configuration types for the scanning pipeline.
//!
//! Loads settings from config.json at startup. Every field has a default so a
//! partial file (or no file at all) still yields a usable configuration.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Camera stream constraints requested from the video source.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolutionConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Geometry of the scan band, relative to the video frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BandConfig {
    /// Band width as a fraction of the frame width
    pub width_ratio: f32,
    /// Band height as a fraction of the band width
    pub height_ratio: f32,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            width_ratio: 0.8,
            height_ratio: 0.2,
        }
    }
}

/// Complete scan configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Delay between scan ticks (milliseconds)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Give up after this long without a detection (milliseconds). None = never.
    #[serde(default)]
    pub max_scan_duration_ms: Option<u64>,
    /// Ideal camera resolution
    #[serde(default)]
    pub resolution: ResolutionConfig,
    /// Scan band geometry
    #[serde(default)]
    pub band: BandConfig,
    /// Contrast multiplier applied when the band is captured
    #[serde(default = "default_capture_contrast")]
    pub capture_contrast: f32,
    /// Brightness multiplier applied when the band is captured
    #[serde(default = "default_capture_brightness")]
    pub capture_brightness: f32,
    /// Contrast value fed to the preprocessing contrast-stretch
    #[serde(default = "default_preprocess_contrast")]
    pub preprocess_contrast: f32,
    /// Binarization threshold: adjusted luminance above this becomes white
    #[serde(default = "default_binarize_threshold")]
    pub binarize_threshold: f32,
    /// Candidates must fall before now + this many years
    #[serde(default = "default_expiry_horizon_years")]
    pub expiry_horizon_years: u32,
    /// Two-digit years beyond (current % 100) + window fall in the previous century
    #[serde(default = "default_century_window")]
    pub century_window: i32,
    /// Number of entries kept in the on-screen debug log
    #[serde(default = "default_debug_log_capacity")]
    pub debug_log_capacity: usize,
    /// OCR engine settings
    #[serde(default)]
    pub ocr: OcrConfig,
}

/// Tesseract settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_language")]
    pub language: String,
    /// Page segmentation mode (7 = single text line)
    #[serde(default = "default_page_seg_mode")]
    pub page_seg_mode: u8,
    #[serde(default = "default_char_whitelist")]
    pub char_whitelist: String,
    /// Explicit path to the tesseract executable
    #[serde(default)]
    pub tesseract_path: Option<PathBuf>,
    /// Explicit tessdata directory
    #[serde(default)]
    pub tessdata_dir: Option<PathBuf>,
    /// Download missing language data on first use
    #[serde(default = "default_download_tessdata")]
    pub download_tessdata: bool,
}

fn default_tick_interval_ms() -> u64 {
    2000
}

fn default_capture_contrast() -> f32 {
    1.2
}

fn default_capture_brightness() -> f32 {
    1.1
}

fn default_preprocess_contrast() -> f32 {
    1.5
}

fn default_binarize_threshold() -> f32 {
    128.0
}

fn default_expiry_horizon_years() -> u32 {
    5
}

fn default_century_window() -> i32 {
    10
}

fn default_debug_log_capacity() -> usize {
    10
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_page_seg_mode() -> u8 {
    7
}

fn default_char_whitelist() -> String {
    "0123456789/".to_string()
}

fn default_download_tessdata() -> bool {
    true
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            page_seg_mode: default_page_seg_mode(),
            char_whitelist: default_char_whitelist(),
            tesseract_path: None,
            tessdata_dir: None,
            download_tessdata: default_download_tessdata(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_scan_duration_ms: None,
            resolution: ResolutionConfig::default(),
            band: BandConfig::default(),
            capture_contrast: default_capture_contrast(),
            capture_brightness: default_capture_brightness(),
            preprocess_contrast: default_preprocess_contrast(),
            binarize_threshold: default_binarize_threshold(),
            expiry_horizon_years: default_expiry_horizon_years(),
            century_window: default_century_window(),
            debug_log_capacity: default_debug_log_capacity(),
            ocr: OcrConfig::default(),
        }
    }
}

impl ScanConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn max_scan_duration(&self) -> Option<Duration> {
        self.max_scan_duration_ms.map(Duration::from_millis)
    }
}

/// Loads configuration from `path`, or from config.json next to the
/// executable when no path is given. Falls back to defaults on any failure.
pub fn load_config(path: Option<&Path>) -> ScanConfig {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => crate::paths::get_exe_dir().join("config.json"),
    };

    info!("Looking for config at: {}", config_path.display());

    if !config_path.exists() {
        info!("config.json not found. Using default config.");
        return ScanConfig::default();
    }

    match fs::read_to_string(&config_path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => {
                info!("Config loaded from {}", config_path.display());
                config
            }
            Err(e) => {
                warn!("Failed to parse {}: {}. Using defaults.", config_path.display(), e);
                ScanConfig::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}. Using defaults.", config_path.display(), e);
            ScanConfig::default()
        }
    }
}
