use log::{debug, info};
use std::fmt;
use std::io::Write;
use std::process::Command;
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;

use super::setup::{ensure_tesseract, TesseractPaths};
use crate::capture::EncodedImage;
use crate::config::OcrConfig;
use crate::error::ScanError;

/// Advisory progress notifications from the recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrProgress {
    LoadingEngine,
    LoadingLanguage(String),
    SettingParameters,
    Recognizing,
    DateFound(String),
}

impl fmt::Display for OcrProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OcrProgress::LoadingEngine => write!(f, "Loading OCR engine"),
            OcrProgress::LoadingLanguage(lang) => write!(f, "Loading language '{}'", lang),
            OcrProgress::SettingParameters => write!(f, "Setting OCR parameters"),
            OcrProgress::Recognizing => write!(f, "Recognizing text"),
            OcrProgress::DateFound(s) => write!(f, "Date found: {}", s),
        }
    }
}

/// Receives progress notifications. Never required for correctness.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: OcrProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(OcrProgress) + Send + Sync,
{
    fn report(&self, progress: OcrProgress) {
        self(progress)
    }
}

/// Discards progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _progress: OcrProgress) {}
}

/// A text recognition service with an explicit lifecycle.
pub trait TextRecognizer: Send + Sync {
    /// Runs recognition over an encoded image and returns the raw text.
    ///
    /// Fails with `OcrInit` when the engine cannot start and `OcrEmptyResult`
    /// when nothing was recognized.
    fn detect_text(&self, image: &EncodedImage, progress: &dyn ProgressSink) -> Result<String, ScanError>;

    /// Releases the worker. The next call reinitializes it.
    fn terminate(&self);
}

/// A resolved, configured Tesseract installation.
#[derive(Debug)]
struct TesseractWorker {
    paths: TesseractPaths,
    language: String,
    page_seg_mode: u8,
    char_whitelist: String,
}

impl TesseractWorker {
    fn recognize(&self, image: &EncodedImage) -> Result<String, ScanError> {
        let mut input = NamedTempFile::with_suffix(".png")?;
        input.write_all(&image.data)?;
        input.flush()?;

        let output = Command::new(&self.paths.executable)
            .arg(input.path())
            .arg("stdout")
            .arg("--tessdata-dir")
            .arg(&self.paths.tessdata)
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.page_seg_mode.to_string())
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", self.char_whitelist))
            .output()
            .map_err(|e| ScanError::OcrInit(format!("failed to run tesseract: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScanError::OcrInit(format!("tesseract failed: {}", stderr.trim())));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(ScanError::OcrEmptyResult);
        }
        Ok(text)
    }
}

/// Tesseract-backed recognizer. The worker is created on first use and reused
/// until `terminate`.
pub struct TesseractRecognizer {
    config: OcrConfig,
    worker: Mutex<Option<TesseractWorker>>,
}

impl TesseractRecognizer {
    pub fn new(config: OcrConfig) -> Self {
        Self {
            config,
            worker: Mutex::new(None),
        }
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<TesseractWorker>> {
        self.worker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_initialized(&self) -> bool {
        self.lock_worker().is_some()
    }

    /// Initializes the worker now instead of on the first recognition.
    pub fn initialize(&self, progress: &dyn ProgressSink) -> Result<(), ScanError> {
        let mut guard = self.lock_worker();
        if guard.is_none() {
            *guard = Some(self.create_worker(progress)?);
        }
        Ok(())
    }

    fn create_worker(&self, progress: &dyn ProgressSink) -> Result<TesseractWorker, ScanError> {
        progress.report(OcrProgress::LoadingEngine);
        progress.report(OcrProgress::LoadingLanguage(self.config.language.clone()));
        let paths = ensure_tesseract(&self.config).map_err(|e| ScanError::OcrInit(format!("{:#}", e)))?;

        progress.report(OcrProgress::SettingParameters);
        info!(
            "OCR worker ready (lang={}, psm={}, whitelist={:?})",
            self.config.language, self.config.page_seg_mode, self.config.char_whitelist
        );

        Ok(TesseractWorker {
            paths,
            language: self.config.language.clone(),
            page_seg_mode: self.config.page_seg_mode,
            char_whitelist: self.config.char_whitelist.clone(),
        })
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn detect_text(&self, image: &EncodedImage, progress: &dyn ProgressSink) -> Result<String, ScanError> {
        let mut guard = self.lock_worker();
        if guard.is_none() {
            *guard = Some(self.create_worker(progress)?);
        }
        let Some(worker) = guard.as_ref() else {
            return Err(ScanError::OcrInit("worker unavailable".to_string()));
        };

        progress.report(OcrProgress::Recognizing);
        let text = worker.recognize(image)?;
        debug!("OCR text: {:?}", text);
        Ok(text)
    }

    fn terminate(&self) {
        if self.lock_worker().take().is_some() {
            info!("OCR worker terminated");
        }
    }
}
