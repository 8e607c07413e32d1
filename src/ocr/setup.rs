//! Locating the Tesseract executable and its language data.
//!
//! Language data missing from every known location is downloaded once into
//! the per-user data directory.

use anyhow::{anyhow, Context, Result};
use log::info;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::config::OcrConfig;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

/// Resolved locations for one Tesseract installation.
#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Finds the executable and makes sure the configured language is available.
pub fn ensure_tesseract(config: &OcrConfig) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(config)?;
    info!("Tesseract executable: {}", executable.display());

    let tessdata = match find_tessdata_dir(config) {
        Some(dir) => dir,
        None if config.download_tessdata => {
            let dir = config
                .tessdata_dir
                .clone()
                .unwrap_or_else(crate::paths::get_tessdata_dir);
            download_tessdata(&dir, &config.language)?;
            dir
        }
        None => {
            return Err(anyhow!(
                "{}.traineddata not found. Set tessdata_dir or TESSDATA_PREFIX.",
                config.language
            ));
        }
    };
    info!("Tesseract data: {}", tessdata.display());

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

fn traineddata_name(language: &str) -> String {
    format!("{}.traineddata", language)
}

fn responds_to_version(exe: &Path) -> bool {
    Command::new(exe)
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Finds the Tesseract executable, checking the configured path first, then
/// `PATH`, then common install locations.
pub fn find_tesseract_executable(config: &OcrConfig) -> Result<PathBuf> {
    if let Some(path) = &config.tesseract_path {
        if path.exists() {
            return Ok(path.clone());
        }
        return Err(anyhow!("Configured tesseract_path does not exist: {}", path.display()));
    }

    let on_path = PathBuf::from("tesseract");
    if responds_to_version(&on_path) {
        return Ok(on_path);
    }

    let common_paths = [
        "/usr/bin/tesseract",
        "/usr/local/bin/tesseract",
        "/opt/homebrew/bin/tesseract",
        r"C:\Program Files\Tesseract-OCR\tesseract.exe",
        r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    ];

    common_paths
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| anyhow!("Tesseract not found. Please install Tesseract-OCR."))
}

/// Finds a tessdata directory that holds the configured language.
pub fn find_tessdata_dir(config: &OcrConfig) -> Option<PathBuf> {
    let file = traineddata_name(&config.language);
    tessdata_candidates(config)
        .into_iter()
        .find(|dir| dir.join(&file).exists())
}

fn tessdata_candidates(config: &OcrConfig) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(dir) = &config.tessdata_dir {
        candidates.push(dir.clone());
    }
    candidates.push(crate::paths::get_tessdata_dir());

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }

    for dir in [
        "/usr/share/tesseract-ocr/5/tessdata",
        "/usr/share/tesseract-ocr/4.00/tessdata",
        "/usr/share/tessdata",
        "/usr/local/share/tessdata",
        "/opt/homebrew/share/tessdata",
        r"C:\Program Files\Tesseract-OCR\tessdata",
    ] {
        candidates.push(PathBuf::from(dir));
    }

    candidates
}

/// Downloads `<language>.traineddata` into `tessdata_dir`.
fn download_tessdata(tessdata_dir: &Path, language: &str) -> Result<()> {
    let file_name = traineddata_name(language);
    let url = format!("{}/{}", TESSDATA_REPO, file_name);
    let target = tessdata_dir.join(&file_name);

    fs::create_dir_all(tessdata_dir)
        .with_context(|| format!("Failed to create {}", tessdata_dir.display()))?;

    info!("Downloading {}...", url);

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "expiry-scan")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            file_name,
            response.status()
        ));
    }

    let bytes = response.bytes()?;

    // A failed download must not leave a truncated model behind.
    let mut tmp = tempfile::NamedTempFile::new_in(tessdata_dir)?;
    tmp.write_all(&bytes)?;
    tmp.persist(&target)
        .with_context(|| format!("Failed to store {}", target.display()))?;

    info!("Downloaded {} ({} bytes)", file_name, bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_find_tessdata_prefers_configured_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("xyz.traineddata"), b"model").unwrap();

        let config = OcrConfig {
            language: "xyz".to_string(),
            tessdata_dir: Some(dir.path().to_path_buf()),
            ..OcrConfig::default()
        };
        assert_eq!(find_tessdata_dir(&config), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_missing_tesseract_path_is_error() {
        let config = OcrConfig {
            tesseract_path: Some(PathBuf::from("/definitely/not/here/tesseract")),
            ..OcrConfig::default()
        };
        assert!(find_tesseract_executable(&config).is_err());
    }
}
