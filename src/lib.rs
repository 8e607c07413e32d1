//! Expiry date scanning.
//!
//! Captures a band from a video feed, cleans it up for OCR, recognizes the
//! printed text with Tesseract and picks the most plausible expiration date.

pub mod capture;
pub mod config;
pub mod date;
pub mod error;
pub mod logging;
pub mod ocr;
pub mod paths;
pub mod results;
pub mod scan;

pub use error::ScanError;
