use log::debug;
use regex::Regex;
use std::sync::OnceLock;

use super::engine::{OcrProgress, ProgressSink, TextRecognizer};
use crate::capture::EncodedImage;
use crate::error::ScanError;

/// Slash-separated `D/M/YY` or `D/M/YYYY`. A three-digit tail keeps its
/// first two digits.
const SLASH_DATE_PATTERN: &str = r"\d{1,2}/\d{1,2}/(?:\d{4}|\d{2})";

/// Any digit run; only runs of exactly six digits (`DDMMYY`) are kept.
const DIGIT_RUN_PATTERN: &str = r"\d+";

fn slash_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SLASH_DATE_PATTERN).expect("slash date pattern is valid"))
}

fn digit_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DIGIT_RUN_PATTERN).expect("digit run pattern is valid"))
}

/// Recognizer output: the full text plus its date-shaped substrings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDetection {
    pub text: String,
    pub dates: Vec<String>,
}

/// Extracts date-shaped substrings from recognized text, in order of
/// appearance. Six-digit runs come back with slashes inserted (`DD/MM/YY`).
pub fn extract_date_strings(text: &str) -> Vec<String> {
    let slashed: Vec<(usize, usize)> = slash_date_regex()
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();
    let mut found: Vec<(usize, String)> = slashed
        .iter()
        .map(|&(start, end)| (start, text[start..end].to_string()))
        .collect();

    // Digit runs inside a slash date belong to that date.
    found.extend(
        digit_run_regex()
            .find_iter(text)
            .filter(|m| m.len() == 6)
            .filter(|m| !slashed.iter().any(|&(start, end)| m.start() < end && start < m.end()))
            .map(|m| {
                let run = m.as_str();
                (m.start(), format!("{}/{}/{}", &run[0..2], &run[2..4], &run[4..6]))
            }),
    );

    found.sort_by_key(|(offset, _)| *offset);
    found.into_iter().map(|(_, date)| date).collect()
}

/// Runs recognition and extracts date-shaped substrings.
pub fn detect_dates(
    recognizer: &dyn TextRecognizer,
    image: &EncodedImage,
    progress: &dyn ProgressSink,
) -> Result<RawDetection, ScanError> {
    let text = recognizer.detect_text(image, progress)?;
    let dates = extract_date_strings(&text);

    for date in &dates {
        progress.report(OcrProgress::DateFound(date.clone()));
    }
    debug!("Extracted {} date string(s) from {:?}", dates.len(), text);

    Ok(RawDetection { text, dates })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::engine::NoProgress;
    use std::sync::Mutex;

    struct FixedText(&'static str);

    impl TextRecognizer for FixedText {
        fn detect_text(&self, _image: &EncodedImage, _progress: &dyn ProgressSink) -> Result<String, ScanError> {
            if self.0.is_empty() {
                Err(ScanError::OcrEmptyResult)
            } else {
                Ok(self.0.to_string())
            }
        }

        fn terminate(&self) {}
    }

    fn image() -> EncodedImage {
        EncodedImage::encode(&image::RgbaImage::new(2, 2)).unwrap()
    }

    #[test]
    fn test_slash_date_in_noise() {
        assert_eq!(extract_date_strings("ABC 12/08/26 XYZ"), vec!["12/08/26"]);
    }

    #[test]
    fn test_six_digit_run_is_reformatted() {
        assert_eq!(extract_date_strings("300924"), vec!["30/09/24"]);
    }

    #[test]
    fn test_other_digit_runs_ignored() {
        assert!(extract_date_strings("12345 1234567 42").is_empty());
        assert_eq!(extract_date_strings("lot 1234 exp 010127"), vec!["01/01/27"]);
    }

    #[test]
    fn test_order_of_appearance_without_dedup() {
        assert_eq!(
            extract_date_strings("010125 1/2/2027 010125"),
            vec!["01/01/25", "1/2/2027", "01/01/25"]
        );
    }

    #[test]
    fn test_stray_digit_before_slash_date() {
        assert_eq!(extract_date_strings("112/08/26"), vec!["12/08/26"]);
    }

    #[test]
    fn test_stray_digit_after_slash_date() {
        assert_eq!(extract_date_strings("12/08/265"), vec!["12/08/26"]);
        assert_eq!(crate::date::parse_date_with("12/08/26", 2025, 10).map(|d| d.year), Some(2026));
    }

    #[test]
    fn test_six_digit_run_touching_slash_date_is_not_repeated() {
        assert_eq!(extract_date_strings("120826/08/26"), vec!["26/08/26"]);
    }

    #[test]
    fn test_four_digit_year_with_slashes() {
        assert_eq!(extract_date_strings("EXP 05/11/2027"), vec!["05/11/2027"]);
    }

    #[test]
    fn test_detect_dates_reports_each_match() {
        let seen = Mutex::new(Vec::new());
        let sink = |p: OcrProgress| seen.lock().unwrap().push(p);

        let detection = detect_dates(&FixedText("12/08/26 300924"), &image(), &sink).unwrap();
        assert_eq!(detection.text, "12/08/26 300924");
        assert_eq!(detection.dates, vec!["12/08/26", "30/09/24"]);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                OcrProgress::DateFound("12/08/26".to_string()),
                OcrProgress::DateFound("30/09/24".to_string()),
            ]
        );
    }

    #[test]
    fn test_detect_dates_propagates_empty_result() {
        let err = detect_dates(&FixedText(""), &image(), &NoProgress).unwrap_err();
        assert!(matches!(err, ScanError::OcrEmptyResult));
    }
}
