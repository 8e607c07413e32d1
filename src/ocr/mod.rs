pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;

pub use engine::{NoProgress, OcrProgress, ProgressSink, TesseractRecognizer, TextRecognizer};
pub use extract::{detect_dates, extract_date_strings, RawDetection};
pub use preprocess::{preprocess, PreprocessParams, PreprocessedImage};
