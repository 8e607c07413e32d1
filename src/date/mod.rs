//! Turning recognized date strings into a single expiration date.

pub mod parse;
pub mod select;

pub use parse::{
    clean_date_string, normalize_two_digit_year, parse_date, parse_date_with, parse_dates,
    parse_dates_with, ParsedDate, DEFAULT_CENTURY_WINDOW,
};
pub use select::{most_likely_expiration_date, most_likely_expiration_date_at, DEFAULT_HORIZON_YEARS};

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::config::ScanConfig;

/// Parsing and selection constants, taken from the scan configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRules {
    pub century_window: i32,
    pub horizon_years: u32,
}

impl Default for DateRules {
    fn default() -> Self {
        Self {
            century_window: DEFAULT_CENTURY_WINDOW,
            horizon_years: DEFAULT_HORIZON_YEARS,
        }
    }
}

impl From<&ScanConfig> for DateRules {
    fn from(config: &ScanConfig) -> Self {
        Self {
            century_window: config.century_window,
            horizon_years: config.expiry_horizon_years,
        }
    }
}

impl DateRules {
    /// Parses all strings and selects the most likely expiry relative to `now`.
    /// Returns the parsed candidates alongside the choice.
    pub fn select(&self, strings: &[String], now: NaiveDateTime) -> (Vec<NaiveDate>, Option<NaiveDate>) {
        let candidates = parse_dates_with(strings, now.year(), self.century_window);
        let chosen = most_likely_expiration_date_at(&candidates, now, self.horizon_years);
        (candidates, chosen)
    }
}
