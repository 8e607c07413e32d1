//! CSV sink for detected expiry dates.
//!
//! Rows are appended one at a time so results already written survive a
//! crash mid-batch. Columns: item id, item name, expiry date, detection time.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::scan::ScanItem;

const CSV_HEADER: &str = "item_id,name,expiry_date,detected_at";

/// Writes the header unless the file already has content.
pub fn init_csv(path: &Path) -> Result<()> {
    if path.exists() {
        let file = File::open(path).context("Failed to open existing CSV")?;
        if BufReader::new(file).lines().next().is_some() {
            return Ok(());
        }
    }

    let mut file = File::create(path).context("Failed to create CSV file")?;
    writeln!(file, "{}", CSV_HEADER).context("Failed to write CSV header")?;
    Ok(())
}

/// Appends one detection. `item` is None for a single (non-batch) scan.
pub fn append_detection(
    path: &Path,
    item: Option<&ScanItem>,
    date: NaiveDate,
    detected_at: NaiveDateTime,
) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open CSV for append")?;

    let (id, name) = item
        .map(|i| (escape(&i.id), escape(&i.name)))
        .unwrap_or_default();
    writeln!(
        file,
        "{},{},{},{}",
        id,
        name,
        date.format("%Y-%m-%d"),
        detected_at.format("%Y-%m-%dT%H:%M:%S")
    )
    .context("Failed to write CSV row")?;
    Ok(())
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
