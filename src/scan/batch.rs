//! Items waiting for an expiry date in batch mode.
//!
//! The scanner works through the queue front to back: each detection is
//! tagged with the current item's id, then the queue advances.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

/// An item needing a date. The id is opaque to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanItem {
    pub id: String,
    pub name: String,
}

impl ScanItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchQueue {
    items: VecDeque<ScanItem>,
    total: usize,
}

impl BatchQueue {
    pub fn new(items: Vec<ScanItem>) -> Self {
        let total = items.len();
        Self {
            items: items.into(),
            total,
        }
    }

    /// The item currently being scanned.
    pub fn current(&self) -> Option<&ScanItem> {
        self.items.front()
    }

    /// Drops the current item and returns the next one, if any.
    pub fn advance(&mut self) -> Option<&ScanItem> {
        self.items.pop_front();
        self.items.front()
    }

    /// 1-based position of the current item.
    pub fn position(&self) -> usize {
        self.total - self.items.len() + 1
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

/// Loads a JSON array of `{ "id": ..., "name": ... }` objects.
pub fn load_items(path: &Path) -> Result<Vec<ScanItem>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read items from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse items in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_queue_advances_in_order() {
        let mut queue = BatchQueue::new(vec![
            ScanItem::new("1", "Milk"),
            ScanItem::new("2", "Yogurt"),
            ScanItem::new("3", "Cheese"),
        ]);

        assert_eq!(queue.current().unwrap().id, "1");
        assert_eq!(queue.position(), 1);
        assert_eq!(queue.advance().unwrap().id, "2");
        assert_eq!(queue.position(), 2);
        assert_eq!(queue.advance().unwrap().id, "3");
        assert!(queue.advance().is_none());
        assert!(queue.current().is_none());
        assert_eq!(queue.total(), 3);
    }

    #[test]
    fn test_load_items() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("items.json");
        fs::write(&path, r#"[{"id": "a1", "name": "Milk"}, {"id": "b2", "name": "Ham"}]"#).unwrap();

        let items = load_items(&path).unwrap();
        assert_eq!(items, vec![ScanItem::new("a1", "Milk"), ScanItem::new("b2", "Ham")]);
    }

    #[test]
    fn test_load_items_bad_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("items.json");
        fs::write(&path, "[{").unwrap();
        assert!(load_items(&path).is_err());
    }
}
