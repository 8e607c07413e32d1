use chrono::Local;
use std::collections::VecDeque;

/// Bounded log of recent human-readable status lines, newest first.
#[derive(Debug, Clone)]
pub struct DebugLog {
    entries: VecDeque<String>,
    capacity: usize,
}

impl DebugLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Prepends a timestamped entry, evicting the oldest past capacity.
    /// Returns the entry as stored.
    pub fn push(&mut self, message: &str) -> String {
        let entry = format!("[{}] {}", Local::now().format("%H:%M:%S"), message);
        self.entries.push_front(entry.clone());
        self.entries.truncate(self.capacity);
        entry
    }

    /// Entries, newest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first_and_capped() {
        let mut log = DebugLog::new(10);
        for i in 0..15 {
            log.push(&format!("step {}", i));
        }

        let entries = log.entries();
        assert_eq!(entries.len(), 10);
        assert!(entries[0].ends_with("step 14"));
        assert!(entries[9].ends_with("step 5"));
    }

    #[test]
    fn test_entry_is_timestamped() {
        let mut log = DebugLog::new(3);
        let entry = log.push("Camera started");
        assert!(entry.starts_with('['));
        assert!(entry.ends_with("] Camera started"));
        assert_eq!(log.len(), 1);
    }
}
