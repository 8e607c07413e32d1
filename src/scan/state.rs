//! Scan state machine.
//!
//! Idle → Starting → Scanning → (Detected | Cancelled | Failed) → Idle

use chrono::NaiveDate;

/// Scan orchestrator states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    /// No camera, no ticker
    Idle,
    /// Waiting for the camera to open
    Starting,
    /// Ticker running
    Scanning,
    /// A date was selected; tearing down
    Detected(NaiveDate),
    /// Stop requested; tearing down
    Cancelled,
    /// Gave up on this attempt; tearing down
    Failed(String),
}

impl ScanState {
    /// True while the scan owns the camera or is acquiring it.
    pub fn is_active(&self) -> bool {
        matches!(self, ScanState::Starting | ScanState::Scanning)
    }

    /// True for the three states that always lead back to Idle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanState::Detected(_) | ScanState::Cancelled | ScanState::Failed(_)
        )
    }
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanState::Idle => write!(f, "Idle"),
            ScanState::Starting => write!(f, "Starting camera"),
            ScanState::Scanning => write!(f, "Scanning"),
            ScanState::Detected(date) => write!(f, "Detected {}", date.format("%Y-%m-%d")),
            ScanState::Cancelled => write!(f, "Cancelled"),
            ScanState::Failed(msg) => write!(f, "Failed: {}", msg),
        }
    }
}
