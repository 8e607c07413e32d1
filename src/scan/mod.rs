//! Periodic scanning of the camera feed for an expiry date.
//!
//! This module provides:
//! - The `Scanner` orchestrator and its tick loop
//! - Scan lifecycle state and the rolling debug log
//! - Observer callbacks (trait and channel adapter)
//! - The batch item queue

pub mod batch;
pub mod debug_log;
pub mod observer;
pub mod scanner;
pub mod state;

pub use batch::{load_items, BatchQueue, ScanItem};
pub use debug_log::DebugLog;
pub use observer::{ChannelObserver, ScanEvent, ScanObserver};
pub use scanner::Scanner;
pub use state::ScanState;
