//! Scan orchestrator.
//!
//! Runs capture → preprocess → recognize → parse on a fixed interval until a
//! date is found, the scan is stopped, or it fails. Each run has a generation
//! number; work that finishes after its generation was superseded is dropped,
//! so detection and cancellation can never both win.

use chrono::{Local, NaiveDate};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::{spawn_blocking, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::batch::{BatchQueue, ScanItem};
use super::debug_log::DebugLog;
use super::observer::ScanObserver;
use super::state::ScanState;
use crate::capture::{FrameCapture, VideoSource};
use crate::config::ScanConfig;
use crate::date::DateRules;
use crate::error::ScanError;
use crate::ocr::{detect_dates, preprocess, OcrProgress, PreprocessParams, TextRecognizer};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Status {
    state: ScanState,
    generation: u64,
    debug_log: DebugLog,
    last_error: Option<String>,
    batch: Option<BatchQueue>,
}

struct Ticker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Shared {
    config: ScanConfig,
    rules: DateRules,
    params: PreprocessParams,
    capture: Arc<Mutex<FrameCapture>>,
    recognizer: Arc<dyn TextRecognizer>,
    observer: Arc<dyn ScanObserver>,
    status: Mutex<Status>,
    // Lock order: ticker before status.
    ticker: Mutex<Option<Ticker>>,
    tick_in_flight: AtomicBool,
}

/// Owns one camera session and the tick loop that scans it.
///
/// Dropping the scanner stops the ticker and releases the camera.
pub struct Scanner {
    shared: Arc<Shared>,
}

impl Scanner {
    pub fn new(
        config: ScanConfig,
        source: Box<dyn VideoSource>,
        recognizer: Arc<dyn TextRecognizer>,
        observer: Arc<dyn ScanObserver>,
    ) -> Self {
        let status = Status {
            state: ScanState::Idle,
            generation: 0,
            debug_log: DebugLog::new(config.debug_log_capacity),
            last_error: None,
            batch: None,
        };

        let shared = Shared {
            rules: DateRules::from(&config),
            params: PreprocessParams {
                contrast: config.preprocess_contrast,
                threshold: config.binarize_threshold,
            },
            capture: Arc::new(Mutex::new(FrameCapture::new(source, config.clone()))),
            recognizer,
            observer,
            status: Mutex::new(status),
            ticker: Mutex::new(None),
            tick_in_flight: AtomicBool::new(false),
            config,
        };

        Self {
            shared: Arc::new(shared),
        }
    }

    pub fn state(&self) -> ScanState {
        lock(&self.shared.status).state.clone()
    }

    /// Message of the most recent failure, cleared on the next start.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.shared.status).last_error.clone()
    }

    /// Recent debug entries, newest first.
    pub fn debug_log(&self) -> Vec<String> {
        lock(&self.shared.status).debug_log.entries()
    }

    /// The batch item currently being scanned.
    pub fn current_item(&self) -> Option<ScanItem> {
        lock(&self.shared.status)
            .batch
            .as_ref()
            .and_then(|b| b.current().cloned())
    }

    pub fn is_ticking(&self) -> bool {
        lock(&self.shared.ticker).is_some()
    }

    /// Opens the camera and starts ticking. Ignored unless Idle.
    ///
    /// A camera failure is reported through the observer and `last_error`,
    /// and the scanner is back in Idle by the time this returns.
    pub async fn start(&self) {
        self.begin(None).await
    }

    /// Scans each item in turn, restarting automatically after every
    /// detection.
    pub async fn start_batch(&self, items: Vec<ScanItem>) {
        if items.is_empty() {
            self.shared.debug("No items to scan");
            return;
        }
        self.begin(Some(BatchQueue::new(items))).await
    }

    async fn begin(&self, batch: Option<BatchQueue>) {
        let generation = {
            let mut status = lock(&self.shared.status);
            if status.state != ScanState::Idle {
                let current = status.state.clone();
                drop(status);
                self.shared.debug(&format!("Start ignored while {}", current));
                return;
            }
            status.generation += 1;
            status.batch = batch;
            status.last_error = None;
            status.state = ScanState::Starting;
            status.generation
        };

        self.shared.observer.on_state_changed(&ScanState::Starting);
        Arc::clone(&self.shared).launch(generation).await;
    }

    /// Cancels the scan from any state. Idempotent.
    pub async fn stop(&self) {
        self.shared.cancel().await
    }

    /// Best-effort torch toggle. Returns the new torch state.
    pub async fn toggle_flash(&self) -> bool {
        let capture = Arc::clone(&self.shared.capture);
        match spawn_blocking(move || lock(&capture).toggle_flash()).await {
            Ok(on) => {
                self.shared.debug(if on { "Torch on" } else { "Torch off" });
                on
            }
            Err(e) => {
                warn!("Torch toggle failed: {}", e);
                false
            }
        }
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        {
            let mut status = lock(&self.shared.status);
            status.generation += 1;
            status.batch = None;
            status.state = ScanState::Idle;
        }

        let ticker = lock(&self.shared.ticker).take();
        if let Some(ticker) = ticker {
            ticker.cancel.cancel();
            ticker.handle.abort();
        }

        // A busy capture lock means a camera call is in flight; that call
        // sees the stale generation and releases the camera itself.
        if let Ok(mut capture) = self.shared.capture.try_lock() {
            capture.stop();
        }
    }
}

impl Shared {
    fn debug(&self, message: &str) {
        let entry = lock(&self.status).debug_log.push(message);
        debug!("{}", message);
        self.observer.on_debug(&entry);
    }

    fn is_current(&self, generation: u64) -> bool {
        lock(&self.status).generation == generation
    }

    /// Moves to Idle if the current state matches `pred`.
    fn set_idle_if(&self, pred: impl Fn(&ScanState) -> bool) {
        let changed = {
            let mut status = lock(&self.status);
            if pred(&status.state) {
                status.state = ScanState::Idle;
                true
            } else {
                false
            }
        };
        if changed {
            self.observer.on_state_changed(&ScanState::Idle);
        }
    }

    async fn launch(self: Arc<Self>, generation: u64) {
        let label = lock(&self.status)
            .batch
            .as_ref()
            .and_then(|b| {
                b.current()
                    .map(|item| format!(" for '{}' ({}/{})", item.name, b.position(), b.total()))
            })
            .unwrap_or_default();
        self.debug(&format!("Starting camera{}", label));

        let capture = Arc::clone(&self.capture);
        let opened = match spawn_blocking(move || lock(&capture).start()).await {
            Ok(result) => result,
            Err(e) => Err(ScanError::from(e)),
        };

        if let Err(e) = opened {
            self.fail(generation, e.user_message()).await;
            return;
        }

        let scanning = {
            let mut status = lock(&self.status);
            if status.generation == generation && status.state == ScanState::Starting {
                status.state = ScanState::Scanning;
                true
            } else {
                false
            }
        };

        if !scanning {
            debug!("Scan {} stopped while the camera was opening", generation);
            self.release_camera_if_orphaned().await;
            return;
        }

        self.observer.on_state_changed(&ScanState::Scanning);
        self.debug("Camera started");
        self.spawn_ticker(generation);
    }

    fn spawn_ticker(self: &Arc<Self>, generation: u64) {
        let mut ticker = lock(&self.ticker);
        if !self.is_current(generation) {
            return;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(self).tick_loop(generation, cancel.clone()));
        if let Some(previous) = ticker.replace(Ticker { cancel, handle }) {
            previous.cancel.cancel();
        }
    }

    async fn tick_loop(self: Arc<Self>, generation: u64, cancel: CancellationToken) {
        let period = self.config.tick_interval();
        let started = Instant::now();
        let mut interval = tokio::time::interval_at(started + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if !self.is_current(generation) {
                        break;
                    }

                    if let Some(limit) = self.config.max_scan_duration() {
                        if started.elapsed() >= limit {
                            let shared = Arc::clone(&self);
                            let message = format!("no date detected within {:.1}s", limit.as_secs_f32());
                            tokio::spawn(async move { shared.fail(generation, message).await });
                            break;
                        }
                    }

                    if self
                        .tick_in_flight
                        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                        .is_err()
                    {
                        debug!("Previous tick still running, skipping");
                        continue;
                    }

                    let shared = Arc::clone(&self);
                    tokio::spawn(async move {
                        shared.run_tick(generation).await;
                        shared.tick_in_flight.store(false, Ordering::SeqCst);
                    });
                }
            }
        }

        debug!("Ticker for scan {} finished", generation);
    }

    async fn run_tick(self: &Arc<Self>, generation: u64) {
        match self.scan_once(generation).await {
            Ok(Some(date)) => self.detected(generation, date).await,
            Ok(None) => {}
            Err(e) if !self.is_current(generation) => {
                debug!("Discarding error from stopped scan: {}", e)
            }
            Err(e) if e.is_transient() => {
                self.debug(&format!("No date this tick: {}", e.user_message()))
            }
            Err(e) => self.fail(generation, e.user_message()).await,
        }
    }

    /// One capture → preprocess → recognize → parse cycle.
    async fn scan_once(self: &Arc<Self>, generation: u64) -> Result<Option<NaiveDate>, ScanError> {
        let capture = Arc::clone(&self.capture);
        let frame = spawn_blocking(move || lock(&capture).capture_frame()).await??;
        if !self.is_current(generation) {
            self.release_camera_if_orphaned().await;
            return Ok(None);
        }
        self.debug(&format!("Frame captured: {}x{}", frame.width, frame.height));

        self.debug("Preprocessing image");
        let params = self.params;
        let image = spawn_blocking(move || preprocess(&frame, &params)).await??;
        if !self.is_current(generation) {
            return Ok(None);
        }

        let recognizer = Arc::clone(&self.recognizer);
        let progress = {
            let shared = Arc::clone(self);
            move |p: OcrProgress| {
                if shared.is_current(generation) {
                    shared.debug(&p.to_string());
                }
            }
        };
        let detection =
            spawn_blocking(move || detect_dates(recognizer.as_ref(), &image, &progress)).await??;
        if !self.is_current(generation) {
            return Ok(None);
        }

        self.debug(&format!("Recognized text: {:?}", detection.text));
        if detection.dates.is_empty() {
            self.debug("No dates found");
            return Ok(None);
        }
        self.debug(&format!("Dates found: {}", detection.dates.join(", ")));

        let (candidates, chosen) = self.rules.select(&detection.dates, Local::now().naive_local());
        match chosen {
            Some(date) => self.debug(&format!("Date selected: {}", date)),
            None => self.debug(&format!(
                "No plausible expiry among {} candidate(s)",
                candidates.len()
            )),
        }
        Ok(chosen)
    }

    async fn detected(self: &Arc<Self>, generation: u64, date: NaiveDate) {
        let item_id = {
            let mut status = lock(&self.status);
            if status.generation != generation || status.state != ScanState::Scanning {
                None
            } else {
                status.state = ScanState::Detected(date);
                Some(
                    status
                        .batch
                        .as_ref()
                        .and_then(|b| b.current())
                        .map(|item| item.id.clone()),
                )
            }
        };
        let Some(item_id) = item_id else {
            debug!("Detection for scan {} discarded, scan already stopped", generation);
            return;
        };

        info!("Expiry date detected: {}", date);
        self.observer.on_state_changed(&ScanState::Detected(date));
        self.teardown().await;
        self.observer.on_date_detected(item_id.as_deref(), date);

        enum Next {
            Relaunch(u64),
            BatchDone,
            Done,
            Superseded,
        }

        let next = {
            let mut status = lock(&self.status);
            if status.generation != generation {
                Next::Superseded
            } else {
                match status.batch.as_mut().map(|b| b.advance().is_some()) {
                    Some(true) => {
                        status.generation += 1;
                        status.state = ScanState::Starting;
                        Next::Relaunch(status.generation)
                    }
                    Some(false) => {
                        status.batch = None;
                        status.state = ScanState::Idle;
                        Next::BatchDone
                    }
                    None => {
                        status.state = ScanState::Idle;
                        Next::Done
                    }
                }
            }
        };

        match next {
            Next::Relaunch(next_generation) => {
                self.observer.on_state_changed(&ScanState::Starting);
                Arc::clone(self).launch(next_generation).await;
            }
            Next::BatchDone => {
                self.observer.on_state_changed(&ScanState::Idle);
                self.debug("Batch complete");
                self.observer.on_batch_complete();
            }
            Next::Done => self.observer.on_state_changed(&ScanState::Idle),
            Next::Superseded => self.set_idle_if(|s| *s == ScanState::Detected(date)),
        }
    }

    async fn fail(&self, generation: u64, message: String) {
        {
            let mut status = lock(&self.status);
            if status.generation != generation {
                return;
            }
            status.generation += 1;
            status.state = ScanState::Failed(message.clone());
            status.last_error = Some(message.clone());
            status.batch = None;
        }

        error!("Scan failed: {}", message);
        self.observer.on_state_changed(&ScanState::Failed(message.clone()));
        self.debug(&format!("Error: {}", message));
        self.observer.on_error(&message);

        self.teardown().await;
        self.set_idle_if(|s| matches!(s, ScanState::Failed(_)));
    }

    async fn cancel(&self) {
        // A scan that already detected or failed keeps its outcome; its own
        // path finishes the transition to Idle.
        let was_running = {
            let mut status = lock(&self.status);
            status.generation += 1;
            status.batch = None;
            if status.state.is_terminal() || status.state == ScanState::Idle {
                false
            } else {
                status.state = ScanState::Cancelled;
                true
            }
        };

        if was_running {
            self.observer.on_state_changed(&ScanState::Cancelled);
            self.debug("Scan cancelled");
        }

        self.teardown().await;

        if was_running {
            self.set_idle_if(|s| *s == ScanState::Cancelled);
        }
    }

    /// Clears the ticker and releases the camera.
    async fn teardown(&self) {
        let ticker = lock(&self.ticker).take();
        if let Some(ticker) = ticker {
            ticker.cancel.cancel();
            ticker.handle.abort();
        }
        self.release_camera().await;
    }

    async fn release_camera(&self) {
        let capture = Arc::clone(&self.capture);
        if let Err(e) = spawn_blocking(move || lock(&capture).stop()).await {
            warn!("Camera release task failed: {}", e);
        }
    }

    /// Releases the camera unless a newer scan is using it.
    async fn release_camera_if_orphaned(&self) {
        let owned = lock(&self.status).state.is_active();
        if !owned {
            self.release_camera().await;
        }
    }
}
