//! expiry-scan
//!
//! Command-line front end: replays label photos as camera frames through the
//! scanner and prints (optionally records) the detected expiry dates.

use anyhow::{anyhow, bail, Result};
use chrono::Local;
use clap::Parser;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;

use expiry_scan::capture::StillImageSource;
use expiry_scan::ocr::{OcrProgress, TesseractRecognizer, TextRecognizer};
use expiry_scan::scan::{load_items, ChannelObserver, ScanEvent, ScanItem, Scanner};
use expiry_scan::{config, logging, results};

#[derive(Parser, Debug)]
#[command(name = "expiry-scan", version, about = "Find the expiry date printed on a product label")]
struct Cli {
    /// Config file (defaults to config.json next to the executable)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON array of {"id": ..., "name": ...} items to scan in turn
    #[arg(long)]
    items: Option<PathBuf>,

    /// Append detections to this CSV file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write log lines to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Override the scan tick interval
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Give up when no date is found within this many seconds
    #[arg(long)]
    max_duration_secs: Option<u64>,

    /// Images, or directories of images, replayed as camera frames
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_file.as_deref())?;

    let mut config = config::load_config(cli.config.as_deref());
    if let Some(ms) = cli.interval_ms {
        config.tick_interval_ms = ms;
    }
    if let Some(secs) = cli.max_duration_secs {
        config.max_scan_duration_ms = Some(secs.saturating_mul(1000));
    }
    if config.max_scan_duration_ms.is_none() {
        warn!("No maximum scan duration set; press Ctrl-C to stop");
    }

    let items = match &cli.items {
        Some(path) => Some(load_items(path)?),
        None => None,
    };
    if let Some(path) = &cli.output {
        results::init_csv(path)?;
    }

    let source = StillImageSource::new(&cli.images);
    if source.is_empty() {
        bail!("No images found in the given paths");
    }
    info!("Replaying {} image(s) as camera frames", source.len());

    // Load the engine (and fetch tessdata if needed) before the camera opens.
    let recognizer = Arc::new(TesseractRecognizer::new(config.ocr.clone()));
    {
        let recognizer = Arc::clone(&recognizer);
        tokio::task::spawn_blocking(move || {
            recognizer.initialize(&|p: OcrProgress| info!("{}", p))
        })
        .await??;
    }

    let ocr: Arc<dyn TextRecognizer> = recognizer.clone();
    let (tx, mut events) = unbounded_channel();
    let scanner = Scanner::new(
        config,
        Box::new(source),
        ocr,
        Arc::new(ChannelObserver::new(tx)),
    );

    let catalog = items.clone().unwrap_or_default();
    let batch = items.is_some();
    match items {
        Some(items) => scanner.start_batch(items).await,
        None => scanner.start().await,
    }

    let outcome = run_until_done(&mut events, &catalog, batch, &cli).await;

    scanner.stop().await;
    recognizer.terminate();
    outcome
}

async fn run_until_done(
    events: &mut tokio::sync::mpsc::UnboundedReceiver<ScanEvent>,
    catalog: &[ScanItem],
    batch: bool,
    cli: &Cli,
) -> Result<()> {
    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                return Ok(());
            }
        };
        let Some(event) = event else {
            return Ok(());
        };

        match event {
            ScanEvent::DateDetected { item_id, date } => {
                let item = item_id
                    .as_deref()
                    .and_then(|id| catalog.iter().find(|i| i.id == id));
                match item {
                    Some(item) => println!("{}\t{}\t{}", item.id, item.name, date),
                    None => println!("{}", date),
                }
                if let Some(path) = &cli.output {
                    results::append_detection(path, item, date, Local::now().naive_local())?;
                }
                if !batch {
                    return Ok(());
                }
            }
            ScanEvent::BatchComplete => {
                info!("All {} item(s) scanned", catalog.len());
                return Ok(());
            }
            ScanEvent::Error(message) => return Err(anyhow!(message)),
            ScanEvent::StateChanged(state) => debug!("State: {}", state),
            ScanEvent::Debug(_) => {}
        }
    }
}
