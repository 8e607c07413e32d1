//! Camera lifecycle and band capture.
//!
//! The device itself sits behind [`VideoSource`]; `FrameCapture` owns at most
//! one open [`CameraSession`] and turns its current frame into a scan band.

use image::RgbaImage;
use log::{debug, info, warn};

use super::band::{crop_band, enhance, scan_rect};
use super::frame::{CapturedFrame, EncodedImage};
use crate::config::ScanConfig;
use crate::error::ScanError;

/// Which way the requested camera should face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FacingMode {
    User,
    Environment,
}

/// Constraints passed to the video source when opening a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamConstraints {
    pub facing: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

/// A live video stream attached to a sink that decodes frames.
pub trait VideoStream: Send {
    /// Frame dimensions, known once stream metadata has loaded.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Latest decoded frame. None until the first frame arrives.
    fn current_frame(&mut self) -> Option<RgbaImage>;

    /// Turns the torch on or off. Returns the resulting torch state.
    fn set_torch(&mut self, _on: bool) -> bool {
        false
    }

    /// Stops all tracks and detaches the sink.
    fn stop(&mut self);
}

/// A camera device (or anything that can stand in for one).
pub trait VideoSource: Send + Sync {
    /// Opens a stream. Permission denial or a missing device must surface as
    /// `ScanError::CameraUnavailable`.
    fn open(&self, constraints: &StreamConstraints) -> Result<Box<dyn VideoStream>, ScanError>;
}

/// An active handle to a video input device.
pub struct CameraSession {
    stream: Box<dyn VideoStream>,
    ready: bool,
    torch: bool,
}

impl CameraSession {
    pub fn is_ready(&self) -> bool {
        self.ready
    }
}

/// Owns the camera session and produces scan-band crops on demand.
pub struct FrameCapture {
    source: Box<dyn VideoSource>,
    session: Option<CameraSession>,
    config: ScanConfig,
}

impl FrameCapture {
    pub fn new(source: Box<dyn VideoSource>, config: ScanConfig) -> Self {
        Self {
            source,
            session: None,
            config,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// True once the open session has delivered its first frame.
    pub fn is_ready(&self) -> bool {
        self.session.as_ref().is_some_and(CameraSession::is_ready)
    }

    /// Requests a rear-facing stream at the configured ideal resolution.
    /// Does nothing if a session is already open.
    pub fn start(&mut self) -> Result<(), ScanError> {
        if self.session.is_some() {
            debug!("Camera already started");
            return Ok(());
        }

        let constraints = StreamConstraints {
            facing: FacingMode::Environment,
            ideal_width: self.config.resolution.width,
            ideal_height: self.config.resolution.height,
        };
        info!(
            "Requesting camera ({}x{} ideal)",
            constraints.ideal_width, constraints.ideal_height
        );

        let stream = self.source.open(&constraints)?;
        self.session = Some(CameraSession {
            stream,
            ready: false,
            torch: false,
        });
        Ok(())
    }

    /// Stops all tracks and releases the stream. Safe to call when not started.
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            if session.torch {
                session.stream.set_torch(false);
            }
            session.stream.stop();
            info!("Camera stopped");
        }
    }

    /// Crops the scan band out of the current frame and encodes it.
    ///
    /// Fails with `VideoNotReady` when no session is open, the stream has no
    /// dimensions yet, or no frame has been decoded.
    pub fn capture_frame(&mut self) -> Result<CapturedFrame, ScanError> {
        let session = self.session.as_mut().ok_or(ScanError::VideoNotReady)?;

        let (width, height) = match session.stream.dimensions() {
            Some((w, h)) if w > 0 && h > 0 => (w, h),
            _ => return Err(ScanError::VideoNotReady),
        };
        let frame = session.stream.current_frame().ok_or(ScanError::VideoNotReady)?;

        if !session.ready {
            session.ready = true;
            info!("Video ready: {}x{}", width, height);
        }

        // Decoded frames can lag a resolution change; trust the pixels.
        let (width, height) = if frame.dimensions() != (width, height) {
            warn!(
                "Frame is {}x{} but stream reports {}x{}",
                frame.width(),
                frame.height(),
                width,
                height
            );
            frame.dimensions()
        } else {
            (width, height)
        };

        let rect = scan_rect(width, height, &self.config.band);
        let mut band = crop_band(&frame, &rect);
        enhance(
            &mut band,
            self.config.capture_contrast,
            self.config.capture_brightness,
        );

        EncodedImage::encode(&band)
    }

    /// Best-effort torch toggle. Returns the new torch state; stays off where
    /// unsupported or when no session is open.
    pub fn toggle_flash(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let wanted = !session.torch;
        session.torch = session.stream.set_torch(wanted) && wanted;
        session.torch
    }
}

impl Drop for FrameCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
