//! Frame capture for the scanning pipeline.
//!
//! This module provides:
//! - Camera session lifecycle (`FrameCapture`)
//! - Scan band geometry and enhancement
//! - A still-image video source for replaying captured photos

pub mod band;
pub mod camera;
pub mod frame;
pub mod still;

pub use camera::{CameraSession, FacingMode, FrameCapture, StreamConstraints, VideoSource, VideoStream};
pub use frame::{CapturedFrame, EncodedImage};
pub use still::StillImageSource;
