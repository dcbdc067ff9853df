//! rollcall-hw - Hardware abstraction for camera capture.
//!
//! Provides V4L2-based camera access producing RGB frames, plus the
//! pixel conversions the capture pipeline needs (YUYV unpacking, luma
//! extraction, JPEG/PNG encoding).

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError};
pub use frame::Frame;
