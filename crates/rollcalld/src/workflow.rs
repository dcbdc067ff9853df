//! The capture-and-mark workflow.
//!
//! One request walks capture -> glare gate -> persist temp -> geofence ->
//! match -> rename + ledger, with a terminal outcome at every gate. The
//! geofence runs only after the image is saved; that ordering comes from
//! the service contract and is not reorderable without changing behavior.
//! The temporary capture is removed on every exit that does not rename it
//! into the per-identity final name.

use crate::geocode::Geocoder;
use crate::session::SessionError;
use async_trait::async_trait;
use chrono::Local;
use rollcall_core::types::FaceVerifier;
use rollcall_core::{geofence, glare, matcher};
use rollcall_hw::Frame;
use rollcall_store::{AttendanceLedger, Gallery, MarkOutcome};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the temporary capture file inside the capture directory.
const TEMP_CAPTURE_NAME: &str = "captured_image.png";

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("capture storage: {0}")]
    Storage(String),
    #[error("ledger: {0}")]
    Ledger(#[from] rollcall_store::LedgerError),
}

/// Source of capture frames; implemented by the camera session and by
/// test stubs.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn read_frame(&self) -> Result<Frame, SessionError>;
}

#[async_trait]
impl FrameSource for crate::session::CameraSession {
    async fn read_frame(&self) -> Result<Frame, SessionError> {
        self.capture().await
    }
}

/// Terminal outcome of one capture request.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// Device read failed or glare was detected.
    CaptureFailed,
    /// Geocode unavailable or out of radius.
    LocationDenied,
    /// No reference image passed verification under the threshold.
    NoMatch,
    Marked { identity: String, time: String },
    AlreadyMarked { identity: String },
}

impl CaptureOutcome {
    /// The user-facing message for this outcome.
    pub fn message(&self) -> String {
        match self {
            CaptureOutcome::CaptureFailed => {
                "Failed to capture image or glare detected.".to_string()
            }
            CaptureOutcome::LocationDenied => {
                "Location verification failed. You are not in the allowed location.".to_string()
            }
            CaptureOutcome::NoMatch => "No match found. Attendance not marked.".to_string(),
            CaptureOutcome::Marked { identity, time } => {
                format!("Attendance marked for {identity} at {time}.")
            }
            CaptureOutcome::AlreadyMarked { identity } => {
                format!("{identity}'s attendance is already marked today.")
            }
        }
    }
}

/// Removes the temporary capture when dropped. The rename on the accept
/// path moves the file away first, which the drop treats as already
/// cleaned up.
struct TempCapture {
    path: PathBuf,
}

impl TempCapture {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempCapture {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "temp capture not removed");
            }
        }
    }
}

/// The per-request orchestrator.
pub struct CaptureWorkflow {
    pub capture_dir: PathBuf,
    pub fixed_location: (f64, f64),
    pub radius_km: f64,
    pub match_threshold: f32,
}

impl CaptureWorkflow {
    /// Run the workflow for one identity.
    ///
    /// The identity is assumed non-empty; the HTTP layer rejects empty
    /// roll numbers before a frame is touched.
    pub async fn run<S, G, V>(
        &self,
        identity: &str,
        frames: &S,
        geocoder: &G,
        verifier: &mut V,
        gallery: &Gallery,
        ledger: &AttendanceLedger,
    ) -> Result<CaptureOutcome, WorkflowError>
    where
        S: FrameSource + ?Sized,
        G: Geocoder + ?Sized,
        V: FaceVerifier + ?Sized,
    {
        // Capturing
        let frame = match frames.read_frame().await {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(identity, error = %e, "frame read failed");
                return Ok(CaptureOutcome::CaptureFailed);
            }
        };

        // GlareCheck: a glary frame is discarded unsaved.
        if glare::has_glare(&frame.luma(), frame.width, frame.height) {
            tracing::warn!(identity, "glare detected, capture discarded");
            return Ok(CaptureOutcome::CaptureFailed);
        }

        let temp = TempCapture {
            path: self.capture_dir.join(TEMP_CAPTURE_NAME),
        };
        if let Err(e) = frame.save_png(temp.path()) {
            return Err(WorkflowError::Storage(format!(
                "saving capture to {}: {e}",
                temp.path().display()
            )));
        }

        // LocationCheck
        let live = geocoder.live_location().await;
        if !geofence::within_range(live, self.fixed_location, self.radius_km) {
            tracing::info!(identity, ?live, "geofence check failed");
            return Ok(CaptureOutcome::LocationDenied);
        }

        // Matching: a missing reference folder falls through as no match.
        let Some(folder) = gallery.identity_dir(identity) else {
            tracing::info!(identity, "no reference folder");
            return Ok(CaptureOutcome::NoMatch);
        };

        let outcome = match matcher::best_match(verifier, &folder, temp.path()) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(identity, error = %e, "reference scan failed");
                return Ok(CaptureOutcome::NoMatch);
            }
        };

        let best = match outcome.best {
            Some(best) if best.distance < self.match_threshold => best,
            Some(best) => {
                tracing::info!(
                    identity,
                    distance = best.distance,
                    threshold = self.match_threshold,
                    "best match above threshold"
                );
                return Ok(CaptureOutcome::NoMatch);
            }
            None => {
                tracing::info!(identity, scanned = outcome.scanned, "no verified match");
                return Ok(CaptureOutcome::NoMatch);
            }
        };

        tracing::info!(
            identity,
            image = %best.image,
            distance = best.distance,
            "match accepted"
        );

        // LedgerUpdate: keep the accepted capture under the identity's name.
        let final_path = self
            .capture_dir
            .join(format!("{identity}_captured_image.png"));
        std::fs::rename(temp.path(), &final_path).map_err(|e| {
            WorkflowError::Storage(format!("renaming capture to {}: {e}", final_path.display()))
        })?;

        match ledger.mark_if_absent(identity, Local::now())? {
            MarkOutcome::Marked { time } => Ok(CaptureOutcome::Marked {
                identity: identity.to_string(),
                time,
            }),
            MarkOutcome::AlreadyMarked => Ok(CaptureOutcome::AlreadyMarked {
                identity: identity.to_string(),
            }),
        }
    }
}
