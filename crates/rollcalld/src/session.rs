//! Camera session - exclusive ownership of the capture device.
//!
//! The camera handle lives on a dedicated OS thread; requests arrive over
//! an mpsc channel and answer through oneshot replies. Opening happens at
//! spawn time (fail-fast). After an explicit release every further
//! request answers `SessionError::Released` instead of touching the
//! device.

use rollcall_hw::{Camera, CameraError, Frame};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("frame encode error: {0}")]
    Encode(String),
    #[error("camera released")]
    Released,
    #[error("camera session thread exited")]
    ChannelClosed,
}

/// Messages sent from HTTP handlers to the session thread.
enum SessionRequest {
    Capture {
        reply: oneshot::Sender<Result<Frame, SessionError>>,
    },
    Jpeg {
        reply: oneshot::Sender<Result<Vec<u8>, SessionError>>,
    },
    Release {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
}

/// Clone-safe handle to the camera session thread.
#[derive(Clone)]
pub struct CameraSession {
    tx: mpsc::Sender<SessionRequest>,
}

impl CameraSession {
    /// Capture one frame for the verification workflow.
    pub async fn capture(&self) -> Result<Frame, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionRequest::Capture { reply: reply_tx })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)?
    }

    /// Capture one JPEG-encoded frame for the preview stream.
    pub async fn jpeg(&self) -> Result<Vec<u8>, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionRequest::Jpeg { reply: reply_tx })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)?
    }

    /// Release the camera. Further captures fail with
    /// [`SessionError::Released`]; releasing twice reports the same.
    pub async fn release(&self) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SessionRequest::Release { reply: reply_tx })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)?
    }
}

/// Spawn the camera session on a dedicated OS thread.
///
/// Opens the camera synchronously so an unavailable device fails the
/// daemon at startup, then enters the request loop.
pub fn spawn_session(camera_device: &str) -> Result<CameraSession, SessionError> {
    let camera = Camera::open(camera_device)?;
    tracing::info!(
        device = camera_device,
        width = camera.width,
        height = camera.height,
        fourcc = ?camera.fourcc,
        "camera session opened"
    );

    let (tx, mut rx) = mpsc::channel::<SessionRequest>(4);

    std::thread::Builder::new()
        .name("rollcall-camera".into())
        .spawn(move || {
            tracing::info!("camera session thread started");
            let mut camera = Some(camera);

            while let Some(req) = rx.blocking_recv() {
                match req {
                    SessionRequest::Capture { reply } => {
                        let _ = reply.send(read_frame(&camera));
                    }
                    SessionRequest::Jpeg { reply } => {
                        let result = read_frame(&camera).and_then(|frame| {
                            frame
                                .to_jpeg()
                                .map_err(|e| SessionError::Encode(e.to_string()))
                        });
                        let _ = reply.send(result);
                    }
                    SessionRequest::Release { reply } => {
                        let result = match camera.take() {
                            Some(_) => {
                                tracing::info!("camera released");
                                Ok(())
                            }
                            None => Err(SessionError::Released),
                        };
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("camera session thread exiting");
        })
        .expect("failed to spawn camera session thread");

    Ok(CameraSession { tx })
}

fn read_frame(camera: &Option<Camera>) -> Result<Frame, SessionError> {
    match camera {
        Some(c) => Ok(c.capture_frame()?),
        None => Err(SessionError::Released),
    }
}
