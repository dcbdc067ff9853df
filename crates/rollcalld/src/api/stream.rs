//! Live camera preview as a multipart JPEG stream.

use crate::api::server::AppContext;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use std::convert::Infallible;

const BOUNDARY_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";

/// GET /video_feed - unbounded MJPEG stream.
///
/// The stream ends when the session stops producing frames (for example
/// after /shutdown); that is end-of-stream for the preview, not an error.
pub async fn video_feed(State(ctx): State<AppContext>) -> impl IntoResponse {
    let session = ctx.session.clone();

    let stream = async_stream::stream! {
        tracing::debug!("preview client connected");
        loop {
            match session.jpeg().await {
                Ok(jpeg) => {
                    let mut part = Vec::with_capacity(BOUNDARY_HEADER.len() + jpeg.len() + 2);
                    part.extend_from_slice(BOUNDARY_HEADER);
                    part.extend_from_slice(&jpeg);
                    part.extend_from_slice(b"\r\n");
                    yield Ok::<_, Infallible>(Bytes::from(part));
                }
                Err(e) => {
                    tracing::debug!(error = %e, "preview stream ended");
                    break;
                }
            }
        }
    };

    (
        [(
            header::CONTENT_TYPE,
            "multipart/x-mixed-replace; boundary=frame",
        )],
        Body::from_stream(stream),
    )
}
