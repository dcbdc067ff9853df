//! HTTP request handlers.

use crate::api::server::AppContext;
use crate::session::SessionError;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    #[serde(rename = "rollNumber")]
    roll_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    message: String,
}

fn msg(message: impl Into<String>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: message.into(),
    })
}

/// GET / - operator page.
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../operator.html"))
}

/// POST /capture - run the capture-and-mark workflow for one roll number.
pub async fn capture(
    State(ctx): State<AppContext>,
    Json(request): Json<CaptureRequest>,
) -> (StatusCode, Json<MessageResponse>) {
    let Some(roll_number) = request
        .roll_number
        .filter(|roll| !roll.trim().is_empty())
    else {
        return (StatusCode::BAD_REQUEST, msg("Roll number not provided."));
    };

    let ledger = ctx.ledger.lock().await;
    let mut verifier = ctx.verifier.lock().await;

    let result = ctx
        .workflow
        .run(
            &roll_number,
            &ctx.session,
            ctx.geocoder.as_ref(),
            verifier.as_mut(),
            &ctx.gallery,
            &ledger,
        )
        .await;

    match result {
        Ok(outcome) => (StatusCode::OK, msg(outcome.message())),
        Err(e) => {
            tracing::error!(identity = %roll_number, error = %e, "capture request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg(format!("error: {e}")),
            )
        }
    }
}

/// POST /upload - store a reference image; the identity is the filename stem.
pub async fn upload(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> (StatusCode, Json<MessageResponse>) {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return (StatusCode::BAD_REQUEST, msg("No file part")),
            Err(e) => {
                tracing::warn!(error = %e, "malformed multipart body");
                return (StatusCode::BAD_REQUEST, msg("No file part"));
            }
        };

        if field.name() != Some("file") {
            continue;
        }

        let Some(filename) = field.file_name().map(str::to_string).filter(|f| !f.is_empty())
        else {
            return (StatusCode::BAD_REQUEST, msg("No selected file"));
        };

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%filename, error = %e, "upload read failed");
                return (StatusCode::BAD_REQUEST, msg("No selected file"));
            }
        };

        return match ctx.gallery.save_reference(&filename, &bytes) {
            Ok(saved) => (
                StatusCode::OK,
                msg(format!(
                    "File '{filename}' uploaded successfully to '{}/'!",
                    saved.identity
                )),
            ),
            Err(rollcall_store::GalleryError::EmptyFilename) => {
                (StatusCode::BAD_REQUEST, msg("No selected file"))
            }
            Err(e) => {
                tracing::error!(%filename, error = %e, "reference store failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    msg(format!("error: {e}")),
                )
            }
        };
    }
}

/// POST /shutdown - release the camera session.
pub async fn shutdown(State(ctx): State<AppContext>) -> (StatusCode, String) {
    match ctx.session.release().await {
        Ok(()) => (StatusCode::OK, "Camera released.".to_string()),
        Err(SessionError::Released) => (StatusCode::OK, "Camera was not open.".to_string()),
        Err(e) => {
            tracing::error!(error = %e, "camera release failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("error: {e}"))
        }
    }
}
