use anyhow::{Context, Result};
use rollcall_core::ArcFaceVerifier;
use rollcall_store::{AttendanceLedger, Gallery};
use rollcalld::api::server::{self, AppContext};
use rollcalld::geocode::NominatimGeocoder;
use rollcalld::workflow::CaptureWorkflow;
use rollcalld::{session, Config};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("rollcalld starting");

    let config = Config::from_env();

    // First-run initialization: ledger schema and capture directory.
    std::fs::create_dir_all(&config.capture_dir).with_context(|| {
        format!(
            "failed to create capture directory {}",
            config.capture_dir.display()
        )
    })?;
    let ledger = AttendanceLedger::new(&config.attendance_file);
    ledger
        .init_if_absent()
        .context("failed to initialize attendance ledger")?;

    let session = session::spawn_session(&config.camera_device)
        .map_err(|e| {
            for dev in rollcall_hw::Camera::list_devices() {
                tracing::info!(
                    path = %dev.path,
                    name = %dev.name,
                    driver = %dev.driver,
                    "detected capture device"
                );
            }
            e
        })
        .context("failed to open camera session")?;

    let verifier = ArcFaceVerifier::load(&config.model_path)
        .context("failed to load face verification model")?;

    let ctx = AppContext {
        session: session.clone(),
        gallery: Gallery::new(&config.face_dir),
        ledger: Arc::new(Mutex::new(ledger)),
        verifier: Arc::new(Mutex::new(Box::new(verifier))),
        geocoder: Arc::new(NominatimGeocoder::new(config.geocode_query.clone())),
        workflow: Arc::new(CaptureWorkflow {
            capture_dir: config.capture_dir.clone(),
            fixed_location: config.fixed_location(),
            radius_km: config.radius_km,
            match_threshold: config.match_threshold,
        }),
    };

    tracing::info!(port = config.port, "rollcalld ready");
    let served = server::run(config.port, ctx).await;

    // Best-effort camera release on the way out; /shutdown may already
    // have released it.
    if let Err(e) = session.release().await {
        tracing::debug!(error = %e, "camera already released at exit");
    }

    tracing::info!("rollcalld shutting down");
    served
}
