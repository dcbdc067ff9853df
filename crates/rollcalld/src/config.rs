use std::path::PathBuf;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// HTTP listen port.
    pub port: u16,
    /// Root of the per-identity reference-image tree.
    pub face_dir: PathBuf,
    /// Path to the attendance ledger file.
    pub attendance_file: PathBuf,
    /// Directory holding the temporary and per-identity captures.
    pub capture_dir: PathBuf,
    /// Path to the ArcFace ONNX model file.
    pub model_path: String,
    /// Accept a match only below this cosine distance.
    pub match_threshold: f32,
    /// Fixed reference latitude for the geofence.
    pub fixed_latitude: f64,
    /// Fixed reference longitude for the geofence.
    pub fixed_longitude: f64,
    /// Allowed radius around the fixed location, in kilometers.
    pub radius_km: f64,
    /// Place name resolved to the device's live location.
    pub geocode_query: String,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            camera_device: std::env::var("ROLLCALL_CAMERA_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            port: env_u16("ROLLCALL_PORT", 5000),
            face_dir: std::env::var("ROLLCALL_FACE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("face")),
            attendance_file: std::env::var("ROLLCALL_ATTENDANCE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("attendance.csv")),
            capture_dir: std::env::var("ROLLCALL_CAPTURE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("CapturedImage")),
            model_path: std::env::var("ROLLCALL_MODEL_PATH")
                .unwrap_or_else(|_| "models/w600k_r50.onnx".to_string()),
            match_threshold: env_f32("ROLLCALL_MATCH_THRESHOLD", 0.7),
            fixed_latitude: env_f64("ROLLCALL_FIXED_LAT", 9.8815991),
            fixed_longitude: env_f64("ROLLCALL_FIXED_LON", 78.0722379),
            radius_km: env_f64("ROLLCALL_RADIUS_KM", 0.5),
            geocode_query: std::env::var("ROLLCALL_GEOCODE_QUERY")
                .unwrap_or_else(|_| "Thiruparankundram, Madurai".to_string()),
        }
    }

    /// The geofence's fixed (latitude, longitude) reference point.
    pub fn fixed_location(&self) -> (f64, f64) {
        (self.fixed_latitude, self.fixed_longitude)
    }
}

fn env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
