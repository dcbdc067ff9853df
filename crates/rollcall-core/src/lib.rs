//! rollcall-core - Decision logic for the attendance capture pipeline.
//!
//! Pure gates (glare screening, geofence radius check), the face-match
//! selection policy, and the ArcFace/ONNX verifier behind the
//! `FaceVerifier` seam.

pub mod embedder;
pub mod geofence;
pub mod glare;
pub mod matcher;
pub mod types;

pub use embedder::ArcFaceVerifier;
pub use matcher::{best_match, BestMatch, MatchOutcome};
pub use types::{Embedding, FaceVerifier, Verification, VerifierError};
