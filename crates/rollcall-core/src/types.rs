use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifierError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("image load failed: {0}")]
    ImageLoad(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Result of comparing one reference image against the captured probe.
#[derive(Debug, Clone, Copy)]
pub struct Verification {
    /// Whether the pair passes the verifier's own operating point.
    pub verified: bool,
    /// Non-negative dissimilarity; lower means more similar.
    pub distance: f32,
}

/// The external face-verification capability.
///
/// Implementations compare a stored reference image to a captured probe
/// image, both addressed by path. The selection policy in [`crate::matcher`]
/// never interprets the images itself.
pub trait FaceVerifier {
    fn verify(&mut self, reference: &Path, probe: &Path) -> Result<Verification, VerifierError>;
}

/// Face embedding vector (512-dimensional for ArcFace).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Embedding {
    /// Compute cosine similarity between two embeddings.
    ///
    /// Returns a value in [-1, 1]. Higher = more similar.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 { dot / denom } else { 0.0 }
    }

    /// Cosine distance in [0, 2]: `1 - similarity`. Lower = more similar.
    pub fn distance(&self, other: &Embedding) -> f32 {
        1.0 - self.similarity(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(values: Vec<f32>) -> Embedding {
        Embedding { values, model_version: None }
    }

    #[test]
    fn test_similarity_identical() {
        let a = emb(vec![1.0, 0.0, 0.0]);
        let b = emb(vec![1.0, 0.0, 0.0]);
        assert!((a.similarity(&b) - 1.0).abs() < 1e-6);
        assert!(a.distance(&b).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_orthogonal() {
        let a = emb(vec![1.0, 0.0]);
        let b = emb(vec![0.0, 1.0]);
        assert!(a.similarity(&b).abs() < 1e-6);
        assert!((a.distance(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_opposite_is_two() {
        let a = emb(vec![1.0, 0.0]);
        let b = emb(vec![-1.0, 0.0]);
        assert!((a.distance(&b) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_zero_vector() {
        let a = emb(vec![0.0, 0.0]);
        let b = emb(vec![1.0, 0.0]);
        assert_eq!(a.similarity(&b), 0.0);
    }
}
