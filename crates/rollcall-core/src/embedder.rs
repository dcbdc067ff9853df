//! ArcFace face verifier via ONNX Runtime.
//!
//! The concrete [`FaceVerifier`]: embeds both images with a 112x112
//! ArcFace-style embedding model and reports cosine distance. Reference
//! embeddings are cached by path; reference images are immutable once
//! uploaded, while the probe file is rewritten per request and is never
//! cached.

use crate::types::{Embedding, FaceVerifier, Verification, VerifierError};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const ARCFACE_INPUT_SIZE: usize = 112;
const ARCFACE_MEAN: f32 = 127.5;
const ARCFACE_STD: f32 = 127.5;
const ARCFACE_EMBEDDING_DIM: usize = 512;
const ARCFACE_MODEL_VERSION: &str = "w600k_r50";

/// Operating point for the verified flag. Pairs at or below this cosine
/// distance count as the same face; the caller applies its own accept
/// threshold on top.
const ARCFACE_VERIFIED_DISTANCE: f32 = 0.68;

/// ArcFace-based face verifier.
pub struct ArcFaceVerifier {
    session: Session,
    reference_cache: HashMap<PathBuf, Embedding>,
}

impl ArcFaceVerifier {
    /// Load the ArcFace ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, VerifierError> {
        if !Path::new(model_path).exists() {
            return Err(VerifierError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()
            .and_then(|b| b.with_intra_threads(2))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| VerifierError::Inference(e.to_string()))?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded ArcFace model"
        );

        Ok(Self {
            session,
            reference_cache: HashMap::new(),
        })
    }

    /// Extract an embedding from an image file.
    fn embed_file(&mut self, path: &Path) -> Result<Embedding, VerifierError> {
        let img = image::open(path)
            .map_err(|e| VerifierError::ImageLoad(format!("{}: {e}", path.display())))?;

        let gray = image::imageops::resize(
            &img.to_luma8(),
            ARCFACE_INPUT_SIZE as u32,
            ARCFACE_INPUT_SIZE as u32,
            image::imageops::FilterType::Triangle,
        );

        let input = Self::preprocess(gray.as_raw());

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())
                .map_err(|e| VerifierError::Inference(e.to_string()))?])
            .map_err(|e| VerifierError::Inference(e.to_string()))?;

        let (_, raw_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VerifierError::Inference(format!("embedding extraction: {e}")))?;

        let raw: Vec<f32> = raw_data.to_vec();

        if raw.len() != ARCFACE_EMBEDDING_DIM {
            return Err(VerifierError::Inference(format!(
                "expected {ARCFACE_EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        // L2-normalize the embedding
        let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        let values = if norm > 0.0 {
            raw.iter().map(|x| x / norm).collect()
        } else {
            raw
        };

        Ok(Embedding {
            values,
            model_version: Some(ARCFACE_MODEL_VERSION.to_string()),
        })
    }

    fn embed_reference(&mut self, path: &Path) -> Result<Embedding, VerifierError> {
        if let Some(cached) = self.reference_cache.get(path) {
            return Ok(cached.clone());
        }
        let embedding = self.embed_file(path)?;
        self.reference_cache
            .insert(path.to_path_buf(), embedding.clone());
        Ok(embedding)
    }

    /// Preprocess a 112x112 grayscale crop into a NCHW float tensor,
    /// replicating the single channel across all three inputs.
    fn preprocess(gray: &[u8]) -> Array4<f32> {
        let size = ARCFACE_INPUT_SIZE;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

        for y in 0..size {
            for x in 0..size {
                let pixel = gray.get(y * size + x).copied().unwrap_or(0) as f32;
                let normalized = (pixel - ARCFACE_MEAN) / ARCFACE_STD;
                for c in 0..3 {
                    tensor[[0, c, y, x]] = normalized;
                }
            }
        }

        tensor
    }
}

impl FaceVerifier for ArcFaceVerifier {
    fn verify(&mut self, reference: &Path, probe: &Path) -> Result<Verification, VerifierError> {
        let reference_embedding = self.embed_reference(reference)?;
        let probe_embedding = self.embed_file(probe)?;

        let distance = reference_embedding.distance(&probe_embedding);
        Ok(Verification {
            verified: distance <= ARCFACE_VERIFIED_DISTANCE,
            distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_shape_and_normalization() {
        let gray = vec![255u8; ARCFACE_INPUT_SIZE * ARCFACE_INPUT_SIZE];
        let tensor = ArcFaceVerifier::preprocess(&gray);
        assert_eq!(tensor.shape(), &[1, 3, 112, 112]);
        // (255 - 127.5) / 127.5 = 1.0, replicated across channels
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!((tensor[[0, 2, 111, 111]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_mid_gray_is_near_zero() {
        let gray = vec![128u8; ARCFACE_INPUT_SIZE * ARCFACE_INPUT_SIZE];
        let tensor = ArcFaceVerifier::preprocess(&gray);
        assert!(tensor[[0, 1, 50, 50]].abs() < 0.01);
    }
}
