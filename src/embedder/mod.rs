//! Face-embedding model collaborator.
//!
//! The matching core only needs `image bytes -> fixed-length finite vector`,
//! deterministic for a fixed model and input. [`LocalEmbedder`] implements
//! that contract with a projection model loaded once, eagerly, at state
//! construction; the loaded weights are immutable and shared read-only by
//! concurrent verification calls. The CPU-bound embedding computation runs
//! in `spawn_blocking` so a single inference never serializes the request
//! loop, and callers await the result before proceeding.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("cannot decode image")]
    UnreadableImage,

    #[error("embedding computation failed: {0}")]
    Internal(String),
}

/// Black-box embedding model. `embed` must be deterministic per input and
/// produce a vector of exactly `dim()` finite values.
#[async_trait::async_trait]
pub trait FaceEmbedder: Send + Sync {
    fn dim(&self) -> usize;

    async fn embed(&self, image: &[u8]) -> Result<Vec<f32>, EmbedError>;
}

/// Number of input features extracted per image (one per byte value).
const FEATURES: usize = 256;

/// In-process projection model backed by a raw little-endian `f32` weights
/// file of `dim * 256` values.
pub struct LocalEmbedder {
    weights: Arc<Vec<f32>>,
    dim: usize,
}

impl LocalEmbedder {
    /// Load weights from disk. Called once during state construction;
    /// startup fails loudly when the file is missing or the wrong size.
    pub fn load(weights_path: &str, dim: usize) -> Result<Self> {
        let path = Path::new(weights_path);
        let raw = std::fs::read(path).with_context(|| {
            format!(
                "Failed to read model weights: {} (set [face].model_weights_path)",
                path.display()
            )
        })?;

        let expected = dim * FEATURES * 4;
        if raw.len() != expected {
            anyhow::bail!(
                "Model weights size mismatch: {} has {} bytes, expected {} for dim {}",
                path.display(),
                raw.len(),
                expected,
                dim
            );
        }

        let weights: Vec<f32> = raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        if !weights.iter().all(|w| w.is_finite()) {
            anyhow::bail!("Model weights contain non-finite values");
        }

        info!(
            "Embedding model loaded: {} ({}x{} projection)",
            path.display(),
            dim,
            FEATURES
        );

        Ok(Self {
            weights: Arc::new(weights),
            dim,
        })
    }
}

#[async_trait::async_trait]
impl FaceEmbedder for LocalEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, image: &[u8]) -> Result<Vec<f32>, EmbedError> {
        let weights = Arc::clone(&self.weights);
        let dim = self.dim;
        let image = image.to_vec();

        tokio::task::spawn_blocking(move || {
            if !looks_like_image(&image) {
                return Err(EmbedError::UnreadableImage);
            }
            Ok(project(&weights, dim, &features(&image)))
        })
        .await
        .map_err(|e| EmbedError::Internal(format!("embedding task panicked: {e}")))?
    }
}

/// Accepted container signatures: JPEG, PNG, WEBP.
fn looks_like_image(bytes: &[u8]) -> bool {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return true;
    }
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return true;
    }
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP"
}

/// Normalized byte histogram of the payload.
fn features(bytes: &[u8]) -> [f32; FEATURES] {
    let mut hist = [0f32; FEATURES];
    for b in bytes {
        hist[*b as usize] += 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let total = bytes.len() as f32;
    for v in &mut hist {
        *v /= total;
    }
    hist
}

/// Dense projection followed by L2 normalization.
fn project(weights: &[f32], dim: usize, input: &[f32; FEATURES]) -> Vec<f32> {
    let mut out = vec![0f32; dim];
    for (d, slot) in out.iter_mut().enumerate() {
        let row = &weights[d * FEATURES..(d + 1) * FEATURES];
        *slot = row.iter().zip(input.iter()).map(|(w, x)| w * x).sum();
    }

    let norm: f32 = out.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in &mut out {
            *v /= norm;
        }
    }
    out
}
