//! Face-embedding comparison.
//!
//! The decision procedure is deliberately simple: Euclidean distance between
//! the query and the stored embedding, matched against a process-wide
//! threshold. Smaller threshold = stricter matching. The threshold is
//! configuration, never user input.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("invalid embedding: empty or non-finite values")]
    InvalidEmbedding,

    #[error("embedding dimensionality mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// Reject empty vectors and vectors containing NaN or infinity.
pub fn validate(embedding: &[f32]) -> Result<(), MatchError> {
    if embedding.is_empty() || !embedding.iter().all(|v| v.is_finite()) {
        return Err(MatchError::InvalidEmbedding);
    }
    Ok(())
}

/// Euclidean (L2) distance between two embeddings of equal length.
pub fn distance(a: &[f32], b: &[f32]) -> Result<f64, MatchError> {
    if a.len() != b.len() {
        return Err(MatchError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum();

    Ok(sum.sqrt())
}

/// Match decision: accepted when the distance does not exceed the threshold.
#[must_use]
pub fn is_match(distance: f64, threshold: f64) -> bool {
    distance <= threshold
}
