use async_trait::async_trait;
use thiserror::Error;

/// Errors from the embedding backend
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unreadable image input: {0}")]
    UnreadableInput(String),

    #[error("embedding backend request failed: {0}")]
    Backend(String),

    #[error("embedding backend returned a malformed vector: {0}")]
    MalformedVector(String),

    #[error("embedding request timed out")]
    Timeout,

    #[error("backend does not support text embeddings")]
    TextUnsupported,
}

/// A fixed-length, L2-normalized feature vector.
///
/// Normalization happens once at construction so cosine similarity
/// reduces to a plain dot product everywhere downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Result<Self, ExtractionError> {
        if values.is_empty() {
            return Err(ExtractionError::MalformedVector("empty vector".to_string()));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ExtractionError::MalformedVector(
                "non-finite component".to_string(),
            ));
        }

        let norm = values.iter().map(|v| (*v as f64).powi(2)).sum::<f64>().sqrt();
        if norm <= f64::EPSILON {
            return Err(ExtractionError::MalformedVector("zero-norm vector".to_string()));
        }

        let normalized = values.iter().map(|v| (*v as f64 / norm) as f32).collect();
        Ok(Self(normalized))
    }

    /// Cosine similarity against another normalized embedding.
    ///
    /// Mismatched dimensions score 0.0 rather than panicking; that only
    /// happens when embeddings from different backends are mixed.
    pub fn cosine(&self, other: &Embedding) -> f64 {
        if self.0.len() != other.0.len() {
            tracing::warn!(
                "comparing embeddings of different dimensions ({} vs {})",
                self.0.len(),
                other.0.len()
            );
            return 0.0;
        }

        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| *a as f64 * *b as f64)
            .sum()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.0
    }
}

/// Capability contract an embedding backend must satisfy.
///
/// Backends with a joint image/text space (CLIP-style) report
/// `supports_text() == true` and implement `embed_text`; unimodal
/// backends leave the default, and personality/interest scoring falls
/// back to keyword matching.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Backend identifier recorded on model versions
    fn name(&self) -> &str;

    /// Whether image and text embeddings share a comparable space
    fn supports_text(&self) -> bool;

    async fn embed_image(&self, image: &[u8]) -> Result<Embedding, ExtractionError>;

    async fn embed_text(&self, _text: &str) -> Result<Embedding, ExtractionError> {
        Err(ExtractionError::TextUnsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_is_normalized() {
        let e = Embedding::new(vec![3.0, 4.0]).unwrap();
        let norm: f64 = e.as_slice().iter().map(|v| (*v as f64).powi(2)).sum();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_of_identical_vectors_is_one() {
        let a = Embedding::new(vec![1.0, 2.0, 3.0]).unwrap();
        let b = Embedding::new(vec![1.0, 2.0, 3.0]).unwrap();
        assert!((a.cosine(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_of_orthogonal_vectors_is_zero() {
        let a = Embedding::new(vec![1.0, 0.0]).unwrap();
        let b = Embedding::new(vec![0.0, 1.0]).unwrap();
        assert!(a.cosine(&b).abs() < 1e-6);
    }

    #[test]
    fn test_mismatched_dimensions_score_zero() {
        let a = Embedding::new(vec![1.0, 0.0]).unwrap();
        let b = Embedding::new(vec![1.0, 0.0, 0.0]).unwrap();
        assert_eq!(a.cosine(&b), 0.0);
    }

    #[test]
    fn test_rejects_degenerate_vectors() {
        assert!(Embedding::new(vec![]).is_err());
        assert!(Embedding::new(vec![0.0, 0.0]).is_err());
        assert!(Embedding::new(vec![f32::NAN, 1.0]).is_err());
    }
}
