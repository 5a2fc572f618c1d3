use std::time::Duration;

use crate::core::embedding::{Embedding, EmbeddingBackend, ExtractionError};

/// In-memory embedding cache keyed by content hash.
///
/// Re-classifying the same image (batch retries, threshold sweeps) skips
/// the backend round-trip entirely. Keys are blake3 digests of the raw
/// bytes, so renamed files still hit.
pub struct EmbeddingCache {
    inner: moka::future::Cache<String, Embedding>,
}

impl EmbeddingCache {
    pub fn new(capacity: u64, ttl_secs: u64) -> Self {
        let inner = moka::future::CacheBuilder::new(capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();
        Self { inner }
    }

    /// Return the cached embedding for these bytes, or compute it through
    /// the backend and remember it. Errors are never cached.
    pub async fn get_or_embed(
        &self,
        backend: &dyn EmbeddingBackend,
        image: &[u8],
    ) -> Result<Embedding, ExtractionError> {
        let key = content_key(image);

        if let Some(embedding) = self.inner.get(&key).await {
            tracing::trace!("embedding cache hit: {}", key);
            return Ok(embedding);
        }

        let embedding = backend.embed_image(image).await?;
        self.inner.insert(key, embedding.clone()).await;
        Ok(embedding)
    }

    pub async fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

fn content_key(image: &[u8]) -> String {
    blake3::hash(image).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingBackend for CountingBackend {
        fn name(&self) -> &str {
            "counting"
        }

        fn supports_text(&self) -> bool {
            false
        }

        async fn embed_image(&self, image: &[u8]) -> Result<Embedding, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if image.is_empty() {
                return Err(ExtractionError::UnreadableInput("empty".to_string()));
            }
            Embedding::new(vec![1.0, image.len() as f32])
        }
    }

    #[tokio::test]
    async fn test_second_lookup_hits_cache() {
        let backend = CountingBackend {
            calls: AtomicUsize::new(0),
        };
        let cache = EmbeddingCache::new(10, 60);

        let first = cache.get_or_embed(&backend, b"same bytes").await.unwrap();
        let second = cache.get_or_embed(&backend, b"same bytes").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_bytes_miss() {
        let backend = CountingBackend {
            calls: AtomicUsize::new(0),
        };
        let cache = EmbeddingCache::new(10, 60);

        cache.get_or_embed(&backend, b"one").await.unwrap();
        cache.get_or_embed(&backend, b"two").await.unwrap();

        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let backend = CountingBackend {
            calls: AtomicUsize::new(0),
        };
        let cache = EmbeddingCache::new(10, 60);

        assert!(cache.get_or_embed(&backend, b"").await.is_err());
        assert!(cache.get_or_embed(&backend, b"").await.is_err());

        // Both attempts reached the backend
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }
}
