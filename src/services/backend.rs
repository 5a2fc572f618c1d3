use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::core::embedding::{Embedding, EmbeddingBackend, ExtractionError};

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Embedding backend talking to a remote inference server.
///
/// Images go up as raw bytes, text as JSON; both come back as a single
/// `{"embedding": [...]}` vector. Whether the server exposes a joint
/// image/text space is declared in configuration, not detected at runtime.
pub struct RemoteEmbeddingBackend {
    client: Client,
    base_url: String,
    model: String,
    text_capable: bool,
}

impl RemoteEmbeddingBackend {
    pub fn new(
        base_url: String,
        model: String,
        text_capable: bool,
        timeout_secs: u64,
    ) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractionError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            text_capable,
        })
    }

    fn map_error(e: reqwest::Error) -> ExtractionError {
        if e.is_timeout() {
            ExtractionError::Timeout
        } else {
            ExtractionError::Backend(e.to_string())
        }
    }

    async fn parse_response(response: reqwest::Response) -> Result<Embedding, ExtractionError> {
        if !response.status().is_success() {
            return Err(ExtractionError::Backend(format!(
                "inference server returned {}",
                response.status()
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::MalformedVector(e.to_string()))?;

        Embedding::new(body.embedding)
    }
}

#[async_trait]
impl EmbeddingBackend for RemoteEmbeddingBackend {
    fn name(&self) -> &str {
        &self.model
    }

    fn supports_text(&self) -> bool {
        self.text_capable
    }

    async fn embed_image(&self, image: &[u8]) -> Result<Embedding, ExtractionError> {
        let url = format!("{}/embed/image?model={}", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .map_err(Self::map_error)?;

        Self::parse_response(response).await
    }

    async fn embed_text(&self, text: &str) -> Result<Embedding, ExtractionError> {
        if !self.text_capable {
            return Err(ExtractionError::TextUnsupported);
        }

        let url = format!("{}/embed/text", self.base_url);
        let body = serde_json::json!({ "model": self.model, "text": text });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_error)?;

        Self::parse_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_for(server: &mockito::ServerGuard, text_capable: bool) -> RemoteEmbeddingBackend {
        RemoteEmbeddingBackend::new(server.url(), "clip-vit-b32".to_string(), text_capable, 5)
            .unwrap()
    }

    #[tokio::test]
    async fn test_embed_image_parses_and_normalizes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embed/image?model=clip-vit-b32")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embedding": [3.0, 4.0]}"#)
            .create_async()
            .await;

        let backend = backend_for(&server, true);
        let embedding = backend.embed_image(b"fake image bytes").await.unwrap();

        assert_eq!(embedding.as_slice(), &[0.6, 0.8]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_maps_to_backend_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embed/image?model=clip-vit-b32")
            .with_status(500)
            .create_async()
            .await;

        let backend = backend_for(&server, true);
        let result = backend.embed_image(b"bytes").await;

        assert!(matches!(result, Err(ExtractionError::Backend(_))));
    }

    #[tokio::test]
    async fn test_zero_vector_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embed/image?model=clip-vit-b32")
            .with_status(200)
            .with_body(r#"{"embedding": [0.0, 0.0]}"#)
            .create_async()
            .await;

        let backend = backend_for(&server, true);
        let result = backend.embed_image(b"bytes").await;

        assert!(matches!(result, Err(ExtractionError::MalformedVector(_))));
    }

    #[tokio::test]
    async fn test_embed_text_requires_capability() {
        let server = mockito::Server::new_async().await;
        let backend = backend_for(&server, false);

        let result = backend.embed_text("a person who is kind").await;
        assert!(matches!(result, Err(ExtractionError::TextUnsupported)));
    }

    #[tokio::test]
    async fn test_embed_text_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embed/text")
            .with_status(200)
            .with_body(r#"{"embedding": [1.0, 0.0, 0.0]}"#)
            .create_async()
            .await;

        let backend = backend_for(&server, true);
        let embedding = backend.embed_text("a person who is kind").await.unwrap();

        assert_eq!(embedding.len(), 3);
        mock.assert_async().await;
    }
}
