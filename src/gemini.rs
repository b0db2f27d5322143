//! Google Gemini REST client (embeddings and text generation).

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

use crate::ask::{GenerationError, TextGenerator};
use crate::embedding::{Embedder, EmbeddingError};

const API_VERSION: &str = "v1beta";

/// Client bound to one embedding model and one generation model.
pub struct GeminiClient {
    http: reqwest::Client,
    embed_endpoint: String,
    generate_endpoint: String,
    embedding_model: String,
}

impl GeminiClient {
    pub fn new(
        api_key: &str,
        base_url: &Url,
        embedding_model: &str,
        generation_model: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Google API key");

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key.trim()).context("invalid Google API key")?,
        );
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Gemini HTTP client")?;

        let base = base_url.as_str().trim_end_matches('/');
        let embedding_model = embedding_model.trim_start_matches("models/");
        let generation_model = generation_model.trim_start_matches("models/");

        Ok(Self {
            http,
            embed_endpoint: format!("{base}/{API_VERSION}/models/{embedding_model}:embedContent"),
            generate_endpoint: format!(
                "{base}/{API_VERSION}/models/{generation_model}:generateContent"
            ),
            embedding_model: format!("models/{embedding_model}"),
        })
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, if it has any.
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbedRequest {
            model: &self.embedding_model,
            content: Content {
                role: None,
                parts: [Part { text }],
            },
        };

        let resp = self
            .http
            .post(&self.embed_endpoint)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status { status, body });
        }

        let parsed: EmbedResponse = resp.json().await?;
        if parsed.embedding.values.is_empty() {
            return Err(EmbeddingError::Empty);
        }
        trace!(dimension = parsed.embedding.values.len(), "embedded text");
        Ok(parsed.embedding.values)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, GenerationError> {
        let request = GenerateRequest {
            contents: [Content {
                role: Some("user"),
                parts: [Part { text: prompt }],
            }],
        };

        let resp = self
            .http
            .post(&self.generate_endpoint)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status, body });
        }

        let parsed: GenerateResponse = resp.json().await?;
        let text = parsed.into_text();
        debug!(has_text = text.is_some(), "generation finished");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;

    fn client(server: &MockServer) -> GeminiClient {
        let base = Url::parse(&server.base_url()).unwrap();
        GeminiClient::new(
            "test-key",
            &base,
            "text-embedding-004",
            "models/gemini-1.5-flash",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_embed_returns_values() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/text-embedding-004:embedContent")
                    .header("x-goog-api-key", "test-key")
                    .json_body(json!({
                        "model": "models/text-embedding-004",
                        "content": { "parts": [{ "text": "Great class" }] }
                    }));
                then.status(200)
                    .json_body(json!({ "embedding": { "values": [0.1, 0.2, 0.3] } }));
            })
            .await;

        let values = client(&server).embed("Great class").await.unwrap();
        assert_eq!(values, vec![0.1, 0.2, 0.3]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_quota_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(429).body("RESOURCE_EXHAUSTED");
            })
            .await;

        let err = client(&server).embed("text").await.unwrap_err();
        match err {
            EmbeddingError::Status { status, body } => {
                assert_eq!(status.as_u16(), 429);
                assert_eq!(body, "RESOURCE_EXHAUSTED");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_embed_empty_vector_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({ "embedding": {} }));
            })
            .await;

        let err = client(&server).embed("text").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Empty));
    }

    #[tokio::test]
    async fn test_generate_joins_first_candidate_parts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-1.5-flash:generateContent");
                then.status(200).json_body(json!({
                    "candidates": [
                        { "content": { "role": "model", "parts": [{ "text": "Take " }, { "text": "Dr. Doe." }] } },
                        { "content": { "role": "model", "parts": [{ "text": "ignored" }] } }
                    ]
                }));
            })
            .await;

        let text = client(&server).generate("who?").await.unwrap();
        assert_eq!(text.as_deref(), Some("Take Dr. Doe."));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_without_candidates() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({ "candidates": [] }));
            })
            .await;

        assert_eq!(client(&server).generate("who?").await.unwrap(), None);
    }

    #[test]
    fn test_blank_key_rejected() {
        let base = Url::parse("http://localhost").unwrap();
        let result = GeminiClient::new("  ", &base, "m", "g", Duration::from_secs(1));
        assert!(result.is_err());
    }
}
