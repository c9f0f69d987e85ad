use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Embedder;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Feature-hashing embedder using FNV-1a. No model, fully deterministic:
/// texts sharing words land close together.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dim: 384 }
    }
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        anyhow::ensure!(dim > 0, "embedding dimension must be positive");
        Ok(Self { dim })
    }

    /// Embed a single text into an L2-normalized vector.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        let lower = text.to_lowercase();
        for token in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dim as u64) as usize;
            // High bit picks the sign so collisions partly cancel
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Async embeddings client for OpenAI-compatible `/embeddings` endpoints.
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimensions: Option<usize>,
}

impl HttpEmbedder {
    pub fn new(
        base_url: &str,
        model: String,
        api_key: Option<String>,
        dimensions: Option<usize>,
    ) -> Result<Self> {
        anyhow::ensure!(!base_url.trim().is_empty(), "missing embeddings base URL");
        anyhow::ensure!(!model.trim().is_empty(), "missing embeddings model name");
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create embeddings HTTP client")?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            model,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            dimensions,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimensions,
        };
        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.context("Embeddings request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            anyhow::bail!("Embeddings request failed ({}): {}", status, text);
        }

        let mut parsed: EmbeddingResponse = resp
            .json()
            .await
            .context("Failed to parse embeddings response")?;
        parsed.data.sort_by_key(|entry| entry.index);
        anyhow::ensure!(
            parsed.data.len() == texts.len(),
            "endpoint returned {} embeddings for {} inputs",
            parsed.data.len(),
            texts.len()
        );
        debug!(count = texts.len(), model = %self.model, "embedded batch");
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Embedding backend selected at startup.
pub enum EmbedBackend {
    Hash(HashEmbedder),
    Http(HttpEmbedder),
}

impl EmbedBackend {
    /// HTTP backend when `EMBED_BASE_URL` is set, hash embedder otherwise.
    pub fn from_env() -> Result<Self> {
        let dim = match dotenv::var("EMBED_DIM") {
            Ok(raw) => Some(
                raw.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid EMBED_DIM: {}", raw))?,
            ),
            Err(_) => None,
        };

        match dotenv::var("EMBED_BASE_URL").ok().filter(|u| !u.trim().is_empty()) {
            Some(base_url) => {
                let model = dotenv::var("EMBED_MODEL")
                    .unwrap_or_else(|_| "text-embedding-3-small".to_string());
                let api_key = dotenv::var("EMBED_API_KEY").ok();
                Ok(Self::Http(HttpEmbedder::new(&base_url, model, api_key, dim)?))
            }
            None => Ok(Self::Hash(match dim {
                Some(dim) => HashEmbedder::new(dim)?,
                None => HashEmbedder::default(),
            })),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EmbedBackend::Hash(_) => "hash",
            EmbedBackend::Http(_) => "http",
        }
    }
}

impl Embedder for EmbedBackend {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        match self {
            EmbedBackend::Hash(e) => e.embed(texts).await,
            EmbedBackend::Http(e) => e.embed(texts).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::cosine_similarity;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_hash_embedding_is_deterministic_and_normalized() {
        let embedder = HashEmbedder::new(64).unwrap();
        let a = embedder.embed_text("Python basics: variables and loops");
        let b = embedder.embed_text("Python basics: variables and loops");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hash_embedding_shared_words_are_closer() {
        let embedder = HashEmbedder::default();
        let query = embedder.embed_text("python basics");
        let near = embedder.embed_text("An introduction to Python basics");
        let far = embedder.embed_text("Concurrent generators and decorators");
        assert!(cosine_similarity(&query, &near) > cosine_similarity(&query, &far));
    }

    #[test]
    fn test_hash_embedding_empty_text() {
        let v = HashEmbedder::new(8).unwrap().embed_text("   ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(HashEmbedder::new(0).is_err());
    }

    async fn mock_embeddings(status: u16, body: serde_json::Value) -> (MockServer, HttpEmbedder) {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/embeddings")
                    .header("authorization", "Bearer sk-test");
                then.status(status).json_body(body);
            })
            .await;
        let embedder = HttpEmbedder::new(
            &server.url("/v1"),
            "text-embedding-3-small".to_string(),
            Some("sk-test".to_string()),
            None,
        )
        .unwrap();
        (server, embedder)
    }

    #[tokio::test]
    async fn test_http_embeddings_sorted_by_index() {
        let (_server, embedder) = mock_embeddings(
            200,
            json!({"data": [
                {"embedding": [0.0, 1.0], "index": 1},
                {"embedding": [1.0, 0.0], "index": 0}
            ]}),
        )
        .await;

        let vectors = embedder.embed(&["first", "second"]).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_http_embeddings_count_mismatch() {
        let (_server, embedder) = mock_embeddings(
            200,
            json!({"data": [{"embedding": [1.0, 0.0], "index": 0}]}),
        )
        .await;

        let err = embedder.embed(&["first", "second"]).await.unwrap_err();
        assert!(err.to_string().contains("1 embeddings for 2 inputs"));
    }

    #[tokio::test]
    async fn test_http_embeddings_error_status() {
        let (_server, embedder) =
            mock_embeddings(500, json!({"error": {"message": "overloaded"}})).await;

        let err = embedder.embed(&["first"]).await.unwrap_err();
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn test_http_embeddings_empty_input_skips_request() {
        let (_server, embedder) = mock_embeddings(500, json!({})).await;
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_embed_one() {
        let embedder = HashEmbedder::new(16).unwrap();
        let v = embedder.embed_one("loops").await.unwrap();
        assert_eq!(v, embedder.embed_text("loops"));
    }
}
