use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tablesafe_core::config::EmbeddingConfig;

/// Text-to-vector backend. Implementations must be safe to share
/// across concurrent requests.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Ollama `/api/embeddings` backend.
pub struct OllamaEmbeddingClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("could not build embedding http client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&EmbeddingRequest { model: &self.model, prompt: text })
            .send()
            .await
            .with_context(|| format!("embedding request to {url} failed"))?
            .error_for_status()
            .context("embedding backend returned an error status")?;

        let parsed: EmbeddingResponse =
            response.json().await.context("embedding response was not valid JSON")?;
        if parsed.embedding.is_empty() {
            bail!("embedding backend returned an empty vector");
        }
        Ok(parsed.embedding)
    }
}

/// Cosine similarity in [-1, 1]. Mismatched or zero-norm inputs score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::cosine_similarity;

    #[test]
    fn identical_vectors_score_one() {
        let similarity = cosine_similarity(&[0.6, 0.8], &[0.6, 0.8]);
        assert!((similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        let similarity = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((similarity + 1.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_inputs_score_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
