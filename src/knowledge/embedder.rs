//! Text embedders for the statute index

use anyhow::{Context, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Dimension of sentence-transformers/all-MiniLM-L6-v2
pub const MINILM_DIMENSION: usize = 384;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. Output vectors are L2-normalised.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn dimension(&self) -> usize;
}

pub fn normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vec.iter_mut() {
            *x /= norm;
        }
    }
}

pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// all-MiniLM-L6-v2 via fastembed. The ONNX model is loaded on first use.
pub struct FastEmbedder {
    model: Mutex<Option<TextEmbedding>>,
}

impl FastEmbedder {
    pub fn new() -> Self {
        Self { model: Mutex::new(None) }
    }
}

impl Default for FastEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut guard = self.model.lock().await;
        if guard.is_none() {
            info!("Initializing embedding model (all-MiniLM-L6-v2)...");
            let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
                .context("Failed to initialize embedding model")?;
            *guard = Some(model);
        }
        let model = guard.as_mut().context("Embedding model unavailable")?;

        let mut embeddings = model
            .embed(texts.to_vec(), None)
            .context("Embedding batch failed")?;
        for emb in &mut embeddings {
            normalize(emb);
        }
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        MINILM_DIMENSION
    }
}

/// Deterministic feature-hashing embedder.
///
/// Lexical only: texts sharing words score higher. Used when the ONNX
/// model cannot be fetched and by the offline test suite.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        if dimension == 0 {
            warn!("HashingEmbedder with zero dimension; falling back to {}", MINILM_DIMENSION);
        }
        Self { dimension: if dimension == 0 { MINILM_DIMENSION } else { dimension } }
    }

    fn djb2(token: &str) -> u32 {
        token
            .bytes()
            .fold(5381u32, |hash, b| hash.wrapping_mul(33).wrapping_add(b as u32))
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimension];
        let lower = text.to_lowercase();
        for token in lower.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let idx = Self::djb2(token) as usize % self.dimension;
            vec[idx] += 1.0;
        }
        normalize(&mut vec);
        vec
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(MINILM_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hashing_embedder_is_normalized_and_deterministic() {
        let embedder = HashingEmbedder::new(64);
        let texts = vec!["Theft of property".to_string(), "theft OF property".to_string()];
        let out = embedder.embed(&texts).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), 64);
        assert_eq!(out[0], out[1]);
        let norm: f32 = out[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_hashing_embedder_similarity_ordering() {
        let embedder = HashingEmbedder::default();
        let out = embedder
            .embed(&[
                "punishment for theft".to_string(),
                "theft of movable property".to_string(),
                "kidnapping from lawful guardianship".to_string(),
            ])
            .await
            .unwrap();
        assert!(dot_product(&out[0], &out[1]) > dot_product(&out[0], &out[2]));
    }

    #[tokio::test]
    async fn test_empty_text_stays_zero() {
        let out = HashingEmbedder::new(8).embed(&["   ".to_string()]).await.unwrap();
        assert!(out[0].iter().all(|x| *x == 0.0));
    }
}
