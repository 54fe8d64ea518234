//! Embedding provider seam.
//!
//! The engine never computes embeddings itself — hosts inject a provider.
//! Calls are async because real providers sit behind a network; the
//! coordinator wraps every call in its per-call timeout.
//!
//! Two built-in providers cover tests and development:
//! [`HashEmbeddingProvider`] (deterministic unit vectors derived from the
//! text, so identical text always embeds identically) and
//! [`StubEmbeddingProvider`] (all-zero vectors, useful for exercising
//! degenerate-embedding contract errors).

use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Embedding;

/// Produces dense embeddings for natural-language text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed several texts. The default maps [`embed`](Self::embed) over the
    /// batch; network-backed providers can override with one round trip.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Dimensionality of produced embeddings.
    fn dimensions(&self) -> usize;

    /// Provider/model name for logging.
    fn model_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Built-in providers
// ---------------------------------------------------------------------------

/// Deterministic test provider: hashes the text into an L2-normalized
/// vector. Identical text always produces the identical embedding, distinct
/// texts almost surely differ.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    /// A provider emitting vectors of `dimensions` components.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(8)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut values = Vec::with_capacity(self.dimensions);
        for dim in 0..self.dimensions {
            let mut hasher = std::hash::DefaultHasher::new();
            dim.hash(&mut hasher);
            text.hash(&mut hasher);
            // Map the 64-bit hash onto [-1, 1].
            let unit = hasher.finish() as f64 / u64::MAX as f64;
            values.push((unit * 2.0 - 1.0) as f32);
        }
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm < f32::EPSILON {
            // Astronomically unlikely, but the contract forbids zero vectors.
            values[0] = 1.0;
        } else {
            for v in &mut values {
                *v /= norm;
            }
        }
        Ok(Embedding(values))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "hash-deterministic"
    }
}

/// Always returns zero vectors. Every similarity computed against its output
/// fails with a degenerate-embedding error, which is exactly what contract
/// tests want to provoke.
#[derive(Debug, Clone, Default)]
pub struct StubEmbeddingProvider {
    dimensions: usize,
}

impl StubEmbeddingProvider {
    /// A stub emitting zero vectors of `dimensions` components.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbeddingProvider {
    async fn embed(&self, _text: &str) -> Result<Embedding> {
        Ok(Embedding(vec![0.0; self.dimensions]))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "stub-zero"
    }
}
