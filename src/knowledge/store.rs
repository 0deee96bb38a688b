//! Persistent vector collection
//!
//! A collection is a flat list of embedded documents held in RAM and
//! persisted as bincode inside zstd at `{persist_dir}/{collection}.bin.zst`.
//! Search is an exhaustive dot-product scan parallelised with rayon, which
//! is ample for the few hundred sections of the IPC.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::document::{Document, MetadataFilter, ScoredDocument};
use super::embedder::{dot_product, Embedder};

const COLLECTION_EXT: &str = "bin.zst";

pub struct VectorStore {
    persist_dir: PathBuf,
    collection: String,
    embedder: Arc<dyn Embedder>,
    documents: RwLock<Vec<Document>>,
}

impl VectorStore {
    /// Open a collection, loading it from disk when it exists.
    pub fn open(
        persist_dir: impl Into<PathBuf>,
        collection: impl Into<String>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let persist_dir = persist_dir.into();
        let collection = collection.into();
        let path = Self::collection_path(&persist_dir, &collection);

        let documents = if path.exists() {
            let file = File::open(&path)
                .with_context(|| format!("Failed to open collection at {:?}", path))?;
            let decoder = zstd::stream::read::Decoder::new(file)?;
            let docs: Vec<Document> = bincode::deserialize_from(decoder)
                .with_context(|| format!("Corrupt collection file {:?}", path))?;
            info!("Loaded {} documents from collection '{}'", docs.len(), collection);
            docs
        } else {
            debug!("No collection file at {:?}; starting empty", path);
            Vec::new()
        };

        Ok(Self {
            persist_dir,
            collection,
            embedder,
            documents: RwLock::new(documents),
        })
    }

    pub fn collection_path(persist_dir: &Path, collection: &str) -> PathBuf {
        persist_dir.join(format!("{}.{}", collection, COLLECTION_EXT))
    }

    /// Whether a persisted collection exists on disk.
    pub fn exists(persist_dir: &Path, collection: &str) -> bool {
        Self::collection_path(persist_dir, collection).exists()
    }

    /// Delete the whole persist directory.
    pub fn reset(persist_dir: &Path) -> Result<()> {
        if persist_dir.exists() {
            info!("Removing existing database at {:?}...", persist_dir);
            std::fs::remove_dir_all(persist_dir)
                .with_context(|| format!("Failed to remove {:?}", persist_dir))?;
        }
        Ok(())
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    pub fn persist_dir(&self) -> &Path {
        &self.persist_dir
    }

    /// Embed and insert documents. Documents with an existing id replace the old entry.
    pub async fn add_documents(&self, mut docs: Vec<Document>) -> Result<usize> {
        if docs.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = docs.iter().map(|d| d.page_content.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != docs.len() {
            anyhow::bail!(
                "Embedder returned {} vectors for {} documents",
                embeddings.len(),
                docs.len()
            );
        }
        for (doc, emb) in docs.iter_mut().zip(embeddings) {
            doc.embedding = Some(emb);
        }

        let count = docs.len();
        let mut stored = self.documents.write().await;
        for doc in docs {
            stored.retain(|d| d.id != doc.id);
            stored.push(doc);
        }
        Ok(count)
    }

    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredDocument>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let docs = self.documents.read().await;
        if docs.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .context("No embedding for query")?;

        let mut scored: Vec<(f32, &Document)> = docs
            .par_iter()
            .filter(|d| filter.map_or(true, |f| f.matches(&d.metadata)))
            .filter_map(|d| {
                let emb = d.embedding.as_ref()?;
                if emb.len() != query_embedding.len() {
                    return None;
                }
                Some((dot_product(&query_embedding, emb), d))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, doc)| ScoredDocument { document: doc.clone(), score })
            .collect())
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Write the collection to disk via a temp file and rename.
    pub async fn persist(&self) -> Result<()> {
        let snapshot = self.documents.read().await.clone();
        let dir = self.persist_dir.clone();
        let path = Self::collection_path(&self.persist_dir, &self.collection);
        let count = snapshot.len();

        tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create persist directory {:?}", dir))?;
            let tmp = path.with_extension("tmp");
            {
                let file = File::create(&tmp)?;
                let writer = BufWriter::new(file);
                let mut encoder = zstd::stream::write::Encoder::new(writer, 3)?;
                bincode::serialize_into(&mut encoder, &snapshot)?;
                encoder.finish()?;
            }
            std::fs::rename(&tmp, &path)?;
            Ok::<(), anyhow::Error>(())
        })
        .await??;

        if count == 0 {
            warn!("Persisted empty collection '{}'", self.collection);
        } else {
            debug!("Persisted {} documents to collection '{}'", count, self.collection);
        }
        Ok(())
    }
}
