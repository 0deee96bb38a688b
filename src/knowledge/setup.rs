//! Statute index builder
//!
//! Loads the IPC dataset, turns every section into a searchable document,
//! embeds and persists the collection, then runs a handful of smoke queries.

use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use super::document::{prepare_document, Document};
use super::embedder::Embedder;
use super::section::{parse_sections, IpcSection};
use super::store::VectorStore;
use crate::config::{AppConfig, ConfigError};

pub const SMOKE_QUERIES: [&str; 5] = [
    "murder and homicide",
    "theft of property",
    "assault and hurt",
    "cheating and fraud",
    "kidnapping",
];

#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("IPC JSON file not found at {0:?}")]
    DatasetNotFound(PathBuf),
    #[error("Failed to read IPC JSON: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse IPC JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Vector store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Top hits of one smoke query as `(section, title)` pairs
pub type SmokeResult = (String, Vec<(String, String)>);

#[derive(Debug)]
pub struct SetupSummary {
    pub documents: usize,
    pub location: PathBuf,
    pub collection: String,
    pub smoke_results: Vec<SmokeResult>,
}

pub struct IpcVectorDbSetup {
    ipc_json_path: PathBuf,
    persist_directory: PathBuf,
    collection_name: String,
    embedder: Arc<dyn Embedder>,
    show_progress: bool,
}

impl IpcVectorDbSetup {
    pub fn new(
        ipc_json_path: impl Into<PathBuf>,
        persist_directory: impl Into<PathBuf>,
        collection_name: impl Into<String>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            ipc_json_path: ipc_json_path.into(),
            persist_directory: persist_directory.into(),
            collection_name: collection_name.into(),
            embedder,
            show_progress: false,
        }
    }

    /// Build from environment configuration; fails when required paths are unset.
    pub fn from_config(config: &AppConfig, embedder: Arc<dyn Embedder>) -> Result<Self, SetupError> {
        Ok(Self::new(
            config.require_ipc_json_path()?.clone(),
            config.require_persist_directory()?.clone(),
            config.collection_name.clone(),
            embedder,
        ))
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn load_ipc_data(&self) -> Result<Vec<IpcSection>, SetupError> {
        info!("Loading IPC data from {:?}...", self.ipc_json_path);
        if !self.ipc_json_path.exists() {
            return Err(SetupError::DatasetNotFound(self.ipc_json_path.clone()));
        }
        let json = std::fs::read_to_string(&self.ipc_json_path)?;
        let data = parse_sections(&json)?;
        info!("Loaded {} IPC sections.", data.len());
        Ok(data)
    }

    pub fn prepare_documents(&self, ipc_data: &[IpcSection]) -> Vec<Document> {
        let bar = if self.show_progress {
            let bar = ProgressBar::new(ipc_data.len() as u64);
            if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}") {
                bar.set_style(style);
            }
            bar.set_message("Preparing documents");
            bar
        } else {
            ProgressBar::hidden()
        };

        let docs = ipc_data
            .iter()
            .enumerate()
            .map(|(i, section)| {
                bar.inc(1);
                prepare_document(section, i)
            })
            .collect();
        bar.finish_and_clear();
        docs
    }

    pub async fn create_vector_db(&self, documents: Vec<Document>, reset: bool) -> Result<VectorStore, SetupError> {
        if reset {
            VectorStore::reset(&self.persist_directory)?;
        }

        info!("Creating vector database at {:?}...", self.persist_directory);
        let store = VectorStore::open(&self.persist_directory, &self.collection_name, self.embedder.clone())?;
        let added = store.add_documents(documents).await?;
        store.persist().await?;
        let stored = store.len().await;
        if stored < added {
            warn!("{} of {} documents replaced entries with the same id", added - stored, added);
        }
        info!("Vector database created with {} documents", stored);
        Ok(store)
    }

    pub async fn test_search(&self, store: &VectorStore) -> Result<Vec<SmokeResult>, SetupError> {
        info!("Testing vector database search");
        let mut results = Vec::with_capacity(SMOKE_QUERIES.len());
        for query in SMOKE_QUERIES {
            let hits = store.similarity_search(query, 3, None).await?;
            let pairs: Vec<(String, String)> = hits
                .into_iter()
                .map(|h| (h.document.metadata.section, h.document.metadata.section_title))
                .collect();
            for (i, (section, title)) in pairs.iter().enumerate() {
                info!(query, "  {}. Section {}: {}", i + 1, section, title);
            }
            results.push((query.to_string(), pairs));
        }
        Ok(results)
    }

    async fn run(&self, reset: bool, smoke_test: bool) -> Result<SetupSummary, SetupError> {
        let data = self.load_ipc_data()?;
        let documents = self.prepare_documents(&data);
        let store = self.create_vector_db(documents, reset).await?;
        let smoke_results = if smoke_test { self.test_search(&store).await? } else { Vec::new() };

        Ok(SetupSummary {
            documents: store.len().await,
            location: self.persist_directory.clone(),
            collection: self.collection_name.clone(),
            smoke_results,
        })
    }

    /// Run the full pipeline. `reset` drops any existing database first.
    pub async fn setup(&self, reset: bool, smoke_test: bool) -> Result<SetupSummary, SetupError> {
        match self.run(reset, smoke_test).await {
            Ok(summary) => {
                info!(
                    "Vector database setup complete: {} documents in '{}' at {:?}",
                    summary.documents, summary.collection, summary.location
                );
                Ok(summary)
            }
            Err(e) => {
                error!("Error during setup: {}", e);
                Err(e)
            }
        }
    }
}
