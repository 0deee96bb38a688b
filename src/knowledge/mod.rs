//! Statute Knowledge Module
//!
//! IPC dataset records, their document form, embedders and the
//! persistent vector collection the search tools query.

pub mod document;
pub mod embedder;
pub mod section;
pub mod setup;
pub mod store;

pub use document::{prepare_document, Document, MetadataFilter, ScoredDocument, SectionMetadata};
pub use embedder::{Embedder, FastEmbedder, HashingEmbedder};
pub use section::IpcSection;
pub use setup::{IpcVectorDbSetup, SetupError, SetupSummary};
pub use store::VectorStore;

use std::sync::Arc;

use crate::config::EmbedderKind;

/// Build the embedder selected by configuration.
pub fn embedder_for(kind: EmbedderKind) -> Arc<dyn Embedder> {
    match kind {
        EmbedderKind::FastEmbed => Arc::new(FastEmbedder::new()),
        EmbedderKind::Hashing => Arc::new(HashingEmbedder::default()),
    }
}
