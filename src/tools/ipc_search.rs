//! IPC Sections Search Tool
//!
//! Semantic lookup of Indian Penal Code sections in the local vector index.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{Tool, ToolOutput};
use crate::agent::{AgentError, AgentResult};
use crate::knowledge::{MetadataFilter, VectorStore};

const DEFAULT_TOP_K: u64 = 3;
const MAX_TOP_K: u64 = 10;

/// Structured search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionHit {
    pub section: String,
    pub section_title: String,
    pub chapter: String,
    pub chapter_title: String,
    pub description: String,
    pub punishment: String,
    pub is_bailable: String,
    pub is_cognizable: String,
    pub triable_by: String,
    pub content: String,
    pub score: f32,
}

/// Structured access to the IPC index, for callers that want records rather than prose.
#[derive(Clone)]
pub struct IpcSectionSearcher {
    store: Arc<VectorStore>,
}

impl IpcSectionSearcher {
    pub fn new(store: Arc<VectorStore>) -> Self {
        Self { store }
    }

    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> anyhow::Result<Vec<SectionHit>> {
        let docs = self.store.similarity_search(query, top_k, filter).await?;
        Ok(docs
            .into_iter()
            .map(|scored| {
                let m = scored.document.metadata;
                SectionHit {
                    section: m.section,
                    section_title: m.section_title,
                    chapter: m.chapter,
                    chapter_title: m.chapter_title,
                    description: m.description,
                    punishment: m.punishment,
                    is_bailable: m.is_bailable,
                    is_cognizable: m.is_cognizable,
                    triable_by: m.triable_by,
                    content: scored.document.page_content,
                    score: scored.score,
                }
            })
            .collect())
    }
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

fn format_hit(i: usize, hit: &SectionHit) -> String {
    let description = if hit.description.trim().is_empty() {
        hit.content.chars().take(200).collect::<String>()
    } else {
        hit.description.clone()
    };

    format!(
        "**Result {}:**\n\
         📗 **Section {}**: {}\n\n\
         **Chapter**: {} - {}\n\n\
         **Description**: {}\n\n\
         **Punishment**: {}\n\n\
         **Legal Details**:\n\
         - Bailable: {}\n\
         - Cognizable: {}\n\
         - Triable By: {}\n\
         ---",
        i,
        or_default(&hit.section, "N/A"),
        or_default(&hit.section_title, "N/A"),
        or_default(&hit.chapter, "N/A"),
        or_default(&hit.chapter_title, "N/A"),
        description,
        or_default(&hit.punishment, "Not specified"),
        or_default(&hit.is_bailable, "Not specified"),
        or_default(&hit.is_cognizable, "Not specified"),
        or_default(&hit.triable_by, "Not specified"),
    )
}

pub struct IpcSectionSearchTool {
    searcher: IpcSectionSearcher,
}

impl IpcSectionSearchTool {
    pub fn new(store: Arc<VectorStore>) -> Self {
        Self { searcher: IpcSectionSearcher::new(store) }
    }
}

#[async_trait]
impl Tool for IpcSectionSearchTool {
    fn name(&self) -> String {
        "ipc_sections_search".to_string()
    }

    fn description(&self) -> String {
        "Search the Indian Penal Code for sections relevant to a legal issue described in \
         natural language. Returns section numbers, titles, descriptions, punishment and \
         bail/cognizance details."
            .to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Description of the legal issue, e.g. 'theft of property from a house'"
                },
                "top_k": {
                    "type": "integer",
                    "description": "Number of sections to return (default: 3, max: 10)",
                    "default": DEFAULT_TOP_K
                },
                "chapter": {
                    "type": "string",
                    "description": "Optional chapter filter, e.g. 'XVI'"
                }
            },
            "required": ["query"]
        })
    }

    fn work_scope(&self) -> Value {
        json!({
            "status": "constrained",
            "data_scope": "Indian Penal Code sections in the local index",
            "search_mode": "semantic similarity"
        })
    }

    async fn execute(&self, params: Value) -> AgentResult<ToolOutput> {
        let query = params["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| AgentError::Validation("Missing required parameter: query".to_string()))?;

        let top_k = params["top_k"].as_u64().unwrap_or(DEFAULT_TOP_K).clamp(1, MAX_TOP_K) as usize;
        let filter = params["chapter"]
            .as_str()
            .filter(|c| !c.trim().is_empty())
            .map(|c| MetadataFilter::new().eq("chapter", c.trim()));

        debug!("Searching IPC sections for: {} (top {})", query, top_k);

        let hits = match self.searcher.search(query, top_k, filter.as_ref()).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!("IPC search failed: {}", e);
                return Ok(ToolOutput::failure(format!("Error searching IPC sections: {}", e)));
            }
        };

        if hits.is_empty() {
            return Ok(ToolOutput::success_str("No relevant IPC sections found for the given query."));
        }

        let summary = hits
            .iter()
            .enumerate()
            .map(|(i, h)| format_hit(i + 1, h))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(ToolOutput::success(
            json!({
                "query": query,
                "num_results": hits.len(),
                "sections": serde_json::to_value(&hits)?,
            }),
            summary,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{prepare_document, Embedder, HashingEmbedder, IpcSection};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::tempdir;

    async fn seeded_store(dir: &std::path::Path) -> Arc<VectorStore> {
        let store = VectorStore::open(dir, "ipc", Arc::new(HashingEmbedder::default())).unwrap();
        let sections = [
            IpcSection {
                section: "379".into(),
                section_title: "Punishment for theft".into(),
                chapter: "XVII".into(),
                chapter_title: "Offences against property".into(),
                description: "Whoever commits theft shall be punished".into(),
                punishment: "Imprisonment up to 3 years, or fine, or both".into(),
                is_cognizable: "Cognizable".into(),
                ..Default::default()
            },
            IpcSection {
                section: "302".into(),
                section_title: "Punishment for murder".into(),
                chapter: "XVI".into(),
                ..Default::default()
            },
        ];
        let docs = sections.iter().enumerate().map(|(i, s)| prepare_document(s, i)).collect();
        store.add_documents(docs).await.unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_execute_formats_results() {
        let dir = tempdir().unwrap();
        let tool = IpcSectionSearchTool::new(seeded_store(dir.path()).await);

        let out = tool.execute(json!({"query": "theft", "top_k": 1})).await.unwrap();
        assert!(out.success);
        assert!(out.summary.contains("**Result 1:**"));
        assert!(out.summary.contains("**Section 379**: Punishment for theft"));
        assert!(out.summary.contains("- Cognizable: Cognizable"));
        assert!(out.summary.contains("- Bailable: Not specified"));
        assert_eq!(out.data["num_results"], 1);
    }

    #[tokio::test]
    async fn test_description_falls_back_to_content() {
        let dir = tempdir().unwrap();
        let tool = IpcSectionSearchTool::new(seeded_store(dir.path()).await);

        let out = tool.execute(json!({"query": "murder", "chapter": "XVI"})).await.unwrap();
        assert!(out.summary.contains("**Description**: Section 302: Punishment for murder"));
        assert!(out.summary.contains("**Punishment**: Not specified"));
        assert_eq!(out.data["num_results"], 1);
    }

    #[tokio::test]
    async fn test_empty_index_message() {
        let dir = tempdir().unwrap();
        let store = VectorStore::open(dir.path(), "ipc", Arc::new(HashingEmbedder::default())).unwrap();
        let tool = IpcSectionSearchTool::new(Arc::new(store));
        let out = tool.execute(json!({"query": "anything"})).await.unwrap();
        assert!(out.success);
        assert_eq!(out.summary, "No relevant IPC sections found for the given query.");
    }

    /// Embeds like `HashingEmbedder` until told to go offline.
    struct FlakyEmbedder {
        inner: HashingEmbedder,
        offline: AtomicBool,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            if self.offline.load(Ordering::SeqCst) {
                anyhow::bail!("embedding model unavailable");
            }
            self.inner.embed(texts).await
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
    }

    #[tokio::test]
    async fn test_store_error_is_failure_output() {
        let dir = tempdir().unwrap();
        let embedder = Arc::new(FlakyEmbedder { inner: HashingEmbedder::default(), offline: AtomicBool::new(false) });
        let store = VectorStore::open(dir.path(), "ipc", embedder.clone()).unwrap();
        let theft = IpcSection { section: "379".into(), section_title: "Punishment for theft".into(), ..Default::default() };
        store.add_documents(vec![prepare_document(&theft, 0)]).await.unwrap();

        embedder.offline.store(true, Ordering::SeqCst);
        let tool = IpcSectionSearchTool::new(Arc::new(store));
        let out = tool.execute(json!({"query": "theft"})).await.unwrap();
        assert!(!out.success);
        assert_eq!(out.error.as_deref(), Some("Error searching IPC sections: embedding model unavailable"));
    }

    #[tokio::test]
    async fn test_missing_query_is_validation_error() {
        let dir = tempdir().unwrap();
        let tool = IpcSectionSearchTool::new(seeded_store(dir.path()).await);
        let err = tool.execute(json!({"top_k": 2})).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
    }

    #[tokio::test]
    async fn test_searcher_returns_structured_hits() {
        let dir = tempdir().unwrap();
        let searcher = IpcSectionSearcher::new(seeded_store(dir.path()).await);
        let filter = MetadataFilter::new().eq("chapter", "XVII");
        let hits = searcher.search("punishment", 5, Some(&filter)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].section, "379");
        assert!(hits[0].content.contains("Offences against property"));
    }
}
