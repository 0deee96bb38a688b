//! Legal Precedent Search Tool
//!
//! Finds judgments of Indian courts through the Tavily search API,
//! restricted to a list of trusted legal domains.

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{Tool, ToolOutput};
use crate::agent::{AgentError, AgentResult};

/// Trusted Indian legal domains, in priority order
pub const LEGAL_SOURCES: [&str; 10] = [
    "indiankanoon.org",
    "sci.gov.in",
    "judgments.ecourts.gov.in",
    "hcservices.ecourts.gov.in",
    "lawmin.gov.in",
    "legislative.gov.in",
    "legalserviceindia.com",
    "casemine.com",
    "manupatra.com",
    "scconline.com",
];

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";
const SUMMARY_CHARS: usize = 500;
const DEFAULT_MAX_RESULTS: u64 = 5;
const MAX_RESULTS_CAP: u64 = 10;

pub fn is_legal_source(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }
    let url = url.to_lowercase();
    LEGAL_SOURCES.iter().any(|domain| url.contains(domain))
}

fn source_domain(url: &str) -> String {
    let url = url.to_lowercase();
    LEGAL_SOURCES
        .iter()
        .find(|domain| url.contains(*domain))
        .map(|d| d.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn citation_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)\(\d{4}\)\s*\d+\s*SCC\s*\d+",      // (2024) 5 SCC 123
            r"(?i)AIR\s*\d{4}\s*SC\s*\d+",            // AIR 2024 SC 123
            r"(?i)\d{4}\s*\(\d+\)\s*\w+\s*\d+",       // 2024 (5) ALT 123
            r"(?i)W\.P\.\s*No\.\s*\d+\s*of\s*\d{4}",  // W.P. No. 123 of 2024
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// First citation found, trying reporter formats in order of specificity.
pub fn extract_case_citation(text: &str) -> Option<String> {
    citation_patterns()
        .iter()
        .find_map(|re| re.find(text).map(|m| m.as_str().to_string()))
}

fn site_clause(domains: &[&str]) -> String {
    domains
        .iter()
        .take(3)
        .map(|d| format!("site:{}", d))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// The legal issue plus its IPC sections ("302,304"), without any site restriction.
pub fn precedent_terms(query: &str, ipc_sections: Option<&str>) -> String {
    let mut terms = vec![query.trim().to_string()];

    if let Some(sections) = ipc_sections {
        let sections: Vec<&str> = sections.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
        if !sections.is_empty() {
            terms.push(format!("IPC {}", sections.join(" OR IPC ")));
        }
    }
    terms.join(" ")
}

/// Compose the search-engine query for a legal issue across every trusted source.
pub fn build_precedent_query(query: &str, ipc_sections: Option<&str>) -> String {
    format!(
        "({}) {} judgment precedent case law India",
        site_clause(&LEGAL_SOURCES),
        precedent_terms(query, ipc_sections)
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: usize,
    pub search_depth: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_domains: Vec<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, max_results: usize) -> Self {
        Self {
            query: query.into(),
            max_results,
            search_depth: "advanced".to_string(),
            include_domains: Vec::new(),
        }
    }

    pub fn with_domains(mut self, domains: &[&str]) -> Self {
        self.include_domains = domains.iter().map(|d| d.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

/// A web search engine that can answer precedent queries
#[async_trait]
pub trait WebSearchBackend: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse>;
}

pub struct TavilyClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: TAVILY_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl WebSearchBackend for TavilyClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        debug!("Tavily search: {}", request.query);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .context("Failed to send search request")?
            .error_for_status()
            .context("Search API returned an error status")?;

        response.json().await.context("Failed to parse search response")
    }
}

/// A precedent found on a trusted source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Precedent {
    pub title: String,
    pub citation: Option<String>,
    pub summary: String,
    pub url: String,
    pub source: String,
}

/// Keep trusted-source hits, drop duplicate titles, stop at `max`.
pub fn collect_precedents(results: &[SearchResult], max: usize) -> Vec<Precedent> {
    let mut precedents = Vec::new();
    let mut seen_titles = HashSet::new();

    for item in results {
        if precedents.len() >= max {
            break;
        }
        if !is_legal_source(&item.url) {
            continue;
        }
        let title = html_escape::decode_html_entities(&item.title).to_string();
        if !seen_titles.insert(title.clone()) {
            continue;
        }
        let content = html_escape::decode_html_entities(&item.content).to_string();

        precedents.push(Precedent {
            citation: extract_case_citation(&title).or_else(|| extract_case_citation(&content)),
            summary: content.chars().take(SUMMARY_CHARS).collect(),
            url: item.url.clone(),
            source: source_domain(&item.url),
            title,
        });
    }
    precedents
}

fn format_precedents(precedents: &[Precedent]) -> String {
    let blocks = precedents
        .iter()
        .enumerate()
        .map(|(i, p)| {
            format!(
                "**Precedent {}:**\n\
                 ⚖️ **Case**: {}\n\
                 📑 **Citation**: {}\n\
                 🏛️ **Source**: {}\n\n\
                 **Summary**: {}\n\n\
                 🔗 **Full Judgment**: {}\n\
                 ---",
                i + 1,
                p.title,
                p.citation.as_deref().unwrap_or("Citation not found"),
                p.source,
                p.summary,
                p.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("Found {} relevant legal precedent(s):\n{}", precedents.len(), blocks)
}

pub struct LegalPrecedentSearchTool {
    backend: Option<Arc<dyn WebSearchBackend>>,
}

impl LegalPrecedentSearchTool {
    pub fn new(backend: Arc<dyn WebSearchBackend>) -> Self {
        Self { backend: Some(backend) }
    }

    /// Tavily-backed tool; without a key every call reports the missing key.
    pub fn from_api_key(api_key: Option<String>) -> Self {
        Self {
            backend: api_key.map(|k| Arc::new(TavilyClient::new(k)) as Arc<dyn WebSearchBackend>),
        }
    }
}

#[async_trait]
impl Tool for LegalPrecedentSearchTool {
    fn name(&self) -> String {
        "legal_precedent_search".to_string()
    }

    fn description(&self) -> String {
        "Search for precedents and case law from Indian courts on trusted legal sources \
         (Indian Kanoon, Supreme Court, eCourts). Returns case names, citations, summaries \
         and links to full judgments."
            .to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The legal issue or case description to find precedents for"
                },
                "ipc_sections": {
                    "type": "string",
                    "description": "Optional comma-separated IPC sections, e.g. '302,304'"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum precedents to return (default: 5, max: 10)",
                    "default": DEFAULT_MAX_RESULTS
                }
            },
            "required": ["query"]
        })
    }

    fn work_scope(&self) -> Value {
        json!({
            "status": "constrained",
            "environment": "internet (Tavily search API)",
            "data_scope": LEGAL_SOURCES,
        })
    }

    async fn execute(&self, params: Value) -> AgentResult<ToolOutput> {
        let query = params["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| AgentError::Validation("Missing required parameter: query".to_string()))?;

        let Some(backend) = self.backend.as_ref() else {
            return Ok(ToolOutput::failure("TAVILY_API_KEY not found in .env file"));
        };

        let max_results = params["max_results"]
            .as_u64()
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .clamp(1, MAX_RESULTS_CAP) as usize;
        let ipc_sections = params["ipc_sections"].as_str();

        let request = SearchRequest::new(build_precedent_query(query, ipc_sections), max_results * 2)
            .with_domains(&LEGAL_SOURCES);

        let response = match backend.search(&request).await {
            Ok(r) => r,
            Err(e) => {
                warn!("Precedent search failed: {:#}", e);
                return Ok(ToolOutput::failure(format!("Error searching legal precedents: {}", e)));
            }
        };

        let precedents = collect_precedents(&response.results, max_results);
        info!("Precedent search kept {} of {} results", precedents.len(), response.results.len());

        if precedents.is_empty() {
            return Ok(ToolOutput::success_str(
                "No relevant legal precedents found from trusted Indian legal sources.",
            ));
        }

        Ok(ToolOutput::success(
            json!({
                "query": request.query,
                "num_results": precedents.len(),
                "precedents": serde_json::to_value(&precedents)?,
            }),
            format_precedents(&precedents),
        ))
    }
}

/// Court tier to restrict a precedent search to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CourtLevel {
    Supreme,
    High,
    District,
    All,
}

impl CourtLevel {
    pub fn domains(&self) -> Vec<&'static str> {
        match self {
            CourtLevel::Supreme => vec!["sci.gov.in", "indiankanoon.org/search/?formInput=doctypes:sc"],
            CourtLevel::High => vec!["hcservices.ecourts.gov.in", "indiankanoon.org/search/?formInput=doctypes:hc"],
            CourtLevel::District => vec!["judgments.ecourts.gov.in"],
            CourtLevel::All => LEGAL_SOURCES.to_vec(),
        }
    }
}

impl FromStr for CourtLevel {
    type Err = std::convert::Infallible;

    /// Unrecognised levels search every court.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "supreme" => CourtLevel::Supreme,
            "high" => CourtLevel::High,
            "district" => CourtLevel::District,
            _ => CourtLevel::All,
        })
    }
}

impl std::fmt::Display for CourtLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CourtLevel::Supreme => write!(f, "supreme"),
            CourtLevel::High => write!(f, "high"),
            CourtLevel::District => write!(f, "district"),
            CourtLevel::All => write!(f, "all"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourtPrecedent {
    pub title: String,
    pub summary: String,
    pub url: String,
    pub court_level: CourtLevel,
    pub relevance_score: f32,
}

type CacheKey = (String, CourtLevel, usize);

/// Structured precedent search with per-court filtering and memoisation
pub struct LegalPrecedentSearcher {
    backend: Arc<dyn WebSearchBackend>,
    cache: Mutex<HashMap<CacheKey, Vec<CourtPrecedent>>>,
}

impl LegalPrecedentSearcher {
    pub fn new(backend: Arc<dyn WebSearchBackend>) -> Self {
        Self { backend, cache: Mutex::new(HashMap::new()) }
    }

    pub async fn search_by_court(
        &self,
        query: &str,
        court_level: CourtLevel,
        max_results: usize,
    ) -> Result<Vec<CourtPrecedent>> {
        let key = (query.to_string(), court_level, max_results);
        if let Some(hit) = self.cache.lock().await.get(&key) {
            debug!("Precedent cache hit for '{}' ({})", query, court_level);
            return Ok(hit.clone());
        }

        let domains = court_level.domains();
        let search_query = format!("({}) {} judgment India", site_clause(&domains), query);
        let response = self
            .backend
            .search(&SearchRequest::new(search_query, max_results * 2))
            .await?;

        let results: Vec<CourtPrecedent> = response
            .results
            .into_iter()
            .filter(|item| is_legal_source(&item.url))
            .take(max_results)
            .map(|item| CourtPrecedent {
                title: item.title,
                summary: item.content,
                url: item.url,
                court_level,
                relevance_score: item.score,
            })
            .collect();

        self.cache.lock().await.insert(key, results.clone());
        Ok(results)
    }

    /// Precedents for an issue and optional IPC sections ("302,304") from one court tier.
    pub async fn search_court_precedents(
        &self,
        query: &str,
        ipc_sections: Option<&str>,
        court_level: CourtLevel,
        max_results: usize,
    ) -> Result<Vec<CourtPrecedent>> {
        self.search_by_court(&precedent_terms(query, ipc_sections), court_level, max_results)
            .await
    }

    /// Cases similar to the given facts and IPC sections, across all courts.
    pub async fn search_similar_cases(
        &self,
        case_facts: &str,
        ipc_sections: &[String],
        max_results: usize,
    ) -> Result<Vec<CourtPrecedent>> {
        let mut parts = vec![case_facts.trim().to_string()];
        if !ipc_sections.is_empty() {
            parts.push(
                ipc_sections
                    .iter()
                    .map(|s| format!("IPC-{}", s.trim()))
                    .collect::<Vec<_>>()
                    .join(" "),
            );
        }
        let query = format!("{} similar cases precedent India", parts.join(" "));
        self.search_by_court(&query, CourtLevel::All, max_results).await
    }
}
