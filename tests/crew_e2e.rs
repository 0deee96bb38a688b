use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use legal_assistant::agent::LLMProvider;
use legal_assistant::knowledge::{HashingEmbedder, IpcVectorDbSetup, VectorStore};
use legal_assistant::orchestrator::{CrewConfig, CrewError, LegalCrew, ReportStore};
use legal_assistant::tools::{
    IpcSectionSearchTool, LegalPrecedentSearchTool, SearchRequest, SearchResponse, SearchResult,
    ToolRegistry, WebSearchBackend,
};
use legal_assistant::LegalRole;

const DATASET: &str = r#"[
    {"Section": "302", "Section_Title": "Punishment for murder", "Chapter": "XVI",
     "Chapter_Title": "Of Offences Affecting the Human Body",
     "Description": "Whoever commits murder shall be punished with death or imprisonment for life",
     "Punishment": "Death or imprisonment for life, and fine", "Is_Bailable": "No", "Is_Cognizable": "Yes"},
    {"Section": "379", "Section_Title": "Punishment for theft", "Chapter": "XVII",
     "Chapter_Title": "Of Offences Against Property",
     "Description": "Whoever commits theft shall be punished with imprisonment up to three years",
     "Punishment": "Imprisonment up to 3 years, or fine, or both", "Is_Bailable": "No", "Is_Cognizable": "Yes"},
    {"Section": "323", "Section_Title": "Punishment for voluntarily causing hurt", "Chapter": "XVI",
     "Description": "Whoever voluntarily causes hurt", "Is_Bailable": "Yes", "Is_Cognizable": "No"}
]"#;

const CASE: &str = "On 3 March my neighbour Ramesh pushed me and snatched my mobile phone \
                    outside the market. Two shopkeepers saw it. I want the phone back.";

/// Answers by role, keyed on the system prompt; tool roles act once, then answer.
struct CrewMockProvider {
    prompts: Mutex<Vec<(String, String)>>,
    stubborn_ipc: bool,
}

impl CrewMockProvider {
    fn new() -> Self {
        Self { prompts: Mutex::new(Vec::new()), stubborn_ipc: false }
    }
}

#[async_trait]
impl LLMProvider for CrewMockProvider {
    async fn generate(&self, _model: &str, prompt: String, system: Option<String>) -> Result<String> {
        let system = system.unwrap_or_default();
        debug!("MOCK PROMPT: {}", prompt);
        self.prompts.lock().await.push((system.clone(), prompt.clone()));
        let observed = prompt.contains("## Trace");

        if system.contains("Case Intake Specialist") {
            return Ok("[REASONING] Extract facts.\n[ANSWER]\nParties: complainant and Ramesh.\n\
                       Incident: phone snatched with force on 3 March.\nEvidence: two eyewitnesses."
                .to_string());
        }
        if system.contains("IPC Section Expert") {
            if observed && !self.stubborn_ipc && prompt.contains("**Result 1:**") {
                return Ok("[REASONING] Theft and hurt.\n[ANSWER]\nSection 379 (theft) and Section 323 (hurt) apply.".to_string());
            }
            return Ok("[REASONING] Look up theft.\n[ACTION]\n\
                       {\"name\": \"ipc_sections_search\", \"parameters\": {\"query\": \"snatching mobile phone theft hurt\", \"top_k\": 3}}"
                .to_string());
        }
        if system.contains("Legal Precedent Researcher") {
            if observed {
                return Ok("[ANSWER]\nState v. Kumar (2019) 4 SCC 12 supports a theft charge for snatching.".to_string());
            }
            return Ok("[ACTION]\n{\"name\": \"legal_precedent_search\", \"parameters\": \
                       {\"query\": \"mobile phone snatching\", \"ipc_sections\": \"379,323\"}}"
                .to_string());
        }
        if system.contains("Legal Document Drafter") {
            assert!(prompt.contains("### Legal Precedents"));
            return Ok("[ANSWER]\nTO THE STATION HOUSE OFFICER\nSubject: Complaint under Sections 379 and 323 IPC.".to_string());
        }
        Ok("[ANSWER] unknown role".to_string())
    }
}

struct KanoonBackend {
    requests: Mutex<Vec<SearchRequest>>,
}

#[async_trait]
impl WebSearchBackend for KanoonBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.requests.lock().await.push(request.clone());
        Ok(SearchResponse {
            results: vec![
                SearchResult {
                    title: "State v. Kumar on 12 April, 2019".into(),
                    url: "https://indiankanoon.org/doc/12345/".into(),
                    content: "Snatching a phone is theft; see (2019) 4 SCC 12.".into(),
                    score: 0.9,
                },
                SearchResult {
                    title: "Blog post about phones".into(),
                    url: "https://example.com/phones".into(),
                    content: "Not a judgment.".into(),
                    score: 0.8,
                },
            ],
        })
    }
}

async fn build_store(dir: &std::path::Path) -> Arc<VectorStore> {
    let json = dir.join("ipc.json");
    std::fs::write(&json, DATASET).unwrap();
    let embedder = Arc::new(HashingEmbedder::default());
    IpcVectorDbSetup::new(&json, dir.join("db"), "ipc_collection", embedder.clone())
        .setup(true, false)
        .await
        .unwrap();
    Arc::new(VectorStore::open(dir.join("db"), "ipc_collection", embedder).unwrap())
}

async fn build_tools(store: Arc<VectorStore>, backend: Arc<KanoonBackend>) -> Arc<ToolRegistry> {
    let tools = ToolRegistry::new();
    tools.register_instance(IpcSectionSearchTool::new(store)).await;
    tools.register_instance(LegalPrecedentSearchTool::new(backend)).await;
    Arc::new(tools)
}

#[tokio::test]
async fn test_crew_produces_and_saves_report() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(KanoonBackend { requests: Mutex::new(Vec::new()) });
    let tools = build_tools(build_store(dir.path()).await, backend.clone()).await;
    let provider = Arc::new(CrewMockProvider::new());

    let store = ReportStore::new(dir.path().join("reports"));
    let crew = LegalCrew::new(provider.clone(), tools, CrewConfig::default()).with_report_store(store);

    let output = crew.kickoff(CASE).await.unwrap();
    let report = &output.report;

    assert!(output.workflow.is_complete());
    assert_eq!(output.responses.len(), 4);
    assert_eq!(report.case_description, CASE);
    assert!(report.intake.contains("Ramesh"));
    assert!(report.ipc_analysis.contains("Section 379"));
    assert!(report.precedents.contains("(2019) 4 SCC 12"));
    assert!(report.draft.starts_with("TO THE STATION HOUSE OFFICER"));

    let ipc = output.responses.iter().find(|r| r.role == LegalRole::IpcSection).unwrap();
    assert_eq!(ipc.tools_used(), vec!["ipc_sections_search"]);

    // The precedent query carries the IPC sections and is restricted to legal sources.
    let requests = backend.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert!(requests[0].query.contains("IPC 379 OR IPC 323"));
    assert!(requests[0].include_domains.iter().any(|d| d == "indiankanoon.org"));

    // The drafter sees every earlier output.
    let prompts = provider.prompts.lock().await;
    let (_, draft_prompt) = prompts.iter().find(|(s, _)| s.contains("Legal Document Drafter")).unwrap();
    assert!(draft_prompt.contains("### Case Intake"));
    assert!(draft_prompt.contains("### IPC Section Analysis"));

    let loaded = ReportStore::new(dir.path().join("reports")).load(&report.id).await.unwrap();
    assert_eq!(&loaded, report);
    assert!(dir.path().join("reports").join(format!("{}.md", report.id)).exists());
}

#[tokio::test]
async fn test_crew_stops_at_failing_step() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(KanoonBackend { requests: Mutex::new(Vec::new()) });
    let tools = build_tools(build_store(dir.path()).await, backend.clone()).await;
    let provider = Arc::new(CrewMockProvider { prompts: Mutex::new(Vec::new()), stubborn_ipc: true });

    let reports = dir.path().join("reports");
    let crew = LegalCrew::new(provider, tools, CrewConfig { model_override: None, max_iterations: 3 })
        .with_report_store(ReportStore::new(&reports));

    match crew.kickoff(CASE).await {
        Err(CrewError::StepFailed { role, error }) => {
            assert_eq!(role, LegalRole::IpcSection);
            assert!(error.contains("maximum iterations"));
        }
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("crew should have failed"),
    }
    assert!(backend.requests.lock().await.is_empty());
    assert!(!reports.exists());
}
