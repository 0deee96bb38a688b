//! Legal Assistant CLI
//!
//! Builds the IPC statute index, runs ad-hoc statute and precedent
//! searches, and drives the legal crew over a case description.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use legal_assistant::agent::{provider_from_config, CachedProvider, LLMCache};
use legal_assistant::config::{AppConfig, ConfigError};
use legal_assistant::knowledge::{embedder_for, IpcVectorDbSetup, VectorStore};
use legal_assistant::orchestrator::{CrewConfig, LegalCrew, ReportStore};
use legal_assistant::tools::{
    CourtLevel, IpcSectionSearchTool, LegalPrecedentSearchTool,
    LegalPrecedentSearcher, TavilyClient, ToolCall, ToolRegistry,
};

#[derive(Parser)]
#[command(name = "legal_assistant", about = "Multi-agent legal assistant for Indian criminal law")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the IPC vector database from IPC_JSON_PATH
    Setup {
        /// Drop any existing database first
        #[arg(long)]
        reset: bool,
        /// Skip the sample queries after indexing
        #[arg(long)]
        no_smoke_test: bool,
    },
    /// Search the IPC index
    Search {
        query: String,
        /// Number of sections to return
        #[arg(short = 'k', long, default_value_t = 3)]
        top_k: usize,
        /// Restrict results to one chapter, e.g. XVI
        #[arg(long)]
        chapter: Option<String>,
    },
    /// Search Indian court precedents (requires TAVILY_API_KEY)
    Precedents {
        query: String,
        /// Comma-separated IPC sections, e.g. "302,304"
        #[arg(long)]
        sections: Option<String>,
        #[arg(long, default_value_t = 5)]
        max: usize,
        /// supreme, high, district or all
        #[arg(long)]
        court: Option<CourtLevel>,
    },
    /// Run the legal crew over a case and save the report
    Analyze {
        /// Case description
        case: Option<String>,
        /// Read the case description from a file
        #[arg(long, conflicts_with = "case")]
        file: Option<PathBuf>,
    },
    /// Interactive case analysis; type 'quit' to exit
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env()?;

    match args.command {
        Command::Setup { reset, no_smoke_test } => setup(&config, reset, !no_smoke_test).await,
        Command::Search { query, top_k, chapter } => search(&config, &query, top_k, chapter).await,
        Command::Precedents { query, sections, max, court } => {
            precedents(&config, &query, sections, max, court).await
        }
        Command::Analyze { case, file } => {
            let case = match (case, file) {
                (Some(text), _) => text,
                (None, Some(path)) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read case file {}", path.display()))?,
                (None, None) => anyhow::bail!("Provide a case description or --file"),
            };
            let crew = build_crew(&config).await?;
            analyze(&crew, &case).await
        }
        Command::Chat => chat(&config).await,
    }
}

async fn setup(config: &AppConfig, reset: bool, smoke_test: bool) -> Result<()> {
    let builder = IpcVectorDbSetup::from_config(config, embedder_for(config.embedder))?.with_progress(true);
    let summary = builder.setup(reset, smoke_test).await?;

    println!("Indexed {} IPC sections into '{}' at {}", summary.documents, summary.collection, summary.location.display());
    for (query, hits) in &summary.smoke_results {
        println!("\n🔍 {}", query);
        for (section, title) in hits {
            println!("   Section {}: {}", section, title);
        }
    }
    Ok(())
}

fn open_store(config: &AppConfig) -> Result<Arc<VectorStore>> {
    let dir = config.require_persist_directory()?;
    if !VectorStore::exists(dir, &config.collection_name) {
        anyhow::bail!(
            "No IPC collection '{}' in {}. Run `legal_assistant setup` first.",
            config.collection_name,
            dir.display()
        );
    }
    let store = VectorStore::open(dir.clone(), config.collection_name.clone(), embedder_for(config.embedder))?;
    Ok(Arc::new(store))
}

async fn search(config: &AppConfig, query: &str, top_k: usize, chapter: Option<String>) -> Result<()> {
    let tool = IpcSectionSearchTool::new(open_store(config)?);
    let mut params = serde_json::json!({ "query": query, "top_k": top_k });
    if let Some(chapter) = chapter {
        params["chapter"] = chapter.into();
    }
    let registry = ToolRegistry::new();
    registry.register_instance(tool).await;
    let output = registry
        .execute(&ToolCall { name: "ipc_sections_search".into(), parameters: params })
        .await?;
    println!("{}", output.summary);
    Ok(())
}

async fn precedents(
    config: &AppConfig,
    query: &str,
    sections: Option<String>,
    max: usize,
    court: Option<CourtLevel>,
) -> Result<()> {
    let key = config.tavily_api_key.clone().ok_or(ConfigError::Missing("TAVILY_API_KEY"))?;

    let Some(court) = court else {
        let tool = LegalPrecedentSearchTool::from_api_key(Some(key));
        let registry = ToolRegistry::new();
        registry.register_instance(tool).await;
        let mut params = serde_json::json!({ "query": query, "max_results": max });
        if let Some(sections) = sections {
            params["ipc_sections"] = sections.into();
        }
        let output = registry
            .execute(&ToolCall { name: "legal_precedent_search".into(), parameters: params })
            .await?;
        println!("{}", output.summary);
        return Ok(());
    };

    let searcher = LegalPrecedentSearcher::new(Arc::new(TavilyClient::new(key)));
    let results = searcher
        .search_court_precedents(query, sections.as_deref(), court, max)
        .await?;
    if results.is_empty() {
        println!("No precedents found in {} courts.", court);
    }
    for (i, p) in results.iter().enumerate() {
        println!("{}. {}\n   {}\n   {}\n", i + 1, p.title, p.url, p.summary);
    }
    Ok(())
}

async fn build_crew(config: &AppConfig) -> Result<LegalCrew> {
    let tools = Arc::new(ToolRegistry::new());
    tools.register_instance(IpcSectionSearchTool::new(open_store(config)?)).await;
    tools
        .register_instance(LegalPrecedentSearchTool::from_api_key(config.tavily_api_key.clone()))
        .await;
    info!("🔧 Tools: {}", tools.tool_names().await.join(", "));

    let provider = Arc::new(CachedProvider::new(provider_from_config(config)?, Arc::new(LLMCache::new())));
    Ok(LegalCrew::new(provider, tools, CrewConfig::from(config))
        .with_report_store(ReportStore::new(config.report_dir.clone())))
}

async fn analyze(crew: &LegalCrew, case: &str) -> Result<()> {
    println!("\n⚙️  Analyzing case...\n");
    let output = crew.kickoff(case).await?;

    println!("{}", "─".repeat(60));
    println!("{}", output.report.draft);
    println!("{}", "─".repeat(60));
    println!(
        "📄 Report {} saved under {}",
        output.report.id,
        crew.report_dir().map(|d| d.display().to_string()).unwrap_or_default()
    );
    Ok(())
}

async fn chat(config: &AppConfig) -> Result<()> {
    let crew = build_crew(config).await?;
    println!("\n⚖️  Legal Assistant. Describe your case, or type 'quit' to exit.\n");

    loop {
        print!("📝 Case: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let case = input.trim();
        if case.is_empty() {
            continue;
        }
        if matches!(case.to_lowercase().as_str(), "quit" | "exit" | "q") {
            println!("\n👋 Goodbye!\n");
            break;
        }

        if let Err(e) = analyze(&crew, case).await {
            println!("❌ Error: {:#}\n", e);
        }
    }
    Ok(())
}
