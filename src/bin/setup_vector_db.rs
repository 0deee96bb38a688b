use anyhow::Result;
use tracing::info;

use legal_assistant::config::AppConfig;
use legal_assistant::knowledge::{embedder_for, IpcVectorDbSetup};

/// Rebuild the IPC vector database from scratch and run the sample queries.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = AppConfig::from_env()?;
    let builder = IpcVectorDbSetup::from_config(&config, embedder_for(config.embedder))?.with_progress(true);

    info!("Building IPC vector database...");
    let summary = builder.setup(true, true).await?;

    for (query, hits) in &summary.smoke_results {
        info!("Query: {}", query);
        for (i, (section, title)) in hits.iter().enumerate() {
            info!("  Result {}: Section {} - {}", i + 1, section, title);
        }
    }
    info!("Done. {} documents stored at {:?}", summary.documents, summary.location);
    Ok(())
}
