//! Agent Module
//!
//! Provides the ReAct agent framework and the legal crew's roles.

mod cache;
mod error;
mod provider;
mod react;
mod types;

pub use cache::{CachedProvider, LLMCache};
pub use error::{AgentError, AgentResult};
pub use provider::{
    provider_from_config, LLMProvider, OllamaProvider, OpenAICompatibleProvider, DEFAULT_TEMPERATURE,
};
pub use react::{AgentResponse, ReActAgent, ReActStep};
pub use types::{AgentConfig, LegalRole};

use async_trait::async_trait;

/// Trait for crew agents
#[async_trait]
pub trait Agent: Send + Sync {
    fn role(&self) -> LegalRole;

    /// Get the model to use for this agent
    fn model(&self) -> &str;

    /// Execute a task with optional context from earlier steps
    async fn execute(&self, query: &str, context: Option<&str>) -> AgentResult<AgentResponse>;
}
