//! Tool System Module
//!
//! Structured tool calling with JSON schema definitions and result
//! caching. The legal crew exposes two tools: statute search over the
//! local IPC index and precedent search over trusted Indian legal sites.

mod ipc_search;
mod precedent_search;

pub use ipc_search::{IpcSectionSearchTool, IpcSectionSearcher, SectionHit};
pub use precedent_search::{
    build_precedent_query, collect_precedents, extract_case_citation, is_legal_source, precedent_terms, CourtLevel,
    CourtPrecedent, LegalPrecedentSearchTool, LegalPrecedentSearcher, Precedent, SearchRequest,
    SearchResponse, SearchResult, TavilyClient, WebSearchBackend, LEGAL_SOURCES,
};

use crate::agent::AgentResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Output from a tool execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolOutput {
    /// Whether the tool execution was successful
    pub success: bool,
    /// Structured output data
    pub data: Value,
    /// Human-readable rendering, fed back to the agent as the observation
    pub summary: String,
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn success(data: impl Into<Value>, summary: impl Into<String>) -> Self {
        Self {
            success: true,
            data: data.into(),
            summary: summary.into(),
            error: None,
        }
    }

    pub fn success_str(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            success: true,
            summary: content.clone(),
            data: Value::String(content),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            data: Value::Null,
            summary: format!("Error: {}", error),
            error: Some(error),
        }
    }
}

/// A tool call request parsed from LLM output
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub parameters: Value,
}

/// Trait for tools that can be executed by agents
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> String;

    fn description(&self) -> String;

    /// JSON schema for the tool's parameters
    fn parameters(&self) -> Value;

    /// Operational constraints surfaced in the tool prompt
    fn work_scope(&self) -> Value {
        json!({ "status": "unconstrained" })
    }

    async fn execute(&self, params: Value) -> AgentResult<ToolOutput>;
}

/// Registry for available tools with built-in caching
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
    cache: Arc<Mutex<HashMap<String, ToolOutput>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn register_instance<T: Tool + 'static>(&self, tool: T) {
        let mut tools = self.tools.write().await;
        tools.insert(tool.name(), Arc::new(tool));
    }

    /// Sorted tool names
    pub async fn tool_names(&self) -> Vec<String> {
        let tools = self.tools.read().await;
        let mut names: Vec<String> = tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Describe the allowed tools for an agent prompt
    pub async fn generate_filtered_tools_prompt(&self, allowed_names: &[String]) -> String {
        if allowed_names.is_empty() {
            return "No tools available for this task.\n".to_string();
        }

        let tools = self.tools.read().await;
        let mut names: Vec<_> = allowed_names.iter().filter(|n| tools.contains_key(*n)).collect();
        if names.is_empty() {
            return "No tools available for this task.\n".to_string();
        }
        names.sort();

        let mut prompt = String::from("Available Tools:\n\n");
        for name in names {
            let tool = &tools[name];
            prompt.push_str(&format!(
                "- {}: {} (params: {})\n",
                name,
                tool.description(),
                serde_json::to_string(&tool.parameters()).unwrap_or_default()
            ));

            let scope = tool.work_scope();
            if scope["status"] != "unconstrained" {
                prompt.push_str(&format!("  Scope: {}\n", scope));
            }
        }
        prompt
    }

    pub async fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let tools = self.tools.read().await;
        tools.get(name).cloned()
    }

    /// Execute a tool call. Successful outputs are cached per name + parameters.
    pub async fn execute(&self, call: &ToolCall) -> AgentResult<ToolOutput> {
        let cache_key = format!("{}:{}", call.name, serde_json::to_string(&call.parameters)?);

        {
            let cache = self.cache.lock().await;
            if let Some(output) = cache.get(&cache_key) {
                tracing::debug!("Cache Hit for tool: {}", call.name);
                return Ok(output.clone());
            }
        }

        let tool = self.get_tool(&call.name).await;
        let result = match tool {
            Some(tool) => tool.execute(call.parameters.clone()).await?,
            None => ToolOutput::failure(format!("Unknown tool: {}", call.name)),
        };

        if result.success {
            let mut cache = self.cache.lock().await;
            cache.insert(cache_key, result.clone());
        }

        Ok(result)
    }

    /// Execute multiple tool calls concurrently; results keep call order.
    pub async fn execute_parallel(&self, calls: &[ToolCall]) -> Vec<AgentResult<ToolOutput>> {
        let futures = calls.iter().map(|call| self.execute(call));
        futures_util::future::join_all(futures).await
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTool {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> String { "counting_tool".to_string() }
        fn description(&self) -> String { "Counts its invocations".to_string() }
        fn parameters(&self) -> Value { json!({"type": "object"}) }
        async fn execute(&self, params: Value) -> AgentResult<ToolOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if params["fail"].as_bool() == Some(true) {
                return Err(AgentError::Tool("asked to fail".into()));
            }
            Ok(ToolOutput::success(params, "ok"))
        }
    }

    #[tokio::test]
    async fn test_tool_registration() {
        let registry = ToolRegistry::new();
        registry.register_instance(CountingTool::default()).await;
        assert_eq!(registry.tool_names().await, vec!["counting_tool".to_string()]);
        assert!(registry.get_tool("counting_tool").await.is_some());
    }

    #[tokio::test]
    async fn test_execution_is_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ToolRegistry::new();
        registry.register_instance(CountingTool { calls: calls.clone() }).await;

        let call = ToolCall { name: "counting_tool".into(), parameters: json!({"input": "x"}) };
        let first = registry.execute(&call).await.unwrap();
        let second = registry.execute(&call).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        registry.clear_cache().await;
        registry.execute(&call).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_failure_output() {
        let registry = ToolRegistry::new();
        let out = registry
            .execute(&ToolCall { name: "nope".into(), parameters: json!({}) })
            .await
            .unwrap();
        assert!(!out.success);
        assert_eq!(out.error.as_deref(), Some("Unknown tool: nope"));
    }

    #[tokio::test]
    async fn test_parallel_preserves_order() {
        let registry = ToolRegistry::new();
        registry.register_instance(CountingTool::default()).await;
        let calls = vec![
            ToolCall { name: "counting_tool".into(), parameters: json!({"n": 1}) },
            ToolCall { name: "counting_tool".into(), parameters: json!({"fail": true}) },
            ToolCall { name: "counting_tool".into(), parameters: json!({"n": 3}) },
        ];
        let results = registry.execute_parallel(&calls).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().data["n"], 1);
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().data["n"], 3);
    }

    #[tokio::test]
    async fn test_tools_prompt() {
        let registry = ToolRegistry::new();
        registry.register_instance(CountingTool::default()).await;

        let prompt = registry.generate_filtered_tools_prompt(&["counting_tool".to_string()]).await;
        assert!(prompt.contains("counting_tool"));
        assert!(prompt.contains("Counts its invocations"));

        let none = registry.generate_filtered_tools_prompt(&[]).await;
        assert_eq!(none, "No tools available for this task.\n");
    }
}
