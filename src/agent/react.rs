// ReAct Agent Implementation
//
// Reasoning + Acting loop: the model alternates between tool calls and
// observations until it produces a final answer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Agent, AgentConfig, AgentError, AgentResult, LLMProvider, LegalRole};
use crate::tools::{ToolCall, ToolRegistry};
use crate::utils::truncate::{truncate_text, TruncationPolicy};

const OBSERVATION_BUDGET: TruncationPolicy = TruncationPolicy::Bytes(1500);

const SECTION_TAGS: [&str; 16] = [
    "[PLANNING]", "[REASONING]", "[THOUGHT]", "[ACTION]", "[ANSWER]", "[OBSERVATION]",
    "PLANNING:", "REASONING:", "THOUGHT:", "ACTION:", "ANSWER:",
    "**PLANNING**", "**REASONING**", "**THOUGHT**", "**ACTION**", "**ANSWER**",
];

/// A single step in the ReAct loop
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReActStep {
    pub thought: String,
    pub actions: Vec<ToolCall>,
    pub observations: Vec<String>,
    pub is_final: bool,
    pub answer: Option<String>,
}

impl ReActStep {
    pub fn thought(thought: impl Into<String>) -> Self {
        Self {
            thought: thought.into(),
            actions: Vec::new(),
            observations: Vec::new(),
            is_final: false,
            answer: None,
        }
    }

    pub fn with_actions(mut self, actions: Vec<ToolCall>) -> Self {
        self.actions = actions;
        self
    }

    pub fn final_answer(thought: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            thought: thought.into(),
            actions: Vec::new(),
            observations: Vec::new(),
            is_final: true,
            answer: Some(answer.into()),
        }
    }
}

/// Response from an agent execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub answer: String,
    /// All steps taken to reach the answer
    pub steps: Vec<ReActStep>,
    pub role: LegalRole,
    pub success: bool,
    pub error: Option<String>,
}

impl AgentResponse {
    pub fn success(answer: impl Into<String>, steps: Vec<ReActStep>, role: LegalRole) -> Self {
        Self {
            answer: answer.into(),
            steps,
            role,
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>, steps: Vec<ReActStep>, role: LegalRole) -> Self {
        let error = error.into();
        Self {
            answer: format!("I encountered an error: {}", error),
            steps,
            role,
            success: false,
            error: Some(error),
        }
    }

    /// Names of every tool the agent invoked, in order
    pub fn tools_used(&self) -> Vec<String> {
        self.steps.iter().flat_map(|s| s.actions.iter().map(|a| a.name.clone())).collect()
    }
}

/// ReAct Agent with reasoning and tool use capabilities
#[derive(Clone)]
pub struct ReActAgent {
    provider: Arc<dyn LLMProvider>,
    config: AgentConfig,
    tools: Arc<ToolRegistry>,
}

impl ReActAgent {
    pub fn new(provider: Arc<dyn LLMProvider>, config: AgentConfig, tools: Arc<ToolRegistry>) -> Self {
        Self { provider, config, tools }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn uses_tools(&self) -> bool {
        !self.config.allowed_tools.is_empty()
    }

    async fn build_react_prompt(&self, query: &str, steps: &[ReActStep], context: Option<&str>) -> String {
        let mut prompt = String::new();

        if let Some(ctx) = context.filter(|c| !c.trim().is_empty()) {
            prompt.push_str(&format!("## Context\n{}\n\n", ctx));
        }

        if self.uses_tools() {
            prompt.push_str("## Available Tools\n");
            prompt.push_str(&self.tools.generate_filtered_tools_prompt(&self.config.allowed_tools).await);
            prompt.push('\n');
            prompt.push_str(
                r###"## Response Format

Respond using the EXACT format below.

[REASONING]
Explain what you know and what you still need.

[ACTION]
{"name": "tool_name", "parameters": {"key": "value"}}

[ANSWER]
Your final response.

---
RULES:
1. Use [ACTION] for tool calls (JSON format). Do NOT wrap JSON in code blocks.
2. Use [ANSWER] only once you have the observations you need.
3. NEVER output [OBSERVATION]. The system will provide the observation after your action.

"###,
            );
        } else {
            prompt.push_str(
                "## Response Format\nProvide your complete response after the [ANSWER] tag. \
                 You have no tools; work only from the task and context.\n\n",
            );
        }

        prompt.push_str(&format!("## Task\n{}\n\n", query));

        if !steps.is_empty() {
            prompt.push_str("## Trace\n");
            for step in steps {
                if !step.thought.is_empty() {
                    prompt.push_str(&format!("[REASONING]\n{}\n", step.thought));
                }
                for action in &step.actions {
                    if let Ok(action_json) = serde_json::to_string(action) {
                        prompt.push_str(&format!("[ACTION]\n{}\n", action_json));
                    }
                }
                for obs in &step.observations {
                    prompt.push_str(&format!("[OBSERVATION]\n{}\n", obs));
                }
                prompt.push('\n');
            }
        }

        prompt.push_str("Continue:\n");
        prompt
    }

    /// Parse a model turn into a step
    fn parse_response(&self, response: &str) -> ReActStep {
        debug!("Raw LLM Response for parsing:\n{}", response);

        // A model that writes its own [OBSERVATION] is inventing tool output.
        let clean_response = match response.to_ascii_uppercase().find("[OBSERVATION]") {
            Some(obs_idx) => {
                warn!("Hallucinated [OBSERVATION] detected. Truncating response.");
                &response[..obs_idx]
            }
            _ => response,
        };

        let thought = extract_tag(clean_response, "REASONING")
            .or_else(|| extract_tag(clean_response, "THOUGHT"))
            .unwrap_or_else(|| "Working on the task...".to_string());

        if self.uses_tools() {
            let mut tool_calls: Vec<ToolCall> = extract_all_tags(clean_response, "ACTION")
                .iter()
                .filter_map(|a| parse_json_tool_call(a))
                .collect();

            if tool_calls.is_empty() && extract_tag(clean_response, "ANSWER").is_none() {
                if let Some(call) = parse_json_tool_call(clean_response) {
                    warn!("Found raw JSON tool call without [ACTION] tag.");
                    tool_calls.push(call);
                }
            }

            if !tool_calls.is_empty() {
                return ReActStep::thought(thought).with_actions(tool_calls);
            }
        }

        if let Some(answer) = extract_tag(clean_response, "ANSWER") {
            return ReActStep::final_answer(thought, answer);
        }

        let trimmed = clean_response.trim();
        if trimmed.is_empty() {
            return ReActStep::thought("The model returned no content. Respond with an [ANSWER] or an [ACTION].");
        }

        info!("Model provided tagless response. Treating as final answer.");
        ReActStep::final_answer(thought, trimmed)
    }

    async fn step(&self, query: &str, steps: &[ReActStep], context: Option<&str>) -> AgentResult<ReActStep> {
        let prompt = self.build_react_prompt(query, steps, context).await;
        debug!("ReAct prompt:\n{}", prompt);

        let content = self
            .provider
            .generate_with_temperature(
                &self.config.model,
                prompt,
                Some(self.config.system_prompt.clone()),
                self.config.temperature,
            )
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        Ok(self.parse_response(&content))
    }

    async fn observe(&self, actions: &[ToolCall]) -> Vec<String> {
        let (permitted, denied): (Vec<_>, Vec<_>) = actions
            .iter()
            .enumerate()
            .partition(|(_, a)| self.config.allowed_tools.contains(&a.name));

        let calls: Vec<ToolCall> = permitted.iter().map(|(_, a)| (*a).clone()).collect();
        let results = self.tools.execute_parallel(&calls).await;

        let mut observations = vec![String::new(); actions.len()];
        for ((idx, action), res) in permitted.into_iter().zip(results) {
            let obs = match res {
                Ok(output) => output.summary,
                Err(e) => {
                    warn!("Tool {} failed: {}", action.name, e);
                    format!("Tool execution failed: {}", e)
                }
            };
            observations[idx] = truncate_text(&obs, OBSERVATION_BUDGET);
        }
        for (idx, action) in denied {
            observations[idx] = format!("Tool '{}' is not available to this agent.", action.name);
        }
        observations
    }
}

#[async_trait]
impl Agent for ReActAgent {
    fn role(&self) -> LegalRole {
        self.config.role
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn execute(&self, query: &str, context: Option<&str>) -> AgentResult<AgentResponse> {
        let role = self.config.role;
        info!("{} agent starting", role);

        let mut steps: Vec<ReActStep> = Vec::new();
        let iterations = if self.uses_tools() { self.config.max_iterations } else { 1 };

        for iteration in 0..iterations {
            debug!("ReAct iteration {}", iteration + 1);

            let mut step = match self.step(query, &steps, context).await {
                Ok(s) => s,
                Err(e) => {
                    warn!("ReAct step failed: {}", e);
                    return Ok(AgentResponse::failure(e.to_string(), steps, role));
                }
            };

            // Tool-backed roles must ground their answer in at least one observation.
            if step.is_final && self.uses_tools() && steps.is_empty() {
                warn!("{} tried to answer without using its tools.", role);
                step.is_final = false;
                step.thought = format!("{} [REJECTED: No tool used.]", step.thought);
                step.observations.push(
                    "SYSTEM HINT: You MUST use your tools before answering. Call a tool with [ACTION].".to_string(),
                );
                steps.push(step);
                continue;
            }

            if step.is_final {
                let answer = step.answer.clone().unwrap_or_else(|| step.thought.clone());
                steps.push(step);
                info!("{} agent completed in {} iterations", role, iteration + 1);
                return Ok(AgentResponse::success(answer, steps, role));
            }

            if step.actions.is_empty() {
                steps.push(step);
                continue;
            }

            if let Some(last) = steps.last() {
                if last.actions == step.actions {
                    warn!("Redundant tool calls detected. Injecting loop guard hint.");
                    step.observations = vec![
                        "SYSTEM HINT: Redundant tool call detected. Use the earlier observation or provide a final answer.".to_string(),
                    ];
                    steps.push(step);
                    continue;
                }
            }

            for action in &step.actions {
                info!("   🔧 {} using tool: {}", role, action.name);
            }
            step.observations = self.observe(&step.actions).await;
            steps.push(step);
        }

        Ok(AgentResponse::failure(
            format!("Reached maximum iterations ({})", iterations),
            steps,
            role,
        ))
    }
}

/// Extract the body following `[TAG]` (or `TAG:` / `**TAG**`) up to the next known tag.
///
/// Matching folds ASCII case only, so offsets found in the folded text are
/// valid char boundaries in the original.
fn extract_tag(text: &str, tag_name: &str) -> Option<String> {
    let upper_name = tag_name.to_ascii_uppercase();
    let patterns = [
        format!("[{}]:", upper_name),
        format!("[{}]", upper_name),
        format!("**{}**:", upper_name),
        format!("**{}**", upper_name),
        format!("{}:", upper_name),
    ];
    let text_upper = text.to_ascii_uppercase();
    patterns.iter().find_map(|p| section_after(text, &text_upper, p))
}

fn section_after(text: &str, haystack: &str, pattern: &str) -> Option<String> {
    let start = haystack.find(pattern)? + pattern.len();
    let end = next_tag_index(haystack, start);
    let body = text[start..end].trim().trim_start_matches(':').trim();
    if body.is_empty() { None } else { Some(body.to_string()) }
}

fn next_tag_index(haystack: &str, start: usize) -> usize {
    SECTION_TAGS
        .iter()
        .filter_map(|t| haystack[start..].find(t).map(|i| start + i))
        .min()
        .unwrap_or(haystack.len())
}

fn extract_all_tags(text: &str, tag_name: &str) -> Vec<String> {
    let pattern = format!("[{}]", tag_name.to_ascii_uppercase());
    let text_upper = text.to_ascii_uppercase();
    let haystack = text_upper.as_str();

    let mut results = Vec::new();
    let mut pos = 0;
    while let Some(idx) = haystack[pos..].find(&pattern) {
        let start = pos + idx + pattern.len();
        let end = next_tag_index(haystack, start);
        let body = text[start..end].trim();
        if !body.is_empty() {
            results.push(body.to_string());
        }
        pos = end;
        if pos >= haystack.len() {
            break;
        }
    }
    results
}

/// Parse the first balanced JSON object in `text` as a tool call.
fn parse_json_tool_call(text: &str) -> Option<ToolCall> {
    let json_start = text.find('{')?;
    let json_text = &text[json_start..];

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut json_end = None;
    for (i, c) in json_text.char_indices() {
        if in_string {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => in_string = false,
                _ => escaped = false,
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    json_end = Some(i + 1);
                    break;
                }
            }
            _ => {}
        }
    }

    let call: ToolCall = serde_json::from_str(&json_text[..json_end?]).ok()?;
    if call.name.is_empty() { None } else { Some(call) }
}
