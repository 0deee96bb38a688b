//! Legal Crew - runs the four legal agents through the case workflow.

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::{CaseReport, ReportStore, Workflow};
use crate::agent::{Agent, AgentConfig, AgentResponse, LLMProvider, LegalRole, ReActAgent};
use crate::config::AppConfig;
use crate::tools::ToolRegistry;
use crate::utils::truncate_chars;

#[derive(Debug, Error)]
pub enum CrewError {
    #[error("Case description is empty")]
    EmptyCase,
    #[error("{role} step failed: {error}")]
    StepFailed { role: LegalRole, error: String },
    #[error("Workflow stalled: no step is ready but {0} remain")]
    Stalled(usize),
    #[error("Failed to save report: {0}")]
    Persist(String),
}

/// Crew-wide settings
#[derive(Debug, Clone)]
pub struct CrewConfig {
    /// Replaces every role's default model when set
    pub model_override: Option<String>,
    pub max_iterations: usize,
}

impl Default for CrewConfig {
    fn default() -> Self {
        Self { model_override: None, max_iterations: 5 }
    }
}

impl From<&AppConfig> for CrewConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            model_override: config.model_override.clone(),
            ..Self::default()
        }
    }
}

/// Everything a crew run produced
#[derive(Debug, Clone)]
pub struct CrewOutput {
    pub report: CaseReport,
    pub workflow: Workflow,
    pub responses: Vec<AgentResponse>,
}

pub struct LegalCrew {
    agents: Vec<ReActAgent>,
    store: Option<ReportStore>,
}

impl LegalCrew {
    pub fn new(provider: Arc<dyn LLMProvider>, tools: Arc<ToolRegistry>, config: CrewConfig) -> Self {
        let agents = LegalRole::ALL
            .iter()
            .map(|&role| {
                let mut agent_config = AgentConfig::new(role).with_max_iterations(config.max_iterations);
                if let Some(model) = &config.model_override {
                    agent_config = agent_config.with_model(model.clone());
                }
                ReActAgent::new(provider.clone(), agent_config, tools.clone())
            })
            .collect();

        Self { agents, store: None }
    }

    /// Persist each finished report to this store
    pub fn with_report_store(mut self, store: ReportStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn report_dir(&self) -> Option<&Path> {
        self.store.as_ref().map(|s| s.dir())
    }

    fn agent_for(&self, role: LegalRole) -> Option<&ReActAgent> {
        self.agents.iter().find(|a| a.role() == role)
    }

    pub async fn kickoff(&self, case_description: &str) -> Result<CrewOutput, CrewError> {
        let case = case_description.trim();
        if case.is_empty() {
            return Err(CrewError::EmptyCase);
        }

        info!("📥 Received case: {}", truncate_chars(case, 80));
        let mut workflow = Workflow::legal_default(case);
        let mut responses = Vec::new();

        while !workflow.is_complete() {
            let ready: Vec<(usize, LegalRole, String)> = workflow
                .ready_steps()
                .iter()
                .map(|s| (s.step_num, s.role, s.description.clone()))
                .collect();

            let Some((step_num, role, task)) = ready.into_iter().next() else {
                let remaining = workflow.steps.iter().filter(|s| !s.completed).count();
                return Err(CrewError::Stalled(remaining));
            };

            let agent = self.agent_for(role).ok_or_else(|| CrewError::StepFailed {
                role,
                error: "no agent configured for this role".to_string(),
            })?;

            info!("▶️  Step {}: {}", step_num, role.title());
            let context = workflow.context_for(step_num);
            let context = (!context.is_empty()).then_some(context);

            let response = agent
                .execute(&task, context.as_deref())
                .await
                .map_err(|e| self.abort(&workflow, role, e.to_string()))?;

            if !response.success {
                let error = response.error.clone().unwrap_or_else(|| response.answer.clone());
                return Err(self.abort(&workflow, role, error));
            }

            workflow.complete_step(step_num, response.answer.clone());
            info!("✅ Step {} done ({:.0}%)", step_num, workflow.progress());
            responses.push(response);
        }

        let report = CaseReport::from_workflow(&workflow);
        if let Some(store) = &self.store {
            store
                .save(&report)
                .await
                .map_err(|e| CrewError::Persist(format!("{:#}", e)))?;
        }

        Ok(CrewOutput { report, workflow, responses })
    }

    fn abort(&self, workflow: &Workflow, role: LegalRole, error: String) -> CrewError {
        warn!("{} failed: {}", role, error);
        for step in workflow.steps.iter().filter(|s| s.completed) {
            if let Some(output) = &step.output {
                info!("Partial output from {}:\n{}", step.role.title(), output);
            }
        }
        CrewError::StepFailed { role, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Answers every prompt directly; tool roles therefore never finish.
    struct DirectProvider;

    #[async_trait]
    impl LLMProvider for DirectProvider {
        async fn generate(&self, _model: &str, _prompt: String, _system: Option<String>) -> anyhow::Result<String> {
            Ok("[ANSWER] done".to_string())
        }
    }

    #[tokio::test]
    async fn test_empty_case_rejected() {
        let crew = LegalCrew::new(Arc::new(DirectProvider), Arc::new(ToolRegistry::new()), CrewConfig::default());
        assert!(matches!(crew.kickoff("   ").await, Err(CrewError::EmptyCase)));
    }

    #[tokio::test]
    async fn test_failed_step_aborts_with_role() {
        let config = CrewConfig { model_override: Some("tiny".into()), max_iterations: 1 };
        let crew = LegalCrew::new(Arc::new(DirectProvider), Arc::new(ToolRegistry::new()), config);
        match crew.kickoff("Someone stole my bicycle.").await {
            Err(CrewError::StepFailed { role, .. }) => assert_eq!(role, LegalRole::IpcSection),
            other => panic!("unexpected result: {:?}", other.map(|o| o.report)),
        }
    }

    #[test]
    fn test_model_override_applies_to_all_agents() {
        let config = CrewConfig { model_override: Some("llama3:70b".into()), max_iterations: 3 };
        let crew = LegalCrew::new(Arc::new(DirectProvider), Arc::new(ToolRegistry::new()), config);
        assert!(crew.agents.iter().all(|a| a.model() == "llama3:70b"));
        assert_eq!(crew.agents.len(), 4);
    }
}
