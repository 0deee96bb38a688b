use serde::{Deserialize, Serialize};

use super::provider::DEFAULT_TEMPERATURE;

/// The four roles of the legal crew
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalRole {
    CaseIntake,
    IpcSection,
    LegalPrecedent,
    LegalDrafter,
}

impl LegalRole {
    pub const ALL: [LegalRole; 4] = [
        LegalRole::CaseIntake,
        LegalRole::IpcSection,
        LegalRole::LegalPrecedent,
        LegalRole::LegalDrafter,
    ];

    pub fn default_model(&self) -> &'static str {
        match self {
            LegalRole::CaseIntake => "llama3.2:3b",
            LegalRole::IpcSection => "qwen3:8b",
            LegalRole::LegalPrecedent => "qwen3:8b",
            LegalRole::LegalDrafter => "qwen3:8b",
        }
    }

    pub fn allowed_tools(&self) -> Vec<String> {
        match self {
            LegalRole::IpcSection => vec!["ipc_sections_search".to_string()],
            LegalRole::LegalPrecedent => vec!["legal_precedent_search".to_string()],
            LegalRole::CaseIntake | LegalRole::LegalDrafter => Vec::new(),
        }
    }

    pub fn system_prompt(&self) -> String {
        let (role, goal, backstory) = match self {
            LegalRole::CaseIntake => (
                "Case Intake Specialist",
                "Turn the client's account into a structured case summary: parties, incident, \
                 timeline, evidence, injuries or losses, and the relief sought.",
                "You are a paralegal who has interviewed thousands of complainants at police \
                 stations and legal aid clinics across India. You separate facts from allegations \
                 and note anything that is missing or ambiguous.",
            ),
            LegalRole::IpcSection => (
                "IPC Section Expert",
                "Identify the Indian Penal Code sections that apply to the structured case, \
                 with the punishment and whether each offence is bailable and cognizable.",
                "You are a criminal lawyer with deep command of the Indian Penal Code. You \
                 ALWAYS verify sections with the 'ipc_sections_search' tool and never cite a \
                 section you have not looked up.",
            ),
            LegalRole::LegalPrecedent => (
                "Legal Precedent Researcher",
                "Find judgments of Indian courts that support or distinguish the case, with \
                 citations and links.",
                "You are a legal researcher who knows Indian Kanoon and the Supreme Court \
                 reports well. You use the 'legal_precedent_search' tool and report only cases \
                 it returned, keeping their citations exactly.",
            ),
            LegalRole::LegalDrafter => (
                "Legal Document Drafter",
                "Draft a formal document for the client (complaint, FIR draft or legal notice) \
                 grounded in the intake, the applicable IPC sections and the precedents.",
                "You are a senior advocate who drafts precise, well-structured pleadings in the \
                 format used by Indian courts. You never invent facts, sections or citations \
                 absent from your context.",
            ),
        };

        format!(
            "You are the {}.\n\nGOAL: {}\n\nBACKGROUND: {}\n\n\
             You work within a legal assistance crew. You do not give the final word on \
             legal questions; recommend consulting an advocate where appropriate.",
            role, goal, backstory
        )
    }

    /// Heading used when this role's output is passed to later steps
    pub fn title(&self) -> &'static str {
        match self {
            LegalRole::CaseIntake => "Case Intake",
            LegalRole::IpcSection => "IPC Section Analysis",
            LegalRole::LegalPrecedent => "Legal Precedents",
            LegalRole::LegalDrafter => "Legal Draft",
        }
    }
}

impl std::fmt::Display for LegalRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LegalRole::CaseIntake => write!(f, "CaseIntake"),
            LegalRole::IpcSection => write!(f, "IpcSection"),
            LegalRole::LegalPrecedent => write!(f, "LegalPrecedent"),
            LegalRole::LegalDrafter => write!(f, "LegalDrafter"),
        }
    }
}

/// Configuration for an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub role: LegalRole,
    pub model: String,
    pub system_prompt: String,
    pub temperature: f32,
    /// Which tools this agent can use
    pub allowed_tools: Vec<String>,
    /// Max iterations for ReAct loop
    pub max_iterations: usize,
}

impl AgentConfig {
    pub fn new(role: LegalRole) -> Self {
        Self {
            role,
            model: role.default_model().to_string(),
            system_prompt: role.system_prompt(),
            temperature: DEFAULT_TEMPERATURE,
            allowed_tools: role.allowed_tools(),
            max_iterations: 5,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sampling temperature, clamped to 0.0..=2.0
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_tools() {
        assert_eq!(LegalRole::IpcSection.allowed_tools(), vec!["ipc_sections_search"]);
        assert_eq!(LegalRole::LegalPrecedent.allowed_tools(), vec!["legal_precedent_search"]);
        assert!(LegalRole::CaseIntake.allowed_tools().is_empty());
        assert!(LegalRole::LegalDrafter.allowed_tools().is_empty());
    }

    #[test]
    fn test_system_prompt_names_role() {
        let prompt = LegalRole::IpcSection.system_prompt();
        assert!(prompt.contains("IPC Section Expert"));
        assert!(prompt.contains("ipc_sections_search"));
    }

    #[test]
    fn test_agent_config_new() {
        let config = AgentConfig::new(LegalRole::LegalDrafter).with_model("llama3:70b").with_max_iterations(0);
        assert_eq!(config.role, LegalRole::LegalDrafter);
        assert_eq!(config.model, "llama3:70b");
        assert_eq!(config.max_iterations, 1);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(config.with_temperature(3.5).temperature, 2.0);
    }

    #[test]
    fn test_role_serde_names() {
        assert_eq!(serde_json::to_string(&LegalRole::IpcSection).unwrap(), "\"ipc_section\"");
    }
}
