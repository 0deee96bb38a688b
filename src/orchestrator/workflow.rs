//! Workflow - the ordered, dependency-aware steps of a legal crew run.

use serde::{Deserialize, Serialize};

use crate::agent::LegalRole;

/// A step in the workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowStep {
    pub step_num: usize,
    pub role: LegalRole,
    /// Task handed to the agent
    pub description: String,
    pub expected_output: String,
    /// Dependencies on other steps (by step number)
    pub depends_on: Vec<usize>,
    pub completed: bool,
    pub output: Option<String>,
}

impl WorkflowStep {
    fn new(step_num: usize, role: LegalRole, description: String, expected_output: &str, depends_on: Vec<usize>) -> Self {
        Self {
            step_num,
            role,
            description,
            expected_output: expected_output.to_string(),
            depends_on,
            completed: false,
            output: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workflow {
    pub case_description: String,
    pub steps: Vec<WorkflowStep>,
}

impl Workflow {
    pub fn new(case_description: impl Into<String>) -> Self {
        Self {
            case_description: case_description.into(),
            steps: Vec::new(),
        }
    }

    /// Intake, statute analysis, precedent research and drafting.
    ///
    /// Steps are numbered 2-5; step 1 is receiving the case and step 6
    /// is assembling the report, both done by the crew itself.
    pub fn legal_default(case_description: impl Into<String>) -> Self {
        let case = case_description.into();
        let steps = vec![
            WorkflowStep::new(
                2,
                LegalRole::CaseIntake,
                format!(
                    "Analyze the following case description and structure it: identify the \
                     parties involved, the incident, the timeline of events, the available \
                     evidence, and the relief the client seeks.\n\nCase description:\n{}",
                    case
                ),
                "A structured case summary with parties, incident, timeline, evidence and relief sought.",
                vec![],
            ),
            WorkflowStep::new(
                3,
                LegalRole::IpcSection,
                "Using the structured case, identify every applicable IPC section. Search the \
                 IPC database for each offence and explain why each section applies, with its \
                 punishment and whether it is cognizable and bailable."
                    .to_string(),
                "A list of applicable IPC sections with reasoning, punishment, cognizability and bailability.",
                vec![2],
            ),
            WorkflowStep::new(
                4,
                LegalRole::LegalPrecedent,
                "Find judgments of Indian courts relevant to this case and to the identified \
                 IPC sections. Summarise each precedent and how it applies."
                    .to_string(),
                "A list of relevant precedents with citations, court, summary and link.",
                vec![2, 3],
            ),
            WorkflowStep::new(
                5,
                LegalRole::LegalDrafter,
                "Draft a formal legal document for the client (a complaint or FIR draft) \
                 grounded in the case summary, the applicable IPC sections and the precedents."
                    .to_string(),
                "A complete, formally structured legal draft ready for review by an advocate.",
                vec![2, 3, 4],
            ),
        ];
        Self { case_description: case, steps }
    }

    pub fn step(&self, step_num: usize) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.step_num == step_num)
    }

    /// Steps not yet completed whose dependencies are all complete
    pub fn ready_steps(&self) -> Vec<&WorkflowStep> {
        self.steps
            .iter()
            .filter(|s| !s.completed)
            .filter(|s| {
                s.depends_on
                    .iter()
                    .all(|&dep| self.step(dep).map(|d| d.completed).unwrap_or(false))
            })
            .collect()
    }

    pub fn complete_step(&mut self, step_num: usize, output: impl Into<String>) {
        if let Some(step) = self.steps.iter_mut().find(|s| s.step_num == step_num) {
            step.completed = true;
            step.output = Some(output.into());
        }
    }

    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.completed)
    }

    /// Percentage of completed steps
    pub fn progress(&self) -> f32 {
        if self.steps.is_empty() {
            return 0.0;
        }
        (self.steps.iter().filter(|s| s.completed).count() as f32 / self.steps.len() as f32) * 100.0
    }

    /// Outputs of a step's dependencies, each under a `### {role}` header
    pub fn context_for(&self, step_num: usize) -> String {
        let Some(step) = self.step(step_num) else {
            return String::new();
        };
        step.depends_on
            .iter()
            .filter_map(|&dep| self.step(dep))
            .filter_map(|dep| dep.output.as_ref().map(|out| format!("### {}\n{}", dep.role.title(), out)))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Output produced by the given role, if its step has run
    pub fn output_of(&self, role: LegalRole) -> Option<&str> {
        self.steps.iter().find(|s| s.role == role).and_then(|s| s.output.as_deref())
    }

    pub fn summary(&self) -> String {
        let lines: Vec<String> = self
            .steps
            .iter()
            .map(|s| {
                let status = if s.completed { "✓" } else { " " };
                format!("[{}] {}. {} ({})", status, s.step_num, s.role.title(), s.role)
            })
            .collect();
        format!("Progress: {:.0}%\nSteps:\n{}", self.progress(), lines.join("\n"))
    }
}
