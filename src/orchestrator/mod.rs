//! Orchestrator Module
//!
//! Coordinates the legal crew: the case workflow, the crew runner and
//! report persistence.

mod crew;
mod report;
mod workflow;

pub use crew::{CrewConfig, CrewError, CrewOutput, LegalCrew};
pub use report::{CaseReport, ReportStore};
pub use workflow::{Workflow, WorkflowStep};
