//! Legal Assistant
//!
//! A crew of four agents that turns a client's account of an incident into
//! a structured case, the applicable Indian Penal Code sections, supporting
//! precedents and a draft legal document:
//! - Local IPC statute index (fastembed + persisted vector collection)
//! - ReAct reasoning with structured tool calling
//! - Precedent search restricted to trusted Indian legal sources
//! - Persisted case reports

pub mod agent;
pub mod config;
pub mod knowledge;
pub mod orchestrator;
pub mod tools;
pub mod utils;

// Re-exports for convenience
pub use agent::LegalRole;
pub use config::AppConfig;
pub use knowledge::{IpcVectorDbSetup, VectorStore};
pub use orchestrator::{CaseReport, LegalCrew};
pub use tools::ToolRegistry;
