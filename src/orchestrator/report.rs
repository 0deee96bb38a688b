//! Case reports and their on-disk store.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use super::Workflow;
use crate::agent::LegalRole;

/// The assembled result of one crew run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub case_description: String,
    pub intake: String,
    pub ipc_analysis: String,
    pub precedents: String,
    pub draft: String,
}

impl CaseReport {
    /// Assemble a report from a workflow; missing outputs become empty strings.
    pub fn from_workflow(workflow: &Workflow) -> Self {
        let output = |role| workflow.output_of(role).unwrap_or_default().to_string();
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            case_description: workflow.case_description.clone(),
            intake: output(LegalRole::CaseIntake),
            ipc_analysis: output(LegalRole::IpcSection),
            precedents: output(LegalRole::LegalPrecedent),
            draft: output(LegalRole::LegalDrafter),
        }
    }

    pub fn to_markdown(&self) -> String {
        let section = |title: &str, body: &str| {
            let body = if body.trim().is_empty() { "_Not available._" } else { body.trim() };
            format!("## {}\n\n{}\n\n", title, body)
        };

        let mut md = format!(
            "# Legal Case Report\n\n- **Report ID:** {}\n- **Created:** {}\n\n",
            self.id,
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        md.push_str(&section("Case Description", &self.case_description));
        md.push_str(&section(LegalRole::CaseIntake.title(), &self.intake));
        md.push_str(&section(LegalRole::IpcSection.title(), &self.ipc_analysis));
        md.push_str(&section(LegalRole::LegalPrecedent.title(), &self.precedents));
        md.push_str(&section(LegalRole::LegalDrafter.title(), &self.draft));
        md.push_str(
            "---\n_This report was generated automatically and is not legal advice. \
             Consult a qualified advocate before acting on it._\n",
        );
        md
    }
}

/// Writes each report as `{id}.json` and `{id}.md`
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn json_path(&self, id: &Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Save both renderings; returns the markdown path.
    pub async fn save(&self, report: &CaseReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create report directory {}", self.dir.display()))?;

        let json = serde_json::to_string_pretty(report).context("Failed to serialize case report")?;
        fs::write(self.json_path(&report.id), json)
            .await
            .context("Failed to write report JSON")?;

        let md_path = self.dir.join(format!("{}.md", report.id));
        fs::write(&md_path, report.to_markdown())
            .await
            .context("Failed to write report markdown")?;

        tracing::info!("Saved case report {} to {}", report.id, self.dir.display());
        Ok(md_path)
    }

    pub async fn load(&self, id: &Uuid) -> Result<CaseReport> {
        let json = fs::read_to_string(self.json_path(id))
            .await
            .with_context(|| format!("Failed to read report {}", id))?;
        serde_json::from_str(&json).context("Failed to deserialize case report")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> CaseReport {
        let mut wf = Workflow::legal_default("My neighbour broke into my house and took jewellery.");
        wf.complete_step(2, "Parties: complainant and neighbour.");
        wf.complete_step(3, "Section 380 and Section 454.");
        wf.complete_step(5, "To the Station House Officer ...");
        CaseReport::from_workflow(&wf)
    }

    #[test]
    fn test_markdown_sections() {
        let md = sample().to_markdown();
        assert!(md.starts_with("# Legal Case Report"));
        assert!(md.contains("## IPC Section Analysis\n\nSection 380 and Section 454."));
        assert!(md.contains("## Legal Precedents\n\n_Not available._"));
        assert!(md.contains("not legal advice"));
    }

    #[tokio::test]
    async fn test_report_save_load() {
        let dir = tempdir().unwrap();
        let store = ReportStore::new(dir.path().join("reports"));
        let report = sample();

        let md_path = store.save(&report).await.unwrap();
        assert!(md_path.exists());
        assert!(store.dir().join(format!("{}.json", report.id)).exists());

        let loaded = store.load(&report.id).await.unwrap();
        assert_eq!(loaded, report);
    }

    #[tokio::test]
    async fn test_load_missing_report() {
        let dir = tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        assert!(store.load(&Uuid::new_v4()).await.is_err());
    }
}
