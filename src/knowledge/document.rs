//! Searchable documents built from IPC sections

use serde::{Deserialize, Serialize};

use super::section::IpcSection;

const NOT_SPECIFIED: &str = "Not specified";

/// Metadata carried alongside each indexed section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionMetadata {
    pub section: String,
    pub section_title: String,
    pub chapter: String,
    pub chapter_title: String,
    pub description: String,
    pub offense_type: String,
    pub punishment: String,
    pub is_bailable: String,
    pub is_cognizable: String,
    pub triable_by: String,
}

impl SectionMetadata {
    /// Look up a metadata field by its key name.
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "section" => &self.section,
            "section_title" => &self.section_title,
            "chapter" => &self.chapter,
            "chapter_title" => &self.chapter_title,
            "description" => &self.description,
            "offense_type" => &self.offense_type,
            "punishment" => &self.punishment,
            "is_bailable" => &self.is_bailable,
            "is_cognizable" => &self.is_cognizable,
            "triable_by" => &self.triable_by,
            _ => return None,
        };
        Some(value.as_str())
    }
}

impl From<&IpcSection> for SectionMetadata {
    fn from(s: &IpcSection) -> Self {
        Self {
            section: s.section.clone(),
            section_title: s.section_title.clone(),
            chapter: s.chapter.clone(),
            chapter_title: s.chapter_title.clone(),
            description: s.description.clone(),
            offense_type: s.offense_type.clone(),
            punishment: s.punishment.clone(),
            is_bailable: s.is_bailable.clone(),
            is_cognizable: s.is_cognizable.clone(),
            triable_by: s.triable_by.clone(),
        }
    }
}

/// A unit of the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub page_content: String,
    pub metadata: SectionMetadata,
    /// Populated when the document is added to a store
    pub embedding: Option<Vec<f32>>,
}

/// A search hit with its similarity score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

/// Conjunction of exact metadata equalities, e.g. `chapter = "XVI"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    conditions: Vec<(String, String)>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Unknown fields never match.
    pub fn matches(&self, metadata: &SectionMetadata) -> bool {
        self.conditions
            .iter()
            .all(|(field, value)| metadata.field(field) == Some(value.as_str()))
    }
}

fn or_not_specified(value: &str) -> &str {
    if value.trim().is_empty() { NOT_SPECIFIED } else { value }
}

/// Convert one IPC section into an indexable document.
pub fn prepare_document(section: &IpcSection, index: usize) -> Document {
    let page_content = format!(
        "Section {}: {}\n\n\
         Description: {}\n\n\
         Chapter: {} - {}\n\n\
         Offense Type: {}\n\
         Punishment: {}\n\
         Bailable: {}\n\
         Cognizable: {}\n\
         Triable By: {}",
        section.section,
        section.section_title,
        section.description,
        section.chapter,
        section.chapter_title,
        section.offense_type,
        section.punishment,
        or_not_specified(&section.is_bailable),
        or_not_specified(&section.is_cognizable),
        or_not_specified(&section.triable_by),
    );

    // The dataset repeats some section numbers, so the row index keeps ids unique.
    let id = if section.section.trim().is_empty() {
        format!("ipc-idx-{}", index)
    } else {
        format!("ipc-{}-{}", section.section.trim(), index)
    };

    Document {
        id,
        page_content,
        metadata: SectionMetadata::from(section),
        embedding: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn murder() -> IpcSection {
        IpcSection {
            section: "302".into(),
            section_title: "Punishment for murder".into(),
            description: "Whoever commits murder shall be punished".into(),
            chapter: "XVI".into(),
            chapter_title: "Offences affecting the human body".into(),
            punishment: "Death or imprisonment for life".into(),
            is_bailable: "Non-Bailable".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_prepare_document_content() {
        let doc = prepare_document(&murder(), 0);
        assert_eq!(doc.id, "ipc-302-0");
        assert!(doc.page_content.starts_with("Section 302: Punishment for murder"));
        assert!(doc.page_content.contains("Chapter: XVI - Offences affecting the human body"));
        assert!(doc.page_content.contains("Bailable: Non-Bailable"));
        assert!(doc.page_content.contains("Cognizable: Not specified"));
        assert!(doc.page_content.contains("Triable By: Not specified"));
        // Metadata keeps the raw (empty) value
        assert_eq!(doc.metadata.is_cognizable, "");
        assert!(doc.embedding.is_none());
    }

    #[test]
    fn test_prepare_document_without_section_number() {
        let doc = prepare_document(&IpcSection::default(), 7);
        assert_eq!(doc.id, "ipc-idx-7");
    }

    #[test]
    fn test_repeated_section_numbers_get_distinct_ids() {
        let a = prepare_document(&murder(), 4);
        let b = prepare_document(&murder(), 5);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_filter_matching() {
        let meta = SectionMetadata::from(&murder());
        assert!(MetadataFilter::new().matches(&meta));
        assert!(MetadataFilter::new().eq("chapter", "XVI").matches(&meta));
        assert!(!MetadataFilter::new().eq("chapter", "XVII").matches(&meta));
        assert!(!MetadataFilter::new().eq("court", "XVI").matches(&meta));
        assert!(!MetadataFilter::new()
            .eq("chapter", "XVI")
            .eq("section", "304")
            .matches(&meta));
    }
}
