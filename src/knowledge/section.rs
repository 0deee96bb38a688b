//! IPC dataset records

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One section of the Indian Penal Code as stored in `ipc.json`.
///
/// Datasets in the wild disagree on types (`"Section": 302` vs `"302"`),
/// so every field accepts strings, numbers, booleans or null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpcSection {
    #[serde(rename = "Section", default, deserialize_with = "loose_string")]
    pub section: String,
    #[serde(rename = "Section_Title", default, deserialize_with = "loose_string")]
    pub section_title: String,
    #[serde(rename = "Description", default, deserialize_with = "loose_string")]
    pub description: String,
    #[serde(rename = "Chapter", default, deserialize_with = "loose_string")]
    pub chapter: String,
    #[serde(rename = "Chapter_Title", default, deserialize_with = "loose_string")]
    pub chapter_title: String,
    #[serde(rename = "Offense_Type", default, deserialize_with = "loose_string")]
    pub offense_type: String,
    #[serde(rename = "Punishment", default, deserialize_with = "loose_string")]
    pub punishment: String,
    #[serde(rename = "Is_Bailable", default, deserialize_with = "loose_string")]
    pub is_bailable: String,
    #[serde(rename = "Is_Cognizable", default, deserialize_with = "loose_string")]
    pub is_cognizable: String,
    #[serde(rename = "Triable_By", default, deserialize_with = "loose_string")]
    pub triable_by: String,
}

fn loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => if b { "Yes".to_string() } else { "No".to_string() },
        other => other.to_string(),
    })
}

/// Parse a JSON array of sections.
pub fn parse_sections(json: &str) -> serde_json::Result<Vec<IpcSection>> {
    serde_json::from_str(json)
}
