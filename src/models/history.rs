// History data models
use super::options::FormOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub job_id: String,
    pub timestamp: String,
    pub metadata: FormOptions,
}

impl HistoryEntry {
    pub fn new(name: String, size: u64, mime_type: String, job_id: String, metadata: FormOptions) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            size,
            mime_type,
            job_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            metadata,
        }
    }
}
