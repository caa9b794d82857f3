use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Persisted shape of a task. Field names match the `task-data` cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub full_text: String,
    pub display_text: String,
    pub is_completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

pub fn encode_tasks(records: &[TaskRecord]) -> Result<String> {
    serde_json::to_string(records).context("serialising task records")
}

pub fn decode_tasks(raw: &str) -> Result<Vec<TaskRecord>> {
    serde_json::from_str(raw).context("parsing task records")
}
