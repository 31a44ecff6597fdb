//! `AgentRun` — one invocation of the case graph.

use crate::enums::{RunStatus, TriggerType};
use crate::ids::{CaseId, RunId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRun {
    pub id: RunId,
    pub case_id: CaseId,
    pub trigger_type: TriggerType,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub current_node: Option<String>,
    pub iteration_count: i32,
    pub error: Option<String>,
    pub metadata: serde_json::Value,
}

impl AgentRun {
    pub fn new(id: RunId, case_id: CaseId, trigger_type: TriggerType, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            case_id,
            trigger_type,
            status: RunStatus::Created,
            started_at,
            ended_at: None,
            current_node: None,
            iteration_count: 0,
            error: None,
            metadata: serde_json::Value::Null,
        }
    }
}
