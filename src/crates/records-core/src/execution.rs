//! `ExecutionRecord` — one attempt to perform a side effect, keyed by
//! `execution_key` (spec.md §3).

use crate::enums::{ActionType, Channel, ExecutionStatus};
use crate::ids::{ExecutionRecordId, ProposalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: ExecutionRecordId,
    pub proposal_id: ProposalId,
    pub execution_key: String,
    pub action_type: ActionType,
    pub channel: Channel,
    pub status: ExecutionStatus,
    pub created_at: DateTime<Utc>,
    pub detail: Option<String>,
}
