//! `PortalTask` — a manual-submission work item (spec.md §3).

use crate::enums::PortalTaskStatus;
use crate::ids::{CaseId, PortalTaskId, ProposalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalTask {
    pub id: PortalTaskId,
    pub case_id: CaseId,
    pub proposal_id: ProposalId,
    pub status: PortalTaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
