//! The `Case` entity and its scope items.

use crate::enums::{AutopilotMode, CaseStatus, PauseReason, ScopeItemStatus};
use crate::ids::CaseId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One requested record kind and its current status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeItem {
    pub item: String,
    pub status: ScopeItemStatus,
    pub reason: Option<String>,
}

impl ScopeItem {
    /// Case-insensitive key used when merging scope updates into a case.
    pub fn merge_key(&self) -> String {
        self.item.to_lowercase()
    }
}

/// The agency this case's request targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgencyIdentity {
    pub name: String,
    pub email: Option<String>,
    pub portal_url: Option<String>,
    pub portal_provider: Option<String>,
}

impl AgencyIdentity {
    /// A case with a non-null portal URL must never have an email-send
    /// proposal executed against it; the executor's portal guard checks
    /// this before dispatching.
    pub fn is_portal_only(&self) -> bool {
        self.portal_url.is_some()
    }
}

/// Portal submission bookkeeping on a `Case`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortalBookkeeping {
    pub last_portal_status: Option<String>,
    pub last_portal_submitted_at: Option<DateTime<Utc>>,
    pub last_portal_error: Option<String>,
}

/// The subject of automation: one request to one agency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub agency: AgencyIdentity,
    pub jurisdiction_code: String,
    pub status: CaseStatus,
    pub substatus: Option<String>,
    pub pause_reason: Option<PauseReason>,
    pub constraints: BTreeSet<String>,
    pub scope_items: Vec<ScopeItem>,
    pub next_due_at: Option<DateTime<Utc>>,
    pub autopilot_mode: AutopilotMode,
    pub portal: PortalBookkeeping,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Case {
    /// Append-dedup merge of analysis-derived constraint codes; no
    /// constraint is ever silently dropped. Returns whether the set
    /// actually changed, since the caller only writes back to the case
    /// when it does.
    pub fn merge_constraints<I: IntoIterator<Item = String>>(&mut self, codes: I) -> bool {
        let before = self.constraints.len();
        let mut changed = false;
        for code in codes {
            changed |= self.constraints.insert(code);
        }
        changed || self.constraints.len() != before
    }

    /// Merge scope updates by case-insensitive item key: new items are
    /// appended, existing items are overwritten field-wise.
    pub fn merge_scope_updates<I: IntoIterator<Item = ScopeItem>>(&mut self, updates: I) -> bool {
        let mut changed = false;
        for update in updates {
            let key = update.merge_key();
            if let Some(existing) = self
                .scope_items
                .iter_mut()
                .find(|s| s.merge_key() == key)
            {
                if *existing != update {
                    *existing = update;
                    changed = true;
                }
            } else {
                self.scope_items.push(update);
                changed = true;
            }
        }
        changed
    }

    /// Items in the `EXEMPT` state, used to derive excluded items when
    /// drafting a response.
    pub fn exempt_items(&self) -> Vec<&ScopeItem> {
        self.scope_items
            .iter()
            .filter(|s| s.status == ScopeItemStatus::Exempt)
            .collect()
    }

    /// Items in the `DELIVERED` state, used by the re-request-detection
    /// safety rule.
    pub fn delivered_items(&self) -> Vec<&ScopeItem> {
        self.scope_items
            .iter()
            .filter(|s| s.status == ScopeItemStatus::Delivered)
            .collect()
    }
}
