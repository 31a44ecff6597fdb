//! `Escalation` — a human-attention record, deduplicated per (case_id,
//! reason) within a rolling 1-hour window.

use crate::ids::{CaseId, EscalationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escalation {
    pub id: EscalationId,
    pub case_id: CaseId,
    pub reason: String,
    pub urgency: String,
    pub suggested_action: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Whether the external notification channel was ever told about this
    /// row. Spec.md §4.6: "only notify an external channel if
    /// `wasInserted=true`" — this flag lets the Store answer that exactly
    /// once per underlying insert, even if `upsertEscalation` is called
    /// again inside the dedup window.
    pub notified: bool,
}

/// The window within which repeated escalations for the same
/// `(case_id, reason)` are collapsed into the existing row (spec.md §3).
pub const ESCALATION_DEDUP_WINDOW_SECS: i64 = 3600;
