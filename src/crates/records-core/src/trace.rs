//! `DecisionTrace` — per-run audit record (spec.md §3).

use crate::enums::Classification;
use crate::ids::{CaseId, DecisionTraceId, RunId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTrace {
    pub id: DecisionTraceId,
    pub run_id: RunId,
    pub case_id: CaseId,
    pub classification: Option<Classification>,
    pub router_output: serde_json::Value,
    pub node_trace: Vec<String>,
    pub gate_decision: Option<String>,
    pub timings_ms: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
