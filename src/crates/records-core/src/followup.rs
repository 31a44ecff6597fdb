//! `FollowUpSchedule` — zero or one per case.

use crate::ids::CaseId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpSchedule {
    pub case_id: CaseId,
    pub next_followup_date: Option<DateTime<Utc>>,
    pub followup_count: i32,
    pub last_followup_sent_at: Option<DateTime<Utc>>,
    pub status: String,
}

impl FollowUpSchedule {
    pub fn new(case_id: CaseId) -> Self {
        Self {
            case_id,
            next_followup_date: None,
            followup_count: 0,
            last_followup_sent_at: None,
            status: "active".to_string(),
        }
    }

    /// `followup_count` only ever increases.
    pub fn increment(&mut self, sent_at: DateTime<Utc>, next_followup_date: Option<DateTime<Utc>>) {
        self.followup_count += 1;
        self.last_followup_sent_at = Some(sent_at);
        self.next_followup_date = next_followup_date;
    }
}
