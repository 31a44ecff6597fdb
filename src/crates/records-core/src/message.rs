//! The `Message` entity: one piece of correspondence, in or out.

use crate::enums::Direction;
use crate::ids::{CaseId, MessageId, RunId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub case_id: CaseId,
    pub direction: Direction,
    /// The mail provider's opaque send/receive ID. Never double-ingested:
    /// the store treats it as a dedup key on inbound webhook delivery.
    pub provider_message_id: Option<String>,
    /// RFC 2822 `Message-ID`, used verbatim for `In-Reply-To`/`References`
    /// threading on outbound replies.
    pub rfc2822_id: Option<String>,
    pub subject: Option<String>,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub message_type: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    /// Each inbound message has at most one triggering run recorded on it.
    pub processed_run_id: Option<RunId>,
    pub last_error: Option<String>,
}

impl Message {
    pub fn is_processed(&self) -> bool {
        self.processed_run_id.is_some()
    }
}
