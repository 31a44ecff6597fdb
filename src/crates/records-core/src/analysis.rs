//! `ResponseAnalysis` — the LLM's structured classification of one inbound
//! `Message`. Derived, never authoritative: the `Case` carries the merged
//! constraints and scope.

use crate::case::ScopeItem;
use crate::enums::{ActionType, Classification, DenialSubtype, Sentiment};
use crate::ids::MessageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseAnalysis {
    /// Unique per message.
    pub message_id: MessageId,
    pub classification: Classification,
    pub confidence: f64,
    pub sentiment: Sentiment,
    pub extracted_fee_amount: Option<f64>,
    pub extracted_deadline: Option<DateTime<Utc>>,
    pub constraints_to_add: Vec<String>,
    pub scope_updates: Vec<ScopeItem>,
    pub key_points: Vec<String>,
    pub requires_action: bool,
    pub suggested_action: Option<ActionType>,
}

impl ResponseAnalysis {
    /// A deterministic `NO_RESPONSE` analysis for scheduled triggers,
    /// emitted without calling the LLM at all.
    pub fn no_response(message_id: MessageId) -> Self {
        Self {
            message_id,
            classification: Classification::NoResponse,
            confidence: 1.0,
            sentiment: Sentiment::Neutral,
            extracted_fee_amount: None,
            extracted_deadline: None,
            constraints_to_add: Vec::new(),
            scope_updates: Vec::new(),
            key_points: Vec::new(),
            requires_action: true,
            suggested_action: Some(ActionType::SendFollowup),
        }
    }

    /// An `UNKNOWN`/confidence-0 analysis, the fallback a caller produces
    /// when the LLM returns non-conforming output rather than trusting it.
    pub fn unknown(message_id: MessageId) -> Self {
        Self {
            message_id,
            classification: Classification::Unknown,
            confidence: 0.0,
            sentiment: Sentiment::Neutral,
            extracted_fee_amount: None,
            extracted_deadline: None,
            constraints_to_add: Vec::new(),
            scope_updates: Vec::new(),
            key_points: Vec::new(),
            requires_action: true,
            suggested_action: None,
        }
    }

    /// Heuristic count of "strong" denial indicators among the key points,
    /// used by the router's denial-subtype dispatch. Deliberately a small,
    /// conservative keyword list rather than an attempt at exhaustive legal
    /// classification — see DESIGN.md for the reasoning.
    pub fn strong_denial_indicator_count(&self) -> usize {
        const STRONG_INDICATORS: &[&str] = &[
            "ongoing investigation",
            "active investigation",
            "juvenile",
            "sealed",
            "court order",
            "grand jury",
            "national security",
        ];
        self.key_points
            .iter()
            .filter(|point| {
                let lower = point.to_lowercase();
                STRONG_INDICATORS.iter().any(|ind| lower.contains(ind))
            })
            .count()
    }

    /// Derives the `DENIAL` subtype the router's denial dispatch needs
    /// (spec.md §4.3) from the key points, since the closed analysis schema
    /// in spec.md §6 has no dedicated subtype field. Keyword-driven and
    /// conservative by design, same as `strong_denial_indicator_count` — see
    /// DESIGN.md for why this heuristic, not a guessed taxonomy, is the
    /// Open Question decision.
    pub fn denial_subtype(&self) -> DenialSubtype {
        let joined = self.key_points.join(" ").to_lowercase();
        if joined.contains("neither confirm nor deny") || joined.contains("glomar") {
            DenialSubtype::GlomarNcnd
        } else if joined.contains("juvenile") {
            DenialSubtype::JuvenileRecords
        } else if joined.contains("sealed") || joined.contains("court order") {
            DenialSubtype::SealedCourtOrder
        } else if joined.contains("ongoing investigation") || joined.contains("active investigation") {
            DenialSubtype::OngoingInvestigation
        } else if joined.contains("overly broad")
            || joined.contains("overbroad")
            || joined.contains("too broad")
            || joined.contains("unduly burdensome")
        {
            DenialSubtype::OverlyBroad
        } else {
            DenialSubtype::Other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis_with_points(points: &[&str]) -> ResponseAnalysis {
        let mut analysis = ResponseAnalysis::unknown(MessageId(1));
        analysis.key_points = points.iter().map(|s| s.to_string()).collect();
        analysis
    }

    #[test]
    fn denial_subtype_detects_glomar() {
        let analysis = analysis_with_points(&["agency will neither confirm nor deny the records exist"]);
        assert_eq!(analysis.denial_subtype(), DenialSubtype::GlomarNcnd);
    }

    #[test]
    fn denial_subtype_detects_juvenile() {
        let analysis = analysis_with_points(&["records pertain to a juvenile"]);
        assert_eq!(analysis.denial_subtype(), DenialSubtype::JuvenileRecords);
    }

    #[test]
    fn denial_subtype_falls_back_to_other() {
        let analysis = analysis_with_points(&["denied citing a routine exemption"]);
        assert_eq!(analysis.denial_subtype(), DenialSubtype::Other);
    }

    #[test]
    fn strong_indicator_count_matches_key_points() {
        let analysis = analysis_with_points(&["cites an ongoing investigation", "also sealed by court order"]);
        assert_eq!(analysis.strong_denial_indicator_count(), 2);
    }
}
