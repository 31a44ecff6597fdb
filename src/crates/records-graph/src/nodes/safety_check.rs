//! `safety_check`: validates the draft against the case's current
//! constraints and scope_items before it ever reaches a human or the
//! executor (spec.md §4.4).
//!
//! The aggression-term list and the "acknowledgement context" phrases
//! below are a small, explicitly incomplete, English-specific word list
//! (spec.md §9 Open Questions) — not an attempt at exhaustive natural
//! language understanding.

use async_trait::async_trait;
use records_core::{ActionType, PauseReason, RiskFlag, ScopeItemStatus};
use regex::Regex;

use crate::context::GraphContext;
use crate::error::{GraphError, Result};
use crate::node::Node;
use crate::state::{CaseState, NodeName, NodeOutcome};

/// Phrases that mark a mention of an item as acknowledgement rather than
/// a fresh request for it.
const ACK_PHRASES: &[&str] = &["thank you", "thanks for", "received", "we acknowledge"];

/// Conservative, English-specific aggressive-language indicators.
const AGGRESSIVE_TERMS: &[&str] = &["lawsuit", "sue you", "incompetent", "outrageous", "unacceptable"];

pub struct SafetyCheck;

#[async_trait]
impl Node for SafetyCheck {
    fn name(&self) -> NodeName {
        NodeName::SafetyCheck
    }

    async fn run(&self, state: &mut CaseState, _ctx: &GraphContext) -> Result<NodeOutcome> {
        let draft = state
            .draft
            .clone()
            .ok_or_else(|| GraphError::RunFailed("safety_check entered with no draft".to_string()))?;
        let action_type = state
            .proposal_action_type
            .ok_or_else(|| GraphError::RunFailed("safety_check entered with no action type".to_string()))?;

        let body = format!("{} {}", draft.body_text, draft.body_html).to_lowercase();
        let mut flags = Vec::new();
        let mut warnings = Vec::new();

        for item in state.case.exempt_items() {
            if mentions_item(&body, &item.item) && !in_ack_context(&body, &item.item) {
                flags.push(RiskFlag::RequestsExemptItem);
                state.push_reasoning(format!("draft re-requests exempt item \"{}\"", item.item));
                break;
            }
        }

        if state.case.constraints.contains("FEE_ACCEPTED")
            && matches!(action_type, ActionType::NegotiateFee | ActionType::SendFeeWaiverRequest)
        {
            flags.push(RiskFlag::ContradictsFeeAcceptance);
            state.push_reasoning("draft contradicts a prior fee acceptance");
        }

        for item in state.case.scope_items.iter().filter(|s| s.status == ScopeItemStatus::Delivered) {
            if mentions_item(&body, &item.item) && !in_ack_context(&body, &item.item) {
                warnings.push("re-requests an already-delivered scope item".to_string());
                break;
            }
        }

        if !matches!(action_type, ActionType::SendRebuttal | ActionType::SendAppeal)
            && AGGRESSIVE_TERMS.iter().any(|term| body.contains(term))
        {
            warnings.push("draft contains aggressive language outside a rebuttal/appeal".to_string());
        }

        if contains_ssn(&body) {
            flags.push(RiskFlag::ContainsPii);
            state.push_reasoning("draft appears to contain a social security number");
        }

        let has_critical = flags.iter().any(|f| f.is_critical());
        state.risk_flags = flags;
        state.warnings.extend(warnings);

        if has_critical {
            state.can_auto_execute = false;
            state.requires_human = true;
            state.pause_reason = Some(PauseReason::Sensitive);
        }

        Ok(NodeOutcome::Continue(NodeName::GateOrExecute))
    }
}

fn mentions_item(body: &str, item: &str) -> bool {
    body.contains(&item.to_lowercase())
}

fn in_ack_context(body: &str, item: &str) -> bool {
    let item_lower = item.to_lowercase();
    if let Some(pos) = body.find(&item_lower) {
        let mut window_start = pos.saturating_sub(60);
        while window_start > 0 && !body.is_char_boundary(window_start) {
            window_start -= 1;
        }
        let window = &body[window_start..pos];
        return ACK_PHRASES.iter().any(|phrase| window.contains(phrase));
    }
    false
}

fn contains_ssn(body: &str) -> bool {
    let re = Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap();
    re.is_match(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_ssn_pattern() {
        assert!(contains_ssn("the suspect's ssn is 123-45-6789 on file"));
        assert!(!contains_ssn("no identifying numbers here"));
    }

    #[test]
    fn ack_context_suppresses_exempt_item_flag() {
        let body = "thank you for the body camera footage already provided.";
        assert!(in_ack_context(body, "body camera footage"));
    }

    #[test]
    fn bare_mention_is_not_ack_context() {
        let body = "please also send the body camera footage.";
        assert!(!in_ack_context(body, "body camera footage"));
    }

    #[test]
    fn multibyte_prefix_does_not_panic_on_window_slice() {
        let filler = "café résumé naïve piñata jalapeño ".repeat(3);
        let body = format!("{filler}please send the body camera footage.");
        assert!(!in_ack_context(&body, "body camera footage"));
    }
}
