//! `decide_next_action`: runs the Router (spec.md §4.3) and processes any
//! human decision delivered by a resume (spec.md §4.4).

use async_trait::async_trait;
use records_core::{ActionType, CaseStatus, HumanDecisionAction, ProposalStatus};
use records_router::{route, RouteInput};
use std::collections::HashMap;

use crate::context::GraphContext;
use crate::error::Result;
use crate::node::Node;
use crate::state::{CaseState, NodeName, NodeOutcome};

pub struct DecideNextAction;

#[async_trait]
impl Node for DecideNextAction {
    fn name(&self) -> NodeName {
        NodeName::DecideNextAction
    }

    async fn run(&self, state: &mut CaseState, ctx: &GraphContext) -> Result<NodeOutcome> {
        if let Some(decision) = state.human_decision.take() {
            return self.handle_human_decision(decision, state, ctx).await;
        }

        self.route_fresh(state, ctx).await
    }
}

impl DecideNextAction {
    async fn handle_human_decision(
        &self,
        decision: records_core::HumanDecision,
        state: &mut CaseState,
        ctx: &GraphContext,
    ) -> Result<NodeOutcome> {
        let Some(proposal_id) = state.proposal_id else {
            state.push_error("human decision received with no pending proposal");
            return Ok(NodeOutcome::End("no pending proposal for human decision".to_string()));
        };

        match decision.action {
            HumanDecisionAction::Approve => {
                state.push_reasoning("human approved, proceeding to execution");
                state.can_auto_execute = true;
                state.requires_human = false;
                Ok(NodeOutcome::Continue(NodeName::ExecuteAction))
            }
            HumanDecisionAction::Adjust => {
                state.adjustment_count += 1;
                state.adjustment_instruction = decision.instruction.clone();
                state.push_reasoning(format!(
                    "human requested adjustment (attempt {}): {}",
                    state.adjustment_count,
                    decision.instruction.as_deref().unwrap_or("<no instruction>")
                ));
                Ok(NodeOutcome::Continue(NodeName::DraftResponse))
            }
            HumanDecisionAction::Dismiss => {
                ctx.store
                    .set_proposal_status(proposal_id, ProposalStatus::Dismissed)
                    .await?;
                if let Some(action) = state.proposal_action_type {
                    *state.dismissed_action_counts.entry(action).or_insert(0) += 1;
                }
                state.proposal_id = None;
                state.proposal_key = None;
                state.push_reasoning("human dismissed the proposal, re-evaluating");
                self.route_fresh(state, ctx).await
            }
            HumanDecisionAction::Withdraw => {
                ctx.store
                    .set_proposal_status(proposal_id, ProposalStatus::Rejected)
                    .await?;
                state.case.status = CaseStatus::Cancelled;
                state.case.substatus = Some("withdrawn_by_human".to_string());
                state.case.updated_at = chrono::Utc::now();
                ctx.store.save_case(&state.case).await?;
                state.push_reasoning("human withdrew the request, case cancelled");
                Ok(NodeOutcome::End("withdrawn_by_human".to_string()))
            }
        }
    }

    async fn route_fresh(&self, state: &mut CaseState, ctx: &GraphContext) -> Result<NodeOutcome> {
        let Some(analysis) = state.analysis.clone() else {
            state.push_error("no analysis available to route on");
            return Ok(NodeOutcome::End("missing analysis".to_string()));
        };

        let followup = ctx.store.get_followup_schedule(state.case.id).await?;
        let followup_count = followup.map(|f| f.followup_count as u32).unwrap_or(0);
        let portal_automatable = state.case.agency.portal_url.is_some() && state.case.agency.portal_provider.is_some();
        let dismissed: HashMap<ActionType, u32> = state
            .dismissed_action_counts
            .iter()
            .map(|(k, v)| (*k, (*v).max(0) as u32))
            .collect();

        let input = RouteInput {
            classification: analysis.classification,
            denial_subtype: Some(analysis.denial_subtype()),
            strong_denial_indicator_count: analysis.strong_denial_indicator_count(),
            constraints: &state.case.constraints,
            followup_count,
            max_followups: ctx.settings.max_followups,
            portal_automatable,
            trigger_type: state.trigger_type,
            dismissed_action_counts: &dismissed,
            autopilot_mode: state.case.autopilot_mode,
            extracted_fee_amount: analysis.extracted_fee_amount,
            fee_auto_approve_max: ctx.settings.fee_auto_approve_max,
            fee_moderate_max: ctx.settings.fee_moderate_max,
        };

        let decision = route(&input);
        state.proposal_action_type = Some(decision.action_type);
        state.can_auto_execute = decision.can_auto_execute;
        state.requires_human = !decision.can_auto_execute;
        state.pause_reason = decision.pause_reason;
        for note in decision.reasoning {
            state.push_reasoning(note);
        }

        match decision.action_type {
            ActionType::None => {
                if analysis.classification == records_core::Classification::RecordsReady {
                    state.case.status = CaseStatus::Completed;
                    state.case.substatus = Some("records_received".to_string());
                    state.case.updated_at = chrono::Utc::now();
                    ctx.store.save_case(&state.case).await?;
                    state.push_reasoning("records delivered in full, closing the case");
                }
                Ok(NodeOutcome::End("no action required".to_string()))
            }
            ActionType::Escalate => Ok(NodeOutcome::Continue(NodeName::GateOrExecute)),
            _ => Ok(NodeOutcome::Continue(NodeName::DraftResponse)),
        }
    }
}
