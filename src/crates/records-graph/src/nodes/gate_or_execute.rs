//! `gate_or_execute`: upserts the Proposal under its deterministic key and
//! either continues to execution or suspends for human approval (spec.md
//! §4.4). Every side effect here MUST be idempotent: the node body
//! re-runs in full on resume, before branching on whether a human
//! decision is already present in state.

use async_trait::async_trait;
use records_core::{CaseStatus, Draft, Proposal, ProposalStatus};
use records_store::ProposalUpsert;

use crate::context::GraphContext;
use crate::error::{GraphError, Result};
use crate::node::Node;
use crate::state::{CaseState, InterruptPayload, NodeName, NodeOutcome};

pub struct GateOrExecute;

#[async_trait]
impl Node for GateOrExecute {
    fn name(&self) -> NodeName {
        NodeName::GateOrExecute
    }

    async fn run(&self, state: &mut CaseState, ctx: &GraphContext) -> Result<NodeOutcome> {
        let action_type = state
            .proposal_action_type
            .ok_or_else(|| GraphError::RunFailed("gate_or_execute entered with no action type".to_string()))?;

        let proposal_key = Proposal::make_key(
            state.case.id,
            state.trigger_message_id,
            action_type,
            state.adjustment_count,
        );
        let status = if state.can_auto_execute {
            ProposalStatus::Approved
        } else {
            ProposalStatus::PendingApproval
        };

        let proposal = ctx
            .store
            .upsert_proposal(ProposalUpsert {
                case_id: state.case.id,
                run_id: state.run_id,
                trigger_message_id: state.trigger_message_id,
                action_type,
                draft: state.draft.clone().unwrap_or_else(Draft::default),
                reasoning: state.reasoning.clone(),
                confidence: state.analysis.as_ref().map(|a| a.confidence).unwrap_or(1.0),
                risk_flags: state.risk_flags.clone(),
                warnings: state.warnings.clone(),
                can_auto_execute: state.can_auto_execute,
                requires_human: state.requires_human,
                status,
                proposal_key: proposal_key.clone(),
                adjustment_count: state.adjustment_count,
            })
            .await?;

        state.proposal_id = Some(proposal.id);
        state.proposal_key = Some(proposal.proposal_key.clone());

        if state.human_decision.is_some() {
            state.push_reasoning("resuming with a human decision already in hand");
            return Ok(NodeOutcome::Continue(NodeName::DecideNextAction));
        }

        if state.can_auto_execute {
            state.push_reasoning("proposal auto-executes");
            return Ok(NodeOutcome::Continue(NodeName::ExecuteAction));
        }

        let pause_reason = state
            .pause_reason
            .ok_or_else(|| GraphError::RunFailed("gated decision missing a pause reason".to_string()))?;

        state.case.status = CaseStatus::NeedsHumanReview;
        state.case.pause_reason = Some(pause_reason);
        state.case.updated_at = chrono::Utc::now();
        ctx.store.save_case(&state.case).await?;

        let summary = state
            .reasoning
            .last()
            .cloned()
            .unwrap_or_else(|| format!("{action_type:?} requires human approval"));

        state.push_reasoning("suspending for human approval");
        Ok(NodeOutcome::Suspend(InterruptPayload::human_approval(
            proposal.id,
            proposal_key,
            pause_reason,
            summary,
        )))
    }
}
