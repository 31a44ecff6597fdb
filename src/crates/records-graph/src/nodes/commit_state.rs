//! `commit_state`: the terminal node of a successful run. Recomputes
//! `next_due_at`, persists the run's `DecisionTrace`, and finalizes the
//! `AgentRun` row (spec.md §4.4, §4.5).

use async_trait::async_trait;
use records_core::{DecisionTrace, DecisionTraceId};

use crate::context::GraphContext;
use crate::error::Result;
use crate::node::Node;
use crate::state::{CaseState, NodeName, NodeOutcome};

pub struct CommitState;

#[async_trait]
impl Node for CommitState {
    fn name(&self) -> NodeName {
        NodeName::CommitState
    }

    async fn run(&self, state: &mut CaseState, ctx: &GraphContext) -> Result<NodeOutcome> {
        if state.case.next_due_at.is_none() && !state.case.status.is_terminal() {
            let deadline = chrono::Utc::now() + chrono::Duration::days(ctx.settings.statutory_deadline_days as i64);
            state.case.next_due_at = Some(deadline);
            state.case.updated_at = chrono::Utc::now();
            ctx.store.save_case(&state.case).await?;
        }

        let trace = DecisionTrace {
            id: DecisionTraceId(0),
            run_id: state.run_id,
            case_id: state.case.id,
            classification: state.analysis.as_ref().map(|a| a.classification),
            router_output: serde_json::json!({
                "action_type": state.proposal_action_type,
                "can_auto_execute": state.can_auto_execute,
                "pause_reason": state.pause_reason,
                "reasoning": state.reasoning,
            }),
            node_trace: state.node_trace.clone(),
            gate_decision: state.execution_outcome.clone(),
            timings_ms: serde_json::Value::Null,
            created_at: chrono::Utc::now(),
        };
        ctx.store.save_decision_trace(trace).await?;

        state.push_reasoning("run committed");
        Ok(NodeOutcome::End("committed".to_string()))
    }
}
