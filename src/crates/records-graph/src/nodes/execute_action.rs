//! `execute_action`: hands the gated proposal to the executor (spec.md
//! §4.6). The node itself does nothing idempotency-sensitive; all of that
//! lives in `records-executor::Executor`, which this node trusts as its
//! single source of truth for whether the side effect already happened.

use async_trait::async_trait;
use records_executor::ExecutionOutcome;

use crate::context::GraphContext;
use crate::error::{GraphError, Result};
use crate::node::Node;
use crate::state::{CaseState, NodeName, NodeOutcome};

pub struct ExecuteAction;

#[async_trait]
impl Node for ExecuteAction {
    fn name(&self) -> NodeName {
        NodeName::ExecuteAction
    }

    async fn run(&self, state: &mut CaseState, ctx: &GraphContext) -> Result<NodeOutcome> {
        let proposal_id = state
            .proposal_id
            .ok_or_else(|| GraphError::RunFailed("execute_action entered with no proposal".to_string()))?;

        let outcome = ctx.executor.execute(proposal_id).await?;

        match outcome {
            ExecutionOutcome::Executed { channel } => {
                state.execution_outcome = Some(format!("{channel:?}"));
                state.push_reasoning("action executed");
            }
            ExecutionOutcome::PortalTaskCreated => {
                state.execution_outcome = Some("portal_task_created".to_string());
                state.push_reasoning("portal submission requires manual completion");
            }
            ExecutionOutcome::AlreadyClaimed => {
                state.execution_outcome = Some("already_claimed".to_string());
                state.push_reasoning("proposal was already executed by a prior attempt");
            }
        }

        Ok(NodeOutcome::Continue(NodeName::CommitState))
    }
}
