//! `draft_response`: synthesizes the outbound draft for the chosen action
//! (spec.md §4.4), honoring exempt scope items and any adjustment
//! instruction from a human `ADJUST` decision.

use async_trait::async_trait;
use records_llm::DraftContext;

use crate::context::GraphContext;
use crate::error::{GraphError, Result};
use crate::node::Node;
use crate::state::{CaseState, NodeName, NodeOutcome};

pub struct DraftResponse;

#[async_trait]
impl Node for DraftResponse {
    fn name(&self) -> NodeName {
        NodeName::DraftResponse
    }

    async fn run(&self, state: &mut CaseState, ctx: &GraphContext) -> Result<NodeOutcome> {
        let action_type = state
            .proposal_action_type
            .ok_or_else(|| GraphError::RunFailed("draft_response entered with no action type".to_string()))?;

        let exclude_items: Vec<String> = state
            .case
            .exempt_items()
            .into_iter()
            .map(|item| item.item.clone())
            .collect();

        let draft_context = DraftContext {
            adjustment_instruction: state.adjustment_instruction.clone(),
            exclude_items,
            scope_items: state.case.scope_items.clone(),
        };

        let draft = ctx
            .drafter
            .generate(&state.case, action_type, &draft_context)
            .await?;

        state.push_reasoning(format!("drafted {action_type:?} response"));
        state.draft = Some(draft);
        Ok(NodeOutcome::Continue(NodeName::SafetyCheck))
    }
}
