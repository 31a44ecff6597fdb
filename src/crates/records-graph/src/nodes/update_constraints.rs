//! `update_constraints`: merges the analysis's `constraints_to_add` and
//! `scope_updates` into the case (spec.md §4.4), append-dedup per
//! `Case::merge_constraints`/`merge_scope_updates`.

use async_trait::async_trait;

use crate::context::GraphContext;
use crate::error::Result;
use crate::node::Node;
use crate::state::{CaseState, NodeName, NodeOutcome};

pub struct UpdateConstraints;

#[async_trait]
impl Node for UpdateConstraints {
    fn name(&self) -> NodeName {
        NodeName::UpdateConstraints
    }

    async fn run(&self, state: &mut CaseState, ctx: &GraphContext) -> Result<NodeOutcome> {
        let Some(analysis) = state.analysis.clone() else {
            return Ok(NodeOutcome::Continue(NodeName::DecideNextAction));
        };

        let constraints_changed = state.case.merge_constraints(analysis.constraints_to_add.clone());
        let scope_changed = state.case.merge_scope_updates(analysis.scope_updates.clone());

        if constraints_changed || scope_changed {
            state.case.updated_at = chrono::Utc::now();
            ctx.store.save_case(&state.case).await?;
            state.push_reasoning("merged new constraints/scope updates into the case");
        }

        Ok(NodeOutcome::Continue(NodeName::DecideNextAction))
    }
}
