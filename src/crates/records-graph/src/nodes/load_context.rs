//! `load_context`: refreshes the case, recent messages, and per-action
//! dismissal counts the router needs (spec.md §4.4).

use async_trait::async_trait;

use crate::context::GraphContext;
use crate::error::Result;
use crate::node::Node;
use crate::state::{CaseState, NodeName, NodeOutcome};

/// Bounds how much correspondence history is loaded for context assembly.
const RECENT_MESSAGE_LIMIT: usize = 20;

pub struct LoadContext;

#[async_trait]
impl Node for LoadContext {
    fn name(&self) -> NodeName {
        NodeName::LoadContext
    }

    async fn run(&self, state: &mut CaseState, ctx: &GraphContext) -> Result<NodeOutcome> {
        state.case = ctx.store.get_case(state.case.id).await?;
        state.recent_messages = ctx.store.list_messages(state.case.id, RECENT_MESSAGE_LIMIT).await?;
        let dismissed = ctx.store.count_dismissed_actions(state.case.id).await?;
        state.dismissed_action_counts = dismissed;
        state.push_reasoning(format!("loaded case {} in status {:?}", state.case.id, state.case.status));
        Ok(NodeOutcome::Continue(NodeName::ClassifyInbound))
    }
}
