//! `classify_inbound`: calls the LLM's `ResponseAnalyzer` on the
//! triggering message, or synthesizes a `NO_RESPONSE` analysis for
//! scheduled triggers with nothing to classify (spec.md §4.4, §6).

use async_trait::async_trait;
use chrono::Utc;
use records_core::{Message, ResponseAnalysis};

use crate::context::GraphContext;
use crate::error::Result;
use crate::node::Node;
use crate::state::{CaseState, NodeName, NodeOutcome};

pub struct ClassifyInbound;

#[async_trait]
impl Node for ClassifyInbound {
    fn name(&self) -> NodeName {
        NodeName::ClassifyInbound
    }

    async fn run(&self, state: &mut CaseState, ctx: &GraphContext) -> Result<NodeOutcome> {
        let analysis = match state.trigger_message_id {
            Some(message_id) => {
                let message: Message = ctx.store.get_message(message_id).await?;
                let analysis = ctx.analyzer.analyze_response(&message, &state.case).await?;
                ctx.store.save_analysis(&analysis).await?;
                ctx.store
                    .mark_message_processed(message_id, state.run_id, Utc::now())
                    .await?;
                analysis
            }
            None => {
                state.push_reasoning("no triggering message, treating as a no-response follow-up check");
                ResponseAnalysis::no_response(records_core::MessageId(0))
            }
        };
        state.push_reasoning(format!("classified as {:?} (confidence {:.2})", analysis.classification, analysis.confidence));
        state.analysis = Some(analysis);
        Ok(NodeOutcome::Continue(NodeName::UpdateConstraints))
    }
}
