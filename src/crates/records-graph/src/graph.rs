//! `CaseGraph`: the fixed pipeline driver (spec.md §4.4). Each call to
//! `invoke`/`resume` runs nodes in sequence, checkpointing the state after
//! every node, until the run ends, suspends, or the iteration bound is
//! reached.

use std::collections::HashMap;
use std::sync::Arc;

use records_checkpoint::CheckpointSaver;
use records_core::{Case, HumanDecision, MessageId, ProposalId, RunId, TriggerType};
use tracing::{info, warn};

use crate::context::GraphContext;
use crate::error::{GraphError, Result};
use crate::node::Node;
use crate::nodes::{
    ClassifyInbound, CommitState, DecideNextAction, DraftResponse, ExecuteAction, GateOrExecute,
    LoadContext, SafetyCheck, UpdateConstraints,
};
use crate::state::{CaseState, InterruptPayload, NodeName, NodeOutcome};

/// What one `invoke`/`resume` call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(String),
    Suspended(InterruptPayload),
}

pub struct CaseGraph {
    ctx: GraphContext,
    checkpointer: Arc<dyn CheckpointSaver>,
    nodes: HashMap<NodeName, Arc<dyn Node>>,
}

impl CaseGraph {
    pub fn new(ctx: GraphContext, checkpointer: Arc<dyn CheckpointSaver>) -> Self {
        let mut nodes: HashMap<NodeName, Arc<dyn Node>> = HashMap::new();
        nodes.insert(NodeName::LoadContext, Arc::new(LoadContext));
        nodes.insert(NodeName::ClassifyInbound, Arc::new(ClassifyInbound));
        nodes.insert(NodeName::UpdateConstraints, Arc::new(UpdateConstraints));
        nodes.insert(NodeName::DecideNextAction, Arc::new(DecideNextAction));
        nodes.insert(NodeName::DraftResponse, Arc::new(DraftResponse));
        nodes.insert(NodeName::SafetyCheck, Arc::new(SafetyCheck));
        nodes.insert(NodeName::GateOrExecute, Arc::new(GateOrExecute));
        nodes.insert(NodeName::ExecuteAction, Arc::new(ExecuteAction));
        nodes.insert(NodeName::CommitState, Arc::new(CommitState));
        Self { ctx, checkpointer, nodes }
    }

    fn thread_id(case_id: records_core::CaseId) -> String {
        format!("case:{case_id}")
    }

    /// Starts a fresh run for `case` under `trigger_type`, entering at
    /// `load_context`.
    pub async fn invoke(
        &self,
        run_id: RunId,
        case: Case,
        trigger_type: TriggerType,
        trigger_message_id: Option<MessageId>,
    ) -> Result<RunOutcome> {
        let state = CaseState::initial(run_id, case, trigger_type, trigger_message_id);
        self.run_loop(NodeName::LoadContext, state).await
    }

    /// Resumes a suspended run for `case_id` with a human's decision,
    /// re-entering at `gate_or_execute` so the re-upsert and the decision
    /// handoff both happen through the normal node path (spec.md §4.4).
    /// Returns the `RunId` of the run being resumed, since the caller did
    /// not supply it: it travels inside the persisted `CaseState`.
    pub async fn resume(
        &self,
        case_id: records_core::CaseId,
        proposal_id: ProposalId,
        decision: HumanDecision,
    ) -> Result<(RunId, RunOutcome)> {
        let thread_id = Self::thread_id(case_id);
        let injected = serde_json::to_value(&decision).map_err(|e| GraphError::CorruptedCheckpoint(thread_id.clone(), e))?;
        let (node_name, snapshot) = self.checkpointer.resume(&thread_id, injected).await?;

        let mut state: CaseState = serde_json::from_value(snapshot)
            .map_err(|e| GraphError::CorruptedCheckpoint(thread_id.clone(), e))?;
        state.human_decision = Some(decision);
        state.proposal_id = Some(proposal_id);
        let run_id = state.run_id;

        let entry = NodeName::from_str(&node_name).ok_or_else(|| GraphError::UnknownNode(node_name.clone()))?;
        let outcome = self.run_loop(entry, state).await?;
        Ok((run_id, outcome))
    }

    async fn run_loop(&self, mut current: NodeName, mut state: CaseState) -> Result<RunOutcome> {
        let thread_id = Self::thread_id(state.case.id);

        loop {
            if current == NodeName::DecideNextAction {
                state.iteration_count += 1;
                if state.iteration_count > self.ctx.settings.max_iterations {
                    warn!(case_id = %state.case.id, "iteration bound reached, ending run");
                    let reason = format!("iteration bound ({}) reached", self.ctx.settings.max_iterations);
                    let snapshot = serde_json::to_value(&state)
                        .map_err(|e| GraphError::CorruptedCheckpoint(thread_id.clone(), e))?;
                    self.checkpointer.save(&thread_id, NodeName::CommitState.as_str(), snapshot).await?;
                    return Ok(RunOutcome::Completed(reason));
                }
            }

            state.push_trace(current);
            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| GraphError::UnknownNode(current.as_str().to_string()))?
                .clone();

            info!(case_id = %state.case.id, node = current.as_str(), "entering node");
            let outcome = node.run(&mut state, &self.ctx).await?;

            if state.has_errors() {
                return Err(GraphError::RunFailed(state.errors.join("; ")));
            }

            let snapshot = serde_json::to_value(&state).map_err(|e| GraphError::CorruptedCheckpoint(thread_id.clone(), e))?;

            match outcome {
                NodeOutcome::Continue(next) => {
                    self.checkpointer.save(&thread_id, next.as_str(), snapshot).await?;
                    current = next;
                }
                NodeOutcome::Suspend(payload) => {
                    self.checkpointer
                        .save(&thread_id, NodeName::GateOrExecute.as_str(), snapshot)
                        .await?;
                    return Ok(RunOutcome::Suspended(payload));
                }
                NodeOutcome::End(reason) => {
                    self.checkpointer.save(&thread_id, NodeName::CommitState.as_str(), snapshot).await?;
                    if state.case.status.is_terminal() {
                        self.checkpointer.delete_thread(&thread_id).await?;
                    }
                    return Ok(RunOutcome::Completed(reason));
                }
            }
        }
    }
}

impl NodeName {
    fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "load_context" => Self::LoadContext,
            "classify_inbound" => Self::ClassifyInbound,
            "update_constraints" => Self::UpdateConstraints,
            "decide_next_action" => Self::DecideNextAction,
            "draft_response" => Self::DraftResponse,
            "safety_check" => Self::SafetyCheck,
            "gate_or_execute" => Self::GateOrExecute,
            "execute_action" => Self::ExecuteAction,
            "commit_state" => Self::CommitState,
            _ => return None,
        })
    }
}
