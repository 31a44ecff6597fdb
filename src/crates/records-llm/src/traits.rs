//! The two LLM interfaces (spec.md §6 "LLM interface"), split because
//! `analyzeResponse` and `generate<ActionType>` have unrelated input and
//! output shapes.

use async_trait::async_trait;
use records_core::{ActionType, Case, Draft, Message, ResponseAnalysis, ScopeItem};

use crate::error::Result;

/// Extra context threaded into draft generation: the adjustment
/// instruction from a human `ADJUST` decision, and the excluded items
/// derived from `EXEMPT` scope_items (spec.md §4.4 `draft_response`).
#[derive(Debug, Clone, Default)]
pub struct DraftContext {
    pub adjustment_instruction: Option<String>,
    pub exclude_items: Vec<String>,
    pub scope_items: Vec<ScopeItem>,
}

#[async_trait]
pub trait ResponseAnalyzer: Send + Sync {
    /// Classifies one inbound message. Output MUST be one of the closed
    /// enums in `records_core::enums`; a provider that returns
    /// non-conforming output is expected to fall back internally to
    /// `ResponseAnalysis::unknown`, not propagate a parse error, per
    /// spec.md §6.
    async fn analyze_response(&self, message: &Message, case: &Case) -> Result<ResponseAnalysis>;
}

#[async_trait]
pub trait DraftGenerator: Send + Sync {
    /// Synthesizes subject/body_text/body_html for `action_type`.
    async fn generate(
        &self,
        case: &Case,
        action_type: ActionType,
        context: &DraftContext,
    ) -> Result<Draft>;
}
