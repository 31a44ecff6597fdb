//! `GraphContext` — the collaborators every node is handed: the Store,
//! the LLM interfaces, and the settings the router and commit_state need.
//! Constructed once per process and shared across every invocation
//! (spec.md §9 "Global mutable state ... confined to ... the compiled
//! graph singleton").

use std::sync::Arc;

use records_config::Settings;
use records_executor::Executor;
use records_llm::{DraftGenerator, ResponseAnalyzer};
use records_store::Store;

#[derive(Clone)]
pub struct GraphContext {
    pub store: Arc<dyn Store>,
    pub analyzer: Arc<dyn ResponseAnalyzer>,
    pub drafter: Arc<dyn DraftGenerator>,
    pub executor: Arc<Executor>,
    pub settings: Settings,
}

impl GraphContext {
    pub fn new(
        store: Arc<dyn Store>,
        analyzer: Arc<dyn ResponseAnalyzer>,
        drafter: Arc<dyn DraftGenerator>,
        executor: Arc<Executor>,
        settings: Settings,
    ) -> Self {
        Self {
            store,
            analyzer,
            drafter,
            executor,
            settings,
        }
    }
}
