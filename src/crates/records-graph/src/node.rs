//! The `Node` trait every graph step implements.

use async_trait::async_trait;

use crate::context::GraphContext;
use crate::error::Result;
use crate::state::{CaseState, NodeName, NodeOutcome};

#[async_trait]
pub trait Node: Send + Sync {
    fn name(&self) -> NodeName;
    async fn run(&self, state: &mut CaseState, ctx: &GraphContext) -> Result<NodeOutcome>;
}
