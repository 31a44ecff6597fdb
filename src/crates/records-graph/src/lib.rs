//! The case graph (spec.md §4.4): a fixed nine-node pipeline over
//! `CaseState`, checkpointed between every node so a suspended run can
//! resume exactly where it left off.

pub mod context;
pub mod error;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod state;

pub use context::GraphContext;
pub use error::{GraphError, Result};
pub use graph::{CaseGraph, RunOutcome};
pub use node::Node;
pub use state::{CaseState, InterruptPayload, NodeName, NodeOutcome};
