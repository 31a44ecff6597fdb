//! The Executor (spec.md §4.6): turns an approved `Proposal` into exactly
//! one side effect, behind a compare-and-set claim on `execution_key`.

mod error;
mod executor;
mod gateway;

pub use error::{ExecutorError, Result};
pub use executor::{ExecutionOutcome, Executor};
pub use gateway::{DryGateway, LiveGateway, OutboundGateway};
