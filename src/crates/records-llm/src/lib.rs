//! The LLM boundary (spec.md §6): a `ResponseAnalyzer` for classifying
//! inbound mail and a `DraftGenerator` for drafting outbound mail, plus a
//! deterministic `MockProvider` for `DRY` runs and tests and an
//! `AnthropicProvider` for production use.

pub mod anthropic;
pub mod error;
pub mod mock;
pub mod traits;

pub use anthropic::AnthropicProvider;
pub use error::{LlmError, Result};
pub use mock::MockProvider;
pub use traits::{DraftContext, DraftGenerator, ResponseAnalyzer};
