//! The persistence layer: the `Store` trait plus an in-memory reference
//! implementation and a Postgres-backed production implementation.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PgStore;
pub use traits::{ProposalUpsert, Store};
