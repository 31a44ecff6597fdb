//! Opaque integer identifiers for every persisted entity.
//!
//! IDs are opaque integers unless otherwise noted. These newtypes exist so
//! a `CaseId` and a `RunId` can never be swapped at a call site by
//! accident, while still being `i64` underneath for `sqlx`.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(v: i64) -> Self {
                Self(v)
            }
        }

        impl From<$name> for i64 {
            fn from(v: $name) -> Self {
                v.0
            }
        }
    };
}

opaque_id!(CaseId);
opaque_id!(MessageId);
opaque_id!(ProposalId);
opaque_id!(RunId);
opaque_id!(EscalationId);
opaque_id!(PortalTaskId);
opaque_id!(ExecutionRecordId);
opaque_id!(DecisionTraceId);
