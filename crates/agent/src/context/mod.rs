//! Per-turn context: what the model is told about the user.
//!
//! | Piece | Role |
//! |-------|------|
//! | [`snapshot`] | Scope-gated, byte-bounded view of the fitness store |
//! | [`fingerprint`] | SHA-256 over the canonical snapshot JSON |
//! | [`history`] | Bounded window over prior conversation |

pub mod fingerprint;
pub mod history;
pub mod snapshot;

pub use fingerprint::{Fingerprint, canonical_json, fingerprint};
pub use history::{HistoryWindow, collapse_to_latest_user};
pub use snapshot::{
    BuiltContext, ContextContract, ContextSnapshot, ContractFlags, Section, SnapshotBuilder, SnapshotMeta,
    SnapshotRequest, TRUNCATION_ORDER,
};
