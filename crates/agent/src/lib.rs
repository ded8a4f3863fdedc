//! The coach turn: context, tool loop, validation, and confirmation.
//!
//! One turn follows a **Gather → Act → Check** cycle:
//!
//! 1. **Gather** a scope-gated snapshot of the user's data and the
//!    exercise candidates their gym supports
//! 2. **Act** by calling the model, executing read tools and queuing
//!    write tools as proposals, looping until a text answer
//! 3. **Check** the answer against the response mode, repairing once
//!
//! Proposals run only when the caller confirms them through
//! [`Coach::confirm_proposal`].

pub mod coach;
pub mod context;
pub mod loop_runner;
pub mod prompts;
pub mod proposal;
pub mod repair;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use coach::{Coach, Diagnostics, Timings, TurnRequest, TurnResult, resolution_settings, resolve_exercises};
pub use context::{
    BuiltContext, ContextContract, ContextSnapshot, Fingerprint, HistoryWindow, SnapshotBuilder, SnapshotMeta,
    SnapshotRequest,
};
pub use loop_runner::{LoopOutcome, LoopSettings, MAX_TOOL_LOOPS, ToolEvent, ToolEventStatus, ToolLoop, allow_list};
pub use prompts::{PromptSet, SystemPromptInput};
pub use proposal::{Proposal, ProposalError, ProposalStatus};
pub use repair::{CheckedAnswer, OutputValidator, RepairOutcome, check_and_repair};
pub use stream_event::{AgentStreamEvent, EventSink};
