//! # gymcoach core
//!
//! Domain types, traits, and error definitions for the gymcoach
//! orchestration core. This crate has no framework dependencies; it
//! defines the model every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Each external collaborator is a trait here:
//! - [`Provider`]: the chat-completion model service
//! - [`FitnessStore`]: the local fitness database
//! - [`Tool`]: one entry of the fixed tool catalog
//!
//! Implementations live in their own crates, so tests can swap in scripted
//! providers and in-memory stores.

pub mod error;
pub mod fitness;
pub mod message;
pub mod provider;
pub mod schema;
pub mod scope;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, StoreError, ToolError};
pub use fitness::{
    EquipmentItem, Exercise, ExerciseCandidate, ExerciseHistoryEntry, PlannedWorkout, SessionSummary,
    TemplateExercise, UserNote, UserSettings, WorkoutSpace, WorkoutTemplate,
};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, ToolDefinition, Usage};
pub use scope::{Scope, ScopeSet};
pub use store::FitnessStore;
pub use tool::{Tool, ToolCall, ToolKind, ToolRegistry, ToolResult};
