//! Output contracts for the coach.
//!
//! The model's final answer is free text. This crate recovers structure
//! from it and decides whether it meets the contract for the turn's mode:
//!
//! ```text
//! model text ──▶ parser ──▶ envelope (ActionDraft?) ──▶ validation ──▶ ok
//!                                                          │
//!                                                          ▼
//!                                              repair prompt / fallback
//! ```
//!
//! Parsing never fails; validation returns a [`ValidationResult`] that the
//! agent uses to decide on a single repair round-trip.

pub mod envelope;
pub mod parser;
pub mod repair;
pub mod validation;

pub use envelope::{
    ActionDraft, AssistantEnvelope, CONTRACT_VERSION, DraftExercise, DraftKind, DraftPayload,
    ExercisePlanPayload, GymPayload, ParsedOutput, ReviewItem, ReviewSuggestion, Risk, parse_envelope,
};
pub use parser::{BlockSource, FencedBlock, extract_json, parse_json_lenient};
pub use repair::{RepairRequest, fallback_message, repair_prompt};
pub use validation::{
    ParsedAnswer, ResponseMode, ResponseValidator, TemplateJson, TemplateJsonExercise, ValidationContext,
    ValidationFailure, ValidationResult,
};

/// Errors from the contract subsystem.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("invalid contract pattern '{name}': {reason}")]
    Pattern { name: String, reason: String },

    #[error("unknown response mode '{0}' (expected general, workout or template_json)")]
    UnknownMode(String),
}
