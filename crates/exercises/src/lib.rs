//! Exercise resolution for gymcoach.
//!
//! Maps free-text exercise references onto canonical library ids and builds
//! the per-turn candidate pool the model is allowed to reference.

pub mod candidates;
pub mod resolver;
pub mod similarity;

pub use candidates::CandidatePool;
pub use resolver::{
    ExerciseRef, ExerciseResolver, NeedsReview, Resolution, ResolutionMethod, ResolutionReport,
    ResolutionSettings, ResolvedExercise, Suggestion,
};
