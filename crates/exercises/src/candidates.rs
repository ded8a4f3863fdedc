//! The per-turn candidate pool.
//!
//! The model may only reference exercises in the pool. It is the library
//! narrowed to what the active gym can support, with recently trained
//! exercises first, capped at a fixed size.

use gymcoach_core::fitness::{Exercise, ExerciseCandidate};
use std::collections::BTreeSet;

/// Equipment names that never need to be present in a space.
const ALWAYS_AVAILABLE: &[&str] = &["bodyweight", "none", "body weight"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePool {
    candidates: Vec<ExerciseCandidate>,
}

impl CandidatePool {
    /// Build the pool.
    ///
    /// `available` is the active space's equipment; `None` means unknown, in
    /// which case nothing is filtered out. `preferred` ids (recent history)
    /// are ordered first. At most `limit` candidates are kept.
    pub fn build(library: &[Exercise], available: Option<&[String]>, preferred: &[i64], limit: usize) -> Self {
        let available: Option<BTreeSet<String>> =
            available.map(|items| items.iter().map(|e| e.trim().to_lowercase()).collect());

        let usable = |exercise: &&Exercise| match &available {
            None => true,
            Some(have) => exercise.equipment.iter().all(|needed| {
                let needed = needed.trim().to_lowercase();
                ALWAYS_AVAILABLE.contains(&needed.as_str()) || have.contains(&needed)
            }),
        };

        let (mut first, rest): (Vec<&Exercise>, Vec<&Exercise>) =
            library.iter().filter(usable).partition(|e| preferred.contains(&e.id));
        first.sort_by_key(|e| preferred.iter().position(|p| *p == e.id));
        first.extend(rest);

        Self {
            candidates: first.into_iter().take(limit).map(ExerciseCandidate::from).collect(),
        }
    }

    /// A pool holding exactly these candidates.
    pub fn from_candidates(candidates: Vec<ExerciseCandidate>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[ExerciseCandidate] {
        &self.candidates
    }

    pub fn ids(&self) -> BTreeSet<i64> {
        self.candidates.iter().map(|c| c.exercise_id).collect()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.candidates.iter().any(|c| c.exercise_id == id)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
