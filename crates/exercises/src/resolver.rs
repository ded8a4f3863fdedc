//! Exercise resolution: free-text exercise references to library ids.
//!
//! Resolution order, first match wins:
//! 1. a supplied id that exists in the library
//! 2. an exact (case-insensitive) name or alias match in the pool
//! 3. a fuzzy match, accepted only when it is both good enough and clearly
//!    ahead of the runner-up
//! 4. optionally, a new custom exercise
//!
//! Anything else is returned for review with ranked suggestions. No entry
//! is ever dropped.

use gymcoach_core::fitness::{Exercise, ExerciseCandidate};
use gymcoach_core::store::FitnessStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::candidates::CandidatePool;
use crate::similarity::{best_score, normalize};

/// Thresholds for fuzzy resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionSettings {
    pub fuzzy_threshold: f64,
    pub tie_margin: f64,
    pub suggestion_floor: f64,
    pub max_suggestions: usize,
    /// Create a custom exercise for names with no plausible match.
    pub create_missing: bool,
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.82,
            tie_margin: 0.06,
            suggestion_floor: 0.45,
            max_suggestions: 3,
            create_missing: false,
        }
    }
}

impl ResolutionSettings {
    /// Clamp every threshold into `[0, 1]` and keep at least one suggestion.
    pub fn normalized(self) -> Self {
        Self {
            fuzzy_threshold: self.fuzzy_threshold.clamp(0.0, 1.0),
            tie_margin: self.tie_margin.clamp(0.0, 1.0),
            suggestion_floor: self.suggestion_floor.clamp(0.0, 1.0),
            max_suggestions: self.max_suggestions.max(1),
            create_missing: self.create_missing,
        }
    }
}

/// One exercise reference from a draft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ExerciseRef {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            exercise_id: None,
            name: Some(name.into()),
        }
    }

    pub fn by_id(id: i64) -> Self {
        Self {
            exercise_id: Some(id),
            name: None,
        }
    }

    fn label(&self) -> String {
        match (&self.name, self.exercise_id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => format!("#{id}"),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum ResolutionMethod {
    Id,
    Exact,
    Fuzzy { score: f64 },
    Created,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub exercise_id: i64,
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedExercise {
    /// Position of the entry in the input.
    pub index: usize,
    pub input: String,
    pub exercise_id: i64,
    pub name: String,
    pub method: ResolutionMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeedsReview {
    pub index: usize,
    pub input: String,
    pub suggestions: Vec<Suggestion>,
}

/// The outcome for a single reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved {
        exercise_id: i64,
        name: String,
        method: ResolutionMethod,
    },
    NeedsReview(Vec<Suggestion>),
}

/// Every input lands in exactly one of `mapped` or `needs_review`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionReport {
    pub mapped: Vec<ResolvedExercise>,
    pub needs_review: Vec<NeedsReview>,
    /// Custom exercises created during this resolution.
    pub created: Vec<Exercise>,
}

impl ResolutionReport {
    pub fn mapped_count(&self) -> usize {
        self.mapped.len()
    }

    /// The resolved id for an input position, if it resolved.
    pub fn id_at(&self, index: usize) -> Option<i64> {
        self.mapped.iter().find(|m| m.index == index).map(|m| m.exercise_id)
    }

    fn push(&mut self, index: usize, input: String, resolution: Resolution) {
        match resolution {
            Resolution::Resolved {
                exercise_id,
                name,
                method,
            } => self.mapped.push(ResolvedExercise {
                index,
                input,
                exercise_id,
                name,
                method,
            }),
            Resolution::NeedsReview(suggestions) => self.needs_review.push(NeedsReview {
                index,
                input,
                suggestions,
            }),
        }
    }
}

pub struct ExerciseResolver {
    library: Vec<Exercise>,
    pool: Option<Vec<ExerciseCandidate>>,
    settings: ResolutionSettings,
}

impl ExerciseResolver {
    pub fn new(library: Vec<Exercise>, settings: ResolutionSettings) -> Self {
        Self {
            library,
            pool: None,
            settings: settings.normalized(),
        }
    }

    /// Restrict name matching to a candidate pool.
    pub fn with_pool(mut self, pool: &CandidatePool) -> Self {
        self.pool = Some(pool.candidates().to_vec());
        self
    }

    fn search_space(&self) -> Vec<ExerciseCandidate> {
        match &self.pool {
            Some(pool) => pool.clone(),
            None => self.library.iter().map(ExerciseCandidate::from).collect(),
        }
    }

    /// Resolve one reference without touching the store.
    pub fn resolve_one(&self, entry: &ExerciseRef) -> Resolution {
        if let Some(id) = entry.exercise_id {
            if let Some(ex) = self.library.iter().find(|e| e.id == id) {
                return Resolution::Resolved {
                    exercise_id: ex.id,
                    name: ex.name.clone(),
                    method: ResolutionMethod::Id,
                };
            }
        }

        let Some(name) = entry.name.as_deref().filter(|n| !n.trim().is_empty()) else {
            return Resolution::NeedsReview(Vec::new());
        };

        let space = self.search_space();
        let wanted = normalize(name);

        let exact = space.iter().find(|c| {
            std::iter::once(&c.name)
                .chain(c.aliases.iter())
                .any(|n| n.trim().eq_ignore_ascii_case(name.trim()) || normalize(n) == wanted)
        });
        if let Some(c) = exact {
            return Resolution::Resolved {
                exercise_id: c.exercise_id,
                name: c.name.clone(),
                method: ResolutionMethod::Exact,
            };
        }

        let mut scored: Vec<Suggestion> = space
            .iter()
            .map(|c| Suggestion {
                exercise_id: c.exercise_id,
                name: c.name.clone(),
                score: best_score(name, std::iter::once(c.name.as_str()).chain(c.aliases.iter().map(String::as_str))),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.exercise_id.cmp(&b.exercise_id))
        });

        let s = &self.settings;
        if let Some(top) = scored.first() {
            let runner_up = scored.get(1).map_or(0.0, |r| r.score);
            if top.score >= s.fuzzy_threshold && top.score - runner_up >= s.tie_margin {
                return Resolution::Resolved {
                    exercise_id: top.exercise_id,
                    name: top.name.clone(),
                    method: ResolutionMethod::Fuzzy { score: top.score },
                };
            }
        }

        let suggestions: Vec<Suggestion> = scored
            .into_iter()
            .filter(|c| c.score >= s.suggestion_floor && c.score > 0.0)
            .take(s.max_suggestions)
            .collect();
        debug!(input = %name, suggestions = suggestions.len(), "Exercise needs review");
        Resolution::NeedsReview(suggestions)
    }

    /// Resolve every entry without creating anything.
    pub fn resolve(&self, entries: &[ExerciseRef]) -> ResolutionReport {
        let mut report = ResolutionReport::default();
        for (index, entry) in entries.iter().enumerate() {
            report.push(index, entry.label(), self.resolve_one(entry));
        }
        report
    }

    /// Resolve every entry, creating custom exercises for names with no
    /// suggestions when `create_missing` is set.
    ///
    /// A failed creation leaves the entry in review.
    pub async fn resolve_or_create(&self, entries: &[ExerciseRef], store: &dyn FitnessStore) -> ResolutionReport {
        let mut report = ResolutionReport::default();
        for (index, entry) in entries.iter().enumerate() {
            let mut resolution = self.resolve_one(entry);

            let creatable = match (&resolution, entry.name.as_deref()) {
                (Resolution::NeedsReview(suggestions), Some(name)) => {
                    self.settings.create_missing && suggestions.is_empty() && !name.trim().is_empty()
                }
                _ => false,
            };

            if creatable {
                let name = entry.name.as_deref().unwrap_or_default().trim();
                let already = report.created.iter().find(|e| e.name.eq_ignore_ascii_case(name)).cloned();
                let created = match already {
                    Some(ex) => Some(ex),
                    None => match store.create_custom_exercise(name, Vec::new(), Vec::new()).await {
                        Ok(ex) => {
                            debug!(id = ex.id, name = %ex.name, "Created custom exercise");
                            report.created.push(ex.clone());
                            Some(ex)
                        }
                        Err(e) => {
                            warn!(name = %name, error = %e, "Could not create custom exercise");
                            None
                        }
                    },
                };
                if let Some(ex) = created {
                    resolution = Resolution::Resolved {
                        exercise_id: ex.id,
                        name: ex.name,
                        method: ResolutionMethod::Created,
                    };
                }
            }

            report.push(index, entry.label(), resolution);
        }
        report
    }
}
