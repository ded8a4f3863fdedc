//! Fitness domain records.
//!
//! Read-only projections of what the store holds. They serialize in
//! camelCase because they are embedded verbatim in the context snapshot
//! and in tool results the model reads.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An exercise in the library (built-in or user-created).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub primary_muscles: Vec<String>,
    #[serde(default)]
    pub is_custom: bool,
}

/// A projection of a library exercise scoped to the current request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseCandidate {
    pub exercise_id: i64,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub primary_muscles: Vec<String>,
}

impl ExerciseCandidate {
    /// Model-facing view of a library row: trimmed names, blank and
    /// duplicate aliases dropped, equipment lowercased.
    pub fn from_exercise(e: &Exercise) -> Self {
        let name = e.name.trim().to_string();
        let mut aliases: Vec<String> = Vec::new();
        for alias in e.aliases.iter().map(|a| a.trim()) {
            if !alias.is_empty()
                && !alias.eq_ignore_ascii_case(&name)
                && !aliases.iter().any(|a| a.eq_ignore_ascii_case(alias))
            {
                aliases.push(alias.to_string());
            }
        }
        Self {
            exercise_id: e.id,
            name,
            aliases,
            equipment: e.equipment.iter().map(|q| q.trim().to_lowercase()).collect(),
            primary_muscles: e.primary_muscles.clone(),
        }
    }
}

impl From<&Exercise> for ExerciseCandidate {
    fn from(e: &Exercise) -> Self {
        Self::from_exercise(e)
    }
}

/// One exercise as logged within a past session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExercise {
    pub exercise_id: i64,
    pub name: String,
    pub sets: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_reps: Option<u32>,
}

/// A completed workout session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub name: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub exercises: Vec<SessionExercise>,
}

/// One exercise slot in a template or planned workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateExercise {
    pub exercise_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub sets: u32,
    pub reps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warmup_sets: Option<u32>,
}

/// A saved workout template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<TemplateExercise>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregated history for one exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseHistoryEntry {
    pub exercise_id: i64,
    pub name: String,
    pub last_performed: DateTime<Utc>,
    pub session_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_reps: Option<u32>,
}

/// A gym or training location with its equipment list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSpace {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub equipment: Vec<String>,
}

/// One piece of equipment available in a space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentItem {
    pub name: String,
    pub space_id: String,
}

/// A free-text note the user left for their coach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNote {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Profile-level training settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default = "default_units")]
    pub units: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions_per_week: Option<u32>,
}

fn default_units() -> String {
    "kg".into()
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            units: default_units(),
            goal: None,
            experience_level: None,
            sessions_per_week: None,
        }
    }
}

/// A workout scheduled for a future date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedWorkout {
    #[serde(default)]
    pub id: String,
    pub date: NaiveDate,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default)]
    pub exercises: Vec<TemplateExercise>,
}
