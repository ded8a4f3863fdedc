//! Seed data: the full contents of a store as one JSON document.
//!
//! A seed file looks like:
//!
//! ```json
//! {
//!   "exercises": [{"id": 1, "name": "Barbell Back Squat", "equipment": ["barbell"]}],
//!   "sessions": [],
//!   "spaces": [{"id": "home", "name": "Home", "isActive": true, "equipment": ["dumbbell"]}],
//!   "settings": {"units": "kg", "goal": "strength"}
//! }
//! ```
//!
//! Every collection is optional.

use chrono::{Duration, Utc};
use gymcoach_core::error::StoreError;
use gymcoach_core::fitness::{
    Exercise, ExerciseHistoryEntry, PlannedWorkout, SessionExercise, SessionSummary, TemplateExercise,
    UserNote, UserSettings, WorkoutSpace, WorkoutTemplate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Everything an [`InMemoryStore`](crate::InMemoryStore) holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitnessData {
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub sessions: Vec<SessionSummary>,
    #[serde(default)]
    pub templates: Vec<WorkoutTemplate>,
    #[serde(default)]
    pub history: Vec<ExerciseHistoryEntry>,
    #[serde(default)]
    pub spaces: Vec<WorkoutSpace>,
    #[serde(default)]
    pub notes: Vec<UserNote>,
    #[serde(default)]
    pub settings: UserSettings,
    #[serde(default)]
    pub planned: Vec<PlannedWorkout>,
}

impl FitnessData {
    /// Parse a seed document.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(|e| StoreError::QueryFailed(format!("invalid seed: {e}")))
    }

    /// Read and parse a seed file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::QueryFailed(format!("cannot read {}: {e}", path.display())))?;
        let data = Self::from_json(&content)?;
        debug!(
            path = %path.display(),
            exercises = data.exercises.len(),
            sessions = data.sessions.len(),
            "Seed data loaded"
        );
        Ok(data)
    }

    /// A small but complete demo profile: a library with aliases, a home
    /// gym with limited equipment, two weeks of sessions, and one template.
    pub fn demo() -> Self {
        let now = Utc::now();
        let ex = |id: i64, name: &str, aliases: &[&str], equipment: &[&str], muscles: &[&str]| Exercise {
            id,
            name: name.into(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
            equipment: equipment.iter().map(|s| s.to_string()).collect(),
            primary_muscles: muscles.iter().map(|s| s.to_string()).collect(),
            is_custom: false,
        };

        let exercises = vec![
            ex(1, "Barbell Back Squat", &["Back Squat"], &["barbell", "rack"], &["quads", "glutes"]),
            ex(2, "Barbell Bench Press", &["Bench Press"], &["barbell", "bench"], &["chest", "triceps"]),
            ex(3, "Conventional Deadlift", &["Deadlift"], &["barbell"], &["hamstrings", "glutes"]),
            ex(4, "Dumbbell Goblet Squat", &["Goblet Squat"], &["dumbbell"], &["quads"]),
            ex(5, "Dumbbell Bench Press", &["DB Bench"], &["dumbbell", "bench"], &["chest"]),
            ex(6, "Pull-Up", &["Pullup", "Chin-Up"], &["pull-up bar"], &["lats", "biceps"]),
            ex(7, "Push-Up", &["Pushup"], &["bodyweight"], &["chest", "triceps"]),
            ex(8, "Dumbbell Romanian Deadlift", &["DB RDL"], &["dumbbell"], &["hamstrings"]),
            ex(9, "Overhead Press", &["OHP", "Military Press"], &["barbell"], &["shoulders"]),
            ex(10, "Walking Lunge", &["Lunge"], &["bodyweight"], &["quads", "glutes"]),
            ex(11, "Dumbbell Row", &["One-Arm Row"], &["dumbbell", "bench"], &["lats"]),
            ex(12, "Plank", &[], &["bodyweight"], &["core"]),
        ];

        let set = |id: i64, name: &str, sets: u32, weight: f64, reps: u32| SessionExercise {
            exercise_id: id,
            name: name.into(),
            sets,
            top_weight: Some(weight),
            top_reps: Some(reps),
        };

        let sessions = vec![
            SessionSummary {
                id: "s-3".into(),
                name: "Lower A".into(),
                started_at: now - Duration::days(2),
                duration_minutes: Some(55),
                exercises: vec![
                    set(4, "Dumbbell Goblet Squat", 4, 32.0, 10),
                    set(8, "Dumbbell Romanian Deadlift", 3, 28.0, 10),
                ],
            },
            SessionSummary {
                id: "s-2".into(),
                name: "Upper A".into(),
                started_at: now - Duration::days(4),
                duration_minutes: Some(50),
                exercises: vec![set(5, "Dumbbell Bench Press", 4, 30.0, 8), set(11, "Dumbbell Row", 3, 30.0, 10)],
            },
            SessionSummary {
                id: "s-1".into(),
                name: "Lower A".into(),
                started_at: now - Duration::days(9),
                duration_minutes: Some(60),
                exercises: vec![set(4, "Dumbbell Goblet Squat", 4, 30.0, 10)],
            },
        ];

        let history = vec![
            ExerciseHistoryEntry {
                exercise_id: 4,
                name: "Dumbbell Goblet Squat".into(),
                last_performed: now - Duration::days(2),
                session_count: 2,
                best_weight: Some(32.0),
                best_reps: Some(10),
            },
            ExerciseHistoryEntry {
                exercise_id: 8,
                name: "Dumbbell Romanian Deadlift".into(),
                last_performed: now - Duration::days(2),
                session_count: 1,
                best_weight: Some(28.0),
                best_reps: Some(10),
            },
            ExerciseHistoryEntry {
                exercise_id: 5,
                name: "Dumbbell Bench Press".into(),
                last_performed: now - Duration::days(4),
                session_count: 1,
                best_weight: Some(30.0),
                best_reps: Some(8),
            },
        ];

        let templates = vec![WorkoutTemplate {
            id: "t-1".into(),
            name: "Lower A".into(),
            exercises: vec![
                TemplateExercise { exercise_id: 4, name: None, sets: 4, reps: 10, warmup_sets: Some(1) },
                TemplateExercise { exercise_id: 8, name: None, sets: 3, reps: 10, warmup_sets: None },
            ],
            updated_at: now - Duration::days(9),
        }];

        let spaces = vec![
            WorkoutSpace {
                id: "home".into(),
                name: "Home Gym".into(),
                is_active: true,
                equipment: vec!["dumbbell".into(), "bench".into(), "pull-up bar".into()],
            },
            WorkoutSpace {
                id: "club".into(),
                name: "Commercial Gym".into(),
                is_active: false,
                equipment: vec!["barbell".into(), "rack".into(), "bench".into(), "dumbbell".into()],
            },
        ];

        let notes = vec![UserNote {
            id: "n-1".into(),
            text: "Left knee gets cranky on deep lunges.".into(),
            created_at: now - Duration::days(6),
        }];

        Self {
            exercises,
            sessions,
            templates,
            history,
            spaces,
            notes,
            settings: UserSettings {
                units: "kg".into(),
                goal: Some("Build leg strength".into()),
                experience_level: Some("intermediate".into()),
                sessions_per_week: Some(3),
            },
            planned: Vec::new(),
        }
    }
}
