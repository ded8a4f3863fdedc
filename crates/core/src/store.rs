//! FitnessStore trait: the persistent-store collaborator.
//!
//! The coach treats every method as an opaque, already-transactional
//! operation. Read methods feed the context snapshot and the read tools;
//! write methods are only reached through confirmed proposals and the
//! exercise resolver's create-missing path.

use async_trait::async_trait;
use crate::error::StoreError;
use crate::fitness::{
    EquipmentItem, Exercise, ExerciseHistoryEntry, PlannedWorkout, SessionSummary, TemplateExercise,
    UserNote, UserSettings, WorkoutSpace, WorkoutTemplate,
};

type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait FitnessStore: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    // ── Reads ──────────────────────────────────────────────────────

    /// Most recent sessions first.
    async fn recent_sessions(&self, limit: usize) -> StoreResult<Vec<SessionSummary>>;

    /// Total number of recorded sessions.
    async fn session_count(&self) -> StoreResult<usize>;

    /// Most recently updated templates first.
    async fn templates(&self, limit: usize) -> StoreResult<Vec<WorkoutTemplate>>;

    /// Total number of saved templates.
    async fn template_count(&self) -> StoreResult<usize>;

    /// Per-exercise history, most recently performed first.
    /// `exercise_id` narrows to a single exercise.
    async fn exercise_history(
        &self,
        exercise_id: Option<i64>,
        limit: usize,
    ) -> StoreResult<Vec<ExerciseHistoryEntry>>;

    /// The full exercise library.
    async fn exercise_library(&self) -> StoreResult<Vec<Exercise>>;

    async fn workout_spaces(&self) -> StoreResult<Vec<WorkoutSpace>>;

    /// Equipment available in one space.
    async fn equipment(&self, space_id: &str) -> StoreResult<Vec<EquipmentItem>>;

    /// Most recent notes first.
    async fn notes(&self, limit: usize) -> StoreResult<Vec<UserNote>>;

    async fn settings(&self) -> StoreResult<UserSettings>;

    // ── Writes ─────────────────────────────────────────────────────

    async fn create_template(
        &self,
        name: &str,
        exercises: Vec<TemplateExercise>,
    ) -> StoreResult<WorkoutTemplate>;

    async fn add_planned_workout(&self, workout: PlannedWorkout) -> StoreResult<PlannedWorkout>;

    async fn update_goal(&self, goal: &str) -> StoreResult<UserSettings>;

    async fn create_workout_space(&self, name: &str, equipment: Vec<String>) -> StoreResult<WorkoutSpace>;

    async fn update_workout_space(
        &self,
        space_id: &str,
        name: Option<String>,
        equipment: Option<Vec<String>>,
    ) -> StoreResult<WorkoutSpace>;

    /// Make one space active; every other space becomes inactive.
    async fn activate_workout_space(&self, space_id: &str) -> StoreResult<WorkoutSpace>;

    async fn create_custom_exercise(
        &self,
        name: &str,
        equipment: Vec<String>,
        primary_muscles: Vec<String>,
    ) -> StoreResult<Exercise>;
}
