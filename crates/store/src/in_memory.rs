//! In-memory store: backs the CLI and every test.

use async_trait::async_trait;
use chrono::Utc;
use gymcoach_core::error::StoreError;
use gymcoach_core::fitness::{
    EquipmentItem, Exercise, ExerciseHistoryEntry, PlannedWorkout, SessionSummary, TemplateExercise,
    UserNote, UserSettings, WorkoutSpace, WorkoutTemplate,
};
use gymcoach_core::store::FitnessStore;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::seed::FitnessData;

/// A store that keeps every collection in one lock-guarded [`FitnessData`].
pub struct InMemoryStore {
    data: Arc<RwLock<FitnessData>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::from_data(FitnessData::default())
    }

    pub fn from_data(data: FitnessData) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// A copy of everything currently stored.
    pub async fn dump(&self) -> FitnessData {
        self.data.read().await.clone()
    }

    /// Planned workouts, in insertion order.
    pub async fn planned_workouts(&self) -> Vec<PlannedWorkout> {
        self.data.read().await.planned.clone()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn require_name(name: &str, what: &str) -> Result<String, StoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::WriteRejected(format!("{what} name must not be empty")));
    }
    Ok(trimmed.to_string())
}

#[async_trait]
impl FitnessStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>, StoreError> {
        let data = self.data.read().await;
        let mut sessions = data.sessions.clone();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        sessions.truncate(limit);
        Ok(sessions)
    }

    async fn session_count(&self) -> Result<usize, StoreError> {
        Ok(self.data.read().await.sessions.len())
    }

    async fn templates(&self, limit: usize) -> Result<Vec<WorkoutTemplate>, StoreError> {
        let data = self.data.read().await;
        let mut templates = data.templates.clone();
        templates.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        templates.truncate(limit);
        Ok(templates)
    }

    async fn template_count(&self) -> Result<usize, StoreError> {
        Ok(self.data.read().await.templates.len())
    }

    async fn exercise_history(
        &self,
        exercise_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<ExerciseHistoryEntry>, StoreError> {
        let data = self.data.read().await;
        let mut history: Vec<ExerciseHistoryEntry> = data
            .history
            .iter()
            .filter(|h| exercise_id.is_none_or(|id| h.exercise_id == id))
            .cloned()
            .collect();
        history.sort_by(|a, b| b.last_performed.cmp(&a.last_performed));
        history.truncate(limit);
        Ok(history)
    }

    async fn exercise_library(&self) -> Result<Vec<Exercise>, StoreError> {
        Ok(self.data.read().await.exercises.clone())
    }

    async fn workout_spaces(&self) -> Result<Vec<WorkoutSpace>, StoreError> {
        Ok(self.data.read().await.spaces.clone())
    }

    async fn equipment(&self, space_id: &str) -> Result<Vec<EquipmentItem>, StoreError> {
        let data = self.data.read().await;
        let space = data
            .spaces
            .iter()
            .find(|s| s.id == space_id)
            .ok_or_else(|| StoreError::NotFound(format!("workout space {space_id}")))?;
        Ok(space
            .equipment
            .iter()
            .map(|name| EquipmentItem {
                name: name.clone(),
                space_id: space.id.clone(),
            })
            .collect())
    }

    async fn notes(&self, limit: usize) -> Result<Vec<UserNote>, StoreError> {
        let data = self.data.read().await;
        let mut notes = data.notes.clone();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notes.truncate(limit);
        Ok(notes)
    }

    async fn settings(&self) -> Result<UserSettings, StoreError> {
        Ok(self.data.read().await.settings.clone())
    }

    async fn create_template(
        &self,
        name: &str,
        exercises: Vec<TemplateExercise>,
    ) -> Result<WorkoutTemplate, StoreError> {
        let name = require_name(name, "template")?;
        let mut data = self.data.write().await;
        for ex in &exercises {
            if !data.exercises.iter().any(|e| e.id == ex.exercise_id) {
                return Err(StoreError::WriteRejected(format!(
                    "exercise {} is not in the library",
                    ex.exercise_id
                )));
            }
        }
        let template = WorkoutTemplate {
            id: Uuid::new_v4().to_string(),
            name,
            exercises,
            updated_at: Utc::now(),
        };
        data.templates.push(template.clone());
        debug!(id = %template.id, "Template created");
        Ok(template)
    }

    async fn add_planned_workout(&self, mut workout: PlannedWorkout) -> Result<PlannedWorkout, StoreError> {
        workout.title = require_name(&workout.title, "planned workout")?;
        if workout.id.is_empty() {
            workout.id = Uuid::new_v4().to_string();
        }
        let mut data = self.data.write().await;
        if let Some(template_id) = &workout.template_id {
            if !data.templates.iter().any(|t| &t.id == template_id) {
                return Err(StoreError::NotFound(format!("template {template_id}")));
            }
        }
        data.planned.push(workout.clone());
        Ok(workout)
    }

    async fn update_goal(&self, goal: &str) -> Result<UserSettings, StoreError> {
        let goal = require_name(goal, "goal")?;
        let mut data = self.data.write().await;
        data.settings.goal = Some(goal);
        Ok(data.settings.clone())
    }

    async fn create_workout_space(&self, name: &str, equipment: Vec<String>) -> Result<WorkoutSpace, StoreError> {
        let name = require_name(name, "workout space")?;
        let mut data = self.data.write().await;
        let space = WorkoutSpace {
            id: Uuid::new_v4().to_string(),
            name,
            is_active: data.spaces.is_empty(),
            equipment,
        };
        data.spaces.push(space.clone());
        Ok(space)
    }

    async fn update_workout_space(
        &self,
        space_id: &str,
        name: Option<String>,
        equipment: Option<Vec<String>>,
    ) -> Result<WorkoutSpace, StoreError> {
        let name = name.map(|n| require_name(&n, "workout space")).transpose()?;
        let mut data = self.data.write().await;
        let space = data
            .spaces
            .iter_mut()
            .find(|s| s.id == space_id)
            .ok_or_else(|| StoreError::NotFound(format!("workout space {space_id}")))?;
        if let Some(name) = name {
            space.name = name;
        }
        if let Some(equipment) = equipment {
            space.equipment = equipment;
        }
        Ok(space.clone())
    }

    async fn activate_workout_space(&self, space_id: &str) -> Result<WorkoutSpace, StoreError> {
        let mut data = self.data.write().await;
        if !data.spaces.iter().any(|s| s.id == space_id) {
            return Err(StoreError::NotFound(format!("workout space {space_id}")));
        }
        let mut activated = None;
        for space in data.spaces.iter_mut() {
            space.is_active = space.id == space_id;
            if space.is_active {
                activated = Some(space.clone());
            }
        }
        activated.ok_or_else(|| StoreError::NotFound(format!("workout space {space_id}")))
    }

    async fn create_custom_exercise(
        &self,
        name: &str,
        equipment: Vec<String>,
        primary_muscles: Vec<String>,
    ) -> Result<Exercise, StoreError> {
        let name = require_name(name, "exercise")?;
        let mut data = self.data.write().await;
        if data.exercises.iter().any(|e| e.name.eq_ignore_ascii_case(&name)) {
            return Err(StoreError::WriteRejected(format!("exercise '{name}' already exists")));
        }
        let id = data.exercises.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        let exercise = Exercise {
            id,
            name,
            aliases: Vec::new(),
            equipment,
            primary_muscles,
            is_custom: true,
        };
        data.exercises.push(exercise.clone());
        debug!(id, name = %exercise.name, "Custom exercise created");
        Ok(exercise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn demo() -> InMemoryStore {
        InMemoryStore::from_data(FitnessData::demo())
    }

    #[tokio::test]
    async fn sessions_are_newest_first_and_limited() {
        let store = demo();
        let sessions = store.recent_sessions(2).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert!(sessions[0].started_at > sessions[1].started_at);
        assert_eq!(store.session_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn history_filters_by_exercise() {
        let store = demo();
        let goblet = store.exercise_history(Some(4), 10).await.unwrap();
        assert_eq!(goblet.len(), 1);
        assert_eq!(goblet[0].session_count, 2);
        assert_eq!(store.exercise_history(None, 10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn equipment_for_unknown_space_is_not_found() {
        let store = demo();
        assert_eq!(store.equipment("home").await.unwrap().len(), 3);
        assert!(matches!(store.equipment("moon").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn template_with_unknown_exercise_is_rejected() {
        let store = demo();
        let bad = vec![TemplateExercise { exercise_id: 999, name: None, sets: 3, reps: 8, warmup_sets: None }];
        assert!(matches!(
            store.create_template("Push", bad).await,
            Err(StoreError::WriteRejected(_))
        ));

        let good = vec![TemplateExercise { exercise_id: 7, name: None, sets: 3, reps: 12, warmup_sets: None }];
        let created = store.create_template("Push", good).await.unwrap();
        assert_eq!(store.template_count().await.unwrap(), 2);
        assert_eq!(store.templates(1).await.unwrap()[0].id, created.id);
    }

    #[tokio::test]
    async fn activating_a_space_deactivates_the_others() {
        let store = demo();
        let club = store.activate_workout_space("club").await.unwrap();
        assert!(club.is_active);
        let spaces = store.workout_spaces().await.unwrap();
        assert_eq!(spaces.iter().filter(|s| s.is_active).count(), 1);
        assert!(store.activate_workout_space("moon").await.is_err());
    }

    #[tokio::test]
    async fn custom_exercise_gets_next_id() {
        let store = demo();
        let ex = store
            .create_custom_exercise("Sled Push", vec!["sled".into()], vec![])
            .await
            .unwrap();
        assert_eq!(ex.id, 13);
        assert!(ex.is_custom);
        assert!(store.create_custom_exercise("sled push", vec![], vec![]).await.is_err());
    }

    #[tokio::test]
    async fn planned_workout_gets_an_id() {
        let store = demo();
        let planned = store
            .add_planned_workout(PlannedWorkout {
                id: String::new(),
                date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                title: "Lower B".into(),
                template_id: Some("t-1".into()),
                exercises: vec![],
            })
            .await
            .unwrap();
        assert!(!planned.id.is_empty());
        assert_eq!(store.planned_workouts().await.len(), 1);
    }

    #[tokio::test]
    async fn goal_update_keeps_other_settings() {
        let store = demo();
        let settings = store.update_goal("Run a 5k").await.unwrap();
        assert_eq!(settings.goal.as_deref(), Some("Run a 5k"));
        assert_eq!(settings.units, "kg");
        assert!(store.update_goal("   ").await.is_err());
    }
}
