//! The fitness tool catalog.
//!
//! Read tools query the store directly and are gated by the conversation's
//! enabled scopes. Write tools mutate the store, but the coach never runs
//! them on its own: a write call becomes a proposal, and only an explicit
//! confirmation executes it.

pub mod library;
pub mod planning;
pub mod profile;
pub mod sessions;
pub mod spaces;
pub mod templates;

use gymcoach_core::error::{StoreError, ToolError};
use gymcoach_core::store::FitnessStore;
use gymcoach_core::tool::{ToolKind, ToolRegistry};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Create the registry holding every tool in the catalog, all backed by `store`.
pub fn default_registry(store: Arc<dyn FitnessStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(sessions::GetRecentSessionsTool::new(store.clone())));
    registry.register(Box::new(sessions::GetExerciseHistoryTool::new(store.clone())));
    registry.register(Box::new(templates::GetTemplatesTool::new(store.clone())));
    registry.register(Box::new(templates::CreateTemplateTool::new(store.clone())));
    registry.register(Box::new(library::SearchExerciseLibraryTool::new(store.clone())));
    registry.register(Box::new(spaces::GetWorkoutSpacesTool::new(store.clone())));
    registry.register(Box::new(spaces::GetEquipmentTool::new(store.clone())));
    registry.register(Box::new(spaces::CreateWorkoutSpaceTool::new(store.clone())));
    registry.register(Box::new(spaces::UpdateWorkoutSpaceTool::new(store.clone())));
    registry.register(Box::new(spaces::ActivateWorkoutSpaceTool::new(store.clone())));
    registry.register(Box::new(profile::GetSettingsTool::new(store.clone())));
    registry.register(Box::new(profile::GetNotesTool::new(store.clone())));
    registry.register(Box::new(profile::UpdateGoalTool::new(store.clone())));
    registry.register(Box::new(planning::AddPlannedWorkoutTool::new(store)));
    registry
}

/// Deserialize already schema-checked arguments into a typed input.
pub(crate) fn parse_args<T: DeserializeOwned>(kind: ToolKind, arguments: serde_json::Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InputInvalid {
        tool_name: kind.to_string(),
        errors: vec![format!("$: {e}")],
    })
}

pub(crate) fn store_failure(kind: ToolKind, err: StoreError) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: kind.to_string(),
        reason: err.to_string(),
    }
}

/// Schema fragment for an optional `limit` argument.
pub(crate) fn limit_schema(max: u64, description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "integer",
        "minimum": 1,
        "maximum": max,
        "description": description
    })
}

/// Schema for one exercise slot, shared by templates and planned workouts.
pub(crate) fn exercise_slot_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "exerciseId": { "type": "integer", "minimum": 1, "description": "Library exercise id" },
            "name": { "type": "string" },
            "sets": { "type": "integer", "minimum": 1, "maximum": 10 },
            "reps": { "type": "integer", "minimum": 1, "maximum": 50 },
            "warmupSets": { "type": "integer", "minimum": 0, "maximum": 5 }
        },
        "required": ["exerciseId", "sets", "reps"],
        "additionalProperties": false
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use gymcoach_core::schema;

    #[test]
    fn registry_covers_the_whole_catalog() {
        let registry = default_registry(test_support::demo_store());
        assert_eq!(registry.kinds(), ToolKind::ALL.to_vec());
        assert_eq!(registry.definitions().len(), ToolKind::ALL.len());
    }

    #[test]
    fn every_schema_accepts_its_own_minimal_input() {
        let registry = default_registry(test_support::demo_store());
        let minimal = |kind: ToolKind| match kind {
            ToolKind::SearchExerciseLibrary => serde_json::json!({"query": "squat"}),
            ToolKind::CreateTemplate => serde_json::json!({
                "name": "Push", "exercises": [{"exerciseId": 7, "sets": 3, "reps": 12}]
            }),
            ToolKind::AddPlannedWorkout => serde_json::json!({"date": "2026-03-02", "title": "Lower B"}),
            ToolKind::UpdateGoal => serde_json::json!({"goal": "Get stronger"}),
            ToolKind::CreateWorkoutSpace => serde_json::json!({"name": "Garage", "equipment": []}),
            ToolKind::UpdateWorkoutSpace | ToolKind::ActivateWorkoutSpace => {
                serde_json::json!({"spaceId": "home"})
            }
            _ => serde_json::json!({}),
        };
        for kind in ToolKind::ALL {
            let tool = registry.get(kind).unwrap();
            assert!(
                schema::validate(&tool.parameters_schema(), &minimal(kind)).is_ok(),
                "{kind} rejected its minimal input"
            );
        }
    }

    #[test]
    fn every_schema_is_closed() {
        let registry = default_registry(test_support::demo_store());
        for def in registry.definitions() {
            assert_eq!(def.parameters["additionalProperties"], false, "{}", def.name);
        }
    }
}
