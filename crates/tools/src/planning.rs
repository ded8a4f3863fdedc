//! Scheduling a workout on a future date.

use async_trait::async_trait;
use chrono::NaiveDate;
use gymcoach_core::error::ToolError;
use gymcoach_core::fitness::{PlannedWorkout, TemplateExercise};
use gymcoach_core::store::FitnessStore;
use gymcoach_core::tool::{Tool, ToolKind, ToolResult};
use serde::Deserialize;
use std::sync::Arc;

use crate::{exercise_slot_schema, parse_args, store_failure};

pub struct AddPlannedWorkoutTool {
    store: Arc<dyn FitnessStore>,
}

impl AddPlannedWorkoutTool {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanArgs {
    date: String,
    title: String,
    template_id: Option<String>,
    #[serde(default)]
    exercises: Vec<TemplateExercise>,
}

#[async_trait]
impl Tool for AddPlannedWorkoutTool {
    fn kind(&self) -> ToolKind {
        ToolKind::AddPlannedWorkout
    }

    fn description(&self) -> &str {
        "Propose scheduling a workout on a date (YYYY-MM-DD), either from a saved template or \
         an explicit exercise list. The user must confirm."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "date": { "type": "string", "minLength": 10, "maxLength": 10, "description": "YYYY-MM-DD" },
                "title": { "type": "string", "minLength": 1, "maxLength": 80 },
                "templateId": { "type": "string", "minLength": 1 },
                "exercises": { "type": "array", "maxItems": 20, "items": exercise_slot_schema() }
            },
            "required": ["date", "title"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let kind = self.kind();
        let args: PlanArgs = parse_args(kind, arguments)?;
        let date = NaiveDate::parse_from_str(&args.date, "%Y-%m-%d").map_err(|e| ToolError::InputInvalid {
            tool_name: kind.to_string(),
            errors: vec![format!("$.date: {e}")],
        })?;
        let workout = PlannedWorkout {
            id: String::new(),
            date,
            title: args.title,
            template_id: args.template_id,
            exercises: args.exercises,
        };
        let planned = self
            .store
            .add_planned_workout(workout)
            .await
            .map_err(|e| store_failure(kind, e))?;
        Ok(ToolResult::json(serde_json::json!({ "plannedWorkout": planned })))
    }

    fn summarize(&self, arguments: &serde_json::Value) -> String {
        format!(
            "Schedule \"{}\" on {}",
            arguments["title"].as_str().unwrap_or("workout"),
            arguments["date"].as_str().unwrap_or("?")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::demo_store;

    #[tokio::test]
    async fn schedules_from_template() {
        let store = demo_store();
        let tool = AddPlannedWorkoutTool::new(store.clone());
        let data = tool
            .execute(serde_json::json!({"date": "2026-03-02", "title": "Lower A", "templateId": "t-1"}))
            .await
            .unwrap()
            .data
            .unwrap();
        assert_eq!(data["plannedWorkout"]["date"], "2026-03-02");
        assert_eq!(store.planned_workouts().await.len(), 1);
    }

    #[tokio::test]
    async fn bad_date_is_input_invalid() {
        let tool = AddPlannedWorkoutTool::new(demo_store());
        let err = tool
            .execute(serde_json::json!({"date": "2026-13-40", "title": "Nope"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "tool_input_invalid");
    }

    #[test]
    fn summary_mentions_date() {
        let tool = AddPlannedWorkoutTool::new(demo_store());
        assert_eq!(
            tool.summarize(&serde_json::json!({"date": "2026-03-02", "title": "Lower B"})),
            "Schedule \"Lower B\" on 2026-03-02"
        );
    }
}
