//! Profile tools: settings, coach notes, and the training goal.

use async_trait::async_trait;
use gymcoach_core::error::ToolError;
use gymcoach_core::store::FitnessStore;
use gymcoach_core::tool::{Tool, ToolKind, ToolResult};
use serde::Deserialize;
use std::sync::Arc;

use crate::{limit_schema, parse_args, store_failure};

pub struct GetSettingsTool {
    store: Arc<dyn FitnessStore>,
}

impl GetSettingsTool {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetSettingsTool {
    fn kind(&self) -> ToolKind {
        ToolKind::GetSettings
    }

    fn description(&self) -> &str {
        "Read the user's training settings: units, goal, experience level, sessions per week."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {}, "additionalProperties": false })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let settings = self.store.settings().await.map_err(|e| store_failure(self.kind(), e))?;
        Ok(ToolResult::json(serde_json::json!({ "settings": settings })))
    }
}

pub struct GetNotesTool {
    store: Arc<dyn FitnessStore>,
}

impl GetNotesTool {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct LimitArgs {
    limit: Option<usize>,
}

#[async_trait]
impl Tool for GetNotesTool {
    fn kind(&self) -> ToolKind {
        ToolKind::GetNotes
    }

    fn description(&self) -> &str {
        "Read notes the user left for their coach (injuries, preferences), newest first."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "limit": limit_schema(20, "How many notes to return (default 5)")
            },
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let kind = self.kind();
        let args: LimitArgs = parse_args(kind, arguments)?;
        let notes = self
            .store
            .notes(args.limit.unwrap_or(5))
            .await
            .map_err(|e| store_failure(kind, e))?;
        Ok(ToolResult::json(serde_json::json!({ "notes": notes })))
    }
}

pub struct UpdateGoalTool {
    store: Arc<dyn FitnessStore>,
}

impl UpdateGoalTool {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct GoalArgs {
    goal: String,
}

#[async_trait]
impl Tool for UpdateGoalTool {
    fn kind(&self) -> ToolKind {
        ToolKind::UpdateGoal
    }

    fn description(&self) -> &str {
        "Propose a new training goal for the user. The user must confirm."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "goal": { "type": "string", "minLength": 1, "maxLength": 200 }
            },
            "required": ["goal"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let kind = self.kind();
        let args: GoalArgs = parse_args(kind, arguments)?;
        let settings = self
            .store
            .update_goal(&args.goal)
            .await
            .map_err(|e| store_failure(kind, e))?;
        Ok(ToolResult::json(serde_json::json!({ "settings": settings })))
    }

    fn summarize(&self, arguments: &serde_json::Value) -> String {
        format!("Set training goal to \"{}\"", arguments["goal"].as_str().unwrap_or(""))
    }
}
