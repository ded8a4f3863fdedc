//! Workout template tools.

use async_trait::async_trait;
use gymcoach_core::error::ToolError;
use gymcoach_core::fitness::TemplateExercise;
use gymcoach_core::store::FitnessStore;
use gymcoach_core::tool::{Tool, ToolKind, ToolResult};
use serde::Deserialize;
use std::sync::Arc;

use crate::{exercise_slot_schema, limit_schema, parse_args, store_failure};

pub struct GetTemplatesTool {
    store: Arc<dyn FitnessStore>,
}

impl GetTemplatesTool {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct LimitArgs {
    limit: Option<usize>,
}

#[async_trait]
impl Tool for GetTemplatesTool {
    fn kind(&self) -> ToolKind {
        ToolKind::GetTemplates
    }

    fn description(&self) -> &str {
        "List the user's saved workout templates, most recently updated first."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "limit": limit_schema(20, "How many templates to return (default 10)")
            },
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let kind = self.kind();
        let args: LimitArgs = parse_args(kind, arguments)?;
        let templates = self
            .store
            .templates(args.limit.unwrap_or(10))
            .await
            .map_err(|e| store_failure(kind, e))?;
        let total = self.store.template_count().await.map_err(|e| store_failure(kind, e))?;
        Ok(ToolResult::json(serde_json::json!({
            "templates": templates,
            "total": total,
        })))
    }
}

pub struct CreateTemplateTool {
    store: Arc<dyn FitnessStore>,
}

impl CreateTemplateTool {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct CreateTemplateArgs {
    name: String,
    exercises: Vec<TemplateExercise>,
}

#[async_trait]
impl Tool for CreateTemplateTool {
    fn kind(&self) -> ToolKind {
        ToolKind::CreateTemplate
    }

    fn description(&self) -> &str {
        "Propose a new workout template. The user must confirm before it is saved. \
         Only use exerciseId values from the candidate list."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "minLength": 1, "maxLength": 80 },
                "exercises": {
                    "type": "array",
                    "minItems": 1,
                    "maxItems": 20,
                    "items": exercise_slot_schema()
                }
            },
            "required": ["name", "exercises"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let kind = self.kind();
        let args: CreateTemplateArgs = parse_args(kind, arguments)?;
        let template = self
            .store
            .create_template(&args.name, args.exercises)
            .await
            .map_err(|e| store_failure(kind, e))?;
        Ok(ToolResult::json(serde_json::json!({ "template": template })))
    }

    fn summarize(&self, arguments: &serde_json::Value) -> String {
        let name = arguments["name"].as_str().unwrap_or("untitled");
        let count = arguments["exercises"].as_array().map_or(0, Vec::len);
        let noun = if count == 1 { "exercise" } else { "exercises" };
        format!("Create template \"{name}\" with {count} {noun}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::demo_store;

    #[tokio::test]
    async fn lists_templates() {
        let tool = GetTemplatesTool::new(demo_store());
        let data = tool.execute(serde_json::json!({})).await.unwrap().data.unwrap();
        assert_eq!(data["total"], 1);
        assert_eq!(data["templates"][0]["name"], "Lower A");
    }

    #[tokio::test]
    async fn create_saves_through_the_store() {
        let store = demo_store();
        let tool = CreateTemplateTool::new(store.clone());
        let args = serde_json::json!({
            "name": "Push Day",
            "exercises": [{"exerciseId": 5, "sets": 4, "reps": 8, "warmupSets": 1}]
        });
        let result = tool.execute(args).await.unwrap();
        assert!(result.success);
        assert_eq!(store.template_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unknown_exercise_is_an_execution_failure() {
        let tool = CreateTemplateTool::new(demo_store());
        let args = serde_json::json!({
            "name": "Bad",
            "exercises": [{"exerciseId": 404, "sets": 3, "reps": 5}]
        });
        let err = tool.execute(args).await.unwrap_err();
        assert_eq!(err.code(), "tool_execution_failed");
    }

    #[test]
    fn summary_names_the_template() {
        let tool = CreateTemplateTool::new(demo_store());
        let summary = tool.summarize(&serde_json::json!({
            "name": "Push Day",
            "exercises": [{"exerciseId": 5, "sets": 4, "reps": 8}]
        }));
        assert_eq!(summary, "Create template \"Push Day\" with 1 exercise");
    }
}
