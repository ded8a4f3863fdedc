//! Workout space (gym) tools.

use async_trait::async_trait;
use gymcoach_core::error::ToolError;
use gymcoach_core::store::FitnessStore;
use gymcoach_core::tool::{Tool, ToolKind, ToolResult};
use serde::Deserialize;
use std::sync::Arc;

use crate::{parse_args, store_failure};

fn equipment_list_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "array",
        "maxItems": 60,
        "items": { "type": "string", "minLength": 1, "maxLength": 60 }
    })
}

fn space_id_schema() -> serde_json::Value {
    serde_json::json!({ "type": "string", "minLength": 1 })
}

pub struct GetWorkoutSpacesTool {
    store: Arc<dyn FitnessStore>,
}

impl GetWorkoutSpacesTool {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetWorkoutSpacesTool {
    fn kind(&self) -> ToolKind {
        ToolKind::GetWorkoutSpaces
    }

    fn description(&self) -> &str {
        "List the user's workout spaces (gyms) with their equipment and which one is active."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {}, "additionalProperties": false })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let spaces = self
            .store
            .workout_spaces()
            .await
            .map_err(|e| store_failure(self.kind(), e))?;
        Ok(ToolResult::json(serde_json::json!({ "spaces": spaces })))
    }
}

pub struct GetEquipmentTool {
    store: Arc<dyn FitnessStore>,
}

impl GetEquipmentTool {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EquipmentArgs {
    space_id: Option<String>,
}

#[async_trait]
impl Tool for GetEquipmentTool {
    fn kind(&self) -> ToolKind {
        ToolKind::GetEquipment
    }

    fn description(&self) -> &str {
        "List the equipment available in a workout space. Defaults to the active space."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "spaceId": space_id_schema() },
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let kind = self.kind();
        let args: EquipmentArgs = parse_args(kind, arguments)?;
        let space_id = match args.space_id {
            Some(id) => id,
            None => {
                let spaces = self.store.workout_spaces().await.map_err(|e| store_failure(kind, e))?;
                match spaces.into_iter().find(|s| s.is_active) {
                    Some(space) => space.id,
                    None => {
                        return Ok(ToolResult::json(serde_json::json!({
                            "spaceId": null,
                            "equipment": [],
                            "note": "No active workout space"
                        })));
                    }
                }
            }
        };
        let equipment = self.store.equipment(&space_id).await.map_err(|e| store_failure(kind, e))?;
        let names: Vec<&str> = equipment.iter().map(|e| e.name.as_str()).collect();
        Ok(ToolResult::json(serde_json::json!({
            "spaceId": space_id,
            "equipment": names,
        })))
    }
}

pub struct CreateWorkoutSpaceTool {
    store: Arc<dyn FitnessStore>,
}

impl CreateWorkoutSpaceTool {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct CreateSpaceArgs {
    name: String,
    equipment: Vec<String>,
}

#[async_trait]
impl Tool for CreateWorkoutSpaceTool {
    fn kind(&self) -> ToolKind {
        ToolKind::CreateWorkoutSpace
    }

    fn description(&self) -> &str {
        "Propose a new workout space (gym) with its equipment list. The user must confirm."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "minLength": 1, "maxLength": 60 },
                "equipment": equipment_list_schema()
            },
            "required": ["name", "equipment"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let kind = self.kind();
        let args: CreateSpaceArgs = parse_args(kind, arguments)?;
        let space = self
            .store
            .create_workout_space(&args.name, args.equipment)
            .await
            .map_err(|e| store_failure(kind, e))?;
        Ok(ToolResult::json(serde_json::json!({ "space": space })))
    }

    fn summarize(&self, arguments: &serde_json::Value) -> String {
        let name = arguments["name"].as_str().unwrap_or("untitled");
        let count = arguments["equipment"].as_array().map_or(0, Vec::len);
        format!("Create workout space \"{name}\" with {count} pieces of equipment")
    }
}

pub struct UpdateWorkoutSpaceTool {
    store: Arc<dyn FitnessStore>,
}

impl UpdateWorkoutSpaceTool {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSpaceArgs {
    space_id: String,
    name: Option<String>,
    equipment: Option<Vec<String>>,
}

#[async_trait]
impl Tool for UpdateWorkoutSpaceTool {
    fn kind(&self) -> ToolKind {
        ToolKind::UpdateWorkoutSpace
    }

    fn description(&self) -> &str {
        "Propose renaming a workout space or replacing its equipment list. The user must confirm."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "spaceId": space_id_schema(),
                "name": { "type": "string", "minLength": 1, "maxLength": 60 },
                "equipment": equipment_list_schema()
            },
            "required": ["spaceId"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let kind = self.kind();
        let args: UpdateSpaceArgs = parse_args(kind, arguments)?;
        let space = self
            .store
            .update_workout_space(&args.space_id, args.name, args.equipment)
            .await
            .map_err(|e| store_failure(kind, e))?;
        Ok(ToolResult::json(serde_json::json!({ "space": space })))
    }

    fn summarize(&self, arguments: &serde_json::Value) -> String {
        let id = arguments["spaceId"].as_str().unwrap_or("?");
        match arguments["name"].as_str() {
            Some(name) => format!("Update workout space {id} (rename to \"{name}\")"),
            None => format!("Update workout space {id}"),
        }
    }
}

pub struct ActivateWorkoutSpaceTool {
    store: Arc<dyn FitnessStore>,
}

impl ActivateWorkoutSpaceTool {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivateArgs {
    space_id: String,
}

#[async_trait]
impl Tool for ActivateWorkoutSpaceTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ActivateWorkoutSpace
    }

    fn description(&self) -> &str {
        "Propose switching the active workout space. The user must confirm."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "spaceId": space_id_schema() },
            "required": ["spaceId"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let kind = self.kind();
        let args: ActivateArgs = parse_args(kind, arguments)?;
        let space = self
            .store
            .activate_workout_space(&args.space_id)
            .await
            .map_err(|e| store_failure(kind, e))?;
        Ok(ToolResult::json(serde_json::json!({ "space": space })))
    }

    fn summarize(&self, arguments: &serde_json::Value) -> String {
        format!("Switch active workout space to {}", arguments["spaceId"].as_str().unwrap_or("?"))
    }
}
