//! Tool trait and the tagged tool registry.
//!
//! The catalog is closed: every tool the coach can offer is a variant of
//! [`ToolKind`], which fixes its wire name, its gating scope, and whether
//! it mutates user data. Implementations are registered per kind and looked
//! up through the registry, never by probing object properties.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::ToolError;
use crate::provider::ToolDefinition;
use crate::schema;
use crate::scope::Scope;

/// Every tool in the fixed catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    // Read tools
    GetRecentSessions,
    GetTemplates,
    GetExerciseHistory,
    SearchExerciseLibrary,
    GetWorkoutSpaces,
    GetEquipment,
    GetSettings,
    GetNotes,
    // Write tools
    CreateTemplate,
    AddPlannedWorkout,
    UpdateGoal,
    CreateWorkoutSpace,
    UpdateWorkoutSpace,
    ActivateWorkoutSpace,
}

impl ToolKind {
    pub const ALL: [ToolKind; 14] = [
        ToolKind::GetRecentSessions,
        ToolKind::GetTemplates,
        ToolKind::GetExerciseHistory,
        ToolKind::SearchExerciseLibrary,
        ToolKind::GetWorkoutSpaces,
        ToolKind::GetEquipment,
        ToolKind::GetSettings,
        ToolKind::GetNotes,
        ToolKind::CreateTemplate,
        ToolKind::AddPlannedWorkout,
        ToolKind::UpdateGoal,
        ToolKind::CreateWorkoutSpace,
        ToolKind::UpdateWorkoutSpace,
        ToolKind::ActivateWorkoutSpace,
    ];

    /// The name the model sees and calls.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::GetRecentSessions => "get_recent_sessions",
            ToolKind::GetTemplates => "get_templates",
            ToolKind::GetExerciseHistory => "get_exercise_history",
            ToolKind::SearchExerciseLibrary => "search_exercise_library",
            ToolKind::GetWorkoutSpaces => "get_workout_spaces",
            ToolKind::GetEquipment => "get_equipment",
            ToolKind::GetSettings => "get_settings",
            ToolKind::GetNotes => "get_notes",
            ToolKind::CreateTemplate => "create_template",
            ToolKind::AddPlannedWorkout => "add_planned_workout",
            ToolKind::UpdateGoal => "update_goal",
            ToolKind::CreateWorkoutSpace => "create_workout_space",
            ToolKind::UpdateWorkoutSpace => "update_workout_space",
            ToolKind::ActivateWorkoutSpace => "activate_workout_space",
        }
    }

    pub fn from_name(name: &str) -> Option<ToolKind> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// Write tools mutate user data and are never executed without confirmation.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            ToolKind::CreateTemplate
                | ToolKind::AddPlannedWorkout
                | ToolKind::UpdateGoal
                | ToolKind::CreateWorkoutSpace
                | ToolKind::UpdateWorkoutSpace
                | ToolKind::ActivateWorkoutSpace
        )
    }

    /// The scope gating a read tool. `None` means always offered
    /// (the exercise library is not user data) or a write tool.
    pub fn scope(&self) -> Option<Scope> {
        match self {
            ToolKind::GetRecentSessions => Some(Scope::Sessions),
            ToolKind::GetTemplates => Some(Scope::Templates),
            ToolKind::GetExerciseHistory => Some(Scope::ExerciseHistory),
            ToolKind::GetWorkoutSpaces | ToolKind::GetEquipment => Some(Scope::Spaces),
            ToolKind::GetSettings => Some(Scope::Settings),
            ToolKind::GetNotes => Some(Scope::Notes),
            _ => None,
        }
    }

    pub fn write_tools() -> impl Iterator<Item = ToolKind> {
        Self::ALL.into_iter().filter(|k| k.is_write())
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to execute a tool, with arguments already parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_call.id)
    pub id: String,

    pub kind: ToolKind,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    /// A successful result whose output is the compact JSON of `data`.
    pub fn json(data: serde_json::Value) -> Self {
        Self {
            call_id: String::new(),
            success: true,
            output: serde_json::to_string(&data).unwrap_or_default(),
            data: Some(data),
        }
    }
}

/// One entry of the tool catalog.
#[async_trait]
pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with already-validated arguments.
    async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<ToolResult, ToolError>;

    /// One-line human summary of what a call would do, shown on proposals.
    fn summarize(&self, arguments: &serde_json::Value) -> String {
        let _ = arguments;
        format!("Run {}", self.kind())
    }

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.kind().as_str().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The registry of available tools, keyed by kind.
pub struct ToolRegistry {
    tools: HashMap<ToolKind, Box<dyn Tool>>,
    /// Definitions are built once and reused for every turn.
    definitions: OnceLock<Vec<ToolDefinition>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            definitions: OnceLock::new(),
        }
    }

    /// Register a tool. Replaces any existing tool of the same kind.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.kind(), tool);
        self.definitions = OnceLock::new();
    }

    pub fn get(&self, kind: ToolKind) -> Option<&dyn Tool> {
        self.tools.get(&kind).map(|t| t.as_ref())
    }

    /// Resolve a model-supplied name to a registered tool.
    pub fn lookup(&self, name: &str) -> std::result::Result<&dyn Tool, ToolError> {
        ToolKind::from_name(name).and_then(|kind| self.get(kind)).ok_or_else(|| {
            debug!(tool = name, "Tool lookup failed");
            ToolError::NotFound(name.to_string())
        })
    }

    /// All tool definitions, in catalog order.
    pub fn definitions(&self) -> &[ToolDefinition] {
        self.definitions.get_or_init(|| {
            ToolKind::ALL
                .iter()
                .filter_map(|k| self.tools.get(k))
                .map(|t| t.to_definition())
                .collect()
        })
    }

    /// Definitions restricted to an allow-list, in catalog order.
    pub fn definitions_for(&self, allowed: &[ToolKind]) -> Vec<ToolDefinition> {
        self.definitions()
            .iter()
            .filter(|d| ToolKind::from_name(&d.name).is_some_and(|k| allowed.contains(&k)))
            .cloned()
            .collect()
    }

    /// Validate arguments against the tool's declared schema.
    pub fn validate_input(&self, kind: ToolKind, arguments: &serde_json::Value) -> std::result::Result<(), ToolError> {
        let tool = self.get(kind).ok_or_else(|| ToolError::NotFound(kind.to_string()))?;
        schema::validate(&tool.parameters_schema(), arguments).map_err(|errors| {
            debug!(tool = %kind, ?errors, "Tool input rejected");
            ToolError::InputInvalid {
                tool_name: kind.to_string(),
                errors,
            }
        })
    }

    /// Validate and execute a call.
    pub async fn execute(&self, call: &ToolCall) -> std::result::Result<ToolResult, ToolError> {
        self.validate_input(call.kind, &call.arguments)?;
        let tool = self.get(call.kind).ok_or_else(|| ToolError::NotFound(call.kind.to_string()))?;
        let mut result = tool.execute(call.arguments.clone()).await?;
        result.call_id = call.id.clone();
        Ok(result)
    }

    /// Registered kinds, in catalog order.
    pub fn kinds(&self) -> Vec<ToolKind> {
        ToolKind::ALL.into_iter().filter(|k| self.tools.contains_key(k)).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A settings reader that echoes a fixed payload.
    struct FakeSettings;

    #[async_trait]
    impl Tool for FakeSettings {
        fn kind(&self) -> ToolKind {
            ToolKind::GetSettings
        }
        fn description(&self) -> &str {
            "Read settings"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": { "verbose": { "type": "boolean" } },
                "additionalProperties": false
            })
        }
        async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::json(serde_json::json!({"units": "kg"})))
        }
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("delete_everything"), None);
    }

    #[test]
    fn write_tools_have_no_scope() {
        assert_eq!(ToolKind::write_tools().count(), 6);
        assert!(ToolKind::write_tools().all(|k| k.scope().is_none()));
        assert!(!ToolKind::SearchExerciseLibrary.is_write());
    }

    #[test]
    fn lookup_unknown_and_unregistered() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(FakeSettings));
        assert!(registry.lookup("get_settings").is_ok());
        assert!(matches!(registry.lookup("get_notes"), Err(ToolError::NotFound(_))));
        assert!(matches!(registry.lookup("nope"), Err(ToolError::NotFound(_))));
    }

    #[test]
    fn definitions_respect_allow_list() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(FakeSettings));
        assert_eq!(registry.definitions().len(), 1);
        assert!(registry.definitions_for(&[ToolKind::GetNotes]).is_empty());
        assert_eq!(registry.definitions_for(&[ToolKind::GetSettings])[0].name, "get_settings");
    }

    #[tokio::test]
    async fn execute_validates_before_running() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(FakeSettings));

        let bad = ToolCall {
            id: "call_1".into(),
            kind: ToolKind::GetSettings,
            arguments: serde_json::json!({"verbose": "yes"}),
        };
        let err = registry.execute(&bad).await.unwrap_err();
        assert!(matches!(err, ToolError::InputInvalid { .. }));

        let good = ToolCall {
            id: "call_2".into(),
            kind: ToolKind::GetSettings,
            arguments: serde_json::json!({}),
        };
        let result = registry.execute(&good).await.unwrap();
        assert_eq!(result.call_id, "call_2");
        assert!(result.output.contains("kg"));
    }
}
