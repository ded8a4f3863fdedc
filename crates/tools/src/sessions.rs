//! Training history tools: recent sessions and per-exercise history.

use async_trait::async_trait;
use gymcoach_core::error::ToolError;
use gymcoach_core::store::FitnessStore;
use gymcoach_core::tool::{Tool, ToolKind, ToolResult};
use serde::Deserialize;
use std::sync::Arc;

use crate::{limit_schema, parse_args, store_failure};

pub struct GetRecentSessionsTool {
    store: Arc<dyn FitnessStore>,
}

impl GetRecentSessionsTool {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct LimitArgs {
    limit: Option<usize>,
}

#[async_trait]
impl Tool for GetRecentSessionsTool {
    fn kind(&self) -> ToolKind {
        ToolKind::GetRecentSessions
    }

    fn description(&self) -> &str {
        "List the user's most recent workout sessions, newest first, with per-exercise sets and top sets."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "limit": limit_schema(20, "How many sessions to return (default 5)")
            },
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let kind = self.kind();
        let args: LimitArgs = parse_args(kind, arguments)?;
        let sessions = self
            .store
            .recent_sessions(args.limit.unwrap_or(5))
            .await
            .map_err(|e| store_failure(kind, e))?;
        let total = self.store.session_count().await.map_err(|e| store_failure(kind, e))?;
        Ok(ToolResult::json(serde_json::json!({
            "sessions": sessions,
            "total": total,
        })))
    }
}

pub struct GetExerciseHistoryTool {
    store: Arc<dyn FitnessStore>,
}

impl GetExerciseHistoryTool {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryArgs {
    exercise_id: Option<i64>,
    limit: Option<usize>,
}

#[async_trait]
impl Tool for GetExerciseHistoryTool {
    fn kind(&self) -> ToolKind {
        ToolKind::GetExerciseHistory
    }

    fn description(&self) -> &str {
        "Get per-exercise training history (last performed, session count, best weight and reps). \
         Pass exerciseId to narrow to one exercise."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "exerciseId": { "type": "integer", "minimum": 1 },
                "limit": limit_schema(50, "How many entries to return (default 10)")
            },
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let kind = self.kind();
        let args: HistoryArgs = parse_args(kind, arguments)?;
        let history = self
            .store
            .exercise_history(args.exercise_id, args.limit.unwrap_or(10))
            .await
            .map_err(|e| store_failure(kind, e))?;
        Ok(ToolResult::json(serde_json::json!({ "history": history })))
    }
}
