//! Exercise library search.
//!
//! The library is reference data rather than user data, so this tool is
//! not gated by any scope.

use async_trait::async_trait;
use gymcoach_core::error::ToolError;
use gymcoach_core::fitness::{Exercise, ExerciseCandidate};
use gymcoach_core::store::FitnessStore;
use gymcoach_core::tool::{Tool, ToolKind, ToolResult};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::{limit_schema, parse_args, store_failure};

pub struct SearchExerciseLibraryTool {
    store: Arc<dyn FitnessStore>,
}

impl SearchExerciseLibraryTool {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    equipment: Option<String>,
    muscle: Option<String>,
    limit: Option<usize>,
}

/// Rank an exercise against a lowercase query: exact name or alias beats
/// prefix, prefix beats substring, substring beats all-tokens-present.
fn rank(exercise: &Exercise, query: &str) -> Option<u8> {
    let names = std::iter::once(exercise.name.as_str()).chain(exercise.aliases.iter().map(String::as_str));
    let mut best: Option<u8> = None;
    for name in names {
        let name = name.to_lowercase();
        let score = if name == query {
            4
        } else if name.starts_with(query) {
            3
        } else if name.contains(query) {
            2
        } else if query.split_whitespace().all(|token| name.contains(token)) {
            1
        } else {
            continue;
        };
        best = best.max(Some(score));
    }
    best
}

fn matches_tag(tags: &[String], wanted: &Option<String>) -> bool {
    match wanted {
        Some(w) => tags.iter().any(|t| t.eq_ignore_ascii_case(w)),
        None => true,
    }
}

#[async_trait]
impl Tool for SearchExerciseLibraryTool {
    fn kind(&self) -> ToolKind {
        ToolKind::SearchExerciseLibrary
    }

    fn description(&self) -> &str {
        "Search the exercise library by name or alias, optionally filtered by equipment or primary muscle. \
         Returns exercise ids usable in templates and workouts."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "minLength": 1, "maxLength": 80 },
                "equipment": { "type": "string" },
                "muscle": { "type": "string" },
                "limit": limit_schema(25, "How many matches to return (default 10)")
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let kind = self.kind();
        let args: SearchArgs = parse_args(kind, arguments)?;
        let query = args.query.trim().to_lowercase();
        let library = self.store.exercise_library().await.map_err(|e| store_failure(kind, e))?;

        let mut ranked: Vec<(u8, &Exercise)> = library
            .iter()
            .filter(|e| matches_tag(&e.equipment, &args.equipment))
            .filter(|e| matches_tag(&e.primary_muscles, &args.muscle))
            .filter_map(|e| rank(e, &query).map(|r| (r, e)))
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.name.cmp(&b.1.name)));

        let exercises: Vec<ExerciseCandidate> = ranked
            .into_iter()
            .take(args.limit.unwrap_or(10))
            .map(|(_, e)| ExerciseCandidate::from(e))
            .collect();
        debug!(query = %query, matches = exercises.len(), "Exercise library searched");
        Ok(ToolResult::json(serde_json::json!({ "exercises": exercises })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::demo_store;

    async fn search(args: serde_json::Value) -> Vec<String> {
        let tool = SearchExerciseLibraryTool::new(demo_store());
        let data = tool.execute(args).await.unwrap().data.unwrap();
        data["exercises"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn alias_match_ranks_first() {
        let names = search(serde_json::json!({"query": "goblet squat"})).await;
        assert_eq!(names[0], "Dumbbell Goblet Squat");
    }

    #[tokio::test]
    async fn equipment_filter_narrows_results() {
        let names = search(serde_json::json!({"query": "squat", "equipment": "barbell"})).await;
        assert_eq!(names, vec!["Barbell Back Squat".to_string()]);
    }

    #[tokio::test]
    async fn token_match_finds_reordered_words() {
        let names = search(serde_json::json!({"query": "press bench"})).await;
        assert!(names.contains(&"Barbell Bench Press".to_string()));
        assert!(names.contains(&"Dumbbell Bench Press".to_string()));
    }

    #[tokio::test]
    async fn no_match_is_an_empty_list() {
        assert!(search(serde_json::json!({"query": "zercher"})).await.is_empty());
    }
}
