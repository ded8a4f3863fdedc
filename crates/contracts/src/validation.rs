//! Mode-specific structural contracts for the model's final answer.
//!
//! Three modes exist. `general` accepts anything. `workout` accepts either
//! a grounded action draft or a text plan with enough sets/reps lines.
//! `template_json` accepts a single fenced JSON template and nothing else.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::ContractError;
use crate::envelope::{ActionDraft, DraftKind, ReviewItem, parse_envelope};
use crate::parser::{fenced_blocks, parse_json_lenient};

/// Minimum number of sets/reps lines a text-only workout must carry.
pub const MIN_WORKOUT_LINES: usize = 3;

const WORKOUT_INTENT: &str = r"(?i)\b(workouts?|routines?|programs?|programmes?|templates?|split|sets?|reps?|exercises?|leg day|push day|pull day|upper body|lower body|full body|hypertrophy|training plan|strength plan)\b";

const SETS_REPS: &str = r"(?i)\b\d+\s*(?:sets?\s*(?:of|x|×)\s*\d+|[x×]\s*\d+)";

const EQUIPMENT_CLAIM: &str = r"(?i)\b(i can see|i see (?:that )?you have|looking at your (?:gym|equipment)|based on your (?:gym|equipment)|your gym (?:has|includes)|you have access to|according to your (?:gym|equipment))\b";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    #[default]
    General,
    Workout,
    TemplateJson,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::General => "general",
            ResponseMode::Workout => "workout",
            ResponseMode::TemplateJson => "template_json",
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseMode {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "general" => Ok(ResponseMode::General),
            "workout" => Ok(ResponseMode::Workout),
            "template_json" | "template" => Ok(ResponseMode::TemplateJson),
            other => Err(ContractError::UnknownMode(other.to_string())),
        }
    }
}

/// One exercise row of a `template_json` answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateJsonExercise {
    pub exercise_id: i64,
    pub sets: u32,
    pub reps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warmup_sets: Option<u32>,
}

/// The `template_json` answer shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateJson {
    pub name: String,
    pub exercises: Vec<TemplateJsonExercise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_review: Option<Vec<ReviewItem>>,
}

impl TemplateJson {
    fn referenced_ids(&self) -> BTreeSet<i64> {
        let suggested = self
            .needs_review
            .iter()
            .flatten()
            .flat_map(|r| r.suggestions.iter().map(|s| s.exercise_id));
        self.exercises.iter().map(|e| e.exercise_id).chain(suggested).collect()
    }
}

/// What a validated answer was parsed into.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParsedAnswer {
    Draft(ActionDraft),
    Template(TemplateJson),
}

/// Why an answer failed its contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    pub mode: ResponseMode,
    pub reason: String,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} contract failed: {}", self.mode, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub mode: ResponseMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ValidationFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<ParsedAnswer>,
}

impl ValidationResult {
    fn pass(mode: ResponseMode, parsed: Option<ParsedAnswer>) -> Self {
        Self { valid: true, mode, error: None, parsed }
    }

    fn fail(mode: ResponseMode, reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            mode,
            error: Some(ValidationFailure { mode, reason: reason.into() }),
            parsed: None,
        }
    }
}

/// Inputs the contracts check against.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    pub mode: ResponseMode,
    /// Whether the user shared their fitness data this turn.
    pub context_enabled: bool,
    pub library_ids: BTreeSet<i64>,
    pub candidate_ids: BTreeSet<i64>,
}

/// Compiled contract patterns. Build once and reuse across turns.
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    workout_intent: Regex,
    sets_reps: Regex,
    equipment_claim: Regex,
}

impl ResponseValidator {
    pub fn new() -> Result<Self, ContractError> {
        Ok(Self {
            workout_intent: compile("workout_intent", WORKOUT_INTENT)?,
            sets_reps: compile("sets_reps", SETS_REPS)?,
            equipment_claim: compile("equipment_claim", EQUIPMENT_CLAIM)?,
        })
    }

    /// Explicit mode wins; otherwise workout keywords select `Workout`.
    pub fn classify_mode(&self, explicit: Option<ResponseMode>, user_message: &str) -> ResponseMode {
        match explicit {
            Some(mode) => mode,
            None if self.workout_intent.is_match(user_message) => ResponseMode::Workout,
            None => ResponseMode::General,
        }
    }

    /// Number of lines carrying a sets/reps prescription.
    pub fn sets_reps_lines(&self, text: &str) -> usize {
        text.lines().filter(|line| self.sets_reps.is_match(line)).count()
    }

    pub fn claims_equipment_visibility(&self, text: &str) -> bool {
        self.equipment_claim.is_match(text)
    }

    pub fn validate(&self, text: &str, ctx: &ValidationContext) -> ValidationResult {
        let result = match ctx.mode {
            ResponseMode::General => ValidationResult::pass(ResponseMode::General, None),
            ResponseMode::Workout => self.validate_workout(text, ctx),
            ResponseMode::TemplateJson => validate_template_json(text, ctx),
        };
        debug!(mode = %ctx.mode, valid = result.valid, "Validated response");
        result
    }

    fn validate_workout(&self, text: &str, ctx: &ValidationContext) -> ValidationResult {
        let mode = ResponseMode::Workout;

        if !ctx.context_enabled && self.claims_equipment_visibility(text) {
            return ValidationResult::fail(
                mode,
                "response claims to see the user's gym or equipment, but context sharing is disabled",
            );
        }

        let parsed = parse_envelope(text);
        if let Some(draft) = parsed.action_draft {
            if matches!(draft.kind, DraftKind::CreateWorkout | DraftKind::CreateTemplate) {
                let Some(plan) = draft.exercise_plan() else {
                    return ValidationResult::fail(mode, "draft payload is not an exercise plan");
                };
                let unreferenced = plan.unreferenced_count();
                if unreferenced > 0 {
                    debug!(unreferenced, "Draft has exercise entries without an id or name");
                    return ValidationResult::fail(
                        mode,
                        format!("{unreferenced} exercise entries have neither an exerciseId nor a name"),
                    );
                }
                let outside: Vec<i64> = plan
                    .referenced_ids()
                    .into_iter()
                    .filter(|id| !ctx.candidate_ids.contains(id))
                    .collect();
                if !outside.is_empty() {
                    return ValidationResult::fail(mode, outside_candidates(&outside));
                }
                return ValidationResult::pass(mode, Some(ParsedAnswer::Draft(draft)));
            }
        }

        let lines = self.sets_reps_lines(&parsed.assistant_text);
        if lines >= MIN_WORKOUT_LINES {
            ValidationResult::pass(mode, None)
        } else {
            ValidationResult::fail(
                mode,
                format!(
                    "expected a create_workout/create_template draft or at least {MIN_WORKOUT_LINES} exercise lines with sets and reps, found {lines}"
                ),
            )
        }
    }
}

fn validate_template_json(text: &str, ctx: &ValidationContext) -> ValidationResult {
    let mode = ResponseMode::TemplateJson;
    let blocks = fenced_blocks(text);

    let block = match blocks.as_slice() {
        [only] => only,
        [] => return ValidationResult::fail(mode, "expected exactly one fenced JSON block, found none"),
        many => {
            return ValidationResult::fail(
                mode,
                format!("expected exactly one fenced JSON block, found {}", many.len()),
            );
        }
    };

    if let Some(lang) = block.lang.as_deref().filter(|lang| *lang != "json") {
        return ValidationResult::fail(mode, format!("expected a JSON block, found a `{lang}` block"));
    }

    let outside_text = format!("{}{}", &text[..block.start], &text[block.end..]);
    if !outside_text.trim().is_empty() {
        return ValidationResult::fail(mode, "text outside the fenced JSON block is not allowed");
    }

    let template: TemplateJson = match parse_json_lenient(&block.body)
        .and_then(|value| serde_json::from_value(value).map_err(|e| e.to_string()))
    {
        Ok(template) => template,
        Err(e) => return ValidationResult::fail(mode, format!("template JSON does not match the schema: {e}")),
    };

    if template.exercises.is_empty() {
        return ValidationResult::fail(mode, "template lists no exercises");
    }

    let outside: Vec<i64> = template
        .referenced_ids()
        .into_iter()
        .filter(|id| !(ctx.library_ids.contains(id) && ctx.candidate_ids.contains(id)))
        .collect();
    if !outside.is_empty() {
        return ValidationResult::fail(mode, outside_candidates(&outside));
    }

    ValidationResult::pass(mode, Some(ParsedAnswer::Template(template)))
}

fn outside_candidates(ids: &[i64]) -> String {
    let list: Vec<String> = ids.iter().map(i64::to_string).collect();
    format!("exercise ids [{}] are outside the candidate list", list.join(", "))
}

fn compile(name: &str, pattern: &str) -> Result<Regex, ContractError> {
    Regex::new(pattern).map_err(|e| ContractError::Pattern {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> ResponseValidator {
        ResponseValidator::new().unwrap()
    }

    fn ctx(mode: ResponseMode, context_enabled: bool) -> ValidationContext {
        ValidationContext {
            mode,
            context_enabled,
            library_ids: (1..=12).collect(),
            candidate_ids: BTreeSet::from([4, 5, 7, 8]),
        }
    }

    fn draft_text(ids: &[i64]) -> String {
        draft_with(
            ids.iter()
                .map(|id| serde_json::json!({"exerciseId": id, "sets": 3, "reps": 10}))
                .collect(),
        )
    }

    fn draft_with(exercises: Vec<serde_json::Value>) -> String {
        let envelope = serde_json::json!({
            "contractVersion": 1,
            "assistantText": "Plan ready.",
            "actionDraft": {
                "kind": "create_workout",
                "confidence": 0.8,
                "risk": "low",
                "title": "Legs",
                "summary": "",
                "payload": {"name": "Legs", "exercises": exercises}
            }
        });
        format!("```json\n{envelope}\n```")
    }

    #[test]
    fn classify_prefers_explicit_mode() {
        let v = validator();
        assert_eq!(v.classify_mode(Some(ResponseMode::General), "build me a leg workout"), ResponseMode::General);
        assert_eq!(v.classify_mode(None, "Build me a leg workout"), ResponseMode::Workout);
        assert_eq!(v.classify_mode(None, "How much protein per day?"), ResponseMode::General);
    }

    #[test]
    fn mode_parses_from_cli_strings() {
        assert_eq!("template-json".parse::<ResponseMode>().unwrap(), ResponseMode::TemplateJson);
        assert_eq!("Workout".parse::<ResponseMode>().unwrap(), ResponseMode::Workout);
        assert!("poetry".parse::<ResponseMode>().is_err());
    }

    #[test]
    fn general_is_always_valid() {
        let result = validator().validate("anything at all", &ctx(ResponseMode::General, true));
        assert!(result.valid);
        assert!(result.error.is_none());
    }

    #[test]
    fn workout_text_needs_three_lines() {
        let v = validator();
        let good = "Goblet squat: 4 sets of 10 reps\nRDL 3x8\nPush-ups 3 × 15\nStretch after.";
        assert!(v.validate(good, &ctx(ResponseMode::Workout, true)).valid);

        let thin = "Goblet squat: 4 sets of 10\nThen rest.";
        let result = v.validate(thin, &ctx(ResponseMode::Workout, true));
        assert!(!result.valid);
        assert!(result.error.unwrap().reason.contains("found 1"));
    }

    #[test]
    fn workout_draft_must_stay_in_candidates() {
        let v = validator();
        let ok = v.validate(&draft_text(&[4, 8]), &ctx(ResponseMode::Workout, true));
        assert!(ok.valid);
        assert!(matches!(ok.parsed, Some(ParsedAnswer::Draft(_))));

        let bad = v.validate(&draft_text(&[4, 1]), &ctx(ResponseMode::Workout, true));
        assert!(!bad.valid);
        assert_eq!(bad.error.unwrap().reason, "exercise ids [1] are outside the candidate list");
    }

    #[test]
    fn workout_draft_entries_need_an_id_or_name() {
        let v = validator();
        let mut context = ctx(ResponseMode::Workout, true);
        context.candidate_ids = BTreeSet::from([1, 2, 3]);

        let bare = draft_with(vec![serde_json::json!({"sets": 3, "reps": 10})]);
        let result = v.validate(&bare, &context);
        assert!(!result.valid);
        assert!(result.parsed.is_none());
        assert!(result.error.unwrap().reason.contains("neither an exerciseId nor a name"));

        let blank = draft_with(vec![
            serde_json::json!({"exerciseId": 2, "sets": 3, "reps": 10}),
            serde_json::json!({"name": "  ", "sets": 3, "reps": 10}),
        ]);
        assert!(!v.validate(&blank, &context).valid);

        let named = draft_with(vec![serde_json::json!({"name": "Goblet Squat", "sets": 3, "reps": 10})]);
        assert!(v.validate(&named, &context).valid);
    }

    #[test]
    fn equipment_claim_fails_without_context() {
        let v = validator();
        let text = "Looking at your gym, you have dumbbells.\nSquat 3x10\nRow 3x10\nPress 3x10";
        assert!(!v.validate(text, &ctx(ResponseMode::Workout, false)).valid);
        assert!(v.validate(text, &ctx(ResponseMode::Workout, true)).valid);
    }

    #[test]
    fn template_json_accepts_single_block() {
        let text = "```json\n{\"name\": \"Lower\", \"exercises\": [{\"exerciseId\": 4, \"sets\": 3, \"reps\": 10}]}\n```\n";
        let result = validator().validate(text, &ctx(ResponseMode::TemplateJson, true));
        assert!(result.valid, "{:?}", result.error);
        match result.parsed {
            Some(ParsedAnswer::Template(t)) => assert_eq!(t.name, "Lower"),
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn template_json_requires_json_fence() {
        let body = "{\"name\": \"Lower\", \"exercises\": [{\"exerciseId\": 4, \"sets\": 3, \"reps\": 10}]}";
        let context = ctx(ResponseMode::TemplateJson, true);

        let python = validator().validate(&format!("```python\n{body}\n```"), &context);
        assert!(!python.valid);
        assert!(python.error.unwrap().reason.contains("`python`"));

        assert!(validator().validate(&format!("```\n{body}\n```"), &context).valid);
        assert!(validator().validate(&format!("```JSON\n{body}\n```"), &context).valid);
    }

    #[test]
    fn template_json_rejects_surrounding_text() {
        let text = "Here you go:\n```json\n{\"name\": \"Lower\", \"exercises\": [{\"exerciseId\": 4, \"sets\": 3, \"reps\": 10}]}\n```";
        let result = validator().validate(text, &ctx(ResponseMode::TemplateJson, true));
        assert!(!result.valid);
    }

    #[test]
    fn template_json_ids_must_be_library_and_candidate() {
        let text = "```json\n{\"name\": \"Lower\", \"exercises\": [{\"exerciseId\": 1, \"sets\": 3, \"reps\": 5}]}\n```";
        let result = validator().validate(text, &ctx(ResponseMode::TemplateJson, true));
        assert!(result.error.unwrap().reason.contains("outside the candidate list"));

        let unknown = "```json\n{\"name\": \"Lower\", \"exercises\": [{\"exerciseId\": 99, \"sets\": 3, \"reps\": 5}]}\n```";
        let mut context = ctx(ResponseMode::TemplateJson, true);
        context.candidate_ids.insert(99);
        assert!(!validator().validate(unknown, &context).valid);
    }

    #[test]
    fn template_json_rejects_two_blocks() {
        let one = "```json\n{\"name\": \"A\", \"exercises\": [{\"exerciseId\": 4, \"sets\": 3, \"reps\": 5}]}\n```";
        let text = format!("{one}\n{one}");
        let result = validator().validate(&text, &ctx(ResponseMode::TemplateJson, true));
        assert!(result.error.unwrap().reason.contains("found 2"));
    }
}
