//! The versioned assistant envelope and its action draft.
//!
//! ```json
//! {
//!   "contractVersion": 1,
//!   "assistantText": "Here is a lower-body session for your home gym.",
//!   "actionDraft": {
//!     "kind": "create_workout",
//!     "confidence": 0.8,
//!     "risk": "low",
//!     "title": "Lower A",
//!     "summary": "Squat-focused, 45 minutes",
//!     "payload": {
//!       "name": "Lower A",
//!       "exercises": [{"exerciseId": 4, "sets": 4, "reps": 10}],
//!       "needsReview": [{"name": "Zercher Carry", "suggestions": [{"exerciseId": 3}]}]
//!     }
//!   }
//! }
//! ```
//!
//! Drafts are validated at the deserialization boundary: a draft whose
//! payload does not match its kind is rejected as a whole.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::parser::{BlockSource, extract_json, strip_fences};

/// The only envelope version this crate understands.
pub const CONTRACT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftKind {
    CreateWorkout,
    CreateTemplate,
    CreateGym,
}

impl DraftKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftKind::CreateWorkout => "create_workout",
            DraftKind::CreateTemplate => "create_template",
            DraftKind::CreateGym => "create_gym",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Risk {
    #[default]
    Low,
    Medium,
    High,
}

/// One exercise entry in a workout or template draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftExercise {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub sets: u32,
    pub reps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warmup_sets: Option<u32>,
}

impl DraftExercise {
    /// Name given by the model, if it is not blank.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }

    /// Whether the entry names an exercise at all, by id or by name.
    pub fn has_reference(&self) -> bool {
        self.exercise_id.is_some() || self.display_name().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSuggestion {
    pub exercise_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// An exercise the model could not pin to a single id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub name: String,
    #[serde(default)]
    pub suggestions: Vec<ReviewSuggestion>,
}

/// Payload of `create_workout` and `create_template` drafts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExercisePlanPayload {
    pub name: String,
    /// Planned date (YYYY-MM-DD), workouts only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub exercises: Vec<DraftExercise>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub needs_review: Vec<ReviewItem>,
}

impl ExercisePlanPayload {
    /// Every exercise id the draft references, review suggestions included.
    pub fn referenced_ids(&self) -> BTreeSet<i64> {
        self.exercises
            .iter()
            .filter_map(|e| e.exercise_id)
            .chain(
                self.needs_review
                    .iter()
                    .flat_map(|r| r.suggestions.iter().map(|s| s.exercise_id)),
            )
            .collect()
    }

    /// Entries with neither an `exerciseId` nor a name.
    pub fn unreferenced_count(&self) -> usize {
        self.exercises.iter().filter(|e| !e.has_reference()).count()
    }
}

/// Payload of a `create_gym` draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GymPayload {
    pub name: String,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub activate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DraftPayload {
    CreateWorkout(ExercisePlanPayload),
    CreateTemplate(ExercisePlanPayload),
    CreateGym(GymPayload),
}

/// A structured proposal for a concrete mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawDraft")]
pub struct ActionDraft {
    pub kind: DraftKind,
    pub confidence: f64,
    pub risk: Risk,
    pub title: String,
    pub summary: String,
    pub payload: DraftPayload,
}

impl ActionDraft {
    /// The exercise plan, for workout and template drafts.
    pub fn exercise_plan(&self) -> Option<&ExercisePlanPayload> {
        match &self.payload {
            DraftPayload::CreateWorkout(p) | DraftPayload::CreateTemplate(p) => Some(p),
            DraftPayload::CreateGym(_) => None,
        }
    }

    pub fn exercise_plan_mut(&mut self) -> Option<&mut ExercisePlanPayload> {
        match &mut self.payload {
            DraftPayload::CreateWorkout(p) | DraftPayload::CreateTemplate(p) => Some(p),
            DraftPayload::CreateGym(_) => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDraft {
    kind: DraftKind,
    #[serde(default = "default_confidence")]
    confidence: f64,
    #[serde(default)]
    risk: Risk,
    title: String,
    #[serde(default)]
    summary: String,
    payload: serde_json::Value,
}

fn default_confidence() -> f64 {
    0.5
}

impl TryFrom<RawDraft> for ActionDraft {
    type Error = String;

    fn try_from(raw: RawDraft) -> Result<Self, Self::Error> {
        if !(0.0..=1.0).contains(&raw.confidence) {
            return Err(format!("confidence {} is outside [0, 1]", raw.confidence));
        }
        if raw.title.trim().is_empty() {
            return Err("title must not be empty".into());
        }
        let payload = match raw.kind {
            DraftKind::CreateWorkout => DraftPayload::CreateWorkout(plan_payload(raw.payload)?),
            DraftKind::CreateTemplate => DraftPayload::CreateTemplate(plan_payload(raw.payload)?),
            DraftKind::CreateGym => DraftPayload::CreateGym(
                serde_json::from_value(raw.payload).map_err(|e| format!("invalid create_gym payload: {e}"))?,
            ),
        };
        Ok(Self {
            kind: raw.kind,
            confidence: raw.confidence,
            risk: raw.risk,
            title: raw.title,
            summary: raw.summary,
            payload,
        })
    }
}

fn plan_payload(value: serde_json::Value) -> Result<ExercisePlanPayload, String> {
    let payload: ExercisePlanPayload =
        serde_json::from_value(value).map_err(|e| format!("invalid exercise payload: {e}"))?;
    if payload.exercises.is_empty() && payload.needs_review.is_empty() {
        return Err("draft lists no exercises".into());
    }
    Ok(payload)
}

/// The envelope a model may wrap its answer in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawEnvelope")]
pub struct AssistantEnvelope {
    pub contract_version: u32,
    pub assistant_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_draft: Option<ActionDraft>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
    contract_version: u32,
    assistant_text: String,
    #[serde(default)]
    action_draft: Option<ActionDraft>,
}

impl TryFrom<RawEnvelope> for AssistantEnvelope {
    type Error = String;

    fn try_from(raw: RawEnvelope) -> Result<Self, Self::Error> {
        if raw.contract_version != CONTRACT_VERSION {
            return Err(format!("unsupported contractVersion {}", raw.contract_version));
        }
        Ok(Self {
            contract_version: raw.contract_version,
            assistant_text: raw.assistant_text,
            action_draft: raw.action_draft,
        })
    }
}

/// What was recovered from one model output.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedOutput {
    /// The envelope's text, or the fence-stripped raw text.
    pub assistant_text: String,
    pub action_draft: Option<ActionDraft>,
    /// Where the envelope came from; `None` when nothing validated.
    pub source: Option<BlockSource>,
}

impl ParsedOutput {
    pub fn has_envelope(&self) -> bool {
        self.source.is_some()
    }
}

/// Extract the envelope from model output.
///
/// Never fails: when no block validates, the whole text (fences stripped)
/// becomes the assistant text.
pub fn parse_envelope(text: &str) -> ParsedOutput {
    match extract_json::<AssistantEnvelope, _>(text, |_| true) {
        Some((envelope, source)) => ParsedOutput {
            assistant_text: envelope.assistant_text,
            action_draft: envelope.action_draft,
            source: Some(source),
        },
        None => ParsedOutput {
            assistant_text: strip_fences(text),
            action_draft: None,
            source: None,
        },
    }
}
