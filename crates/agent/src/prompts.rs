//! System prompt text, regenerated every turn.

use gymcoach_contracts::{ResponseMode, fallback_message};
use gymcoach_core::{ExerciseCandidate, Message};

const PERSONA: &str = "You are a strength and conditioning coach inside a workout tracking app. \
Give practical, safe training advice grounded in the user's own data. \
Keep answers short. Never invent exercises the user cannot perform with their equipment.";

const CONTEXT_PREAMBLE: &str = "The user's fitness data for this conversation (JSON). \
Sections that are absent were not shared or did not fit:";

const NO_CONTEXT_NOTICE: &str = "The user has not shared their fitness data or gym. \
Do not claim to know their history, settings or equipment.";

const WRITE_TOOLS_NOTICE: &str = "Tools that change data (templates, planned workouts, goals, gyms) \
are never applied directly. Calling one queues a proposal for the user to confirm; \
tell the user what you proposed.";

const WORKOUT_INSTRUCTIONS: &str = "When proposing a workout or template, reply with a ```json fenced block \
{\"contractVersion\": 1, \"assistantText\": string, \"actionDraft\": {\"kind\": \"create_workout\" | \"create_template\", \
\"confidence\": 0..1, \"risk\": \"low\" | \"medium\" | \"high\", \"title\": string, \"summary\": string, \
\"payload\": {\"name\": string, \"exercises\": [{\"exerciseId\": number, \"sets\": number, \"reps\": number}], \
\"needsReview\": [{\"name\": string, \"suggestions\": [{\"exerciseId\": number}]}]}}}. \
Only use exercise ids from the list below. Put anything you cannot match under needsReview.";

const TEMPLATE_JSON_INSTRUCTIONS: &str = "Reply with exactly one ```json fenced block and nothing else: \
{\"name\": string, \"exercises\": [{\"exerciseId\": number, \"sets\": number, \"reps\": number, \"warmupSets\"?: number}]}. \
Only use exercise ids from the list below.";

const LOOP_LIMIT_MESSAGE: &str = "I gathered what I could but ran out of steps before finishing. \
Could you tell me a bit more about what you'd like?";

/// Candidates listed per prompt.
const MAX_PROMPT_CANDIDATES: usize = 80;

/// Prompt text used by the coach. Every field can be replaced.
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub persona: String,
    pub context_preamble: String,
    pub no_context_notice: String,
    pub write_tools_notice: String,
    pub workout_instructions: String,
    pub template_json_instructions: String,
    /// Final answer when the loop limit is hit with no content.
    pub loop_limit_message: String,
    pub fallback_general: String,
    pub fallback_workout: String,
    pub fallback_template_json: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            persona: PERSONA.into(),
            context_preamble: CONTEXT_PREAMBLE.into(),
            no_context_notice: NO_CONTEXT_NOTICE.into(),
            write_tools_notice: WRITE_TOOLS_NOTICE.into(),
            workout_instructions: WORKOUT_INSTRUCTIONS.into(),
            template_json_instructions: TEMPLATE_JSON_INSTRUCTIONS.into(),
            loop_limit_message: LOOP_LIMIT_MESSAGE.into(),
            fallback_general: fallback_message(ResponseMode::General).into(),
            fallback_workout: fallback_message(ResponseMode::Workout).into(),
            fallback_template_json: fallback_message(ResponseMode::TemplateJson).into(),
        }
    }
}

/// Inputs for one turn's system messages.
#[derive(Debug, Clone, Copy)]
pub struct SystemPromptInput<'a> {
    pub mode: ResponseMode,
    /// Canonical snapshot JSON, `None` when context sharing is off.
    pub context_json: Option<&'a str>,
    pub candidates: &'a [ExerciseCandidate],
    pub write_tools_enabled: bool,
}

impl PromptSet {
    pub fn fallback(&self, mode: ResponseMode) -> &str {
        match mode {
            ResponseMode::General => &self.fallback_general,
            ResponseMode::Workout => &self.fallback_workout,
            ResponseMode::TemplateJson => &self.fallback_template_json,
        }
    }

    /// Persona and rules, then context, then mode instructions.
    pub fn system_messages(&self, input: &SystemPromptInput<'_>) -> Vec<Message> {
        let mut rules = self.persona.clone();
        if input.write_tools_enabled {
            rules.push_str("\n\n");
            rules.push_str(&self.write_tools_notice);
        }
        let mut messages = vec![Message::system(rules)];

        messages.push(Message::system(match input.context_json {
            Some(json) => format!("{}\n{json}", self.context_preamble),
            None => self.no_context_notice.clone(),
        }));

        let instructions = match input.mode {
            ResponseMode::General => None,
            ResponseMode::Workout => Some(&self.workout_instructions),
            ResponseMode::TemplateJson => Some(&self.template_json_instructions),
        };
        if let Some(instructions) = instructions {
            let mut text = instructions.clone();
            text.push_str("\n\nExercises (id: name [equipment]):");
            for c in input.candidates.iter().take(MAX_PROMPT_CANDIDATES) {
                text.push_str(&format!("\n{}: {}", c.exercise_id, c.name));
                if !c.equipment.is_empty() {
                    text.push_str(&format!(" [{}]", c.equipment.join(", ")));
                }
            }
            messages.push(Message::system(text));
        }

        messages
    }
}
