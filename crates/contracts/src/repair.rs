//! Repair prompts and fallback answers.

use gymcoach_core::fitness::ExerciseCandidate;

use crate::validation::{ResponseMode, ValidationFailure};

/// Upper bound on how much of the invalid answer is quoted back.
const MAX_QUOTED_CHARS: usize = 4_000;
const MAX_LISTED_CANDIDATES: usize = 40;

/// Everything a repair prompt is built from.
#[derive(Debug, Clone, Copy)]
pub struct RepairRequest<'a> {
    pub failure: &'a ValidationFailure,
    pub invalid_output: &'a str,
    pub candidates: &'a [ExerciseCandidate],
    /// Active gym name and equipment, if context sharing is on.
    pub gym_context: Option<&'a str>,
}

/// Build the single corrective instruction sent after a failed validation.
pub fn repair_prompt(request: &RepairRequest<'_>) -> String {
    let mode = request.failure.mode;
    let mut prompt = format!(
        "Your previous answer failed the {mode} format check: {}.\n\nPrevious answer:\n<<<\n{}\n>>>\n\n",
        request.failure.reason,
        quote(request.invalid_output),
    );

    prompt.push_str(schema_instructions(mode));

    if mode != ResponseMode::General && !request.candidates.is_empty() {
        prompt.push_str("\n\nYou may only use these exercises (id: name):\n");
        for candidate in request.candidates.iter().take(MAX_LISTED_CANDIDATES) {
            prompt.push_str(&format!("- {}: {}\n", candidate.exercise_id, candidate.name));
        }
    }

    match request.gym_context {
        Some(gym) => {
            prompt.push_str("\nActive gym: ");
            prompt.push_str(gym);
            prompt.push('\n');
        }
        None if mode == ResponseMode::Workout => {
            prompt.push_str("\nThe user has not shared their gym. Do not claim to see their equipment.\n");
        }
        None => {}
    }

    prompt.push_str("\nReply with the corrected answer only.");
    prompt
}

fn schema_instructions(mode: ResponseMode) -> &'static str {
    match mode {
        ResponseMode::TemplateJson => {
            "Reply with exactly one ```json fenced block and no other text. Shape:\n\
             {\"name\": string, \"exercises\": [{\"exerciseId\": number, \"sets\": number, \"reps\": number, \"warmupSets\"?: number}], \"needsReview\"?: [{\"name\": string, \"suggestions\": [{\"exerciseId\": number}]}]}"
        }
        ResponseMode::Workout => {
            "Either return a ```json fenced envelope {\"contractVersion\": 1, \"assistantText\": string, \"actionDraft\": {\"kind\": \"create_workout\" | \"create_template\", \"confidence\": number, \"risk\": \"low\" | \"medium\" | \"high\", \"title\": string, \"summary\": string, \"payload\": {\"name\": string, \"exercises\": [{\"exerciseId\": number, \"sets\": number, \"reps\": number}], \"needsReview\"?: [...]}}}, \
             or write the plan as plain text with one exercise per line in the form \"Exercise: N sets of M reps\", at least 3 lines."
        }
        ResponseMode::General => "Answer the user's question directly.",
    }
}

/// Fixed answer used when the repaired output also fails.
pub fn fallback_message(mode: ResponseMode) -> &'static str {
    match mode {
        ResponseMode::Workout => {
            "I couldn't put together a workout that fits your exercise library this time. \
             Try naming the muscle groups or equipment you want to use and I'll try again."
        }
        ResponseMode::TemplateJson => {
            "I couldn't produce a valid template from your exercise library. \
             Please try again, or create the template manually."
        }
        ResponseMode::General => "Sorry, I couldn't produce an answer. Please try again.",
    }
}

fn quote(text: &str) -> String {
    if text.chars().count() <= MAX_QUOTED_CHARS {
        return text.to_string();
    }
    let mut quoted: String = text.chars().take(MAX_QUOTED_CHARS).collect();
    quoted.push_str("\n[truncated]");
    quoted
}
