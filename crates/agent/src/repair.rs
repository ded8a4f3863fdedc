//! Validation of the final answer and the single repair round-trip.

use gymcoach_contracts::{
    RepairRequest, ResponseMode, ResponseValidator, ValidationContext, ValidationFailure, ValidationResult,
    repair_prompt,
};
use gymcoach_core::{ExerciseCandidate, Message, Provider};
use serde::Serialize;
use tracing::{info, warn};

use crate::loop_runner::LoopSettings;
use crate::stream_event::{AgentStreamEvent, EventSink, emit};

/// Decides the response mode and checks answers against it.
pub trait OutputValidator: Send + Sync {
    fn classify(&self, explicit: Option<ResponseMode>, user_message: &str) -> ResponseMode;

    fn validate(&self, text: &str, ctx: &ValidationContext) -> ValidationResult;
}

impl OutputValidator for ResponseValidator {
    fn classify(&self, explicit: Option<ResponseMode>, user_message: &str) -> ResponseMode {
        self.classify_mode(explicit, user_message)
    }

    fn validate(&self, text: &str, ctx: &ValidationContext) -> ValidationResult {
        ResponseValidator::validate(self, text, ctx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairOutcome {
    /// The first answer was valid.
    NotNeeded,
    /// The corrected answer was valid and replaced the first.
    Repaired,
    /// The corrected answer also failed; the fallback was used.
    Failed,
}

/// The checked final answer.
#[derive(Debug, Clone)]
pub struct CheckedAnswer {
    pub text: String,
    pub outcome: RepairOutcome,
    /// Result for the answer that was kept (the repaired one, if any).
    pub validation: ValidationResult,
    /// Why the first answer failed, when it did.
    pub initial_failure: Option<ValidationFailure>,
    /// Whether a repair call was made.
    pub repair_called: bool,
}

/// Material for the repair prompt and request.
pub struct RepairInputs<'a> {
    /// Messages that produced the first answer (system, history, turn).
    pub conversation: Vec<Message>,
    pub candidates: &'a [ExerciseCandidate],
    pub gym_context: Option<&'a str>,
    pub fallback: &'a str,
}

/// Validate `text`; on failure request exactly one correction with no tools
/// offered. A failed repair call counts as a failed repair.
pub async fn check_and_repair(
    provider: &dyn Provider,
    settings: &LoopSettings,
    validator: &dyn OutputValidator,
    text: String,
    ctx: &ValidationContext,
    inputs: RepairInputs<'_>,
    sink: Option<&EventSink>,
) -> CheckedAnswer {
    let first = validator.validate(&text, ctx);
    let Some(failure) = first.error.clone() else {
        return CheckedAnswer {
            text,
            outcome: RepairOutcome::NotNeeded,
            validation: first,
            initial_failure: None,
            repair_called: false,
        };
    };

    warn!(mode = %failure.mode, reason = %failure.reason, "Answer failed validation, requesting repair");
    emit(
        sink,
        AgentStreamEvent::Repairing {
            mode: failure.mode.to_string(),
            reason: failure.reason.clone(),
        },
    )
    .await;

    let prompt = repair_prompt(&RepairRequest {
        failure: &failure,
        invalid_output: &text,
        candidates: inputs.candidates,
        gym_context: inputs.gym_context,
    });
    let mut messages = inputs.conversation;
    messages.push(Message::assistant(text));
    messages.push(Message::user(prompt));

    let repaired = match provider.complete(settings.request(messages, Vec::new(), false)).await {
        Ok(response) => response.message.content,
        Err(e) => {
            warn!(error = %e, "Repair call failed");
            return fallback(first, failure, inputs.fallback);
        }
    };

    let second = validator.validate(&repaired, ctx);
    if second.valid {
        info!(mode = %failure.mode, "Answer repaired");
        CheckedAnswer {
            text: repaired,
            outcome: RepairOutcome::Repaired,
            validation: second,
            initial_failure: Some(failure),
            repair_called: true,
        }
    } else {
        warn!(
            mode = %failure.mode,
            reason = second.error.as_ref().map(|f| f.reason.as_str()).unwrap_or_default(),
            "Repaired answer still invalid, using fallback"
        );
        fallback(second, failure, inputs.fallback)
    }
}

fn fallback(validation: ValidationResult, failure: ValidationFailure, text: &str) -> CheckedAnswer {
    CheckedAnswer {
        text: text.to_string(),
        outcome: RepairOutcome::Failed,
        validation,
        initial_failure: Some(failure),
        repair_called: true,
    }
}
