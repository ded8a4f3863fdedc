//! Turn orchestration.
//!
//! One call to [`Coach::run_turn`] does, in order:
//!
//! 1. classify the response mode
//! 2. build and fingerprint the context snapshot
//! 3. build the exercise candidate pool and the tool allow-list
//! 4. run the tool-calling loop
//! 5. validate the answer, repairing at most once
//! 6. extract and ground the action draft
//!
//! Write tools never run here. They come back as pending proposals that
//! the caller confirms with [`Coach::confirm_proposal`].

use gymcoach_config::{CoachConfig, ResolutionConfig};
use gymcoach_contracts::{
    ActionDraft, ExercisePlanPayload, ResponseMode, ResponseValidator, ReviewItem, ReviewSuggestion, ValidationContext,
    ValidationFailure, ValidationResult, parse_envelope,
};
use gymcoach_core::message::{Message, Role};
use gymcoach_core::provider::{Provider, Usage};
use gymcoach_core::{Error, Exercise, FitnessStore, ScopeSet, StoreError, ToolCall, ToolRegistry};
use gymcoach_exercises::{
    CandidatePool, ExerciseRef, ExerciseResolver, Resolution, ResolutionReport, ResolutionSettings,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::context::{BuiltContext, ContextContract, Fingerprint, HistoryWindow, SnapshotBuilder, SnapshotMeta, SnapshotRequest};
use crate::loop_runner::{LoopSettings, ToolEvent, ToolLoop, allow_list};
use crate::prompts::{PromptSet, SystemPromptInput};
use crate::proposal::{Proposal, ProposalError};
use crate::repair::{OutputValidator, RepairInputs, RepairOutcome, check_and_repair};
use crate::stream_event::{AgentStreamEvent, EventSink, emit};

/// One user message plus the caller's per-turn choices.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub message: String,
    /// Prior conversation. System messages are ignored.
    pub history: Vec<Message>,
    /// Force a response mode instead of inferring it from the message.
    pub mode: Option<ResponseMode>,
    /// Whether the user's fitness data may be shown to the model.
    pub share_context: bool,
    pub memory_summary: Option<String>,
    pub launch_context: Option<serde_json::Value>,
    pub active_gym_id: Option<String>,
    /// Overrides `tools.write_tools_enabled` for this turn.
    pub write_tools_enabled: Option<bool>,
}

impl TurnRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: Vec::new(),
            mode: None,
            share_context: true,
            memory_summary: None,
            launch_context: None,
            active_gym_id: None,
            write_tools_enabled: None,
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_mode(mut self, mode: ResponseMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn without_context(mut self) -> Self {
        self.share_context = false;
        self
    }

    pub fn with_write_tools(mut self, enabled: bool) -> Self {
        self.write_tools_enabled = Some(enabled);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
    pub context_ms: u64,
    pub loop_ms: u64,
    pub validation_ms: u64,
    pub total_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub mode: ResponseMode,
    /// Loop calls plus the repair call, if any.
    pub model_calls: u32,
    pub loop_iterations: u32,
    pub overflow_retried: bool,
    pub hit_loop_limit: bool,
    pub allowed_tools: Vec<String>,
    pub snapshot: SnapshotMeta,
    pub candidate_count: usize,
    pub repair: RepairOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_failure: Option<ValidationFailure>,
    pub usage: Usage,
    pub timings: Timings,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResult {
    pub assistant_text: String,
    /// History plus this turn's user, assistant and tool messages.
    pub conversation: Vec<Message>,
    pub tool_events: Vec<ToolEvent>,
    pub pending_proposals: Vec<Proposal>,
    pub diagnostics: Diagnostics,
    pub context_contract: ContextContract,
    pub fingerprint: Fingerprint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_draft: Option<ActionDraft>,
    pub validation: ValidationResult,
}

pub struct Coach {
    provider: Arc<dyn Provider>,
    store: Arc<dyn FitnessStore>,
    registry: Arc<ToolRegistry>,
    validator: Arc<dyn OutputValidator>,
    prompts: PromptSet,
    snapshots: SnapshotBuilder,
    config: CoachConfig,
}

impl Coach {
    /// A coach with the full tool catalog over `store` and the default
    /// validator and prompts.
    pub fn new(provider: Arc<dyn Provider>, store: Arc<dyn FitnessStore>, config: CoachConfig) -> Result<Self, Error> {
        let validator = ResponseValidator::new().map_err(|e| Error::Internal(e.to_string()))?;
        Ok(Self {
            registry: Arc::new(gymcoach_tools::default_registry(store.clone())),
            snapshots: SnapshotBuilder::new(store.clone()),
            provider,
            store,
            validator: Arc::new(validator),
            prompts: PromptSet::default(),
            config,
        })
    }

    pub fn with_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn OutputValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn config(&self) -> &CoachConfig {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Build a snapshot with the configured scopes and limits.
    pub async fn build_context(&self, request: SnapshotRequest) -> BuiltContext {
        self.snapshots.build(request).await
    }

    fn loop_settings(&self) -> LoopSettings {
        let agent = &self.config.agent;
        LoopSettings {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            max_tokens: Some(self.config.max_tokens),
            max_tool_loops: agent.max_tool_loops,
            history: HistoryWindow::new(agent.history_max_messages, agent.history_max_chars),
            loop_limit_message: self.prompts.loop_limit_message.clone(),
            stream: agent.stream,
        }
    }

    async fn library(&self) -> Vec<Exercise> {
        self.store.exercise_library().await.unwrap_or_else(|e| {
            warn!(error = %e, "Exercise library unavailable");
            Vec::new()
        })
    }

    pub async fn run_turn(&self, request: TurnRequest, sink: Option<EventSink>) -> Result<TurnResult, Error> {
        let started = Instant::now();
        let sink = sink.as_ref();
        let mode = self.validator.classify(request.mode, &request.message);
        info!(%mode, share_context = request.share_context, "Coach turn started");

        // ── Context ──
        let scopes = if request.share_context {
            self.config.context.scopes.clone()
        } else {
            ScopeSet::none()
        };
        let snapshot_request = SnapshotRequest {
            scopes: scopes.clone(),
            memory_summary: request.memory_summary.clone(),
            launch_context: request.launch_context.clone(),
            active_gym_id: request.active_gym_id.clone(),
            ..SnapshotRequest::from_config(&self.config.context)
        };
        let built = self.snapshots.build(snapshot_request).await;
        let fingerprint = built.snapshot.fingerprint();

        let library = self.library().await;
        let pool = CandidatePool::build(
            &library,
            built.snapshot.equipment.as_deref(),
            &built.snapshot.recent_exercise_ids(),
            self.config.resolution.candidate_limit,
        );
        let write_tools_enabled = request
            .write_tools_enabled
            .unwrap_or(self.config.tools.write_tools_enabled);
        let allowed = allow_list(&self.registry, &scopes, write_tools_enabled);
        let context_ms = started.elapsed().as_millis() as u64;

        let context_json = request.share_context.then(|| built.snapshot.canonical());
        let system = self.prompts.system_messages(&SystemPromptInput {
            mode,
            context_json: context_json.as_deref(),
            candidates: pool.candidates(),
            write_tools_enabled,
        });

        let mut history: Vec<Message> = request.history.into_iter().filter(|m| m.role != Role::System).collect();
        history.push(Message::user(request.message.as_str()));

        // ── Tool loop ──
        let loop_started = Instant::now();
        let tool_loop = ToolLoop::new(self.provider.clone(), self.registry.clone(), self.loop_settings());
        let outcome = match tool_loop.run(&system, &history, &allowed, sink).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Coach turn failed");
                emit(sink, AgentStreamEvent::Error { message: e.to_string() }).await;
                return Err(Error::Provider(e));
            }
        };
        let loop_ms = loop_started.elapsed().as_millis() as u64;

        // ── Validation & repair ──
        let validation_started = Instant::now();
        let library_ids: BTreeSet<i64> = library.iter().map(|e| e.id).collect();
        let ctx = ValidationContext {
            mode,
            context_enabled: request.share_context,
            library_ids,
            candidate_ids: pool.ids(),
        };
        let mut repair_conversation = system.clone();
        repair_conversation.extend(tool_loop.settings().history.select(&history));
        repair_conversation.extend(without_final_answer(&outcome.turn_messages).iter().cloned());
        let gym = built.snapshot.gym_summary();
        let fallback = self.prompts.fallback(mode).to_string();
        let checked = check_and_repair(
            self.provider.as_ref(),
            tool_loop.settings(),
            self.validator.as_ref(),
            outcome.content.clone(),
            &ctx,
            RepairInputs {
                conversation: repair_conversation,
                candidates: pool.candidates(),
                gym_context: gym.as_deref(),
                fallback: &fallback,
            },
            sink,
        )
        .await;
        let validation_ms = validation_started.elapsed().as_millis() as u64;

        // ── Draft ──
        let (assistant_text, action_draft) = match (checked.outcome, mode) {
            (RepairOutcome::Failed, _) => (checked.text.clone(), None),
            (_, ResponseMode::TemplateJson) => (checked.text.clone(), None),
            _ => {
                let parsed = parse_envelope(&checked.text);
                let draft = parsed
                    .action_draft
                    .filter(|draft| is_grounded(draft, &ctx.candidate_ids))
                    .map(|draft| self.resolve_draft_names(draft, &library, &pool));
                (parsed.assistant_text, draft)
            }
        };

        let mut conversation = history;
        conversation.extend(outcome.turn_messages);
        match conversation.last_mut() {
            Some(last) if last.role == Role::Assistant && last.tool_calls.is_empty() => {
                last.content = checked.text.clone();
            }
            _ => conversation.push(Message::assistant(checked.text.clone())),
        }

        let model_calls = outcome.model_calls + u32::from(checked.repair_called);
        emit(
            sink,
            AgentStreamEvent::Done {
                iterations: outcome.iterations,
                model_calls,
                pending_proposals: outcome.proposals.len(),
            },
        )
        .await;

        let total_ms = started.elapsed().as_millis() as u64;
        info!(
            %mode,
            model_calls,
            proposals = outcome.proposals.len(),
            repair = ?checked.outcome,
            total_ms,
            "Coach turn finished"
        );

        Ok(TurnResult {
            assistant_text,
            conversation,
            tool_events: outcome.tool_events,
            pending_proposals: outcome.proposals,
            diagnostics: Diagnostics {
                mode,
                model_calls,
                loop_iterations: outcome.iterations,
                overflow_retried: outcome.overflow_retried,
                hit_loop_limit: outcome.hit_loop_limit,
                allowed_tools: allowed.iter().map(|k| k.to_string()).collect(),
                snapshot: built.meta,
                candidate_count: pool.len(),
                repair: checked.outcome,
                initial_failure: checked.initial_failure,
                usage: outcome.usage,
                timings: Timings {
                    context_ms,
                    loop_ms,
                    validation_ms,
                    total_ms,
                },
            },
            context_contract: built.contract,
            fingerprint,
            action_draft,
            validation: checked.validation,
        })
    }

    /// Execute a pending proposal's write tool exactly once.
    ///
    /// Tool failures are recorded on the proposal (`Error`); only a
    /// proposal that is not pending is rejected.
    pub async fn confirm_proposal(&self, proposal: &mut Proposal) -> Result<(), ProposalError> {
        proposal.begin()?;
        info!(proposal_id = %proposal.id, tool = %proposal.tool, "Executing confirmed proposal");
        let result = self
            .registry
            .execute(&ToolCall {
                id: proposal.call_id.clone(),
                kind: proposal.tool,
                arguments: proposal.input.clone(),
            })
            .await;
        if let Err(e) = &result {
            warn!(proposal_id = %proposal.id, error = %e, "Confirmed proposal failed");
        }
        proposal.finish(result);
        Ok(())
    }

    /// Resolve free-text exercise names against the whole library,
    /// optionally creating custom exercises for names with no match.
    pub async fn resolve_exercises(
        &self,
        entries: &[ExerciseRef],
        create_missing: bool,
    ) -> Result<ResolutionReport, StoreError> {
        resolve_exercises(self.store.as_ref(), &self.config.resolution, entries, create_missing).await
    }

    /// Bind name-only draft exercises to pool ids; names that do not
    /// resolve move to `needsReview`.
    fn resolve_draft_names(&self, mut draft: ActionDraft, library: &[Exercise], pool: &CandidatePool) -> ActionDraft {
        if let Some(plan) = draft.exercise_plan_mut() {
            if plan.exercises.iter().any(|e| e.exercise_id.is_none()) {
                let resolver = ExerciseResolver::new(library.to_vec(), resolution_settings(&self.config.resolution))
                    .with_pool(pool);
                bind_names(plan, &resolver);
            }
        }
        draft
    }
}

fn bind_names(plan: &mut ExercisePlanPayload, resolver: &ExerciseResolver) {
    let mut kept = Vec::with_capacity(plan.exercises.len());
    for mut exercise in std::mem::take(&mut plan.exercises) {
        if exercise.exercise_id.is_some() {
            kept.push(exercise);
            continue;
        }
        let Some(name) = exercise.display_name().map(str::to_string) else {
            warn!(sets = exercise.sets, reps = exercise.reps, "Dropping draft exercise with no id or name");
            continue;
        };
        match resolver.resolve_one(&ExerciseRef::by_name(name.as_str())) {
            Resolution::Resolved { exercise_id, .. } => {
                exercise.exercise_id = Some(exercise_id);
                kept.push(exercise);
            }
            Resolution::NeedsReview(suggestions) => plan.needs_review.push(ReviewItem {
                name,
                suggestions: suggestions
                    .into_iter()
                    .map(|s| ReviewSuggestion {
                        exercise_id: s.exercise_id,
                        name: Some(s.name),
                    })
                    .collect(),
            }),
        }
    }
    plan.exercises = kept;
}

/// Resolve names against the store's whole library with the configured
/// thresholds. Shared by [`Coach::resolve_exercises`] and the CLI.
pub async fn resolve_exercises(
    store: &dyn FitnessStore,
    config: &ResolutionConfig,
    entries: &[ExerciseRef],
    create_missing: bool,
) -> Result<ResolutionReport, StoreError> {
    let settings = ResolutionSettings {
        create_missing,
        ..resolution_settings(config)
    };
    let resolver = ExerciseResolver::new(store.exercise_library().await?, settings);
    let report = if create_missing {
        resolver.resolve_or_create(entries, store).await
    } else {
        resolver.resolve(entries)
    };
    debug!(
        entries = entries.len(),
        mapped = report.mapped_count(),
        created = report.created.len(),
        "Resolved exercise names"
    );
    Ok(report)
}

pub fn resolution_settings(config: &ResolutionConfig) -> ResolutionSettings {
    ResolutionSettings {
        fuzzy_threshold: config.fuzzy_threshold,
        tie_margin: config.tie_margin,
        suggestion_floor: config.suggestion_floor,
        max_suggestions: config.max_suggestions,
        create_missing: false,
    }
}

/// Drafts may only reference pool exercises, and every entry must name one.
fn is_grounded(draft: &ActionDraft, candidate_ids: &BTreeSet<i64>) -> bool {
    draft
        .exercise_plan()
        .is_none_or(|plan| plan.unreferenced_count() == 0 && plan.referenced_ids().is_subset(candidate_ids))
}

fn without_final_answer(turn_messages: &[Message]) -> &[Message] {
    match turn_messages.split_last() {
        Some((last, rest)) if last.role == Role::Assistant && last.tool_calls.is_empty() => rest,
        _ => turn_messages,
    }
}
