//! The bounded tool-calling loop.
//!
//! Each iteration sends system messages, the history window and this
//! turn's messages to the provider. Tool calls are answered one at a time
//! in the order the model gave them:
//!
//! 1. arguments parsed leniently (malformed → `tool_input_invalid`)
//! 2. unknown name → `tool_not_found`
//! 3. not allow-listed → `tool_blocked_by_scope`
//! 4. schema mismatch → `tool_input_invalid`
//! 5. write tool → queued as a [`Proposal`], answered `pending_confirmation`
//! 6. read tool → executed
//!
//! The loop ends on a response without tool calls, or on the last allowed
//! iteration, whose tool calls are still answered.

use gymcoach_contracts::parse_json_lenient;
use gymcoach_core::message::{Message, MessageToolCall};
use gymcoach_core::provider::{Provider, ProviderRequest, Usage};
use gymcoach_core::{ProviderError, ScopeSet, ToolCall, ToolError, ToolKind, ToolRegistry};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::context::history::{HistoryWindow, collapse_to_latest_user};
use crate::proposal::Proposal;
use crate::stream_event::{AgentStreamEvent, EventSink, emit};

/// Default cap on model responses per turn.
pub const MAX_TOOL_LOOPS: u32 = 2;

/// Read tools whose scope is enabled (ungated ones always), plus write
/// tools when enabled. Computed once per turn.
pub fn allow_list(registry: &ToolRegistry, scopes: &ScopeSet, write_tools_enabled: bool) -> Vec<ToolKind> {
    registry
        .kinds()
        .into_iter()
        .filter(|kind| {
            if kind.is_write() {
                write_tools_enabled
            } else {
                kind.scope().is_none_or(|scope| scopes.contains(scope))
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub max_tool_loops: u32,
    pub history: HistoryWindow,
    /// Content used when the last iteration ends with tool calls and no text.
    pub loop_limit_message: String,
    /// Use the provider's streaming transport when an event sink is attached.
    pub stream: bool,
}

impl LoopSettings {
    pub fn request(&self, messages: Vec<Message>, tools: Vec<gymcoach_core::ToolDefinition>, stream: bool) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools,
            stream,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolEventStatus {
    Executed,
    Failed,
    NotFound,
    Blocked,
    InvalidInput,
    PendingConfirmation,
}

/// Record of one answered tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolEvent {
    pub call_id: String,
    /// Name as the model sent it.
    pub name: String,
    pub status: ToolEventStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// What one loop run produced.
#[derive(Debug, Clone, Default)]
pub struct LoopOutcome {
    /// Final assistant content.
    pub content: String,
    /// Assistant and tool messages added this turn, in order.
    pub turn_messages: Vec<Message>,
    pub tool_events: Vec<ToolEvent>,
    pub proposals: Vec<Proposal>,
    pub model_calls: u32,
    pub iterations: u32,
    pub overflow_retried: bool,
    pub hit_loop_limit: bool,
    pub usage: Usage,
}

/// Runs the loop for one turn.
pub struct ToolLoop {
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
    settings: LoopSettings,
}

impl ToolLoop {
    pub fn new(provider: Arc<dyn Provider>, registry: Arc<ToolRegistry>, settings: LoopSettings) -> Self {
        Self {
            provider,
            registry,
            settings,
        }
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    /// `history` is the caller's conversation ending with the new user
    /// message. Only provider failures escape, and a first context overflow
    /// is retried with the history collapsed to the latest user message.
    pub async fn run(
        &self,
        system: &[Message],
        history: &[Message],
        allowed: &[ToolKind],
        sink: Option<&EventSink>,
    ) -> Result<LoopOutcome, ProviderError> {
        let tools = self.registry.definitions_for(allowed);
        let max_loops = self.settings.max_tool_loops.max(1);
        let mut outcome = LoopOutcome::default();
        let mut collapsed = false;

        loop {
            let window = if collapsed {
                collapse_to_latest_user(history)
            } else {
                self.settings.history.select(history)
            };
            let mut outbound = Vec::with_capacity(system.len() + window.len() + outcome.turn_messages.len());
            outbound.extend_from_slice(system);
            outbound.extend(window);
            outbound.extend(outcome.turn_messages.iter().cloned());

            let iteration = outcome.iterations + 1;
            debug!(iteration, messages = outbound.len(), tools = tools.len(), "Coach loop iteration");

            let stream = self.settings.stream && sink.is_some();
            let request = self.settings.request(outbound, tools.clone(), stream);
            outcome.model_calls += 1;
            let reply = match self.call_model(request, sink).await {
                Ok(reply) => reply,
                Err(e) if e.is_context_overflow() && !outcome.overflow_retried => {
                    warn!(iteration, error = %e, "Context overflow, retrying with collapsed history");
                    outcome.overflow_retried = true;
                    collapsed = true;
                    continue;
                }
                Err(e) => return Err(e),
            };
            outcome.iterations = iteration;
            let (message, usage) = reply;
            if let Some(usage) = usage {
                outcome.usage.prompt_tokens += usage.prompt_tokens;
                outcome.usage.completion_tokens += usage.completion_tokens;
                outcome.usage.total_tokens += usage.total_tokens;
            }

            if message.tool_calls.is_empty() {
                outcome.content = message.content.clone();
                outcome.turn_messages.push(message);
                break;
            }

            let calls = message.tool_calls.clone();
            let content = message.content.clone();
            outcome.turn_messages.push(message);
            for call in &calls {
                let tool_message = self.answer_call(call, allowed, &mut outcome, sink).await;
                outcome.turn_messages.push(tool_message);
            }

            if iteration >= max_loops {
                warn!(iteration, "Tool loop limit reached");
                outcome.hit_loop_limit = true;
                outcome.content = if content.trim().is_empty() {
                    let text = self.settings.loop_limit_message.clone();
                    outcome.turn_messages.push(Message::assistant(text.clone()));
                    text
                } else {
                    content
                };
                break;
            }
        }

        info!(
            iterations = outcome.iterations,
            model_calls = outcome.model_calls,
            tool_calls = outcome.tool_events.len(),
            proposals = outcome.proposals.len(),
            "Coach loop finished"
        );
        Ok(outcome)
    }

    async fn call_model(
        &self,
        request: ProviderRequest,
        sink: Option<&EventSink>,
    ) -> Result<(Message, Option<Usage>), ProviderError> {
        let Some(sink) = sink.filter(|_| request.stream) else {
            let response = self.provider.complete(request).await?;
            return Ok((response.message, response.usage));
        };

        let mut rx = self.provider.stream(request).await?;
        let mut content = String::new();
        let mut tool_calls = Vec::new();
        let mut usage = None;
        while let Some(chunk) = rx.recv().await {
            let chunk = chunk?;
            if let Some(delta) = chunk.content.filter(|d| !d.is_empty()) {
                content.push_str(&delta);
                emit(Some(sink), AgentStreamEvent::Delta { content: delta }).await;
            }
            if chunk.done {
                tool_calls = chunk.tool_calls;
                usage = chunk.usage;
                break;
            }
        }
        Ok((Message::assistant_tool_calls(content, tool_calls), usage))
    }

    async fn answer_call(
        &self,
        call: &MessageToolCall,
        allowed: &[ToolKind],
        outcome: &mut LoopOutcome,
        sink: Option<&EventSink>,
    ) -> Message {
        let started = Instant::now();
        let arguments = parse_arguments(&call.name, &call.arguments);
        emit(
            sink,
            AgentStreamEvent::ToolCall {
                id: call.id.clone(),
                name: call.name.clone(),
                input: arguments.as_ref().cloned().unwrap_or(serde_json::Value::Null),
            },
        )
        .await;

        let (status, payload) = match self.dispatch(call, arguments, allowed, outcome, sink).await {
            Ok((status, payload)) => (status, payload),
            Err(e) => {
                warn!(tool = %call.name, code = e.code(), error = %e, "Tool call rejected");
                (status_for(&e), e.to_payload())
            }
        };

        let output = serde_json::to_string(&payload).unwrap_or_default();
        let error = payload.get("error").map(|_| {
            payload
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or_default()
                .to_string()
        });
        emit(
            sink,
            AgentStreamEvent::ToolResult {
                id: call.id.clone(),
                name: call.name.clone(),
                output: output.clone(),
                success: error.is_none(),
            },
        )
        .await;

        outcome.tool_events.push(ToolEvent {
            call_id: call.id.clone(),
            name: call.name.clone(),
            status,
            error,
            duration_ms: started.elapsed().as_millis() as u64,
        });
        Message::tool_result(&call.id, output)
    }

    async fn dispatch(
        &self,
        call: &MessageToolCall,
        arguments: Result<serde_json::Value, ToolError>,
        allowed: &[ToolKind],
        outcome: &mut LoopOutcome,
        sink: Option<&EventSink>,
    ) -> Result<(ToolEventStatus, serde_json::Value), ToolError> {
        let arguments = arguments?;
        let tool = self.registry.lookup(&call.name)?;
        let kind = tool.kind();
        if !allowed.contains(&kind) {
            return Err(ToolError::BlockedByScope(call.name.clone()));
        }
        self.registry.validate_input(kind, &arguments)?;

        if kind.is_write() {
            let existing = outcome.proposals.iter().find(|p| p.call_id == call.id);
            let payload = match existing {
                Some(proposal) => proposal.pending_payload(),
                None => {
                    let proposal = Proposal::new(&call.id, kind, arguments.clone(), tool.summarize(&arguments));
                    info!(tool = %kind, proposal_id = %proposal.id, "Write call queued for confirmation");
                    emit(
                        sink,
                        AgentStreamEvent::ProposalQueued {
                            proposal_id: proposal.id.clone(),
                            tool: kind.to_string(),
                            summary: proposal.summary.clone(),
                        },
                    )
                    .await;
                    let payload = proposal.pending_payload();
                    outcome.proposals.push(proposal);
                    payload
                }
            };
            return Ok((ToolEventStatus::PendingConfirmation, payload));
        }

        debug!(tool = %kind, "Executing read tool");
        let result = self
            .registry
            .execute(&ToolCall {
                id: call.id.clone(),
                kind,
                arguments,
            })
            .await?;
        let payload = result
            .data
            .unwrap_or_else(|| serde_json::json!({ "output": result.output }));
        Ok((ToolEventStatus::Executed, payload))
    }
}

/// Empty argument text means "no arguments".
fn parse_arguments(name: &str, raw: &str) -> Result<serde_json::Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    parse_json_lenient(raw).map_err(|e| ToolError::InputInvalid {
        tool_name: name.to_string(),
        errors: vec![format!("arguments are not valid JSON: {e}")],
    })
}

fn status_for(error: &ToolError) -> ToolEventStatus {
    match error {
        ToolError::NotFound(_) => ToolEventStatus::NotFound,
        ToolError::BlockedByScope(_) => ToolEventStatus::Blocked,
        ToolError::InputInvalid { .. } => ToolEventStatus::InvalidInput,
        ToolError::ExecutionFailed { .. } => ToolEventStatus::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use gymcoach_core::{Role, Scope};
    use gymcoach_store::{FitnessData, InMemoryStore};

    fn registry() -> Arc<ToolRegistry> {
        let store = Arc::new(InMemoryStore::from_data(FitnessData::demo()));
        Arc::new(gymcoach_tools::default_registry(store))
    }

    fn settings(max_tool_loops: u32) -> LoopSettings {
        LoopSettings {
            model: "mock-model".into(),
            temperature: 0.4,
            max_tokens: None,
            max_tool_loops,
            history: HistoryWindow::default(),
            loop_limit_message: "limit".into(),
            stream: true,
        }
    }

    fn runner(provider: Arc<SequentialMockProvider>, max_tool_loops: u32) -> ToolLoop {
        ToolLoop::new(provider, registry(), settings(max_tool_loops))
    }

    fn tool_payload(outcome: &LoopOutcome, call_id: &str) -> serde_json::Value {
        let msg = outcome
            .turn_messages
            .iter()
            .find(|m| m.role == Role::Tool && m.tool_call_id.as_deref() == Some(call_id))
            .unwrap();
        serde_json::from_str(&msg.content).unwrap()
    }

    #[test]
    fn allow_list_respects_scopes_and_write_flag() {
        let registry = registry();
        let scopes = ScopeSet::none().with(Scope::Notes);
        let allowed = allow_list(&registry, &scopes, false);
        assert_eq!(allowed, vec![ToolKind::SearchExerciseLibrary, ToolKind::GetNotes]);

        let with_writes = allow_list(&registry, &scopes, true);
        assert!(with_writes.contains(&ToolKind::CreateTemplate));
        assert!(!with_writes.contains(&ToolKind::GetRecentSessions));
    }

    #[tokio::test]
    async fn text_reply_ends_after_one_call() {
        let provider = Arc::new(SequentialMockProvider::single_text("Drink water."));
        let outcome = runner(provider.clone(), 2)
            .run(&[Message::system("sys")], &[Message::user("hi")], &[], None)
            .await
            .unwrap();
        assert_eq!(outcome.content, "Drink water.");
        assert_eq!(outcome.model_calls, 1);
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.requests()[0].messages[0].role, Role::System);
    }

    #[tokio::test]
    async fn read_tool_result_is_fed_back() {
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call_with_id("c1", "get_notes", serde_json::json!({}))],
            "",
            "Your knee note is noted.",
        ));
        let allowed = [ToolKind::GetNotes];
        let outcome = runner(provider.clone(), 2)
            .run(&[], &[Message::user("notes?")], &allowed, None)
            .await
            .unwrap();
        assert_eq!(outcome.content, "Your knee note is noted.");
        assert_eq!(outcome.tool_events[0].status, ToolEventStatus::Executed);
        assert!(tool_payload(&outcome, "c1")["notes"].is_array());
        // second request carries the tool result
        let requests = provider.requests();
        let second = &requests[1];
        assert!(second.messages.iter().any(|m| m.tool_call_id.as_deref() == Some("c1")));
    }

    #[tokio::test]
    async fn rejected_calls_become_structured_errors() {
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![
                make_raw_tool_call("c1", "get_notes", "{not json"),
                make_tool_call_with_id("c2", "delete_account", serde_json::json!({})),
                make_tool_call_with_id("c3", "get_recent_sessions", serde_json::json!({})),
                make_tool_call_with_id("c4", "get_notes", serde_json::json!({"limit": "ten"})),
            ],
            "",
            "done",
        ));
        let allowed = [ToolKind::GetNotes];
        let outcome = runner(provider, 2)
            .run(&[], &[Message::user("x")], &allowed, None)
            .await
            .unwrap();

        let statuses: Vec<ToolEventStatus> = outcome.tool_events.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                ToolEventStatus::InvalidInput,
                ToolEventStatus::NotFound,
                ToolEventStatus::Blocked,
                ToolEventStatus::InvalidInput,
            ]
        );
        assert_eq!(tool_payload(&outcome, "c2")["error"], "tool_not_found");
        assert_eq!(tool_payload(&outcome, "c3")["error"], "tool_blocked_by_scope");
        assert!(tool_payload(&outcome, "c4")["details"].is_array());
    }

    #[tokio::test]
    async fn write_calls_queue_proposals_once_per_call_id() {
        let call = make_tool_call_with_id("w1", "update_goal", serde_json::json!({"goal": "Run a 5k"}));
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![call.clone(), call],
            "",
            "I proposed the new goal.",
        ));
        let allowed = [ToolKind::UpdateGoal];
        let outcome = runner(provider, 2)
            .run(&[], &[Message::user("goal")], &allowed, None)
            .await
            .unwrap();
        assert_eq!(outcome.proposals.len(), 1);
        assert!(outcome.proposals[0].is_pending());
        assert_eq!(tool_payload(&outcome, "w1")["status"], "pending_confirmation");
        assert!(outcome.tool_events.iter().all(|e| e.status == ToolEventStatus::PendingConfirmation));
    }

    #[tokio::test]
    async fn loop_limit_still_answers_last_calls() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(vec![make_tool_call_with_id("a", "get_notes", serde_json::json!({}))], ""),
            make_tool_call_response(vec![make_tool_call_with_id("b", "update_goal", serde_json::json!({"goal": "x"}))], ""),
        ]));
        let allowed = [ToolKind::GetNotes, ToolKind::UpdateGoal];
        let outcome = runner(provider.clone(), 2)
            .run(&[], &[Message::user("x")], &allowed, None)
            .await
            .unwrap();
        assert!(outcome.hit_loop_limit);
        assert_eq!(outcome.model_calls, 2);
        assert_eq!(outcome.proposals.len(), 1);
        assert_eq!(outcome.content, "limit");
        assert_eq!(outcome.turn_messages.last().unwrap().content, "limit");
    }

    #[tokio::test]
    async fn overflow_retries_once_with_collapsed_history() {
        let provider = Arc::new(SequentialMockProvider::with_results(vec![
            Err(ProviderError::ContextWindowExceeded("too long".into())),
            Ok(make_text_response("short answer")),
        ]));
        let history = vec![Message::user("old"), Message::assistant("old reply"), Message::user("new")];
        let outcome = runner(provider.clone(), 2)
            .run(&[Message::system("sys")], &history, &[], None)
            .await
            .unwrap();
        assert!(outcome.overflow_retried);
        assert_eq!(outcome.model_calls, 2);
        assert_eq!(outcome.iterations, 1);

        let requests = provider.requests();
        let retry = &requests[1];
        let contents: Vec<&str> = retry.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["sys", "new"]);
    }

    #[tokio::test]
    async fn second_overflow_propagates() {
        let provider = Arc::new(SequentialMockProvider::with_results(vec![
            Err(ProviderError::ContextWindowExceeded("too long".into())),
            Err(ProviderError::ApiError {
                status_code: 400,
                message: "maximum context length exceeded".into(),
            }),
        ]));
        let err = runner(provider, 2)
            .run(&[], &[Message::user("x")], &[], None)
            .await
            .unwrap_err();
        assert!(err.is_context_overflow());
    }

    #[tokio::test]
    async fn other_provider_errors_are_not_retried() {
        let provider = Arc::new(SequentialMockProvider::with_results(vec![Err(ProviderError::RateLimited {
            retry_after_secs: 3,
        })]));
        let err = runner(provider.clone(), 2)
            .run(&[], &[Message::user("x")], &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { .. }));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn streaming_forwards_deltas() {
        let provider = Arc::new(SequentialMockProvider::single_text("Hello there"));
        let (tx, mut rx) = tokio::sync::mpsc::channel(16);
        let outcome = runner(provider.clone(), 2)
            .run(&[], &[Message::user("hi")], &[], Some(&tx))
            .await
            .unwrap();
        drop(tx);
        assert_eq!(outcome.content, "Hello there");
        assert!(provider.requests()[0].stream);
        let mut deltas = String::new();
        while let Some(event) = rx.recv().await {
            if let AgentStreamEvent::Delta { content } = event {
                deltas.push_str(&content);
            }
        }
        assert_eq!(deltas, "Hello there");
    }

    #[tokio::test]
    async fn sink_without_streaming_uses_complete() {
        let provider = Arc::new(SequentialMockProvider::single_text("Hello there"));
        let mut settings = settings(2);
        settings.stream = false;
        let (tx, mut rx) = tokio::sync::mpsc::channel(16);
        let outcome = ToolLoop::new(provider.clone(), registry(), settings)
            .run(&[], &[Message::user("hi")], &[], Some(&tx))
            .await
            .unwrap();
        drop(tx);
        assert_eq!(outcome.content, "Hello there");
        let requests = provider.requests();
        assert!(!requests[0].stream);
        while let Some(event) = rx.recv().await {
            assert!(!matches!(event, AgentStreamEvent::Delta { .. }));
        }
    }
}
