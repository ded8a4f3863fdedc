//! Turn-level streaming events.
//!
//! `AgentStreamEvent` wraps provider stream chunks and loop progress into
//! events a UI can render as they happen. They are sent over an optional
//! `tokio::sync::mpsc` channel; a closed receiver never fails the turn.

use serde::{Deserialize, Serialize};

/// Events emitted while a turn runs.
///
/// - `delta`:           partial text from the model
/// - `tool_call`:       the model asked for a tool
/// - `tool_result`:     a tool call was answered
/// - `proposal_queued`: a write call is waiting for confirmation
/// - `repairing`:       the answer failed validation and is being repaired
/// - `done`:            the turn finished
/// - `error`:           the turn failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    Delta { content: String },

    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    ToolResult {
        id: String,
        name: String,
        output: String,
        success: bool,
    },

    ProposalQueued {
        proposal_id: String,
        tool: String,
        summary: String,
    },

    Repairing { mode: String, reason: String },

    Done {
        iterations: u32,
        model_calls: u32,
        pending_proposals: usize,
    },

    Error { message: String },
}

impl AgentStreamEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Delta { .. } => "delta",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::ProposalQueued { .. } => "proposal_queued",
            Self::Repairing { .. } => "repairing",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}

/// Optional event sink shared by the loop and the coach.
pub type EventSink = tokio::sync::mpsc::Sender<AgentStreamEvent>;

/// Send if a sink is attached. A dropped receiver is ignored.
pub(crate) async fn emit(sink: Option<&EventSink>, event: AgentStreamEvent) {
    if let Some(tx) = sink {
        let _ = tx.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_serializes_with_type_tag() {
        let event = AgentStreamEvent::Delta { content: "Hello".into() };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"delta""#));
        assert!(json.contains(r#""content":"Hello""#));
    }

    #[test]
    fn proposal_event_serialization() {
        let event = AgentStreamEvent::ProposalQueued {
            proposal_id: "p1".into(),
            tool: "create_template".into(),
            summary: "Create template \"Legs\" with 3 exercise(s)".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"proposal_queued""#));
        assert_eq!(event.event_type(), "proposal_queued");
    }

    #[test]
    fn event_deserialization() {
        let json = r#"{"type":"repairing","mode":"workout","reason":"too short"}"#;
        let event: AgentStreamEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            AgentStreamEvent::Repairing {
                mode: "workout".into(),
                reason: "too short".into()
            }
        );
    }

    #[tokio::test]
    async fn emit_tolerates_missing_and_closed_sinks() {
        emit(None, AgentStreamEvent::Error { message: "x".into() }).await;

        let (tx, rx) = tokio::sync::mpsc::channel(1);
        drop(rx);
        emit(Some(&tx), AgentStreamEvent::Error { message: "x".into() }).await;
    }
}
