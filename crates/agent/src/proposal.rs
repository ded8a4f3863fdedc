//! Proposals: write-tool calls waiting for the user.
//!
//! ```text
//! Pending ──confirm──▶ Confirming ──▶ Success
//!    │                     └────────▶ Error
//!    └──cancel──▶ Cancelled
//! ```
//!
//! Nothing moves a proposal to `Success` except a confirmed execution.

use chrono::{DateTime, Utc};
use gymcoach_core::{ToolError, ToolKind, ToolResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Confirming,
    Success,
    Error,
    Cancelled,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProposalError {
    #[error("proposal {id} is {status:?}, only pending proposals can be {action}")]
    NotPending {
        id: String,
        status: ProposalStatus,
        action: &'static str,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: String,
    /// The model's tool call this proposal came from.
    pub call_id: String,
    pub tool: ToolKind,
    pub input: serde_json::Value,
    pub summary: String,
    pub status: ProposalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Proposal {
    pub fn new(
        call_id: impl Into<String>,
        tool: ToolKind,
        input: serde_json::Value,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            call_id: call_id.into(),
            tool,
            input,
            summary: summary.into(),
            status: ProposalStatus::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ProposalStatus::Pending
    }

    pub fn cancel(&mut self) -> Result<(), ProposalError> {
        self.require_pending("cancelled")?;
        self.status = ProposalStatus::Cancelled;
        Ok(())
    }

    /// Claim the proposal for execution.
    pub(crate) fn begin(&mut self) -> Result<(), ProposalError> {
        self.require_pending("confirmed")?;
        self.status = ProposalStatus::Confirming;
        Ok(())
    }

    pub(crate) fn finish(&mut self, outcome: Result<ToolResult, ToolError>) {
        match outcome {
            Ok(result) if result.success => {
                self.status = ProposalStatus::Success;
                self.result = Some(result.data.unwrap_or(serde_json::Value::String(result.output)));
            }
            Ok(result) => {
                self.status = ProposalStatus::Error;
                self.error = Some(result.output);
            }
            Err(e) => {
                self.status = ProposalStatus::Error;
                self.error = Some(e.to_string());
            }
        }
    }

    fn require_pending(&self, action: &'static str) -> Result<(), ProposalError> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(ProposalError::NotPending {
                id: self.id.clone(),
                status: self.status,
                action,
            })
        }
    }

    /// The tool message returned to the model in place of executing.
    pub fn pending_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "status": "pending_confirmation",
            "proposalId": self.id,
            "tool": self.tool.as_str(),
            "summary": self.summary,
            "message": "Queued for the user to confirm. Nothing has been changed yet."
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal() -> Proposal {
        Proposal::new("call_1", ToolKind::UpdateGoal, serde_json::json!({"goal": "5k"}), "Set goal")
    }

    #[test]
    fn cancel_only_from_pending() {
        let mut p = proposal();
        p.cancel().unwrap();
        assert_eq!(p.status, ProposalStatus::Cancelled);
        assert!(matches!(p.cancel(), Err(ProposalError::NotPending { .. })));
        assert!(p.begin().is_err());
    }

    #[test]
    fn begin_claims_once() {
        let mut p = proposal();
        p.begin().unwrap();
        assert_eq!(p.status, ProposalStatus::Confirming);
        assert!(p.begin().is_err());
    }

    #[test]
    fn finish_records_result_or_error() {
        let mut ok = proposal();
        ok.begin().unwrap();
        ok.finish(Ok(ToolResult::json(serde_json::json!({"settings": {"goal": "5k"}}))));
        assert_eq!(ok.status, ProposalStatus::Success);
        assert_eq!(ok.result.unwrap()["settings"]["goal"], "5k");

        let mut failed = proposal();
        failed.begin().unwrap();
        failed.finish(Err(ToolError::ExecutionFailed {
            tool_name: "update_goal".into(),
            reason: "disk full".into(),
        }));
        assert_eq!(failed.status, ProposalStatus::Error);
        assert!(failed.error.unwrap().contains("disk full"));
    }

    #[test]
    fn pending_payload_shape() {
        let p = proposal();
        let payload = p.pending_payload();
        assert_eq!(payload["status"], "pending_confirmation");
        assert_eq!(payload["proposalId"], p.id.as_str());
        assert_eq!(payload["tool"], "update_goal");
    }
}
