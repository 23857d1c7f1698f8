//! Human-in-the-loop tool approval.
//!
//! A long-running function call that is not a credential request pauses the
//! turn until a person approves or denies it. This module:
//!
//! - extracts [`ToolApprovalRequest`]s from a runtime event
//! - renders the interrupt message (markdown text plus a structured data part)
//! - parses the person's reply into an [`ApprovalDecision`]
//! - finds calls still awaiting a decision in session history and answers them
//!   with synthesized function responses

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use relay_core::constants::INTERRUPT_TOOL_APPROVAL;
use relay_core::content::ContentPart;
use relay_core::events::ExecutionEvent;
use relay_core::protocol::{Message, Part};
use relay_core::text::escape_backticks;
use relay_events::Session;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// One tool call awaiting approval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolApprovalRequest {
    /// Tool name.
    pub name: String,
    /// Call arguments.
    pub args: Map<String, Value>,
    /// Function call ID.
    pub id: String,
}

/// A person's answer to an approval interrupt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    /// Run the tool.
    Approve,
    /// Do not run the tool.
    Deny,
}

impl ApprovalDecision {
    /// Whether the call may proceed.
    pub fn is_approved(self) -> bool {
        self == Self::Approve
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Deny => "deny",
        }
    }
}

/// Approval requests carried by a non-partial event.
pub fn approval_requests(event: &ExecutionEvent) -> Vec<ToolApprovalRequest> {
    if event.partial {
        return Vec::new();
    }
    event
        .pending_approval_calls()
        .map(|(id, name, args)| ToolApprovalRequest {
            name: name.to_owned(),
            args: args.clone(),
            id: id.to_owned(),
        })
        .collect()
}

/// Markdown rendering of pending approvals.
pub fn render_markdown(requests: &[ToolApprovalRequest]) -> String {
    let mut out = String::from("**Approval required**\n\n");
    if requests.len() == 1 {
        out.push_str("The agent wants to run the following tool:\n");
    } else {
        out.push_str("The agent wants to run the following tools:\n");
    }
    for (i, req) in requests.iter().enumerate() {
        let args = serde_json::to_string_pretty(&req.args).unwrap_or_else(|_| "{}".into());
        let _ = write!(
            out,
            "\n{}. `{}`\n```json\n{}\n```\n",
            i + 1,
            escape_backticks(&req.name),
            escape_backticks(&args),
        );
    }
    out.push_str("\nReply **approve** to continue or **deny** to cancel.");
    out
}

/// The interrupt message: markdown text plus the structured data part
/// `{interrupt_type, action_requests}`.
pub fn interrupt_message(requests: &[ToolApprovalRequest]) -> Message {
    let data = json!({
        "interrupt_type": INTERRUPT_TOOL_APPROVAL,
        "action_requests": requests,
    });
    Message::agent(vec![Part::text(render_markdown(requests)), Part::data(data)])
}

static DENY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(denied|deny|reject|no|cancel|stop)\b").unwrap()
});

static APPROVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(approved|approve|proceed|yes|continue)\b").unwrap()
});

/// Parse an approval decision from inbound parts.
///
/// A data part `{decision_type: approve|deny|reject}` wins. Otherwise text is
/// matched word by word, deny before approve.
pub fn parse_decision(parts: &[Part]) -> Option<ApprovalDecision> {
    let structured = parts.iter().filter_map(Part::as_data).find_map(|data| {
        match data.get("decision_type").and_then(Value::as_str)? {
            "approve" => Some(ApprovalDecision::Approve),
            "deny" | "reject" => Some(ApprovalDecision::Deny),
            _ => None,
        }
    });
    if structured.is_some() {
        return structured;
    }

    let text: Vec<&str> = parts.iter().filter_map(Part::as_text).collect();
    let text = text.join(" ");
    if DENY_PATTERN.is_match(&text) {
        Some(ApprovalDecision::Deny)
    } else if APPROVE_PATTERN.is_match(&text) {
        Some(ApprovalDecision::Approve)
    } else {
        None
    }
}

/// Approval calls in session history that have not been answered yet.
///
/// Walks the whole log in order: every approval call is pending until a later
/// event carries a function response with its ID.
pub fn pending_approvals(session: &Session) -> Vec<ToolApprovalRequest> {
    let mut pending: Vec<ToolApprovalRequest> = Vec::new();
    for stored in &session.events {
        let answered: HashSet<&str> = stored
            .event
            .content
            .iter()
            .filter_map(|p| match p {
                ContentPart::FunctionResponse { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect();
        if !answered.is_empty() {
            pending.retain(|r| !answered.contains(r.id.as_str()));
        }
        pending.extend(approval_requests(&stored.event));
    }
    pending
}

/// Function responses answering `pending` with `decision`.
pub fn decision_responses(
    pending: &[ToolApprovalRequest],
    decision: ApprovalDecision,
) -> Vec<ContentPart> {
    pending
        .iter()
        .map(|req| {
            let mut response = Map::new();
            let _ = response.insert("approved".into(), Value::Bool(decision.is_approved()));
            let _ = response.insert("decision".into(), Value::String(decision.as_str().into()));
            ContentPart::function_response(&req.id, &req.name, response)
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
