use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tacit_core::error::{Error, Result};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::generator::{generate, GeneratedResponse, GenerationInput, ResponseGenerator};

pub const REJECTED_RESPONSE: &str =
    "The expert has rejected the proposed action. Please provide alternative guidance or ask a different question.";
pub const MODIFY_RESPONSE: &str = "The expert has requested modifications. Please clarify your requirements.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Idle,
    Reasoning,
    ConsultingKnowledge,
    AwaitingApproval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalDecision {
    Approve,
    Reject,
    Modify,
}

impl fmt::Display for ApprovalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ApprovalDecision::Approve => "approve",
            ApprovalDecision::Reject => "reject",
            ApprovalDecision::Modify => "modify",
        })
    }
}

impl FromStr for ApprovalDecision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(ApprovalDecision::Approve),
            "reject" => Ok(ApprovalDecision::Reject),
            "modify" => Ok(ApprovalDecision::Modify),
            other => Err(Error::InvalidInput(format!(
                "decision must be approve, reject or modify, got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub content: String,
    pub status: AgentStatus,
    pub requires_approval: bool,
    pub reasoning: Option<String>,
    pub knowledge_used: Vec<String>,
}

/// Per-session agent that gates high-risk responses behind expert approval.
///
/// The status is published on a watch channel so it can be read while a
/// response is being generated.
#[derive(Debug)]
pub struct TacitAgent {
    status: watch::Sender<AgentStatus>,
    pending: Option<GeneratedResponse>,
}

impl Default for TacitAgent {
    fn default() -> Self {
        Self { status: watch::channel(AgentStatus::Idle).0, pending: None }
    }
}

impl TacitAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> AgentStatus {
        *self.status.borrow()
    }

    /// Receiver that always holds the latest status.
    pub fn subscribe(&self) -> watch::Receiver<AgentStatus> {
        self.status.subscribe()
    }

    fn set_status(&self, status: AgentStatus) {
        debug!(?status, "agent status");
        self.status.send_replace(status);
    }

    pub fn pending(&self) -> Option<&GeneratedResponse> {
        self.pending.as_ref()
    }

    /// Generates a reply. With HIL enabled, a high-risk reply is held back and
    /// replaced by an approval request. A new message discards any earlier
    /// pending action.
    pub async fn process_message(
        &mut self,
        generator: &dyn ResponseGenerator,
        input: GenerationInput<'_>,
        hil_enabled: bool,
    ) -> Result<AgentResponse> {
        self.pending = None;
        self.set_status(AgentStatus::Reasoning);
        if !input.tacit_knowledge.trim().is_empty() || !input.context.is_empty() {
            self.set_status(AgentStatus::ConsultingKnowledge);
        }

        let response = match generate(generator, input).await {
            Ok(response) => response,
            Err(e) => {
                self.set_status(AgentStatus::Idle);
                warn!(error = %e, "response generation failed");
                return Err(match e {
                    Error::Generator(_) => e,
                    other => Error::Generator(format!("Agent processing failed: {other}")),
                });
            }
        };

        if response.requires_approval && hil_enabled {
            info!(knowledge = ?response.knowledge_used, "holding high-risk response for approval");
            let gated = AgentResponse {
                content: approval_request(&response),
                status: AgentStatus::AwaitingApproval,
                requires_approval: true,
                reasoning: Some(response.reasoning.clone()),
                knowledge_used: response.knowledge_used.clone(),
            };
            self.set_status(AgentStatus::AwaitingApproval);
            self.pending = Some(response);
            return Ok(gated);
        }

        self.set_status(AgentStatus::Idle);
        Ok(AgentResponse {
            content: response.content,
            status: AgentStatus::Idle,
            requires_approval: false,
            reasoning: Some(response.reasoning),
            knowledge_used: response.knowledge_used,
        })
    }

    /// Resolves the pending action. Fails when nothing is awaiting approval.
    pub fn handle_approval(&mut self, decision: ApprovalDecision) -> Result<AgentResponse> {
        if self.status() != AgentStatus::AwaitingApproval {
            return Err(Error::NoPendingAction);
        }
        let pending = self.pending.take().ok_or(Error::NoPendingAction)?;
        self.set_status(AgentStatus::Idle);
        info!(%decision, "expert decision recorded");

        let content = match decision {
            ApprovalDecision::Approve => pending.content,
            ApprovalDecision::Reject => REJECTED_RESPONSE.to_string(),
            ApprovalDecision::Modify => MODIFY_RESPONSE.to_string(),
        };
        Ok(AgentResponse {
            content,
            status: AgentStatus::Idle,
            requires_approval: false,
            reasoning: None,
            knowledge_used: Vec::new(),
        })
    }

    pub fn reset(&mut self) {
        self.set_status(AgentStatus::Idle);
        self.pending = None;
    }
}

fn approval_request(response: &GeneratedResponse) -> String {
    format!(
        "⚠️ HIGH-RISK SCENARIO DETECTED\n\n**Proposed Action:** {}\n\n**Rationale:** {}\n\n**Knowledge Used:** {}\n\nThis action requires expert approval before proceeding.",
        response.content,
        response.reasoning,
        response.knowledge_used.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::OfflineGenerator;

    fn input(message: &str) -> GenerationInput<'_> {
        GenerationInput {
            system_prompt: "You advise retirees.",
            tacit_knowledge: "1. Never touch the emergency fund.",
            message,
            history: &[],
            context: &[],
        }
    }

    #[test]
    fn decisions_parse_case_insensitively() {
        assert_eq!("Approve".parse::<ApprovalDecision>().unwrap(), ApprovalDecision::Approve);
        assert_eq!(" reject ".parse::<ApprovalDecision>().unwrap(), ApprovalDecision::Reject);
        assert!("maybe".parse::<ApprovalDecision>().is_err());
    }

    #[test]
    fn approval_without_pending_action_fails() {
        let mut agent = TacitAgent::new();
        assert!(matches!(agent.handle_approval(ApprovalDecision::Approve), Err(Error::NoPendingAction)));
    }

    #[tokio::test]
    async fn high_risk_is_gated_then_approved() {
        let mut agent = TacitAgent::new();
        let gated = agent.process_message(&OfflineGenerator, input("Withdraw my pension?"), true).await.unwrap();
        assert_eq!(gated.status, AgentStatus::AwaitingApproval);
        assert!(gated.content.starts_with("⚠️ HIGH-RISK SCENARIO DETECTED"));
        assert!(gated.content.contains("**Knowledge Used:** Rule 1"));
        assert_eq!(agent.status(), AgentStatus::AwaitingApproval);

        let proposed = agent.pending().unwrap().content.clone();
        let approved = agent.handle_approval(ApprovalDecision::Approve).unwrap();
        assert_eq!(approved.content, proposed);
        assert_eq!(agent.status(), AgentStatus::Idle);
        assert!(agent.pending().is_none());
        assert!(agent.handle_approval(ApprovalDecision::Approve).is_err());
    }

    #[tokio::test]
    async fn reject_and_modify_return_canned_replies() {
        let mut agent = TacitAgent::new();
        agent.process_message(&OfflineGenerator, input("Take a loan?"), true).await.unwrap();
        assert_eq!(agent.handle_approval(ApprovalDecision::Reject).unwrap().content, REJECTED_RESPONSE);

        agent.process_message(&OfflineGenerator, input("Take a loan?"), true).await.unwrap();
        assert_eq!(agent.handle_approval(ApprovalDecision::Modify).unwrap().content, MODIFY_RESPONSE);
    }

    #[tokio::test]
    async fn hil_disabled_answers_directly() {
        let mut agent = TacitAgent::new();
        let reply = agent.process_message(&OfflineGenerator, input("Take a loan?"), false).await.unwrap();
        assert_eq!(reply.status, AgentStatus::Idle);
        assert!(!reply.requires_approval);
        assert_eq!(reply.knowledge_used, vec!["Rule 1"]);
    }

    #[tokio::test]
    async fn subscribers_follow_status_changes() {
        let mut agent = TacitAgent::new();
        let status = agent.subscribe();
        assert_eq!(*status.borrow(), AgentStatus::Idle);
        agent.process_message(&OfflineGenerator, input("Buy bitcoin?"), true).await.unwrap();
        assert_eq!(*status.borrow(), AgentStatus::AwaitingApproval);
        agent.handle_approval(ApprovalDecision::Reject).unwrap();
        assert_eq!(*status.borrow(), AgentStatus::Idle);
    }

    #[tokio::test]
    async fn reset_drops_pending_action() {
        let mut agent = TacitAgent::new();
        agent.process_message(&OfflineGenerator, input("Buy bitcoin?"), true).await.unwrap();
        agent.reset();
        assert_eq!(agent.status(), AgentStatus::Idle);
        assert!(agent.handle_approval(ApprovalDecision::Approve).is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&AgentStatus::AwaitingApproval).unwrap(), "\"awaiting_approval\"");
    }
}
