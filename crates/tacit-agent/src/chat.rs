//! Session-scoped chat: message log, retrieval, and one agent per session.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::json;
use tacit_core::config::{AgentSettings, Settings};
use tacit_core::error::{Error, Result};
use tacit_core::traits::Retriever;
use tacit_core::types::DocumentChunk;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use crate::agent::{AgentStatus, ApprovalDecision, TacitAgent};
use crate::generator::{self, GenerationInput, ResponseGenerator};
use crate::prompt::{ChatTurn, Role};
use crate::session::{Message, NewSession, Session, SessionStore, SessionUpdate};

/// Saved assistant message plus the agent state it left behind.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub message: Message,
    pub agent_status: AgentStatus,
}

/// A session's agent plus a status view that does not wait on the agent lock,
/// which is held for the whole generator call.
struct AgentSlot {
    agent: tokio::sync::Mutex<TacitAgent>,
    status: watch::Receiver<AgentStatus>,
}

impl AgentSlot {
    fn new() -> Self {
        let agent = TacitAgent::new();
        let status = agent.subscribe();
        Self { agent: tokio::sync::Mutex::new(agent), status }
    }
}

type AgentHandle = Arc<AgentSlot>;

pub struct ChatService {
    sessions: RwLock<SessionStore>,
    agents: Mutex<HashMap<Uuid, AgentHandle>>,
    generator: Arc<dyn ResponseGenerator>,
    retriever: Arc<dyn Retriever>,
    default_k: usize,
    settings: AgentSettings,
}

impl ChatService {
    pub fn new(
        generator: Arc<dyn ResponseGenerator>,
        retriever: Arc<dyn Retriever>,
        default_k: usize,
        settings: AgentSettings,
    ) -> Self {
        Self {
            sessions: RwLock::new(SessionStore::new()),
            agents: Mutex::new(HashMap::new()),
            generator,
            retriever,
            default_k: default_k.max(1),
            settings,
        }
    }

    /// Builds the configured generator backend over a shared retriever.
    pub fn from_settings(settings: &Settings, retriever: Arc<dyn Retriever>) -> Result<Self> {
        let generator: Arc<dyn ResponseGenerator> = Arc::from(generator::from_settings(&settings.generator)?);
        info!(backend = generator.name(), "chat service ready");
        Ok(Self::new(generator, retriever, settings.retrieval.default_k, settings.agent.clone()))
    }

    /// Creates a session; HIL follows `agent.hil_enabled` unless set explicitly.
    pub fn create_session(&self, mut new: NewSession) -> Session {
        new.hil_enabled.get_or_insert(self.settings.hil_enabled);
        let session = self.sessions.write().create_session(new);
        info!(session = %session.id, hil = session.hil_enabled, "session created");
        session
    }

    pub fn session(&self, id: Uuid) -> Option<Session> {
        self.sessions.read().get_session(id).cloned()
    }

    pub fn update_session(&self, id: Uuid, update: SessionUpdate) -> Result<Session> {
        self.sessions.write().update_session(id, update).ok_or_else(|| not_found(id))
    }

    pub fn messages(&self, session_id: Uuid) -> Vec<Message> {
        self.sessions.read().messages(session_id)
    }

    /// Records the user message, answers it, and records the reply.
    pub async fn send_message(&self, session_id: Uuid, content: &str) -> Result<ChatReply> {
        if content.trim().is_empty() {
            return Err(Error::InvalidInput("Message content is required".to_string()));
        }
        let session = self.session(session_id).ok_or_else(|| not_found(session_id))?;

        let history = self.history(session_id);
        self.sessions.write().create_message(session_id, Role::User, content, None)?;

        let context = self.retrieve(content);
        let slot = self.agent(session_id);
        let mut agent = slot.agent.lock().await;
        let input = GenerationInput {
            system_prompt: &session.system_prompt,
            tacit_knowledge: &session.tacit_knowledge,
            message: content,
            history: &history,
            context: &context,
        };
        let response = agent.process_message(self.generator.as_ref(), input, session.hil_enabled).await?;

        let sources: Vec<serde_json::Value> = context
            .iter()
            .map(|c| json!({ "sourceId": c.metadata.source_id, "page": c.metadata.page }))
            .collect();
        let metadata = json!({
            "status": response.status,
            "requiresApproval": response.requires_approval,
            "reasoning": response.reasoning,
            "knowledgeUsed": response.knowledge_used,
            "sources": sources,
        });
        let message =
            self.sessions.write().create_message(session_id, Role::Assistant, response.content, Some(metadata))?;
        Ok(ChatReply { message, agent_status: agent.status() })
    }

    /// Applies an expert decision to the session's pending action.
    pub async fn approve(&self, session_id: Uuid, decision: ApprovalDecision) -> Result<ChatReply> {
        if self.session(session_id).is_none() {
            return Err(not_found(session_id));
        }
        let slot = self.agent(session_id);
        let mut agent = slot.agent.lock().await;
        let response = agent.handle_approval(decision)?;
        let metadata = json!({
            "status": response.status,
            "approvalDecision": decision.to_string(),
        });
        let message =
            self.sessions.write().create_message(session_id, Role::Assistant, response.content, Some(metadata))?;
        Ok(ChatReply { message, agent_status: agent.status() })
    }

    /// Current status without waiting for an in-flight reply. Idle for
    /// sessions that have not spoken yet.
    pub fn agent_status(&self, session_id: Uuid) -> AgentStatus {
        self.agents.lock().get(&session_id).map(|slot| *slot.status.borrow()).unwrap_or_default()
    }

    /// Clears the message log and drops the session's agent state.
    pub fn reset_session(&self, session_id: Uuid) -> Result<()> {
        if self.session(session_id).is_none() {
            return Err(not_found(session_id));
        }
        self.sessions.write().clear_messages(session_id);
        self.agents.lock().remove(&session_id);
        info!(session = %session_id, "session reset");
        Ok(())
    }

    pub fn delete_session(&self, session_id: Uuid) {
        self.sessions.write().delete_session(session_id);
        self.agents.lock().remove(&session_id);
        info!(session = %session_id, "session deleted");
    }

    fn history(&self, session_id: Uuid) -> Vec<ChatTurn> {
        let mut turns: Vec<ChatTurn> = self
            .sessions
            .read()
            .messages(session_id)
            .into_iter()
            .filter(|m| m.role != Role::System)
            .map(|m| ChatTurn::new(m.role, m.content))
            .collect();
        if let Some(limit) = self.settings.history_limit {
            let skip = turns.len().saturating_sub(limit);
            turns.drain(..skip);
        }
        turns
    }

    fn retrieve(&self, query: &str) -> Vec<DocumentChunk> {
        if self.retriever.is_empty() {
            return Vec::new();
        }
        let passages = self.retriever.search(query, self.default_k);
        debug!(passages = passages.len(), "retrieved context");
        passages
    }

    fn agent(&self, session_id: Uuid) -> AgentHandle {
        Arc::clone(self.agents.lock().entry(session_id).or_insert_with(|| Arc::new(AgentSlot::new())))
    }
}

fn not_found(id: Uuid) -> Error {
    Error::NotFound { kind: "session", name: id.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::OfflineGenerator;
    use tacit_text::TfIdfRetriever;

    fn service(settings: AgentSettings) -> ChatService {
        ChatService::new(Arc::new(OfflineGenerator), Arc::new(TfIdfRetriever::new()), 3, settings)
    }

    fn new_session() -> NewSession {
        NewSession {
            system_prompt: "You advise.".to_string(),
            tacit_knowledge: "1. Keep six months of cash.".to_string(),
            hil_enabled: None,
        }
    }

    #[test]
    fn sessions_inherit_configured_hil_default() {
        let svc = service(AgentSettings { hil_enabled: false, history_limit: None });
        assert!(!svc.create_session(new_session()).hil_enabled);
        let explicit = svc.create_session(NewSession { hil_enabled: Some(true), ..new_session() });
        assert!(explicit.hil_enabled);
    }

    #[tokio::test]
    async fn blank_message_is_rejected_before_anything_is_saved() {
        let svc = service(AgentSettings::default());
        let id = svc.create_session(new_session()).id;
        assert!(matches!(svc.send_message(id, "   ").await, Err(Error::InvalidInput(_))));
        assert!(svc.messages(id).is_empty());
    }

    #[tokio::test]
    async fn history_limit_keeps_latest_turns() {
        let svc = service(AgentSettings { hil_enabled: false, history_limit: Some(1) });
        let id = svc.create_session(new_session()).id;
        svc.send_message(id, "What is a bond ladder?").await.unwrap();
        let history = svc.history(id);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::Assistant);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let svc = service(AgentSettings::default());
        let err = svc.send_message(Uuid::new_v4(), "hello there").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "session", .. }));
        assert!(svc.reset_session(Uuid::new_v4()).is_err());
    }
}
