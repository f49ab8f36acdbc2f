//! In-memory sessions and their message logs.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tacit_core::error::{Error, Result};
use uuid::Uuid;

use crate::prompt::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub system_prompt: String,
    pub tacit_knowledge: String,
    pub hil_enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub system_prompt: String,
    pub tacit_knowledge: String,
    /// Defaults to `true` when absent.
    pub hil_enabled: Option<bool>,
}

/// Partial update; `None` fields are left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    pub system_prompt: Option<String>,
    pub tacit_knowledge: Option<String>,
    pub hil_enabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: Role,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<Uuid, Session>,
    // Kept in creation order, which is also timestamp order.
    messages: Vec<Message>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_session(&mut self, new: NewSession) -> Session {
        let session = Session {
            id: Uuid::new_v4(),
            system_prompt: new.system_prompt,
            tacit_knowledge: new.tacit_knowledge,
            hil_enabled: new.hil_enabled.unwrap_or(true),
            created_at: Utc::now(),
        };
        self.sessions.insert(session.id, session.clone());
        session
    }

    pub fn get_session(&self, id: Uuid) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn update_session(&mut self, id: Uuid, update: SessionUpdate) -> Option<Session> {
        let session = self.sessions.get_mut(&id)?;
        if let Some(system_prompt) = update.system_prompt {
            session.system_prompt = system_prompt;
        }
        if let Some(tacit_knowledge) = update.tacit_knowledge {
            session.tacit_knowledge = tacit_knowledge;
        }
        if let Some(hil_enabled) = update.hil_enabled {
            session.hil_enabled = hil_enabled;
        }
        Some(session.clone())
    }

    /// Removes the session and all of its messages. Unknown ids are a no-op.
    pub fn delete_session(&mut self, id: Uuid) {
        self.sessions.remove(&id);
        self.clear_messages(id);
    }

    pub fn create_message(
        &mut self,
        session_id: Uuid,
        role: Role,
        content: impl Into<String>,
        metadata: Option<serde_json::Value>,
    ) -> Result<Message> {
        if !self.sessions.contains_key(&session_id) {
            return Err(Error::NotFound { kind: "session", name: session_id.to_string() });
        }
        let message = Message {
            id: Uuid::new_v4(),
            session_id,
            role,
            content: content.into(),
            metadata,
            timestamp: Utc::now(),
        };
        self.messages.push(message.clone());
        Ok(message)
    }

    pub fn messages(&self, session_id: Uuid) -> Vec<Message> {
        self.messages.iter().filter(|m| m.session_id == session_id).cloned().collect()
    }

    pub fn clear_messages(&mut self, session_id: Uuid) {
        self.messages.retain(|m| m.session_id != session_id);
    }
}
