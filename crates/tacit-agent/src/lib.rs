pub mod agent;
pub mod chat;
pub mod generator;
pub mod prompt;
pub mod risk;
pub mod session;

pub use agent::{AgentResponse, AgentStatus, ApprovalDecision, TacitAgent};
pub use chat::{ChatReply, ChatService};
pub use generator::{generate, CompletionRequest, GeneratedResponse, GenerationInput, OfflineGenerator, ResponseGenerator};
pub use prompt::{ChatTurn, Role};
pub use session::{Message, NewSession, Session, SessionStore, SessionUpdate};
