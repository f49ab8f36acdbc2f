use serde::{Deserialize, Serialize};
use tacit_core::types::DocumentChunk;

pub const PRIORITY_NOTICE: &str =
    "IMPORTANT: Always prioritize the proprietary knowledge above over general information.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// One prior message of the conversation as seen by a generator backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// System prompt, tacit knowledge and retrieved passages merged into the
/// instruction block sent ahead of the conversation.
pub fn build_system_context(
    system_prompt: &str,
    tacit_knowledge: &str,
    context: &[DocumentChunk],
) -> String {
    let mut out = format!("{system_prompt}\n\nPROPRIETARY KNOWLEDGE MODULE:\n{tacit_knowledge}");
    if !context.is_empty() {
        out.push_str("\n\nRETRIEVED DOCUMENT CONTEXT:");
        for chunk in context {
            out.push_str(&format!(
                "\n[{} p.{}] {}",
                chunk.metadata.source_id, chunk.metadata.page, chunk.content
            ));
        }
    }
    out.push_str("\n\n");
    out.push_str(PRIORITY_NOTICE);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_without_passages() {
        let ctx = build_system_context("You are an advisor.", "1. Keep cash.", &[]);
        assert_eq!(
            ctx,
            format!("You are an advisor.\n\nPROPRIETARY KNOWLEDGE MODULE:\n1. Keep cash.\n\n{PRIORITY_NOTICE}")
        );
    }

    #[test]
    fn passages_are_cited_with_source_and_page() {
        let passages = vec![DocumentChunk::new("Bonds cushion drawdowns.", 4, "handbook.pdf")];
        let ctx = build_system_context("p", "k", &passages);
        assert!(ctx.contains("RETRIEVED DOCUMENT CONTEXT:\n[handbook.pdf p.4] Bonds cushion drawdowns."));
        assert!(ctx.ends_with(PRIORITY_NOTICE));
    }
}
