use async_trait::async_trait;
use tacit_core::error::Result;

use super::{CompletionRequest, ResponseGenerator};

/// Longest passage excerpt quoted in an offline reply, in characters.
const EXCERPT_CHARS: usize = 240;

/// Network-free backend that answers from the expert rules and retrieved passages.
///
/// Output depends only on the request, which makes it the backend of choice
/// for tests and for running without API keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineGenerator;

#[async_trait]
impl ResponseGenerator for OfflineGenerator {
    fn name(&self) -> &str {
        "offline"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let rules: Vec<&str> = request
            .tacit_knowledge
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let mut out = format!("Regarding \"{}\":", request.message.trim());
        if rules.is_empty() && request.context.is_empty() {
            out.push_str("\nNo expert heuristics or indexed passages apply to this request.");
            return Ok(out);
        }
        if !rules.is_empty() {
            out.push_str("\n\nExpert heuristics to apply:");
            for rule in rules {
                out.push_str("\n- ");
                out.push_str(rule);
            }
        }
        if !request.context.is_empty() {
            out.push_str("\n\nSupporting passages:");
            for chunk in &request.context {
                out.push_str(&format!(
                    "\n- [{} p.{}] {}",
                    chunk.metadata.source_id,
                    chunk.metadata.page,
                    excerpt(&chunk.content)
                ));
            }
        }
        Ok(out)
    }
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(EXCERPT_CHARS).collect();
    cut.push_str("...");
    cut
}
