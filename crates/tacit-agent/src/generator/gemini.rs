//! Gemini `generateContent` backend.
//!
//! Gemini has no system role in this API shape, so the instruction block goes
//! out as the first user turn followed by a canned model acknowledgement.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tacit_core::config::GeneratorSettings;
use tacit_core::error::{Error, Result};

use super::{http_client, CompletionRequest, ResponseGenerator};
use crate::prompt::Role;

pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const ACKNOWLEDGE_REQUEST: &str = "Please acknowledge that you understand these instructions.";
const ACKNOWLEDGEMENT: &str =
    "I understand. I will prioritize the proprietary knowledge module and follow all system instructions provided.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn turn(role: &str, text: impl Into<String>) -> Content {
    Content { role: role.to_string(), parts: vec![Part { text: text.into() }] }
}

pub struct GeminiGenerator {
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new(api_key: String, settings: &GeneratorSettings) -> Result<Self> {
        Ok(Self {
            api_key,
            model: settings.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            max_tokens: settings.max_tokens,
            client: http_client(settings)?,
        })
    }

    fn build_request(&self, request: &CompletionRequest) -> GenerateRequest {
        let mut contents = Vec::with_capacity(request.history.len() + 3);
        contents.push(turn("user", format!("SYSTEM INSTRUCTIONS:\n{}\n\n{ACKNOWLEDGE_REQUEST}", request.system_context)));
        contents.push(turn("model", ACKNOWLEDGEMENT));
        for t in &request.history {
            let role = if t.role == Role::User { "user" } else { "model" };
            contents.push(turn(role, t.content.clone()));
        }
        contents.push(turn("user", request.message.clone()));
        GenerateRequest { contents, generation_config: GenerationConfig { max_output_tokens: self.max_tokens } }
    }
}

#[async_trait]
impl ResponseGenerator for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = self.build_request(request);
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Generator(format!("Gemini request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Generator(format!("Gemini returned {status}: {text}")));
        }
        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Generator(format!("Gemini response was not valid JSON: {e}")))?;
        Ok(candidate_text(parsed))
    }
}

fn candidate_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().map(|p| p.text).collect::<Vec<_>>().join(""))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ChatTurn;

    #[test]
    fn request_prepends_instructions_and_acknowledgement() {
        let generator = GeminiGenerator::new("key".to_string(), &GeneratorSettings::default()).unwrap();
        let request = CompletionRequest {
            system_context: "CTX".to_string(),
            tacit_knowledge: String::new(),
            history: vec![ChatTurn::new(Role::Assistant, "earlier answer")],
            message: "question".to_string(),
            context: Vec::new(),
        };
        let body = serde_json::to_value(generator.build_request(&request)).unwrap();
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 4);
        assert!(contents[0]["parts"][0]["text"].as_str().unwrap().starts_with("SYSTEM INSTRUCTIONS:\nCTX"));
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "model");
        assert_eq!(contents[3]["parts"][0]["text"], "question");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn candidate_parts_are_joined() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hold "},{"text":"steady."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(candidate_text(parsed), "Hold steady.");
        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(candidate_text(empty), "");
    }
}
